//! Validator and overlay dump against files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use siege_core::error::GameError;
use siege_core::grid::Cell;
use siege_core::unit::UnitMode;
use siege_tools::overlay::dump_files;
use siege_tools::validate::{validate_data_directory, CATALOG_FILE, CONFIG_FILE};
use siege_tools::ToolError;

fn shipped_data() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data")
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).unwrap();
    path
}

const SMALL_CATALOG: &str = r#"CatalogData(
    terrain: [
        Terrain(id: "a", name: "Grass", movement: 1),
        Terrain(id: "w", name: "Water"),
    ],
    units: [
        UnitType(id: "soldier", name: "Soldier", attack: 5, defense: 2, hitpoints: 10, movement: 2),
    ],
)"#;

#[test]
fn shipped_data_is_valid() {
    let report = validate_data_directory(&shipped_data()).unwrap();
    assert_eq!(report.terrains, 17);
    assert_eq!(report.unit_types, 12);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
}

#[test]
fn missing_files_name_the_path() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), CATALOG_FILE, SMALL_CATALOG);

    let err = validate_data_directory(dir.path()).unwrap_err();
    let ToolError::Io { path, .. } = err else {
        panic!("expected an io error, got {err}");
    };
    assert!(path.ends_with(CONFIG_FILE));
}

#[test]
fn broken_references_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        CATALOG_FILE,
        &SMALL_CATALOG.replace("movement: 2", r#"movement: 2, grave: Some("ghost")"#),
    );
    write(dir.path(), CONFIG_FILE, "GameConfig()");

    let err = validate_data_directory(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        ToolError::Game(GameError::UnknownUnitType(ref id)) if id == "ghost"
    ));
}

#[test]
fn config_must_agree_with_catalog() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), CATALOG_FILE, SMALL_CATALOG);
    write(dir.path(), CONFIG_FILE, r#"GameConfig(default_terrain: "sand")"#);

    let err = validate_data_directory(dir.path()).unwrap_err();
    assert!(err.to_string().contains("sand"), "{err}");
}

#[test]
fn overlay_dump_reads_a_save() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = write(dir.path(), CATALOG_FILE, SMALL_CATALOG);
    let save = write(
        dir.path(),
        "save.json",
        r#"{"turn":0,
            "map":{"width":3,"height":2,"terrain":"a,w,a,a,a,a"},
            "players":[
              {"id":1,"units":[{"type":"soldier","x":0,"y":0}]},
              {"id":2,"units":[{"type":"soldier","x":2,"y":1}]}
            ]}"#,
    );

    let dump = dump_files(&catalog, &save, Cell::new(0, 0)).unwrap();
    assert_eq!(dump.mode, UnitMode::Move);
    assert_eq!(dump.rows, "...\nmm.\n");

    let err = dump_files(&catalog, &save, Cell::new(1, 1)).unwrap_err();
    assert!(matches!(err, ToolError::NoUnit(_)));
}
