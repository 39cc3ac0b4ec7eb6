//! Data validation utilities.
//!
//! A data directory holds `catalog.ron` (terrain and unit types) and
//! `config.ron` (match rules). Each file is parsed and validated by the
//! engine, then checked against the other.

use std::path::Path;

use siege_core::catalog::{Catalog, IMPASSABLE};
use siege_core::config::GameConfig;
use tracing::{debug, warn};

use crate::error::{read_file, Result, ToolError};

/// Catalog file name inside a data directory.
pub const CATALOG_FILE: &str = "catalog.ron";
/// Config file name inside a data directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Summary of a directory that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of terrain entries.
    pub terrains: usize,
    /// Number of unit types.
    pub unit_types: usize,
    /// Problems that do not stop a match from running.
    pub warnings: Vec<String>,
}

/// Load and validate a catalog file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the catalog is invalid.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = read_file(path)?;
    Ok(Catalog::from_ron_str(&text, &path.display().to_string())?)
}

/// Load and validate a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the config is invalid.
pub fn load_config(path: &Path) -> Result<GameConfig> {
    let text = read_file(path)?;
    Ok(GameConfig::from_ron_str(&text, &path.display().to_string())?)
}

/// Validate all RON data files in a directory.
///
/// # Errors
///
/// Returns an error if any data file fails to load or the files disagree.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let catalog = load_catalog(&path.join(CATALOG_FILE))?;
    let config = load_config(&path.join(CONFIG_FILE))?;
    debug!(dir = %path.display(), "data files parsed");
    cross_check(&catalog, &config)
}

/// Check a catalog and a config against each other.
///
/// # Errors
///
/// Returns [`ToolError::Invalid`] listing every hard problem found.
pub fn cross_check(catalog: &Catalog, config: &GameConfig) -> Result<ValidationReport> {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    match catalog.terrain_key(&config.default_terrain) {
        None => errors.push(format!(
            "default terrain '{}' is not in the catalog",
            config.default_terrain
        )),
        Some(key) if catalog.terrain(key).movement >= IMPASSABLE => warnings.push(format!(
            "default terrain '{}' is impassable",
            config.default_terrain
        )),
        Some(_) => {}
    }

    if config.profile(config.protagonist).is_none() {
        errors.push(format!(
            "protagonist {} is not in the roster",
            config.protagonist
        ));
    }

    for (key, terrain) in catalog.terrains() {
        if let Some(owner) = terrain.owner {
            if config.profile(owner).is_none() {
                errors.push(format!(
                    "terrain '{}' is owned by {owner}, who is not in the roster",
                    terrain.id
                ));
            }
        }
        if terrain.capture == 0 {
            continue;
        }
        for profile in &config.roster {
            if catalog.captured_variant(key, profile.id).is_none() {
                warnings.push(format!(
                    "terrain '{}' has no variant owned by {}",
                    terrain.id, profile.id
                ));
            }
        }
    }

    let capture_needed = catalog
        .terrains()
        .filter(|(_, t)| t.capture > 0)
        .map(|(_, t)| t.capture)
        .min();
    if let Some(needed) = capture_needed {
        if !catalog.unit_types().any(|(_, u)| u.capture >= needed) {
            warnings.push(format!("no unit type reaches capture strength {needed}"));
        }
    }

    if !errors.is_empty() {
        return Err(ToolError::Invalid(errors));
    }
    for warning in &warnings {
        warn!("{warning}");
    }
    Ok(ValidationReport {
        terrains: catalog.terrains().count(),
        unit_types: catalog.unit_types().count(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use siege_core::catalog::Terrain;
    use siege_core::player::PlayerId;
    use siege_test_utils::fixtures::fixture_catalog;

    #[test]
    fn test_fixture_catalog_passes_with_two_player_roster() {
        let mut config = GameConfig::default();
        config.roster.truncate(2);
        let report = cross_check(&fixture_catalog(), &config).unwrap();
        assert_eq!(report.terrains, 11);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    }

    #[test]
    fn test_missing_owned_variants_warn() {
        let report = cross_check(&fixture_catalog(), &GameConfig::default()).unwrap();
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("'v'") && w.contains("@3")));
    }

    #[test]
    fn test_unknown_default_terrain_fails() {
        let config = GameConfig {
            default_terrain: "lava".into(),
            protagonist: PlayerId(9),
            ..GameConfig::default()
        };
        let Err(ToolError::Invalid(errors)) = cross_check(&fixture_catalog(), &config) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("lava"));
        assert!(errors[1].contains("@9"));
    }

    #[test]
    fn test_owner_outside_roster_fails() {
        let catalog = Catalog::new(
            vec![
                Terrain::new("a", "Plains", 1),
                Terrain {
                    owner: Some(PlayerId(7)),
                    ..Terrain::new("t", "Tower", 1)
                },
            ],
            vec![],
        )
        .unwrap();
        assert!(matches!(
            cross_check(&catalog, &GameConfig::default()),
            Err(ToolError::Invalid(_))
        ));
    }
}
