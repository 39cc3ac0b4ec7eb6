//! Players and their roster profiles.

use serde::{Deserialize, Serialize};

/// Identifier of a player seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u8);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Static description of a seat: who sits there and how they are drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Seat id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color as a CSS-style hex string.
    pub color: String,
}

impl PlayerProfile {
    /// Create a profile.
    #[must_use]
    pub fn new(id: u8, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: PlayerId(id),
            name: name.into(),
            color: color.into(),
        }
    }

    /// The four default seats: blue, red, green and black.
    #[must_use]
    pub fn default_roster() -> Vec<Self> {
        vec![
            Self::new(1, "Galamar", "#0000cc"),
            Self::new(2, "Valadorn", "#ff0000"),
            Self::new(3, "Saeth", "#009900"),
            Self::new(4, "Nimweaver", "#999999"),
        ]
    }
}

/// A participant in a match.
///
/// Players live for the whole match; defeat only clears `active`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Seat id.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Display color.
    pub color: String,
    /// Current gold.
    pub gold: u32,
    /// Still in the match.
    pub active: bool,
    /// Controlled by the AI layer.
    pub ai: bool,
    /// Income credited at the start of the player's most recent turn.
    pub last_income: u32,
}

impl Player {
    /// Activate a seat from its profile with no gold.
    #[must_use]
    pub fn from_profile(profile: &PlayerProfile, ai: bool) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            color: profile.color.clone(),
            gold: 0,
            active: true,
            ai,
            last_income: 0,
        }
    }

    /// Spend `amount` gold if the player can afford it.
    ///
    /// Returns `false` and leaves gold untouched otherwise.
    pub fn try_spend(&mut self, amount: u32) -> bool {
        match self.gold.checked_sub(amount) {
            Some(rest) => {
                self.gold = rest;
                true
            }
            None => false,
        }
    }
}
