//! Final standings for the results screen
//!
//! The backend already returns the scores ordered best first. This module
//! keeps that order, numbers the entries and decides how each rank is
//! decorated.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{TruncatedVec, constants::leaderboard::DISPLAY_LIMIT};

/// One row of `GET /api/game/results`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// Chat name of the player
    pub username: String,
    /// Points collected over the game
    pub score: u64,
}

/// Decoration shown next to a rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Badge {
    /// First place
    Gold,
    /// Second place
    Silver,
    /// Third place
    Bronze,
    /// Any lower place, shown as its number
    Rank(usize),
}

impl Badge {
    /// Picks the badge for a 1-indexed position
    pub fn for_position(position: usize) -> Self {
        match position {
            1 => Self::Gold,
            2 => Self::Silver,
            3 => Self::Bronze,
            n => Self::Rank(n),
        }
    }

    /// Text rendered for the badge
    pub fn label(self) -> String {
        match self {
            Self::Gold => "🥇".to_owned(),
            Self::Silver => "🥈".to_owned(),
            Self::Bronze => "🥉".to_owned(),
            Self::Rank(n) => format!("#{n}"),
        }
    }
}

/// A player's place on the results screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Position in the leaderboard (1-indexed)
    pub position: usize,
    /// Decoration for the position
    pub badge: Badge,
    /// Chat name of the player
    pub username: String,
    /// Points collected over the game
    pub score: u64,
}

impl Standing {
    /// Whether this entry gets the first-place highlight
    pub fn is_first_place(&self) -> bool {
        self.position == 1
    }
}

/// Ordered standings as delivered by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    standings: Vec<Standing>,
}

impl From<Vec<PlayerScore>> for Leaderboard {
    fn from(scores: Vec<PlayerScore>) -> Self {
        let standings = scores
            .into_iter()
            .enumerate()
            .map(|(index, PlayerScore { username, score })| Standing {
                position: index + 1,
                badge: Badge::for_position(index + 1),
                username,
                score,
            })
            .collect_vec();

        Self { standings }
    }
}

impl Leaderboard {
    /// Whether nobody took part; the results screen shows an empty notice
    pub fn is_empty(&self) -> bool {
        self.standings.is_empty()
    }

    /// Number of ranked players
    pub fn len(&self) -> usize {
        self.standings.len()
    }

    /// All standings, best first
    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    /// The winner, if anyone played
    pub fn leader(&self) -> Option<&Standing> {
        self.standings.first()
    }

    /// The standings to list on screen, capped at the display limit
    pub fn display(&self) -> TruncatedVec<Standing> {
        TruncatedVec::new(
            self.standings.iter().cloned(),
            DISPLAY_LIMIT,
            self.standings.len(),
        )
    }
}
