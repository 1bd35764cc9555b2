//! Screens of the game and the flows that move between them
//!
//! The playback screen is driven by the session controller. The flows here
//! cover the screens around it: starting a game from the intro and loading
//! the standings for the results screen.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::{
    backend::{self, GameBackend},
    leaderboard::Leaderboard,
};

/// Routing targets of the game UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    /// Landing screen with the start button
    #[default]
    Intro,
    /// Playback screen running a session
    Game,
    /// Reveal shown after a correct answer
    Answer,
    /// Final standings
    Result,
}

impl Screen {
    /// Route path of the screen
    pub fn path(self) -> &'static str {
        match self {
            Self::Intro => "/",
            Self::Game => "/game",
            Self::Answer => "/answer",
            Self::Result => "/result",
        }
    }
}

impl Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// The path does not belong to any screen
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown route {0:?}")]
pub struct UnknownRoute(String);

impl FromStr for Screen {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "/" => Ok(Self::Intro),
            "/game" => Ok(Self::Game),
            "/answer" => Ok(Self::Answer),
            "/result" => Ok(Self::Result),
            other => Err(UnknownRoute(other.to_owned())),
        }
    }
}

/// Failures of the flows around the playback screen, shown as a blocking notice
#[derive(Debug, Error)]
pub enum FlowError {
    /// The backend refused or failed to start a game
    #[error("failed to start the game")]
    Start(#[source] backend::Error),
    /// The standings could not be fetched
    #[error("failed to load the results")]
    Results(#[source] backend::Error),
}

/// Starts a game from the intro screen
///
/// # Errors
///
/// Returns [`FlowError::Start`] if the backend call fails; the intro screen
/// stays up and the host may try again.
pub async fn start_game(backend: &dyn GameBackend) -> Result<Screen, FlowError> {
    match backend.start_game().await {
        Ok(()) => {
            info!("game started");
            Ok(Screen::Game)
        }
        Err(e) => {
            error!(error = %e, "failed to start the game");
            Err(FlowError::Start(e))
        }
    }
}

/// Loads the standings shown on the results screen
///
/// # Errors
///
/// Returns [`FlowError::Results`] if the backend call fails.
pub async fn load_results(backend: &dyn GameBackend) -> Result<Leaderboard, FlowError> {
    let scores = backend.results().await.map_err(|e| {
        error!(error = %e, "failed to load the results");
        FlowError::Results(e)
    })?;
    Ok(Leaderboard::from(scores))
}

/// Screen shown when the host restarts from the results screen
pub fn restart() -> Screen {
    Screen::Intro
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_paths_round_trip() {
        for screen in [Screen::Intro, Screen::Game, Screen::Answer, Screen::Result] {
            assert_eq!(screen.path().parse::<Screen>().unwrap(), screen);
            assert_eq!(screen.to_string(), screen.path());
        }
    }

    #[test]
    fn test_unknown_route() {
        let err = "/lobby".parse::<Screen>().unwrap_err();
        assert_eq!(err, UnknownRoute("/lobby".to_owned()));
        assert_eq!(err.to_string(), "unknown route \"/lobby\"");
    }

    #[test]
    fn test_restart_returns_to_intro() {
        assert_eq!(restart(), Screen::Intro);
        assert_eq!(Screen::default(), Screen::Intro);
    }

    #[test]
    fn test_screen_serializes_by_name() {
        assert_eq!(serde_json::to_string(&Screen::Answer).unwrap(), "\"Answer\"");
    }
}
