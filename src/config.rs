//! Session and backend configuration
//!
//! `SessionConfig` holds the playback timings a session runs with and is
//! validated with `garde` before a session starts. `BackendConfig` tells the
//! HTTP backend where the game server lives and is usually read from the
//! environment.

use std::{env, time::Duration};

use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{backend, playback::*},
    game::Screen,
};

/// Validation result type for duration validation
type ValidationResult = garde::Result;

/// Validates that a duration in whole seconds falls within specified bounds.
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the inclusive range
/// `[MIN_SECONDS, MAX_SECONDS]`.
pub fn validate_duration<const MIN_SECONDS: u64, const MAX_SECONDS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    if (MIN_SECONDS..=MAX_SECONDS).contains(&val.as_secs()) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_SECONDS},{MAX_SECONDS}]",
        )))
    }
}

/// Validates that a duration in milliseconds falls within specified bounds.
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the inclusive range
/// `[MIN_MILLIS, MAX_MILLIS]` milliseconds.
pub fn validate_millis<const MIN_MILLIS: u64, const MAX_MILLIS: u64>(
    val: &Duration,
    _ctx: &(),
) -> ValidationResult {
    let millis = u64::try_from(val.as_millis()).unwrap_or(u64::MAX);
    if (MIN_MILLIS..=MAX_MILLIS).contains(&millis) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_MILLIS}ms,{MAX_MILLIS}ms]",
        )))
    }
}

fn at_most(limit: Duration) -> impl FnOnce(&Duration, &()) -> ValidationResult {
    move |value, _| {
        if *value <= limit {
            Ok(())
        } else {
            Err(garde::Error::new(format!(
                "must not exceed the clip duration of {}s",
                limit.as_secs()
            )))
        }
    }
}

/// What resuming a paused session does to the progress clock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResumePolicy {
    /// Pausing freezes elapsed time and resuming continues from it
    #[default]
    Continue,
    /// Resuming restarts progress from zero; the hint keeps its original deadline
    Restart,
}

/// Playback timings for one session
#[serde_with::serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SessionConfig {
    /// Clip length; the round times out when progress reaches this point
    #[garde(custom(validate_duration::<MIN_DURATION, MAX_DURATION>))]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub duration: Duration,
    /// Offset into playback at which the hint is revealed
    #[garde(
        custom(validate_duration::<MIN_HINT_DELAY, MAX_HINT_DELAY>),
        custom(at_most(self.duration))
    )]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub hint_delay: Duration,
    /// Interval between progress updates
    #[garde(custom(validate_millis::<MIN_TICK_MILLIS, MAX_TICK_MILLIS>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub tick: Duration,
    /// Behaviour of the clock when a paused session resumes
    #[garde(skip)]
    pub resume: ResumePolicy,
    /// Where to navigate when the round times out, if anywhere
    #[garde(skip)]
    pub timeout_screen: Option<Screen>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(DEFAULT_DURATION),
            hint_delay: Duration::from_secs(DEFAULT_HINT_DELAY),
            tick: Duration::from_millis(DEFAULT_TICK_MILLIS),
            resume: ResumePolicy::default(),
            timeout_screen: None,
        }
    }
}

/// Location and timeout of the game backend
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BackendConfig {
    /// Base URL the `/api/game/...` paths are joined onto
    #[garde(url)]
    pub base_url: String,
    /// Per-request timeout
    #[garde(skip)]
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: backend::DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(backend::DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl BackendConfig {
    /// Reads the backend configuration from the environment, falling back to
    /// defaults for anything unset or unparsable.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = env::var(backend::BASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| backend::DEFAULT_BASE_URL.to_owned());

        let timeout = env::var(backend::TIMEOUT_ENV)
            .ok()
            .and_then(|raw| match raw.trim().parse::<u64>() {
                Ok(secs) => Some(secs),
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring invalid {}", backend::TIMEOUT_ENV);
                    None
                }
            })
            .unwrap_or(backend::DEFAULT_TIMEOUT_SECS);

        Self {
            base_url,
            timeout: Duration::from_secs(timeout),
        }
    }
}
