//! # Song Quiz Library
//!
//! This library provides the playback session logic for a live music
//! guessing game. A host plays a song clip, viewers answer in chat, and the
//! game screen runs a progress clock and a delayed hint until either the clip
//! runs out or someone answers correctly.
//!
//! The [`controller::SessionController`] is a pure state machine: it receives
//! messages and alarms, and reports what happened through a
//! [`session::Tunnel`]. The [`runtime`] module drives it on a tokio task and
//! performs the backend calls it asks for.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
#![allow(clippy::missing_panics_doc)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub mod backend;
pub mod clock;
pub mod config;
pub mod constants;
pub mod controller;
pub mod game;
pub mod hint;
pub mod leaderboard;
pub mod round;
pub mod runtime;
pub mod session;
pub mod session_id;
pub mod video;

/// Messages describing the complete current view of the game screen
///
/// Sent to a renderer that attaches after the session started so it can
/// draw the right screen without replaying every update.
#[derive(Debug, Serialize, Clone, derive_more::From)]
pub enum SyncMessage {
    /// Playback session view
    Session(controller::SyncMessage),
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Messages sent to update the game screen
#[derive(Debug, Serialize, Clone, PartialEq, derive_more::From)]
pub enum UpdateMessage {
    /// Playback session updates
    Session(controller::UpdateMessage),
    /// The screen should move on to another route
    Navigate(game::Screen),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Alarm messages for the timed events of a session
///
/// Each alarm names the session that scheduled it together with the
/// generation or token it was scheduled under, so an alarm that outlived its
/// timer is recognised and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// The progress clock should advance by one tick
    Tick {
        /// Session that started the clock
        session: session_id::SessionId,
        /// Clock generation the tick belongs to
        generation: u64,
    },
    /// The hint delay has elapsed
    RevealHint {
        /// Session that armed the hint
        session: session_id::SessionId,
        /// Token of the arming this alarm belongs to
        token: u64,
    },
}

impl AlarmMessage {
    /// Returns the session the alarm was scheduled by
    pub fn session(&self) -> session_id::SessionId {
        match self {
            Self::Tick { session, .. } | Self::RevealHint { session, .. } => *session,
        }
    }
}

/// A truncated vector that maintains the exact count while limiting displayed items
///
/// This structure is useful for displaying a limited number of items while
/// still showing the total count. For example, showing "120 players" but
/// only listing the first 50 of them.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of items
    exact_count: usize,
    /// The truncated list of items (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Creates a new truncated vector from an iterator
    ///
    /// # Arguments
    ///
    /// * `list` - An iterator over items to include
    /// * `limit` - Maximum number of items to include in the truncated vector
    /// * `exact_count` - The exact total count of items (may be larger than limit)
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Returns the exact count of items
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the truncated items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_vec_new() {
        let data = vec![1, 2, 3, 4, 5];
        let truncated = TruncatedVec::new(data.into_iter(), 3, 5);

        assert_eq!(truncated.exact_count(), 5);
        assert_eq!(truncated.items(), &[1, 2, 3]);
    }

    #[test]
    fn test_truncated_vec_new_limit_larger_than_items() {
        let data = vec![1, 2, 3];
        let truncated = TruncatedVec::new(data.into_iter(), 5, 3);

        assert_eq!(truncated.exact_count(), 3);
        assert_eq!(truncated.items(), &[1, 2, 3]);
    }

    #[test]
    fn test_alarm_session() {
        let session = session_id::SessionId::new();
        let tick = AlarmMessage::Tick {
            session,
            generation: 3,
        };
        let hint = AlarmMessage::RevealHint { session, token: 1 };

        assert_eq!(tick.session(), session);
        assert_eq!(hint.session(), session);
    }

    #[test]
    fn test_update_message_to_message() {
        let update: UpdateMessage = game::Screen::Answer.into();
        let json = update.to_message();

        assert!(json.contains("Navigate"));
        assert!(json.contains("Answer"));

        let update: UpdateMessage = controller::UpdateMessage::Playback { playing: false }.into();
        let json = update.to_message();
        assert!(json.contains("Session"));
        assert!(json.contains("\"playing\":false"));
    }

    #[test]
    fn test_sync_message_to_message() {
        let sync: SyncMessage = controller::SyncMessage::Loading.into();
        assert!(sync.to_message().contains("Loading"));
    }
}
