//! The round currently being played
//!
//! A round is created by the backend when the host starts a game. The
//! session fetches it once and treats it as an immutable snapshot for the
//! rest of its lifetime.

use serde::{Deserialize, Serialize};

use crate::video;

/// One song clip plus the metadata shown alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// Backend identifier of the song
    pub id: u64,
    /// Locator of the clip, handed to the video surface untouched
    pub youtube_url: String,
    /// Genre label shown for the whole round
    pub genre: String,
    /// Clue text disclosed partway through playback
    #[serde(default)]
    pub hint: Option<String>,
    /// Performing artist, part of the answer metadata
    pub artist: String,
}

impl Round {
    /// Returns the YouTube video ID of this round's clip, if the locator is
    /// a recognisable YouTube URL
    pub fn video_id(&self) -> Option<String> {
        video::youtube_id(&self.youtube_url)
    }

    /// Returns the hint text that should currently be displayed
    ///
    /// The hint is only shown once it has been revealed and only when the
    /// round actually carries non-empty hint text.
    pub fn visible_hint(&self, revealed: bool) -> Option<&str> {
        if !revealed {
            return None;
        }
        self.hint.as_deref().filter(|hint| !hint.trim().is_empty())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn create_test_round() -> Round {
        Round {
            id: 7,
            youtube_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_owned(),
            genre: "Pop".to_owned(),
            hint: Some("Released in 1987".to_owned()),
            artist: "Rick Astley".to_owned(),
        }
    }

    #[test]
    fn test_round_deserializes_backend_shape() {
        let json = r#"{
            "id": 3,
            "youtube_url": "https://youtu.be/dQw4w9WgXcQ",
            "genre": "Ballad",
            "hint": null,
            "artist": "IU"
        }"#;
        let round: Round = serde_json::from_str(json).unwrap();

        assert_eq!(round.id, 3);
        assert_eq!(round.genre, "Ballad");
        assert!(round.hint.is_none());
        assert_eq!(round.artist, "IU");
    }

    #[test]
    fn test_round_missing_hint_defaults_to_none() {
        let json = r#"{"id":1,"youtube_url":"u","genre":"g","artist":"a"}"#;
        let round: Round = serde_json::from_str(json).unwrap();
        assert!(round.hint.is_none());
    }

    #[test]
    fn test_video_id() {
        assert_eq!(create_test_round().video_id().as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn test_visible_hint_requires_reveal() {
        let round = create_test_round();
        assert_eq!(round.visible_hint(false), None);
        assert_eq!(round.visible_hint(true), Some("Released in 1987"));
    }

    #[test]
    fn test_visible_hint_hides_missing_or_blank_text() {
        let mut round = create_test_round();
        round.hint = None;
        assert_eq!(round.visible_hint(true), None);

        round.hint = Some("   ".to_owned());
        assert_eq!(round.visible_hint(true), None);
    }
}
