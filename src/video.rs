//! Video playback capability
//!
//! The session never embeds a player itself. It drives whatever implements
//! [`VideoSurface`] and learns about clip completion through the callback
//! registered with [`VideoSurface::on_ended`]. This keeps alternate media
//! backends swappable without touching the state machine.

use serde::{Deserialize, Serialize};
use url::Url;

/// Callback invoked by a surface when its clip finishes on its own
pub type EndedCallback = Box<dyn FnMut() + Send>;

/// Length of a YouTube video ID
const YOUTUBE_ID_LENGTH: usize = 11;

/// Capability wrapping an external video player
///
/// The surface is exclusively owned by one session controller; nothing else
/// issues playback commands to it.
pub trait VideoSurface: Send {
    /// Loads the clip behind `locator` and starts playing it
    fn start(&mut self, locator: &str);

    /// Pauses playback, keeping the current position
    fn pause(&mut self);

    /// Continues playback from the paused position
    fn resume(&mut self);

    /// Stops playback for good
    ///
    /// Surfaces without a distinct stop command simply pause.
    fn stop(&mut self) {
        self.pause();
    }

    /// Registers the callback to run when the clip ends naturally
    fn on_ended(&mut self, notify: EndedCallback);
}

/// Events raised by a video surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoEvent {
    /// The clip played through to its end
    Ended,
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

/// Extracts the 11-character video ID from a YouTube URL
///
/// Accepts `youtube.com/watch?v=ID`, `youtu.be/ID`, `youtube.com/embed/ID`,
/// `youtube.com/v/ID`, `youtube.com/e/ID` and the long
/// `youtube.com/<segment>/.../ID` forms. Returns `None` for anything else,
/// which players surface as an invalid YouTube URL.
pub fn youtube_id(locator: &str) -> Option<String> {
    let url = Url::parse(locator.trim()).ok()?;
    let host = url.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);

    let candidate = if host == "youtu.be" {
        url.path_segments()?.next()?.to_owned()
    } else if host == "youtube.com" || host.ends_with(".youtube.com") {
        if let Some((_, id)) = url.query_pairs().find(|(key, _)| key == "v") {
            id.into_owned()
        } else {
            let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
            match segments.as_slice() {
                ["embed" | "v" | "e", id, ..] => (*id).to_owned(),
                [_, _, .., id] => (*id).to_owned(),
                _ => return None,
            }
        }
    } else {
        return None;
    };

    let id: String = candidate.chars().take(YOUTUBE_ID_LENGTH).collect();
    (id.len() == YOUTUBE_ID_LENGTH && id.chars().all(is_id_char)).then_some(id)
}
