//! Communication between the session core and its surroundings
//!
//! The session controller performs no I/O. Updates for the screen go out
//! through a [`Tunnel`], backend work is handed over as a [`Request`], and
//! the results come back in as a [`Response`]. This lets a slow or failing
//! network call finish whenever it finishes without holding up timers.

use garde::Validate;
use serde::{Deserialize, Serialize};

use super::{UpdateMessage, constants::answer, round::Round};

/// A guess delivered by the chat integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ChatAnswer {
    /// Chat name of the viewer who guessed
    #[garde(length(chars, min = 1, max = answer::MAX_USERNAME_LENGTH))]
    pub username: String,
    /// The guess itself
    #[garde(length(chars, min = 1, max = answer::MAX_LENGTH))]
    pub answer: String,
}

impl ChatAnswer {
    /// Creates an answer with surrounding whitespace removed from both parts
    pub fn new(username: impl AsRef<str>, answer: impl AsRef<str>) -> Self {
        Self {
            username: username.as_ref().trim().to_owned(),
            answer: answer.as_ref().trim().to_owned(),
        }
    }
}

/// Backend work the session asks its driver to perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Fetch the active round
    FetchRound,
    /// Tell the backend the hint is on screen; the result is ignored
    NotifyHint,
    /// Ask whether a chat answer is correct
    CheckAnswer(ChatAnswer),
}

/// Completion of a [`Request`], fed back into the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Outcome of [`Request::FetchRound`]
    Round(Result<Round, String>),
    /// Outcome of [`Request::CheckAnswer`]
    AnswerChecked {
        /// The answer that was checked
        answer: ChatAnswer,
        /// Whether it matched, or why the check could not be made
        verdict: Result<bool, String>,
    },
}

/// Trait for everything the session sends outward
///
/// Implementations forward updates to whatever renders the game screen and
/// queue requests for the backend driver.
pub trait Tunnel {
    /// Sends an update message to the screen owner
    ///
    /// # Arguments
    ///
    /// * `message` - The update message to send
    fn send_message(&self, message: &UpdateMessage);

    /// Hands a piece of backend work to the driver
    ///
    /// # Arguments
    ///
    /// * `request` - The request to perform
    fn request(&self, request: Request);
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_chat_answer_trims() {
        let answer = ChatAnswer::new("  viewer42 ", "\tNever Gonna Give You Up  ");
        assert_eq!(answer.username, "viewer42");
        assert_eq!(answer.answer, "Never Gonna Give You Up");
        assert!(answer.validate().is_ok());
    }

    #[test]
    fn test_chat_answer_rejects_blank_parts() {
        assert!(ChatAnswer::new("viewer", "   ").validate().is_err());
        assert!(ChatAnswer::new("", "answer").validate().is_err());
    }

    #[test]
    fn test_chat_answer_rejects_overlong_parts() {
        let long_answer = ChatAnswer::new("viewer", "a".repeat(answer::MAX_LENGTH + 1));
        assert!(long_answer.validate().is_err());

        let long_name = ChatAnswer::new("v".repeat(answer::MAX_USERNAME_LENGTH + 1), "answer");
        assert!(long_name.validate().is_err());
    }

    #[test]
    fn test_chat_answer_at_limit_is_valid() {
        let answer = ChatAnswer::new("viewer", "가".repeat(answer::MAX_LENGTH));
        assert!(answer.validate().is_ok());
    }
}
