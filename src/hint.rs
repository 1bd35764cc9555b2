//! Delayed one-shot hint reveal
//!
//! Arming schedules a single alarm carrying a fresh token. Only an alarm
//! whose token matches the armed one can fire the hint, so cancelling and
//! firing are mutually exclusive regardless of how the alarm races with the
//! cancellation.

use std::time::Duration;

use crate::{AlarmMessage, session_id::SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HintState {
    Idle,
    Armed { token: u64 },
    Cancelled,
    Fired,
}

/// Schedules the hint reveal at a fixed offset into playback
#[derive(Debug, Clone)]
pub struct HintScheduler {
    session: SessionId,
    next_token: u64,
    state: HintState,
}

impl HintScheduler {
    /// Creates an unarmed scheduler
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            next_token: 0,
            state: HintState::Idle,
        }
    }

    /// Schedules the reveal `delay` from now
    ///
    /// Arming is idempotent: while armed, or after the hint has fired, this
    /// does nothing and returns `false`.
    pub fn arm<S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        delay: Duration,
        mut schedule_message: S,
    ) -> bool {
        if matches!(self.state, HintState::Armed { .. } | HintState::Fired) {
            return false;
        }

        self.next_token += 1;
        let token = self.next_token;
        self.state = HintState::Armed { token };

        schedule_message(
            AlarmMessage::RevealHint {
                session: self.session,
                token,
            },
            delay,
        );
        true
    }

    /// Guarantees the pending reveal never fires
    ///
    /// Returns `true` if a reveal was pending.
    pub fn cancel(&mut self) -> bool {
        if let HintState::Armed { .. } = self.state {
            self.state = HintState::Cancelled;
            true
        } else {
            false
        }
    }

    /// Handles the alarm carrying `token`
    ///
    /// Returns `true` exactly once, for the alarm of the current arming, and
    /// only if it was not cancelled first.
    pub fn fire(&mut self, token: u64) -> bool {
        match self.state {
            HintState::Armed { token: armed } if armed == token => {
                self.state = HintState::Fired;
                true
            }
            _ => false,
        }
    }

    /// Fires a pending reveal immediately, ahead of its alarm
    ///
    /// The alarm that arrives later is then ignored.
    pub fn flush(&mut self) -> bool {
        if let HintState::Armed { token } = self.state {
            self.fire(token)
        } else {
            false
        }
    }

    /// Whether a reveal is pending
    pub fn is_armed(&self) -> bool {
        matches!(self.state, HintState::Armed { .. })
    }

    /// Whether the hint has been revealed
    pub fn has_fired(&self) -> bool {
        self.state == HintState::Fired
    }
}
