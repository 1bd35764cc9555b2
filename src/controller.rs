//! Playback session state machine
//!
//! A [`SessionController`] runs one round from loading to resolution. It owns
//! the progress clock, the hint scheduler and the video surface, and it is
//! the only place where session transitions happen. All input arrives
//! through [`SessionController::receive_message`] and
//! [`SessionController::receive_alarm`]; the controller never blocks and
//! performs no I/O itself.
//!
//! Resolution is guarded: the first terminating event wins and everything
//! that arrives afterwards is ignored, so a late correct answer can never
//! cause a second navigation.

use std::collections::VecDeque;

use garde::Validate;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use tracing::{debug, error, info, warn};
use web_time::{Duration, Instant, SystemTime};

use super::{
    AlarmMessage,
    clock::{ClockEvent, Indicator, Progress, ProgressClock},
    config::{ResumePolicy, SessionConfig},
    constants::answer::MAX_RECORDED_ATTEMPTS,
    game::Screen,
    hint::HintScheduler,
    round::Round,
    session::{ChatAnswer, Request, Response, Tunnel},
    session_id::SessionId,
    video::{VideoEvent, VideoSurface},
};

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The clip ran out before anyone answered correctly
    TimedOut,
    /// A chat answer was verified as correct
    AnsweredCorrectly,
}

/// Lifecycle position of a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Constructed, not started yet
    #[default]
    Idle,
    /// Waiting for the round to arrive from the backend
    Loading,
    /// Clip and clock are running
    Playing,
    /// Clip and clock are halted by the host
    Paused,
    /// The round could not be loaded; the session stays here
    Failed,
    /// Terminal
    Resolved(Outcome),
}

/// Observable state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Lifecycle position
    pub phase: Phase,
    /// Set once the hint has been revealed, never cleared afterwards
    pub hint_revealed: bool,
}

/// Commands issued by the host on the game screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostMessage {
    /// Clicking the progress indicator pauses or resumes playback
    TogglePlayback,
}

/// Everything a session reacts to apart from its own alarms
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From)]
pub enum IncomingMessage {
    /// Host input
    Host(HostMessage),
    /// A guess delivered by the chat integration
    Chat(ChatAnswer),
    /// Event raised by the video surface
    Video(VideoEvent),
    /// Completion of a backend request
    Backend(Response),
}

/// Updates sent to the game screen while a session runs
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UpdateMessage {
    /// The round is being fetched
    Loading,
    /// The round arrived and playback started
    RoundStarted {
        /// Genre label shown for the whole round
        genre: String,
        /// Length of the countdown
        #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
        duration: Duration,
    },
    /// The progress clock moved
    Progress(Progress),
    /// Playback was paused or resumed
    Playback {
        /// Whether the clip is now running
        playing: bool,
    },
    /// The hint delay elapsed
    HintRevealed {
        /// Hint text, if the round has any
        hint: Option<String>,
    },
    /// The round could not be loaded
    LoadFailed {
        /// Notice shown to the user
        message: String,
    },
    /// The session ended
    Resolved {
        /// How it ended
        outcome: Outcome,
        /// Chat name of the viewer who answered correctly
        winner: Option<String>,
    },
}

/// Complete view of the game screen for a renderer that attaches late
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SyncMessage {
    /// The round is being fetched
    Loading,
    /// The round could not be loaded
    Failed {
        /// Notice shown to the user
        message: String,
    },
    /// A round is on screen
    Round {
        /// Genre label
        genre: String,
        /// Hint text, once revealed and only if the round has any
        hint: Option<String>,
        /// Progress ring and play/pause control
        indicator: Indicator,
        /// How the session ended, if it has
        outcome: Option<Outcome>,
    },
}

/// A chat answer that was passed on for verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    /// The answer as submitted
    pub answer: ChatAnswer,
    /// When the session accepted it
    pub submitted_at: SystemTime,
}

/// Runs one round from loading to resolution
pub struct SessionController<V> {
    id: SessionId,
    config: SessionConfig,
    phase: Phase,
    hint_revealed: bool,
    torn_down: bool,
    round: Option<Round>,
    failure: Option<String>,
    clock: ProgressClock,
    hint: HintScheduler,
    video: V,
    attempts: VecDeque<Attempt>,
    attempt_count: usize,
}

impl<V: VideoSurface> SessionController<V> {
    /// Creates an idle session that will play on `video`
    pub fn new(config: SessionConfig, video: V) -> Self {
        let id = SessionId::new();
        Self {
            id,
            config,
            phase: Phase::Idle,
            hint_revealed: false,
            torn_down: false,
            round: None,
            failure: None,
            clock: ProgressClock::new(id, config.tick),
            hint: HintScheduler::new(id),
            video,
            attempts: VecDeque::new(),
            attempt_count: 0,
        }
    }

    /// Identifier stamped on every alarm this session schedules
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Configuration the session runs with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The video surface driven by this session
    pub fn video(&self) -> &V {
        &self.video
    }

    /// The round being played, once loaded
    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// The most recent chat answers passed on for verification, oldest first
    pub fn attempts(&self) -> &VecDeque<Attempt> {
        &self.attempts
    }

    /// Number of chat answers passed on for verification over the session
    pub fn attempt_count(&self) -> usize {
        self.attempt_count
    }

    /// Current progress of the clock
    pub fn progress(&self) -> Progress {
        self.clock.progress()
    }

    /// Playback time counted so far
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Current observable state
    pub fn state(&self) -> SessionState {
        SessionState {
            phase: self.phase,
            hint_revealed: self.hint_revealed,
        }
    }

    fn is_live(&self) -> bool {
        !self.torn_down && matches!(self.phase, Phase::Playing | Phase::Paused)
    }

    /// Leaves `Idle` and asks for the current round
    ///
    /// Calling this on a session that already started does nothing.
    pub fn start<T: Tunnel>(&mut self, tunnel: &T) {
        if self.phase != Phase::Idle || self.torn_down {
            return;
        }
        self.phase = Phase::Loading;
        info!(session = %self.id, "loading round");
        tunnel.send_message(&UpdateMessage::Loading.into());
        tunnel.request(Request::FetchRound);
    }

    /// Handles an incoming message
    ///
    /// # Arguments
    ///
    /// * `message` - The message to process
    /// * `now` - When the message is being processed
    /// * `schedule_message` - Function to schedule alarms
    /// * `tunnel` - Destination of updates and backend requests
    pub fn receive_message<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: IncomingMessage,
        now: Instant,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        if self.torn_down {
            debug!(session = %self.id, ?message, "ignoring message after teardown");
            return;
        }

        match message {
            IncomingMessage::Backend(Response::Round(result)) if self.phase == Phase::Loading => {
                match result {
                    Ok(round) => self.begin_round(round, now, &mut schedule_message, tunnel),
                    Err(message) => self.fail(message, tunnel),
                }
            }
            IncomingMessage::Host(HostMessage::TogglePlayback) if self.is_live() => {
                self.toggle_playback(now, &mut schedule_message, tunnel);
            }
            IncomingMessage::Chat(answer) if self.is_live() => {
                if let Err(report) = answer.validate() {
                    debug!(session = %self.id, %report, "dropping invalid chat answer");
                    return;
                }
                if self.attempts.len() == MAX_RECORDED_ATTEMPTS {
                    self.attempts.pop_front();
                }
                self.attempts.push_back(Attempt {
                    answer: answer.clone(),
                    submitted_at: SystemTime::now(),
                });
                self.attempt_count += 1;
                tunnel.request(Request::CheckAnswer(answer));
            }
            IncomingMessage::Backend(Response::AnswerChecked { answer, verdict })
                if self.is_live() =>
            {
                match verdict {
                    Ok(true) => {
                        info!(session = %self.id, username = %answer.username, "correct answer");
                        let winner = Some(answer.username);
                        self.resolve(Outcome::AnsweredCorrectly, winner, now, tunnel);
                    }
                    Ok(false) => {
                        debug!(session = %self.id, username = %answer.username, "incorrect answer");
                    }
                    Err(e) => {
                        warn!(
                            session = %self.id,
                            username = %answer.username,
                            error = %e,
                            "answer check failed, treating as incorrect"
                        );
                    }
                }
            }
            IncomingMessage::Video(VideoEvent::Ended) if self.is_live() => {
                info!(session = %self.id, "clip ended");
                self.resolve(Outcome::TimedOut, None, now, tunnel);
            }
            message => {
                debug!(session = %self.id, phase = ?self.phase, ?message, "ignoring message");
            }
        }
    }

    /// Handles a scheduled alarm
    ///
    /// Alarms of another session, stale clock generations, cancelled hints
    /// and anything arriving after resolution or teardown are dropped.
    pub fn receive_alarm<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: AlarmMessage,
        now: Instant,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        if message.session() != self.id || !self.is_live() {
            debug!(session = %self.id, ?message, "dropping alarm");
            return;
        }

        match message {
            AlarmMessage::Tick { generation, .. } => {
                match self.clock.receive_tick(generation, now, &mut schedule_message) {
                    Some(ClockEvent::Progress(progress)) => {
                        tunnel.send_message(&UpdateMessage::Progress(progress).into());
                    }
                    Some(ClockEvent::Expired) => self.expire(now, tunnel),
                    None => debug!(session = %self.id, generation, "dropping stale tick"),
                }
            }
            AlarmMessage::RevealHint { token, .. } => {
                if self.hint.fire(token) {
                    self.reveal_hint(tunnel);
                } else {
                    debug!(session = %self.id, token, "dropping stale hint alarm");
                }
            }
        }
    }

    /// Stops every timer and the clip
    ///
    /// Called when the screen goes away. Nothing is observable afterwards,
    /// including alarms whose deadline already passed but that were not yet
    /// delivered.
    pub fn teardown(&mut self, now: Instant) {
        if self.torn_down {
            return;
        }
        self.clock.stop(now);
        self.hint.cancel();
        if self.is_live() {
            self.video.stop();
        }
        self.torn_down = true;
        debug!(session = %self.id, "session torn down");
    }

    /// Returns the message needed to draw the current screen from scratch
    pub fn state_message(&self) -> super::SyncMessage {
        let message = match (&self.round, self.phase) {
            (_, Phase::Failed) => SyncMessage::Failed {
                message: self.failure.clone().unwrap_or_default(),
            },
            (Some(round), phase) => SyncMessage::Round {
                genre: round.genre.clone(),
                hint: round.visible_hint(self.hint_revealed).map(ToOwned::to_owned),
                indicator: Indicator::new(self.clock.progress(), phase == Phase::Playing),
                outcome: match phase {
                    Phase::Resolved(outcome) => Some(outcome),
                    _ => None,
                },
            },
            (None, _) => SyncMessage::Loading,
        };
        message.into()
    }

    fn begin_round<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        round: Round,
        now: Instant,
        mut schedule_message: S,
        tunnel: &T,
    ) {
        info!(
            session = %self.id,
            round = round.id,
            genre = %round.genre,
            "round loaded, starting playback"
        );

        self.phase = Phase::Playing;
        self.video.start(&round.youtube_url);
        self.clock.start(self.config.duration, now, &mut schedule_message);
        self.hint.arm(self.config.hint_delay, &mut schedule_message);

        tunnel.send_message(
            &UpdateMessage::RoundStarted {
                genre: round.genre.clone(),
                duration: self.config.duration,
            }
            .into(),
        );
        tunnel.send_message(&UpdateMessage::Progress(Progress::ZERO).into());

        self.round = Some(round);
    }

    fn fail<T: Tunnel>(&mut self, message: String, tunnel: &T) {
        error!(session = %self.id, error = %message, "failed to load the round");
        self.phase = Phase::Failed;
        self.failure = Some(message.clone());
        tunnel.send_message(&UpdateMessage::LoadFailed { message }.into());
    }

    fn toggle_playback<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        now: Instant,
        schedule_message: S,
        tunnel: &T,
    ) {
        match self.phase {
            Phase::Playing => {
                self.clock.stop(now);
                self.video.pause();
                self.phase = Phase::Paused;
                info!(session = %self.id, elapsed = ?self.clock.elapsed(), "paused");
                tunnel.send_message(&UpdateMessage::Playback { playing: false }.into());
            }
            Phase::Paused => {
                let resumed = match self.config.resume {
                    ResumePolicy::Continue => self.clock.resume(now, schedule_message),
                    ResumePolicy::Restart => self.clock.restart(now, schedule_message),
                };
                if !resumed {
                    return;
                }
                self.video.resume();
                self.phase = Phase::Playing;
                info!(session = %self.id, elapsed = ?self.clock.elapsed(), "resumed");
                tunnel.send_message(&UpdateMessage::Playback { playing: true }.into());
                tunnel.send_message(&UpdateMessage::Progress(self.clock.progress()).into());
            }
            _ => {}
        }
    }

    fn reveal_hint<T: Tunnel>(&mut self, tunnel: &T) {
        self.hint_revealed = true;
        let hint = self
            .round
            .as_ref()
            .and_then(|round| round.visible_hint(true))
            .map(ToOwned::to_owned);
        info!(session = %self.id, has_text = hint.is_some(), "hint revealed");
        tunnel.send_message(&UpdateMessage::HintRevealed { hint }.into());
        tunnel.request(Request::NotifyHint);
    }

    fn expire<T: Tunnel>(&mut self, now: Instant, tunnel: &T) {
        // a reveal due at the same instant as expiry must still precede it
        if self.hint.flush() {
            self.reveal_hint(tunnel);
        }
        tunnel.send_message(&UpdateMessage::Progress(Progress::COMPLETE).into());
        self.resolve(Outcome::TimedOut, None, now, tunnel);
    }

    fn resolve<T: Tunnel>(
        &mut self,
        outcome: Outcome,
        winner: Option<String>,
        now: Instant,
        tunnel: &T,
    ) {
        if !self.is_live() {
            return;
        }

        self.clock.stop(now);
        self.hint.cancel();
        self.video.stop();
        self.phase = Phase::Resolved(outcome);

        info!(session = %self.id, ?outcome, "session resolved");
        tunnel.send_message(&UpdateMessage::Resolved { outcome, winner }.into());

        let next = match outcome {
            Outcome::AnsweredCorrectly => Some(Screen::Answer),
            Outcome::TimedOut => self.config.timeout_screen,
        };
        if let Some(screen) = next {
            tunnel.send_message(&screen.into());
        }
    }
}
