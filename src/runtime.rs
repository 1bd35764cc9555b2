//! Async driver for a session controller
//!
//! [`spawn`] moves a [`SessionController`] onto its own tokio task. Timer
//! expirations, host input, chat answers, clip completion and backend
//! results all arrive on one channel and are applied strictly in arrival
//! order. Timers and backend calls run as child tasks in a [`JoinSet`] that
//! is aborted when the session shuts down.

use std::sync::Arc;

use garde::Validate;
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, info, warn};
use web_time::Duration;

use crate::{
    AlarmMessage, SyncMessage, UpdateMessage,
    backend::GameBackend,
    config::SessionConfig,
    controller::{HostMessage, IncomingMessage, SessionController, SessionState},
    session::{ChatAnswer, Request, Response, Tunnel},
    session_id::SessionId,
    video::{VideoEvent, VideoSurface},
};

/// The session task is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("the session has shut down")]
pub struct Closed;

#[derive(Debug)]
enum Event {
    Alarm(AlarmMessage),
    Incoming(IncomingMessage),
    Snapshot(oneshot::Sender<(SessionState, SyncMessage)>),
}

struct ChannelTunnel {
    updates: mpsc::UnboundedSender<UpdateMessage>,
    requests: mpsc::UnboundedSender<Request>,
}

impl Tunnel for ChannelTunnel {
    fn send_message(&self, message: &UpdateMessage) {
        if self.updates.send(message.clone()).is_err() {
            debug!("update receiver dropped");
        }
    }

    fn request(&self, request: Request) {
        let _ = self.requests.send(request);
    }
}

/// Inbound port for a chat integration
///
/// Cheap to clone; every clone feeds the same session.
#[derive(Debug, Clone)]
pub struct AnswerSender {
    events: mpsc::UnboundedSender<Event>,
}

impl AnswerSender {
    /// Submits a chat guess for verification
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the session task has stopped.
    pub fn submit(&self, username: impl AsRef<str>, answer: impl AsRef<str>) -> Result<(), Closed> {
        self.events
            .send(Event::Incoming(ChatAnswer::new(username, answer).into()))
            .map_err(|_| Closed)
    }
}

/// Owner side of a running session
///
/// Dropping the handle shuts the session down.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    events: mpsc::UnboundedSender<Event>,
    updates: mpsc::UnboundedReceiver<UpdateMessage>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Identifier of the running session
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Pauses a playing session or resumes a paused one
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the session task has stopped.
    pub fn toggle_playback(&self) -> Result<(), Closed> {
        self.events
            .send(Event::Incoming(HostMessage::TogglePlayback.into()))
            .map_err(|_| Closed)
    }

    /// Submits a chat guess for verification
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the session task has stopped.
    pub fn submit_answer(
        &self,
        username: impl AsRef<str>,
        answer: impl AsRef<str>,
    ) -> Result<(), Closed> {
        self.answer_sender().submit(username, answer)
    }

    /// Returns a sender that a chat integration can hold on to
    pub fn answer_sender(&self) -> AnswerSender {
        AnswerSender {
            events: self.events.clone(),
        }
    }

    /// Waits for the next screen update
    ///
    /// Returns `None` once the session has shut down and every queued
    /// update was taken.
    pub async fn next_update(&mut self) -> Option<UpdateMessage> {
        self.updates.recv().await
    }

    /// Asks the session for its current state and a full screen description
    ///
    /// The answer reflects every input sent before this call.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] if the session task has stopped.
    pub async fn state(&self) -> Result<(SessionState, SyncMessage), Closed> {
        let (tx, rx) = oneshot::channel();
        self.events.send(Event::Snapshot(tx)).map_err(|_| Closed)?;
        rx.await.map_err(|_| Closed)
    }

    /// Stops the session and waits for its task to finish
    ///
    /// Pending timers and backend calls are aborted.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(session = %self.id, error = %e, "session task did not finish cleanly");
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Starts a session on the current tokio runtime
///
/// The video surface's end-of-clip notification is wired into the session
/// before playback begins.
///
/// # Errors
///
/// Returns the validation report if `config` is out of bounds.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
pub fn spawn<V: VideoSurface + 'static>(
    config: SessionConfig,
    backend: Arc<dyn GameBackend>,
    mut video: V,
) -> Result<SessionHandle, garde::Report> {
    config.validate()?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (updates_tx, updates_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ended = events_tx.clone();
    video.on_ended(Box::new(move || {
        let _ = ended.send(Event::Incoming(VideoEvent::Ended.into()));
    }));

    let controller = SessionController::new(config, video);
    let id = controller.id();
    info!(session = %id, "spawning session");

    let task = tokio::spawn(run(
        controller,
        backend,
        events_tx.clone(),
        events_rx,
        updates_tx,
        shutdown_rx,
    ));

    Ok(SessionHandle {
        id,
        events: events_tx,
        updates: updates_rx,
        shutdown: shutdown_tx,
        task: Some(task),
    })
}

async fn run<V: VideoSurface>(
    mut controller: SessionController<V>,
    backend: Arc<dyn GameBackend>,
    events_tx: mpsc::UnboundedSender<Event>,
    mut events_rx: mpsc::UnboundedReceiver<Event>,
    updates: mpsc::UnboundedSender<UpdateMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = controller.id();
    let (requests_tx, mut requests_rx) = mpsc::unbounded_channel();
    let tunnel = ChannelTunnel {
        updates,
        requests: requests_tx,
    };
    let mut tasks = JoinSet::new();

    controller.start(&tunnel);
    while let Ok(request) = requests_rx.try_recv() {
        dispatch(id, request, &backend, &events_tx, &mut tasks);
    }

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                let now = tokio::time::Instant::now().into_std();
                let schedule_message = |alarm: AlarmMessage, delay: Duration| {
                    schedule(alarm, delay, &events_tx, &mut tasks);
                };
                match event {
                    Event::Alarm(alarm) => {
                        controller.receive_alarm(alarm, now, schedule_message, &tunnel);
                    }
                    Event::Incoming(message) => {
                        controller.receive_message(message, now, schedule_message, &tunnel);
                    }
                    Event::Snapshot(reply) => {
                        let _ = reply.send((controller.state(), controller.state_message()));
                    }
                }
                while let Ok(request) = requests_rx.try_recv() {
                    dispatch(id, request, &backend, &events_tx, &mut tasks);
                }
            }
            Some(result) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = result {
                    warn!(session = %id, error = %e, "session child task failed");
                }
            }
        }
    }

    controller.teardown(tokio::time::Instant::now().into_std());
    tasks.abort_all();
    info!(session = %id, "session shut down");
}

fn schedule(
    alarm: AlarmMessage,
    delay: Duration,
    events: &mpsc::UnboundedSender<Event>,
    tasks: &mut JoinSet<()>,
) {
    let events = events.clone();
    tasks.spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = events.send(Event::Alarm(alarm));
    });
}

fn dispatch(
    session: SessionId,
    request: Request,
    backend: &Arc<dyn GameBackend>,
    events: &mpsc::UnboundedSender<Event>,
    tasks: &mut JoinSet<()>,
) {
    let backend = Arc::clone(backend);
    let events = events.clone();
    match request {
        Request::FetchRound => tasks.spawn(async move {
            let result = backend.current_round().await.map_err(|e| e.to_string());
            let _ = events.send(Event::Incoming(Response::Round(result).into()));
        }),
        Request::NotifyHint => tasks.spawn(async move {
            if let Err(e) = backend.show_hint().await {
                warn!(session = %session, error = %e, "failed to acknowledge the hint");
            }
        }),
        Request::CheckAnswer(answer) => tasks.spawn(async move {
            let verdict = backend
                .check_answer(&answer.username, &answer.answer)
                .await
                .map_err(|e| e.to_string());
            let _ = events.send(Event::Incoming(
                Response::AnswerChecked { answer, verdict }.into(),
            ));
        }),
    };
}
