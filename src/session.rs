//! Session runtime - executes controller effects on a single-threaded loop
//!
//! Every event (transcript, timer fire, lookup completion) is handled to
//! completion before the next one is taken, so the controller needs no locks.
//! Timers and provider calls run as tasks that post back into the same queue.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::controller::{Effect, Event, PresentationController};
use crate::provider::DefinitionProvider;
use crate::render::Surface;
use crate::transcript::TranscriptEvent;

pub enum SessionEvent {
    Reader(Event),
    /// Ctrl-C or an embedding application asked to stop
    Interrupted,
}

pub struct Session<S: Surface> {
    controller: PresentationController,
    surface: S,
    provider: Arc<dyn DefinitionProvider>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    event_rx: mpsc::UnboundedReceiver<SessionEvent>,
    timer: Option<JoinHandle<()>>,
}

impl<S: Surface> Session<S> {
    pub fn new(
        controller: PresentationController,
        surface: S,
        provider: Arc<dyn DefinitionProvider>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            controller,
            surface,
            provider,
            event_tx,
            event_rx,
            timer: None,
        }
    }

    /// Handle for posting events from outside the loop
    pub fn sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.event_tx.clone()
    }

    pub fn controller(&self) -> &PresentationController {
        &self.controller
    }

    /// Carry out effects. Spawns tasks, so it must run inside the runtime.
    pub fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render(render) => {
                    if let Err(e) = self.surface.render(&render) {
                        tracing::warn!(error = %e, "render failed");
                    }
                }
                Effect::Schedule(timer) => {
                    if let Some(previous) = self.timer.take() {
                        previous.abort();
                    }
                    let tx = self.event_tx.clone();
                    self.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(timer.delay).await;
                        let _ = tx.send(SessionEvent::Reader(Event::Timer(timer.fire())));
                    }));
                }
                Effect::Lookup { id, query } => {
                    let request = self.provider.define(&query);
                    let tx = self.event_tx.clone();
                    tokio::spawn(async move {
                        let result = request.await;
                        let _ = tx.send(SessionEvent::Reader(Event::LookupFinished { id, result }));
                    });
                }
            }
        }
    }

    /// Run until interrupted, or until transcript input has closed and no
    /// timer chain or lookup is outstanding. Returns the surface.
    pub async fn run(mut self, transcripts: flume::Receiver<TranscriptEvent>) -> S {
        let mut input_open = true;

        loop {
            if !input_open && !self.controller.has_pending_work() {
                tracing::debug!("input closed and nothing pending");
                break;
            }

            tokio::select! {
                biased;

                Some(event) = self.event_rx.recv() => match event {
                    SessionEvent::Interrupted => {
                        tracing::info!("interrupted");
                        break;
                    }
                    SessionEvent::Reader(event) => {
                        let effects = self.controller.handle(event);
                        self.apply(effects);
                    }
                },

                transcript = transcripts.recv_async(), if input_open => match transcript {
                    Ok(transcript) => {
                        let effects = self.controller.handle(Event::Transcript(transcript));
                        self.apply(effects);
                    }
                    Err(_) => input_open = false,
                },
            }
        }

        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.surface
    }
}
