//! Presentation controller - the reader's state machine
//!
//! All mutation goes through [`PresentationController::handle`]. The
//! controller never sleeps, draws or performs I/O; it answers each event with
//! a list of [`Effect`]s for the runtime to carry out. Timer effects carry the
//! scheduler token that was current when they were issued, so a fire that
//! arrives after a navigation command is recognised as stale and ignored.

use std::time::Duration;

use crate::chunker::{Chunk, ChunkPolicy};
use crate::command::{Command, CommandRouter, Intent};
use crate::config::ReaderConfig;
use crate::error::{ConfigError, DocumentLoadError, LookupError};
use crate::lookup::{self, LookupSession};
use crate::render::{Render, RenderKind, RenderOptions, chunk_content};
use crate::scheduler::{Fire, ScheduleToken, Scheduler, Timer, TimerKind};
use crate::source::TextSource;
use crate::state::{Mode, ReaderState, Snapshot, Timing};
use crate::transcript::TranscriptEvent;

const INTRO_NOTICE: &str =
    "Starting text presentation. Auto-advancing through chunks. Say 'stop' to pause.";
const LOADED_NOTICE: &str = "Text loaded. Say 'auto' to start auto-advancing.";
const AUTO_NOTICE: &str = "Auto-advancing through text. Say 'pause' to stop.";
const PAUSE_NOTICE: &str =
    "Text reading paused. Now in transcription mode. Say 'resume text' to continue reading.";
const RESUME_NOTICE: &str =
    "Resuming text reading from where you left off. Auto-advancing enabled.";
const END_NOTICE: &str = "End of document reached.";
const START_NOTICE: &str = "Already at the beginning of document.";
const PAUSED_AFTER_LOOKUP_NOTICE: &str =
    "Back in transcription mode. Say 'resume text' to continue reading.";

const LONG_NOTICE_MS: u64 = 5000;
const NOTICE_MS: u64 = 3000;

/// Something the runtime must do on the controller's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Render(Render),
    /// Arm a timer. Replaces whatever timer is armed.
    Schedule(Timer),
    /// Ask the definition provider; answer with [`Event::LookupFinished`]
    Lookup { id: u64, query: String },
}

#[derive(Debug)]
pub enum Event {
    Transcript(TranscriptEvent),
    Timer(Fire),
    LookupFinished {
        id: u64,
        result: Result<String, LookupError>,
    },
}

#[derive(Debug)]
enum Phase {
    Reading(Mode),
    Lookup(LookupSession),
}

pub struct PresentationController {
    document: Vec<Chunk>,
    index: usize,
    phase: Phase,
    timing: Timing,
    scheduler: Scheduler,
    router: CommandRouter,
    config: ReaderConfig,
    next_lookup_id: u64,
    effects: Vec<Effect>,
}

impl PresentationController {
    pub fn new(config: &ReaderConfig, router: CommandRouter) -> Result<Self, ConfigError> {
        Ok(Self {
            document: Vec::new(),
            index: 0,
            phase: Phase::Reading(Mode::Idle),
            timing: Timing::from_config(config)?,
            scheduler: Scheduler::new(),
            router,
            config: config.clone(),
            next_lookup_id: 1,
            effects: Vec::new(),
        })
    }

    /// Replace the document with `text` chunked by `policy`
    pub fn load(&mut self, text: &str, policy: &dyn ChunkPolicy) -> Vec<Effect> {
        let chunks = policy.chunk(text);
        if chunks.is_empty() {
            return self.load_failed(&DocumentLoadError::Empty);
        }

        tracing::info!(
            chars = text.chars().count(),
            chunks = chunks.len(),
            "document loaded"
        );
        self.scheduler.stop();
        self.document = chunks;
        self.index = 0;
        self.phase = Phase::Reading(Mode::Presenting);

        if self.config.autoplay {
            self.notice(INTRO_NOTICE, LONG_NOTICE_MS);
            self.start();
        } else {
            self.notice(LOADED_NOTICE, LONG_NOTICE_MS);
            self.render_chunk();
        }
        self.take_effects()
    }

    /// Reset to an empty document and tell the reader why
    pub fn load_failed(&mut self, err: &DocumentLoadError) -> Vec<Effect> {
        tracing::warn!(error = %err, "document load failed");
        self.scheduler.stop();
        self.document.clear();
        self.index = 0;
        self.phase = Phase::Reading(Mode::Idle);
        self.notice(&format!("Error loading text: {}", err), LONG_NOTICE_MS);
        self.take_effects()
    }

    pub fn open(&mut self, source: &dyn TextSource, policy: &dyn ChunkPolicy) -> Vec<Effect> {
        match source.read_text() {
            Ok(text) => self.load(&text, policy),
            Err(err) => self.load_failed(&err),
        }
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Transcript(transcript) => self.on_transcript(transcript),
            Event::Timer(fire) => self.on_timer(fire),
            Event::LookupFinished { id, result } => self.on_lookup_finished(id, result),
        }
        self.take_effects()
    }

    pub fn state(&self) -> ReaderState {
        match &self.phase {
            Phase::Reading(Mode::Idle) => ReaderState::Idle,
            Phase::Reading(Mode::Presenting) => ReaderState::Presenting {
                auto_advancing: self.scheduler.is_auto_advancing(),
            },
            Phase::Reading(Mode::CommandMode) => ReaderState::CommandMode,
            Phase::Lookup(session) => ReaderState::LookupActive(session.snapshot()),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn chunk_count(&self) -> usize {
        self.document.len()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.document
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn is_auto_advancing(&self) -> bool {
        self.scheduler.is_auto_advancing()
    }

    pub fn lookup(&self) -> Option<&LookupSession> {
        match &self.phase {
            Phase::Lookup(session) => Some(session),
            Phase::Reading(_) => None,
        }
    }

    /// Display text for chunk `index`, with its progress line
    pub fn content_for(&self, index: usize) -> Option<String> {
        self.document
            .get(index)
            .map(|chunk| chunk_content(chunk, self.document.len()))
    }

    /// A timer chain or a provider call is still outstanding
    pub fn has_pending_work(&self) -> bool {
        self.scheduler.is_auto_advancing() || self.lookup().is_some_and(LookupSession::is_pending)
    }

    // ------------------------------------------------------------------
    // Transcripts
    // ------------------------------------------------------------------

    fn on_transcript(&mut self, transcript: TranscriptEvent) {
        let scope = self.state().scope();

        if !transcript.is_final {
            let text = transcript.text.trim();
            if !matches!(self.phase, Phase::Reading(Mode::Presenting)) && !text.is_empty() {
                self.caption(text, RenderOptions::sticky());
            }
            return;
        }

        let command = self.router.command(&transcript.text, true, scope);
        tracing::debug!(intent = %command.intent, text = %command.raw_text, "command");

        if matches!(self.phase, Phase::Lookup(_)) {
            self.on_lookup_command(command);
            return;
        }

        match command.intent {
            Intent::EnterLookup => self.enter_lookup(&command.raw_text),
            Intent::ResumeFromCommandMode => self.resume_reading(),
            Intent::None => {
                if !matches!(self.phase, Phase::Reading(Mode::Presenting)) {
                    let text = command.raw_text.trim();
                    if !text.is_empty() {
                        self.caption(text, RenderOptions::timed(self.config.caption_ms));
                    }
                }
            }
            // Lookup vocabulary never reaches here outside lookup
            Intent::LookupCancel => {}
            intent if self.document.is_empty() => {
                tracing::debug!(%intent, "no document, ignoring");
            }
            Intent::StartAuto => {
                self.notice(AUTO_NOTICE, NOTICE_MS);
                self.start();
            }
            Intent::SpeedUp => self.adjust_speed(true),
            Intent::SlowDown => self.adjust_speed(false),
            Intent::Next => {
                self.scheduler.stop();
                if self.index + 1 >= self.document.len() {
                    self.notice(END_NOTICE, NOTICE_MS);
                } else {
                    self.index += 1;
                    self.render_chunk();
                }
            }
            Intent::Previous => {
                self.scheduler.stop();
                if self.index == 0 {
                    self.notice(START_NOTICE, NOTICE_MS);
                } else {
                    self.index -= 1;
                    self.render_chunk();
                }
            }
            Intent::Restart => {
                self.scheduler.stop();
                self.index = 0;
                self.render_chunk();
            }
            Intent::Stop => {
                self.scheduler.stop();
                tracing::info!(chunk = self.index + 1, "auto-advance stopped");
                self.phase = Phase::Reading(Mode::CommandMode);
                self.notice(PAUSE_NOTICE, LONG_NOTICE_MS);
            }
        }
    }

    fn resume_reading(&mut self) {
        if self.document.is_empty() {
            return;
        }
        self.phase = Phase::Reading(Mode::Presenting);
        self.notice(RESUME_NOTICE, NOTICE_MS);
        self.start();
    }

    fn adjust_speed(&mut self, faster: bool) {
        let before = self.timing.speed_ms();
        let changed = if faster {
            self.timing.speed_up()
        } else {
            self.timing.slow_down()
        };

        if !changed {
            let bound = if faster { "fastest" } else { "slowest" };
            self.notice(
                &format!("Already at the {} reading speed.", bound),
                self.config.speed_notice_ms,
            );
            return;
        }

        let direction = if faster { "increased" } else { "decreased" };
        let message = format!(
            "Reading speed {}. Now showing each chunk for {:.1} seconds.",
            direction,
            self.timing.speed_ms() as f64 / 1000.0
        );
        self.notice(&message, self.config.speed_notice_ms);
        tracing::info!(
            from_ms = before,
            to_ms = self.timing.speed_ms(),
            overlap_ms = self.timing.overlap_ms(),
            "reading speed adjusted"
        );

        if self.scheduler.is_auto_advancing() {
            let token = self.scheduler.reschedule();
            self.schedule(
                token,
                TimerKind::Resume,
                Duration::from_millis(self.config.speed_notice_ms),
            );
        }
    }

    // ------------------------------------------------------------------
    // Pacing
    // ------------------------------------------------------------------

    /// Start a fresh auto-advance chain from the current chunk
    fn start(&mut self) {
        let token = self.scheduler.start();
        self.render_chunk();
        self.schedule_advance(token);
    }

    fn schedule_advance(&mut self, token: ScheduleToken) {
        if self.index + 1 < self.document.len() {
            self.schedule(token, TimerKind::Advance, self.timing.overlap());
        } else {
            self.scheduler.stop();
            tracing::info!(chunk = self.index + 1, "auto-advance reached the last chunk");
        }
    }

    fn on_timer(&mut self, fire: Fire) {
        if !self.scheduler.accepts(fire.token) {
            tracing::trace!(?fire, "stale timer");
            return;
        }
        if !matches!(self.phase, Phase::Reading(Mode::Presenting)) {
            return;
        }

        match fire.kind {
            TimerKind::Advance => {
                if self.index + 1 < self.document.len() {
                    self.index += 1;
                    self.render_chunk();
                }
                self.schedule_advance(fire.token);
            }
            TimerKind::Resume => self.start(),
        }
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn enter_lookup(&mut self, raw_text: &str) {
        let query = self.router.wake().detect(raw_text).unwrap_or_default();

        match &mut self.phase {
            Phase::Lookup(session) => session.rearm(),
            Phase::Reading(mode) => {
                let snapshot = Snapshot {
                    mode: *mode,
                    index: self.index,
                };
                self.scheduler.stop();
                tracing::info!(?snapshot, "entering lookup");
                self.phase = Phase::Lookup(LookupSession::new(snapshot));
            }
        }

        if query.is_empty() {
            let prompt = lookup::prompt_content(self.router.wake().phrase());
            self.notice_with(&prompt, RenderOptions::sticky());
        } else {
            self.submit_query(&query);
        }
    }

    fn on_lookup_command(&mut self, command: Command) {
        match command.intent {
            Intent::EnterLookup => self.enter_lookup(&command.raw_text),
            Intent::LookupCancel => self.exit_lookup(),
            _ => {
                let awaiting = self.lookup().is_some_and(LookupSession::awaiting_query);
                if awaiting {
                    self.submit_query(&command.raw_text);
                } else {
                    self.notice(lookup::reminder_content(), NOTICE_MS);
                }
            }
        }
    }

    fn submit_query(&mut self, query: &str) {
        let id = self.next_lookup_id;
        let Phase::Lookup(session) = &mut self.phase else {
            return;
        };
        if !session.begin(id, query) {
            return;
        }
        self.next_lookup_id += 1;

        let query = query.trim().to_string();
        tracing::info!(id, query = %query, "lookup issued");
        self.notice_with(&lookup::pending_content(&query), RenderOptions::sticky());
        self.effects.push(Effect::Lookup { id, query });
    }

    fn on_lookup_finished(&mut self, id: u64, result: Result<String, LookupError>) {
        let Phase::Lookup(session) = &mut self.phase else {
            tracing::debug!(id, "lookup finished after session closed");
            return;
        };

        match &result {
            Ok(_) => tracing::info!(id, "lookup completed"),
            Err(e) => tracing::warn!(id, error = %e, "lookup failed"),
        }
        match session.complete(id, result.map_err(|e| e.to_string())) {
            Some(content) => self.notice_with(&content, RenderOptions::sticky()),
            None => tracing::debug!(id, "stale lookup result dropped"),
        }
    }

    fn exit_lookup(&mut self) {
        let Phase::Lookup(session) = &self.phase else {
            return;
        };
        let Snapshot { mode, index } = session.snapshot();
        tracing::info!(%mode, chunk = index + 1, "leaving lookup");

        self.index = index;
        self.phase = Phase::Reading(mode);
        match mode {
            Mode::Presenting => self.start(),
            Mode::CommandMode => self.notice(PAUSED_AFTER_LOOKUP_NOTICE, NOTICE_MS),
            Mode::Idle => {}
        }
    }

    // ------------------------------------------------------------------
    // Effects
    // ------------------------------------------------------------------

    fn render_chunk(&mut self) {
        let Some(content) = self.content_for(self.index) else {
            return;
        };
        tracing::debug!(chunk = self.index + 1, total = self.document.len(), "displaying chunk");
        self.effects.push(Effect::Render(Render {
            content,
            options: RenderOptions::chunk(self.timing.speed_ms()),
            kind: RenderKind::Chunk { index: self.index },
        }));
    }

    fn notice(&mut self, text: &str, duration_ms: u64) {
        self.notice_with(text, RenderOptions::timed(duration_ms));
    }

    fn notice_with(&mut self, text: &str, options: RenderOptions) {
        self.effects.push(Effect::Render(Render {
            content: text.to_string(),
            options,
            kind: RenderKind::Notice,
        }));
    }

    fn caption(&mut self, text: &str, options: RenderOptions) {
        self.effects.push(Effect::Render(Render {
            content: text.to_string(),
            options,
            kind: RenderKind::Caption,
        }));
    }

    fn schedule(&mut self, token: ScheduleToken, kind: TimerKind, delay: Duration) {
        self.effects
            .push(Effect::Schedule(Timer { token, kind, delay }));
    }

    fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }
}
