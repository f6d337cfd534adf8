//! Session loop on a paused clock with in-memory surface and provider

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::time::{Instant, sleep};

use lector::chunker::CharWindow;
use lector::command::CommandRouter;
use lector::config::ReaderConfig;
use lector::controller::PresentationController;
use lector::error::LookupError;
use lector::provider::DefinitionProvider;
use lector::render::{Render, RenderKind, Surface};
use lector::session::{Session, SessionEvent};
use lector::transcript::TranscriptEvent;

const TEXT: &str = "One fish swims here. Two fish swim there. Red fish sleep now.";

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Render>>>);

impl Recorder {
    fn renders(&self) -> Vec<Render> {
        self.0.lock().unwrap().clone()
    }

    fn chunk_indices(&self) -> Vec<usize> {
        self.renders()
            .iter()
            .filter_map(|r| match r.kind {
                RenderKind::Chunk { index } => Some(index),
                _ => None,
            })
            .collect()
    }
}

impl Surface for Recorder {
    fn render(&mut self, render: &Render) -> io::Result<()> {
        self.0.lock().unwrap().push(render.clone());
        Ok(())
    }
}

/// Answers after a fixed delay
struct SlowDictionary {
    delay: Duration,
}

impl DefinitionProvider for SlowDictionary {
    fn define(&self, query: &str) -> BoxFuture<'static, Result<String, LookupError>> {
        let delay = self.delay;
        let answer = format!("definition of {}", query);
        async move {
            sleep(delay).await;
            Ok(answer)
        }
        .boxed()
    }
}

fn session(recorder: &Recorder) -> Session<Recorder> {
    let mut controller =
        PresentationController::new(&ReaderConfig::default(), CommandRouter::default()).unwrap();
    let effects = controller.load(TEXT, &CharWindow::new(22, 0).unwrap());
    let provider = Arc::new(SlowDictionary {
        delay: Duration::from_millis(500),
    });
    let mut session = Session::new(controller, recorder.clone(), provider);
    session.apply(effects);
    session
}

#[tokio::test(start_paused = true)]
async fn test_runs_to_end_of_document_after_input_closes() {
    let recorder = Recorder::default();
    let session = session(&recorder);
    let (tx, rx) = flume::unbounded::<TranscriptEvent>();
    drop(tx);

    let started = Instant::now();
    session.run(rx).await;
    let elapsed = started.elapsed();

    assert_eq!(recorder.chunk_indices(), vec![0, 1, 2]);
    assert!(elapsed >= Duration::from_millis(3600), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3700), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_lookup_round_trip_resumes_reading() {
    let recorder = Recorder::default();
    let session = session(&recorder);
    let (tx, rx) = flume::unbounded();

    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        let _ = tx.send(TranscriptEvent::final_text("hey reader"));
        sleep(Duration::from_millis(100)).await;
        let _ = tx.send(TranscriptEvent::interim("ephem"));
        let _ = tx.send(TranscriptEvent::final_text("ephemeral"));
        // Provider answers after 500ms
        sleep(Duration::from_millis(1000)).await;
        let _ = tx.send(TranscriptEvent::final_text("continue reading"));
    });

    session.run(rx).await;

    let renders = recorder.renders();
    assert!(renders.iter().any(|r| r.kind == RenderKind::Caption && r.content == "ephem"));
    assert!(renders.iter().any(|r| {
        r.content == "ephemeral\n\ndefinition of ephemeral\n\nSay 'continue reading' to resume."
    }));
    // The first chain died in lookup; reading restarted at the same chunk
    assert_eq!(recorder.chunk_indices(), vec![0, 0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_speed_change_resumes_after_notice() {
    let recorder = Recorder::default();
    let session = session(&recorder);
    let (tx, rx) = flume::unbounded();

    tokio::spawn(async move {
        sleep(Duration::from_millis(100)).await;
        let _ = tx.send(TranscriptEvent::final_text("slower"));
    });

    let started = Instant::now();
    session.run(rx).await;
    let elapsed = started.elapsed();

    let chunks: Vec<Render> = recorder
        .renders()
        .into_iter()
        .filter(|r| matches!(r.kind, RenderKind::Chunk { .. }))
        .collect();
    let indices: Vec<usize> = recorder.chunk_indices();
    assert_eq!(indices, vec![0, 0, 1, 2]);
    assert_eq!(chunks[1].options.duration_ms, Some(5500));

    // 100ms, then the 2s notice, then two advances of 5300ms
    let expected = Duration::from_millis(100 + 2000 + 2 * 5300);
    assert!(elapsed >= expected, "{elapsed:?}");
    assert!(elapsed < expected + Duration::from_millis(100), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_stops_session() {
    let recorder = Recorder::default();
    let session = session(&recorder);
    let interrupt = session.sender();
    // Keep input open so only the interrupt can end the loop
    let (_tx, rx) = flume::unbounded::<TranscriptEvent>();

    tokio::spawn(async move {
        sleep(Duration::from_millis(50)).await;
        let _ = interrupt.send(SessionEvent::Interrupted);
    });

    let started = Instant::now();
    session.run(rx).await;
    assert!(started.elapsed() < Duration::from_millis(1800));
    assert_eq!(recorder.chunk_indices(), vec![0]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_session_once_input_closes() {
    let recorder = Recorder::default();
    let session = session(&recorder);
    let (tx, rx) = flume::unbounded();

    tx.send(TranscriptEvent::final_text("stop")).unwrap();
    drop(tx);

    session.run(rx).await;
    assert_eq!(recorder.chunk_indices(), vec![0]);
    assert!(recorder.renders().iter().any(|r| r.content.starts_with("Text reading paused.")));
}
