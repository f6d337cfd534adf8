use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use lector::chunker::ChunkPolicy;
use lector::command::CommandRouter;
use lector::config::{ChunkingConfig, Config, PolicyKind};
use lector::controller::PresentationController;
use lector::provider;
use lector::render::{TerminalSurface, chunk_content};
use lector::session::{Session, SessionEvent};
use lector::source::{FileSource, TextSource};
use lector::transcript;

#[derive(Parser)]
#[command(name = "lector", about = "Paced, voice-controlled document reader")]
struct Cli {
    /// Config file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Present a document; transcripts are read from stdin, one per line
    Read {
        file: PathBuf,
        /// Display time per chunk in milliseconds
        #[arg(long)]
        speed_ms: Option<u64>,
        #[command(flatten)]
        chunking: ChunkingArgs,
    },
    /// Print the chunks a document splits into
    Chunk {
        file: PathBuf,
        #[command(flatten)]
        chunking: ChunkingArgs,
    },
}

#[derive(Args)]
struct ChunkingArgs {
    /// Characters per chunk (window policy)
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Characters shared between neighbouring chunks (window policy)
    #[arg(long)]
    overlap: Option<usize>,
    /// Pack whole sentences up to this many words instead of a character window
    #[arg(long)]
    words: Option<usize>,
}

impl ChunkingArgs {
    fn apply(&self, config: &mut ChunkingConfig) {
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(overlap) = self.overlap {
            config.overlap = overlap;
        }
        if let Some(words) = self.words {
            config.policy = PolicyKind::Sentences;
            config.target_words = words;
        }
    }
}

#[hotpath::main]
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lector=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;

    match cli.command {
        Command::Read {
            file,
            speed_ms,
            chunking,
        } => {
            if let Some(speed_ms) = speed_ms {
                config.reader.speed_ms = speed_ms;
            }
            chunking.apply(&mut config.chunking);
            run_read(file, config)
        }
        Command::Chunk { file, chunking } => {
            chunking.apply(&mut config.chunking);
            run_chunk(file, &config.chunking)
        }
    }
}

fn run_read(file: PathBuf, config: Config) -> anyhow::Result<()> {
    let policy = config.chunking.policy()?;
    let router = CommandRouter::new(&config.commands);
    let mut controller = PresentationController::new(&config.reader, router)?;
    let provider = provider::from_config(&config.lookup);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    let transcripts = transcript::spawn_reader(io::BufReader::new(io::stdin()));

    runtime.block_on(async move {
        let effects = controller.open(&FileSource::new(&file), policy.as_ref());
        let mut session = Session::new(controller, TerminalSurface::stdout(), provider);

        let interrupt = session.sender();
        ctrlc::set_handler(move || {
            let _ = interrupt.send(SessionEvent::Interrupted);
        })?;

        session.apply(effects);
        session.run(transcripts).await;
        Ok::<_, anyhow::Error>(())
    })
}

fn run_chunk(file: PathBuf, chunking: &ChunkingConfig) -> anyhow::Result<()> {
    let policy: Box<dyn ChunkPolicy> = chunking.policy()?;
    let text = FileSource::new(&file).read_text()?;
    let chunks = policy.chunk(&text);

    for chunk in &chunks {
        println!("{}", chunk_content(chunk, chunks.len()));
        println!("{}", "-".repeat(40));
    }
    tracing::info!(chunks = chunks.len(), "done");
    Ok(())
}
