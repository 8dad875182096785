//! One-shot steno solve driver.
//!
//! Reads the steno from argv, the configuration from `STENO_*` environment
//! variables, and prints progress through tracing. A checkpoint file is
//! loaded before the solve when the steno resumes (`$`/chunk prefix) and
//! written back after a `$` snapshot.
//!
//! Usage: steno-solve "<steno>"

use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::info;

use steno_solver::message::{Message, MessageSink, TracingSink};
use steno_solver::{parse_limit, parse_vocabulary, SolverConfig, StartPosition, Solver};

/// Tees `Status` lines into the configured output file.
struct FileEcho {
    inner: TracingSink,
    path: PathBuf,
}

impl MessageSink for FileEcho {
    fn send(&self, message: Message) {
        if let Message::Status(text) = &message {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&self.path) {
                let _ = writeln!(file, "{text}");
            }
        }
        self.inner.send(message);
    }
}

fn config_from_env() -> anyhow::Result<SolverConfig> {
    let mut config = SolverConfig::default();
    if let Ok(value) = env::var("STENO_VOCABULARY") {
        config.vocabulary = parse_vocabulary(&value)?;
    }
    if let Ok(value) = env::var("STENO_MAX_POSITIONS") {
        config.max_positions_to_examine = parse_limit(&value)?;
    }
    if let Ok(value) = env::var("STENO_MAX_COOKS") {
        config.max_cooks_to_keep = parse_limit(&value)? as usize;
    }
    if let Ok(value) = env::var("STENO_TASKS") {
        config.max_solver_tasks = value
            .parse()
            .with_context(|| format!("STENO_TASKS `{value}`"))?;
    }
    if let Ok(value) = env::var("STENO_MAX_SOLUTIONS") {
        config.max_solutions_to_list = value
            .parse()
            .with_context(|| format!("STENO_MAX_SOLUTIONS `{value}`"))?;
    }
    config.display_positions = env::var("STENO_DISPLAY_POSITIONS").is_ok();
    config.show_meta_marks = env::var("STENO_SHOW_META").is_ok();
    if let Ok(value) = env::var("STENO_ALLOW_CHUNKING") {
        config.allow_chunking = value != "0" && !value.eq_ignore_ascii_case("false");
    }
    if let Ok(value) = env::var("STENO_START_FEN") {
        config.start = StartPosition::parse(&value)?;
    }
    if let Ok(value) = env::var("STENO_OUTPUT_FILE") {
        config.output_file = Some(PathBuf::from(value));
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let steno = match env::args().nth(1) {
        Some(steno) => steno,
        None => bail!("usage: steno-solve \"<steno>\""),
    };

    let config = config_from_env()?;
    let sink: Arc<dyn MessageSink> = match &config.output_file {
        Some(path) => Arc::new(FileEcho {
            inner: TracingSink,
            path: path.clone(),
        }),
        None => Arc::new(TracingSink),
    };

    let solver = Solver::new(config, sink)?;

    let checkpoint_file = env::var("STENO_CHECKPOINT_FILE").ok().map(PathBuf::from);
    if let Some(path) = &checkpoint_file {
        if path.exists() {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading checkpoint {}", path.display()))?;
            solver.load_checkpoint(bytes)?;
            info!(path = %path.display(), "checkpoint loaded");
        }
    }

    let outcome = solver.solve(&steno)?;
    info!(
        positions = outcome.positions.len(),
        examined = outcome.examined,
        "done"
    );

    if let (Some(path), Some(bytes)) = (&checkpoint_file, solver.checkpoint_bytes()) {
        std::fs::write(path, bytes)
            .with_context(|| format!("writing checkpoint {}", path.display()))?;
        info!(path = %path.display(), "checkpoint written");
    }

    Ok(())
}
