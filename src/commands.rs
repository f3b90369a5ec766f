use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::chat::{Assistant, ChatSession, PipelineStep, Role, Turn, TurnObserver, TurnStage};
use crate::config::{Config, Credentials};
use crate::embeddings::OpenAiEmbedder;
use crate::generation::GeminiClient;
use crate::index::{self, IndexStatus, ensure_compatible};
use crate::ingest::{FaqRecord, ensure_index, load_faq_records, prepare_vectors};
use crate::{FaqError, Result};

const PREVIEW_ROWS: usize = 5;

/// Load the FAQ dataset, make sure the index exists and upsert every row.
///
/// Returns the number of vectors written.
#[inline]
pub async fn ingest_faq(config: &Config, credentials: &Credentials) -> Result<usize> {
    let records = load_faq_records(&config.ingestion.dataset_path)?;

    println!("Data preview:");
    for line in preview_lines(&records) {
        println!("{}", line);
    }

    let catalog = index::connect(config, credentials).await?;
    let spec = config.index_spec();
    match ensure_index(catalog.as_ref(), &spec).await? {
        IndexStatus::Created => println!("Created index: {}", spec.name),
        IndexStatus::AlreadyExists => println!("Index {} already exists.", spec.name),
    }

    let embedder = OpenAiEmbedder::new(&config.embedding, credentials.openai_api_key.clone())?;
    let index = catalog.open_index(&spec.name).await?;
    ensure_compatible(index.as_ref(), &embedder)?;

    let vectors = prepare_vectors(&records, &embedder)?;
    let written = index.upsert(&vectors).await?;

    info!("Upserted {} vectors into {}", written, spec.name);
    Ok(written)
}

/// Run the interactive chat until `exit`, `quit` or end of input
#[inline]
pub async fn run_chat(config: &Config, credentials: &Credentials) -> Result<()> {
    let embedder = OpenAiEmbedder::new(&config.embedding, credentials.openai_api_key.clone())?;
    let generator = GeminiClient::new(&config.generation, credentials.google_api_key.clone())?;
    let catalog = index::connect(config, credentials).await?;
    let index = catalog.open_index(&config.index.name).await?;
    ensure_compatible(index.as_ref(), &embedder)?;

    let assistant = Assistant::new(
        Arc::new(embedder),
        index,
        Arc::new(generator),
        config.generation.persona.clone(),
        config.index.top_k,
    );

    let interactive = io::stdin().is_terminal();
    let mut session = ChatSession::new();

    println!("{}", style("💬 FAQ Chat").bold().cyan());
    println!("{}", style("Type 'exit' or 'quit' to leave.").dim());
    println!();
    for turn in session.turns() {
        render_turn(turn);
    }

    while let Some(line) = read_message(interactive)? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if is_exit_command(input) {
            break;
        }

        let mut observer = SpinnerObserver::new();
        assistant.process_turn(&mut session, input, &mut observer).await;

        let start = session.len().saturating_sub(2);
        for turn in &session.turns()[start..] {
            render_turn(turn);
        }
    }

    debug!("Chat ended after {} turns", session.len());
    Ok(())
}

fn read_message(interactive: bool) -> Result<Option<String>> {
    if interactive {
        return match Input::<String>::new()
            .with_prompt("Enter your query")
            .interact_text()
        {
            Ok(line) => Ok(Some(line)),
            Err(dialoguer::Error::IO(e))
                if matches!(
                    e.kind(),
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(FaqError::Other(e.into())),
        };
    }

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn render_turn(turn: &Turn) {
    let label = match turn.role {
        Role::User => style("You").bold().cyan(),
        Role::Assistant => style("Assistant").bold().green(),
    };
    println!("{}: {}", label, turn.content);
    println!();
}

fn is_exit_command(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn preview_lines(records: &[FaqRecord]) -> Vec<String> {
    records
        .iter()
        .take(PREVIEW_ROWS)
        .enumerate()
        .map(|(row, record)| format!("  {}: {} | {}", row, record.question, record.answer))
        .collect()
}

fn step_failure(step: PipelineStep) -> &'static str {
    match step {
        PipelineStep::Embed => "Error generating embeddings",
        PipelineStep::Retrieve => "Error querying the FAQ index",
        PipelineStep::Generate => "Error generating response",
    }
}

/// Spinner on stderr showing the stage text, with inline error notices
struct SpinnerObserver {
    bar: ProgressBar,
}

impl SpinnerObserver {
    fn new() -> Self {
        let bar = if console::user_attended_stderr() {
            ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            )
        } else {
            ProgressBar::hidden()
        };
        Self { bar }
    }
}

impl TurnObserver for SpinnerObserver {
    fn stage_changed(&mut self, stage: TurnStage) {
        match stage.status_text() {
            Some(text) => {
                self.bar.set_message(text);
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
            None => self.bar.finish_and_clear(),
        }
    }

    fn degraded(&mut self, step: PipelineStep, error: &FaqError) {
        self.bar.suspend(|| {
            eprintln!(
                "{}",
                style(format!("{}: {}", step_failure(step), error)).red()
            );
        });
    }
}
