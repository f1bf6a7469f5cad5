use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use quizsmith::models::StepState;
use quizsmith::session::parse_command;
use quizsmith::{
    ask_document, load_source, read_artifact, write_artifact, CancelFlag, Difficulty,
    DocumentStore, GeminiClient, GeminiConfig, GenerationConfig, Pipeline, PipelineEvent,
    PipelineInput, PipelineOptions, QuizSession, SourceDocument,
};

const DEFAULT_STORE: &str = "quizsmith_store.json";

#[derive(Parser)]
#[command(name = "quizsmith")]
#[command(author, version, about = "Source-grounded quiz generation with LLM audit and correction", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Plain-text source document
    #[arg(short, long, conflicts_with = "document")]
    input: Option<PathBuf>,

    /// Id of a document in the store
    #[arg(short, long)]
    document: Option<u64>,

    /// Document store file
    #[arg(long, default_value = DEFAULT_STORE)]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an audited quiz and write it as a self-contained HTML file
    Generate {
        #[command(flatten)]
        source: SourceArgs,

        /// Image files the questions may refer to, in order
        #[arg(long = "image")]
        images: Vec<PathBuf>,

        /// Output HTML file (default: quiz_part_<part>.html)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Standalone multiple-choice questions
        #[arg(long, default_value = "5")]
        mcq_count: u32,

        /// Case scenarios
        #[arg(long, default_value = "1")]
        case_count: u32,

        /// Questions per case scenario
        #[arg(long, default_value = "2")]
        questions_per_case: u32,

        /// easy, medium, hard or mix
        #[arg(long, default_value = "mix")]
        difficulty: Difficulty,

        /// Extra instructions passed to the model verbatim
        #[arg(long, default_value = "")]
        instructions: String,

        /// Quiz title
        #[arg(long, default_value = "Quiz")]
        title: String,

        /// Part number shown in the title
        #[arg(long, default_value = "1")]
        part: u32,

        /// Items audited or refined at once
        #[arg(long, default_value = "1")]
        concurrency: usize,

        /// Seed for the question shuffle
        #[arg(long)]
        seed: Option<u64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Ask a question answered only from the source document
    Ask {
        #[command(flatten)]
        source: SourceArgs,

        /// The question
        #[arg(short, long)]
        question: String,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Take a rendered quiz in the terminal
    Take {
        /// Quiz HTML file
        artifact: PathBuf,

        /// Seed for the closing message
        #[arg(long)]
        seed: Option<u64>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show what a rendered quiz contains
    Inspect {
        /// Quiz HTML file
        artifact: PathBuf,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Manage stored source documents
    Store {
        #[command(subcommand)]
        action: StoreAction,

        /// Document store file
        #[arg(long, default_value = DEFAULT_STORE, global = true)]
        store: PathBuf,

        /// Verbose output
        #[arg(short, long, global = true)]
        verbose: bool,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Add a plain-text document
    Add { file: PathBuf },
    /// List stored documents, newest first
    List,
    /// Print a stored document
    Show { id: u64 },
    /// Delete a stored document
    Delete { id: u64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            source,
            images,
            output,
            mcq_count,
            case_count,
            questions_per_case,
            difficulty,
            instructions,
            title,
            part,
            concurrency,
            seed,
            verbose,
        } => {
            setup_logging(verbose);
            let config = GenerationConfig {
                mcq_count,
                case_count,
                questions_per_case,
                difficulty,
                custom_instructions: instructions,
            };
            let options = PipelineOptions {
                concurrency,
                part_index: part,
                title,
                seed,
            };
            let output = output.unwrap_or_else(|| quizsmith::io::default_artifact_path(Path::new("."), part));
            generate_quiz(source, images, config, options, output).await
        }
        Commands::Ask {
            source,
            question,
            verbose,
        } => {
            setup_logging(verbose);
            ask_question(source, question).await
        }
        Commands::Take {
            artifact,
            seed,
            verbose,
        } => {
            setup_logging(verbose);
            take_quiz(&artifact, seed)
        }
        Commands::Inspect { artifact, verbose } => {
            setup_logging(verbose);
            inspect_artifact(&artifact)
        }
        Commands::Store {
            action,
            store,
            verbose,
        } => {
            setup_logging(verbose);
            manage_store(action, &store)
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn resolve_source(args: &SourceArgs, images: &[PathBuf]) -> Result<SourceDocument> {
    match (&args.input, args.document) {
        (Some(path), _) => load_source(path, images),
        (None, Some(id)) => {
            let store = DocumentStore::open(&args.store)?;
            let doc = store
                .get(id)
                .with_context(|| format!("No document with id {} in {:?}", id, args.store))?;
            info!("Using stored document {} ({})", id, doc.filename);
            Ok(SourceDocument::new(
                doc.text.clone(),
                quizsmith::io::load_images(images)?,
            ))
        }
        (None, None) => bail!("Provide a source with --input <file> or --document <id>"),
    }
}

async fn generate_quiz(
    source: SourceArgs,
    images: Vec<PathBuf>,
    config: GenerationConfig,
    options: PipelineOptions,
    output: PathBuf,
) -> Result<()> {
    let document = resolve_source(&source, &images)?;
    let client = GeminiClient::new(GeminiConfig::from_env()?);
    info!("Using model {}", client.model());

    let cancel = CancelFlag::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            on_ctrl_c.cancel();
        }
    });

    let mut pipeline = Pipeline::new(&client, options)
        .with_cancel(cancel)
        .with_observer(|event: &PipelineEvent| {
            if let PipelineEvent::StepChanged(step) = event {
                if step.state == StepState::Active {
                    info!("[{}] {}", step.id, step.label);
                }
            }
        });

    let result = pipeline
        .run(PipelineInput {
            source_text: document.text,
            images: document.images,
            config,
        })
        .await;

    println!("Protocol");
    println!("--------");
    for step in pipeline.steps() {
        let marker = match step.state {
            StepState::Done => "done",
            StepState::Error => "FAILED",
            StepState::Active => "active",
            StepState::Pending => "-",
        };
        println!("{:>5}  {:<32} {}", step.id, step.label, marker);
    }
    println!();

    let output_data = result?;
    write_artifact(&output, &output_data.html)?;

    let summary = &output_data.summary;
    println!("Questions: {}", output_data.data.items.len());
    println!(
        "Audit: {} passed, {} corrected, {} flagged",
        summary.passed, summary.corrected, summary.flagged
    );
    if summary.flagged > 0 {
        println!(
            "Refined explanations: {} ({} failed)",
            summary.refined, summary.refine_failed
        );
    }
    if summary.dropped > 0 {
        println!("Malformed items dropped: {}", summary.dropped);
    }
    println!("Written to {:?}", output);
    Ok(())
}

async fn ask_question(source: SourceArgs, question: String) -> Result<()> {
    let document = resolve_source(&source, &[])?;
    let client = GeminiClient::new(GeminiConfig::from_env()?);
    let answer = ask_document(&client, &document.text, &question)
        .await
        .context("Failed to get an answer")?;
    println!("{}", answer.trim());
    Ok(())
}

fn take_quiz(path: &Path, seed: Option<u64>) -> Result<()> {
    let (title, data) = read_artifact(path)?;
    let mut session = QuizSession::new(data, seed);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!("\n{}", session.render(&title));
        print!("> ");
        std::io::Write::flush(&mut std::io::stdout()).ok();

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("Failed to read input")?;
        if matches!(line.trim(), "q" | "quit") {
            break;
        }
        match parse_command(session.state().page, &line) {
            Some(event) => {
                session.dispatch(event);
            }
            None => println!("Unrecognised command: {}", line.trim()),
        }
    }
    Ok(())
}

fn inspect_artifact(path: &Path) -> Result<()> {
    let (title, data) = read_artifact(path)?;

    println!("Quiz Artifact");
    println!("=============");
    println!("Title: {}", title);
    println!("Questions: {}", data.items.len());
    println!("Scored questions: {}", data.eligible_indices().len());
    println!("Flagged for review: {}", data.flawed_count());
    println!("Case scenarios: {}", data.case_count());
    println!("Images: {}", data.images.len());
    println!(
        "Questions with images: {}",
        data.items.iter().filter(|i| data.image_for(i).is_some()).count()
    );
    Ok(())
}

fn manage_store(action: StoreAction, path: &Path) -> Result<()> {
    let mut store = DocumentStore::open(path)?;
    match action {
        StoreAction::Add { file } => {
            let text = quizsmith::io::read_source_text(&file)?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let id = store.add(filename.clone(), text)?;
            println!("Stored \"{}\" as document {} in {:?}", filename, id, store.path());
        }
        StoreAction::List => {
            let docs = store.list();
            if docs.is_empty() {
                println!("No stored documents in {:?}", store.path());
            }
            for doc in docs {
                println!(
                    "{:>4}  {}  {}",
                    doc.id,
                    doc.created_at.format("%Y-%m-%d %H:%M"),
                    doc.filename
                );
            }
        }
        StoreAction::Show { id } => {
            let doc = store
                .get(id)
                .with_context(|| format!("No document with id {}", id))?;
            println!("{}", doc.text);
        }
        StoreAction::Delete { id } => {
            store.delete(id)?;
            println!("Deleted document {}", id);
        }
    }
    Ok(())
}
