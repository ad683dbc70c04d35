//! blockpress operator CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Print a default block of a given type as JSON
//! blockpress block new callout
//!
//! # Render a document file to its render tree
//! blockpress render post.json
//!
//! # Store a document, uploading attached images first
//! blockpress doc save hello post.json --image cover.png
//! blockpress doc list
//! blockpress doc show hello
//! blockpress doc render hello
//!
//! # Polls
//! blockpress poll create p1 --question "Tabs or spaces?" --option a=Tabs --option b=Spaces
//! blockpress poll vote p1 a --fingerprint f1
//! blockpress poll show p1
//! ```
//!
//! Settings come from `--config` (or `BLOCKPRESS_CONFIG`); defaults apply
//! when neither is given.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blockpress_kernel::{
    BlockpressConfig, DocumentStore, EditorSession, ImageFile, ImageStager, LocalImageStore,
    PollEngine, SqliteDocumentStore, SqlitePollStore,
};
use blockpress_types::block::ImageData;
use blockpress_types::{Block, Document, OptionId, PollChoice, PollId};

#[derive(Parser, Debug)]
#[command(name = "blockpress")]
#[command(about = "Block documents, staged images and polls")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "BLOCKPRESS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Block helpers
    Block {
        #[command(subcommand)]
        command: BlockCommand,
    },
    /// Render a document JSON file and print the render tree
    Render { file: PathBuf },
    /// Stored documents
    Doc {
        #[command(subcommand)]
        command: DocCommand,
    },
    /// Polls and voting
    Poll {
        #[command(subcommand)]
        command: PollCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BlockCommand {
    /// Print a new block of the given type with default content
    New {
        #[arg(value_name = "TYPE")]
        kind: String,
    },
}

#[derive(Subcommand, Debug)]
enum DocCommand {
    /// Save a document file under an id
    Save {
        id: String,
        file: PathBuf,
        /// Append an image block for each file, uploaded on save
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,
    },
    /// List stored document ids
    List,
    /// Print a stored document as JSON
    Show { id: String },
    /// Render a stored document
    Render { id: String },
}

#[derive(Subcommand, Debug)]
enum PollCommand {
    /// Create a poll, or replace it and reset its votes
    Create {
        id: String,
        #[arg(long)]
        question: String,
        /// Option as `id=text`; repeat for each option
        #[arg(long = "option", value_name = "ID=TEXT", value_parser = parse_choice, required = true)]
        options: Vec<PollChoice>,
    },
    /// Print a poll with its counts
    Show { id: String },
    /// Cast one vote
    Vote {
        id: String,
        option: String,
        #[arg(long)]
        fingerprint: String,
        #[arg(long)]
        ip: Option<String>,
    },
}

fn parse_choice(s: &str) -> Result<PollChoice, String> {
    let (id, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=TEXT, got '{s}'"))?;
    let (id, text) = (id.trim(), text.trim());
    if id.is_empty() || text.is_empty() {
        return Err(format!("option id and text must be non-empty in '{s}'"));
    }
    Ok(PollChoice::new(id, text))
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Block {
            command: BlockCommand::New { kind },
        } => {
            let block = blockpress_types::create_from_tag(&kind)?;
            print_json(&block)
        }
        Command::Render { file } => {
            let doc = read_document(&file).await?;
            print_json(&blockpress_render::render(&doc))
        }
        Command::Doc { command } => run_doc(&config, command).await,
        Command::Poll { command } => run_poll(&config, command).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<BlockpressConfig> {
    match path {
        Some(path) => Ok(BlockpressConfig::load(path)?),
        None => Ok(BlockpressConfig::default()),
    }
}

async fn read_document(path: &Path) -> Result<Document> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a document", path.display()))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn poll_engine(config: &BlockpressConfig) -> Result<PollEngine> {
    let store = SqlitePollStore::open(&config.database.path)
        .with_context(|| format!("failed to open {}", config.database.path.display()))?;
    Ok(PollEngine::new(Arc::new(store)))
}

fn document_store(config: &BlockpressConfig) -> Result<SqliteDocumentStore> {
    SqliteDocumentStore::open(&config.database.path)
        .with_context(|| format!("failed to open {}", config.database.path.display()))
}

async fn run_doc(config: &BlockpressConfig, command: DocCommand) -> Result<()> {
    let documents = document_store(config)?;

    match command {
        DocCommand::Save { id, file, images } => {
            let doc = read_document(&file).await?;
            let stager = ImageStager::new(
                Arc::new(LocalImageStore::from_config(&config.images)),
                config.staging.clone(),
            );
            let mut session = EditorSession::new(
                id,
                doc,
                stager,
                Arc::new(documents),
                poll_engine(config)?,
            );

            for path in &images {
                let file = ImageFile::read(path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let alt = file.name.clone().unwrap_or_default();
                let src = session
                    .attach_image(file)
                    .with_context(|| format!("cannot attach {}", path.display()))?;
                session.document_mut().push(Block::new(ImageData {
                    src,
                    alt,
                    ..Default::default()
                }))?;
            }

            let report = session.save().await?;
            tracing::info!(
                document_id = session.document_id(),
                blocks = report.document.len(),
                polls_upserted = report.polls.upserted.len(),
                polls_unchanged = report.polls.unchanged.len(),
                polls_skipped = report.polls.skipped,
                "saved"
            );
            print_json(&report.document)
        }
        DocCommand::List => {
            for id in documents.list_ids()? {
                println!("{id}");
            }
            Ok(())
        }
        DocCommand::Show { id } => print_json(&documents.load(&id).await?),
        DocCommand::Render { id } => {
            let doc = documents.load(&id).await?;
            print_json(&blockpress_render::render(&doc))
        }
    }
}

async fn run_poll(config: &BlockpressConfig, command: PollCommand) -> Result<()> {
    let engine = poll_engine(config)?;

    match command {
        PollCommand::Create {
            id,
            question,
            options,
        } => {
            let poll = engine
                .upsert_and_reset_votes(&PollId::from(id), &question, options)
                .await?;
            print_json(&poll)
        }
        PollCommand::Show { id } => {
            let poll = engine.get(&PollId::from(id)).await?;
            println!("{} ({} votes)", poll.question(), poll.total_votes());
            for opt in poll.options() {
                println!(
                    "  {:<12} {:>6}  {:>5.1}%  {}",
                    opt.id.as_str(),
                    opt.votes,
                    poll.percentage(&opt.id),
                    opt.text
                );
            }
            Ok(())
        }
        PollCommand::Vote {
            id,
            option,
            fingerprint,
            ip,
        } => {
            if fingerprint.trim().is_empty() {
                bail!("--fingerprint must not be empty");
            }
            let poll = engine
                .vote(
                    &PollId::from(id),
                    &OptionId::from(option),
                    &fingerprint,
                    ip.as_deref(),
                )
                .await?;
            print_json(&poll)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_choice() {
        let choice = parse_choice("a = Yes please").unwrap();
        assert_eq!(choice, PollChoice::new("a", "Yes please"));
        // Only the first '=' splits
        assert_eq!(parse_choice("eq=a=b").unwrap().text, "a=b");
        assert!(parse_choice("no-separator").is_err());
        assert!(parse_choice("=text").is_err());
        assert!(parse_choice("id=").is_err());
    }

    #[test]
    fn test_poll_create_args() {
        let cli = Cli::try_parse_from([
            "blockpress",
            "poll",
            "create",
            "p1",
            "--question",
            "Q?",
            "--option",
            "a=A",
            "--option",
            "b=B",
        ])
        .unwrap();
        match cli.command {
            Command::Poll {
                command: PollCommand::Create { id, options, .. },
            } => {
                assert_eq!(id, "p1");
                assert_eq!(options.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_poll_create_requires_an_option() {
        let err = Cli::try_parse_from(["blockpress", "poll", "create", "p1", "--question", "Q?"]);
        assert!(err.is_err());
    }

    #[test]
    fn test_load_config_defaults_and_file() {
        assert_eq!(load_config(None).unwrap(), BlockpressConfig::default());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blockpress.toml");
        std::fs::write(&path, "[staging]\nfolder = \"posts\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.staging.folder, "posts");
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[tokio::test]
    async fn test_doc_save_uploads_images_and_stores_document() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BlockpressConfig::default();
        config.database.path = dir.path().join("db.sqlite");
        config.images.root = dir.path().join("uploads");

        let post = dir.path().join("post.json");
        std::fs::write(&post, "[]").unwrap();
        let image = dir.path().join("pixel.png");
        std::fs::write(&image, b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR").unwrap();

        run_doc(
            &config,
            DocCommand::Save {
                id: "hello".into(),
                file: post,
                images: vec![image],
            },
        )
        .await
        .unwrap();

        let stored = document_store(&config).unwrap().load("hello").await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(!blockpress_kernel::contains_ephemeral(&stored));
        assert!(dir.path().join("uploads").join("blog").is_dir());
    }
}
