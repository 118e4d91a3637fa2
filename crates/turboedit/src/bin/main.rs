//! TurboEdit CLI

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use turboedit::prelude::*;
use turboedit::{init_logging, level_from_verbosity};

/// TurboEdit - tracked search/replace edits with undo
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Project root that relative file paths resolve against
    #[arg(short, long, env = "TURBOEDIT_PROJECT", default_value = ".")]
    project: PathBuf,

    /// YAML configuration file (overrides --profile)
    #[arg(short, long, env = "TURBOEDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Configuration profile (default, strict, lenient, ephemeral)
    #[arg(long, default_value = "default")]
    profile: String,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply edit blocks (JSON array of {search_text, replace_text}) to a file
    Edit {
        file: String,

        /// File holding the blocks; `-` reads stdin
        #[arg(short, long, default_value = "-")]
        blocks: String,

        /// Use one strategy instead of the fallback chain
        #[arg(short, long)]
        strategy: Option<StrategyKind>,

        /// Resolve and print the diff without writing
        #[arg(long, action = clap::ArgAction::SetTrue)]
        dry_run: bool,

        #[command(flatten)]
        conversation: ConversationArgs,
    },

    /// Undo changes (the most recent group by default)
    Undo {
        /// Undo one change
        #[arg(long, conflicts_with_all = ["group", "to_version"])]
        change: Option<String>,

        /// Undo every change of a group
        #[arg(long, conflicts_with = "to_version")]
        group: Option<String>,

        /// Undo everything applied after this change id
        #[arg(long)]
        to_version: Option<String>,
    },

    /// Undo everything applied after a conversation message
    Rollback {
        message_id: String,

        #[arg(long)]
        conversation: Option<String>,
    },

    /// Show change records, newest first
    History {
        /// Only this file
        file: Option<String>,

        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show change groups, newest first
    Groups {
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[derive(clap::Args, Debug)]
struct ConversationArgs {
    /// Conversation to checkpoint this edit under
    #[arg(long)]
    conversation: Option<String>,

    #[arg(long, requires = "conversation")]
    first_message: Option<String>,

    #[arg(long, requires = "conversation")]
    last_message: Option<String>,
}

impl ConversationArgs {
    fn link(&self) -> Option<ConversationLink> {
        let conversation = self.conversation.as_ref()?;
        let mut link = ConversationLink::new(conversation);
        if let Some(first) = &self.first_message {
            link = link.with_first_message(first);
        }
        if let Some(last) = &self.last_message {
            link = link.with_last_message(last);
        }
        Some(link)
    }
}

fn load_config(args: &Args) -> anyhow::Result<EditorConfig> {
    let project = args
        .project
        .canonicalize()
        .with_context(|| format!("project root {} not accessible", args.project.display()))?;

    match &args.config {
        Some(path) => {
            let mut config = EditorConfig::load(path)?;
            if config.project_root.is_relative() {
                config.project_root = project.join(&config.project_root);
            }
            if config.storage_root.is_relative() {
                config.storage_root = project.join(&config.storage_root);
            }
            if let Some(dir) = &config.checkpoint_dir
                && dir.is_relative()
            {
                config.checkpoint_dir = Some(project.join(dir));
            }
            Ok(config)
        }
        None => {
            let profile: ConfigProfile = args.profile.parse()?;
            Ok(profile.create_config(project))
        }
    }
}

fn read_blocks(source: &str) -> anyhow::Result<Vec<EditBlock>> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read blocks from stdin")?;
        buf
    } else {
        std::fs::read_to_string(Path::new(source))
            .with_context(|| format!("failed to read blocks from {}", source))?
    };
    let blocks: Vec<EditBlock> =
        serde_json::from_str(&raw).context("blocks must be a JSON array of edit blocks")?;
    if blocks.is_empty() {
        bail!("no edit blocks supplied");
    }
    Ok(blocks)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(args: Args) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    log::info!("TurboEdit v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Project root: {}", config.project_root.display());
    let session = EditSession::new(config)?;

    match args.command {
        Command::Edit {
            file,
            blocks,
            strategy,
            dry_run,
            conversation,
        } => {
            let blocks = read_blocks(&blocks)?;
            let mode = strategy.map_or(ReplaceMode::Fallback, ReplaceMode::Strategy);

            if dry_run {
                let resolved = session.resolve(&FileEdit::new(file, blocks), &mode);
                if resolved.replace.success {
                    print!("{}", resolved.diff());
                } else {
                    eprint!("{}", resolved.replace.to_prompt_feedback());
                }
                return Ok(exit_code(resolved.replace.success));
            }

            let link = conversation.link();
            let outcome = session.apply_blocks(&file, &blocks, &mode, link.as_ref());
            if !outcome.success {
                eprint!("{}", outcome.feedback());
            }
            print_json(&outcome)?;
            Ok(exit_code(outcome.success))
        }

        Command::Undo {
            change,
            group,
            to_version,
        } => {
            let history = session.history();
            let result = if let Some(id) = change {
                history.undo_change(&id)
            } else if let Some(group) = group {
                history.undo_change_group(&group)
            } else if let Some(version) = to_version {
                history.undo_to_version(&version)
            } else {
                history.undo_last_change()
            };
            print_json(&result)?;
            Ok(exit_code(result.success))
        }

        Command::Rollback {
            message_id,
            conversation,
        } => {
            let (result, checkpoint) = session
                .history()
                .rollback_to_message(&message_id, conversation.as_deref());
            print_json(&serde_json::json!({
                "result": &result,
                "checkpoint": &checkpoint,
            }))?;
            Ok(exit_code(result.success))
        }

        Command::History { file, limit } => {
            let records = match file {
                Some(file) => session.history().get_change_history(&file, Some(limit))?,
                None => session.history().get_available_versions(limit)?,
            };
            print_json(&records)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Groups { limit } => {
            print_json(&session.history().get_change_groups(Some(limit))?)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(level_from_verbosity(args.verbose));

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
