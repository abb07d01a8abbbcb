// FiaCloud CLI
// Browse and edit cloud object storage, with AI chat and AI file edits

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;
mod context;
mod output;

use context::AppContext;

#[derive(Parser, Debug)]
#[command(
    name = "fiacloud",
    version,
    about = "Cloud object storage browser with AI-assisted editing",
    after_help = "Examples:\n  \
        fiacloud config storage aliyun --access-key-id AK --access-key-secret SK --bucket b\n  \
        fiacloud ls --tree\n  \
        fiacloud upload ./notes.md --folder docs\n  \
        fiacloud edit docs/notes.md \"fix the typos\""
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding fiacloud.json (defaults to the app data dir)
    #[arg(long, global = true, env = "FIACLOUD_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Access password, when one is set
    #[arg(long, global = true, env = "FIACLOUD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the access password
    Login {
        /// Password to check (overrides --password)
        #[arg(value_name = "PASSWORD")]
        attempt: Option<String>,
    },
    /// Set or remove the access password
    Passwd {
        /// New password; omit to remove protection
        new_password: Option<String>,
    },
    /// Forget the password and wipe every stored value
    Reset {
        /// Must be exactly: 我确认忘记密码并确认清空数据
        #[arg(long)]
        confirm: String,
    },
    /// Storage and AI settings
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// List objects
    Ls {
        /// Only keys starting with this prefix
        prefix: Option<String>,
        /// Show folders as a tree
        #[arg(long)]
        tree: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Upload a local file
    Upload {
        file: PathBuf,
        /// Destination folder
        #[arg(long)]
        folder: Option<String>,
        /// Object name (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Download an object to a local file
    Download {
        key: String,
        /// Output path (defaults to the object's file name)
        output: Option<PathBuf>,
    },
    /// Print a text object
    Cat { key: String },
    /// Write a text object from a file or stdin
    Put {
        key: String,
        /// Read content from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete an object
    Rm { key: String },
    /// Delete a folder and everything in it
    Rmdir { folder: String },
    /// Rename (move) an object
    Mv { from: String, to: String },
    /// Create an empty folder
    Mkdir {
        name: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Create a text file
    Touch {
        name: String,
        #[arg(long)]
        parent: Option<String>,
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Print a download URL
    Url { key: String },
    /// Chat with the AI; without a message an interactive session starts
    Chat {
        message: Option<String>,
        /// Start a new conversation first
        #[arg(long)]
        new: bool,
        /// Continue this conversation
        #[arg(long, conflicts_with = "new")]
        conversation: Option<String>,
        /// Add objects to the chat context
        #[arg(long = "context", value_name = "KEY")]
        context: Vec<String>,
    },
    /// List, show or delete conversations
    Conversations {
        #[command(subcommand)]
        action: Option<ConversationCommand>,
    },
    /// Let the AI rewrite a text object, then review the diff
    Edit {
        key: String,
        instruction: String,
        /// Save the whole proposal without review
        #[arg(long, conflicts_with = "reject")]
        accept: bool,
        /// Discard the proposal
        #[arg(long)]
        reject: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Show the current settings (secrets masked)
    Show,
    /// Set provider credentials
    Storage {
        #[command(subcommand)]
        provider: StorageCommand,
    },
    /// Set the OpenAI-compatible endpoint
    Ai {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        api_key: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Switch the active storage provider
    Provider { provider: ProviderArg },
    /// Remove stored credentials
    Clear { target: ClearTarget },
    /// Set the colour theme; without a value, step to the next one
    Theme { theme: Option<ThemeArg> },
    /// List Aliyun OSS regions
    Regions,
}

#[derive(Subcommand, Debug)]
enum StorageCommand {
    /// Aliyun OSS
    Aliyun {
        #[arg(long)]
        access_key_id: String,
        #[arg(long)]
        access_key_secret: String,
        #[arg(long)]
        bucket: String,
        #[arg(long, default_value = fiacloud_lib::models::DEFAULT_OSS_REGION)]
        region: String,
        /// Custom endpoint host (defaults to {region}.aliyuncs.com)
        #[arg(long)]
        endpoint: Option<String>,
    },
    /// Cloudflare R2
    R2 {
        #[arg(long)]
        account_id: String,
        #[arg(long)]
        access_key_id: String,
        #[arg(long)]
        access_key_secret: String,
        #[arg(long)]
        bucket: String,
        #[arg(long)]
        custom_domain: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum ConversationCommand {
    /// Print every message of a conversation
    Show { id: String },
    /// Delete a conversation
    Delete { id: String },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProviderArg {
    Aliyun,
    R2,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Light,
    Dark,
    System,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ClearTarget {
    Aliyun,
    R2,
    Ai,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err:#}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::open(cli.data_dir.as_deref())?;

    // Commands that work without (or instead of) the password
    match &cli.command {
        Command::Login { attempt } => {
            let password = attempt.as_deref().or(cli.password.as_deref());
            return commands::auth::login(&ctx, password);
        }
        Command::Reset { confirm } => return commands::auth::reset(&ctx, confirm),
        _ => {}
    }
    ctx.unlock(cli.password.as_deref())?;

    match cli.command {
        Command::Login { .. } | Command::Reset { .. } => Ok(()),
        Command::Passwd { new_password } => commands::auth::passwd(&ctx, new_password),
        Command::Config { action } => match action {
            ConfigCommand::Show => commands::config::show(&ctx),
            ConfigCommand::Storage { provider } => match provider {
                StorageCommand::Aliyun {
                    access_key_id,
                    access_key_secret,
                    bucket,
                    region,
                    endpoint,
                } => commands::config::set_aliyun(
                    &ctx,
                    access_key_id,
                    access_key_secret,
                    bucket,
                    region,
                    endpoint,
                ),
                StorageCommand::R2 {
                    account_id,
                    access_key_id,
                    access_key_secret,
                    bucket,
                    custom_domain,
                } => commands::config::set_r2(
                    &ctx,
                    account_id,
                    access_key_id,
                    access_key_secret,
                    bucket,
                    custom_domain,
                ),
            },
            ConfigCommand::Ai {
                base_url,
                api_key,
                model,
            } => commands::config::set_ai(&ctx, base_url, api_key, model),
            ConfigCommand::Provider { provider } => {
                commands::config::set_provider(&ctx, provider.into())
            }
            ConfigCommand::Clear { target } => commands::config::clear(&ctx, target.into()),
            ConfigCommand::Theme { theme } => {
                commands::config::set_theme(&ctx, theme.map(Into::into))
            }
            ConfigCommand::Regions => {
                commands::config::regions();
                Ok(())
            }
        },
        Command::Ls { prefix, tree, json } => {
            commands::files::list(&ctx, prefix.as_deref(), tree, json).await
        }
        Command::Upload { file, folder, name } => {
            commands::files::upload(&ctx, &file, folder.as_deref(), name.as_deref()).await
        }
        Command::Download { key, output } => {
            commands::files::download(&ctx, &key, output.as_deref()).await
        }
        Command::Cat { key } => commands::files::cat(&ctx, &key).await,
        Command::Put { key, file } => commands::files::put(&ctx, &key, file.as_deref()).await,
        Command::Rm { key } => commands::files::remove(&ctx, &key).await,
        Command::Rmdir { folder } => commands::files::remove_folder(&ctx, &folder).await,
        Command::Mv { from, to } => commands::files::rename(&ctx, &from, &to).await,
        Command::Mkdir { name, parent } => {
            commands::files::mkdir(&ctx, &name, parent.as_deref()).await
        }
        Command::Touch {
            name,
            parent,
            content,
        } => commands::files::touch(&ctx, &name, parent.as_deref(), &content).await,
        Command::Url { key } => commands::files::url(&ctx, &key).await,
        Command::Chat {
            message,
            new,
            conversation,
            context,
        } => {
            let options = commands::chat::ChatOptions {
                new,
                conversation,
                context,
            };
            commands::chat::chat(&ctx, message, options).await
        }
        Command::Conversations { action } => match action {
            None => commands::chat::list_conversations(&ctx),
            Some(ConversationCommand::Show { id }) => commands::chat::show_conversation(&ctx, &id),
            Some(ConversationCommand::Delete { id }) => {
                commands::chat::delete_conversation(&ctx, &id)
            }
        },
        Command::Edit {
            key,
            instruction,
            accept,
            reject,
        } => {
            let mode = if accept {
                commands::edit::ReviewMode::AcceptAll
            } else if reject {
                commands::edit::ReviewMode::RejectAll
            } else {
                commands::edit::ReviewMode::Interactive
            };
            commands::edit::edit(&ctx, &key, &instruction, mode).await
        }
    }
}

impl From<ProviderArg> for fiacloud_lib::models::StorageProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Aliyun => Self::Aliyun,
            ProviderArg::R2 => Self::R2,
        }
    }
}

impl From<ThemeArg> for fiacloud_lib::repositories::Theme {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => Self::Light,
            ThemeArg::Dark => Self::Dark,
            ThemeArg::System => Self::System,
        }
    }
}

impl From<ClearTarget> for commands::config::ClearTarget {
    fn from(target: ClearTarget) -> Self {
        match target {
            ClearTarget::Aliyun => Self::Storage(fiacloud_lib::models::StorageProvider::Aliyun),
            ClearTarget::R2 => Self::Storage(fiacloud_lib::models::StorageProvider::R2),
            ClearTarget::Ai => Self::Ai,
        }
    }
}
