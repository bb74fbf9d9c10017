//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod analyze;
pub mod ask;
pub mod config;

use std::error::Error;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::api::ScanContext;
use crate::core::analysis::{encode_image, AnalysisClient, AnalysisResult};
use crate::core::app::ChatApp;
use crate::core::config::Config;
use crate::core::service::ServiceSettings;
use crate::ui::chat_loop::run_chat;
use crate::ui::theme::Theme;
use crate::utils::logging;

#[derive(Parser)]
#[command(name = "scanlens", version)]
#[command(about = "Identify things from photos and ask follow-up questions, in the terminal")]
#[command(
    long_about = "Scanlens sends a photo to a hosted multimodal model, shows what it found \
(name, category, confidence, attributes, details and tips), and lets you ask follow-up \
questions in a full-screen chat with streaming replies.\n\n\
Configuration:\n\
  scanlens config set endpoint <URL>   Base URL of the hosted functions\n\
  scanlens config set api-key <KEY>    Bearer token for the functions\n\n\
Environment Variables (override the config file):\n\
  SCANLENS_ENDPOINT   Base URL of the hosted functions\n\
  SCANLENS_API_KEY    Bearer token\n\
  SCANLENS_LANGUAGE   Translation target language (defaults to the locale)\n\
  SCANLENS_LOG        Log filter, e.g. debug or scanlens=trace\n\n\
Chat controls:\n\
  Enter               Send the message\n\
  Shift+Enter         Insert a newline\n\
  Tab                 Cycle through suggested questions\n\
  PgUp/PgDn           Scroll the conversation\n\
  Esc / Ctrl+C        Close the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the scan being discussed comes from.
#[derive(ClapArgs, Debug)]
pub struct ScanSource {
    /// Saved scan result (from `analyze --save`)
    #[arg(short = 'c', long, value_name = "FILE", conflicts_with = "image")]
    pub context: Option<PathBuf>,

    /// Analyze this image first and talk about the result
    #[arg(short = 'i', long, value_name = "IMAGE")]
    pub image: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify what is in an image
    Analyze {
        /// Image file (jpg, png, webp, gif or heic)
        image: PathBuf,
        /// Translate the result into your language
        #[arg(short = 't', long)]
        translate: bool,
        /// Print the result as JSON instead of formatted text
        #[arg(long)]
        json: bool,
        /// Save the result so it can be used with `chat --context`
        #[arg(short = 's', long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
    /// Ask follow-up questions about a scan in a full-screen chat
    Chat {
        #[command(flatten)]
        source: ScanSource,
        /// Write diagnostic logs to this file
        #[arg(short = 'l', long, value_name = "FILE")]
        log: Option<PathBuf>,
    },
    /// Ask one question and print the reply
    Ask {
        #[command(flatten)]
        source: ScanSource,
        /// Print the raw reply as it streams instead of formatted text
        #[arg(long)]
        plain: bool,
        /// The question to ask
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// Translate a saved scan result
    Translate {
        /// Saved scan result
        result: PathBuf,
        /// Target language code (defaults to the configured or detected language)
        #[arg(short = 'L', long, value_name = "CODE")]
        language: Option<String>,
        /// Print the translated result as JSON
        #[arg(long)]
        json: bool,
        /// Write the translated result to this file
        #[arg(short = 's', long, value_name = "FILE")]
        save: Option<PathBuf>,
    },
    /// Show or change configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // The chat owns the terminal, so it only ever logs to a file.
    match &args.command {
        Commands::Chat { log: Some(path), .. } => logging::init_file(path)
            .map_err(|err| format!("Cannot open log file {}: {err}", path.display()))?,
        Commands::Chat { log: None, .. } => {}
        _ => logging::init_stderr(),
    }

    let config = Config::load()?;

    match args.command {
        Commands::Analyze {
            image,
            translate,
            json,
            save,
        } => analyze::run_analyze(&config, image, translate, json, save).await,
        Commands::Chat { source, .. } => {
            let settings = config.resolve_service()?;
            let client = reqwest::Client::new();
            let Some(result) = load_scan(&source, &client, &settings).await? else {
                return Err("chat needs a scan: pass --image <IMAGE> or --context <FILE>".into());
            };
            let app = ChatApp::new(client, settings, result.to_context());
            run_chat(app, theme_for(&config)).await
        }
        Commands::Ask {
            source,
            plain,
            question,
        } => ask::run_ask(&config, &source, question, plain).await,
        Commands::Translate {
            result,
            language,
            json,
            save,
        } => analyze::run_translate(&config, result, language, json, save).await,
        Commands::Config { action } => config::run_config(config, action),
    }
}

pub(crate) fn theme_for(config: &Config) -> Theme {
    config
        .theme
        .as_deref()
        .map(Theme::from_name)
        .unwrap_or_else(Theme::dark_default)
}

/// Resolve the scan named by `source`: a saved result, or a fresh analysis
/// of an image. `None` when neither was given.
pub(crate) async fn load_scan(
    source: &ScanSource,
    client: &reqwest::Client,
    settings: &ServiceSettings,
) -> Result<Option<AnalysisResult>, Box<dyn Error>> {
    if let Some(path) = &source.context {
        return Ok(Some(AnalysisResult::load(path)?));
    }
    if let Some(image) = &source.image {
        eprintln!("🔎 Analyzing {}...", image.display());
        let image_data = encode_image(image)?;
        let analysis = AnalysisClient::new(client.clone(), settings.clone());
        return Ok(Some(analysis.analyze(image_data).await?));
    }
    Ok(None)
}

pub(crate) fn context_of(scan: Option<&AnalysisResult>) -> ScanContext {
    scan.map(AnalysisResult::to_context).unwrap_or_default()
}
