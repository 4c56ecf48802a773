// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use wikigloss::app_config::{self, Config};
use wikigloss::app_controller::{Controller, RunOptions, ShutdownSignal};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract and normalise the definitions of one or more dumps
    Process(ProcessArgs),

    /// Print the normalised form of one markup line
    Normalize {
        /// Definition markup, e.g. "# {{lb|en|rare}} A [[cat]]."
        #[arg(value_name = "TEXT")]
        text: String,

        /// Configuration file path
        #[arg(short, long = "config", default_value = "wikigloss.json")]
        config_path: PathBuf,
    },

    /// Generate shell completions for wikigloss
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ProcessArgs {
    /// Dump file, or directory searched for .xml dumps
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Configuration file path
    #[arg(short, long = "config", default_value = "wikigloss.json")]
    config_path: PathBuf,

    /// SQLite database path
    #[arg(short, long, env = "WIKIGLOSS_DATABASE")]
    database: Option<PathBuf>,

    /// Stop after this many pages
    #[arg(long)]
    limit: Option<usize>,

    /// Directory run reports are written to
    #[arg(long)]
    reports_dir: Option<PathBuf>,

    /// Render without resolving templates and modules
    #[arg(long)]
    offline: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// wikigloss - plain-text glosses from Wiktionary markup
#[derive(Parser, Debug)]
#[command(name = "wikigloss")]
#[command(version)]
#[command(about = "Turns Wiktionary definition markup into plain text")]
#[command(long_about = "wikigloss reads MediaWiki XML dumps, extracts the definition lines of one language,
resolves the templates and modules they invoke and rewrites them into plain text.

EXAMPLES:
    wikigloss process enwiktionary.xml               # Process one dump
    wikigloss process --limit 100 dumps/             # First 100 pages of every dump in a directory
    wikigloss process --offline enwiktionary.xml     # Skip dependency resolution
    wikigloss normalize '# {{lb|en|rare}} A [[cat]].'
    wikigloss completions bash > wikigloss.bash

CONFIGURATION:
    Configuration is stored in wikigloss.json by default. If the file doesn't
    exist, a default one is created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level does the filtering
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "wikigloss", &mut std::io::stdout());
            Ok(())
        }
        Commands::Normalize { text, config_path } => {
            let config = if config_path.exists() {
                Config::load_or_create(&config_path)?
            } else {
                Config::default()
            };
            log::set_max_level(config.log_level.to_level_filter());
            let controller = Controller::with_config(config)?;
            println!("{}", controller.normalize(&text));
            Ok(())
        }
        Commands::Process(args) => run_process(args).await,
    }
}

async fn run_process(options: ProcessArgs) -> Result<()> {
    let mut config = Config::load_or_create(Path::new(&options.config_path))?;

    // Command line options override the file
    if let Some(log_level) = options.log_level {
        config.log_level = log_level.into();
    }
    if let Some(database) = options.database {
        config.storage.database_path = Some(database);
    }
    if let Some(reports_dir) = options.reports_dir {
        config.storage.reports_dir = reports_dir;
    }
    if options.limit.is_some() {
        config.processing.limit = options.limit;
    }

    log::set_max_level(config.log_level.to_level_filter());
    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;

    let (trigger, shutdown) = ShutdownSignal::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight work");
            trigger.trigger();
        }
    });

    let report = controller
        .run(
            RunOptions {
                input: options.input,
                offline: options.offline,
            },
            shutdown,
        )
        .await?;

    info!("{}", report.summary().trim_end());
    Ok(())
}
