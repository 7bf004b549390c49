use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use webai_config::{ConfigLoader, WarningSeverity, WebAiConfig};

use crate::logging;
use crate::providers;

mod capture;
mod run;
mod setup;

/// 🌐 WebAI — a vision model that browses the web for you
#[derive(Parser, Debug)]
#[command(name = "webai", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to webai.toml config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level override (e.g. debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all log output (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a question by letting the model browse
    Run {
        /// What to ask (prompted for when omitted)
        prompt: Option<String>,
        /// Open this page before the first model turn
        #[arg(short, long)]
        url: Option<String>,
        /// Give up after this many model turns
        #[arg(long)]
        max_steps: Option<u32>,
        /// Show the browser window
        #[arg(long)]
        headed: bool,
    },
    /// Open a page, label its clickable elements and save a screenshot
    Browse {
        url: String,
        /// Directory for screenshot.png (default: browser.images_dir)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Save a full-page screenshot once the network is idle
    Screen {
        url: String,
        /// Output file
        #[arg(short, long, default_value = "images/screenshot.png")]
        out: PathBuf,
        #[arg(long, default_value = "1920")]
        width: u32,
        #[arg(long, default_value = "1080")]
        height: u32,
    },
    /// Show current configuration
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check configuration, browser and API keys
    Doctor,
    /// Initialize a new webai.toml in the current or home directory
    Init {
        /// Create in current directory instead of ~/.webai/
        #[arg(long)]
        local: bool,
    },
    /// Show version and build info
    Version,
    /// Generate shell completions for bash, zsh, or fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub async fn run(self) -> webai_core::Result<()> {
        // `init` must work before any config exists.
        if let Commands::Init { local } = self.command {
            return setup::cmd_init(local);
        }

        // Load config first so we can use it for log format
        let config_loader = ConfigLoader::load(self.config.as_deref())?;
        let config = config_loader.get();

        let level = logging::resolve_level(
            self.verbose,
            self.quiet,
            self.log_level.as_deref(),
            &config.logging.level,
        );
        let _guard = logging::init(level, &config.logging)?;

        match self.command {
            Commands::Run {
                prompt,
                url,
                max_steps,
                headed,
            } => run::cmd_run(config, prompt, url, max_steps, headed).await,
            Commands::Browse { url, out } => capture::cmd_browse(config, url, out).await,
            Commands::Screen {
                url,
                out,
                width,
                height,
            } => capture::cmd_screen(config, url, out, width, height).await,
            Commands::Config { json } => Self::cmd_config(config, json),
            Commands::Doctor => Self::cmd_doctor(config, config_loader.path()),
            Commands::Version => Self::cmd_version(),
            Commands::Completions { shell } => Self::cmd_completions(shell),
            Commands::Init { .. } => Ok(()),
        }
    }

    fn cmd_config(config: WebAiConfig, json: bool) -> webai_core::Result<()> {
        let config = config.redacted();
        if json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config)
                    .map_err(|e| webai_core::WebAiError::Config(e.to_string()))?
            );
        }
        Ok(())
    }

    fn cmd_doctor(config: WebAiConfig, path: &std::path::Path) -> webai_core::Result<()> {
        println!("🩺 WebAI Doctor");
        println!("   Config: {}", path.display());
        println!();

        let warnings = match config.validate() {
            Ok(w) => w,
            Err(e) => {
                println!("{e}");
                return Ok(());
            }
        };

        let mut warn_count = 0;
        let mut info_count = 0;
        let mut ok_count = 0;

        for w in &warnings {
            println!("  {w}");
            match w.severity {
                WarningSeverity::Warning => warn_count += 1,
                WarningSeverity::Info => info_count += 1,
                WarningSeverity::Error => {}
            }
        }

        match webai_browser::launcher::find_chrome_binary(config.browser.executable.as_deref()) {
            Ok(path) => {
                println!("  ✅ browser: {}", path.display());
                ok_count += 1;
            }
            Err(e) => {
                println!("  ⚠️  browser: {e}");
                warn_count += 1;
            }
        }

        match providers::missing_key_hint(&config) {
            None => {
                println!("  ✅ api key for {}", config.agent.model);
                ok_count += 1;
            }
            Some(hint) => {
                println!("  ⚠️  services: no API key for {}", config.agent.model);
                println!("   ↳ {hint}");
                warn_count += 1;
            }
        }

        println!();
        println!("  ✅ {ok_count} checks passed, ⚠️  {warn_count} warnings, 💡 {info_count} suggestions");
        Ok(())
    }

    fn cmd_version() -> webai_core::Result<()> {
        println!("🌐 WebAI v{}", env!("CARGO_PKG_VERSION"));
        println!("   Target: {}", std::env::consts::ARCH);
        println!("   OS: {}", std::env::consts::OS);
        #[cfg(debug_assertions)]
        println!("   Profile: debug");
        #[cfg(not(debug_assertions))]
        println!("   Profile: release");
        Ok(())
    }

    fn cmd_completions(shell: Shell) -> webai_core::Result<()> {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "webai", &mut std::io::stdout());
        Ok(())
    }
}
