use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::AsyncBufReadExt;
use tokio::signal::unix::{signal, SignalKind};

mod bridge;
mod config;
mod error;
mod identity;
mod session;
mod version;

use bridge::ShellBridge;
use config::GhostConfig;
use error::Result;
use session::GhostSession;

#[derive(Parser)]
#[command(
    name = "ghostmode",
    version,
    about = "ghostmode — temporary device privacy hardening over a privileged shell bridge"
)]
struct Cli {
    /// Path to Ghostfile.toml
    #[arg(short, long, default_value = "Ghostfile.toml")]
    file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harden the device, hold until Enter or Ctrl-C, then restore
    Run {
        /// SDK level to use instead of detecting it through the bridge
        #[arg(long)]
        sdk: Option<u32>,
    },
    /// Query the network identity and show the gate classification
    Check,
    /// Show the sensor-privacy toggle parameters for an SDK level
    Resolve {
        /// SDK level to resolve (default: detect through the bridge)
        sdk: Option<u32>,
    },
    /// Generate a starter Ghostfile.toml
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .without_time()
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {e}", "[ghost]".red().bold());
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run { sdk } => {
            let cfg = GhostConfig::load(&cli.file)?;
            let bridge = ShellBridge::from_cmdline(&cfg.bridge);

            let sdk = match sdk.or(cfg.sdk) {
                Some(s) => s,
                None => bridge::detect_sdk(&bridge).await,
            };
            let spec = version::resolve(sdk);
            if spec.uncertain {
                println!(
                    "{} unknown SDK level {sdk} — using fallback transaction code {}",
                    "!".yellow(),
                    spec.transaction_code
                );
            }

            println!("{} checking network identity...", "→".cyan());
            let id = identity::fetch(&cfg.identity_url).await?;
            println!(
                "  ip {}  country {}  timezone {}",
                id.ip.cyan(),
                id.country.cyan(),
                id.timezone.as_deref().unwrap_or("unknown").cyan()
            );
            let decision = identity::gate(&id, &cfg.deny_country, confirm_override);

            // Handlers must be registered before the first mutation so an
            // interrupt arriving mid-apply still reaches the restore below.
            let mut interrupt = signal(SignalKind::interrupt())?;
            let mut terminate = signal(SignalKind::terminate())?;

            let mut session = GhostSession::new(&cfg.app, &cfg.baseline_timezone);
            if let Err(e) = session.start(spec, decision, &bridge).await {
                session.restore(&bridge).await;
                return Err(e);
            }

            println!(
                "{} hardened — press {} or {} to end the session",
                "✓".green(),
                "Enter".cyan(),
                "Ctrl-C".cyan()
            );
            tokio::select! {
                _ = interrupt.recv() => println!("\n{} interrupted", "→".yellow()),
                _ = terminate.recv() => println!("\n{} terminated", "→".yellow()),
                _ = wait_for_enter() => {}
            }

            println!("{} restoring...", "→".yellow());
            let report = session.restore(&bridge).await;
            for (kind, ok) in &report.outcomes {
                if *ok {
                    println!("  {} {} restored", "✓".green(), kind.label());
                } else {
                    println!("  {} {} restore failed", "!".yellow(), kind.label());
                }
            }
            println!("{} session ended", "✓".green());
        }

        Commands::Check => {
            let cfg = GhostConfig::load(&cli.file)?;
            let id = identity::fetch(&cfg.identity_url).await?;
            println!(
                "  ip {}  country {}  timezone {}",
                id.ip.cyan(),
                id.country.cyan(),
                id.timezone.as_deref().unwrap_or("unknown").cyan()
            );
            // Same classification `run` uses, with the override refused.
            match identity::gate(&id, &cfg.deny_country, |_| false) {
                identity::SafetyDecision::Abort => println!(
                    "{} country matches denylist ({}) — `run` would require an override",
                    "!".yellow(),
                    cfg.deny_country.cyan()
                ),
                _ => println!("{} network context clear", "✓".green()),
            }
        }

        Commands::Resolve { sdk } => {
            let cfg = GhostConfig::load(&cli.file)?;
            let sdk = match sdk.or(cfg.sdk) {
                Some(s) => s,
                None => {
                    let bridge = ShellBridge::from_cmdline(&cfg.bridge);
                    bridge::detect_sdk(&bridge).await
                }
            };
            let spec = version::resolve(sdk);
            println!(
                "  sdk {}  transaction code {}  enable {}  disable {}",
                sdk.to_string().cyan(),
                spec.transaction_code.to_string().cyan(),
                spec.enable_value,
                spec.disable_value
            );
            if spec.uncertain {
                println!("{} no known mapping for this level — fallback code", "!".yellow());
            }
        }

        Commands::Init => {
            GhostConfig::write_template(&cli.file)?;
            println!("{} created {}", "✓".green(), cli.file.display().to_string().cyan());
            println!(
                "  edit it, then run {} to start a hardened session",
                "ghostmode run".cyan()
            );
        }
    }

    Ok(())
}

/// Yes/no prompt shown only when the gate matched the denylist. Anything but
/// an explicit affirmative refuses — the gate fails closed.
fn confirm_override(country: &str) -> bool {
    print!(
        "{} network exit is in denylisted country '{country}' — harden anyway? [y/N] ",
        "!".yellow()
    );
    std::io::Write::flush(&mut std::io::stdout()).ok();
    let mut input = String::new();
    std::io::BufRead::read_line(&mut std::io::stdin().lock(), &mut input).ok();
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

async fn wait_for_enter() {
    let mut line = String::new();
    let _ = tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await;
}
