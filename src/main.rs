//! dashcheck - Dashboard Smoke Check
//!
//! Main entry point. With no arguments it verifies the dev server at
//! http://localhost:5173 and exits nonzero on the first failure.

use std::path::PathBuf;

use clap::Parser;
use dashcheck::{Config, Verifier};
use tracing_subscriber::EnvFilter;

/// Verify that the progress dashboard renders the unfiltered issue list
#[derive(Parser, Debug)]
#[command(name = "dashcheck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dashboard dev server URL
    #[arg(long, short = 'u')]
    url: Option<String>,

    /// Screenshot output path
    #[arg(long, short = 's')]
    screenshot: Option<PathBuf>,

    /// Bound for the initial render, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Run in headed browser mode (visible window)
    #[arg(long)]
    headed: bool,

    /// Chrome/Chromium executable
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Disable the Chromium sandbox
    #[arg(long)]
    no_sandbox: bool,

    /// Skip the dev server readiness probe
    #[arg(long)]
    no_preflight: bool,

    /// Open the screenshot after a successful run
    #[arg(long)]
    open: bool,

    /// Config file (default: ~/.config/dashcheck/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Print the default config and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,
}

fn init_tracing(config: &Config, debug: bool) {
    // RUST_LOG takes precedence over the configured level
    let filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) if debug => EnvFilter::new("dashcheck=debug,info"),
        Err(_) => EnvFilter::new(&config.logging.level),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", Config::default_config_toml());
        return Ok(());
    }

    // Build configuration
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    // Apply CLI overrides
    if let Some(url) = args.url {
        config.dashboard.url = url;
    }
    if let Some(path) = args.screenshot {
        config.output.screenshot = path;
    }
    if let Some(ms) = args.timeout_ms {
        config.wait.timeout_ms = ms;
    }
    if let Some(path) = args.chrome {
        config.browser.executable = Some(path);
    }
    if args.headed {
        config.browser.headed = true;
    }
    if args.no_sandbox {
        config.browser.no_sandbox = true;
    }
    if args.no_preflight {
        config.dashboard.preflight = false;
    }
    if args.open {
        config.output.open_screenshot = true;
    }

    init_tracing(&config, args.debug);

    let open = config.output.open_screenshot;
    let report = Verifier::new(config)?.run().await?;

    tracing::info!(
        stage = %report.stage,
        mocked_requests = report.mocked_requests,
        "verification passed"
    );

    if let Some(path) = report.screenshot {
        println!("Screenshot saved to {}", path.display());
        if open && webbrowser::open(&path.to_string_lossy()).is_err() {
            eprintln!("Could not open {}", path.display());
        }
    }

    Ok(())
}
