use clap::Parser;
use popsweep::resolver::Locator;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "popsweep")]
#[command(about = "YAML browser test suites with a background popup sweeper")]
#[command(version)]
struct Cli {
    /// Config file to run
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Popup locator to sweep for (overrides config)
    #[arg(long, value_name = "SELECTOR")]
    locator: Option<String>,

    /// Sweep interval in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Give up sweeping after this many milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> popsweep::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = popsweep::Params::from_args(&cli.params)?;
    let mut config = popsweep::Config::load_with_params(&cli.config, &params)?;
    apply_overrides(&mut config, &cli)?;

    if cli.check {
        println!("Config valid: {}", config.name);
        if let Some(ref base) = config.base_url {
            println!("  Base URL: {}", base);
        }
        if let Some(ref dismiss) = config.dismiss {
            let timeout = dismiss
                .timeout_ms
                .map(|t| format!("{}ms", t))
                .unwrap_or_else(|| "none".into());
            println!(
                "  Popup: '{}' every {}ms (timeout: {}, scope: {:?}, join: {:?}{})",
                dismiss.locator,
                dismiss.interval_ms,
                timeout,
                dismiss.scope,
                dismiss.join,
                if dismiss.required { ", required" } else { "" }
            );
        }
        println!("  Scenarios: {}", config.scenarios.len());
        for scenario in &config.scenarios {
            println!("    - {} ({} steps)", scenario.name, scenario.steps.len());
        }
        if !config.params.is_empty() {
            println!("  Parameters: {}", config.params.len());
            for (name, def) in &config.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        if let Some(ref on_failure) = config.on_failure {
            if let Some(ref retry) = on_failure.retry {
                println!("  Retry attempts: {}", retry.attempts);
            }
        }
        return Ok(());
    }

    if cli.headless {
        config.browser.headless = true;
    }

    println!("Running: {}", config.name);

    let runner = popsweep::Runner::launch(&config.browser).await?;
    let report = runner.run(&config).await;
    runner.close().await?;
    let report = report?;

    println!();
    for scenario in &report.scenarios {
        if scenario.success {
            println!("✓ {}", scenario.name);
        } else {
            println!("✗ {}", scenario.name);
            if let Some(ref error) = scenario.error {
                println!("  Error: {}", error);
            }
        }
        println!("  Steps: {}", scenario.steps_executed);
        println!("  Duration: {}ms", scenario.duration_ms);
        if let Some(ref dismissal) = scenario.dismissal {
            println!("  Popup: {}", dismissal);
        }
        if scenario.retries > 0 {
            println!("  Retries: {}", scenario.retries);
        }
    }
    if let Some(ref error) = report.error {
        println!("✗ Suite error: {}", error);
    }
    println!(
        "\n{}/{} passed in {}ms",
        report.scenarios.len() - report.failed(),
        report.scenarios.len(),
        report.duration_ms
    );

    if !report.success() {
        std::process::exit(1);
    }

    Ok(())
}

/// Fold the `--locator`/`--interval-ms`/`--timeout-ms` flags into the config.
fn apply_overrides(config: &mut popsweep::Config, cli: &Cli) -> popsweep::Result<()> {
    let locator = cli.locator.as_deref().map(Locator::new).transpose()?;
    config.override_dismiss(locator, cli.interval_ms, cli.timeout_ms)
}
