mod cli;
mod config;

use std::io::{Read, Write};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use html_policy::Policy;
use html_sanitizer::{HtmlCleaner, LolHtmlBackend};

use crate::cli::Cli;
use crate::config::{Config, LogFormat};

/// Exit status for input that was read but could not be cleaned.
const EXIT_REJECTED: u8 = 2;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

/// Install the global subscriber.  Logs go to stderr; stdout carries the
/// cleaned fragment.
fn init_tracing(cfg: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.logging.level));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .with_target(true);

    match cfg.logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

fn load_policy(cfg: &Config) -> Result<Policy> {
    match cfg.policy_file {
        Some(ref path) => Policy::from_file(path)
            .with_context(|| format!("failed to load policy file {}", path.display())),
        None => {
            info!("no policy file configured; using the baseline policy");
            Ok(Policy::baseline())
        }
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read standard input")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file {}", path.display()))
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    // 1. Parse CLI args.
    let cli = Cli::parse();

    // 2. Load config, then merge CLI overrides.
    let loaded = config::load(&cli.config)?;
    let config_found = loaded.is_some();
    let mut cfg = loaded.unwrap_or_default();

    if let Some(ref policy) = cli.policy {
        cfg.policy_file = Some(policy.clone());
    }
    if let Some(ref level) = cli.log_level {
        cfg.logging.level = level.clone();
    }

    // 3. Init tracing.
    init_tracing(&cfg);

    if !config_found {
        warn!(
            path = %cli.config.display(),
            "configuration file not found; using defaults"
        );
    }

    // 4. Compile the policy into a cleaner.
    let policy = load_policy(&cfg)?;
    let backend = LolHtmlBackend::new(cfg.backend.strict);
    let cleaner =
        HtmlCleaner::with_backend(policy, backend).context("failed to initialize cleaner")?;

    info!(
        config_file = %cli.config.display(),
        strict = cfg.backend.strict,
        ?cleaner,
        "cleaner ready"
    );

    if cli.check {
        let policy = cleaner.policy();
        println!(
            "policy ok: {} element(s) allowed, deleted with content: {}",
            policy.element_names().count(),
            policy.delete_with_content().join(", ")
        );
        return Ok(ExitCode::SUCCESS);
    }

    // 5. Clean the fragment.
    let input = read_input(&cli.input)?;

    match cleaner.try_clean(&input) {
        Ok(cleaned) => {
            info!(
                input_bytes = input.len(),
                output_bytes = cleaned.html.len(),
                elements = cleaned.stats.elements_visited,
                attributes_removed = cleaned.stats.attributes_removed,
                attributes_rewritten = cleaned.stats.attributes_rewritten,
                "fragment cleaned"
            );

            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(cleaned.html.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write output")?;

            if cli.stats {
                let stats = serde_json::to_string(&cleaned.stats)
                    .context("failed to serialize statistics")?;
                eprintln!("{stats}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            warn!(
                input = %cli.input.display(),
                error = %e,
                "fragment rejected"
            );
            Ok(ExitCode::from(EXIT_REJECTED))
        }
    }
}
