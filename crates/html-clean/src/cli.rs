use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "html-clean",
    version,
    about = "Whitelist sanitizer for untrusted HTML fragments"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "html-clean.yaml")]
    pub config: PathBuf,

    /// Path to the policy file (overrides config file setting)
    #[arg(short, long)]
    pub policy: Option<PathBuf>,

    /// Log filter such as `debug` or `html_sanitizer=trace` (overrides config file setting)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Validate the policy and exit without reading any input
    #[arg(long)]
    pub check: bool,

    /// Print cleaning statistics as JSON on stderr
    #[arg(long)]
    pub stats: bool,

    /// Fragment to clean; `-` reads standard input
    #[arg(default_value = "-")]
    pub input: PathBuf,
}
