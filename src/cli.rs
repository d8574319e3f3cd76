use clap::Parser;
use std::path::PathBuf;

// Build version with engine info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Engine: simulated paging engine\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Carousel and video slide coordination runner
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Scenario file (JSON) to run
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Override the carousel's flickity-options attribute (JSON object text)
    #[arg(short = 'o', long = "options", value_name = "JSON")]
    pub options: Option<String>,

    /// Print the report as JSON instead of text
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Enable debug logging to file (default: slidecast.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
