use slidecast::cli::Args;
use slidecast::scenario::Scenario;
use slidecast::shell::{Report, Shell};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

fn init_logging(args: &Args) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| PathBuf::from("slidecast.log"));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!(
            "Logging to file: {} (level: {:?})",
            log_path.display(),
            log_level
        );
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn print_report(report: &Report) {
    println!("steps:    {}", report.steps);
    println!(
        "selected: {}",
        report.selected.as_deref().unwrap_or("-")
    );
    println!("paused:   {}", report.paused);
    println!("slides:");
    for slide in &report.slides {
        match &slide.playback {
            Some(state) => println!("  {:<12} visible={} playback={}", slide.id, slide.visible, state),
            None => println!("  {:<12} visible={}", slide.id, slide.visible),
        }
    }
    println!("calls:");
    for (i, call) in report.calls.iter().enumerate() {
        println!("  {:>3}  {}", i, call);
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    info!("slidecast {} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);

    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(options) = &args.options {
        info!("Overriding carousel options: {}", options);
        scenario.options = Some(options.clone());
    }

    let mut shell = Shell::for_scenario(&scenario);
    let report = shell
        .run(&scenario)
        .with_context(|| format!("Scenario failed: {}", args.scenario.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        print_report(&report);
    }
    Ok(())
}
