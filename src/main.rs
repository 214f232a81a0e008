//! vtrim - cut the A-B range of a video with ffmpeg
//!
//! Command line entry point: loads the profile, builds the host snapshot
//! by probing the input and runs the trim.

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use vtrim::build::TrimMode;
use vtrim::cli::{Args, Commands};
use vtrim::config::Options;
use vtrim::hooks::{run_hooks, HookContext};
use vtrim::host::probe_host;
use vtrim::tracks;
use vtrim::workflow::Trimmer;

const STATUS_PREFIX: &str = "[vtrim]";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting vtrim {}", env!("CARGO_PKG_VERSION"));

    let options = Options::load(args.config.as_deref(), args.profile.as_deref());

    match args.command {
        Commands::Trim {
            input,
            start,
            end,
            select,
            no_subs,
            no_audio,
            detached,
            burn_subs,
        } => {
            let mut options = options;
            options.burn_subs |= burn_subs;
            let mode = TrimMode {
                no_subs,
                no_audio,
                detached,
            };
            let trim = start.zip(end);
            run_trim(Trimmer::new(options), input, trim, &select, mode).await?;
        }

        Commands::Probe { input, select } => {
            let trimmer = Trimmer::new(options);
            let host = probe_host(trimmer.runner(), trimmer.options(), &input, None, &select).await?;

            println!("\nTracks of {}:", input.display());
            println!("{:<8} {:<10} {:<20} {:<10}", "Index", "Type", "Codec", "Selected");
            println!("{}", "-".repeat(50));
            for track in &host.tracks {
                println!(
                    "{:<8} {:<10} {:<20} {:<10}",
                    track.index,
                    track.kind.to_string(),
                    track.codec,
                    if track.selected { "yes" } else { "" }
                );
            }

            let selected = tracks::select(&host.tracks);
            println!();
            if let Some(geometry) = host.geometry {
                println!("Geometry: {}", geometry);
            }
            if let Some(layout) = &host.audio_channels {
                println!("Audio channels: {}", layout);
            }
            if let Some(subtitle) = &selected.subtitle {
                println!("Subtitle codec: {}", subtitle.codec);
            }
        }

        Commands::Hooks { output } => {
            if options.hooks.is_empty() {
                println!("{} No hooks configured", STATUS_PREFIX);
                return Ok(());
            }

            let trimmer = Trimmer::new(options);
            let reports = run_hooks(
                trimmer.runner(),
                &trimmer.options().hooks,
                &HookContext::for_output(&output),
            )
            .await;

            for report in &reports {
                println!("{} {}", STATUS_PREFIX, report.message());
            }
            if reports.iter().any(|report| !report.success) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_trim(
    trimmer: Trimmer,
    input: PathBuf,
    trim: Option<(f64, f64)>,
    select: &[u32],
    mode: TrimMode,
) -> Result<()> {
    // Validated before ffprobe runs
    let request = match trimmer.validate(trim, mode) {
        Ok(request) => request,
        Err(e) => {
            error!("{}", e);
            println!("{} {}", STATUS_PREFIX, e);
            std::process::exit(1);
        }
    };

    let host = trimmer.snapshot(&input, &request, select).await?;

    println!("{} Running... {}", STATUS_PREFIX, mode.summary());

    let spinner = (!mode.detached).then(|| {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(format!("Trimming {:.3}-{:.3}", request.start, request.end));
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    });

    let report = trimmer.execute(&host, request).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    for notice in &report.notices {
        println!("{} {}", STATUS_PREFIX, notice);
    }
    println!("{} {}", STATUS_PREFIX, report.outcome.message());
    for hook in &report.hooks {
        println!("{} {}", STATUS_PREFIX, hook.message());
    }

    if !report.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = std::env::current_dir()?.join(".vtrim").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "vtrim.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Status lines go to stdout, so the console only shows warnings unless verbose
    let console_filter = if verbose { Level::DEBUG } else { Level::WARN };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::from_level(console_filter));

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - file: {}", log_dir.join("vtrim.log").display());

    Ok(())
}
