// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

mod config;
mod download;
mod errors;
mod fallback;
mod format_list;
mod input;
mod metadata;
mod progress;
mod rate;
mod session;
mod signals;
mod surface;
mod theme;
mod tui;
mod tui_formatters;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use ratatui::backend::Backend;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::{ColorChoice, Settings};
use crate::download::DownloadRequest;
use crate::format_list::Selection;
use crate::input::KeySource;
use crate::session::{failure_message, ProgressEnd, Session, WaitOutcome};
use crate::signals::SignalLatch;

const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[command(version, about = "Pick a video format and download it from the terminal")]
struct Args {
    /// Video page URL (http or https)
    #[arg(required_unless_present = "dump_config")]
    url: Option<String>,

    /// Directory to save the video in
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Plain line-based output instead of the full-screen interface
    #[arg(long)]
    plain: bool,

    /// Settings file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// auto, always or never
    #[arg(long, value_name = "WHEN")]
    color: Option<ColorChoice>,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

/// How the run ended, as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Completed,
    Cancelled,
    Failed(Option<i32>),
    Interrupted,
}

impl RunOutcome {
    fn exit_code(self) -> i32 {
        match self {
            RunOutcome::Completed => 0,
            RunOutcome::Cancelled => 1,
            RunOutcome::Failed(code) => code.filter(|c| *c != 0).unwrap_or(1),
            RunOutcome::Interrupted => 130,
        }
    }
}

impl From<ProgressEnd> for RunOutcome {
    fn from(end: ProgressEnd) -> Self {
        match end {
            ProgressEnd::Interrupted => RunOutcome::Interrupted,
            ProgressEnd::Finished(outcome) if outcome.success => RunOutcome::Completed,
            ProgressEnd::Finished(outcome) => RunOutcome::Failed(outcome.exit_code),
        }
    }
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        session::restore_terminal();
        previous(panic_info);
    }));
}

fn init_logging(settings: &Settings) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    let log_dir = config::get_app_paths()
        .map(|(_, data_dir)| data_dir.join("logs"))
        .filter(|dir| fs::create_dir_all(dir).is_ok());

    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "ytfetch.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .try_init()
                .ok();
            Some(guard)
        }
        // The full-screen interface owns the terminal; only plain mode may log to stderr.
        None if !settings.interactive => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init()
                .ok();
            None
        }
        None => None,
    }
}

async fn wait_for_shutdown(latch: &SignalLatch) {
    while !latch.take_shutdown() {
        tokio::time::sleep(SHUTDOWN_POLL).await;
    }
}

fn download_request(
    settings: &Settings,
    url: &str,
    format: String,
    output_dir: PathBuf,
) -> DownloadRequest {
    DownloadRequest {
        program: settings.downloader.clone(),
        url: url.to_string(),
        format: Some(format),
        default_format: settings.default_format.clone(),
        output_dir,
    }
}

/// One line on the normal terminal once the interface is gone.
fn report_result(end: ProgressEnd, output_dir: &Path) {
    match end {
        ProgressEnd::Finished(outcome) if outcome.success => {
            println!("Download completed successfully: {}", output_dir.display())
        }
        ProgressEnd::Finished(outcome) => eprintln!("Error: {}", failure_message(&outcome)),
        ProgressEnd::Interrupted => {}
    }
}

async fn run_interactive<B: Backend, S: KeySource>(
    mut session: Session<B, S>,
    settings: &Settings,
    url: &str,
    output_dir: PathBuf,
) -> Result<RunOutcome> {
    session.show_status("Fetching video information...")?;

    let program = settings.downloader.clone();
    let target = url.to_string();
    let fetch = tokio::spawn(async move { metadata::fetch(&program, &target).await });

    let waited = tokio::task::block_in_place(|| {
        session.run_spinner("Fetching video information...", || fetch.is_finished())
    })?;
    if waited == WaitOutcome::Interrupted {
        fetch.abort();
        return Ok(RunOutcome::Interrupted);
    }
    let info = match fetch.await? {
        Ok(info) => info,
        Err(e) => {
            session.show_error(&format!("Failed to fetch video information: {}", e));
            tokio::task::block_in_place(|| session.linger())?;
            return Err(e).wrap_err("Failed to fetch video information");
        }
    };

    let duration = info.duration_label();
    session.display_info(
        info.title.as_deref(),
        info.channel.as_deref(),
        duration.as_deref(),
    )?;

    let selection = tokio::task::block_in_place(|| session.select(info.formats.clone()))?;
    let format = match selection {
        Selection::Chosen(id) => id,
        Selection::Cancelled => {
            session.show_status("Download cancelled")?;
            tokio::task::block_in_place(|| session.linger())?;
            return Ok(RunOutcome::Cancelled);
        }
        Selection::Interrupted => return Ok(RunOutcome::Interrupted),
    };

    session.show_status("Starting download...")?;
    let (tx, mut rx) = mpsc::channel(download::CHANNEL_CAPACITY);
    let task = download::spawn(
        download_request(settings, url, format, output_dir.clone()),
        tx,
    );

    let end = match tokio::task::block_in_place(|| session.run_progress(&mut rx)) {
        Ok(end) => end,
        Err(e) => {
            task.abort();
            return Err(e.into());
        }
    };
    if end == ProgressEnd::Interrupted {
        task.abort();
    } else {
        // The download is over either way; an interrupt only cuts the pause short.
        tokio::task::block_in_place(|| session.linger())?;
    }

    drop(session);
    report_result(end, &output_dir);
    Ok(RunOutcome::from(end))
}

async fn run_plain(
    settings: &Settings,
    url: &str,
    output_dir: PathBuf,
    latch: Arc<SignalLatch>,
) -> Result<RunOutcome> {
    println!("Fetching video information...");
    let info = tokio::select! {
        fetched = metadata::fetch(&settings.downloader, url) => {
            fetched.wrap_err("Failed to fetch video information")?
        }
        _ = wait_for_shutdown(&latch) => return Ok(RunOutcome::Interrupted),
    };

    let mut stdout = io::stdout();
    fallback::print_video_info(&mut stdout, &info)?;
    fallback::print_formats(&mut stdout, &info.formats)?;

    let default_format = settings.default_format.clone();
    let prompt = tokio::task::spawn_blocking(move || {
        fallback::read_selection(&mut io::stdin().lock(), &mut io::stdout(), &default_format)
    });
    let selection = tokio::select! {
        read = prompt => read??,
        _ = wait_for_shutdown(&latch) => return Ok(RunOutcome::Interrupted),
    };
    let format = match selection {
        Selection::Chosen(id) => id,
        Selection::Cancelled => {
            println!("Cancelled.");
            return Ok(RunOutcome::Cancelled);
        }
        Selection::Interrupted => return Ok(RunOutcome::Interrupted),
    };

    println!("Downloading...");
    let (tx, mut rx) = mpsc::channel(download::CHANNEL_CAPACITY);
    let task = download::spawn(
        download_request(settings, url, format, output_dir.clone()),
        tx,
    );
    let end = fallback::report_progress(&mut rx, &latch, &mut io::stdout()).await?;
    if end == ProgressEnd::Interrupted {
        task.abort();
    }

    report_result(end, &output_dir);
    Ok(RunOutcome::from(end))
}

async fn run(
    settings: &Settings,
    url: &str,
    output_dir: PathBuf,
    latch: Arc<SignalLatch>,
) -> Result<RunOutcome> {
    metadata::validate_url(url)?;

    if settings.interactive {
        match Session::start(settings, latch.clone()) {
            Ok(session) => return run_interactive(session, settings, url, output_dir).await,
            Err(e) => warn!("Interactive mode unavailable, using plain output: {}", e),
        }
    }
    run_plain(settings, url, output_dir, latch).await
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    install_panic_hook();

    let args = Args::parse();
    let mut settings =
        config::load_settings(args.config.as_deref()).wrap_err("Failed to load settings")?;
    if let Some(output) = args.output {
        settings.output_dir = Some(output);
    }
    if let Some(color) = args.color {
        settings.color = color;
    }
    if args.plain {
        settings.interactive = false;
    }

    if args.dump_config {
        print!("{}", config::dump_settings(&settings)?);
        return Ok(());
    }
    let url = args.url.ok_or_else(|| eyre!("a video URL is required"))?;

    let log_guard = init_logging(&settings);
    info!(version = env!("CARGO_PKG_VERSION"), "ytfetch starting");

    let latch = SignalLatch::new();
    let _listener =
        signals::spawn_listener(latch.clone()).wrap_err("Failed to register signal handlers")?;

    let output_dir = config::prepare_output_dir(settings.output_dir.as_deref())
        .wrap_err("Failed to prepare the output directory")?;

    match run(&settings, &url, output_dir, latch).await {
        Ok(outcome) => {
            info!(?outcome, "ytfetch finished");
            drop(log_guard);
            std::process::exit(outcome.exit_code());
        }
        Err(e) => {
            error!("{:#}", e);
            drop(log_guard);
            Err(e)
        }
    }
}
