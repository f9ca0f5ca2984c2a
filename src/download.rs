// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::DownloadError;

/// Prefix of the progress lines requested through `--progress-template`.
pub const PROGRESS_MARKER: &str = "ytfetch-progress:";
pub const CHANNEL_CAPACITY: usize = 64;

const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
}

impl DownloadOutcome {
    pub fn failed() -> Self {
        Self {
            success: false,
            exit_code: None,
        }
    }
}

/// Notices flowing from the download task to the control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    Progress { downloaded: u64, total: u64 },
    Stage(String),
    Status(String),
    Error(String),
    Complete(DownloadOutcome),
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub program: String,
    pub url: String,
    /// `None` downloads `default_format`.
    pub format: Option<String>,
    pub default_format: String,
    pub output_dir: PathBuf,
}

impl DownloadRequest {
    pub fn format(&self) -> &str {
        match self.format.as_deref() {
            Some(f) if !f.is_empty() => f,
            _ => &self.default_format,
        }
    }

    pub fn output_template(&self) -> String {
        self.output_dir
            .join(OUTPUT_TEMPLATE)
            .to_string_lossy()
            .into_owned()
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.format().to_string(),
            "-o".to_string(),
            self.output_template(),
            "--newline".to_string(),
            "--progress-template".to_string(),
            format!(
                "download:{}%(progress.downloaded_bytes)s/%(progress.total_bytes)s/%(progress.total_bytes_estimate)s",
                PROGRESS_MARKER
            ),
            self.url.clone(),
        ]
    }
}

fn parse_count(field: Option<&str>) -> Option<u64> {
    let value: f64 = field?.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

fn stage_for(tag: &str, rest: &str) -> Option<&'static str> {
    match tag {
        "info" => Some("Preparing download"),
        "download" if rest.starts_with("Destination:") => Some("Downloading"),
        "Merger" => Some("Merging formats"),
        "ExtractAudio" => Some("Extracting audio"),
        "VideoConvertor" | "VideoRemuxer" => Some("Converting video"),
        "Metadata" | "EmbedThumbnail" | "EmbedSubtitle" => Some("Writing metadata"),
        t if t.starts_with("Fixup") => Some("Fixing container"),
        _ => None,
    }
}

/// Turns one line of downloader stdout into a UI notice, if it carries one.
pub fn parse_line(line: &str) -> Option<UiMessage> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        let mut fields = rest.split('/');
        let downloaded = parse_count(fields.next())?;
        let total = parse_count(fields.next());
        let estimate = parse_count(fields.next());
        return Some(UiMessage::Progress {
            downloaded,
            total: total.or(estimate).unwrap_or(0),
        });
    }

    let (tag, rest) = line.strip_prefix('[')?.split_once(']')?;
    stage_for(tag, rest.trim()).map(|stage| UiMessage::Stage(stage.to_string()))
}

fn error_text(line: &str) -> String {
    line.trim()
        .trim_start_matches("ERROR:")
        .trim()
        .to_string()
}

/// Runs the downloader to completion, forwarding progress through `tx`.
///
/// Progress notices are dropped when the queue is full; stage and error
/// notices wait for room.
pub async fn run(
    request: &DownloadRequest,
    tx: &mpsc::Sender<UiMessage>,
) -> Result<DownloadOutcome, DownloadError> {
    let args = request.args();
    info!(program = %request.program, format = request.format(), "Starting download");
    debug!(?args, "downloader arguments");

    let mut child = Command::new(&request.program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| DownloadError::Spawn {
            program: request.program.clone(),
            source,
        })?;

    let status = format!("Downloading format {}", request.format());
    let _ = tx.send(UiMessage::Status(status)).await;

    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut last_line = None;
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    last_line = Some(line);
                }
            }
        }
        last_line
    });

    if let Some(stdout) = child.stdout.take() {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_line(&line) {
                Some(progress @ UiMessage::Progress { .. }) => {
                    let _ = tx.try_send(progress);
                }
                Some(notice) => {
                    let _ = tx.send(notice).await;
                }
                None => {}
            }
        }
    }

    let status = child.wait().await?;
    let last_error = stderr_task.await.ok().flatten();

    let outcome = DownloadOutcome {
        success: status.success(),
        exit_code: status.code(),
    };
    if outcome.success {
        info!("Download finished");
    } else {
        warn!(exit_code = ?outcome.exit_code, "Downloader failed");
        if let Some(line) = last_error {
            let _ = tx.send(UiMessage::Error(error_text(&line))).await;
        }
    }
    Ok(outcome)
}

/// Spawns [`run`] on the runtime. The task always ends by sending
/// [`UiMessage::Complete`]; aborting it kills the child process.
pub fn spawn(request: DownloadRequest, tx: mpsc::Sender<UiMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = match run(&request, &tx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Download failed: {}", e);
                let _ = tx.send(UiMessage::Error(e.to_string())).await;
                DownloadOutcome::failed()
            }
        };
        let _ = tx.send(UiMessage::Complete(outcome)).await;
    })
}
