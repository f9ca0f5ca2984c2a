// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::{self, BufRead, Write};
use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tracing::warn;

use crate::download::{DownloadOutcome, UiMessage};
use crate::format_list::{Selection, VariantDescriptor};
use crate::metadata::VideoInfo;
use crate::session::ProgressEnd;
use crate::signals::SignalLatch;
use crate::tui_formatters::{format_bytes, format_optional_bytes};

pub const MAX_FORMAT_CODE_LENGTH: usize = 32;

const LATCH_POLL: Duration = Duration::from_millis(250);
const PERCENT_STEP: u64 = 10;

pub fn print_video_info<W: Write>(out: &mut W, info: &VideoInfo) -> io::Result<()> {
    writeln!(out, "Video:    {}", info.title.as_deref().unwrap_or("N/A"))?;
    writeln!(out, "Channel:  {}", info.channel.as_deref().unwrap_or("N/A"))?;
    writeln!(
        out,
        "Duration: {}",
        info.duration_label().as_deref().unwrap_or("N/A")
    )?;
    writeln!(out)
}

pub fn print_formats<W: Write>(out: &mut W, variants: &[VariantDescriptor]) -> io::Result<()> {
    writeln!(
        out,
        "{:<4} {:<10} {:<12} {:<6} {:>10}  Quality",
        "#", "Format", "Resolution", "Type", "Size"
    )?;
    writeln!(out, "{}", "-".repeat(60))?;
    for (index, variant) in variants.iter().enumerate() {
        writeln!(
            out,
            "{:<4} {:<10} {:<12} {:<6} {:>10}  {}",
            index + 1,
            variant.id,
            variant.resolution,
            variant.extension,
            format_optional_bytes(variant.size),
            variant.quality_label()
        )?;
    }
    writeln!(out)
}

/// Checks a typed format code. Blank input is valid and means "default".
pub fn validate_format_code(code: &str) -> Result<(), String> {
    if code.len() > MAX_FORMAT_CODE_LENGTH {
        return Err(format!(
            "Format code too long (max {} characters)",
            MAX_FORMAT_CODE_LENGTH
        ));
    }
    if let Some(bad) = code
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(format!("Format code contains invalid character: '{}'", bad));
    }
    Ok(())
}

/// Prompts until a valid code is typed. End of input or `q` cancels.
pub fn read_selection<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    default_format: &str,
) -> io::Result<Selection> {
    loop {
        write!(out, "Enter the format code (leave blank for best quality, q to quit): ")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(Selection::Cancelled);
        }

        let code = line.trim();
        if code.eq_ignore_ascii_case("q") {
            return Ok(Selection::Cancelled);
        }
        if code.is_empty() {
            return Ok(Selection::Chosen(default_format.to_string()));
        }
        match validate_format_code(code) {
            Ok(()) => return Ok(Selection::Chosen(code.to_string())),
            Err(reason) => {
                warn!(code, "rejected format code");
                writeln!(out, "Error: {}", reason)?;
            }
        }
    }
}

/// Prints stage changes and coarse percentages until the download ends.
pub async fn report_progress<W: Write>(
    rx: &mut Receiver<UiMessage>,
    latch: &SignalLatch,
    out: &mut W,
) -> io::Result<ProgressEnd> {
    let mut ticker = tokio::time::interval(LATCH_POLL);
    let mut last_stage = String::new();
    let mut last_percent: Option<u64> = None;

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(UiMessage::Progress { downloaded, total }) if total > 0 => {
                    let percent = (downloaded.min(total) * 100) / total;
                    let due = match last_percent {
                        None => true,
                        Some(last) => percent >= last + PERCENT_STEP || percent < last,
                    };
                    if due {
                        writeln!(out, "  {:>3}% of {}", percent, format_bytes(total))?;
                        last_percent = Some(percent);
                    }
                }
                Some(UiMessage::Progress { .. }) => {}
                Some(UiMessage::Stage(stage)) => {
                    if stage != last_stage {
                        writeln!(out, "{}...", stage)?;
                        last_stage = stage;
                        last_percent = None;
                    }
                }
                Some(UiMessage::Status(text)) => writeln!(out, "{}", text)?,
                Some(UiMessage::Error(text)) => writeln!(out, "Error: {}", text)?,
                Some(UiMessage::Complete(outcome)) => return Ok(ProgressEnd::Finished(outcome)),
                None => return Ok(ProgressEnd::Finished(DownloadOutcome::failed())),
            },
            _ = ticker.tick() => {
                if latch.take_shutdown() {
                    return Ok(ProgressEnd::Interrupted);
                }
            }
        }
    }
}
