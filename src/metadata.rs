// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::process::Stdio;
use std::sync::Arc;

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::FetchError;
use crate::format_list::{VariantDescriptor, NO_VIDEO};
use crate::tui_formatters::format_time;

pub const MAX_URL_LENGTH: usize = 2048;

const URL_PUNCTUATION: &[char] = &['/', ':', '.', '-', '_', '?', '=', '&', '%', '+', '#'];

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub title: Option<String>,
    pub channel: Option<String>,
    pub duration_secs: Option<u64>,
    /// Best first.
    pub formats: Arc<[VariantDescriptor]>,
}

impl VideoInfo {
    pub fn duration_label(&self) -> Option<String> {
        self.duration_secs.map(format_time)
    }
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    title: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    formats: Option<Vec<RawFormat>>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    resolution: Option<String>,
    ext: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
}

impl RawFormat {
    fn into_variant(self) -> Option<VariantDescriptor> {
        let id = self.format_id.filter(|id| !id.is_empty())?;
        let size = non_negative(self.filesize).or_else(|| non_negative(self.filesize_approx));
        Some(VariantDescriptor::new(
            id,
            self.resolution.unwrap_or_else(|| NO_VIDEO.to_string()),
            self.ext.unwrap_or_else(|| NO_VIDEO.to_string()),
            size,
        ))
    }
}

fn non_negative(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

pub fn validate_url(url: &str) -> Result<(), FetchError> {
    if url.is_empty() {
        return Err(FetchError::InvalidUrl("URL is empty".to_string()));
    }
    if url.len() >= MAX_URL_LENGTH {
        return Err(FetchError::InvalidUrl(format!(
            "URL too long (max {} characters)",
            MAX_URL_LENGTH - 1
        )));
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(FetchError::InvalidUrl(
            "URL must start with http:// or https://".to_string(),
        ));
    }
    if let Some(bad) = url
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !URL_PUNCTUATION.contains(c))
    {
        return Err(FetchError::InvalidUrl(format!(
            "URL contains invalid character: '{}'",
            bad
        )));
    }
    Ok(())
}

/// Parses the downloader's JSON dump. Formats come back best-first.
pub fn parse_video_info(json: &str) -> Result<VideoInfo, FetchError> {
    let raw: RawVideo = serde_json::from_str(json)?;

    let mut formats: Vec<VariantDescriptor> = raw
        .formats
        .unwrap_or_default()
        .into_iter()
        .filter_map(RawFormat::into_variant)
        .collect();
    if formats.is_empty() {
        return Err(FetchError::NoFormats);
    }
    // The downloader lists worst quality first.
    formats.reverse();

    Ok(VideoInfo {
        title: raw.title,
        channel: raw.channel.or(raw.uploader),
        duration_secs: non_negative(raw.duration),
        formats: formats.into(),
    })
}

pub async fn fetch(program: &str, url: &str) -> Result<VideoInfo, FetchError> {
    validate_url(url)?;
    info!(url, "Fetching video information");

    let output = Command::new(program)
        .args(["-j", "--no-playlist", "--no-warnings", url])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| FetchError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(FetchError::Exit {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let info = parse_video_info(&String::from_utf8_lossy(&output.stdout))?;
    debug!(formats = info.formats.len(), "video information parsed");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "title": "Big Buck Bunny",
        "uploader": "Blender Foundation",
        "duration": 596.5,
        "formats": [
            {"format_id": "139", "resolution": "audio only", "ext": "m4a", "filesize": 3000000},
            {"format_id": "sb0", "resolution": null, "ext": "mhtml"},
            {"resolution": "640x360", "ext": "mp4"},
            {"format_id": "18", "resolution": "640x360", "ext": "mp4", "filesize": null, "filesize_approx": 15000000.0},
            {"format_id": "137", "resolution": "1920x1080", "ext": "mp4", "filesize": -1}
        ]
    }"#;

    #[test]
    fn formats_are_reversed_and_cleaned() {
        let info = parse_video_info(SAMPLE).unwrap();
        let ids: Vec<&str> = info.formats.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["137", "18", "sb0", "139"]);

        assert_eq!(info.formats[0].size, None);
        assert_eq!(info.formats[1].size, Some(15_000_000));
        assert_eq!(info.formats[2].resolution, NO_VIDEO);
        assert_eq!(info.formats[3].size, Some(3_000_000));
    }

    #[test]
    fn channel_falls_back_to_uploader() {
        let info = parse_video_info(SAMPLE).unwrap();
        assert_eq!(info.title.as_deref(), Some("Big Buck Bunny"));
        assert_eq!(info.channel.as_deref(), Some("Blender Foundation"));
        assert_eq!(info.duration_label().as_deref(), Some("9m 56s"));

        let info = parse_video_info(
            r#"{"channel": "Blender", "uploader": "x", "formats": [{"format_id": "1"}]}"#,
        )
        .unwrap();
        assert_eq!(info.channel.as_deref(), Some("Blender"));
        assert_eq!(info.formats[0].extension, NO_VIDEO);
        assert!(info.duration_label().is_none());
    }

    #[test]
    fn missing_formats_are_an_error() {
        assert!(matches!(
            parse_video_info(r#"{"title": "x"}"#),
            Err(FetchError::NoFormats)
        ));
        assert!(matches!(
            parse_video_info(r#"{"formats": [{"ext": "mp4"}]}"#),
            Err(FetchError::NoFormats)
        ));
        assert!(matches!(
            parse_video_info("not json"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn url_validation() {
        assert!(validate_url("https://www.youtube.com/watch?v=aqz-KE-bpKQ").is_ok());
        assert!(validate_url("http://example.com/a_b+c%20#t=1&x=2").is_ok());
        assert!(validate_url("").is_err());
        assert!(validate_url("ftp://example.com").is_err());
        assert!(validate_url("https://example.com/$(rm -rf)").is_err());
        assert!(validate_url(&format!("https://{}", "a".repeat(MAX_URL_LENGTH))).is_err());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = fetch("ytfetch-no-such-downloader", "https://example.com/v")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_program_reports_exit_code() {
        let err = fetch("false", "https://example.com/v").await.unwrap_err();
        assert!(matches!(err, FetchError::Exit { code: 1, .. }));
    }
}
