// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("terminal is not available for interactive mode: {0}")]
    Init(#[source] io::Error),

    #[error("failed to draw to the terminal: {0}")]
    Render(#[source] io::Error),

    #[error("failed to read terminal input: {0}")]
    Input(#[source] io::Error),

    #[error("render state lock was poisoned")]
    Poisoned,

    #[error("no formats to choose from")]
    NoVariants,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with status {code}: {stderr}")]
    Exit {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("failed to parse video metadata: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("video metadata lists no downloadable formats")]
    NoFormats,
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read downloader output: {0}")]
    Io(#[from] io::Error),
}
