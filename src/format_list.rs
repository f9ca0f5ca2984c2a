// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use tracing::debug;

use crate::errors::UiError;

/// Resolution label the downloader uses for streams without video.
pub const NO_VIDEO: &str = "N/A";
const AUDIO_MARKER: &str = "audio";
const AUDIO_CONTAINERS: &[&str] = &["m4a", "webm", "opus", "mp3", "ogg", "aac"];

/// One downloadable encoding of the source video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDescriptor {
    pub id: String,
    pub resolution: String,
    pub extension: String,
    pub size: Option<u64>,
}

impl VariantDescriptor {
    pub fn new(
        id: impl Into<String>,
        resolution: impl Into<String>,
        extension: impl Into<String>,
        size: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            resolution: resolution.into(),
            extension: extension.into(),
            size,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        self.resolution == NO_VIDEO || self.resolution.to_ascii_lowercase().contains(AUDIO_MARKER)
    }

    /// Frame height parsed from a `WIDTHxHEIGHT` resolution label.
    pub fn height(&self) -> Option<u32> {
        let (_, height) = self.resolution.split_once('x')?;
        height.trim().parse().ok()
    }

    pub fn quality_label(&self) -> &'static str {
        if self.resolution == NO_VIDEO {
            if AUDIO_CONTAINERS.contains(&self.extension.as_str()) {
                return "Audio Only";
            }
            return "";
        }
        match self.height() {
            Some(h) if h >= 2160 => "4K UHD",
            Some(h) if h >= 1440 => "2K QHD",
            Some(h) if h >= 1080 => "Full HD",
            Some(h) if h >= 720 => "HD",
            Some(h) if h >= 480 => "SD",
            _ => "",
        }
    }
}

/// What the user decided in the selection view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(String),
    Cancelled,
    Interrupted,
}

/// Selection cursor plus the window of rows currently on screen.
///
/// Invariant: `viewport_start <= selected_index < viewport_start + viewport_lines`.
#[derive(Debug, Clone)]
pub struct FormatListModel {
    variants: Arc<[VariantDescriptor]>,
    selected_index: usize,
    viewport_start: usize,
    viewport_lines: usize,
}

impl FormatListModel {
    pub fn new(variants: Arc<[VariantDescriptor]>) -> Result<Self, UiError> {
        if variants.is_empty() {
            return Err(UiError::NoVariants);
        }
        Ok(Self {
            variants,
            selected_index: 0,
            viewport_start: 0,
            viewport_lines: 1,
        })
    }

    pub fn variants(&self) -> &Arc<[VariantDescriptor]> {
        &self.variants
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn selected_index(&self) -> usize {
        self.selected_index
    }

    #[cfg(test)]
    pub fn viewport_start(&self) -> usize {
        self.viewport_start
    }

    #[cfg(test)]
    pub fn viewport_lines(&self) -> usize {
        self.viewport_lines
    }

    pub fn selected(&self) -> &VariantDescriptor {
        &self.variants[self.selected_index]
    }

    /// Identifier of the highlighted variant, as handed to the downloader.
    pub fn confirm(&self) -> Selection {
        Selection::Chosen(self.selected().id.clone())
    }

    pub fn set_viewport_lines(&mut self, lines: usize) {
        self.viewport_lines = lines.max(1);
        self.keep_selection_visible();
    }

    pub fn navigate(&mut self, delta: isize) {
        let last = self.len() - 1;
        let target = self.selected_index.saturating_add_signed(delta).min(last);
        self.select(target);
    }

    pub fn page_up(&mut self) {
        self.navigate(-(self.viewport_lines as isize));
    }

    pub fn page_down(&mut self) {
        self.navigate(self.viewport_lines as isize);
    }

    pub fn home(&mut self) {
        self.select(0);
    }

    pub fn end(&mut self) {
        self.select(self.len() - 1);
    }

    /// Moves the cursor to `index` (clamped) and scrolls it into view.
    pub fn select(&mut self, index: usize) {
        self.selected_index = index.min(self.len() - 1);
        self.keep_selection_visible();
    }

    /// Resolves a single-key shortcut. Returns false when the key does not
    /// map to anything in this list.
    pub fn apply_shortcut(&mut self, key: char) -> bool {
        match key.to_ascii_lowercase() {
            'b' => self.home(),
            'w' => self.end(),
            'a' => match self.variants.iter().position(VariantDescriptor::is_audio_only) {
                Some(index) => self.select(index),
                None => return false,
            },
            digit @ '1'..='9' => {
                let index = digit as usize - '1' as usize;
                if index >= self.len() {
                    return false;
                }
                self.select(index);
            }
            _ => return false,
        }
        debug!(key = %key, index = self.selected_index, "shortcut applied");
        true
    }

    /// Rows inside the viewport, paired with their list index.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &VariantDescriptor)> {
        self.variants
            .iter()
            .enumerate()
            .skip(self.viewport_start)
            .take(self.viewport_lines)
    }

    pub fn has_more_above(&self) -> bool {
        self.viewport_start > 0
    }

    pub fn has_more_below(&self) -> bool {
        self.viewport_start + self.viewport_lines < self.len()
    }

    fn keep_selection_visible(&mut self) {
        if self.selected_index < self.viewport_start {
            self.viewport_start = self.selected_index;
        } else if self.selected_index >= self.viewport_start + self.viewport_lines {
            self.viewport_start = self.selected_index + 1 - self.viewport_lines;
        }
        // A taller viewport pulls hidden rows back in above the selection.
        self.viewport_start = self
            .viewport_start
            .min(self.len().saturating_sub(self.viewport_lines));
    }
}

#[cfg(test)]
pub(crate) fn sample_variants(count: usize) -> Arc<[VariantDescriptor]> {
    (0..count)
        .map(|i| {
            VariantDescriptor::new(
                i.to_string(),
                format!("{}x{}", 1920 - i * 10, 1080 - i * 10),
                "mp4",
                Some(1_000_000 * (count - i) as u64),
            )
        })
        .collect()
}
