// SPDX-FileCopyrightText: 2025 The ytfetch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::{Duration, Instant};

use tracing::trace;

use crate::rate::ByteRateEstimator;

/// Live state of one download. Created when the transfer starts and dropped
/// once it completes or fails.
#[derive(Debug, Clone)]
pub struct ProgressModel {
    downloaded_bytes: u64,
    total_bytes: u64,
    current_stage: String,
    start_time: Instant,
    last_update_time: Instant,
    estimated_completion: Option<Instant>,
    bytes_per_second: f64,
    rate: ByteRateEstimator,
}

impl ProgressModel {
    pub fn new(stage: impl Into<String>, now: Instant, rate: ByteRateEstimator) -> Self {
        Self {
            downloaded_bytes: 0,
            total_bytes: 0,
            current_stage: stage.into(),
            start_time: now,
            last_update_time: now,
            estimated_completion: None,
            bytes_per_second: 0.0,
            rate,
        }
    }

    pub fn update(&mut self, downloaded: u64, total: u64) {
        self.update_at(downloaded, total, Instant::now());
    }

    /// Stores both counters as reported, even if `downloaded` went backwards.
    ///
    /// The completion estimate is only recomputed while the rate is positive
    /// and bytes remain; otherwise the previous estimate is kept as-is.
    pub fn update_at(&mut self, downloaded: u64, total: u64, now: Instant) {
        trace!(
            downloaded,
            total,
            gap = ?now.saturating_duration_since(self.last_update_time),
            "progress update"
        );
        self.downloaded_bytes = downloaded;
        self.total_bytes = total;

        self.rate.update(now, downloaded);
        self.bytes_per_second = self.rate.estimate();

        if self.bytes_per_second > 0.0 && total > downloaded {
            let remaining = (total - downloaded) as f64;
            if let Some(at) = Duration::try_from_secs_f64(remaining / self.bytes_per_second)
                .ok()
                .and_then(|eta| now.checked_add(eta))
            {
                self.estimated_completion = Some(at);
            }
        }

        self.last_update_time = now;
    }

    pub fn set_stage(&mut self, stage: impl Into<String>) {
        self.current_stage = stage.into();
    }

    /// Marks the transfer as finished so the final frame shows a full bar.
    pub fn complete(&mut self, stage: impl Into<String>) {
        self.downloaded_bytes = self.total_bytes.max(self.downloaded_bytes);
        self.current_stage = stage.into();
    }

    #[cfg(test)]
    pub fn downloaded_bytes(&self) -> u64 {
        self.downloaded_bytes
    }

    #[cfg(test)]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    #[cfg(test)]
    pub fn stage(&self) -> &str {
        &self.current_stage
    }

    #[cfg(test)]
    pub fn bytes_per_second(&self) -> f64 {
        self.bytes_per_second
    }

    #[cfg(test)]
    pub fn estimated_completion(&self) -> Option<Instant> {
        self.estimated_completion
    }

    #[cfg(test)]
    pub fn last_update_time(&self) -> Instant {
        self.last_update_time
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub fn snapshot_at(&self, now: Instant) -> ProgressSnapshot {
        ProgressSnapshot {
            stage: self.current_stage.clone(),
            downloaded_bytes: self.downloaded_bytes,
            total_bytes: self.total_bytes,
            bytes_per_second: self.bytes_per_second,
            eta: self
                .estimated_completion
                .map(|at| at.saturating_duration_since(now)),
            elapsed: now.saturating_duration_since(self.start_time),
        }
    }
}

/// Read-only copy of a [`ProgressModel`] handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub stage: String,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub bytes_per_second: f64,
    pub eta: Option<Duration>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressMode {
    Determinate { percent: f64 },
    Indeterminate,
}

impl ProgressSnapshot {
    pub fn mode(&self) -> ProgressMode {
        if self.total_bytes == 0 {
            return ProgressMode::Indeterminate;
        }
        let percent = self.downloaded_bytes as f64 / self.total_bytes as f64 * 100.0;
        ProgressMode::Determinate { percent }
    }

    /// Remaining time worth showing: only while data is actually flowing.
    pub fn visible_eta(&self) -> Option<Duration> {
        if self.bytes_per_second <= 0.0 {
            return None;
        }
        self.eta.filter(|eta| eta.as_secs() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_at(t0: Instant) -> ProgressModel {
        ProgressModel::new("Starting download...", t0, ByteRateEstimator::default())
    }

    #[test]
    fn eta_follows_rate_and_remaining_bytes() {
        let t0 = Instant::now();
        let mut model = model_at(t0);
        model.update_at(0, 10_000, t0);
        assert!(model.estimated_completion().is_none());

        let t1 = t0 + Duration::from_secs(1);
        model.update_at(1_000, 10_000, t1);
        assert_eq!(model.bytes_per_second(), 1000.0);
        assert_eq!(model.estimated_completion(), Some(t1 + Duration::from_secs(9)));

        let snap = model.snapshot_at(t1);
        assert_eq!(snap.eta, Some(Duration::from_secs(9)));
        assert_eq!(snap.elapsed, Duration::from_secs(1));
        assert_eq!(snap.mode(), ProgressMode::Determinate { percent: 10.0 });
    }

    #[test]
    fn stale_estimate_is_retained_when_rate_drops_to_zero() {
        let t0 = Instant::now();
        let mut model = model_at(t0);
        model.update_at(0, 10_000, t0);
        model.update_at(1_000, 10_000, t0 + Duration::from_secs(1));
        let estimate = model.estimated_completion();
        assert!(estimate.is_some());

        // The source restarted its counter; the rate clamps to zero.
        let t2 = t0 + Duration::from_secs(2);
        model.update_at(0, 10_000, t2);
        assert_eq!(model.bytes_per_second(), 0.0);
        assert_eq!(model.downloaded_bytes(), 0);
        assert_eq!(model.estimated_completion(), estimate);

        // ...but a stalled transfer never shows it.
        assert_eq!(model.snapshot_at(t2).visible_eta(), None);
    }

    #[test]
    fn unknown_total_is_indeterminate_regardless_of_downloaded() {
        let t0 = Instant::now();
        let mut model = model_at(t0);
        model.update_at(5_000_000, 0, t0);
        assert_eq!(model.snapshot_at(t0).mode(), ProgressMode::Indeterminate);
        model.update_at(9_000_000, 0, t0 + Duration::from_secs(3));
        assert_eq!(model.snapshot_at(t0).mode(), ProgressMode::Indeterminate);
        assert!(model.estimated_completion().is_none());
    }

    #[test]
    fn unrepresentable_eta_keeps_previous_estimate() {
        let t0 = Instant::now();
        let mut model = model_at(t0);
        model.update_at(0, u64::MAX, t0);
        let t1 = t0 + Duration::from_secs(2);
        model.update_at(1, u64::MAX, t1);

        assert!(model.bytes_per_second() > 0.0);
        assert_eq!(model.total_bytes(), u64::MAX);
        assert_eq!(model.last_update_time(), t1);
        assert!(model.estimated_completion().is_none());
    }

    #[test]
    fn complete_fills_the_bar() {
        let t0 = Instant::now();
        let mut model = model_at(t0);
        model.update_at(700, 1_000, t0);
        model.complete("Download complete!");
        assert_eq!(model.stage(), "Download complete!");
        assert_eq!(
            model.snapshot_at(t0).mode(),
            ProgressMode::Determinate { percent: 100.0 }
        );
    }
}
