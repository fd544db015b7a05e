// Progress payload and sinks
//
// Long walks report one tick per file. The library only knows the sink trait;
// the CLI hands in a terminal bar.

use serde::Serialize;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress payload emitted during long-running operations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub phase: String,
    pub current: u64,
    pub total: u64,
    pub percent: f64,
    pub message: String,
}

impl Progress {
    pub fn new(phase: impl Into<String>, current: u64, total: u64) -> Self {
        let total_safe = total.max(1);
        let percent = (current as f64 / total_safe as f64) * 100.0;
        Self {
            phase: phase.into(),
            current,
            total,
            percent: percent.min(100.0),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = msg.into();
        self
    }
}

pub trait ProgressSink {
    fn report(&self, progress: &Progress);
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _progress: &Progress) {}
}

/// Terminal progress bar.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{prefix:>8} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, progress: &Progress) {
        self.bar.set_prefix(progress.phase.clone());
        self.bar.set_length(progress.total);
        self.bar.set_position(progress.current);
        self.bar.set_message(progress.message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(Progress::new("proxy", 0, 0).percent, 0.0);
        assert_eq!(Progress::new("proxy", 5, 4).percent, 100.0);
        assert_eq!(Progress::new("proxy", 1, 4).percent, 25.0);
    }
}
