//! Percentage progress reports for long operations.

use std::time::{Duration, Instant};

use log::info;

pub struct Progress {
    label: String,
    min: f64,
    max: f64,
    decimals: usize,
    interval: Duration,
    started: Instant,
    last_report: Option<Instant>,
}

impl Progress {
    pub fn new(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
            decimals: 1,
            interval: Duration::from_secs(1),
            started: Instant::now(),
            last_report: None,
        }
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    /// Minimum time between two reports.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Position of `value` within `[min, max]`, clamped to 0..=100.
    pub fn percent(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 100.0;
        }
        ((value - self.min) / span * 100.0).clamp(0.0, 100.0)
    }

    /// Log the current position if the interval has passed or work is done.
    pub fn update(&mut self, value: f64) {
        let now = Instant::now();
        let pct = self.percent(value);
        let due = self
            .last_report
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if !due && pct < 100.0 {
            return;
        }
        self.last_report = Some(now);
        info!("{}", self.render(pct, now.duration_since(self.started)));
    }

    fn render(&self, pct: f64, elapsed: Duration) -> String {
        let elapsed = elapsed.as_secs_f64();
        let remaining = if pct > 0.0 {
            elapsed * (100.0 - pct) / pct
        } else {
            0.0
        };
        format!(
            "{}: {:.*}%, {:.0}s remaining, {:.0}s elapsed",
            self.label, self.decimals, pct, remaining, elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_clamps() {
        let progress = Progress::new("load", 10.0, 20.0);
        assert_eq!(progress.percent(10.0), 0.0);
        assert_eq!(progress.percent(15.0), 50.0);
        assert_eq!(progress.percent(25.0), 100.0);
        assert_eq!(progress.percent(0.0), 0.0);
    }

    #[test]
    fn test_empty_range_is_complete() {
        assert_eq!(Progress::new("noop", 3.0, 3.0).percent(0.0), 100.0);
    }

    #[test]
    fn test_render() {
        let progress = Progress::new("power iteration", 0.0, 100.0).with_decimals(2);
        assert_eq!(
            progress.render(25.0, Duration::from_secs(10)),
            "power iteration: 25.00%, 30s remaining, 10s elapsed"
        );
        assert_eq!(
            progress.render(0.0, Duration::from_secs(2)),
            "power iteration: 0.00%, 0s remaining, 2s elapsed"
        );
    }

    #[test]
    fn test_update_throttles() {
        let mut progress = Progress::new("x", 0.0, 10.0).with_interval(Duration::from_secs(3600));
        progress.update(1.0);
        let first = progress.last_report;
        assert!(first.is_some());

        progress.update(2.0);
        assert_eq!(progress.last_report, first);

        progress.update(10.0);
        assert!(progress.last_report >= first);
    }
}
