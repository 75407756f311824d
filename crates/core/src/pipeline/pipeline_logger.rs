use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for collection runs.
///
/// Keeps reporting out of [`CollectFacesUseCase`](super::collect_faces_use_case::CollectFacesUseCase)
/// so the CLI logs through the `log` facade while tests stay silent.
pub trait PipelineLogger {
    /// Report frame-level progress (`current` is 1-based).
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a sample of a named per-frame quantity (e.g. faces found).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Log detail useful when diagnosing a run.
    fn debug(&mut self, message: &str);

    /// Log a recoverable problem; the run continues.
    fn warn(&mut self, message: &str);

    /// Log per-item detail (one line per written file).
    fn trace(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
    fn debug(&mut self, _message: &str) {}
    fn warn(&mut self, _message: &str) {}
    fn trace(&mut self, _message: &str) {}
}

/// Running total for one stage or metric.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tally {
    pub count: usize,
    pub total: f64,
}

impl Tally {
    fn add(&mut self, value: f64) {
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Forwards events to the `log` facade and prints a stage breakdown at the end.
///
/// Progress lines are emitted every `every` frames (and on the last frame).
pub struct LogPipelineLogger {
    every: usize,
    started: Instant,
    frames: usize,
    stages: BTreeMap<String, Tally>,
    metrics: BTreeMap<String, Tally>,
}

impl LogPipelineLogger {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            started: Instant::now(),
            frames: 0,
            stages: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }

    pub fn stage(&self, name: &str) -> Option<Tally> {
        self.stages.get(name).copied()
    }

    pub fn metric_tally(&self, name: &str) -> Option<Tally> {
        self.metrics.get(name).copied()
    }

    /// Summary text, or `None` before anything was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.stages.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.started.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Run summary ({} frames, {elapsed_s:.1}s):",
            self.frames
        )];
        for (name, tally) in &self.stages {
            lines.push(format!(
                "  {name:10} avg {:7.1}ms  total {:8.0}ms  ({} calls)",
                tally.mean(),
                tally.total,
                tally.count
            ));
        }
        for (name, tally) in &self.metrics {
            lines.push(format!(
                "  {name}: total {:.0}, avg {:.2}",
                tally.total,
                tally.mean()
            ));
        }
        Some(lines.join("\n"))
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames = self.frames.max(current);
        if total > 0 && (current % self.every == 0 || current == total) {
            log::info!("Processed {current}/{total} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.stages.entry(stage.to_string()).or_default().add(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().add(value);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn debug(&mut self, message: &str) {
        log::debug!("{message}");
    }

    fn warn(&mut self, message: &str) {
        log::warn!("{message}");
    }

    fn trace(&mut self, message: &str) {
        log::trace!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("{text}");
        }
    }
}
