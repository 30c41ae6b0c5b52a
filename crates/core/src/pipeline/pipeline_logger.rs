use std::collections::BTreeMap;
use std::time::Instant;

/// Observer for pipeline orchestration events (progress, stage timings,
/// queue metrics), kept separate from the `log` output of individual filters.
pub trait PipelineLogger: Send {
    /// Report frame-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named pipeline stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. reader queue depth).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-pipeline summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events. The default for library callers.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: throttled progress lines through `log::info!`, plus a
/// per-stage timing summary at the end of the run.
///
/// Containers that do not report a frame count (`total == 0`) get progress
/// lines without a percentage.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: BTreeMap<String, Vec<f64>>,
    metrics: BTreeMap<String, Vec<f64>>,
    start_time: Instant,
    frames_done: usize,
    total_frames: usize,
    messages: Vec<String>,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: BTreeMap::new(),
            metrics: BTreeMap::new(),
            start_time: Instant::now(),
            frames_done: 0,
            total_frames: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let frames = self.frames_done.max(self.total_frames);
        let mut lines = vec![format!(
            "Pipeline summary ({frames} frames, {elapsed_s:.1}s total):"
        )];

        for (stage, durations) in &self.timings {
            let total_ms: f64 = durations.iter().sum();
            let share = if elapsed_s > 0.0 {
                total_ms / (elapsed_s * 10.0)
            } else {
                0.0
            };
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  total {total_ms:7.0}ms  ({share:4.1}%)",
                mean(durations)
            ));
        }

        for (name, values) in &self.metrics {
            lines.push(format!("  {name}: avg {:.1}", mean(values)));
        }

        if frames > 0 && elapsed_s > 0.0 {
            lines.push(format!("  Throughput: {:.1} fps", frames as f64 / elapsed_s));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(Vec::as_slice)
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_done = current;
        self.total_frames = total;
        let due = current % self.throttle_frames == 0 || current == total;
        if !due {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Filtering: {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Filtering: {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics.entry(name.to_string()).or_default().push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("filter", 5.0);
        logger.metric("reader_queue_depth", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("filter", 20.0);
        logger.timing("filter", 30.0);
        logger.timing("encode", 5.0);

        let filter = logger.timings_for("filter").unwrap();
        assert_eq!(filter.len(), 2);
        assert_relative_eq!(filter[0], 20.0);
        assert_relative_eq!(filter[1], 30.0);

        assert_eq!(logger.timings_for("encode").unwrap().len(), 1);
        assert!(logger.timings_for("decode").is_none());
    }

    #[test]
    fn test_metric_average_in_summary() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.total_frames = 5;
        logger.metric("reader_queue_depth", 3.0);
        logger.metric("reader_queue_depth", 4.0);

        let values = logger.metrics_for("reader_queue_depth").unwrap();
        assert_relative_eq!(values.iter().sum::<f64>() / values.len() as f64, 3.5);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("reader_queue_depth"));
        assert!(summary.contains("avg 3.5"));
    }

    #[test]
    fn test_summary_lists_stages_and_throughput() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.total_frames = 100;
        logger.timing("filter", 10.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Pipeline summary (100 frames"));
        assert!(summary.contains("filter"));
        assert!(summary.contains("fps"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_frames() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=20 {
            logger.progress(i, 20);
        }
        assert_eq!(logger.frames_done, 20);
        assert_eq!(logger.total_frames, 20);
    }

    #[test]
    fn test_unknown_total_counts_processed_frames() {
        let mut logger = StdoutPipelineLogger::new(10);
        for i in 1..=7 {
            logger.progress(i, 0);
        }
        logger.timing("filter", 1.0);
        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Pipeline summary (7 frames"));
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.info("hello world");
        assert_eq!(logger.messages, vec!["hello world".to_string()]);
    }

    #[test]
    fn test_throttle_never_zero() {
        assert_eq!(StdoutPipelineLogger::new(0).throttle_frames, 1);
        assert_eq!(StdoutPipelineLogger::default().throttle_frames, 25);
    }
}
