use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Observer for pipeline events: per-image progress, stage timings and
/// counters.
///
/// Lets front ends report on a run without the pipeline knowing where the
/// output goes.
pub trait PipelineLogger: Send {
    /// `current` of `total` images finished.
    fn progress(&mut self, current: usize, total: usize);

    /// Time spent in a named stage (`load`, `detect`, `predict`) for one image.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// A per-image measurement such as the number of faces found.
    fn metric(&mut self, name: &str, value: f64);

    fn info(&mut self, message: &str);

    /// End-of-run report. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. The default for library callers and tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageStats {
    pub count: usize,
    pub total_ms: f64,
    pub max_ms: f64,
}

impl StageStats {
    fn record(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total_ms / self.count as f64
        }
    }
}

#[derive(Debug, Default)]
struct RunStats {
    stages: BTreeMap<String, StageStats>,
    metrics: BTreeMap<String, (usize, f64)>,
    images: usize,
}

/// Logger that writes through the `log` facade and keeps run statistics.
///
/// Clones share the same statistics, so one logger can be handed to every
/// worker of a batch and still produce a single summary.
#[derive(Clone)]
pub struct LogPipelineLogger {
    stats: Arc<Mutex<RunStats>>,
    started: Instant,
    progress_every: usize,
}

impl LogPipelineLogger {
    /// `progress_every` throttles progress lines to every n-th image.
    pub fn new(progress_every: usize) -> Self {
        Self {
            stats: Arc::new(Mutex::new(RunStats::default())),
            started: Instant::now(),
            progress_every: progress_every.max(1),
        }
    }

    pub fn stage(&self, stage: &str) -> Option<StageStats> {
        self.with_stats(|s| s.stages.get(stage).copied())
    }

    /// Mean of every value recorded under `name`.
    pub fn metric_avg(&self, name: &str) -> Option<f64> {
        self.with_stats(|s| {
            s.metrics
                .get(name)
                .map(|&(count, sum)| sum / count.max(1) as f64)
        })
    }

    pub fn summary_string(&self) -> Option<String> {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        self.with_stats(|s| {
            if s.stages.is_empty() && s.metrics.is_empty() {
                return None;
            }
            let mut lines = vec![format!(
                "Pipeline summary ({} images, {:.1}s total):",
                s.images,
                elapsed_ms / 1000.0
            )];
            for (stage, st) in &s.stages {
                lines.push(format!(
                    "  {stage:8}: n {:4}  avg {:7.1}ms  max {:7.1}ms  total {:8.0}ms",
                    st.count,
                    st.avg_ms(),
                    st.max_ms,
                    st.total_ms
                ));
            }
            for (name, &(count, sum)) in &s.metrics {
                lines.push(format!("  {name}: avg {:.1}", sum / count.max(1) as f64));
            }
            if s.images > 0 && elapsed_ms > 0.0 {
                lines.push(format!(
                    "  Throughput: {:.1} images/s",
                    s.images as f64 / (elapsed_ms / 1000.0)
                ));
            }
            Some(lines.join("\n"))
        })
    }

    fn with_stats<T>(&self, f: impl FnOnce(&mut RunStats) -> T) -> T {
        // A worker that panicked mid-update leaves counters that are still usable.
        let mut guard = match self.stats.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.with_stats(|s| s.images = s.images.max(current));
        if total > 0 && (current % self.progress_every == 0 || current == total) {
            log::info!("Processed {current}/{total} images");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::trace!("{stage} took {duration_ms:.2}ms");
        self.with_stats(|s| {
            s.stages
                .entry(stage.to_string())
                .or_default()
                .record(duration_ms)
        });
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.with_stats(|s| {
            let entry = s.metrics.entry(name.to_string()).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += value;
        });
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
