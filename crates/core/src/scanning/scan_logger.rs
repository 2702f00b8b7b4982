use std::collections::HashMap;
use std::time::Instant;

/// Observer for batch scan events.
///
/// Keeps the scanner free of any particular output mechanism: the CLI logs
/// through the `log` crate, embedders and tests can stay silent.
pub trait ScanLogger: Send {
    /// Items that reached a terminal outcome so far, out of all accepted.
    fn progress(&mut self, finished: usize, accepted: usize);

    /// Duration of a named stage (`encode`, `classify`) for one item.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Point-in-time value such as the identity count of a request.
    fn metric(&mut self, name: &str, value: f64);

    /// Count one item outcome (`matched`, `unmatched`, `failed`, `cancelled`).
    fn outcome(&mut self, kind: &str);

    fn summary(&self) {}
}

pub struct NullScanLogger;

impl ScanLogger for NullScanLogger {
    fn progress(&mut self, _finished: usize, _accepted: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn outcome(&mut self, _kind: &str) {}
}

/// Records stage timings and outcome counts and logs a summary at the end.
///
/// Progress lines are emitted every `throttle_items` items and on the last one.
pub struct StdoutScanLogger {
    throttle_items: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    outcomes: HashMap<String, usize>,
    start_time: Instant,
    accepted: usize,
}

impl StdoutScanLogger {
    pub fn new(throttle_items: usize) -> Self {
        Self {
            throttle_items: throttle_items.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            outcomes: HashMap::new(),
            start_time: Instant::now(),
            accepted: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was scanned.
    pub fn summary_string(&self) -> Option<String> {
        if self.outcomes.is_empty() && self.timings.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Scan summary ({} photos, {elapsed_s:.1}s total):",
            self.accepted
        )];

        let mut kinds: Vec<_> = self.outcomes.iter().collect();
        kinds.sort();
        let counts: Vec<String> = kinds.iter().map(|(k, n)| format!("{k} {n}")).collect();
        if !counts.is_empty() {
            lines.push(format!("  outcomes: {}", counts.join(", ")));
        }

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = average(durations);
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:10}: avg {avg_ms:7.1}ms  max {max_ms:7.1}ms  total {total_ms:8.0}ms"
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.2}", average(&self.metrics[name])));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }

    pub fn outcome_count(&self, kind: &str) -> usize {
        self.outcomes.get(kind).copied().unwrap_or(0)
    }
}

impl Default for StdoutScanLogger {
    fn default() -> Self {
        Self::new(5)
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl ScanLogger for StdoutScanLogger {
    fn progress(&mut self, finished: usize, accepted: usize) {
        self.accepted = accepted;
        if accepted > 0 && (finished % self.throttle_items == 0 || finished == accepted) {
            log::info!("Scanned: {finished}/{accepted} photos");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn outcome(&mut self, kind: &str) {
        *self.outcomes.entry(kind.to_string()).or_default() += 1;
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
