//! Dispatch timing: per-kernel running statistics plus an optional
//! chronological trace (spec §C; original_source
//! `include/Kernel/KernelProfiler.h`).

use std::cell::RefCell;
use std::collections::HashMap;

/// One profiled kernel's running statistics.
#[derive(Debug, Clone)]
pub struct KernelProfilerQueryResult {
    pub kernel_name: String,
    pub counter: u64,
    pub min_time_ms: f64,
    pub max_time_ms: f64,
    pub avg_time_ms: f64,
    pub total_time_ms: f64,
}

/// One dispatch's recorded timing, kept when trace mode is active.
#[derive(Debug, Clone)]
pub struct KernelProfileRecord {
    pub kernel_name: String,
    pub elapsed_time_ms: f64,
    pub group_x: u32,
    pub group_y: u32,
    pub group_z: u32,
    pub timestamp_ms: f64,
}

#[derive(Default)]
struct Accumulator {
    counter: u64,
    min_time_ms: f64,
    max_time_ms: f64,
    total_time_ms: f64,
}

/// Accumulates per-kernel dispatch timings. Construct one and share it
/// (via `Rc`) across the kernels whose dispatches should be tracked
/// together — the original is a process-wide singleton; this crate's
/// single-threaded model makes an explicit, shareable instance the
/// direct analogue (spec §9's "prefer an explicit argument" redesign).
pub struct KernelProfiler {
    enabled: RefCell<bool>,
    trace: RefCell<bool>,
    stats: RefCell<HashMap<String, Accumulator>>,
    records: RefCell<Vec<KernelProfileRecord>>,
    clock_ms: RefCell<f64>,
}

impl Default for KernelProfiler {
    fn default() -> KernelProfiler {
        KernelProfiler::new()
    }
}

impl KernelProfiler {
    pub fn new() -> KernelProfiler {
        KernelProfiler {
            enabled: RefCell::new(false),
            trace: RefCell::new(false),
            stats: RefCell::new(HashMap::new()),
            records: RefCell::new(Vec::new()),
            clock_ms: RefCell::new(0.0),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        *self.enabled.borrow_mut() = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    pub fn set_trace_enabled(&self, enabled: bool) {
        *self.trace.borrow_mut() = enabled;
    }

    pub fn clear(&self) {
        self.stats.borrow_mut().clear();
        self.records.borrow_mut().clear();
        *self.clock_ms.borrow_mut() = 0.0;
    }

    /// Records one dispatch's elapsed time. `elapsed_ms` comes from the
    /// driver's own query (a GPU timestamp query in a real backend); the
    /// profiler itself has no notion of wall-clock time since `Date`/
    /// `Instant` sampling isn't available in this context.
    pub fn record(&self, kernel_name: &str, elapsed_ms: f64, groups: (u32, u32, u32)) {
        if !self.is_enabled() {
            return;
        }
        let mut stats = self.stats.borrow_mut();
        let entry = stats.entry(kernel_name.to_string()).or_insert_with(|| Accumulator {
            counter: 0,
            min_time_ms: f64::INFINITY,
            max_time_ms: 0.0,
            total_time_ms: 0.0,
        });
        entry.counter += 1;
        entry.min_time_ms = entry.min_time_ms.min(elapsed_ms);
        entry.max_time_ms = entry.max_time_ms.max(elapsed_ms);
        entry.total_time_ms += elapsed_ms;

        if *self.trace.borrow() {
            let mut clock = self.clock_ms.borrow_mut();
            *clock += elapsed_ms;
            self.records.borrow_mut().push(KernelProfileRecord {
                kernel_name: kernel_name.to_string(),
                elapsed_time_ms: elapsed_ms,
                group_x: groups.0,
                group_y: groups.1,
                group_z: groups.2,
                timestamp_ms: *clock,
            });
        }
    }

    pub fn query_info(&self, kernel_name: &str) -> Option<KernelProfilerQueryResult> {
        let stats = self.stats.borrow();
        stats.get(kernel_name).map(|entry| KernelProfilerQueryResult {
            kernel_name: kernel_name.to_string(),
            counter: entry.counter,
            min_time_ms: entry.min_time_ms,
            max_time_ms: entry.max_time_ms,
            avg_time_ms: entry.total_time_ms / entry.counter.max(1) as f64,
            total_time_ms: entry.total_time_ms,
        })
    }

    pub fn get_total_time_ms(&self) -> f64 {
        self.stats.borrow().values().map(|e| e.total_time_ms).sum()
    }

    /// `"count"` prints one aggregated line per kernel; `"trace"` prints
    /// every recorded dispatch in chronological order.
    pub fn print_info(&self, mode: &str) {
        println!("{}", self.get_formatted_output(mode));
    }

    pub fn get_formatted_output(&self, mode: &str) -> String {
        match mode {
            "trace" => self
                .records
                .borrow()
                .iter()
                .map(|r| {
                    format!(
                        "[{:>9.3}ms] {} ({} x {} x {}) {:.3}ms",
                        r.timestamp_ms, r.kernel_name, r.group_x, r.group_y, r.group_z, r.elapsed_time_ms
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            _ => {
                let stats = self.stats.borrow();
                let mut names: Vec<&String> = stats.keys().collect();
                names.sort();
                names
                    .into_iter()
                    .map(|name| {
                        let e = &stats[name];
                        format!(
                            "{name}: {} dispatches, min {:.3}ms, max {:.3}ms, avg {:.3}ms, total {:.3}ms",
                            e.counter,
                            e.min_time_ms,
                            e.max_time_ms,
                            e.total_time_ms / e.counter.max(1) as f64,
                            e.total_time_ms
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_profiler_records_nothing() {
        let profiler = KernelProfiler::new();
        profiler.record("increment", 1.5, (100, 1, 1));
        assert!(profiler.query_info("increment").is_none());
    }

    #[test]
    fn count_mode_aggregates_across_dispatches() {
        let profiler = KernelProfiler::new();
        profiler.set_enabled(true);
        profiler.record("increment", 1.0, (100, 1, 1));
        profiler.record("increment", 3.0, (100, 1, 1));
        let info = profiler.query_info("increment").unwrap();
        assert_eq!(info.counter, 2);
        assert_eq!(info.min_time_ms, 1.0);
        assert_eq!(info.max_time_ms, 3.0);
        assert_eq!(info.avg_time_ms, 2.0);
    }
}
