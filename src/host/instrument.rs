//! Phase instrumentation and tick budget tracking

use ahash::AHashMap;
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// Label the empire opens first on every tick
pub const TICK_START_LABEL: &str = "init";

/// Bracketing timer around phases and sub-phases
///
/// Implementations measure `proportion_used` from the start of the current
/// tick. The empire never announces ticks explicitly; the first thing it does
/// each tick is `start(TICK_START_LABEL)`.
pub trait Instrumentation {
    fn start(&mut self, label: &str);
    fn end(&mut self, label: &str);
    /// Fraction of the tick budget consumed so far (may exceed 1.0)
    fn proportion_used(&self) -> f64;
}

/// Wall-clock profiler tracking per-label time within the current tick
pub struct TickProfiler {
    budget: Duration,
    tick_start: Instant,
    open: AHashMap<String, Instant>,
    totals: BTreeMap<String, Duration>,
    tick_times: VecDeque<Duration>,
    /// `begin_tick` was called and no tick has started since
    window_open: bool,
}

impl TickProfiler {
    /// Create a profiler with a per-tick budget in milliseconds.
    pub fn new(budget_ms: f64) -> Self {
        Self {
            budget: Duration::from_secs_f64(budget_ms.max(0.001) / 1000.0),
            tick_start: Instant::now(),
            open: AHashMap::new(),
            totals: BTreeMap::new(),
            tick_times: VecDeque::with_capacity(120),
            window_open: false,
        }
    }

    /// Call at the start of each tick.
    ///
    /// Optional: without it the window restarts on `start(TICK_START_LABEL)`.
    pub fn begin_tick(&mut self) {
        self.reset_window();
        self.window_open = true;
    }

    fn reset_window(&mut self) {
        self.tick_start = Instant::now();
        self.open.clear();
        self.totals.clear();
    }

    /// Call at the end of each tick.
    pub fn end_tick(&mut self) {
        self.tick_times.push_back(self.tick_start.elapsed());
        if self.tick_times.len() > 120 {
            self.tick_times.pop_front();
        }
    }

    /// Time spent under `label` this tick, in milliseconds
    pub fn label_time_ms(&self, label: &str) -> f64 {
        self.totals
            .get(label)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Labels seen this tick, sorted
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.totals.keys().map(String::as_str)
    }

    /// Average tick time in milliseconds (over the last 120 ticks).
    pub fn avg_tick_time_ms(&self) -> f64 {
        if self.tick_times.is_empty() {
            return 0.0;
        }
        let sum: Duration = self.tick_times.iter().sum();
        sum.as_secs_f64() * 1000.0 / self.tick_times.len() as f64
    }
}

impl Instrumentation for TickProfiler {
    fn start(&mut self, label: &str) {
        if label == TICK_START_LABEL {
            if !self.window_open {
                self.reset_window();
            }
            self.window_open = false;
        }
        self.open.insert(label.to_string(), Instant::now());
    }

    fn end(&mut self, label: &str) {
        if let Some(started) = self.open.remove(label) {
            *self.totals.entry(label.to_string()).or_default() += started.elapsed();
        }
    }

    fn proportion_used(&self) -> f64 {
        self.tick_start.elapsed().as_secs_f64() / self.budget.as_secs_f64()
    }
}
