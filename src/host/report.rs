//! Report sink and debug overlay

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// Receives human-readable events (escalations, admin command results)
pub trait ReportSink {
    fn report(&mut self, tick: Tick, message: &str);
}

/// Visualization layer flushed at the end of the actions phase
pub trait DebugOverlay {
    fn flush(&mut self, tick: Tick);
}

/// Overlay that draws nothing
#[derive(Debug, Default)]
pub struct NullOverlay;

impl DebugOverlay for NullOverlay {
    fn flush(&mut self, _tick: Tick) {}
}

/// A reported event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub id: u32,
    pub tick: Tick,
    pub message: String,
}

/// The complete report log, mirrored to `tracing`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    pub events: Vec<LoggedEvent>,
    next_event_id: u32,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events.iter().any(|e| e.message.contains(needle))
    }
}

impl ReportSink for EventLog {
    fn report(&mut self, tick: Tick, message: &str) {
        tracing::info!(tick, "{}", message);

        let id = self.next_event_id;
        self.next_event_id += 1;
        self.events.push(LoggedEvent {
            id,
            tick,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_ids() {
        let mut log = EventLog::new();
        log.report(5, "EMPIRE: removed construction sites in W1N1");
        log.report(6, "SPAWN: spawnRoom for mining_1 set to E1N1");
        log.report(6, "SPAWN: no miner mission in mining_1");

        assert_eq!(log.events[2].id, 2);
        assert_eq!(log.events[1].tick, 6);
        assert!(log.contains("W1N1"));
        assert!(!log.contains("E9N9"));
    }
}
