use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// How often the pumps log throughput.
pub const LOG_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct Throughput {
    pub chunks: u64,
    pub bytes: u64,
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} chunks / {} bytes", self.chunks, self.bytes)
    }
}

/// Counters for one direction of a session, owned by the pump that moves
/// that direction's audio.
#[derive(Debug)]
pub struct DirectionStats {
    total: Throughput,
    window: Throughput,
    window_start: Instant,
}

impl DirectionStats {
    pub fn new() -> Self {
        Self {
            total: Throughput::default(),
            window: Throughput::default(),
            window_start: Instant::now(),
        }
    }

    /// Counts one chunk. Returns `true` for the very first chunk.
    pub fn record(&mut self, bytes: usize) -> bool {
        for counter in [&mut self.total, &mut self.window] {
            counter.chunks += 1;
            counter.bytes += bytes as u64;
        }
        self.total.chunks == 1
    }

    /// Hands back the current window once it spans at least [`LOG_WINDOW`], then starts a new one.
    pub fn take_window(&mut self, now: Instant) -> Option<Throughput> {
        if now.saturating_duration_since(self.window_start) < LOG_WINDOW {
            return None;
        }
        self.window_start = now;
        Some(std::mem::take(&mut self.window))
    }

    pub fn totals(&self) -> Throughput {
        self.total
    }
}

impl Default for DirectionStats {
    fn default() -> Self {
        Self::new()
    }
}
