use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Audio counters for one connection. Sends and receives are each recorded
/// from a single place, so relaxed ordering is enough.
#[derive(Debug, Default)]
pub struct Stats {
    sent_chunks: AtomicU64,
    sent_bytes: AtomicU64,
    recv_chunks: AtomicU64,
    recv_bytes: AtomicU64,
}

impl Stats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self, bytes: usize) {
        self.sent_chunks.fetch_add(1, Ordering::Relaxed);
        self.sent_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_received(&self, bytes: usize) {
        self.recv_chunks.fetch_add(1, Ordering::Relaxed);
        self.recv_bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            sent_chunks: self.sent_chunks.load(Ordering::Relaxed),
            sent_bytes: self.sent_bytes.load(Ordering::Relaxed),
            recv_chunks: self.recv_chunks.load(Ordering::Relaxed),
            recv_bytes: self.recv_bytes.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StatsSnapshot {
    pub sent_chunks: u64,
    pub sent_bytes: u64,
    pub recv_chunks: u64,
    pub recv_bytes: u64,
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sent: {} chunks / {} bytes, recv: {} chunks / {} bytes",
            self.sent_chunks, self.sent_bytes, self.recv_chunks, self.recv_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accumulates() {
        let stats = Stats::new();
        stats.record_sent(10);
        stats.record_sent(6);
        stats.record_received(4);

        let snapshot = stats.snapshot();
        assert_eq!(
            snapshot,
            StatsSnapshot {
                sent_chunks: 2,
                sent_bytes: 16,
                recv_chunks: 1,
                recv_bytes: 4,
            }
        );
        assert_eq!(
            snapshot.to_string(),
            "sent: 2 chunks / 16 bytes, recv: 1 chunks / 4 bytes"
        );
    }
}
