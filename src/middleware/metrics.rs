use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::dispatcher::{Conn, Next, Pipe};

/// Pipe collecting request counts and latency.
///
/// All counters use atomic operations for thread-safe updates without locks.
///
/// Metrics collected:
/// - Total request count
/// - Average latency of everything wrapped by this pipe
/// - Requests halted by an inner pipe
/// - Requests whose inner chain failed
#[derive(Default)]
pub struct MetricsPipe {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    halted: AtomicUsize,
    failures: AtomicUsize,
}

impl MetricsPipe {
    /// Create a new metrics pipe with all counters initialized to zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests that entered this pipe
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Calculate the average latency of the wrapped chain
    ///
    /// Returns zero duration if no requests have been processed yet.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Requests an inner pipe halted
    #[must_use]
    pub fn halted_count(&self) -> usize {
        self.halted.load(Ordering::Relaxed)
    }

    /// Requests whose inner chain returned an error
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Pipe for MetricsPipe {
    fn name(&self) -> &str {
        "metrics"
    }

    fn call(&self, conn: Conn, next: Next<'_>) -> anyhow::Result<Conn> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let result = next.run(conn);
        let latency = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(latency, Ordering::Relaxed);

        match &result {
            Ok(conn) if conn.halted => {
                self.halted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(_) => {}
            Err(_) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
            }
        }
        result
    }
}
