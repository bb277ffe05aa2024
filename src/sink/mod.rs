//! The asynchronous, single-consumer report pipeline.
//!
//! Producers (shard workers) never block: `submit_fills`/`submit_canceled`/
//! `submit_top_of_book` push onto a bounded queue and drop on overflow,
//! counting the drop. A dedicated thread serialises items to the
//! configured writer, batching opportunistically to amortise the
//! semaphore wakeup cost.

use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam::queue::ArrayQueue;
use tracing::{debug, warn};

use crate::report::{ExecutionReport, OrderCanceledReport, ReportItem, TopOfBookReport};
use crate::sync::{self, CountingSemaphore};

/// Opportunistic batch size drained per wakeup.
const MAX_ITEMS_PER_BATCH: usize = 64;

struct Inner {
    queue: ArrayQueue<ReportItem>,
    semaphore: CountingSemaphore,
    stop_requested: AtomicBool,
    dropped: AtomicU64,
    writer: Mutex<Box<dyn Write + Send>>,
}

/// Handle to the report pipeline. Cloning is not supported; producers hold
/// a shared reference (`&ReportSink`), since `submit_*` only needs `&self`.
pub struct ReportSink {
    inner: Arc<Inner>,
    worker: Option<JoinHandle<()>>,
}

impl ReportSink {
    /// Spawns the dedicated consumer thread and returns a ready sink.
    pub fn new(capacity: usize, writer: Box<dyn Write + Send>) -> Self {
        let inner = Arc::new(Inner {
            queue: ArrayQueue::new(capacity),
            semaphore: CountingSemaphore::new(0),
            stop_requested: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
            writer: Mutex::new(writer),
        });
        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("report-sink".to_string())
            .spawn(move || Self::run(worker_inner))
            .expect("failed to spawn report sink thread");
        Self {
            inner,
            worker: Some(worker),
        }
    }

    /// Convenience constructor writing to standard output.
    pub fn to_stdout(capacity: usize) -> Self {
        Self::new(capacity, Box::new(std::io::stdout()))
    }

    #[cfg(test)]
    pub fn new_for_test() -> Self {
        Self::new(64, Box::new(std::io::sink()))
    }

    fn push(&self, item: ReportItem) {
        match self.inner.queue.push(item) {
            Ok(()) => self.inner.semaphore.release(),
            Err(_) => {
                self.inner.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("report sink queue full, dropping report");
                #[cfg(feature = "metrics")]
                metrics::counter!("report_sink_drops_total").increment(1);
            }
        }
    }

    /// Pushes each execution report individually.
    pub fn submit_fills(&self, reports: &[ExecutionReport]) {
        for r in reports {
            self.push(ReportItem::Execution(*r));
        }
    }

    pub fn submit_canceled(&self, report: OrderCanceledReport) {
        self.push(ReportItem::Canceled(report));
    }

    pub fn submit_top_of_book(&self, report: TopOfBookReport) {
        self.push(ReportItem::TopOfBook(report));
    }

    /// Count of reports dropped for a full queue.
    pub fn dropped_count(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    /// Requests shutdown; the consumer thread drains the queue fully
    /// before exiting. Idempotent.
    pub fn stop(&self) {
        self.inner.stop_requested.store(true, Ordering::SeqCst);
        self.inner.semaphore.release();
    }

    fn emit(inner: &Inner, item: ReportItem) {
        let mut writer = inner.writer.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(err) = writeln!(writer, "{item}") {
            warn!(%err, "report sink write failed");
        }
    }

    /// Drains every remaining item on shutdown.
    fn drain(inner: &Inner) {
        while let Some(item) = inner.queue.pop() {
            Self::emit(inner, item);
        }
        debug!(dropped = inner.dropped.load(Ordering::Relaxed), "report sink drained");
    }

    fn run(inner: Arc<Inner>) {
        loop {
            inner.semaphore.acquire();
            if inner.stop_requested.load(Ordering::SeqCst) {
                Self::drain(&inner);
                return;
            }
            let item = sync::pop_after_acquire(&inner.queue);
            Self::emit(&inner, item);
            sync::batch_drain(
                &inner.queue,
                &inner.semaphore,
                &inner.stop_requested,
                MAX_ITEMS_PER_BATCH,
                |item| Self::emit(&inner, item),
            );
        }
    }
}

impl Drop for ReportSink {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}
