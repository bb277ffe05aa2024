//! The sharded event dispatcher: `N` shards, each with one bounded
//! lock-free queue, one counting semaphore, and exactly one worker thread
//! owning a disjoint subset of per-symbol books.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam::queue::ArrayQueue;
use tracing::{info, warn};

use crate::model::{Event, Symbol};
use crate::orderbook::OrderBook;
use crate::sink::ReportSink;
use crate::sync::{self, CountingSemaphore};

/// Per-shard queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;
/// Opportunistic batch size drained per wakeup.
const MAX_BATCH_SIZE: usize = 32;

/// The producer-visible half of a shard: everything `submit` touches.
/// The book map lives only inside the worker thread's closure, never
/// shared, since a symbol is processed by exactly one thread.
struct ShardHandle {
    queue: Arc<ArrayQueue<Event>>,
    semaphore: Arc<CountingSemaphore>,
}

/// Owns `N` shards and routes every submitted event to the shard that owns
/// its symbol's book.
pub struct OrderBookManager {
    shards: Vec<ShardHandle>,
    stop_requested: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

fn shard_index(symbol: Symbol, num_shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    symbol.hash(&mut hasher);
    (hasher.finish() as usize) % num_shards
}

impl OrderBookManager {
    /// Builds `num_shards` shards, partitioning `symbols` across them by
    /// [`shard_index`], and spawns one worker thread per shard.
    pub fn new(
        symbols: &[Symbol],
        sink: Arc<ReportSink>,
        num_shards: usize,
        queue_capacity: usize,
    ) -> Self {
        let num_shards = num_shards.max(2);
        let stop_requested = Arc::new(AtomicBool::new(false));

        let mut per_shard_books: Vec<HashMap<Symbol, OrderBook>> =
            (0..num_shards).map(|_| HashMap::new()).collect();
        for &symbol in symbols {
            let idx = shard_index(symbol, num_shards);
            per_shard_books[idx].insert(symbol, OrderBook::new(symbol));
        }

        let mut shards = Vec::with_capacity(num_shards);
        let mut workers = Vec::with_capacity(num_shards);

        for (idx, books) in per_shard_books.into_iter().enumerate() {
            let queue = Arc::new(ArrayQueue::new(queue_capacity));
            let semaphore = Arc::new(CountingSemaphore::new(0));

            let worker_queue = Arc::clone(&queue);
            let worker_semaphore = Arc::clone(&semaphore);
            let worker_stop = Arc::clone(&stop_requested);
            let worker_sink = Arc::clone(&sink);

            let worker = thread::Builder::new()
                .name(format!("shard-{idx}"))
                .spawn(move || {
                    run_shard(worker_queue, worker_semaphore, worker_stop, books, worker_sink)
                })
                .expect("failed to spawn shard worker thread");

            shards.push(ShardHandle { queue, semaphore });
            workers.push(worker);
        }

        Self {
            shards,
            stop_requested,
            workers: Mutex::new(workers),
        }
    }

    /// Routes `event` to its shard's queue. `Quit` is never queued: it
    /// broadcasts a stop instead. Returns `false` if the manager has
    /// stopped or the target shard's queue is full.
    pub fn submit(&self, event: Event) -> bool {
        if self.stop_requested.load(Ordering::SeqCst) {
            return false;
        }
        if matches!(event, Event::Quit) {
            self.stop();
            return true;
        }
        let idx = shard_index(event.symbol(), self.shards.len());
        let shard = &self.shards[idx];
        match shard.queue.push(event) {
            Ok(()) => {
                shard.semaphore.release();
                true
            }
            Err(_) => {
                warn!(symbol = %event.symbol(), "shard queue full, dropping event");
                false
            }
        }
    }

    /// Transitions `stop_requested` false→true exactly once, wakes every
    /// worker, and joins all of them.
    pub fn stop(&self) {
        if self
            .stop_requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }
        for shard in &self.shards {
            shard.semaphore.release();
        }
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        for worker in workers.drain(..) {
            let _ = worker.join();
        }
        info!("order book manager stopped");
    }
}

impl Drop for OrderBookManager {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_shard(
    queue: Arc<ArrayQueue<Event>>,
    semaphore: Arc<CountingSemaphore>,
    stop_requested: Arc<AtomicBool>,
    mut books: HashMap<Symbol, OrderBook>,
    sink: Arc<ReportSink>,
) {
    loop {
        semaphore.acquire();
        if stop_requested.load(Ordering::SeqCst) {
            return;
        }
        let event = sync::pop_after_acquire(&queue);
        process_event(&mut books, &sink, event);
        sync::batch_drain(&queue, &semaphore, &stop_requested, MAX_BATCH_SIZE, |event| {
            process_event(&mut books, &sink, event)
        });
    }
}

fn process_event(books: &mut HashMap<Symbol, OrderBook>, sink: &ReportSink, event: Event) {
    let symbol = event.symbol();
    let Some(book) = books.get_mut(&symbol) else {
        warn!(%symbol, "event for unknown symbol, dropping");
        return;
    };
    match event {
        Event::NewOrder(e) => {
            book.submit_new_order(e, sink);
        }
        Event::Cancel(e) => {
            book.submit_cancel_order(e, sink);
        }
        Event::TopOfBook(e) => {
            book.submit_top_of_book(e, sink);
        }
        Event::Quit => unreachable!("Quit is never placed on a shard queue"),
    }
}
