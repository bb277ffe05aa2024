//! A small blocking counting semaphore.
//!
//! Both the shard dispatcher and the report sink need a permit count that
//! a single producer releases and a single consumer acquires, with the
//! consumer blocking (not spinning) when no permits are available. The
//! standard library has no `std::sync::Semaphore`; this is the idiomatic
//! `Mutex` + `Condvar` substitute, kept dependency-free since nothing else
//! in this crate needs an async runtime.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex};

use crossbeam::queue::ArrayQueue;
use crossbeam::utils::Backoff;

pub struct CountingSemaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl CountingSemaphore {
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// Releases one permit, waking a blocked `acquire` if any.
    pub fn release(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
        self.available.notify_one();
    }

    /// Blocks until a permit is available, then consumes it.
    pub fn acquire(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        while *count == 0 {
            count = self
                .available
                .wait(count)
                .unwrap_or_else(|e| e.into_inner());
        }
        *count -= 1;
    }

    /// Consumes a permit only if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}

/// The mandatory pop that follows a blocking `acquire`: the permit proves a
/// push has happened, so the only possible failure is that push not yet
/// being visible on this thread. Spin-with-backoff (yield, then sleep)
/// until it is — this is never expected to spin for long.
pub fn pop_after_acquire<T>(queue: &ArrayQueue<T>) -> T {
    let backoff = Backoff::new();
    loop {
        if let Some(item) = queue.pop() {
            return item;
        }
        backoff.snooze();
    }
}

/// One opportunistic extra pop for batching: acquires a permit only if one
/// is immediately available, and if the paired pop loses the race, hands
/// the permit back rather than spinning (this work is optional, so giving
/// up cheaply is preferable to blocking the batch).
pub fn try_pop_opportunistic<T>(queue: &ArrayQueue<T>, semaphore: &CountingSemaphore) -> Option<T> {
    if !semaphore.try_acquire() {
        return None;
    }
    match queue.pop() {
        Some(item) => Some(item),
        None => {
            semaphore.release();
            None
        }
    }
}

/// Drains up to `max` additional items via [`try_pop_opportunistic`],
/// stopping early if `stop_requested` flips or a permit/pop race is lost.
pub fn batch_drain<T>(
    queue: &ArrayQueue<T>,
    semaphore: &CountingSemaphore,
    stop_requested: &AtomicBool,
    max: usize,
    mut handle: impl FnMut(T),
) {
    for _ in 0..max {
        if stop_requested.load(Ordering::SeqCst) {
            break;
        }
        match try_pop_opportunistic(queue, semaphore) {
            Some(item) => handle(item),
            None => break,
        }
    }
}
