//! The top-level control plane: wires an [`IngressSource`] to an
//! [`OrderBookManager`] and [`ReportSink`], and blocks the calling thread
//! until a `Quit` event or an external [`Exchange::stop`] call.

use std::sync::{Arc, Condvar, Mutex, OnceLock};
use std::time::Instant;

use tracing::info;

use crate::dispatch::OrderBookManager;
use crate::ingress::{decode_event, IngressSource, SubscriptionHandle};
use crate::model::{PriceSpec, Timestamp};
use crate::sink::ReportSink;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Nanoseconds since this process's monotonic epoch. `Timestamp` is the
/// tie-break field of `BidKey`/`AskKey`, so it must never step backwards —
/// `Instant` guarantees that across a single process run, unlike wall-clock
/// time under an NTP adjustment.
fn now_ticks() -> Timestamp {
    let epoch = EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_nanos() as Timestamp
}

struct StopGate {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopGate {
    fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn signal(&self) {
        *self.stopped.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let guard = self.stopped.lock().unwrap_or_else(|e| e.into_inner());
        let _unused = self
            .condvar
            .wait_while(guard, |stopped| !*stopped)
            .unwrap_or_else(|e| e.into_inner());
    }
}

/// Owns the whole running exchange: ingress subscription, dispatcher, and
/// report sink. `run` blocks until shutdown; `stop` can be called from
/// another thread (e.g. a signal handler) to unblock it early.
pub struct Exchange<I: IngressSource> {
    ingress: Arc<I>,
    manager: Arc<OrderBookManager>,
    sink: Arc<ReportSink>,
    price_spec: PriceSpec,
    gate: Arc<StopGate>,
}

impl<I: IngressSource + 'static> Exchange<I> {
    pub fn new(
        ingress: Arc<I>,
        manager: Arc<OrderBookManager>,
        sink: Arc<ReportSink>,
        price_spec: PriceSpec,
    ) -> Self {
        Self {
            ingress,
            manager,
            sink,
            price_spec,
            gate: Arc::new(StopGate::new()),
        }
    }

    /// Subscribes to ingress and blocks until shutdown. On return, the
    /// subscription handle has been dropped, the manager has been stopped,
    /// and the sink has drained and stopped.
    pub fn run(&self) {
        let manager = Arc::clone(&self.manager);
        let gate = Arc::clone(&self.gate);
        let price_spec = self.price_spec;

        let handle: Box<dyn SubscriptionHandle> = self.ingress.subscribe(Box::new(move |line: &str| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return;
            }
            let first = trimmed
                .split(',')
                .next()
                .unwrap_or("")
                .trim()
                .to_ascii_uppercase();
            if first == "Q" || first == "QUIT" {
                manager.submit(crate::model::Event::Quit);
                gate.signal();
                return;
            }
            match decode_event(trimmed, price_spec, now_ticks()) {
                Ok(event) => {
                    manager.submit(event);
                }
                Err(err) => {
                    tracing::warn!(%err, line = trimmed, "dropping malformed event");
                }
            }
        }));

        self.gate.wait();
        drop(handle);
        self.manager.stop();
        self.sink.stop();
        info!("exchange shut down");
    }

    /// Requests shutdown from outside the ingress callback (e.g. a signal
    /// handler). Idempotent.
    pub fn stop(&self) {
        self.gate.signal();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Symbol, TWO_DIGITS_PRICE_SPEC};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    struct FakeIngress {
        callback: Mutex<Option<Box<dyn Fn(&str) + Send + Sync>>>,
    }

    struct FakeSubscription;
    impl SubscriptionHandle for FakeSubscription {}

    impl IngressSource for FakeIngress {
        fn subscribe(
            &self,
            callback: Box<dyn Fn(&str) + Send + Sync>,
        ) -> Box<dyn SubscriptionHandle> {
            *self.callback.lock().unwrap() = Some(callback);
            Box::new(FakeSubscription)
        }
    }

    #[test]
    fn quit_event_unblocks_run() {
        let ingress = Arc::new(FakeIngress {
            callback: Mutex::new(None),
        });
        let sink = Arc::new(ReportSink::new_for_test());
        let manager = Arc::new(OrderBookManager::new(
            &[Symbol::from_str_truncating("AAPL")],
            Arc::clone(&sink),
            2,
            16,
        ));
        let exchange = Arc::new(Exchange::new(
            Arc::clone(&ingress),
            manager,
            sink,
            TWO_DIGITS_PRICE_SPEC,
        ));

        let runner = Arc::clone(&exchange);
        let done = Arc::new(AtomicBool::new(false));
        let done2 = Arc::clone(&done);
        let handle = thread::spawn(move || {
            runner.run();
            done2.store(true, Ordering::SeqCst);
        });

        // Let `run` install its subscription, then drive it via the fake.
        thread::sleep(Duration::from_millis(20));
        if let Some(cb) = ingress.callback.lock().unwrap().as_ref() {
            cb("QUIT");
        }

        handle.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn external_stop_unblocks_run() {
        let ingress = Arc::new(FakeIngress {
            callback: Mutex::new(None),
        });
        let sink = Arc::new(ReportSink::new_for_test());
        let manager = Arc::new(OrderBookManager::new(
            &[Symbol::from_str_truncating("AAPL")],
            Arc::clone(&sink),
            2,
            16,
        ));
        let exchange = Arc::new(Exchange::new(ingress, manager, sink, TWO_DIGITS_PRICE_SPEC));

        let runner = Arc::clone(&exchange);
        let handle = thread::spawn(move || runner.run());
        thread::sleep(Duration::from_millis(20));
        exchange.stop();
        handle.join().unwrap();
    }
}
