//! UDP datagram ingress: `INADDR_ANY` bind with `SO_REUSEADDR`, one reader
//! thread invoking the subscribed callback per received line.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use socket2::{Domain, Socket, Type};
use tracing::{trace, warn};

use super::{IngressSource, SubscriptionHandle};

type Callback = Box<dyn Fn(&str) + Send + Sync>;

struct Shared {
    callback: Mutex<Option<Callback>>,
}

/// A UDP-backed [`IngressSource`]. Binds immediately on construction and
/// runs its reader thread for the listener's whole lifetime.
pub struct UdpIngress {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    local_addr: SocketAddr,
}

impl UdpIngress {
    /// Binds `INADDR_ANY:port` with `SO_REUSEADDR` and starts listening.
    /// `port == 0` asks the OS for an ephemeral port; see [`local_addr`].
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, None)?;
        socket.set_reuse_address(true)?;
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        socket.bind(&addr.into())?;
        let socket: UdpSocket = socket.into();
        let local_addr = socket.local_addr()?;
        // Periodic timeout so the reader thread can observe `running` and
        // exit promptly on drop, instead of blocking in recv_from forever.
        socket.set_read_timeout(Some(Duration::from_millis(200)))?;

        let shared = Arc::new(Shared {
            callback: Mutex::new(None),
        });
        let running = Arc::new(AtomicBool::new(true));

        let reader_shared = Arc::clone(&shared);
        let reader_running = Arc::clone(&running);
        let reader = thread::Builder::new()
            .name(format!("udp-ingress-{port}"))
            .spawn(move || run_reader(socket, reader_shared, reader_running))
            .expect("failed to spawn UDP ingress reader thread");

        Ok(Self {
            shared,
            running,
            reader: Some(reader),
            local_addr,
        })
    }

    /// The address actually bound, useful when `bind(0)` chose the port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

fn run_reader(socket: UdpSocket, shared: Arc<Shared>, running: Arc<AtomicBool>) {
    let mut buf = [0u8; 2048];
    while running.load(Ordering::SeqCst) {
        match socket.recv_from(&mut buf) {
            Ok((n, _from)) => {
                if let Ok(text) = std::str::from_utf8(&buf[..n]) {
                    trace!(text, "received datagram");
                    if let Some(cb) = shared.callback.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
                        cb(text);
                    }
                } else {
                    warn!("received non-UTF-8 datagram, dropping");
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(err) => {
                warn!(%err, "UDP ingress read error");
            }
        }
    }
}

impl Drop for UdpIngress {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
    }
}

struct UdpSubscription {
    shared: Arc<Shared>,
}

impl SubscriptionHandle for UdpSubscription {}

impl Drop for UdpSubscription {
    fn drop(&mut self) {
        *self.shared.callback.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl IngressSource for UdpIngress {
    fn subscribe(&self, callback: Callback) -> Box<dyn SubscriptionHandle> {
        *self.shared.callback.lock().unwrap_or_else(|e| e.into_inner()) = Some(callback);
        Box::new(UdpSubscription {
            shared: Arc::clone(&self.shared),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn delivers_datagrams_to_subscriber() {
        let ingress = UdpIngress::bind(0).expect("failed to bind test UDP ingress");
        let target = ingress.local_addr();

        let received = Arc::new(Mutex::new(Vec::new()));
        let collected = Arc::clone(&received);
        let _handle = ingress.subscribe(Box::new(move |msg: &str| {
            collected.lock().unwrap().push(msg.to_string());
        }));

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(b"D,u1,1,AAPL,100,BUY,LIMIT,150.00", target)
            .unwrap();

        let mut seen = false;
        for _ in 0..50 {
            if !received.lock().unwrap().is_empty() {
                seen = true;
                break;
            }
            thread::sleep(Duration::from_millis(20));
        }
        assert!(seen, "subscriber never received the datagram");
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let received = Arc::new(AtomicUsize::new(0));
        let shared = Arc::new(Shared {
            callback: Mutex::new(None),
        });
        let counter = Arc::clone(&received);
        let handle = UdpSubscription {
            shared: Arc::clone(&shared),
        };
        *shared.callback.lock().unwrap() = Some(Box::new(move |_msg: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        if let Some(cb) = shared.callback.lock().unwrap().as_ref() {
            cb("D,u1,1,AAPL,100,BUY,LIMIT,150.00");
        }
        assert_eq!(received.load(Ordering::SeqCst), 1);
        drop(handle);
        assert!(shared.callback.lock().unwrap().is_none());
        thread::sleep(Duration::from_millis(1));
    }
}
