//! The ingress collaborator: an abstract publish/subscribe datagram
//! source, a concrete UDP implementation, and the CSV event decoder.

mod decoder;
mod udp;

pub use decoder::{decode_event, DecodeError};
pub use udp::UdpIngress;

/// Deregisters a subscription when dropped.
pub trait SubscriptionHandle: Send {}

/// The opaque ingress collaborator the core consumes: `subscribe(callback)
/// -> handle`. Callbacks may be invoked concurrently from the
/// collaborator's own thread(s).
pub trait IngressSource: Send + Sync {
    fn subscribe(
        &self,
        callback: Box<dyn Fn(&str) + Send + Sync>,
    ) -> Box<dyn SubscriptionHandle>;
}
