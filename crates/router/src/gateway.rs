use std::sync::{Arc, OnceLock};

use async_trait::async_trait;

use crate::error::RouterError;
use crate::topology::{ExchangeSpec, QueueSpec};

/// Broker operations consumed by the provisioner and publisher.
///
/// Declarations are idempotent: asserting an object that already exists with
/// identical properties succeeds without change, asserting it with different
/// properties fails with [`RouterError::DeclareConflict`]. Deletes and
/// publishes are opaque single calls.
#[async_trait]
pub trait BrokerGateway: Send + Sync {
    async fn assert_exchange(&self, exchange: &ExchangeSpec) -> Result<(), RouterError>;

    async fn assert_queue(&self, queue: &QueueSpec) -> Result<(), RouterError>;

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<(), RouterError>;

    async fn delete_queue(&self, name: &str) -> Result<(), RouterError>;

    async fn delete_exchange(&self, name: &str) -> Result<(), RouterError>;

    /// Publish raw bytes. Returns once the channel accepted the message.
    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8]) -> Result<(), RouterError>;
}

/// Blanket implementation so `Arc<dyn BrokerGateway>` can be used directly.
#[async_trait]
impl<T: BrokerGateway + ?Sized> BrokerGateway for Arc<T> {
    async fn assert_exchange(&self, exchange: &ExchangeSpec) -> Result<(), RouterError> {
        (**self).assert_exchange(exchange).await
    }

    async fn assert_queue(&self, queue: &QueueSpec) -> Result<(), RouterError> {
        (**self).assert_queue(queue).await
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<(), RouterError> {
        (**self).bind_queue(queue, exchange, routing_key).await
    }

    async fn delete_queue(&self, name: &str) -> Result<(), RouterError> {
        (**self).delete_queue(name).await
    }

    async fn delete_exchange(&self, name: &str) -> Result<(), RouterError> {
        (**self).delete_exchange(name).await
    }

    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8]) -> Result<(), RouterError> {
        (**self).publish(exchange, routing_key, body).await
    }
}

/// Process-wide slot for the broker channel.
///
/// Created empty before the connection exists and filled exactly once during
/// startup. Clones share the slot, so the provisioner and publisher see the
/// gateway as soon as it is attached.
#[derive(Clone, Default)]
pub struct BrokerHandle {
    slot: Arc<OnceLock<Arc<dyn BrokerGateway>>>,
}

impl BrokerHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is ready immediately.
    pub fn ready(gateway: Arc<dyn BrokerGateway>) -> Self {
        let handle = Self::new();
        // A fresh slot cannot already be filled.
        let _ = handle.slot.set(gateway);
        handle
    }

    /// Fill the slot. Fails if a gateway was already attached.
    pub fn attach(&self, gateway: Arc<dyn BrokerGateway>) -> Result<(), RouterError> {
        self.slot.set(gateway).map_err(|_| RouterError::AlreadyAttached)
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The attached gateway, or [`RouterError::NotReady`].
    pub fn gateway(&self) -> Result<&Arc<dyn BrokerGateway>, RouterError> {
        self.slot.get().ok_or(RouterError::NotReady)
    }
}

impl std::fmt::Debug for BrokerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBroker;

    #[test]
    fn empty_handle_is_not_ready() {
        let handle = BrokerHandle::new();
        assert!(!handle.is_ready());
        assert!(matches!(handle.gateway(), Err(RouterError::NotReady)));
    }

    #[test]
    fn clones_observe_attach() {
        let handle = BrokerHandle::new();
        let clone = handle.clone();
        handle.attach(Arc::new(MemoryBroker::new())).unwrap();
        assert!(clone.is_ready());
        assert!(clone.gateway().is_ok());
    }

    #[test]
    fn second_attach_is_rejected() {
        let handle = BrokerHandle::ready(Arc::new(MemoryBroker::new()));
        let err = handle.attach(Arc::new(MemoryBroker::new())).unwrap_err();
        assert!(matches!(err, RouterError::AlreadyAttached));
    }
}
