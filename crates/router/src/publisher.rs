use serde_json::Value;
use tracing::{debug, instrument};

use crate::envelope::Envelope;
use crate::error::RouterError;
use crate::event::{EventType, TenantId};
use crate::gateway::BrokerHandle;
use crate::topology::{Topology, TopologyResolver};

/// Resolves, lazily provisions, and publishes single event occurrences.
#[derive(Debug, Clone)]
pub struct Publisher {
    resolver: TopologyResolver,
    handle: BrokerHandle,
    server_url: String,
}

impl Publisher {
    pub fn new(resolver: TopologyResolver, handle: BrokerHandle, server_url: impl Into<String>) -> Self {
        Self {
            resolver,
            handle,
            server_url: server_url.into(),
        }
    }

    /// Publish `data` for `tenant` under `event`.
    ///
    /// The destination is re-asserted before every send so an event whose
    /// queue was never provisioned still has somewhere to land. Returns the
    /// topology the message was routed with.
    #[instrument(skip_all, fields(tenant = %tenant, event = %event))]
    pub async fn publish(
        &self,
        tenant: &TenantId,
        event: &EventType,
        data: Value,
        sender: &str,
        api_key: Option<String>,
    ) -> Result<Topology, RouterError> {
        let gateway = self.handle.gateway()?;
        let topology = self.resolver.resolve(tenant, event);

        gateway.assert_exchange(&topology.exchange()).await?;
        gateway.assert_queue(&topology.queue()).await?;
        gateway
            .bind_queue(&topology.queue_name, &topology.exchange_name, &topology.binding_key)
            .await?;

        let envelope = Envelope::new(event, tenant, data, self.server_url.as_str(), sender, api_key);
        let body = envelope.to_bytes()?;

        debug!(
            queue = %topology.queue_name,
            exchange = %topology.exchange_name,
            bytes = body.len(),
            "publishing event"
        );
        gateway
            .publish(&topology.exchange_name, &topology.binding_key, &body)
            .await?;
        Ok(topology)
    }
}
