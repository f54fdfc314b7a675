use std::collections::BTreeMap;

use tracing::{debug, info, instrument, warn};

use crate::error::RouterError;
use crate::event::{EventType, TenantId};
use crate::gateway::{BrokerGateway, BrokerHandle};
use crate::topology::{ExchangeSpec, ProvisionPlan, QueueSpec, RoutingMode, TopologyResolver};

/// Realizes resolved topologies against the broker and tears them down.
#[derive(Debug, Clone)]
pub struct Provisioner {
    resolver: TopologyResolver,
    handle: BrokerHandle,
}

impl Provisioner {
    pub fn new(resolver: TopologyResolver, handle: BrokerHandle) -> Self {
        Self { resolver, handle }
    }

    pub fn resolver(&self) -> &TopologyResolver {
        &self.resolver
    }

    /// Declare the shared exchange. Run once when the channel opens.
    pub async fn initialize(&self) -> Result<(), RouterError> {
        let gateway = self.handle.gateway()?;
        self.initialize_on(&**gateway).await
    }

    /// [`Provisioner::initialize`] against a gateway that is not attached yet.
    #[instrument(skip_all, fields(exchange = %self.resolver.exchange_name()))]
    pub(crate) async fn initialize_on(&self, gateway: &dyn BrokerGateway) -> Result<(), RouterError> {
        gateway
            .assert_exchange(&ExchangeSpec::topic(self.resolver.exchange_name()))
            .await?;
        info!("shared exchange declared");
        Ok(())
    }

    /// Assert every exchange, queue and binding `tenant` needs for `enabled`.
    ///
    /// The first failure aborts and is returned; nothing after it is asserted.
    #[instrument(skip_all, fields(tenant = %tenant, mode = %self.resolver.mode(), events = enabled.len()))]
    pub async fn provision(&self, tenant: &TenantId, enabled: &[EventType]) -> Result<ProvisionPlan, RouterError> {
        if enabled.is_empty() {
            debug!("no events enabled, nothing to provision");
            return Ok(ProvisionPlan::default());
        }
        let gateway = self.handle.gateway()?;
        let plan = self.resolver.plan(tenant, enabled);

        if let Err(e) = apply(&**gateway, &plan).await {
            warn!(error = %e, "provisioning aborted");
            return Err(e);
        }

        info!(
            queues = plan.queues.len(),
            bindings = plan.bindings.len(),
            "tenant topology provisioned"
        );
        Ok(plan)
    }

    /// Delete tenant-scoped queues, then the tenant exchange.
    ///
    /// Only isolated mode owns per-tenant objects. In single and global mode
    /// every queue is shared with other tenants and this is a no-op.
    #[instrument(skip_all, fields(tenant = %tenant, mode = %self.resolver.mode()))]
    pub async fn deprovision(&self, tenant: &TenantId, enabled: &[EventType]) -> Result<(), RouterError> {
        if self.resolver.mode() != RoutingMode::Isolated {
            debug!("shared topology, skipping teardown");
            return Ok(());
        }
        if enabled.is_empty() {
            return Ok(());
        }
        let gateway = self.handle.gateway()?;
        let plan = self.resolver.teardown(tenant, enabled);

        for queue in &plan.queues {
            gateway.delete_queue(&queue.name).await?;
            debug!(queue = %queue.name, "deleted queue");
        }
        for exchange in &plan.exchanges {
            gateway.delete_exchange(&exchange.name).await?;
        }
        info!(queues = plan.queues.len(), "tenant topology removed");
        Ok(())
    }

    /// Pre-provision one queue per enabled configured event on the shared
    /// exchange, named after the event and bound under the same key.
    ///
    /// Keys are raw configuration names (`MESSAGES_UPSERT = true`); disabled
    /// entries are skipped.
    pub async fn initialize_global_queues(&self, events: &BTreeMap<String, bool>) -> Result<usize, RouterError> {
        let gateway = self.handle.gateway()?;
        self.initialize_global_queues_on(&**gateway, events).await
    }

    #[instrument(skip_all, fields(exchange = %self.resolver.exchange_name()))]
    pub(crate) async fn initialize_global_queues_on(
        &self,
        gateway: &dyn BrokerGateway,
        events: &BTreeMap<String, bool>,
    ) -> Result<usize, RouterError> {
        info!("initializing global queues");
        if events.is_empty() {
            warn!("no events to initialize");
            return Ok(0);
        }
        let exchange = ExchangeSpec::topic(self.resolver.exchange_name());

        let mut count = 0;
        for (raw, _) in events.iter().filter(|(_, enabled)| **enabled) {
            let event = EventType::new(raw)?;
            gateway.assert_exchange(&exchange).await?;
            gateway.assert_queue(&QueueSpec::quorum(event.as_str())).await?;
            gateway
                .bind_queue(event.as_str(), &exchange.name, event.as_str())
                .await?;
            count += 1;
        }
        info!(queues = count, "global queues ready");
        Ok(count)
    }
}

/// Assert a plan in dependency order: exchanges, queues, then bindings.
pub(crate) async fn apply(gateway: &dyn BrokerGateway, plan: &ProvisionPlan) -> Result<(), RouterError> {
    for exchange in &plan.exchanges {
        gateway.assert_exchange(exchange).await?;
    }
    for queue in &plan.queues {
        gateway.assert_queue(queue).await?;
    }
    for binding in &plan.bindings {
        gateway
            .bind_queue(&binding.queue, &binding.exchange, &binding.routing_key)
            .await?;
        debug!(queue = %binding.queue, key = %binding.routing_key, "bound");
    }
    Ok(())
}
