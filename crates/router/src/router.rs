use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::category::EventCategoryTable;
use crate::config::RouterConfig;
use crate::error::RouterError;
use crate::event::{EventType, TenantId};
use crate::gateway::{BrokerGateway, BrokerHandle};
use crate::provisioner::Provisioner;
use crate::publisher::Publisher;
use crate::topology::{ProvisionPlan, RoutingMode, Topology, TopologyResolver};

/// One domain event raised by a tenant session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOccurrence {
    pub tenant: TenantId,
    pub event: EventType,
    #[serde(default)]
    pub data: Value,
    pub sender: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Entry point used by the surrounding service.
///
/// Built before the broker connection exists; every operation fails with
/// [`RouterError::NotReady`] until [`EventRouter::attach`] succeeds.
#[derive(Debug, Clone)]
pub struct EventRouter {
    config: RouterConfig,
    handle: BrokerHandle,
    provisioner: Provisioner,
    publisher: Publisher,
}

impl EventRouter {
    /// Build a router with the standard category table.
    pub fn new(config: RouterConfig) -> Result<Self, RouterError> {
        Self::with_table(config, EventCategoryTable::standard())
    }

    pub fn with_table(config: RouterConfig, table: EventCategoryTable) -> Result<Self, RouterError> {
        config.validate()?;
        let mode = config.routing_mode()?;
        let resolver = TopologyResolver::new(mode, config.exchange_name.clone(), Arc::new(table));
        let handle = BrokerHandle::new();
        Ok(Self {
            provisioner: Provisioner::new(resolver.clone(), handle.clone()),
            publisher: Publisher::new(resolver, handle.clone(), config.server_url.clone()),
            handle,
            config,
        })
    }

    pub fn mode(&self) -> RoutingMode {
        self.provisioner.resolver().mode()
    }

    pub fn resolver(&self) -> &TopologyResolver {
        self.provisioner.resolver()
    }

    pub fn is_ready(&self) -> bool {
        self.handle.is_ready()
    }

    /// Complete startup: declare the shared exchange, pre-provision global
    /// queues when configured, then store the gateway.
    ///
    /// The gateway is only stored once startup declarations succeed, so a
    /// failed attach leaves the router not ready and can be retried.
    #[instrument(skip_all, fields(mode = %self.mode()))]
    pub async fn attach(&self, gateway: Arc<dyn BrokerGateway>) -> Result<(), RouterError> {
        if self.handle.is_ready() {
            return Err(RouterError::AlreadyAttached);
        }
        self.provisioner.initialize_on(&*gateway).await?;
        if self.config.global_queues {
            self.provisioner
                .initialize_global_queues_on(&*gateway, &self.config.events)
                .await?;
        }
        self.handle.attach(gateway)?;
        info!("event router ready");
        Ok(())
    }

    /// Provision the topology for a tenant's enabled events.
    ///
    /// Any failure aborts the enable; the caller should treat the tenant as
    /// not enabled.
    pub async fn enable_tenant(&self, tenant: &TenantId, events: &[EventType]) -> Result<ProvisionPlan, RouterError> {
        self.provisioner.provision(tenant, events).await
    }

    /// Tear down tenant-scoped topology. Only isolated mode deletes anything.
    pub async fn disable_tenant(&self, tenant: &TenantId, events: &[EventType]) -> Result<(), RouterError> {
        self.provisioner.deprovision(tenant, events).await
    }

    /// Publish one occurrence. Failures are logged and returned; they do not
    /// affect other tenants or events.
    #[instrument(skip_all, fields(tenant = %occurrence.tenant, event = %occurrence.event))]
    pub async fn dispatch(&self, occurrence: EventOccurrence) -> Result<Topology, RouterError> {
        let EventOccurrence {
            tenant,
            event,
            data,
            sender,
            api_key,
        } = occurrence;
        match self
            .publisher
            .publish(&tenant, &event, data, &sender, api_key)
            .await
        {
            Ok(topology) => Ok(topology),
            Err(e) => {
                warn!(error = %e, "failed to publish event");
                Err(e)
            }
        }
    }
}
