//! Name derivation: (mode, tenant, event) → (exchange, queue, binding key).
//!
//! Everything here is pure. The broker is the durable record of what exists;
//! these values are recomputed on every call.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::category::EventCategoryTable;
use crate::error::RouterError;
use crate::event::{self, EventType, TenantId};

/// Shared exchange used by `single` and `global` modes unless configured.
pub const DEFAULT_EXCHANGE: &str = "evolution_exchange";

/// The one queue every event lands in under `single` mode.
pub const SINGLE_QUEUE: &str = "evolution";

/// Value of the `x-queue-type` argument on every declared queue.
pub const QUORUM: &str = "quorum";

// ── RoutingMode ───────────────────────────────────────────────────────────

/// How events are laid out across exchanges and queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// One exchange per tenant, one queue per (tenant, event).
    #[default]
    Isolated,
    /// One shared exchange, one shared queue for everything.
    Single,
    /// One shared exchange, one queue per event category.
    Global,
}

impl RoutingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "isolated",
            Self::Single => "single",
            Self::Global => "global",
        }
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoutingMode {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isolated" => Ok(Self::Isolated),
            "single" => Ok(Self::Single),
            "global" => Ok(Self::Global),
            other => Err(RouterError::Configuration(format!(
                "invalid routing mode '{other}', expected 'isolated', 'single' or 'global'"
            ))),
        }
    }
}

// ── Declarations ──────────────────────────────────────────────────────────

/// Exchange declaration. Always a durable, non-auto-deleted topic exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeSpec {
    pub name: String,
    pub kind: String,
    pub durable: bool,
    pub auto_delete: bool,
}

impl ExchangeSpec {
    pub fn topic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "topic".into(),
            durable: true,
            auto_delete: false,
        }
    }
}

/// Queue declaration. Always durable, non-auto-deleted, quorum-replicated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueSpec {
    pub name: String,
    pub durable: bool,
    pub auto_delete: bool,
    /// Extra declare arguments (`x-queue-type`, ...).
    pub arguments: BTreeMap<String, String>,
}

impl QueueSpec {
    pub fn quorum(name: impl Into<String>) -> Self {
        let mut arguments = BTreeMap::new();
        arguments.insert("x-queue-type".to_string(), QUORUM.to_string());
        Self {
            name: name.into(),
            durable: true,
            auto_delete: false,
            arguments,
        }
    }
}

/// A queue attached to an exchange under one routing key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Binding {
    pub queue: String,
    pub exchange: String,
    pub routing_key: String,
}

// ── Topology ──────────────────────────────────────────────────────────────

/// Where one event occurrence for one tenant goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub exchange_name: String,
    pub queue_name: String,
    pub binding_key: String,
}

impl Topology {
    pub fn exchange(&self) -> ExchangeSpec {
        ExchangeSpec::topic(&self.exchange_name)
    }

    pub fn queue(&self) -> QueueSpec {
        QueueSpec::quorum(&self.queue_name)
    }

    pub fn binding(&self) -> Binding {
        Binding {
            queue: self.queue_name.clone(),
            exchange: self.exchange_name.clone(),
            routing_key: self.binding_key.clone(),
        }
    }
}

/// Everything provisioning a tenant's event set must assert, deduplicated,
/// in assertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionPlan {
    pub exchanges: Vec<ExchangeSpec>,
    pub queues: Vec<QueueSpec>,
    pub bindings: Vec<Binding>,
}

impl ProvisionPlan {
    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty() && self.queues.is_empty() && self.bindings.is_empty()
    }

    fn add(&mut self, topology: &Topology) {
        let exchange = topology.exchange();
        if !self.exchanges.contains(&exchange) {
            self.exchanges.push(exchange);
        }
        let queue = topology.queue();
        if !self.queues.contains(&queue) {
            self.queues.push(queue);
        }
        let binding = topology.binding();
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
    }
}

// ── Resolver ──────────────────────────────────────────────────────────────

/// Resolves topologies for one process-wide mode and exchange name.
#[derive(Debug, Clone)]
pub struct TopologyResolver {
    mode: RoutingMode,
    exchange_name: String,
    table: Arc<EventCategoryTable>,
}

impl TopologyResolver {
    pub fn new(mode: RoutingMode, exchange_name: impl Into<String>, table: Arc<EventCategoryTable>) -> Self {
        Self {
            mode,
            exchange_name: exchange_name.into(),
            table,
        }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    /// Exchange shared by all tenants in `single` and `global` modes.
    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn table(&self) -> &EventCategoryTable {
        &self.table
    }

    /// Resolve the destination of `event` for `tenant`.
    pub fn resolve(&self, tenant: &TenantId, event: &EventType) -> Topology {
        let (exchange_name, queue_name) = match self.mode {
            RoutingMode::Isolated => (tenant.to_string(), format!("{tenant}.{event}")),
            RoutingMode::Single => (self.exchange_name.clone(), SINGLE_QUEUE.to_string()),
            RoutingMode::Global => (
                self.exchange_name.clone(),
                self.table.category_of(event).to_string(),
            ),
        };
        Topology {
            exchange_name,
            queue_name,
            binding_key: event.to_string(),
        }
    }

    /// Compute the full set of declarations for enabling `enabled` on `tenant`.
    ///
    /// In global mode the catch-all bindings come from walking the known event
    /// universe: an event is bound to the catch-all queue only if it is both
    /// enabled and unclaimed by every explicit category. Enabled events outside
    /// the universe land there too, after the known ones.
    pub fn plan(&self, tenant: &TenantId, enabled: &[EventType]) -> ProvisionPlan {
        let mut plan = ProvisionPlan::default();
        if enabled.is_empty() {
            return plan;
        }

        if self.mode != RoutingMode::Global {
            for event in enabled {
                plan.add(&self.resolve(tenant, event));
            }
            return plan;
        }

        let enabled_set: HashSet<&EventType> = enabled.iter().collect();

        for category in self.table.categories() {
            for event in category.events.iter().filter(|e| enabled_set.contains(e)) {
                plan.add(&self.resolve(tenant, event));
            }
        }

        let catch_all = event::known_events()
            .filter(|e| enabled_set.contains(e) && !self.table.is_categorized(e))
            .chain(
                enabled
                    .iter()
                    .filter(|e| !e.is_known() && !self.table.is_categorized(e))
                    .cloned(),
            );
        for event in catch_all {
            plan.add(&self.resolve(tenant, &event));
        }

        plan
    }

    /// Tenant-scoped declarations to delete on disable. Empty outside isolated
    /// mode since those queues and exchanges are shared.
    pub fn teardown(&self, tenant: &TenantId, enabled: &[EventType]) -> ProvisionPlan {
        if self.mode != RoutingMode::Isolated {
            return ProvisionPlan::default();
        }
        let mut plan = ProvisionPlan::default();
        for event in enabled {
            plan.add(&self.resolve(tenant, event));
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CATCH_ALL;

    fn resolver(mode: RoutingMode) -> TopologyResolver {
        TopologyResolver::new(mode, DEFAULT_EXCHANGE, Arc::new(EventCategoryTable::standard()))
    }

    fn tenant(s: &str) -> TenantId {
        TenantId::new(s).unwrap()
    }

    fn events(raw: &[&str]) -> Vec<EventType> {
        event::parse_events(raw).unwrap()
    }

    #[test]
    fn parse_mode_case_insensitive() {
        assert_eq!("ISOLATED".parse::<RoutingMode>().unwrap(), RoutingMode::Isolated);
        assert_eq!(" global ".parse::<RoutingMode>().unwrap(), RoutingMode::Global);
        assert_eq!(RoutingMode::default(), RoutingMode::Isolated);
    }

    #[test]
    fn unknown_mode_is_configuration_error() {
        let err = "fanout".parse::<RoutingMode>().unwrap_err();
        assert!(matches!(err, RouterError::Configuration(ref m) if m.contains("fanout")));
    }

    #[test]
    fn isolated_names_derive_from_tenant() {
        let r = resolver(RoutingMode::Isolated);
        let e = EventType::new("MESSAGES_UPSERT").unwrap();
        let t = r.resolve(&tenant("acct1"), &e);
        assert_eq!(t.exchange_name, "acct1");
        assert_eq!(t.queue_name, "acct1.messages.upsert");
        assert_eq!(t.binding_key, "messages.upsert");
    }

    #[test]
    fn single_mode_shares_one_queue() {
        let r = resolver(RoutingMode::Single);
        let a = r.resolve(&tenant("t1"), &EventType::new("CHATS_UPDATE").unwrap());
        let b = r.resolve(&tenant("t2"), &EventType::new("CALL").unwrap());
        assert_eq!(a.queue_name, SINGLE_QUEUE);
        assert_eq!(a.queue_name, b.queue_name);
        assert_eq!(a.exchange_name, DEFAULT_EXCHANGE);
        assert_eq!(a.binding_key, "chats.update");
        assert_eq!(b.binding_key, "call");
    }

    #[test]
    fn global_mode_uses_category_queue() {
        let r = resolver(RoutingMode::Global);
        let groups = r.resolve(&tenant("t"), &EventType::new("GROUPS_UPSERT").unwrap());
        let other = r.resolve(&tenant("t"), &EventType::new("CONNECTION_UPDATE").unwrap());
        assert_eq!(groups.queue_name, "groups");
        assert_eq!(other.queue_name, CATCH_ALL);
        assert_eq!(other.binding_key, "connection.update");
        assert_eq!(groups.exchange_name, DEFAULT_EXCHANGE);
    }

    #[test]
    fn custom_exchange_name_is_used_outside_isolated() {
        let table = Arc::new(EventCategoryTable::standard());
        let r = TopologyResolver::new(RoutingMode::Single, "bus", table);
        let t = r.resolve(&tenant("acct"), &EventType::new("call").unwrap());
        assert_eq!(t.exchange_name, "bus");
    }

    #[test]
    fn plan_empty_for_no_events() {
        for mode in [RoutingMode::Isolated, RoutingMode::Single, RoutingMode::Global] {
            assert!(resolver(mode).plan(&tenant("t"), &[]).is_empty());
        }
    }

    #[test]
    fn isolated_plan_has_one_queue_per_event() {
        let plan = resolver(RoutingMode::Isolated)
            .plan(&tenant("acct1"), &events(&["MESSAGES_UPSERT", "CALL", "messages.upsert"]));
        assert_eq!(plan.exchanges, vec![ExchangeSpec::topic("acct1")]);
        let queues: Vec<&str> = plan.queues.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(queues, vec!["acct1.messages.upsert", "acct1.call"]);
        assert_eq!(plan.bindings.len(), 2);
    }

    #[test]
    fn single_plan_binds_every_event_to_shared_queue() {
        let plan = resolver(RoutingMode::Single).plan(&tenant("t"), &events(&["CALL", "CHATS_SET"]));
        assert_eq!(plan.queues.len(), 1);
        assert_eq!(plan.queues[0].name, SINGLE_QUEUE);
        let keys: Vec<&str> = plan.bindings.iter().map(|b| b.routing_key.as_str()).collect();
        assert_eq!(keys, vec!["call", "chats.set"]);
    }

    #[test]
    fn global_plan_splits_categories_and_catch_all() {
        let enabled = events(&["CONNECTION_UPDATE", "GROUPS_UPSERT", "QRCODE_UPDATED", "custom.thing"]);
        let plan = resolver(RoutingMode::Global).plan(&tenant("t"), &enabled);

        let queues: Vec<&str> = plan.queues.iter().map(|q| q.name.as_str()).collect();
        assert_eq!(queues, vec!["groups", CATCH_ALL]);

        let others: Vec<&str> = plan
            .bindings
            .iter()
            .filter(|b| b.queue == CATCH_ALL)
            .map(|b| b.routing_key.as_str())
            .collect();
        // Universe order first, then unknown events.
        assert_eq!(others, vec!["qrcode.updated", "connection.update", "custom.thing"]);
    }

    #[test]
    fn global_catch_all_never_claims_categorized_events() {
        let enabled: Vec<EventType> = event::known_events().collect();
        let r = resolver(RoutingMode::Global);
        let plan = r.plan(&tenant("t"), &enabled);
        for b in plan.bindings.iter().filter(|b| b.queue == CATCH_ALL) {
            let e = EventType::new(&b.routing_key).unwrap();
            assert!(!r.table().is_categorized(&e), "{} bound to catch-all", b.routing_key);
        }
        assert_eq!(plan.bindings.len(), enabled.len());
        assert_eq!(plan.queues.len(), 5);
    }

    #[test]
    fn global_plan_only_binds_enabled_category_members() {
        let plan = resolver(RoutingMode::Global).plan(&tenant("t"), &events(&["CHATS_SET"]));
        assert_eq!(plan.bindings.len(), 1);
        assert_eq!(plan.bindings[0].queue, "chats");
    }

    #[test]
    fn teardown_only_in_isolated_mode() {
        let enabled = events(&["CALL"]);
        assert!(resolver(RoutingMode::Single).teardown(&tenant("t"), &enabled).is_empty());
        assert!(resolver(RoutingMode::Global).teardown(&tenant("t"), &enabled).is_empty());
        let plan = resolver(RoutingMode::Isolated).teardown(&tenant("t"), &enabled);
        assert_eq!(plan.queues[0].name, "t.call");
        assert_eq!(plan.exchanges[0].name, "t");
    }

    #[test]
    fn quorum_queue_arguments() {
        let q = QueueSpec::quorum("q");
        assert!(q.durable && !q.auto_delete);
        assert_eq!(q.arguments.get("x-queue-type").map(String::as_str), Some(QUORUM));
        let x = ExchangeSpec::topic("x");
        assert_eq!(x.kind, "topic");
        assert!(x.durable && !x.auto_delete);
    }
}
