pub mod category;
pub mod config;
pub mod envelope;
pub mod error;
pub mod event;
pub mod gateway;
pub mod memory;
pub mod provisioner;
pub mod publisher;
pub mod router;
pub mod topology;

pub use category::{Category, EventCategoryTable, CATCH_ALL};
pub use config::RouterConfig;
pub use envelope::Envelope;
pub use error::RouterError;
pub use event::{EventType, TenantId, KNOWN_EVENTS};
pub use gateway::{BrokerGateway, BrokerHandle};
pub use memory::{BrokerSnapshot, MemoryBroker};
pub use provisioner::Provisioner;
pub use publisher::Publisher;
pub use router::{EventOccurrence, EventRouter};
pub use topology::{
    Binding, ExchangeSpec, ProvisionPlan, QueueSpec, RoutingMode, Topology, TopologyResolver,
    DEFAULT_EXCHANGE, SINGLE_QUEUE,
};
