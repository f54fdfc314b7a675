//! In-process broker implementing [`BrokerGateway`].
//!
//! Mirrors the declare/bind/publish semantics of an AMQP topic broker closely
//! enough to exercise provisioning without a live connection: redeclares are
//! idempotent, conflicting redeclares fail, bindings are a set, and published
//! messages are copied into every queue whose binding pattern matches.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::RouterError;
use crate::gateway::BrokerGateway;
use crate::topology::{Binding, ExchangeSpec, QueueSpec};

/// One message as the broker accepted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
}

#[derive(Debug)]
struct StoredQueue {
    spec: QueueSpec,
    messages: Vec<Vec<u8>>,
}

#[derive(Debug, Default)]
struct State {
    exchanges: BTreeMap<String, ExchangeSpec>,
    queues: BTreeMap<String, StoredQueue>,
    bindings: BTreeSet<Binding>,
    published: Vec<PublishedMessage>,
}

/// Point-in-time view of the broker topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerSnapshot {
    pub exchanges: Vec<String>,
    /// Queue name → number of messages waiting.
    pub queues: BTreeMap<String, usize>,
    pub bindings: Vec<Binding>,
}

impl BrokerSnapshot {
    pub fn has_binding(&self, queue: &str, exchange: &str, routing_key: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.queue == queue && b.exchange == exchange && b.routing_key == routing_key)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBroker {
    state: Mutex<State>,
    fail_publish: AtomicBool,
    fail_bind: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish fail with [`RouterError::Publish`].
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent bind fail with [`RouterError::Broker`].
    pub fn set_fail_bind(&self, fail: bool) {
        self.fail_bind.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> BrokerSnapshot {
        let state = self.state.lock().await;
        BrokerSnapshot {
            exchanges: state.exchanges.keys().cloned().collect(),
            queues: state
                .queues
                .iter()
                .map(|(name, q)| (name.clone(), q.messages.len()))
                .collect(),
            bindings: state.bindings.iter().cloned().collect(),
        }
    }

    /// Messages waiting in `queue`, oldest first.
    pub async fn messages(&self, queue: &str) -> Vec<Vec<u8>> {
        let state = self.state.lock().await;
        state
            .queues
            .get(queue)
            .map(|q| q.messages.clone())
            .unwrap_or_default()
    }

    /// Every accepted publish, including ones no queue matched.
    pub async fn published(&self) -> Vec<PublishedMessage> {
        self.state.lock().await.published.clone()
    }

    /// Declared properties of `queue`, if it exists.
    pub async fn queue_spec(&self, queue: &str) -> Option<QueueSpec> {
        self.state.lock().await.queues.get(queue).map(|q| q.spec.clone())
    }
}

#[async_trait]
impl BrokerGateway for MemoryBroker {
    async fn assert_exchange(&self, exchange: &ExchangeSpec) -> Result<(), RouterError> {
        let mut state = self.state.lock().await;
        match state.exchanges.get(&exchange.name) {
            Some(existing) if existing != exchange => Err(RouterError::DeclareConflict {
                kind: "exchange",
                name: exchange.name.clone(),
                detail: format!("declared as {existing:?}, asserted as {exchange:?}"),
            }),
            Some(_) => Ok(()),
            None => {
                debug!(exchange = %exchange.name, kind = %exchange.kind, "declared exchange");
                state.exchanges.insert(exchange.name.clone(), exchange.clone());
                Ok(())
            }
        }
    }

    async fn assert_queue(&self, queue: &QueueSpec) -> Result<(), RouterError> {
        let mut state = self.state.lock().await;
        match state.queues.get(&queue.name) {
            Some(existing) if existing.spec != *queue => Err(RouterError::DeclareConflict {
                kind: "queue",
                name: queue.name.clone(),
                detail: format!("declared as {:?}, asserted as {queue:?}", existing.spec),
            }),
            Some(_) => Ok(()),
            None => {
                debug!(queue = %queue.name, "declared queue");
                state.queues.insert(
                    queue.name.clone(),
                    StoredQueue {
                        spec: queue.clone(),
                        messages: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    async fn bind_queue(&self, queue: &str, exchange: &str, routing_key: &str) -> Result<(), RouterError> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(RouterError::Broker(format!("bind {queue} -> {exchange} refused")));
        }
        let mut state = self.state.lock().await;
        if !state.queues.contains_key(queue) {
            return Err(RouterError::NotFound {
                kind: "queue",
                name: queue.to_string(),
            });
        }
        if !state.exchanges.contains_key(exchange) {
            return Err(RouterError::NotFound {
                kind: "exchange",
                name: exchange.to_string(),
            });
        }
        state.bindings.insert(Binding {
            queue: queue.to_string(),
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
        });
        Ok(())
    }

    async fn delete_queue(&self, name: &str) -> Result<(), RouterError> {
        let mut state = self.state.lock().await;
        state.queues.remove(name);
        state.bindings.retain(|b| b.queue != name);
        Ok(())
    }

    async fn delete_exchange(&self, name: &str) -> Result<(), RouterError> {
        let mut state = self.state.lock().await;
        state.exchanges.remove(name);
        state.bindings.retain(|b| b.exchange != name);
        Ok(())
    }

    async fn publish(&self, exchange: &str, routing_key: &str, body: &[u8]) -> Result<(), RouterError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(RouterError::Publish(format!("channel closed while publishing to {exchange}")));
        }
        let mut state = self.state.lock().await;
        if !state.exchanges.contains_key(exchange) {
            return Err(RouterError::NotFound {
                kind: "exchange",
                name: exchange.to_string(),
            });
        }

        let targets: BTreeSet<String> = state
            .bindings
            .iter()
            .filter(|b| b.exchange == exchange && topic_matches(&b.routing_key, routing_key))
            .map(|b| b.queue.clone())
            .collect();
        for queue in &targets {
            if let Some(q) = state.queues.get_mut(queue) {
                q.messages.push(body.to_vec());
            }
        }
        debug!(exchange, routing_key, queues = targets.len(), "routed message");

        state.published.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body: body.to_vec(),
        });
        Ok(())
    }
}

/// AMQP topic matching: `*` matches exactly one word, `#` zero or more.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    match_words(&pattern, &key)
}

fn match_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| match_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&k, key_rest)) if word == "*" || word == k => match_words(rest, key_rest),
            _ => false,
        },
    }
}
