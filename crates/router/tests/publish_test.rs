//! Integration tests for the publish path: destination resolution, lazy
//! provisioning, envelope contents and failure isolation.

use std::sync::Arc;

use serde_json::{json, Value};

use fanout_router::event::parse_events;
use fanout_router::{
    Envelope, EventOccurrence, EventRouter, EventType, MemoryBroker, RouterConfig, RouterError,
    TenantId, CATCH_ALL,
};

async fn router(mode: &str) -> (EventRouter, Arc<MemoryBroker>) {
    let config = RouterConfig {
        mode: mode.into(),
        server_url: "https://api.example.com".into(),
        ..RouterConfig::default()
    };
    let router = EventRouter::new(config).unwrap();
    let broker = Arc::new(MemoryBroker::new());
    router.attach(broker.clone()).await.unwrap();
    (router, broker)
}

fn occurrence(tenant: &str, event: &str, data: Value) -> EventOccurrence {
    EventOccurrence {
        tenant: TenantId::new(tenant).unwrap(),
        event: EventType::new(event).unwrap(),
        data,
        sender: "5511999999999@s.whatsapp.net".into(),
        api_key: None,
    }
}

#[tokio::test]
async fn single_mode_publish_lands_in_shared_queue() {
    let (router, broker) = router("single").await;
    let topo = router
        .dispatch(occurrence("acct2", "CHATS_UPDATE", json!({"id": "c1"})))
        .await
        .unwrap();
    assert_eq!(topo.queue_name, "evolution");
    assert_eq!(topo.exchange_name, "evolution_exchange");
    assert_eq!(topo.binding_key, "chats.update");

    let snap = broker.snapshot().await;
    assert!(snap.has_binding("evolution", "evolution_exchange", "chats.update"));

    let msgs = broker.messages("evolution").await;
    assert_eq!(msgs.len(), 1);
    let env = Envelope::from_bytes(&msgs[0]).unwrap();
    assert_eq!(env.event, "chats.update");
    assert_eq!(env.instance, "acct2");
    assert_eq!(env.server_url, "https://api.example.com");
    assert_eq!(env.data, json!({"id": "c1"}));
    assert!(env.apikey.is_none());
}

#[tokio::test]
async fn global_mode_routes_by_category() {
    let (router, broker) = router("global").await;
    router
        .dispatch(occurrence("t", "GROUPS_UPSERT", Value::Null))
        .await
        .unwrap();
    let topo = router
        .dispatch(occurrence("t", "CONNECTION_UPDATE", Value::Null))
        .await
        .unwrap();
    assert_eq!(topo.queue_name, CATCH_ALL);

    assert_eq!(broker.messages("groups").await.len(), 1);
    assert_eq!(broker.messages(CATCH_ALL).await.len(), 1);
}

#[tokio::test]
async fn isolated_publish_after_enable_reuses_topology() {
    let (router, broker) = router("isolated").await;
    router
        .enable_tenant(
            &TenantId::new("acct1").unwrap(),
            &parse_events(["MESSAGES_UPSERT"]).unwrap(),
        )
        .await
        .unwrap();
    let before = broker.snapshot().await;

    router
        .dispatch(occurrence("acct1", "messages.upsert", json!({"text": "hi"})))
        .await
        .unwrap();

    let after = broker.snapshot().await;
    assert_eq!(before.bindings, after.bindings);
    assert_eq!(after.queues["acct1.messages.upsert"], 1);
}

#[tokio::test]
async fn api_key_is_forwarded_when_present() {
    let (router, broker) = router("single").await;
    let mut occ = occurrence("t", "call", Value::Null);
    occ.api_key = Some("tenant-key".into());
    router.dispatch(occ).await.unwrap();

    let raw: Value = serde_json::from_slice(&broker.messages("evolution").await[0]).unwrap();
    assert_eq!(raw["apikey"], "tenant-key");
    assert!(raw["date_time"].is_string());
}

#[tokio::test]
async fn failed_publish_does_not_poison_other_calls() {
    let (router, broker) = router("single").await;
    broker.set_fail_publish(true);
    let err = router
        .dispatch(occurrence("a", "call", Value::Null))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::Publish(_)));

    broker.set_fail_publish(false);
    router
        .dispatch(occurrence("b", "call", Value::Null))
        .await
        .unwrap();
    assert_eq!(broker.messages("evolution").await.len(), 1);
}

#[tokio::test]
async fn isolated_tenants_do_not_see_each_other() {
    let (router, broker) = router("isolated").await;
    router.dispatch(occurrence("a", "call", Value::Null)).await.unwrap();
    router.dispatch(occurrence("b", "call", Value::Null)).await.unwrap();

    assert_eq!(broker.messages("a.call").await.len(), 1);
    assert_eq!(broker.messages("b.call").await.len(), 1);
    let published = broker.published().await;
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].exchange, "a");
    assert_eq!(published[1].exchange, "b");
}
