mod cli;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use fanout_router::event::parse_events;
use fanout_router::{EventOccurrence, EventRouter, EventType, MemoryBroker, TenantId};

use crate::cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = config::load(args.config.as_deref(), args.mode.as_deref())
        .context("failed to load configuration")?;
    let configured = config
        .enabled_events()
        .context("invalid [events] table")?;
    let router = EventRouter::new(config).context("failed to build router")?;
    info!(mode = %router.mode(), "router configured");

    match args.command {
        Command::Categories => {
            let table = router.resolver().table();
            let mut out = serde_json::Map::new();
            for category in table.categories() {
                out.insert(category.name.clone(), json!(category.events));
            }
            out.insert(table.catch_all().to_string(), json!("*"));
            print_json(&out)?;
        }
        Command::Resolve { tenant, event } => {
            let tenant = TenantId::new(tenant)?;
            let event = EventType::new(event)?;
            print_json(&router.resolver().resolve(&tenant, &event))?;
        }
        Command::Plan { tenant, events } => {
            let tenant = TenantId::new(tenant)?;
            let events = events_or_configured(&events, &configured)?;
            print_json(&router.resolver().plan(&tenant, &events))?;
        }
        Command::Simulate {
            tenant,
            events,
            publish,
        } => {
            let tenant = TenantId::new(tenant)?;
            let events = events_or_configured(&events, &configured)?;
            let broker = Arc::new(MemoryBroker::new());
            router.attach(broker.clone()).await?;

            router
                .enable_tenant(&tenant, &events)
                .await
                .context("tenant enable failed")?;
            for event in parse_events(&publish)? {
                router
                    .dispatch(EventOccurrence {
                        tenant: tenant.clone(),
                        event,
                        data: json!({}),
                        sender: "fanout-cli".into(),
                        api_key: None,
                    })
                    .await?;
            }
            print_json(&broker.snapshot().await)?;
        }
    }
    Ok(())
}

/// Events given on the command line, or the ones switched on in config.
fn events_or_configured(given: &[String], configured: &[EventType]) -> Result<Vec<EventType>> {
    if given.is_empty() {
        return Ok(configured.to_vec());
    }
    Ok(parse_events(given)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
