// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ovr watch` - live poll-and-compare flow
//!
//! Wires the whole live pipeline: FX rates, concurrent authentication,
//! the background-dispatch bus, the comparison listener and one poll feed
//! per authenticated source, then blocks until an interrupt or
//! termination signal and tears everything down in reverse.

use std::sync::Arc;

use clap::Args;
use ovr_bus::EventBus;
use ovr_core::{topic, Event};
use ovr_engine::{
    log_comparisons, AuthManager, ExchangeRates, FeedManager, FrankfurterSource, ListenerConfig,
    OddsListener,
};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

use crate::config::{self, Config};

#[derive(Debug, Args)]
pub struct WatchArgs {}

pub async fn run(config: &Config, _args: &WatchArgs) -> anyhow::Result<u8> {
    info!("loading exchange rates");
    let rates = Arc::new(ExchangeRates::new(Box::new(FrankfurterSource::new())));
    if let Err(e) = rates.ensure_fresh().await {
        warn!(error = %e, "exchange rates unavailable, only USD sources will compare");
    }

    let providers = config::build_providers(config)?;
    anyhow::ensure!(!providers.is_empty(), "no enabled sources configured");

    let auth = Arc::new(
        AuthManager::new(providers, config.token_ttl())
            .with_max_workers(config.auth.max_workers),
    );
    auth.authenticate_all(false).await;

    let ready = auth.authenticated_clients();
    if ready.len() < config.compare.min_sources {
        error!(
            authenticated = ready.len(),
            required = config.compare.min_sources,
            "not enough sources authenticated"
        );
        return Ok(1);
    }

    let bus = Arc::new(EventBus::background());

    // Log every feed control event.
    bus.subscribe(topic::FEED_ALL, |event: &Event| {
        info!(topic = %event.topic, "feed event");
        Ok(())
    });

    let mut listener = OddsListener::new(
        Arc::clone(&bus),
        Arc::clone(&rates),
        ListenerConfig {
            max_denominator: config.compare.max_denominator,
            fraction_tolerance: config.compare.fraction_tolerance,
            min_sources: config.compare.min_sources,
        },
        Arc::new(log_comparisons),
    );
    listener.start();

    let mut feeds = FeedManager::new(
        ready,
        Arc::clone(&auth),
        Arc::clone(&bus),
        config.feed.selectors.clone(),
        &config.currencies(),
        config.poll_interval(),
    );
    feeds.start_all();

    info!(
        interval_s = config.feed.poll_interval_secs,
        "watching, press ctrl-c to stop"
    );
    wait_for_shutdown().await?;

    feeds.stop_all().await;
    listener.stop();
    bus.shutdown();
    Ok(0)
}

async fn wait_for_shutdown() -> anyhow::Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = interrupt.recv() => info!("interrupt received, shutting down"),
        _ = terminate.recv() => info!("termination received, shutting down"),
    }
    Ok(())
}
