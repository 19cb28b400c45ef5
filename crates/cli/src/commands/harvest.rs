// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ovr harvest` - batch harvest-and-store flow

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use ovr_engine::{AuthManager, BatchScheduler, HarvestRunner};
use ovr_storage::FileStore;

use crate::config::{self, Config};

#[derive(Debug, Args)]
pub struct HarvestArgs {
    /// Execute a single batch then exit (default: run continuously)
    #[arg(long)]
    pub run_once: bool,
}

pub async fn run(config: &Config, args: &HarvestArgs) -> anyhow::Result<u8> {
    let providers = config::build_providers(config)?;
    anyhow::ensure!(!providers.is_empty(), "no enabled sources configured");

    let auth = Arc::new(
        AuthManager::new(providers, config.token_ttl())
            .with_max_workers(config.auth.max_workers),
    );
    let store = FileStore::new(&config.data_dir);
    let runner = HarvestRunner::new(
        auth,
        store,
        config.feed.selectors.clone(),
        config.sport.clone(),
    );
    let mut scheduler = BatchScheduler::new(runner, config.batch_interval());

    if args.run_once {
        let stats = scheduler.run_once().await.context("batch failed")?;
        return Ok(u8::from(stats.sources_failed != 0));
    }

    scheduler.run_forever().await?;
    Ok(0)
}
