//! Command-line harvester: wires the HTTP fetcher, filesystem image store,
//! and JSON-lines sink into a [`Harvester`].

pub mod config;
pub mod http;
pub mod image_store;
pub mod sink;

use anyhow::{Context, Result};
use std::sync::Arc;

use nobel_laureates::{HarvestOptions, HarvestSummary, Harvester};

pub use config::{ConfigOverrides, HarvestConfig, OutputTarget};
pub use http::HttpFetcher;
pub use image_store::FsImageStore;
pub use sink::JsonlSink;

/// Build a harvester with the production collaborators for `config`.
pub async fn build_harvester(config: &HarvestConfig) -> Result<Harvester> {
    let fetcher = HttpFetcher::new(config.timeout_ms, &config.user_agent)
        .context("failed to create HTTP client")?;
    let sink = JsonlSink::for_target(&config.output)
        .await
        .with_context(|| format!("failed to open output {:?}", config.output))?;
    let images = FsImageStore::new(&config.images_dir);

    Ok(Harvester::new(
        Arc::new(fetcher),
        Arc::new(images),
        Arc::new(sink),
        HarvestOptions {
            concurrency: config.concurrency,
            resolve_images: config.resolve_images,
        },
    ))
}

/// Run one harvest to completion with the production collaborators.
pub async fn crawl(config: &HarvestConfig) -> Result<HarvestSummary> {
    let harvester = build_harvester(config).await?;
    Ok(harvester.run(&config.start_url).await?)
}
