//! Entity pipeline controller.
//!
//! Each laureate moves `Seeded → BioFetched → [StructuredDataFetched →]
//! Complete`. The controller is a pure transition function over
//! [`WorkItem`]s: a work item is the next URL to fetch plus the continuation
//! (the entity's record and state), owned exclusively by that request. The
//! async [`Harvester`] drives many entities concurrently by fetching work
//! items and feeding responses back through [`advance`].

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, info, warn};
use url::Url;

use crate::extract::{extract_biography, extract_listing, extract_wikidata};
use crate::images::attach_image;
use crate::progress::{ProgressEventKind, ProgressReporter, ProgressSender, StageKind};
use crate::traits::{FetchedPage, Fetcher, ImageStore, RecordSink};
use crate::types::{HarvestError, HarvestResult, LaureateRecord};

/// Where an entity is in its fetch chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    /// Seed fields only; the biography fetch is pending.
    Seeded,
    /// Biography merged; the structured-data fetch is pending.
    BioFetched,
    /// Structured data merged.
    StructuredDataFetched,
    /// No further fetch is scheduled.
    Complete,
}

impl EntityState {
    /// The fetch this state is waiting on, if any.
    pub fn pending_stage(self) -> Option<StageKind> {
        match self {
            Self::Seeded => Some(StageKind::Biography),
            Self::BioFetched => Some(StageKind::StructuredData),
            Self::StructuredDataFetched | Self::Complete => None,
        }
    }
}

/// The state carried alongside a scheduled fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Continuation {
    record: LaureateRecord,
    state: EntityState,
}

impl Continuation {
    pub fn record(&self) -> &LaureateRecord {
        &self.record
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    fn enter(&mut self, state: EntityState) {
        debug!("{}: {:?} -> {state:?}", self.record.link(), self.state);
        self.state = state;
    }

    fn schedule(self, url: Url) -> Transition {
        Transition::Fetch(WorkItem {
            url,
            continuation: self,
        })
    }

    fn finish(mut self) -> Transition {
        let from = self.state;
        self.enter(EntityState::Complete);
        Transition::Complete(CompletedRecord {
            record: self.record,
            from,
        })
    }
}

/// A fetch to perform, and the continuation its response belongs to.
///
/// Work items are only created by [`WorkItem::seed`] and [`advance`], so the
/// continuation is always `Seeded` or `BioFetched`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    url: Url,
    continuation: Continuation,
}

impl WorkItem {
    /// Schedule the biography fetch for a freshly seeded record.
    pub fn seed(record: LaureateRecord) -> Self {
        Self {
            url: record.link().clone(),
            continuation: Continuation {
                record,
                state: EntityState::Seeded,
            },
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The stage the pending fetch feeds.
    pub fn stage(&self) -> StageKind {
        match self.continuation.state.pending_stage() {
            Some(stage) => stage,
            None => unreachable!("work item in terminal state {:?}", self.continuation.state),
        }
    }

    pub fn continuation(&self) -> &Continuation {
        &self.continuation
    }
}

/// A record whose chain has finished. Only [`advance`] produces one, so
/// nothing short of `Complete` can reach the image step or the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRecord {
    record: LaureateRecord,
    from: EntityState,
}

impl CompletedRecord {
    pub fn record(&self) -> &LaureateRecord {
        &self.record
    }

    pub fn state(&self) -> EntityState {
        EntityState::Complete
    }

    /// The state the entity was in when it completed: `BioFetched` when the
    /// biography had no structured-data link, else `StructuredDataFetched`.
    pub fn completed_from(&self) -> EntityState {
        self.from
    }

    pub fn into_record(self) -> LaureateRecord {
        self.record
    }
}

/// Outcome of feeding a response to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Another fetch is needed for this entity.
    Fetch(WorkItem),
    /// The entity is terminal.
    Complete(CompletedRecord),
}

/// Apply the response for `item` and decide the entity's next step.
///
/// Links in the page resolve against `page.final_url`.
pub fn advance(item: WorkItem, page: &FetchedPage) -> Transition {
    let mut continuation = item.continuation;

    match continuation.state {
        EntityState::Seeded => {
            let next = extract_biography(&page.body, &page.final_url)
                .apply(&mut continuation.record);
            continuation.enter(EntityState::BioFetched);
            match next {
                Some(url) => continuation.schedule(url),
                None => continuation.finish(),
            }
        }
        EntityState::BioFetched => {
            extract_wikidata(&page.body).apply(&mut continuation.record);
            continuation.enter(EntityState::StructuredDataFetched);
            continuation.finish()
        }
        EntityState::StructuredDataFetched | EntityState::Complete => {
            unreachable!("work item in terminal state {:?}", continuation.state)
        }
    }
}

/// Tunables for a harvest run.
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    /// Maximum number of entity pipelines in flight.
    pub concurrency: usize,
    /// Fetch and store portraits before emitting.
    pub resolve_images: bool,
}

impl Default for HarvestOptions {
    fn default() -> Self {
        Self {
            concurrency: 8,
            resolve_images: true,
        }
    }
}

/// Counters for a finished harvest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub seeded: u32,
    pub emitted: u32,
    pub halted: u32,
    pub images_stored: u32,
    pub sink_errors: u32,
}

/// How one entity's pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityOutcome {
    Emitted { image_stored: bool },
    Halted,
    SinkFailed,
}

/// Drives entity pipelines against the collaborators.
pub struct Harvester {
    fetcher: Arc<dyn Fetcher>,
    images: Arc<dyn ImageStore>,
    sink: Arc<dyn RecordSink>,
    options: HarvestOptions,
    shutdown: Arc<Notify>,
    progress: ProgressReporter,
}

impl Harvester {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        images: Arc<dyn ImageStore>,
        sink: Arc<dyn RecordSink>,
        options: HarvestOptions,
    ) -> Self {
        Self {
            fetcher,
            images,
            sink,
            options,
            shutdown: Arc::new(Notify::new()),
            progress: ProgressReporter::default(),
        }
    }

    /// Report progress events on `tx`.
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.progress = ProgressReporter::new(Some(tx));
        self
    }

    /// Handle for cancelling a running harvest with `notify_one()`. Entities
    /// still in flight are abandoned and never emitted.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Fetch the index page, seed every entry, and run all entity pipelines.
    ///
    /// Only a failure to fetch the index page, or cancellation, is an error.
    pub async fn run(&self, start_url: &Url) -> HarvestResult<HarvestSummary> {
        tokio::select! {
            _ = self.shutdown.notified() => {
                info!("harvest cancelled");
                Err(HarvestError::Cancelled)
            }
            result = self.run_to_completion(start_url) => result,
        }
    }

    async fn run_to_completion(&self, start_url: &Url) -> HarvestResult<HarvestSummary> {
        let start = Instant::now();
        let listing = self.fetcher.fetch(start_url).await?;
        let seeds = extract_listing(&listing.body, &listing.final_url);
        info!("listing parsed: {} laureate entries from {start_url}", seeds.len());
        self.progress.emit(ProgressEventKind::ListingParsed {
            url: start_url.to_string(),
            seeds: seeds.len() as u32,
        });

        let mut summary = HarvestSummary {
            seeded: seeds.len() as u32,
            ..Default::default()
        };

        let mut outcomes = stream::iter(seeds)
            .map(|seed| self.run_entity(seed))
            .buffer_unordered(self.options.concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                EntityOutcome::Emitted { image_stored } => {
                    summary.emitted += 1;
                    if image_stored {
                        summary.images_stored += 1;
                    }
                }
                EntityOutcome::Halted => summary.halted += 1,
                EntityOutcome::SinkFailed => summary.sink_errors += 1,
            }
        }

        info!(
            "harvest complete: {} seeded, {} emitted, {} halted, {} images in {:.1}s",
            summary.seeded,
            summary.emitted,
            summary.halted,
            summary.images_stored,
            start.elapsed().as_secs_f64()
        );
        self.progress.emit(ProgressEventKind::HarvestComplete {
            seeded: summary.seeded,
            emitted: summary.emitted,
            halted: summary.halted,
            elapsed_ms: start.elapsed().as_millis() as u64,
        });
        Ok(summary)
    }

    /// Run one entity from its seed to the sink.
    pub async fn run_entity(&self, seed: LaureateRecord) -> EntityOutcome {
        let link = seed.link().to_string();
        let mut item = WorkItem::seed(seed);

        let completed = loop {
            let stage = item.stage();
            let page = match self.fetcher.fetch(item.url()).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("{stage} fetch failed for {link}: {e}");
                    self.progress.emit(ProgressEventKind::EntityHalted {
                        link,
                        stage,
                        reason: e.to_string(),
                    });
                    return EntityOutcome::Halted;
                }
            };

            let transition = advance(item, &page);
            debug!("{stage} stage done for {link} (HTTP {})", page.status);
            self.progress.emit(ProgressEventKind::StageCompleted {
                link: link.clone(),
                stage,
            });

            match transition {
                Transition::Fetch(next) => item = next,
                Transition::Complete(done) => break done,
            }
        };

        let mut record = completed.into_record();
        let image_stored = self.options.resolve_images
            && attach_image(&mut record, self.fetcher.as_ref(), self.images.as_ref()).await;
        if let Some(reference) = record.bio_image.as_ref() {
            self.progress.emit(ProgressEventKind::ImageStored {
                link: link.clone(),
                reference: reference.to_string(),
            });
        }

        let name = record.name.clone();
        match self.sink.emit(record).await {
            Ok(()) => {
                self.progress
                    .emit(ProgressEventKind::RecordEmitted { link, name });
                EntityOutcome::Emitted { image_stored }
            }
            Err(e) => {
                warn!("sink rejected {link}: {e}");
                self.progress.emit(ProgressEventKind::Warning {
                    message: format!("sink rejected {link}: {e}"),
                });
                EntityOutcome::SinkFailed
            }
        }
    }
}
