//! Background processing of lifecycle events
//!
//! [`CoverSyncWorker::run`] pulls [`LifecycleEvent`]s from a bounded queue and
//! hands them to the [`MediaCoverService`]. Events for different entities run
//! concurrently up to `max_concurrent_events`; events for the same entity are
//! processed one after another, in submission order, since they write to the
//! same cache directory.
//!
//! On shutdown the worker stops receiving, then processes every event that
//! was already accepted by [`CoverSyncHandle::submit`] before returning.
//!
//! # Example
//!
//! ```no_run
//! use media_cover_sync::{Config, MediaCoverService, SecondaryEntityProvider};
//! use media_cover_sync::worker::CoverSyncWorker;
//! use std::sync::Arc;
//!
//! # async fn example(albums: Arc<dyn SecondaryEntityProvider>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let service = Arc::new(MediaCoverService::new(&config, albums)?);
//!
//! let (handle, worker) = CoverSyncWorker::new(service, &config.worker);
//! let task = tokio::spawn(worker.run());
//!
//! // ... handle.submit(event).await? from the metadata layer ...
//!
//! handle.shutdown();
//! task.await?;
//! # Ok(())
//! # }
//! ```

use crate::config::WorkerConfig;
use crate::error::{Error, Result};
use crate::service::MediaCoverService;
use crate::types::{EntityId, LifecycleEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot::error::TryRecvError;
use tokio::sync::{Semaphore, mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Cloneable sender side of a [`CoverSyncWorker`]
#[derive(Clone)]
pub struct CoverSyncHandle {
    tx: mpsc::Sender<LifecycleEvent>,
    cancel: CancellationToken,
}

impl CoverSyncHandle {
    /// Queue an event, waiting for room if the queue is full
    pub async fn submit(&self, event: LifecycleEvent) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::ChannelClosed);
        }
        self.tx.send(event).await.map_err(|_| Error::ChannelClosed)
    }

    /// Stop accepting events; queued and in-flight events still finish
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Processes queued lifecycle events against a [`MediaCoverService`]
pub struct CoverSyncWorker {
    service: Arc<MediaCoverService>,
    rx: mpsc::Receiver<LifecycleEvent>,
    concurrency: Arc<Semaphore>,
    // Completion signal of the most recently spawned event per entity
    last_spawned: HashMap<EntityId, oneshot::Receiver<()>>,
    cancel: CancellationToken,
}

impl CoverSyncWorker {
    /// Create a worker and the handle used to feed it
    pub fn new(service: Arc<MediaCoverService>, config: &WorkerConfig) -> (CoverSyncHandle, Self) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let cancel = CancellationToken::new();

        let handle = CoverSyncHandle {
            tx,
            cancel: cancel.clone(),
        };
        let worker = Self {
            service,
            rx,
            concurrency: Arc::new(Semaphore::new(config.max_concurrent_events.max(1))),
            last_spawned: HashMap::new(),
            cancel,
        };

        (handle, worker)
    }

    /// Run until shut down or until every handle is dropped and the queue drained
    ///
    /// Returns once all queued and in-flight events have finished.
    pub async fn run(mut self) {
        info!("cover sync worker started");
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(event) => self.spawn_event(&mut tasks, event),
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "cover sync task panicked");
                    }
                }
            }
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Some(event) = self.rx.recv().await {
            self.spawn_event(&mut tasks, event);
            drained += 1;
        }
        if drained > 0 {
            info!(events = drained, "processing queued cover events before stopping");
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "cover sync task panicked");
            }
        }

        info!("cover sync worker stopped");
    }

    fn spawn_event(&mut self, tasks: &mut JoinSet<()>, event: LifecycleEvent) {
        let service = self.service.clone();
        let concurrency = self.concurrency.clone();
        let entity_id = event.entity().id;

        // Finished entities no longer need tracking
        self.last_spawned
            .retain(|_, done| matches!(done.try_recv(), Err(TryRecvError::Empty)));

        let (done_tx, done_rx) = oneshot::channel();
        let previous = self.last_spawned.insert(entity_id, done_rx);

        tasks.spawn(async move {
            // Wait for the previous event of this entity without holding a permit.
            // A dropped sender (panicked task) also releases the wait.
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            let Ok(_permit) = concurrency.acquire_owned().await else {
                return;
            };

            debug!(entity_id = %entity_id, "processing cover event");
            if let Err(e) = service.handle(&event).await {
                error!(entity_id = %entity_id, error = %e, "cover event failed");
            }
            let _ = done_tx.send(());
        });
    }
}
