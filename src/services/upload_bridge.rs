//! Upload completion → run dispatch.
//!
//! The bridge is the only automatic dispatch trigger. It subscribes to
//! `upload_completed` events alone and ignores uploads that do not belong to
//! an import job.
//!
//! The event bus drops events for a subscriber that falls behind. Whenever
//! the bridge lags, and once when [`UploadCompletionBridge::run`] starts, it
//! sweeps the store for `Created` jobs with an uploaded file and dispatches
//! them, so a dropped notification never strands a job.

use super::dispatch::RunDispatcher;
use crate::models::{ImportEvent, UploadPayload};
use crate::observability::{EventBus, FilteredReceiver};
use crate::Result;
use tokio::sync::broadcast;

/// Event type the bridge subscribes to.
pub const UPLOAD_COMPLETED: &str = "upload_completed";

/// Dispatches import jobs once their file upload has completed.
#[derive(Clone)]
pub struct UploadCompletionBridge {
    dispatcher: RunDispatcher,
}

impl UploadCompletionBridge {
    /// Creates a bridge dispatching through `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: RunDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Handles one completed upload.
    ///
    /// Returns whether a dispatch happened: only import jobs with an assigned
    /// id are dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if the dispatch fails.
    pub fn on_upload_completed(&self, payload: &UploadPayload) -> Result<bool> {
        match payload {
            UploadPayload::Import(job) if !job.id.is_nil() => {
                self.dispatcher.dispatch(job.id, "upload")?;
                Ok(true)
            },
            UploadPayload::Import(_) => {
                tracing::debug!("Ignoring upload of an unsaved import job");
                Ok(false)
            },
            UploadPayload::Other { kind } => {
                tracing::trace!(kind = %kind, "Ignoring non-import upload");
                Ok(false)
            },
        }
    }

    /// Subscribes to the upload stream of `event_bus`.
    ///
    /// Subscribe before spawning [`run`](Self::run) work that publishes, so no
    /// upload is missed.
    #[must_use]
    pub fn subscribe(
        event_bus: &EventBus,
    ) -> FilteredReceiver<impl Fn(&ImportEvent) -> bool + use<>> {
        event_bus.subscribe_event_type(UPLOAD_COMPLETED)
    }

    /// Runs the bridge until the event bus closes.
    ///
    /// Store and channel calls block, so each one runs on the blocking pool.
    pub async fn run<F>(&self, mut receiver: FilteredReceiver<F>)
    where
        F: Fn(&ImportEvent) -> bool,
    {
        self.recover_blocking().await;
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let bridge = self.clone();
                    if let Err(e) =
                        tokio::task::spawn_blocking(move || bridge.handle_event(&event)).await
                    {
                        tracing::error!(error = %e, "Upload handler task failed");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(_)) => self.recover_blocking().await,
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, upload bridge shutting down");
                    break;
                },
            }
        }
    }

    /// Handles every upload already buffered in `receiver`, without waiting.
    ///
    /// Returns the number of dispatches, including those of the recovery
    /// sweep that follows a lag. Used where no background task runs, such as
    /// one-shot CLI commands.
    pub fn process_pending<F>(&self, receiver: &mut FilteredReceiver<F>) -> usize
    where
        F: Fn(&ImportEvent) -> bool,
    {
        let mut dispatched = 0;
        let mut lagged = false;
        loop {
            match receiver.try_recv() {
                Ok(ImportEvent::UploadCompleted { payload, .. }) => {
                    match self.on_upload_completed(&payload) {
                        Ok(true) => dispatched += 1,
                        Ok(false) => {},
                        Err(e) => tracing::error!(error = %e, "Failed to dispatch uploaded import"),
                    }
                },
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(_)) => lagged = true,
                Err(_) => break,
            }
        }
        if lagged {
            dispatched += self.recover();
        }
        dispatched
    }

    fn handle_event(&self, event: &ImportEvent) {
        if let ImportEvent::UploadCompleted { payload, .. } = event {
            if let Err(e) = self.on_upload_completed(payload) {
                metrics::counter!("import_dispatch_failures_total").increment(1);
                tracing::error!(error = %e, "Failed to dispatch uploaded import");
            }
        }
    }

    fn recover(&self) -> usize {
        match self.dispatcher.redispatch_created() {
            Ok(dispatched) => dispatched,
            Err(e) => {
                tracing::error!(error = %e, "Failed to sweep pending imports");
                0
            },
        }
    }

    async fn recover_blocking(&self) {
        let bridge = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || bridge.recover()).await {
            tracing::error!(error = %e, "Recovery sweep task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventMeta, ImportJob, ImportJobId, ImportStatus, RunRequested};
    use crate::services::dispatch::MpscRunChannel;
    use crate::storage::{ImportJobStore, InMemoryJobStore};
    use std::collections::HashSet;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn setup() -> (
        Arc<InMemoryJobStore>,
        UploadCompletionBridge,
        EventBus,
        mpsc::UnboundedReceiver<RunRequested>,
    ) {
        setup_with_capacity(16)
    }

    fn setup_with_capacity(
        capacity: usize,
    ) -> (
        Arc<InMemoryJobStore>,
        UploadCompletionBridge,
        EventBus,
        mpsc::UnboundedReceiver<RunRequested>,
    ) {
        let store = Arc::new(InMemoryJobStore::new());
        let bus = EventBus::new(capacity);
        let (channel, runs) = MpscRunChannel::new();
        let dispatcher = RunDispatcher::new(store.clone(), Arc::new(channel), bus.clone());
        (store, UploadCompletionBridge::new(dispatcher), bus, runs)
    }

    #[test]
    fn test_non_import_payload_is_ignored() {
        let (_store, bridge, _bus, mut runs) = setup();
        let dispatched = bridge
            .on_upload_completed(&UploadPayload::Other {
                kind: "attachment".into(),
            })
            .expect("handle");
        assert!(!dispatched);
        assert!(runs.try_recv().is_err());
    }

    #[test]
    fn test_unsaved_job_is_ignored() {
        let (_store, bridge, _bus, mut runs) = setup();
        let mut job = ImportJob::new("acme", "spreadsheet", "contact");
        job.id = ImportJobId::from_uuid(uuid::Uuid::nil());

        assert!(!bridge.on_upload_completed(&UploadPayload::Import(job)).expect("handle"));
        assert!(runs.try_recv().is_err());
    }

    #[test]
    fn test_process_pending_dispatches_imports() {
        let (store, bridge, bus, mut runs) = setup();
        let mut receiver = UploadCompletionBridge::subscribe(&bus);
        let job = ImportJob::new("acme", "spreadsheet", "contact");
        store.insert(&job).expect("insert");

        bus.publish(ImportEvent::UploadCompleted {
            meta: EventMeta::new("test"),
            payload: UploadPayload::Other {
                kind: "avatar".into(),
            },
        });
        bus.publish(ImportEvent::UploadCompleted {
            meta: EventMeta::new("test"),
            payload: UploadPayload::Import(job.clone()),
        });

        assert_eq!(bridge.process_pending(&mut receiver), 1);
        assert_eq!(runs.try_recv().expect("run").job_id, job.id);
        assert_eq!(
            store.get_required(job.id).expect("get").status,
            ImportStatus::Queued
        );
    }

    fn uploaded_job(store: &InMemoryJobStore) -> ImportJob {
        let mut job = ImportJob::new("acme", "spreadsheet", "contact");
        job.file_path = Some(format!("{}.csv", job.id));
        store.insert(&job).expect("insert");
        job
    }

    #[test]
    fn test_lagged_uploads_are_recovered() {
        let (store, bridge, bus, mut runs) = setup_with_capacity(2);
        let mut receiver = UploadCompletionBridge::subscribe(&bus);
        let jobs: Vec<ImportJob> = (0..4).map(|_| uploaded_job(&store)).collect();
        for job in &jobs {
            bus.publish(ImportEvent::UploadCompleted {
                meta: EventMeta::new("test"),
                payload: UploadPayload::Import(job.clone()),
            });
        }

        assert_eq!(bridge.process_pending(&mut receiver), jobs.len());

        let mut announced = HashSet::new();
        while let Ok(request) = runs.try_recv() {
            announced.insert(request.job_id);
        }
        assert_eq!(
            announced,
            jobs.iter().map(|job| job.id).collect::<HashSet<_>>()
        );
        for job in &jobs {
            assert_eq!(
                store.get_required(job.id).expect("get").status,
                ImportStatus::Queued
            );
        }
    }

    #[tokio::test]
    async fn test_run_loop_recovers_stranded_job_on_start() {
        let (store, bridge, bus, mut runs) = setup();
        let receiver = UploadCompletionBridge::subscribe(&bus);
        let job = uploaded_job(&store);

        let task = tokio::spawn(async move { bridge.run(receiver).await });

        let request = runs.recv().await.expect("run request");
        assert_eq!(request.job_id, job.id);
        task.abort();
    }

    #[tokio::test]
    async fn test_run_loop_dispatches_until_closed() {
        let (store, bridge, bus, mut runs) = setup();
        let receiver = UploadCompletionBridge::subscribe(&bus);
        let job = ImportJob::new("acme", "spreadsheet", "contact");
        store.insert(&job).expect("insert");

        let task = tokio::spawn(async move { bridge.run(receiver).await });
        bus.publish(ImportEvent::UploadCompleted {
            meta: EventMeta::new("test"),
            payload: UploadPayload::Import(job.clone()),
        });

        let request = runs.recv().await.expect("run request");
        assert_eq!(request.job_id, job.id);
        task.abort();
    }
}
