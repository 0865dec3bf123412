//! Asynchronous audit dispatch.

use crate::error::{AuditError, DispatchError};
use crate::sink::{AuditRecord, AuditSink};
use bulwark_audit_serialize::{AuditSerializer, Serialized};
use bulwark_audit_types::{AuditCause, AuditChannel, AuditEvent, AuditableData, MessageSeverity};
use bulwark_common_config::DispatcherConfig;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

enum Payload {
    Data(AuditableData),
    /// Already rendered; written as-is.
    Text(String),
}

struct Submission {
    event: AuditEvent,
    payload: Payload,
    severity: MessageSeverity,
    cause: Option<AuditCause>,
}

enum Job {
    Record(Submission),
    /// Acknowledged once every earlier job on the shard is written.
    Flush(oneshot::Sender<()>),
}

/// Renders and writes audit records off the caller's path.
///
/// Each worker owns a bounded queue. A submission whose event carries a
/// correlation id goes to the queue picked by that id, so correlated records
/// are written in submission order even when Tokio moves the submitting task
/// between threads. Other submissions go to the queue picked by the
/// submitting thread. Nothing else is ordered.
pub struct AuditDispatcher {
    shards: Vec<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    dropped: Arc<AtomicU64>,
}

impl AuditDispatcher {
    /// Start the workers on the current Tokio runtime.
    pub fn spawn(
        config: &DispatcherConfig,
        serializer: AuditSerializer,
        sink: Arc<dyn AuditSink>,
    ) -> Result<Self, AuditError> {
        let handle = Handle::try_current()?;
        let worker_count = config.workers.max(1);
        let capacity = config.queue_capacity.max(1);

        let mut shards = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);
        for shard in 0..worker_count {
            let (sender, receiver) = mpsc::channel(capacity);
            shards.push(sender);
            workers.push(handle.spawn(run_worker(shard, receiver, serializer.clone(), Arc::clone(&sink))));
        }

        debug!(workers = worker_count, capacity, "Audit dispatcher started");
        Ok(Self {
            shards,
            workers,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Queue auditable data without waiting.
    ///
    /// When the queue is full the record is dropped and counted.
    pub fn submit(
        &self,
        event: AuditEvent,
        data: AuditableData,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) {
        self.enqueue(Submission {
            event,
            payload: Payload::Data(data),
            severity,
            cause,
        });
    }

    /// Queue pre-rendered text without waiting.
    pub fn submit_message(
        &self,
        event: AuditEvent,
        text: String,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) {
        self.enqueue(Submission {
            event,
            payload: Payload::Text(text),
            severity,
            cause,
        });
    }

    /// Queue auditable data without waiting, reporting why it was refused.
    ///
    /// Unlike [`submit`](Self::submit), a refused record is neither logged
    /// nor counted.
    pub fn try_submit(
        &self,
        event: AuditEvent,
        data: AuditableData,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) -> Result<(), DispatchError> {
        let shard = self.shard(&event);
        let job = Job::Record(Submission {
            event,
            payload: Payload::Data(data),
            severity,
            cause,
        });
        shard.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DispatchError::Full,
            mpsc::error::TrySendError::Closed(_) => DispatchError::Closed,
        })
    }

    /// Queue auditable data, waiting for room in the queue.
    pub async fn submit_async(
        &self,
        event: AuditEvent,
        data: AuditableData,
        severity: MessageSeverity,
        cause: Option<AuditCause>,
    ) {
        let shard = self.shard(&event);
        let job = Job::Record(Submission {
            event,
            payload: Payload::Data(data),
            severity,
            cause,
        });
        if let Err(e) = shard.send(job).await {
            error!("Failed to queue audit record: {}", e);
        }
    }

    /// Wait until everything submitted before this call has been written.
    pub async fn flush(&self) {
        let mut acks = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            let (ack, done) = oneshot::channel();
            if shard.send(Job::Flush(ack)).await.is_ok() {
                acks.push(done);
            }
        }
        for done in acks {
            let _ = done.await;
        }
    }

    /// Stop accepting records, drain the queues and wait for the workers.
    pub async fn shutdown(self) {
        let Self { shards, workers, .. } = self;
        drop(shards);
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Audit worker failed: {}", e);
            }
        }
        debug!("Audit dispatcher stopped");
    }

    /// All worker queues are open.
    pub fn is_healthy(&self) -> bool {
        self.shards.iter().all(|shard| !shard.is_closed())
    }

    /// Records dropped because a queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Approximate fill level across all queues, from 0.0 to 1.0.
    pub fn queue_usage(&self) -> f64 {
        let max: usize = self.shards.iter().map(|s| s.max_capacity()).sum();
        let free: usize = self.shards.iter().map(|s| s.capacity()).sum();
        1.0 - (free as f64 / max as f64)
    }

    fn enqueue(&self, submission: Submission) {
        match self.shard(&submission.event).try_send(Job::Record(submission)) {
            Ok(()) => debug!("Audit record queued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(dropped, "Audit queue full, record dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!("Audit dispatcher is shut down, record dropped");
            }
        }
    }

    fn shard(&self, event: &AuditEvent) -> &mpsc::Sender<Job> {
        &self.shards[self.shard_index(event)]
    }

    fn shard_index(&self, event: &AuditEvent) -> usize {
        let mut hasher = DefaultHasher::new();
        match event.correlation_id() {
            Some(id) => id.hash(&mut hasher),
            None => std::thread::current().id().hash(&mut hasher),
        }
        (hasher.finish() % self.shards.len() as u64) as usize
    }
}

async fn run_worker(
    shard: usize,
    mut receiver: mpsc::Receiver<Job>,
    serializer: AuditSerializer,
    sink: Arc<dyn AuditSink>,
) {
    while let Some(job) = receiver.recv().await {
        match job {
            Job::Record(submission) => {
                let serializer = serializer.clone();
                let sink = Arc::clone(&sink);
                let task = tokio::task::spawn_blocking(move || process(&serializer, sink.as_ref(), submission));
                if let Err(e) = task.await {
                    error!(shard, "Audit record task failed: {}", e);
                }
            }
            Job::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
    debug!(shard, "Audit worker stopped");
}

fn process(serializer: &AuditSerializer, sink: &dyn AuditSink, submission: Submission) {
    let Submission {
        event,
        payload,
        severity,
        cause,
    } = submission;

    let details = match payload {
        Payload::Data(data) => {
            let Serialized { text, failures, .. } = serializer.serialize(data);
            for failure in failures {
                let message = failure.message();
                let record = AuditRecord::diagnostic(event.clone(), message, AuditCause::new(failure.error));
                write(sink, &record);
            }
            text
        }
        Payload::Text(text) => text,
    };

    let record = AuditRecord::payload(AuditChannel::for_severity(severity), event, details, cause);
    write(sink, &record);
}

/// A failed write loses only this record.
fn write(sink: &dyn AuditSink, record: &AuditRecord) {
    if let Err(e) = sink.write(record) {
        error!(
            event = %record.event.event(),
            channel = %record.channel,
            error = %e,
            "Failed to write audit record"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SinkError;
    use crate::sink::MemorySink;
    use bulwark_audit_types::{AuditEvents, ResponseAuditData};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct FlakySink {
        calls: AtomicUsize,
        inner: MemorySink,
    }

    impl AuditSink for FlakySink {
        fn write(&self, record: &AuditRecord) -> Result<(), SinkError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(SinkError::Unavailable("first write fails".to_string()));
            }
            self.inner.write(record)
        }
    }

    fn config(workers: usize, queue_capacity: usize) -> DispatcherConfig {
        DispatcherConfig {
            workers,
            queue_capacity,
        }
    }

    fn response(text: &str) -> AuditableData {
        ResponseAuditData::new().with_response(text).into()
    }

    fn event() -> AuditEvent {
        AuditEvent::new(AuditEvents::ApiRestResponse, "respond", "DispatcherTest")
    }

    #[test]
    fn test_spawn_requires_runtime() {
        let sink = Arc::new(MemorySink::new());
        let result = AuditDispatcher::spawn(&config(1, 1), AuditSerializer::default(), sink);
        assert!(matches!(result, Err(AuditError::NoRuntime(_))));
    }

    #[tokio::test]
    async fn test_sequential_submissions_keep_order() {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = AuditDispatcher::spawn(&config(4, 64), AuditSerializer::default(), sink.clone()).unwrap();

        for i in 0..20 {
            dispatcher.submit(event(), response(&i.to_string()), MessageSeverity::Info, None);
        }
        dispatcher.flush().await;

        let details: Vec<_> = sink.records().into_iter().map(|r| r.details).collect();
        let expected: Vec<_> = (0..20).map(|i| format!(r#"{{"response":"{}"}}"#, i)).collect();
        assert_eq!(details, expected);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_correlated_events_share_a_queue_across_threads() {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = Arc::new(AuditDispatcher::spawn(&config(8, 8), AuditSerializer::default(), sink).unwrap());

        let index_on_new_thread = |id: &'static str| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || dispatcher.shard_index(&event().with_correlation_id(id)))
                .join()
                .unwrap()
        };

        let here = dispatcher.shard_index(&event().with_correlation_id("req-1"));
        for _ in 0..8 {
            assert_eq!(index_on_new_thread("req-1"), here);
        }
    }

    #[tokio::test]
    async fn test_failed_write_loses_only_that_record() {
        let sink = Arc::new(FlakySink {
            calls: AtomicUsize::new(0),
            inner: MemorySink::new(),
        });
        let dispatcher = AuditDispatcher::spawn(&config(1, 8), AuditSerializer::default(), sink.clone()).unwrap();

        dispatcher.submit(event(), response("first"), MessageSeverity::Info, None);
        dispatcher.submit(event(), response("second"), MessageSeverity::Info, None);
        dispatcher.flush().await;

        let records = sink.inner.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].details, r#"{"response":"second"}"#);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_message_bypasses_serializer() {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = AuditDispatcher::spawn(&config(1, 8), AuditSerializer::default(), sink.clone()).unwrap();

        dispatcher.submit_message(event(), "<xml/>".to_string(), MessageSeverity::Warn, None);
        let records = tokio::time::timeout(Duration::from_secs(5), sink.wait_for(1)).await.unwrap();
        assert_eq!(records[0].details, "<xml/>");
        assert_eq!(records[0].channel, AuditChannel::Warn);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue_and_closes() {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = AuditDispatcher::spawn(&config(2, 32), AuditSerializer::default(), sink.clone()).unwrap();
        assert!(dispatcher.is_healthy());

        for i in 0..10 {
            dispatcher.submit(event(), response(&i.to_string()), MessageSeverity::Info, None);
        }
        dispatcher.shutdown().await;
        assert_eq!(sink.len(), 10);
    }

    #[tokio::test]
    async fn test_try_submit_reports_full_queue() {
        let sink = Arc::new(MemorySink::new());
        let dispatcher = AuditDispatcher::spawn(&config(1, 1), AuditSerializer::default(), sink.clone()).unwrap();

        // The current-thread runtime does not run the worker until we yield,
        // so the second record finds the queue full.
        assert_eq!(
            dispatcher.try_submit(event(), response("a"), MessageSeverity::Info, None),
            Ok(())
        );
        assert_eq!(
            dispatcher.try_submit(event(), response("b"), MessageSeverity::Info, None),
            Err(DispatchError::Full)
        );
        assert_eq!(dispatcher.dropped(), 0);
        assert!(dispatcher.queue_usage() > 0.99);

        dispatcher.submit(event(), response("c"), MessageSeverity::Info, None);
        assert_eq!(dispatcher.dropped(), 1);

        dispatcher.submit_async(event(), response("d"), MessageSeverity::Info, None).await;
        dispatcher.shutdown().await;

        let details: Vec<_> = sink.records().into_iter().map(|r| r.details).collect();
        assert_eq!(details, vec![r#"{"response":"a"}"#, r#"{"response":"d"}"#]);
    }
}
