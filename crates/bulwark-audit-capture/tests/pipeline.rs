//! End-to-end tests of the audit pipeline through the facade.

use bulwark_audit_capture::{
    AsyncAudit, AuditCause, AuditChannel, AuditError, AuditEvent, AuditEvents, AuditRecord,
    AuditSink, AuditValue, AuditableData, MemorySink, MessageSeverity, RecordKind,
    RequestAuditData, ResponseAuditData, SinkError, WsAuditStage, WsMessageKind,
};
use bulwark_audit_types::{AuditField, AuditObject, ObjectError};
use bulwark_common_config::BulwarkConfig;
use bulwark_common_core::{FaultStatus, MessageKey};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use test_case::test_case;

const WAIT: Duration = Duration::from_secs(5);

fn config(workers: usize, queue_capacity: usize) -> BulwarkConfig {
    let mut config = BulwarkConfig::default();
    config.dispatcher.workers = workers;
    config.dispatcher.queue_capacity = queue_capacity;
    config
}

fn event(event: AuditEvents) -> AuditEvent {
    AuditEvent::new(event, "handle", "PipelineTest")
}

fn io_cause(message: &str) -> AuditCause {
    AuditCause::new(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

/// Blocks every write until the test lets it through.
struct GatedSink {
    gate: Mutex<mpsc::Receiver<()>>,
    inner: MemorySink,
}

impl GatedSink {
    fn new() -> (Self, mpsc::Sender<()>) {
        let (open, gate) = mpsc::channel();
        let sink = Self {
            gate: Mutex::new(gate),
            inner: MemorySink::new(),
        };
        (sink, open)
    }
}

impl AuditSink for GatedSink {
    fn write(&self, record: &AuditRecord) -> Result<(), SinkError> {
        self.gate
            .lock()
            .map_err(|_| SinkError::Unavailable("gate poisoned".to_string()))?
            .recv()
            .map_err(|_| SinkError::Unavailable("gate closed".to_string()))?;
        self.inner.write(record)
    }
}

struct FailingSink;

impl AuditSink for FailingSink {
    fn write(&self, record: &AuditRecord) -> Result<(), SinkError> {
        Err(SinkError::Rejected {
            channel: record.channel,
            reason: "read-only".to_string(),
        })
    }
}

/// Proxy whose fields cannot be read, like an uninitialized lazy entity.
struct LazyProxy {
    text: Option<&'static str>,
}

impl AuditObject for LazyProxy {
    fn type_name(&self) -> &str {
        "LazyProxy"
    }

    fn audit_fields(&self) -> Result<Vec<AuditField>, ObjectError> {
        Err(ObjectError::new("proxy not initialized"))
    }

    fn write_text(&self, out: &mut dyn fmt::Write) -> Option<fmt::Result> {
        self.text.map(|text| out.write_str(text))
    }

    fn describe(&self) -> Vec<(String, String)> {
        vec![("id".to_string(), "7".to_string()), ("logger".to_string(), "hidden".to_string())]
    }
}

/// Yields some bytes, then fails. Records when it is dropped.
struct FailingStream {
    served: bool,
    released: Arc<AtomicBool>,
}

impl Read for FailingStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.served {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset"));
        }
        self.served = true;
        let chunk = b"partial";
        buf[..chunk.len()].copy_from_slice(chunk);
        Ok(chunk.len())
    }
}

impl Drop for FailingStream {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_scenario_a_request_on_info_channel() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    let data = RequestAuditData::new()
        .with_part("Request")
        .with_method("GET")
        .with_uri("/")
        .with_header("Header1", "Header1Value");
    audit.write_request_audit_log(data, event(AuditEvents::ApiRestRequest), MessageSeverity::Info, None);

    let records = tokio::time::timeout(WAIT, sink.wait_for(1)).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, AuditChannel::Info);
    assert_eq!(records[0].kind, RecordKind::Payload);
    assert_eq!(
        records[0].details,
        r#"{"request":["Request"],"method":"GET","uri":"/","headers":{"Header1":"Header1Value"}}"#
    );
    assert!(records[0].cause.is_none());
    audit.shutdown().await;
}

#[tokio::test]
async fn test_scenario_b_response_on_info_channel() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    audit.write_response_audit_log(
        "Response",
        ResponseAuditData::new(),
        event(AuditEvents::ApiRestResponse),
        Some(MessageSeverity::Info),
        None,
    );
    audit.shutdown().await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, AuditChannel::Info);
    assert_eq!(records[0].details, r#"{"response":"Response"}"#);
}

#[tokio::test]
async fn test_scenario_c_render_failure_then_fallback_with_cause() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    let data = RequestAuditData::new()
        .with_part(AuditValue::object(LazyProxy { text: Some("Proxy!") }))
        .with_method("POST");
    audit.write_request_audit_log(
        data,
        event(AuditEvents::ApiRestRequest),
        MessageSeverity::Error,
        Some(io_cause("upstream failed")),
    );
    audit.shutdown().await;

    let records = sink.records();
    assert_eq!(records.len(), 2);

    let diagnostic = &records[0];
    assert_eq!(diagnostic.channel, AuditChannel::Error);
    assert_eq!(diagnostic.kind, RecordKind::Diagnostic);
    assert_eq!(
        diagnostic.details,
        "Error occurred on JSON rendering of RequestAuditData, falling back to custom text"
    );
    assert!(diagnostic.cause.as_ref().unwrap().to_string().contains("proxy not initialized"));

    let payload = &records[1];
    assert_eq!(payload.channel, AuditChannel::Error);
    assert_eq!(payload.kind, RecordKind::Payload);
    assert_eq!(payload.details, "RequestAuditData{request=[Proxy!], method=POST, headers={}}");
    assert_eq!(payload.cause.as_ref().unwrap().to_string(), "upstream failed");
}

#[test_case(Some("Proxy!"), "Proxy!" ; "custom text")]
#[test_case(None, r#"{"id":"7"}"# ; "field dump")]
#[tokio::test]
async fn test_render_failure_still_yields_text(text: Option<&'static str>, expected: &str) {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    let data = match text {
        Some(_) => AuditableData::from(ResponseAuditData::new().with_response(AuditValue::object(LazyProxy { text }))),
        None => AuditableData::custom(LazyProxy { text }),
    };
    audit.write_audit_log(data, event(AuditEvents::ServiceAudit), MessageSeverity::Info, None);
    audit.shutdown().await;

    let payload = sink
        .records()
        .into_iter()
        .find(|r| r.kind == RecordKind::Payload)
        .unwrap();
    assert!(!payload.details.is_empty());
    assert!(payload.details.contains(expected), "got {}", payload.details);
    assert!(!payload.details.contains("hidden"));
}

#[test_case(MessageSeverity::Info, AuditChannel::Info, false)]
#[test_case(MessageSeverity::Warn, AuditChannel::Warn, false)]
#[test_case(MessageSeverity::Error, AuditChannel::Error, true)]
#[test_case(MessageSeverity::Fatal, AuditChannel::Error, true)]
#[test_case(MessageSeverity::Debug, AuditChannel::Info, false)]
#[tokio::test]
async fn test_severity_routing(severity: MessageSeverity, channel: AuditChannel, has_cause: bool) {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    audit.write_response_audit_log(
        "Response",
        ResponseAuditData::new(),
        event(AuditEvents::ApiRestResponse),
        Some(severity),
        Some(io_cause("boom")),
    );
    audit.shutdown().await;

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, channel);
    assert_eq!(records[0].cause.is_some(), has_cause);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_submit_returns_before_write() {
    let (sink, open) = GatedSink::new();
    let sink = Arc::new(sink);
    let audit = AsyncAudit::from_config(&config(1, 16), sink.clone()).unwrap();

    for i in 0..3 {
        audit.write_message_audit_log(i.to_string(), event(AuditEvents::ServiceAudit), MessageSeverity::Info, None);
    }
    assert!(sink.inner.is_empty());

    for _ in 0..3 {
        open.send(()).unwrap();
    }
    let records = tokio::time::timeout(WAIT, sink.inner.wait_for(3)).await.unwrap();
    let details: Vec<_> = records.iter().map(|r| r.details.as_str()).collect();
    assert_eq!(details, vec!["0", "1", "2"]);
    audit.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_per_thread_order_is_preserved() {
    let sink = Arc::new(MemorySink::new());
    let audit = Arc::new(AsyncAudit::from_config(&config(3, 1024), sink.clone()).unwrap());

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let audit = Arc::clone(&audit);
            std::thread::spawn(move || {
                for i in 0..50 {
                    audit.write_message_audit_log(
                        format!("{}:{}", t, i),
                        event(AuditEvents::ServiceAudit),
                        MessageSeverity::Info,
                        None,
                    );
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    audit.flush().await;

    let mut seen: HashMap<usize, Vec<usize>> = HashMap::new();
    for record in sink.records() {
        let (t, i) = record.details.split_once(':').unwrap();
        seen.entry(t.parse().unwrap()).or_default().push(i.parse().unwrap());
    }
    assert_eq!(seen.len(), 4);
    for sequence in seen.values() {
        assert_eq!(sequence, &(0..50).collect::<Vec<_>>());
    }
}

/// Holds up request records so a response on another queue would overtake them.
struct SlowRequestSink {
    inner: MemorySink,
}

impl AuditSink for SlowRequestSink {
    fn write(&self, record: &AuditRecord) -> Result<(), SinkError> {
        if record.details.starts_with("request") {
            std::thread::sleep(Duration::from_millis(20));
        }
        self.inner.write(record)
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_correlated_pair_keeps_order_across_threads() {
    let sink = Arc::new(SlowRequestSink {
        inner: MemorySink::new(),
    });
    let audit = Arc::new(AsyncAudit::from_config(&config(4, 64), sink.clone()).unwrap());

    let submit_from_thread = |details: String, id: String| {
        let audit = Arc::clone(&audit);
        std::thread::spawn(move || {
            let event = event(AuditEvents::ServiceAudit).with_correlation_id(id);
            audit.write_message_audit_log(details, event, MessageSeverity::Info, None);
        })
        .join()
        .unwrap();
    };

    for n in 0..8 {
        submit_from_thread(format!("request:{}", n), format!("exchange-{}", n));
        submit_from_thread(format!("response:{}", n), format!("exchange-{}", n));
    }
    audit.flush().await;

    let mut seen: HashMap<usize, Vec<String>> = HashMap::new();
    for record in sink.inner.records() {
        let (kind, n) = record.details.split_once(':').unwrap();
        seen.entry(n.parse().unwrap()).or_default().push(kind.to_string());
    }
    assert_eq!(seen.len(), 8);
    for kinds in seen.values() {
        assert_eq!(kinds, &["request", "response"]);
    }
}

#[tokio::test]
async fn test_full_queue_drops_and_counts() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&config(1, 1), sink.clone()).unwrap();

    // Nothing yields between submissions, so the worker never drains the queue.
    for i in 0..5 {
        audit.write_message_audit_log(i.to_string(), event(AuditEvents::ServiceAudit), MessageSeverity::Info, None);
    }
    assert_eq!(audit.dispatcher().dropped(), 4);

    audit.shutdown().await;
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].details, "0");
}

#[tokio::test]
async fn test_internal_exception_is_audited_and_returned() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    let error = audit.handle_internal_exception(
        "AuditAdvice",
        "audit the response",
        event(AuditEvents::ApiRestResponse),
        MessageKey::InterceptorException,
        io::Error::new(io::ErrorKind::Other, "serializer crashed"),
    );

    assert!(matches!(error, AuditError::Fault(_)));
    assert_eq!(error.fault().unwrap().status(), FaultStatus::InternalServerError);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel, AuditChannel::Error);
    assert!(records[0].cause.as_ref().unwrap().to_string().ends_with("serializer crashed"));
    audit.shutdown().await;
}

#[tokio::test]
async fn test_internal_exception_escalates_when_unauditable() {
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), Arc::new(FailingSink)).unwrap();

    let error = audit.handle_internal_exception(
        "AuditAdvice",
        "audit the response",
        event(AuditEvents::ApiRestResponse),
        MessageKey::InterceptorException,
        io::Error::new(io::ErrorKind::Other, "serializer crashed"),
    );

    match &error {
        AuditError::Unauditable { advice, source, .. } => {
            assert_eq!(advice, "AuditAdvice");
            assert!(matches!(source, SinkError::Rejected { channel: AuditChannel::Error, .. }));
        }
        other => panic!("expected unauditable error, got {:?}", other),
    }
    assert_eq!(
        error.to_string(),
        "AuditAdvice - failure occurred while attempting to write the audit error record"
    );
    assert!(error.fault().is_some());
    audit.shutdown().await;
}

#[tokio::test]
async fn test_scenario_e_failing_stream_yields_empty_and_is_released() {
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), Arc::new(MemorySink::new())).unwrap();
    let released = Arc::new(AtomicBool::new(false));

    let stream = FailingStream {
        served: false,
        released: Arc::clone(&released),
    };
    assert_eq!(audit.read_bounded_preview(stream), "");
    assert!(released.load(Ordering::SeqCst));
    audit.shutdown().await;
}

#[tokio::test]
async fn test_ws_messages_are_prefixed_and_routed() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&BulwarkConfig::default(), sink.clone()).unwrap();

    audit.audit_ws_message(WsAuditStage::Before, WsMessageKind::Request, "<req/>");
    audit.audit_ws_message(WsAuditStage::After, WsMessageKind::Fault, "<fault/>");
    audit.shutdown().await;

    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].details, "webserviceRequest -> Raw XML : \n<req/>");
    assert_eq!(records[0].channel, AuditChannel::Info);
    assert_eq!(records[0].event.event(), AuditEvents::PartnerSoapRequest);
    assert_eq!(records[0].event.audited(), "WebServiceTemplate");
    assert_eq!(records[1].details, "webserviceResponse_SOAP-FAULT -> Wire Log : \n<fault/>");
    assert_eq!(records[1].channel, AuditChannel::Error);
}

#[tokio::test]
async fn test_cached_response_audit() {
    let sink = Arc::new(MemorySink::new());
    let audit = AsyncAudit::from_config(&config(1, 1), sink.clone()).unwrap();

    assert!(audit.audit_cached_response("QuoteService", Some("cached".into())).is_ok());

    // The single queue slot is taken, so the second record fails over to
    // internal failure handling and is written directly.
    let error = audit.audit_cached_response("QuoteService", None).unwrap_err();
    assert_eq!(
        error.fault().unwrap().message(),
        "CacheInterceptorInvoke - Exception occurred while attempting to CacheInterceptorInvoke."
    );
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.records()[0].channel, AuditChannel::Error);

    audit.shutdown().await;
    let records = sink.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].event.event(), AuditEvents::CachedServiceResponse);
    assert_eq!(records[1].event.activity(), "cacheGet");
    assert_eq!(records[1].details, r#"{"response":"cached"}"#);
}
