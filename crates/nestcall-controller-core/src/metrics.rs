//! A small `prometheus` registry (spec §10.5 "plain metrics, no OTLP export").

use actix_web::{get, HttpResponse};
use prometheus::{Encoder, Gauge, IntCounter, IntGauge, Registry, TextEncoder};

/// The counters and gauges exposed at `GET /metrics`.
pub struct Metrics {
    registry: Registry,
    pub active_recordings: IntGauge,
    pub recording_queue_length: IntGauge,
    pub signal_mailbox_messages: IntGauge,
    pub call_state_transitions_total: IntCounter,
    pub recorder_backend_request_seconds: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let active_recordings =
            IntGauge::new("nestcall_active_recordings", "Recorder sessions currently running").unwrap();
        let recording_queue_length =
            IntGauge::new("nestcall_recording_queue_length", "Entries waiting for recording capacity").unwrap();
        let signal_mailbox_messages = IntGauge::new(
            "nestcall_signal_mailbox_messages",
            "Signaling messages currently held across all mailboxes",
        )
        .unwrap();
        let call_state_transitions_total = IntCounter::new(
            "nestcall_call_state_transitions_total",
            "Total number of call state-machine transitions applied",
        )
        .unwrap();
        let recorder_backend_request_seconds = Gauge::new(
            "nestcall_recorder_backend_last_request_seconds",
            "Duration of the most recent RecorderBackend HTTP call",
        )
        .unwrap();

        registry.register(Box::new(active_recordings.clone())).unwrap();
        registry.register(Box::new(recording_queue_length.clone())).unwrap();
        registry.register(Box::new(signal_mailbox_messages.clone())).unwrap();
        registry.register(Box::new(call_state_transitions_total.clone())).unwrap();
        registry.register(Box::new(recorder_backend_request_seconds.clone())).unwrap();

        Self {
            registry,
            active_recordings,
            recording_queue_length,
            signal_mailbox_messages,
            call_state_transitions_total,
            recorder_backend_request_seconds,
        }
    }

    fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer).expect("prometheus encoding never fails");
        String::from_utf8(buffer).expect("prometheus text format is always valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /metrics`.
#[get("/metrics")]
pub async fn metrics_handler(metrics: actix_web::web::Data<Metrics>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics.render())
}
