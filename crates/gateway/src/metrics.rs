use crate::status::OverallStatus;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::time::Duration;

const METER_NAME: &str = "posture-gateway";

/// Request-level instruments. No-ops until a global meter provider is installed.
pub struct GatewayMetrics {
    requests: Counter<u64>,
    skipped: Counter<u64>,
    inference_duration: Histogram<f64>,
    detections: Counter<u64>,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        let meter = global::meter(METER_NAME);
        let latency_buckets = [
            0.005, 0.01, 0.02, 0.03, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            requests: meter
                .u64_counter("detect_requests_total")
                .with_description("Detection requests by outcome")
                .build(),
            skipped: meter
                .u64_counter("detect_frames_skipped_total")
                .with_description("Frames shed because a detection was already running")
                .build(),
            inference_duration: meter
                .f64_histogram("inference_duration_seconds")
                .with_description("Time to run one detection (letterbox + infer + postprocess)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            detections: meter
                .u64_counter("detections_total")
                .with_description("Detections returned, by overall frame status")
                .build(),
        }
    }

    pub fn record_request(&self, outcome: &'static str) {
        self.requests.add(1, &[KeyValue::new("outcome", outcome)]);
    }

    pub fn record_skipped(&self) {
        self.skipped.add(1, &[]);
        self.record_request("busy");
    }

    pub fn record_detection(&self, elapsed: Duration, count: usize, status: OverallStatus) {
        self.inference_duration.record(elapsed.as_secs_f64(), &[]);
        self.detections
            .add(count as u64, &[KeyValue::new("status", status.as_str())]);
        self.record_request("ok");
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}
