//! Payload handler that decodes and feeds the stores.

use async_trait::async_trait;
use dragonlink_client::{Channel, InboundPayload, PayloadHandler};
use dragonlink_cot::{decode_str, DecodeError, Record};
use dragonlink_store::{StoreCoordinator, StoreUpdate};
use metrics::{counter, describe_counter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Decode counters
#[derive(Debug)]
pub struct IngestMetrics {
    telemetry_decoded: AtomicU64,
    status_decoded: AtomicU64,
    decode_failures: AtomicU64,
    wrong_channel: AtomicU64,
}

impl IngestMetrics {
    pub fn new() -> Self {
        describe_counter!(
            "dragonlink_records_decoded_total",
            "Payloads decoded into a record"
        );
        describe_counter!(
            "dragonlink_decode_failures_total",
            "Payloads rejected by the decoder"
        );
        describe_counter!(
            "dragonlink_payloads_dropped_total",
            "Payloads dropped before reaching a store"
        );

        Self {
            telemetry_decoded: AtomicU64::new(0),
            status_decoded: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            wrong_channel: AtomicU64::new(0),
        }
    }

    fn record_decoded(&self, record: &Record) {
        match record {
            Record::Telemetry(_) => self.telemetry_decoded.fetch_add(1, Ordering::Relaxed),
            Record::Status(_) => self.status_decoded.fetch_add(1, Ordering::Relaxed),
        };
        counter!("dragonlink_records_decoded_total", "kind" => record.kind()).increment(1);
    }

    fn record_failure(&self, channel: Channel, error: &DecodeError) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
        counter!(
            "dragonlink_decode_failures_total",
            "channel" => channel.to_string(),
            "reason" => error.reason()
        )
        .increment(1);
    }

    fn record_wrong_channel(&self) {
        self.wrong_channel.fetch_add(1, Ordering::Relaxed);
        counter!("dragonlink_payloads_dropped_total", "reason" => "wrong_channel").increment(1);
    }

    pub fn telemetry_decoded(&self) -> u64 {
        self.telemetry_decoded.load(Ordering::Relaxed)
    }

    pub fn status_decoded(&self) -> u64 {
        self.status_decoded.load(Ordering::Relaxed)
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures.load(Ordering::Relaxed)
    }

    pub fn wrong_channel(&self) -> u64 {
        self.wrong_channel.load(Ordering::Relaxed)
    }
}

impl Default for IngestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes every payload and submits the record to the store coordinator.
///
/// The telemetry socket carries both record kinds: kits without a separate
/// status publisher send their `b-m-p-s-m` health events there. A telemetry
/// record on the status socket is dropped.
pub struct IngestHandler {
    coordinator: Arc<StoreCoordinator>,
    metrics: Arc<IngestMetrics>,
}

impl IngestHandler {
    pub fn new(coordinator: Arc<StoreCoordinator>) -> Self {
        Self {
            coordinator,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    pub fn metrics(&self) -> Arc<IngestMetrics> {
        Arc::clone(&self.metrics)
    }

    async fn ingest(&self, payload: InboundPayload) {
        let record = match decode_str(&payload.text) {
            Ok(record) => record,
            Err(e) => {
                self.metrics.record_failure(payload.channel, &e);
                debug!(
                    channel = %payload.channel,
                    transport = %payload.transport,
                    source = payload.source.as_deref().unwrap_or("-"),
                    error = %e,
                    "Dropped undecodable payload"
                );
                return;
            }
        };

        if payload.channel == Channel::Status && matches!(record, Record::Telemetry(_)) {
            self.metrics.record_wrong_channel();
            debug!(uid = %record.identity(), "Dropped telemetry received on the status socket");
            return;
        }

        self.metrics.record_decoded(&record);
        trace!(kind = record.kind(), identity = %record.identity(), "Decoded record");

        if let Err(e) = self.coordinator.submit(StoreUpdate::from(record)).await {
            warn!(error = %e, "Record not stored");
        }
    }
}

#[async_trait]
impl PayloadHandler for IngestHandler {
    async fn on_telemetry(&self, payload: InboundPayload) {
        self.ingest(payload).await;
    }

    async fn on_status(&self, payload: InboundPayload) {
        self.ingest(payload).await;
    }
}
