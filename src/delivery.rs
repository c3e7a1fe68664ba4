//! Delivery Resilience Layer — connectivity tracking and the offline queue.
//!
//! All collector traffic funnels through `dispatch`. While the platform
//! reports the network offline, the event that would have been sent is
//! serialized into a single durable slot instead; a later offline event
//! overwrites an earlier one (single-slot semantics). On reconnect the
//! stored entry is sent with a `reconnectedAt` timestamp appended, then
//! cleared. Storage failures are swallowed: monitoring continues with
//! reduced durability rather than failing the exam flow.

use crate::platform::OfflineStore;
use crate::types::{IntegrityEvent, NetworkStatus};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback receiving every event bound for the collector.
pub type ReportSink = Arc<dyn Fn(&IntegrityEvent) + Send + Sync>;

pub struct DeliveryLayer {
    sink: ReportSink,
    store: Arc<dyn OfflineStore>,
    network: RwLock<NetworkStatus>,
    total_sent: AtomicU64,
    total_queued: AtomicU64,
    total_overwritten: AtomicU64,
}

impl DeliveryLayer {
    pub fn new(sink: ReportSink, store: Arc<dyn OfflineStore>) -> Self {
        Self {
            sink,
            store,
            network: RwLock::new(NetworkStatus::Online),
            total_sent: AtomicU64::new(0),
            total_queued: AtomicU64::new(0),
            total_overwritten: AtomicU64::new(0),
        }
    }

    pub fn network(&self) -> NetworkStatus {
        *self.network.read()
    }

    /// Send an event, or queue it into the offline slot when disconnected.
    pub fn dispatch(&self, event: &IntegrityEvent) {
        if self.network() == NetworkStatus::Online {
            (self.sink)(event);
            self.total_sent.fetch_add(1, Ordering::Relaxed);
            return;
        }
        // Offline: persist into the single slot, overwriting any earlier
        // entry. A read/write failure only costs durability.
        if let Ok(Some(_)) = self.store.read() {
            self.total_overwritten.fetch_add(1, Ordering::Relaxed);
            debug!("Offline slot occupied, overwriting earlier event");
        }
        match serde_json::to_string(event) {
            Ok(payload) => match self.store.write(&payload) {
                Ok(()) => {
                    self.total_queued.fetch_add(1, Ordering::Relaxed);
                    debug!(event_type = ?event.event_type, "Event queued offline");
                }
                Err(err) => warn!(error = %err, "Offline store write failed, event lost"),
            },
            Err(err) => warn!(error = %err, "Failed to serialize event for offline slot"),
        }
    }

    /// Mark the network offline. True when this is a transition.
    pub fn set_offline(&self) -> bool {
        let mut network = self.network.write();
        if *network == NetworkStatus::Offline {
            return false;
        }
        *network = NetworkStatus::Offline;
        info!("Network offline, entering queued delivery");
        true
    }

    /// Mark the network online and flush the offline slot if occupied.
    /// True when this is a transition.
    pub fn set_online(&self, now_ms: i64) -> bool {
        {
            let mut network = self.network.write();
            if *network == NetworkStatus::Online {
                return false;
            }
            *network = NetworkStatus::Online;
        }
        info!("Network restored, flushing offline slot");
        self.flush_slot(now_ms);
        true
    }

    fn flush_slot(&self, now_ms: i64) {
        let payload = match self.store.read() {
            Ok(Some(payload)) => payload,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "Offline store read failed, queued event lost");
                return;
            }
        };
        match serde_json::from_str::<IntegrityEvent>(&payload) {
            Ok(mut event) => {
                event.details.insert("reconnectedAt".to_string(), now_ms.to_string());
                (self.sink)(&event);
                self.total_sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => warn!(error = %err, "Discarding undecodable offline entry"),
        }
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear offline slot");
        }
    }

    pub fn total_sent(&self) -> u64 { self.total_sent.load(Ordering::Relaxed) }
    pub fn total_queued(&self) -> u64 { self.total_queued.load(Ordering::Relaxed) }
    pub fn total_overwritten(&self) -> u64 { self.total_overwritten.load(Ordering::Relaxed) }
}
