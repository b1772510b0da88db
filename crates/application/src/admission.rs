//! Frame admission: at most one detection cycle in flight.
//!
//! Frames arriving while a cycle runs are dropped, never queued, so the
//! overlay always reflects a recent frame instead of a growing backlog.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::constants::DROP_LOG_EVERY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    Busy,
}

/// Lock-free counters for the detection pipeline.
///
/// Shared via `Arc<PipelineStats>` and updated from the frame hot path.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_received: AtomicU64,
    frames_admitted: AtomicU64,
    frames_dropped: AtomicU64,
    cycles_completed: AtomicU64,
    hands_detected: AtomicU64,
    detection_failures: AtomicU64,
    predictions_ok: AtomicU64,
    predictions_failed: AtomicU64,
    results_discarded: AtomicU64,
    last_cycle_ms: AtomicU64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn frames_admitted(&self) -> u64 {
        self.frames_admitted.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Acquire)
    }

    pub fn hands_detected(&self) -> u64 {
        self.hands_detected.load(Ordering::Relaxed)
    }

    pub fn detection_failures(&self) -> u64 {
        self.detection_failures.load(Ordering::Relaxed)
    }

    pub fn predictions_ok(&self) -> u64 {
        self.predictions_ok.load(Ordering::Relaxed)
    }

    pub fn predictions_failed(&self) -> u64 {
        self.predictions_failed.load(Ordering::Relaxed)
    }

    pub fn results_discarded(&self) -> u64 {
        self.results_discarded.load(Ordering::Relaxed)
    }

    pub fn last_cycle_ms(&self) -> u64 {
        self.last_cycle_ms.load(Ordering::Relaxed)
    }

    pub fn record_hand_detected(&self) {
        self.hands_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_failure(&self) {
        self.detection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prediction(&self, ok: bool) {
        if ok {
            self.predictions_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.predictions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A cycle finished after its session epoch ended; its result was thrown away.
    pub fn record_discarded(&self) {
        self.results_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_last_cycle_ms(&self, value: u64) {
        self.last_cycle_ms.store(value, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            frames_received: self.frames_received(),
            frames_admitted: self.frames_admitted(),
            frames_dropped: self.frames_dropped(),
            cycles_completed: self.cycles_completed(),
            hands_detected: self.hands_detected(),
            detection_failures: self.detection_failures(),
            predictions_ok: self.predictions_ok(),
            predictions_failed: self.predictions_failed(),
            results_discarded: self.results_discarded(),
            last_cycle_ms: self.last_cycle_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStatsSnapshot {
    pub frames_received: u64,
    pub frames_admitted: u64,
    pub frames_dropped: u64,
    pub cycles_completed: u64,
    pub hands_detected: u64,
    pub detection_failures: u64,
    pub predictions_ok: u64,
    pub predictions_failed: u64,
    pub results_discarded: u64,
    pub last_cycle_ms: u64,
}

/// Two-state gate in front of the detection cycle.
#[derive(Debug, Default)]
pub struct AdmissionGate {
    busy: AtomicBool,
    stats: Arc<PipelineStats>,
}

impl AdmissionGate {
    pub fn new(stats: Arc<PipelineStats>) -> Self {
        Self {
            busy: AtomicBool::new(false),
            stats,
        }
    }

    pub fn state(&self) -> CycleState {
        if self.busy.load(Ordering::Acquire) {
            CycleState::Busy
        } else {
            CycleState::Idle
        }
    }

    pub fn stats(&self) -> &Arc<PipelineStats> {
        &self.stats
    }

    /// Offer a frame. Returns a permit if the gate was Idle.
    ///
    /// The gate stays Busy until the permit is dropped, which happens on every
    /// exit path of the cycle holding it, including a panic.
    pub fn try_admit(self: &Arc<Self>) -> Option<AdmissionPermit> {
        self.stats.frames_received.fetch_add(1, Ordering::Relaxed);

        match self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                self.stats.frames_admitted.fetch_add(1, Ordering::Relaxed);
                Some(AdmissionPermit {
                    gate: Arc::clone(self),
                })
            }
            Err(_) => {
                let dropped = self.stats.frames_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped % DROP_LOG_EVERY == 1 {
                    tracing::debug!(dropped, "detection busy, dropping frames");
                }
                None
            }
        }
    }

    fn release(&self) {
        self.busy.store(false, Ordering::Release);
        self.stats.cycles_completed.fetch_add(1, Ordering::AcqRel);
    }
}

/// Proof that the holder owns the single in-flight cycle.
#[derive(Debug)]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
