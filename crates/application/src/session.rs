//! Session controller: camera lifecycle, the detection cycle, auto-save and
//! connectivity.
//!
//! Every activation (start or resume) bumps the session epoch. Frame sinks
//! and timers capture the epoch they were created under, and anything they
//! produce is applied only if that epoch is still current. This is how a stop
//! or suspend discards the result of a cycle that was already in flight.

use chrono::Utc;
use serde::Serialize;
use signlens_capture::{
    select_camera, Camera, CameraFrame, CameraProvider, CaptureError, EngineRegistry, FrameSink,
    LandmarkEngine,
};
use signlens_classifier::{Classifier, Prediction};
use signlens_events::{
    emit_json, event_names, EventBusRef, HistoryChangedEvent, LandmarksEvent, PredictionEvent,
    SessionStateEvent,
};
use signlens_landmarks::{overlay_segments, CanvasSize, Hand, Rotation, ScreenPoint};
use signlens_storage::{HistoryEntry, HistoryStore, StorageError};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::admission::{
    AdmissionGate, AdmissionPermit, CycleState, PipelineStats, PipelineStatsSnapshot,
};
use crate::autosave::AutoSavePolicy;
use crate::config::SessionConfig;
use crate::timers::{spawn_periodic, TimerHandle};
use crate::Result;

/// Collaborators the controller is built from.
pub struct SessionParts {
    pub cameras: Arc<dyn CameraProvider>,
    pub engines: EngineRegistry,
    pub classifier: Arc<dyn Classifier>,
    pub history: Arc<HistoryStore>,
    pub events: EventBusRef,
}

/// How landmarks must be transformed to line up with the preview.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverlayOrientation {
    pub rotation: Rotation,
    pub mirror_x: bool,
}

/// Point-in-time copy of the observable session state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub is_running: bool,
    pub is_connected: bool,
    pub is_suspended: bool,
    pub current_prediction: Option<Prediction>,
    pub current_landmarks: Option<Hand>,
    pub history: Vec<HistoryEntry>,
    pub orientation: OverlayOrientation,
}

impl SessionSnapshot {
    /// Skeleton segments for the current hand, or empty when no hand is shown.
    pub fn overlay_segments(&self, canvas: CanvasSize) -> Vec<(ScreenPoint, ScreenPoint)> {
        self.current_landmarks
            .as_ref()
            .map(|hand| {
                overlay_segments(
                    hand,
                    canvas,
                    self.orientation.mirror_x,
                    self.orientation.rotation,
                )
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    epoch: u64,
    is_running: bool,
    is_suspended: bool,
    is_connected: bool,
    current_prediction: Option<Prediction>,
    current_landmarks: Option<Hand>,
    history: Vec<HistoryEntry>,
    orientation: OverlayOrientation,
    autosave: AutoSavePolicy,
}

impl SessionState {
    /// Whether work started under `epoch` may still change state.
    fn accepts(&self, epoch: u64) -> bool {
        self.is_running && !self.is_suspended && self.epoch == epoch
    }

    fn state_event(&self) -> SessionStateEvent {
        SessionStateEvent {
            is_running: self.is_running,
            is_connected: self.is_connected,
            is_suspended: self.is_suspended,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            is_running: self.is_running,
            is_connected: self.is_connected,
            is_suspended: self.is_suspended,
            current_prediction: self.current_prediction.clone(),
            current_landmarks: self.current_landmarks.clone(),
            history: self.history.clone(),
            orientation: self.orientation,
        }
    }
}

/// Drives one capture-to-feedback session. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    cameras: Arc<dyn CameraProvider>,
    engines: EngineRegistry,
    engine: Mutex<Option<Arc<dyn LandmarkEngine>>>,
    classifier: Arc<dyn Classifier>,
    history: Arc<HistoryStore>,
    events: EventBusRef,
    gate: Arc<AdmissionGate>,
    state: RwLock<SessionState>,
    /// The open camera. Also serializes start, stop, suspend and resume.
    camera: tokio::sync::Mutex<Option<Box<dyn Camera>>>,
    timers: TimerHandle,
}

impl SessionController {
    pub fn new(parts: SessionParts, config: SessionConfig) -> Self {
        let stats = Arc::new(PipelineStats::new());
        let state = SessionState {
            history: parts.history.load(),
            ..Default::default()
        };

        Self {
            inner: Arc::new(Inner {
                config,
                cameras: parts.cameras,
                engines: parts.engines,
                engine: Mutex::new(None),
                classifier: parts.classifier,
                history: parts.history,
                events: parts.events,
                gate: Arc::new(AdmissionGate::new(stats)),
                state: RwLock::new(state),
                camera: tokio::sync::Mutex::new(None),
                timers: TimerHandle::new(),
            }),
        }
    }

    /// Acquire the camera, bring up the landmark engine and begin streaming.
    ///
    /// Starting a running session is a no-op. On failure the session is left
    /// stopped and the camera, if it was opened, is released.
    pub async fn start(&self) -> Result<()> {
        let inner = &self.inner;
        let mut camera = inner.camera.lock().await;

        if inner.state.read().await.is_running {
            tracing::debug!("session already running");
            return Ok(());
        }

        let store = Arc::clone(&inner.history);
        let history = blocking_storage(move || Ok(store.load())).await?;
        let epoch = {
            let mut state = inner.state.write().await;
            state.epoch += 1;
            state.is_running = true;
            state.is_suspended = false;
            state.current_prediction = None;
            state.current_landmarks = None;
            state.history = history;
            state.autosave.reset();
            state.epoch
        };

        if let Err(e) = inner.activate(&mut camera, epoch).await {
            tracing::warn!(error = %e, "session failed to start");
            {
                let mut state = inner.state.write().await;
                state.epoch += 1;
                state.is_running = false;
            }
            inner.emit_state().await;
            return Err(e);
        }

        // Stop and suspend must not wait on the health check below.
        drop(camera);

        tracing::info!(epoch, "session started");
        inner.emit_state().await;
        inner.emit_history().await;
        inner.refresh_connectivity().await;
        Ok(())
    }

    /// Stop streaming, cancel timers and release the camera.
    ///
    /// A detection cycle already in flight may finish, but its result is
    /// discarded. History is kept.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let mut camera = inner.camera.lock().await;

        inner.deactivate(&mut camera);

        let was_running = {
            let mut state = inner.state.write().await;
            let was_running = state.is_running;
            state.epoch += 1;
            state.is_running = false;
            state.is_suspended = false;
            state.current_prediction = None;
            state.current_landmarks = None;
            was_running
        };

        if was_running {
            tracing::info!("session stopped");
            inner.emit_state().await;
        }
    }

    /// Release the camera while the app is in the background.
    pub async fn suspend(&self) {
        let inner = &self.inner;
        let mut camera = inner.camera.lock().await;

        {
            let mut state = inner.state.write().await;
            if !state.is_running || state.is_suspended {
                return;
            }
            state.epoch += 1;
            state.is_suspended = true;
            state.current_landmarks = None;
        }

        inner.deactivate(&mut camera);
        tracing::info!("session suspended");
        inner.emit_state().await;
    }

    /// Reacquire the camera after [`suspend`](Self::suspend).
    ///
    /// If the camera cannot be reacquired the session stays suspended and the
    /// call can be retried.
    pub async fn resume(&self) -> Result<()> {
        let inner = &self.inner;
        let mut camera = inner.camera.lock().await;

        let epoch = {
            let mut state = inner.state.write().await;
            if !state.is_running || !state.is_suspended {
                return Ok(());
            }
            state.epoch += 1;
            state.is_suspended = false;
            state.epoch
        };

        if let Err(e) = inner.activate(&mut camera, epoch).await {
            tracing::warn!(error = %e, "failed to resume session");
            {
                let mut state = inner.state.write().await;
                state.epoch += 1;
                state.is_suspended = true;
            }
            inner.emit_state().await;
            return Err(e);
        }
        drop(camera);

        tracing::info!(epoch, "session resumed");
        inner.emit_state().await;
        inner.refresh_connectivity().await;
        Ok(())
    }

    /// Poll the classifier health endpoint and record the result.
    pub async fn refresh_connectivity(&self) -> bool {
        self.inner.refresh_connectivity().await
    }

    /// Delete the persisted history.
    ///
    /// Serialized with auto-save, so a tick in progress cannot write back the
    /// entries being cleared.
    pub async fn clear_history(&self) -> Result<()> {
        let inner = &self.inner;
        {
            let mut state = inner.state.write().await;
            let history = Arc::clone(&inner.history);
            blocking_storage(move || history.clear()).await?;
            state.history.clear();
            state.autosave.reset();
        }
        tracing::info!("history cleared");
        inner.emit_history().await;
        Ok(())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().await.snapshot()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.inner.state.read().await.history.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.read().await.is_running
    }

    pub fn stats(&self) -> PipelineStatsSnapshot {
        self.inner.gate.stats().snapshot()
    }

    pub fn admission_state(&self) -> CycleState {
        self.inner.gate.state()
    }
}

impl Inner {
    /// Open the preferred camera, wire its stream to the detection cycle and
    /// start the timers for `epoch`.
    async fn activate(
        self: &Arc<Self>,
        slot: &mut Option<Box<dyn Camera>>,
        epoch: u64,
    ) -> Result<()> {
        let engine = self.landmark_engine().await?;

        let cameras = self.cameras.list_cameras()?;
        let descriptor = select_camera(&cameras)?.clone();
        tracing::info!(camera = %descriptor.name, lens = ?descriptor.lens, "opening camera");
        let mut camera = self.cameras.open(&descriptor)?;

        let orientation = OverlayOrientation {
            rotation: descriptor.sensor_orientation,
            mirror_x: self.config.mirror_front_camera && descriptor.is_front(),
        };
        self.state.write().await.orientation = orientation;

        let sink = self.frame_sink(engine, orientation, epoch);
        // Dropping `camera` on error releases it.
        camera.start_stream(sink)?;
        *slot = Some(camera);

        self.spawn_timers(epoch);
        Ok(())
    }

    fn deactivate(&self, slot: &mut Option<Box<dyn Camera>>) {
        self.timers.stop();
        if let Some(mut camera) = slot.take() {
            camera.stop_stream();
            tracing::debug!(camera = %camera.descriptor().name, "camera released");
        }
    }

    /// Initialized engine, bringing one up on first use.
    async fn landmark_engine(self: &Arc<Self>) -> Result<Arc<dyn LandmarkEngine>> {
        let cached = self.engine.lock().expect("engine mutex poisoned").clone();
        if let Some(engine) = cached {
            return Ok(engine);
        }

        let inner = Arc::clone(self);
        let engine = tokio::task::spawn_blocking(move || inner.engines.initialize())
            .await
            .map_err(|e| CaptureError::EngineInit(e.to_string()))??;

        *self.engine.lock().expect("engine mutex poisoned") = Some(Arc::clone(&engine));
        Ok(engine)
    }

    fn frame_sink(
        self: &Arc<Self>,
        engine: Arc<dyn LandmarkEngine>,
        orientation: OverlayOrientation,
        epoch: u64,
    ) -> FrameSink {
        // Weak so the camera holding this sink does not keep the session alive.
        let inner: Weak<Inner> = Arc::downgrade(self);
        let runtime = tokio::runtime::Handle::current();

        Arc::new(move |frame: CameraFrame| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let Some(permit) = inner.gate.try_admit() else {
                return;
            };
            let engine = Arc::clone(&engine);
            runtime.spawn(async move {
                inner.run_cycle(engine, frame, orientation, epoch, permit).await;
            });
        })
    }

    /// One detection cycle. The gate returns to Idle when `_permit` drops.
    async fn run_cycle(
        self: Arc<Self>,
        engine: Arc<dyn LandmarkEngine>,
        frame: CameraFrame,
        orientation: OverlayOrientation,
        epoch: u64,
        _permit: AdmissionPermit,
    ) {
        let started = Instant::now();
        let seq = frame.seq;
        self.detect_and_predict(engine, frame, orientation, epoch).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.gate.stats().set_last_cycle_ms(elapsed_ms);
        tracing::trace!(seq, elapsed_ms, "detection cycle finished");
    }

    async fn detect_and_predict(
        &self,
        engine: Arc<dyn LandmarkEngine>,
        frame: CameraFrame,
        orientation: OverlayOrientation,
        epoch: u64,
    ) {
        let stats = self.gate.stats();

        let detection =
            tokio::task::spawn_blocking(move || engine.detect(&frame, orientation.rotation)).await;
        let hand = match detection {
            Ok(Ok(hand)) => hand,
            Ok(Err(e)) => {
                stats.record_detection_failure();
                tracing::warn!(error = %e, "landmark detection failed");
                return;
            }
            Err(e) => {
                stats.record_detection_failure();
                tracing::error!(error = %e, "landmark detection task failed");
                return;
            }
        };

        if hand.is_some() {
            stats.record_hand_detected();
        }

        let Some(is_connected) = self.apply_landmarks(epoch, hand.as_ref()).await else {
            stats.record_discarded();
            return;
        };

        let Some(hand) = hand else {
            return;
        };
        if !is_connected {
            return;
        }

        let features = hand.feature_vector();
        match self.classifier.predict(features.as_slice()).await {
            Ok(Some(prediction)) => {
                stats.record_prediction(true);
                if !self.apply_prediction(epoch, prediction).await {
                    stats.record_discarded();
                }
            }
            Ok(None) => stats.record_prediction(false),
            Err(e) => {
                stats.record_prediction(false);
                tracing::error!(error = %e, "classifier rejected feature vector");
            }
        }
    }

    /// Publish the latest landmarks. Returns the connectivity flag, or `None`
    /// if `epoch` is stale and nothing was applied.
    async fn apply_landmarks(&self, epoch: u64, hand: Option<&Hand>) -> Option<bool> {
        let (event, is_connected) = {
            let mut state = self.state.write().await;
            if !state.accepts(epoch) {
                return None;
            }
            // The last prediction stays on screen when the hand leaves.
            state.current_landmarks = hand.cloned();
            let event = LandmarksEvent {
                landmarks: hand.map(|h| h.landmarks().to_vec()),
                rotation_degrees: state.orientation.rotation.degrees(),
                mirror_x: state.orientation.mirror_x,
            };
            (event, state.is_connected)
        };

        emit_json(self.events.as_ref(), event_names::SESSION_LANDMARKS, &event);
        Some(is_connected)
    }

    async fn apply_prediction(&self, epoch: u64, prediction: Prediction) -> bool {
        let event = {
            let mut state = self.state.write().await;
            if !state.accepts(epoch) {
                return false;
            }
            let event = PredictionEvent {
                label: prediction.label.clone(),
                confidence: prediction.confidence,
                ts_ms: Utc::now().timestamp_millis(),
            };
            state.current_prediction = Some(prediction);
            event
        };

        tracing::debug!(label = %event.label, confidence = ?event.confidence, "prediction");
        emit_json(self.events.as_ref(), event_names::SESSION_PREDICTION, &event);
        true
    }

    async fn autosave_tick(&self, epoch: u64) {
        let event = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            if !state.accepts(epoch) {
                return;
            }

            let Some(entry) = state.autosave.evaluate(
                state.current_prediction.as_ref(),
                state.current_landmarks.is_some(),
                Utc::now(),
            ) else {
                return;
            };

            let label = entry.label.clone();
            // Held across the write so clear_history cannot interleave.
            let store = Arc::clone(&self.history);
            match blocking_storage(move || store.append(entry)).await {
                Ok(history) => {
                    state.autosave.mark_saved(label.clone());
                    state.history = history;
                    tracing::info!(label = %label, total = state.history.len(), "saved to history");
                    HistoryChangedEvent {
                        len: state.history.len(),
                        last_label: Some(label),
                    }
                }
                Err(e) => {
                    tracing::warn!(label = %label, error = %e, "failed to save history entry");
                    return;
                }
            }
        };

        emit_json(self.events.as_ref(), event_names::SESSION_HISTORY, &event);
    }

    async fn refresh_connectivity(&self) -> bool {
        let connected = self.classifier.health_check().await;

        let event = {
            let mut state = self.state.write().await;
            if state.is_connected == connected {
                return connected;
            }
            state.is_connected = connected;
            state.state_event()
        };

        if connected {
            tracing::info!("classifier reachable");
        } else {
            tracing::warn!("classifier unreachable or not ready");
        }
        emit_json(self.events.as_ref(), event_names::SESSION_CONNECTIVITY, &event);
        connected
    }

    fn spawn_timers(self: &Arc<Self>, epoch: u64) {
        let token = self.timers.start();

        let weak = Arc::downgrade(self);
        let period = self.config.autosave_period;
        spawn_periodic(
            "autosave",
            token.clone(),
            Instant::now() + period,
            period,
            move || {
                weak.upgrade()
                    .map(|inner| async move { inner.autosave_tick(epoch).await })
            },
        );

        let weak = Arc::downgrade(self);
        let period = self.config.connectivity_period;
        spawn_periodic(
            "connectivity",
            token,
            Instant::now() + period,
            period,
            move || {
                weak.upgrade().map(|inner| async move {
                    inner.refresh_connectivity().await;
                })
            },
        );
    }

    async fn emit_state(&self) {
        let event = self.state.read().await.state_event();
        emit_json(self.events.as_ref(), event_names::SESSION_STATE, &event);
    }

    async fn emit_history(&self) {
        let event = {
            let state = self.state.read().await;
            HistoryChangedEvent {
                len: state.history.len(),
                last_label: state.history.last().map(|e| e.label.clone()),
            }
        };
        emit_json(self.events.as_ref(), event_names::SESSION_HISTORY, &event);
    }
}

/// Run a database call on the blocking pool.
async fn blocking_storage<T, F>(f: F) -> signlens_storage::Result<T>
where
    F: FnOnce() -> signlens_storage::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::IoError(std::io::Error::other(e.to_string())))?
}
