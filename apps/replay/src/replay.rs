//! Camera and landmark engine backed by a recorded hand track.
//!
//! Frames carry no pixels; the engine looks the hand up by frame sequence
//! number.

use serde::Deserialize;
use signlens_capture::{
    Camera, CameraDescriptor, CameraFrame, CameraProvider, Delegate, EngineInitializer,
    FrameSink, LandmarkEngine, LensDirection,
};
use signlens_landmarks::{Hand, Rotation};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

fn default_fps() -> u32 {
    15
}

fn default_lens() -> LensDirection {
    LensDirection::Front
}

/// A recorded hand track. `null` frames had no hand in view.
#[derive(Debug, Clone, Deserialize)]
pub struct Recording {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_lens")]
    pub lens: LensDirection,
    #[serde(default)]
    pub sensor_orientation: Rotation,
    pub frames: Vec<Option<Hand>>,
}

impl Recording {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1_000 / u64::from(self.fps.max(1)))
    }
}

/// Single-camera provider that plays `recording` when streamed.
pub struct ReplayCameraProvider {
    descriptor: CameraDescriptor,
    frame_count: usize,
    interval: Duration,
    finished: Arc<Notify>,
}

impl ReplayCameraProvider {
    pub fn new(recording: &Recording) -> Self {
        Self {
            descriptor: CameraDescriptor {
                id: "replay".to_string(),
                name: "Recorded track".to_string(),
                lens: recording.lens,
                sensor_orientation: recording.sensor_orientation,
            },
            frame_count: recording.frames.len(),
            interval: recording.frame_interval(),
            finished: Arc::new(Notify::new()),
        }
    }

    /// Notified once the last frame has been delivered.
    pub fn finished(&self) -> Arc<Notify> {
        Arc::clone(&self.finished)
    }
}

impl CameraProvider for ReplayCameraProvider {
    fn list_cameras(&self) -> signlens_capture::Result<Vec<CameraDescriptor>> {
        Ok(vec![self.descriptor.clone()])
    }

    fn open(&self, camera: &CameraDescriptor) -> signlens_capture::Result<Box<dyn Camera>> {
        if camera.id != self.descriptor.id {
            return Err(signlens_capture::CaptureError::Camera(format!(
                "unknown camera {}",
                camera.id
            )));
        }
        Ok(Box::new(ReplayCamera {
            descriptor: self.descriptor.clone(),
            frame_count: self.frame_count,
            interval: self.interval,
            finished: Arc::clone(&self.finished),
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
        }))
    }
}

struct ReplayCamera {
    descriptor: CameraDescriptor,
    frame_count: usize,
    interval: Duration,
    finished: Arc<Notify>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Camera for ReplayCamera {
    fn descriptor(&self) -> &CameraDescriptor {
        &self.descriptor
    }

    fn start_stream(&mut self, sink: FrameSink) -> signlens_capture::Result<()> {
        if self.worker.is_some() {
            return Err(signlens_capture::CaptureError::CameraBusy(
                self.descriptor.id.clone(),
            ));
        }

        let frame_count = self.frame_count;
        let interval = self.interval;
        let finished = Arc::clone(&self.finished);
        let stop = Arc::clone(&self.stop);
        stop.store(false, Ordering::Release);

        let worker = std::thread::Builder::new()
            .name("replay-camera".to_string())
            .spawn(move || {
                for seq in 0..frame_count {
                    if stop.load(Ordering::Acquire) {
                        return;
                    }
                    sink(CameraFrame {
                        seq: seq as u64,
                        ts_ms: now_ms(),
                        width: 0,
                        height: 0,
                        data: Arc::from(Vec::new()),
                    });
                    std::thread::sleep(interval);
                }
                tracing::debug!(frames = frame_count, "replay finished");
                finished.notify_one();
            })
            .map_err(|e| signlens_capture::CaptureError::Camera(e.to_string()))?;

        self.worker = Some(worker);
        Ok(())
    }

    fn stop_stream(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn is_streaming(&self) -> bool {
        self.worker.is_some()
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Looks up the recorded hand for each frame.
pub struct ReplayEngine {
    frames: Arc<Vec<Option<Hand>>>,
}

impl LandmarkEngine for ReplayEngine {
    fn name(&self) -> &str {
        "replay"
    }

    fn detect(
        &self,
        frame: &CameraFrame,
        _orientation: Rotation,
    ) -> signlens_capture::Result<Option<Hand>> {
        Ok(self
            .frames
            .get(frame.seq as usize)
            .cloned()
            .flatten())
    }
}

pub struct ReplayEngineInitializer {
    frames: Arc<Vec<Option<Hand>>>,
}

impl ReplayEngineInitializer {
    pub fn new(recording: &Recording) -> Self {
        Self {
            frames: Arc::new(recording.frames.clone()),
        }
    }
}

impl EngineInitializer for ReplayEngineInitializer {
    fn delegate(&self) -> Delegate {
        Delegate::Cpu
    }

    fn initialize(&self) -> signlens_capture::Result<Box<dyn LandmarkEngine>> {
        Ok(Box::new(ReplayEngine {
            frames: Arc::clone(&self.frames),
        }))
    }
}
