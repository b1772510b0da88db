use signlens_landmarks::{Hand, Rotation};
use std::sync::Arc;

use crate::camera::CameraFrame;
use crate::{CaptureError, Result};

/// Hand landmark detector.
pub trait LandmarkEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Detect at most one hand in `frame`.
    ///
    /// `orientation` is the sensor rotation so the engine can upright the
    /// image. Landmarks come back in the detector's normalized space.
    fn detect(&self, frame: &CameraFrame, orientation: Rotation) -> Result<Option<Hand>>;
}

/// Hardware path an engine runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delegate {
    Gpu,
    Cpu,
}

impl std::fmt::Display for Delegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpu => write!(f, "gpu"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

/// Factory for one way of bringing up a landmark engine.
///
/// Platform crates implement this once per delegate.
pub trait EngineInitializer: Send + Sync {
    fn delegate(&self) -> Delegate;

    fn initialize(&self) -> Result<Box<dyn LandmarkEngine>>;
}

/// Ordered list of initialization strategies. The first success wins.
#[derive(Default)]
pub struct EngineRegistry {
    initializers: Vec<Box<dyn EngineInitializer>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a strategy. Strategies are tried in registration order.
    pub fn register(&mut self, initializer: Box<dyn EngineInitializer>) {
        tracing::debug!("Registering {} landmark engine initializer", initializer.delegate());
        self.initializers.push(initializer);
    }

    pub fn with(mut self, initializer: Box<dyn EngineInitializer>) -> Self {
        self.register(initializer);
        self
    }

    pub fn len(&self) -> usize {
        self.initializers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.initializers.is_empty()
    }

    /// Bring up the first engine that initializes.
    ///
    /// Fails with [`CaptureError::LandmarkEngineUnavailable`] only when every
    /// strategy failed (or none were registered).
    pub fn initialize(&self) -> Result<Arc<dyn LandmarkEngine>> {
        let mut attempts = Vec::with_capacity(self.initializers.len());

        for initializer in &self.initializers {
            let delegate = initializer.delegate();
            match initializer.initialize() {
                Ok(engine) => {
                    tracing::info!(%delegate, engine = engine.name(), "landmark engine ready");
                    return Ok(Arc::from(engine));
                }
                Err(e) => {
                    tracing::warn!(%delegate, error = %e, "landmark engine init failed, trying next");
                    attempts.push(format!("{delegate}: {e}"));
                }
            }
        }

        Err(CaptureError::LandmarkEngineUnavailable { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubEngine(&'static str);

    impl LandmarkEngine for StubEngine {
        fn name(&self) -> &str {
            self.0
        }

        fn detect(&self, _frame: &CameraFrame, _orientation: Rotation) -> Result<Option<Hand>> {
            Ok(None)
        }
    }

    struct StubInitializer {
        delegate: Delegate,
        succeed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl EngineInitializer for StubInitializer {
        fn delegate(&self) -> Delegate {
            self.delegate
        }

        fn initialize(&self) -> Result<Box<dyn LandmarkEngine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                Ok(Box::new(StubEngine(match self.delegate {
                    Delegate::Gpu => "stub-gpu",
                    Delegate::Cpu => "stub-cpu",
                })))
            } else {
                Err(CaptureError::EngineInit(format!("{} unsupported", self.delegate)))
            }
        }
    }

    fn stub(delegate: Delegate, succeed: bool) -> (Box<dyn EngineInitializer>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let init = StubInitializer {
            delegate,
            succeed,
            calls: Arc::clone(&calls),
        };
        (Box::new(init), calls)
    }

    #[test]
    fn test_first_success_wins() {
        let (gpu, gpu_calls) = stub(Delegate::Gpu, true);
        let (cpu, cpu_calls) = stub(Delegate::Cpu, true);
        let registry = EngineRegistry::new().with(gpu).with(cpu);

        let engine = registry.initialize().unwrap();
        assert_eq!(engine.name(), "stub-gpu");
        assert_eq!(gpu_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cpu_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_falls_back_to_cpu() {
        let (gpu, _) = stub(Delegate::Gpu, false);
        let (cpu, _) = stub(Delegate::Cpu, true);
        let registry = EngineRegistry::new().with(gpu).with(cpu);

        assert_eq!(registry.initialize().unwrap().name(), "stub-cpu");
    }

    #[test]
    fn test_all_failing_is_unavailable() {
        let (gpu, _) = stub(Delegate::Gpu, false);
        let (cpu, _) = stub(Delegate::Cpu, false);
        let registry = EngineRegistry::new().with(gpu).with(cpu);

        match registry.initialize() {
            Err(CaptureError::LandmarkEngineUnavailable { attempts }) => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("gpu"));
                assert!(attempts[1].starts_with("cpu"));
            }
            other => panic!("expected LandmarkEngineUnavailable, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_empty_registry_is_unavailable() {
        assert!(matches!(
            EngineRegistry::new().initialize(),
            Err(CaptureError::LandmarkEngineUnavailable { .. })
        ));
    }
}
