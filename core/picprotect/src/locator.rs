use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use image::DynamicImage;

use crate::error::PicProtectError;
use crate::face_detector::{FaceBounds, FaceDetector};

static WORKER_SEQ: AtomicUsize = AtomicUsize::new(0);

type DetectionResult = Result<Vec<FaceBounds>, PicProtectError>;

/// Runs a [`FaceDetector`] off the calling thread.
///
/// Each call to [`FaceLocator::locate`] spawns one short-lived worker that
/// delivers exactly one result. The worker only sees its own copy of the
/// image; applying the result to editor state is left to the caller.
#[derive(Clone)]
pub struct FaceLocator {
    detector: Arc<dyn FaceDetector>,
}

impl FaceLocator {
    /// Locator that runs `detector` for every request.
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// Start detecting faces in `image`.
    ///
    /// `generation` tags the request so the receiver can tell a stale
    /// completion from the current one.
    pub fn locate(&self, image: Arc<DynamicImage>, generation: u64) -> PendingDetection {
        let (sender, receiver) = mpsc::sync_channel(1);
        let fallback = sender.clone();
        let detector = Arc::clone(&self.detector);
        let worker_id = WORKER_SEQ.fetch_add(1, Ordering::SeqCst);

        let spawned = thread::Builder::new()
            .name(format!("face-locator-{worker_id}"))
            .spawn(move || {
                let result = detector.detect(&image);
                // The receiver may be gone if the request was abandoned.
                let _ = sender.send(result);
            });

        if let Err(err) = spawned {
            log::warn!("failed to spawn face locator worker: {err}");
            let _ = fallback.send(Err(PicProtectError::DetectionFailed(format!(
                "could not start worker: {err}"
            ))));
        }

        PendingDetection {
            generation,
            receiver,
            delivered: Cell::new(false),
        }
    }
}

/// Handle to one in-flight detection request.
pub struct PendingDetection {
    generation: u64,
    receiver: Receiver<DetectionResult>,
    /// Set once `try_take` has handed out the result.
    delivered: Cell<bool>,
}

impl PendingDetection {
    /// Generation of the import that started this request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Block until the worker reports.
    pub fn wait(self) -> DetectionResult {
        self.receiver.recv().unwrap_or_else(|_| Err(worker_gone()))
    }

    /// Take the result if the worker has finished, without blocking.
    ///
    /// Yields the result exactly once; later calls return `None`.
    pub fn try_take(&self) -> Option<DetectionResult> {
        if self.delivered.get() {
            return None;
        }
        let result = match self.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(worker_gone()),
        };
        self.delivered.set(true);
        Some(result)
    }

    /// True once `try_take` has returned the result.
    pub fn is_delivered(&self) -> bool {
        self.delivered.get()
    }
}

fn worker_gone() -> PicProtectError {
    PicProtectError::DetectionFailed("detection worker exited without a result".into())
}
