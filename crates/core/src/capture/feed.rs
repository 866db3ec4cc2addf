//! Single owner of the camera: a capture thread that keeps the newest
//! frame available to any number of readers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::v4l_camera::Camera;
use crate::shared::frame::Frame;

/// How long the capture thread backs off after a failed dequeue before
/// re-opening the stream.
const RETRY_DELAY: Duration = Duration::from_millis(250);

/// How long `drop` waits for the capture thread before detaching it.
/// A wedged device can block a dequeue forever; shutdown must not.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Owns the [`Camera`] on a dedicated thread, continuously overwriting a
/// shared latest-frame slot. Display refresh and verification both read
/// the same slot, so the device is never polled from two places.
///
/// Dropping the feed stops the thread, waiting at most [`STOP_TIMEOUT`]
/// before detaching it and letting process exit reclaim the device.
pub struct CameraFeed {
    latest: Arc<Mutex<Option<Frame>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    done: Mutex<mpsc::Receiver<()>>,
}

impl CameraFeed {
    /// Take ownership of an opened camera and start capturing.
    pub fn start(camera: Camera) -> Self {
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (done_tx, done) = mpsc::channel();

        let thread_latest = Arc::clone(&latest);
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            // Held for the thread's lifetime; dropping it signals exit.
            let _done = done_tx;
            capture_loop(camera, &thread_latest, &thread_stop);
        });

        Self {
            latest,
            stop,
            handle: Some(handle),
            done: Mutex::new(done),
        }
    }
}

/// Wait for the capture thread to hang up its end of `done`.
///
/// Returns false on timeout, in which case the thread must be detached
/// rather than joined.
fn wait_for_exit(done: &mpsc::Receiver<()>, timeout: Duration) -> bool {
    match done.recv_timeout(timeout) {
        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => true,
        Err(mpsc::RecvTimeoutError::Timeout) => false,
    }
}

fn capture_loop(camera: Camera, latest: &Mutex<Option<Frame>>, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) {
        let mut stream = match camera.stream() {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("camera stream unavailable: {e}");
                std::thread::sleep(RETRY_DELAY);
                continue;
            }
        };

        loop {
            if stop.load(Ordering::Relaxed) {
                return;
            }
            let frame = match v4l::io::traits::CaptureStream::next(&mut stream) {
                Ok((buf, _meta)) => camera.frame_from_buf(buf),
                Err(e) => {
                    log::warn!("frame dequeue failed: {e}");
                    break; // re-open the stream after a backoff
                }
            };
            match frame {
                Ok(frame) => {
                    if let Ok(mut slot) = latest.lock() {
                        *slot = Some(frame);
                    }
                }
                Err(e) => log::warn!("frame conversion failed: {e}"),
            }
        }
        std::thread::sleep(RETRY_DELAY);
    }
}

impl FrameSource for CameraFeed {
    fn current_frame(&self) -> Option<Frame> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let done = self.done.get_mut().unwrap_or_else(|e| e.into_inner());
            if wait_for_exit(done, STOP_TIMEOUT) {
                let _ = handle.join();
            } else {
                log::warn!("capture thread still blocked after {STOP_TIMEOUT:?}; detaching");
            }
        }
    }
}
