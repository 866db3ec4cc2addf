use crate::shared::frame::Frame;

/// Read-most-recent-frame access to the camera.
///
/// The display tick and the verify action both consume this instead of
/// issuing their own device reads; a single owner does the capturing.
pub trait FrameSource: Send + Sync {
    /// The newest captured frame, or `None` before the first frame lands.
    fn current_frame(&self) -> Option<Frame>;
}
