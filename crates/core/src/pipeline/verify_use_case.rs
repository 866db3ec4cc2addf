//! One verification attempt: frame -> embedding -> match -> unlock.

use std::sync::Arc;

use crate::embedder::domain::face_embedder::{EmbedderError, FaceEmbedder};
use crate::enrollment::Gallery;
use crate::matching::{match_gallery, MatchDecision, MatchPolicy};
use crate::shared::frame::Frame;
use crate::unlock::UnlockAction;

/// Outcome of a single verification attempt, rendered to the user as-is.
#[derive(Clone, Debug, PartialEq)]
pub enum VerifyOutcome {
    Granted { label: String },
    Denied,
    NoFaceDetected,
    Error { message: String },
}

impl std::fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyOutcome::Granted { label } => write!(f, "Access granted to: {label}"),
            VerifyOutcome::Denied => write!(f, "Access denied (no match)"),
            VerifyOutcome::NoFaceDetected => write!(f, "No face detected"),
            VerifyOutcome::Error { message } => write!(f, "{message}"),
        }
    }
}

/// The verification pipeline, built once at startup around the immutable
/// gallery and handed to every verify attempt.
pub struct VerifyUseCase {
    embedder: Arc<dyn FaceEmbedder>,
    gallery: Arc<Gallery>,
    unlock: Arc<dyn UnlockAction>,
    threshold: f32,
    policy: MatchPolicy,
}

impl VerifyUseCase {
    pub fn new(
        embedder: Arc<dyn FaceEmbedder>,
        gallery: Arc<Gallery>,
        unlock: Arc<dyn UnlockAction>,
        threshold: f32,
        policy: MatchPolicy,
    ) -> Self {
        Self {
            embedder,
            gallery,
            unlock,
            threshold,
            policy,
        }
    }

    /// Run one attempt against a live frame.
    ///
    /// Failures are contained here: every path produces an outcome value,
    /// nothing propagates to the caller. The unlock action fires exactly
    /// once, only on `Granted`.
    pub fn execute(&self, frame: &Frame) -> VerifyOutcome {
        let detections = match self.embedder.represent(frame, false) {
            Ok(detections) => detections,
            Err(EmbedderError::NoFaceDetected) => return VerifyOutcome::NoFaceDetected,
            Err(e) => {
                log::error!("verification error: {e}");
                return VerifyOutcome::Error {
                    message: "Error verifying face".to_string(),
                };
            }
        };

        let Some(live) = detections.first() else {
            return VerifyOutcome::NoFaceDetected;
        };

        match match_gallery(
            &live.embedding,
            self.gallery.faces(),
            self.threshold,
            self.policy,
        ) {
            MatchDecision::Granted { label } => {
                self.unlock.trigger();
                VerifyOutcome::Granted { label }
            }
            MatchDecision::Denied => VerifyOutcome::Denied,
        }
    }
}
