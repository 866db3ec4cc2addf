use thiserror::Error;

use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

#[derive(Error, Debug)]
pub enum EmbedderError {
    /// Strict mode only: the frame contained no usable face.
    #[error("no face detected")]
    NoFaceDetected,
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// One detected face: where it is and who it looks like.
#[derive(Clone, Debug)]
pub struct Detection {
    pub region: Region,
    pub embedding: Embedding,
}

/// Capability interface over the face embedding model.
///
/// The concrete model and detector backend stay swappable behind this
/// trait; callers never see sessions or tensors. With `strict` set,
/// failing to find a face is an error rather than an empty result.
pub trait FaceEmbedder: Send + Sync {
    fn represent(&self, frame: &Frame, strict: bool) -> Result<Vec<Detection>, EmbedderError>;
}
