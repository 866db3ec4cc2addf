pub const DETECTOR_MODEL_NAME: &str = "blazeface_short_range.onnx";
pub const DETECTOR_MODEL_URL: &str =
    "https://github.com/facekey/facekey/releases/download/v0.1.0/blazeface_short_range.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "w600k_r50.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/facekey/facekey/releases/download/v0.1.0/w600k_r50.onnx";

/// Enrollment photos must carry one of these extensions (case-insensitive).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Maximum Euclidean distance for two embeddings to count as the same
/// identity. Model-dependent; this default suits the bundled embedder.
pub const DEFAULT_THRESHOLD: f32 = 10.0;

pub const DEFAULT_ENROLL_DIR: &str = "auth";
pub const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
