//! ONNX-backed face embedder: BlazeFace detection + ArcFace-style
//! embedding extraction behind the [`FaceEmbedder`] capability trait.
use std::path::Path;
use std::sync::Mutex;

use crate::embedder::domain::face_embedder::{Detection, EmbedderError, FaceEmbedder};
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// BlazeFace (short-range) model input resolution.
const DETECTOR_INPUT_SIZE: u32 = 128;

/// Embedding model input resolution.
const EMBED_INPUT_SIZE: usize = 112;

/// Embedding preprocessing uses symmetric (x - 127.5) / 127.5 normalization.
const EMBED_NORM_MEAN: f32 = 127.5;
const EMBED_NORM_STD: f32 = 127.5;

/// Number of BlazeFace anchors (short-range model).
const NUM_ANCHORS: usize = 896;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.3;

pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Face embedder backed by two ONNX Runtime sessions.
///
/// Sessions sit behind mutexes so one embedder instance can serve both
/// the GUI verify worker and enrollment loading.
pub struct OnnxFaceEmbedder {
    detector: Mutex<ort::session::Session>,
    embedder: Mutex<ort::session::Session>,
    anchors: Vec<[f32; 2]>,
    confidence: f64,
}

impl OnnxFaceEmbedder {
    /// Load the detector and embedding models from the given paths.
    pub fn new(
        detector_path: &Path,
        embedder_path: &Path,
        confidence: f64,
    ) -> Result<Self, EmbedderError> {
        let detector = load_session(detector_path)?;
        let embedder = load_session(embedder_path)?;
        log::info!(
            "loaded ONNX embedder (detector: {}, embedder: {})",
            detector_path.display(),
            embedder_path.display()
        );
        Ok(Self {
            detector: Mutex::new(detector),
            embedder: Mutex::new(embedder),
            anchors: generate_anchors(),
            confidence,
        })
    }

    /// Detect face regions in a frame via BlazeFace anchor decoding.
    fn detect(&self, frame: &Frame) -> Result<Vec<Region>, EmbedderError> {
        let input = preprocess_frame(frame, DETECTOR_INPUT_SIZE);
        let input_value =
            ort::value::Tensor::from_array(input).map_err(|e| inference_error("detector", &e))?;

        let mut session = self
            .detector
            .lock()
            .map_err(|e| EmbedderError::Inference(format!("detector lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| inference_error("detector", &e))?;

        // BlazeFace outputs two tensors:
        // - regressors: [1, 896, 16] (box deltas + keypoints)
        // - classificators: [1, 896, 1] (confidence scores)
        if outputs.len() < 2 {
            return Err(EmbedderError::Inference(format!(
                "detector expected 2 outputs, got {}",
                outputs.len()
            )));
        }
        let regressors = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| inference_error("detector", &e))?;
        let scores = outputs[1]
            .try_extract_array::<f32>()
            .map_err(|e| inference_error("detector", &e))?;
        let reg_data = regressors
            .as_slice()
            .ok_or_else(|| EmbedderError::Inference("cannot view regressor slice".into()))?;
        let score_data = scores
            .as_slice()
            .ok_or_else(|| EmbedderError::Inference("cannot view score slice".into()))?;

        let mut regions = decode_anchors(
            reg_data,
            score_data,
            &self.anchors,
            self.confidence,
            frame.width(),
            frame.height(),
        );
        Ok(nms(&mut regions, NMS_IOU_THRESH))
    }

    /// Extract an embedding from one detected face crop.
    fn embed(&self, frame: &Frame, region: &Region) -> Result<Embedding, EmbedderError> {
        let (crop, cw, ch) = crop_region(frame, region);
        let input = preprocess_crop(&crop, cw, ch);
        let input_value =
            ort::value::Tensor::from_array(input).map_err(|e| inference_error("embedder", &e))?;

        let mut session = self
            .embedder
            .lock()
            .map_err(|e| EmbedderError::Inference(format!("embedder lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| inference_error("embedder", &e))?;

        let embedding_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| inference_error("embedder", &e))?;
        let values = embedding_array
            .as_slice()
            .ok_or_else(|| EmbedderError::Inference("cannot view embedding slice".into()))?
            .to_vec();

        // Raw model output, deliberately not L2-normalized: distances stay
        // on the model's native Euclidean scale.
        Ok(Embedding::new(values))
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn represent(&self, frame: &Frame, strict: bool) -> Result<Vec<Detection>, EmbedderError> {
        let regions = self.detect(frame)?;
        if regions.is_empty() {
            return if strict {
                Err(EmbedderError::NoFaceDetected)
            } else {
                Ok(Vec::new())
            };
        }

        regions
            .into_iter()
            .map(|region| {
                let embedding = self.embed(frame, &region)?;
                Ok(Detection { region, embedding })
            })
            .collect()
    }
}

fn load_session(path: &Path) -> Result<ort::session::Session, EmbedderError> {
    if !path.exists() {
        return Err(EmbedderError::ModelNotFound(path.display().to_string()));
    }
    ort::session::Session::builder()
        .and_then(|b| b.with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3))
        .and_then(|b| b.with_intra_threads(2))
        .and_then(|b| b.commit_from_file(path))
        .map_err(|e| EmbedderError::Inference(format!("session load failed: {e}")))
}

fn inference_error(stage: &str, e: &dyn std::fmt::Display) -> EmbedderError {
    EmbedderError::Inference(format!("{stage}: {e}"))
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize a frame to `size × size`, normalize to [0,1], NCHW float32.
fn preprocess_frame(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, s, s));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Resize an RGB face crop to 112×112, symmetric normalization, NCHW.
fn preprocess_crop(rgb_data: &[u8], width: u32, height: u32) -> ndarray::Array4<f32> {
    let src_w = width as usize;
    let src_h = height as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, EMBED_INPUT_SIZE, EMBED_INPUT_SIZE));

    for y in 0..EMBED_INPUT_SIZE {
        let src_y =
            (((y as f64 + 0.5) * src_h as f64 / EMBED_INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..EMBED_INPUT_SIZE {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / EMBED_INPUT_SIZE as f64) as usize)
                .min(src_w - 1);
            let offset = (src_y * src_w + src_x) * 3;
            if offset + 2 < rgb_data.len() {
                for c in 0..3 {
                    tensor[[0, c, y, x]] =
                        (rgb_data[offset + c] as f32 - EMBED_NORM_MEAN) / EMBED_NORM_STD;
                }
            }
        }
    }

    tensor
}

/// Copy the region's pixels out of the frame as a contiguous RGB buffer.
///
/// The region is re-clamped to the frame; degenerate regions collapse to a
/// single pixel rather than producing an empty buffer.
fn crop_region(frame: &Frame, region: &Region) -> (Vec<u8>, u32, u32) {
    let fw = frame.width() as i32;
    let fh = frame.height() as i32;

    let x0 = region.x.clamp(0, fw - 1);
    let y0 = region.y.clamp(0, fh - 1);
    let x1 = (region.x + region.width).clamp(x0 + 1, fw);
    let y1 = (region.y + region.height).clamp(y0 + 1, fh);

    let cw = (x1 - x0) as usize;
    let ch = (y1 - y0) as usize;
    let src = frame.data();
    let stride = fw as usize * 3;

    let mut crop = Vec::with_capacity(cw * ch * 3);
    for y in y0 as usize..y1 as usize {
        let start = y * stride + x0 as usize * 3;
        crop.extend_from_slice(&src[start..start + cw * 3]);
    }

    (crop, cw as u32, ch as u32)
}

// ---------------------------------------------------------------------------
// Anchor generation and decoding (BlazeFace short-range)
// ---------------------------------------------------------------------------

/// Generate BlazeFace anchors for the short-range model.
///
/// Two feature map sizes, 16×16 and 8×8, with 2 and 6 anchors per cell.
fn generate_anchors() -> Vec<[f32; 2]> {
    let strides = [(8, 2), (16, 6)]; // (stride, anchors_per_cell)
    let mut anchors = Vec::with_capacity(NUM_ANCHORS);

    for &(stride, num) in &strides {
        let grid_size = DETECTOR_INPUT_SIZE as usize / stride;
        for y in 0..grid_size {
            for x in 0..grid_size {
                let cx = (x as f32 + 0.5) / grid_size as f32;
                let cy = (y as f32 + 0.5) / grid_size as f32;
                for _ in 0..num {
                    anchors.push([cx, cy]);
                }
            }
        }
    }

    anchors
}

fn decode_anchors(
    reg_data: &[f32],
    score_data: &[f32],
    anchors: &[[f32; 2]],
    confidence: f64,
    frame_w: u32,
    frame_h: u32,
) -> Vec<Region> {
    let mut regions = Vec::new();
    let num_anchors = anchors.len().min(NUM_ANCHORS);

    for (i, &raw_score) in score_data.iter().enumerate().take(num_anchors) {
        let score = sigmoid(raw_score);
        if (score as f64) < confidence {
            continue;
        }

        let anchor = &anchors[i];
        let reg_offset = i * 16;
        if reg_offset + 4 > reg_data.len() {
            break;
        }

        // Box center + size relative to the anchor
        let cx = anchor[0] + reg_data[reg_offset] / DETECTOR_INPUT_SIZE as f32;
        let cy = anchor[1] + reg_data[reg_offset + 1] / DETECTOR_INPUT_SIZE as f32;
        let w = reg_data[reg_offset + 2] / DETECTOR_INPUT_SIZE as f32;
        let h = reg_data[reg_offset + 3] / DETECTOR_INPUT_SIZE as f32;

        // Convert to frame coordinates, clamped to the frame
        let x1 = ((cx - w / 2.0) * frame_w as f32).max(0.0);
        let y1 = ((cy - h / 2.0) * frame_h as f32).max(0.0);
        let x2 = ((cx + w / 2.0) * frame_w as f32).min(frame_w as f32);
        let y2 = ((cy + h / 2.0) * frame_h as f32).min(frame_h as f32);

        regions.push(Region {
            x: x1 as i32,
            y: y1 as i32,
            width: (x2 - x1) as i32,
            height: (y2 - y1) as i32,
            confidence: score,
        });
    }

    regions
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

fn nms(regions: &mut [Region], iou_thresh: f64) -> Vec<Region> {
    regions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; regions.len()];

    for i in 0..regions.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(regions[i].clone());
        for j in (i + 1)..regions.len() {
            if suppressed[j] {
                continue;
            }
            if regions[i].iou(&regions[j]) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_frame_shape() {
        let data = vec![128u8; 200 * 100 * 3];
        let frame = Frame::new(data, 200, 100);
        let tensor = preprocess_frame(&frame, 128);
        assert_eq!(tensor.shape(), &[1, 3, 128, 128]);
    }

    #[test]
    fn test_preprocess_frame_normalized() {
        let data = vec![255u8; 50 * 50 * 3];
        let frame = Frame::new(data, 50, 50);
        let tensor = preprocess_frame(&frame, 128);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_crop_shape() {
        let data = vec![128u8; 50 * 50 * 3];
        let tensor = preprocess_crop(&data, 50, 50);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_crop_symmetric_normalization() {
        let data = vec![255u8; 10 * 10 * 3];
        let tensor = preprocess_crop(&data, 10, 10);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.01);

        let data = vec![0u8; 10 * 10 * 3];
        let tensor = preprocess_crop(&data, 10, 10);
        assert!((tensor[[0, 0, 0, 0]] - (-1.0)).abs() < 0.01);
    }

    #[test]
    fn test_crop_region_extracts_pixels() {
        // 4x4 frame, mark pixel (2,1) red
        let mut data = vec![0u8; 4 * 4 * 3];
        data[(1 * 4 + 2) * 3] = 255;
        let frame = Frame::new(data, 4, 4);

        let region = Region {
            x: 2,
            y: 1,
            width: 2,
            height: 2,
            confidence: 0.9,
        };
        let (crop, cw, ch) = crop_region(&frame, &region);
        assert_eq!((cw, ch), (2, 2));
        assert_eq!(crop.len(), 2 * 2 * 3);
        assert_eq!(crop[0], 255); // top-left of crop is the marked pixel
    }

    #[test]
    fn test_crop_region_clamps_to_frame() {
        let frame = Frame::new(vec![0u8; 4 * 4 * 3], 4, 4);
        let region = Region {
            x: 3,
            y: 3,
            width: 10,
            height: 10,
            confidence: 0.5,
        };
        let (crop, cw, ch) = crop_region(&frame, &region);
        assert_eq!((cw, ch), (1, 1));
        assert_eq!(crop.len(), 3);
    }

    #[test]
    fn test_generate_anchors_count() {
        // 16×16 grid × 2 anchors + 8×8 grid × 6 anchors = 512 + 384 = 896
        assert_eq!(generate_anchors().len(), NUM_ANCHORS);
    }

    #[test]
    fn test_anchors_in_unit_range() {
        for a in &generate_anchors() {
            assert!(a[0] > 0.0 && a[0] < 1.0);
            assert!(a[1] > 0.0 && a[1] < 1.0);
        }
    }

    #[test]
    fn test_sigmoid_midpoint_and_saturation() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!((sigmoid(10.0) - 1.0).abs() < 0.001);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_decode_anchors_filters_by_confidence() {
        let anchors = generate_anchors();
        // All scores far below the sigmoid midpoint: nothing passes 0.5
        let scores = vec![-10.0f32; NUM_ANCHORS];
        let regs = vec![0.0f32; NUM_ANCHORS * 16];
        let dets = decode_anchors(&regs, &scores, &anchors, 0.5, 640, 480);
        assert!(dets.is_empty());
    }

    #[test]
    fn test_decode_anchors_produces_frame_coords() {
        let anchors = generate_anchors();
        let mut scores = vec![-10.0f32; NUM_ANCHORS];
        scores[0] = 10.0; // one confident anchor
        let mut regs = vec![0.0f32; NUM_ANCHORS * 16];
        regs[2] = 32.0; // width delta
        regs[3] = 32.0; // height delta
        let regions = decode_anchors(&regs, &scores, &anchors, 0.5, 640, 480);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert!(r.x >= 0 && r.x + r.width <= 640);
        assert!(r.y >= 0 && r.y + r.height <= 480);
        assert!(r.width > 0 && r.height > 0);
        assert!(r.confidence > 0.5);
    }

    fn region(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> Region {
        Region {
            x,
            y,
            width: w,
            height: h,
            confidence,
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping() {
        let mut regions = vec![
            region(0, 0, 100, 100, 0.9),
            region(5, 5, 100, 100, 0.7),
        ];
        let kept = nms(&mut regions, 0.3);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 1e-6); // the stronger box wins
    }

    #[test]
    fn test_nms_keeps_separate() {
        let mut regions = vec![
            region(0, 0, 50, 50, 0.9),
            region(200, 200, 50, 50, 0.8),
        ];
        assert_eq!(nms(&mut regions, 0.3).len(), 2);
    }

    #[test]
    fn test_nms_suppression_agrees_with_region_iou() {
        // Overlap just over the threshold is suppressed, just under is kept.
        let a = region(0, 0, 100, 100, 0.9);
        let over = region(20, 0, 100, 100, 0.8);
        let under = region(60, 0, 100, 100, 0.8);
        assert!(a.iou(&over) > 0.3);
        assert!(a.iou(&under) < 0.3);

        assert_eq!(nms(&mut [a.clone(), over], 0.3).len(), 1);
        assert_eq!(nms(&mut [a, under], 0.3).len(), 2);
    }
}
