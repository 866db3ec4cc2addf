//! V4L2 webcam capture via the `v4l` crate, producing RGB frames.

use std::path::Path;

use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

use crate::shared::frame::Frame;

const CAPTURE_WIDTH: u32 = 640;
const CAPTURE_HEIGHT: u32 = 480;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// 8-bit grayscale (1 byte/pixel, IR cameras).
    Grey,
}

/// An opened V4L2 capture device.
///
/// The device handle is released when the camera is dropped, on every
/// exit path.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pixel_format: PixelFormat,
}

impl std::fmt::Debug for Camera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Camera")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("device_path", &self.device_path)
            .field("pixel_format", &self.pixel_format)
            .finish_non_exhaustive()
    }
}

impl Camera {
    /// Open a V4L2 device by path (e.g. "/dev/video0").
    ///
    /// This is the only fatal startup dependency: callers abort with a
    /// clear diagnostic when it fails.
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to query capabilities: {e}")))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        log::info!(
            "opened camera {device_path} (driver: {}, card: {})",
            caps.driver,
            caps.card
        );

        // Ask for YUYV; accept GREY when the driver insists (IR cameras).
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = CAPTURE_WIDTH;
        fmt.height = CAPTURE_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let pixel_format = if negotiated.fourcc == FourCC::new(b"YUYV") {
            PixelFormat::Yuyv
        } else if negotiated.fourcc == FourCC::new(b"GREY") {
            PixelFormat::Grey
        } else {
            return Err(CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {:?} (need YUYV or GREY)",
                negotiated.fourcc
            )));
        };

        log::info!(
            "negotiated {}x{} {:?}",
            negotiated.width,
            negotiated.height,
            negotiated.fourcc
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            pixel_format,
        })
    }

    /// Capture a single frame through a short-lived stream.
    ///
    /// Used for one-shot verification (CLI); the GUI keeps a persistent
    /// stream via [`crate::capture::feed::CameraFeed`].
    pub fn capture_frame(&self) -> Result<Frame, CameraError> {
        let mut stream = self.stream()?;
        let (buf, _meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        self.frame_from_buf(buf)
    }

    pub(crate) fn stream(&self) -> Result<MmapStream<'_>, CameraError> {
        MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))
    }

    /// Convert a raw device buffer to an RGB frame.
    pub(crate) fn frame_from_buf(&self, buf: &[u8]) -> Result<Frame, CameraError> {
        let rgb = match self.pixel_format {
            PixelFormat::Yuyv => yuyv_to_rgb(buf, self.width, self.height)?,
            PixelFormat::Grey => grey_to_rgb(buf, self.width, self.height)?,
        };
        Ok(Frame::new(rgb, self.width, self.height))
    }
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; U and V are shared
/// by the pixel pair.
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CameraError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(CameraError::CaptureFailed(format!(
            "YUYV buffer too short: expected {expected}, got {}",
            yuyv.len()
        )));
    }

    let pixels = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixels * 3);
    for group in yuyv[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (group[0], group[1], group[2], group[3]);
        push_yuv_pixel(&mut rgb, y0, u, v);
        push_yuv_pixel(&mut rgb, y1, u, v);
    }
    Ok(rgb)
}

fn push_yuv_pixel(rgb: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = y + 1.402 * v;
    let g = y - 0.344_136 * u - 0.714_136 * v;
    let b = y + 1.772 * u;

    rgb.push(r.round().clamp(0.0, 255.0) as u8);
    rgb.push(g.round().clamp(0.0, 255.0) as u8);
    rgb.push(b.round().clamp(0.0, 255.0) as u8);
}

/// Replicate 8-bit grayscale across the RGB channels.
fn grey_to_rgb(grey: &[u8], width: u32, height: u32) -> Result<Vec<u8>, CameraError> {
    let pixels = (width * height) as usize;
    if grey.len() < pixels {
        return Err(CameraError::CaptureFailed(format!(
            "GREY buffer too short: expected {pixels}, got {}",
            grey.len()
        )));
    }
    let mut rgb = Vec::with_capacity(pixels * 3);
    for &g in &grey[..pixels] {
        rgb.extend_from_slice(&[g, g, g]);
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_grayscale() {
        // U = V = 128 means zero chroma: RGB equals luma.
        let yuyv = vec![100, 128, 200, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_yuyv_chroma_shifts_channels() {
        // Strong V pushes red up and green down for both pixels.
        let yuyv = vec![128, 128, 128, 255];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert!(rgb[0] > 200, "red should saturate: {}", rgb[0]);
        assert!(rgb[1] < 60, "green should drop: {}", rgb[1]);
        assert_eq!(&rgb[0..3], &rgb[3..6]); // shared chroma pair
    }

    #[test]
    fn test_yuyv_output_length() {
        let yuyv = vec![0u8; 4 * 2 * 2]; // 4x2 frame
        let rgb = yuyv_to_rgb(&yuyv, 4, 2).unwrap();
        assert_eq!(rgb.len(), 4 * 2 * 3);
    }

    #[test]
    fn test_yuyv_too_short_is_error() {
        assert!(yuyv_to_rgb(&[100, 128], 2, 1).is_err());
    }

    #[test]
    fn test_grey_replicates_channels() {
        let rgb = grey_to_rgb(&[7, 250], 2, 1).unwrap();
        assert_eq!(rgb, vec![7, 7, 7, 250, 250, 250]);
    }

    #[test]
    fn test_grey_too_short_is_error() {
        assert!(grey_to_rgb(&[1], 2, 1).is_err());
    }

    #[test]
    fn test_open_missing_device_is_device_not_found() {
        let err = Camera::open("/dev/facekey-nonexistent-video99").unwrap_err();
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
    }
}
