use ndarray::ArrayView3;

/// A single camera or image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only (camera buffers, image
/// files); the rest of the crate treats pixel data as opaque RGB.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, 3),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Expand to RGBA bytes (alpha = 255) for GUI image surfaces.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let pixels = (self.width * self.height) as usize;
        let mut rgba = Vec::with_capacity(pixels * 4);
        for px in self.data.chunks_exact(3) {
            rgba.extend_from_slice(px);
            rgba.push(255);
        }
        rgba
    }
}
