//! Enrollment gallery: reference photos loaded once at startup.

use std::path::Path;

use crate::embedder::domain::face_embedder::FaceEmbedder;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::embedding::Embedding;
use crate::shared::frame::Frame;

/// One enrolled identity: the source file name and its embedding.
#[derive(Clone, Debug)]
pub struct EnrolledFace {
    pub label: String,
    pub embedding: Embedding,
}

/// The immutable set of enrolled faces for the lifetime of the process.
#[derive(Clone, Debug, Default)]
pub struct Gallery {
    faces: Vec<EnrolledFace>,
}

impl Gallery {
    pub fn from_faces(faces: Vec<EnrolledFace>) -> Self {
        Self { faces }
    }

    /// Load every usable reference photo from `dir`.
    ///
    /// Only `jpg`/`jpeg`/`png` entries are considered. Each candidate is
    /// embedded in strict mode; files that cannot be read, decoded, or that
    /// contain no detectable face are logged and skipped. The load itself
    /// never fails: a missing or empty directory yields an empty gallery,
    /// and every later match attempt is simply denied.
    pub fn load(dir: &Path, embedder: &dyn FaceEmbedder) -> Gallery {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("cannot read enrollment directory {}: {e}", dir.display());
                return Gallery::default();
            }
        };

        let mut faces = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !has_image_extension(&path) {
                continue;
            }
            let label = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };

            match embed_file(&path, embedder) {
                Ok(embedding) => {
                    log::info!("embedded {label}");
                    faces.push(EnrolledFace { label, embedding });
                }
                Err(e) => {
                    log::warn!("failed to process {label}: {e}");
                }
            }
        }

        if faces.is_empty() {
            log::warn!(
                "no enrolled faces loaded from {}; all verifications will be denied",
                dir.display()
            );
        }

        Gallery { faces }
    }

    pub fn faces(&self) -> &[EnrolledFace] {
        &self.faces
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn embed_file(
    path: &Path,
    embedder: &dyn FaceEmbedder,
) -> Result<Embedding, Box<dyn std::error::Error>> {
    let img = image::open(path)?.to_rgb8();
    let (w, h) = img.dimensions();
    let frame = Frame::new(img.into_raw(), w, h);

    // Strict mode: exactly a usable face is required in a reference photo.
    let detections = embedder.represent(&frame, true)?;
    let first = detections
        .into_iter()
        .next()
        .ok_or("strict represent returned no detections")?;
    Ok(first.embedding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::domain::face_embedder::{Detection, EmbedderError};
    use crate::shared::region::Region;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    /// Embedder that derives the embedding from the frame's first pixel,
    /// and treats all-black frames as face-less.
    struct PixelEmbedder;

    impl FaceEmbedder for PixelEmbedder {
        fn represent(
            &self,
            frame: &Frame,
            strict: bool,
        ) -> Result<Vec<Detection>, EmbedderError> {
            let px = &frame.data()[..3];
            if px == [0, 0, 0] {
                return if strict {
                    Err(EmbedderError::NoFaceDetected)
                } else {
                    Ok(Vec::new())
                };
            }
            Ok(vec![Detection {
                region: Region {
                    x: 0,
                    y: 0,
                    width: frame.width() as i32,
                    height: frame.height() as i32,
                    confidence: 1.0,
                },
                embedding: Embedding::new(vec![px[0] as f32, px[1] as f32, px[2] as f32]),
            }])
        }
    }

    fn write_image(dir: &Path, name: &str, color: [u8; 3]) {
        let img = RgbImage::from_pixel(8, 8, Rgb(color));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_load_collects_labels_and_embeddings() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "alice.jpg", [200, 10, 10]);
        write_image(tmp.path(), "bob.png", [10, 200, 10]);

        let gallery = Gallery::load(tmp.path(), &PixelEmbedder);
        assert_eq!(gallery.len(), 2);

        let mut labels: Vec<_> = gallery.faces().iter().map(|f| f.label.as_str()).collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["alice.jpg", "bob.png"]);
    }

    #[test]
    fn test_load_ignores_non_image_extensions() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "alice.jpg", [200, 10, 10]);
        std::fs::write(tmp.path().join("notes.txt"), b"not an image").unwrap();
        std::fs::write(tmp.path().join("photo.bmp"), b"wrong format").unwrap();

        let gallery = Gallery::load(tmp.path(), &PixelEmbedder);
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.faces()[0].label, "alice.jpg");
    }

    #[test]
    fn test_load_accepts_uppercase_extensions() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "carol.JPG", [10, 10, 200]);

        let gallery = Gallery::load(tmp.path(), &PixelEmbedder);
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.faces()[0].label, "carol.JPG");
    }

    #[test]
    fn test_load_skips_corrupt_file_keeps_valid_one() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "alice.jpg", [200, 10, 10]);
        std::fs::write(tmp.path().join("broken.jpg"), b"definitely not a jpeg").unwrap();

        let gallery = Gallery::load(tmp.path(), &PixelEmbedder);
        assert_eq!(gallery.len(), 1);
        assert_eq!(gallery.faces()[0].label, "alice.jpg");
    }

    #[test]
    fn test_load_skips_faceless_image() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "blank.png", [0, 0, 0]); // PixelEmbedder: no face

        let gallery = Gallery::load(tmp.path(), &PixelEmbedder);
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_load_missing_directory_yields_empty_gallery() {
        let tmp = TempDir::new().unwrap();
        let gallery = Gallery::load(&tmp.path().join("does-not-exist"), &PixelEmbedder);
        assert!(gallery.is_empty());
    }

    #[test]
    fn test_embedding_values_come_from_source_image() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "alice.png", [200, 10, 10]);

        let gallery = Gallery::load(tmp.path(), &PixelEmbedder);
        assert_eq!(gallery.faces()[0].embedding.values, vec![200.0, 10.0, 10.0]);
    }
}
