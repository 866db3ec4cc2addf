//! Face-verified app launching: enrollment, embedding, matching, capture.
//!
//! The embedding model is an opaque capability behind [`embedder::domain`];
//! everything above it works in terms of [`shared::frame::Frame`] and
//! [`shared::embedding::Embedding`] values.

pub mod capture;
pub mod embedder;
pub mod enrollment;
pub mod matching;
pub mod pipeline;
pub mod shared;
pub mod unlock;
