//! Geometric and numeric core of a region-proposal object detector.
//!
//! The crate covers the classical Faster-R-CNN anchor math: generating and
//! tiling multi-scale, multi-aspect-ratio anchor boxes, encoding and decoding
//! box regression targets, pairwise IoU, training-label assignment with
//! class balancing, and NMS-based proposal selection. Trainable layers,
//! dataset handling and the training loop live outside this crate; everything
//! here is a synchronous pure function over `ndarray` arrays.
//!
//! Boxes are `(x1, y1, x2, y2)` rows with inclusive pixel corners, so a box
//! is `x2 - x1 + 1` pixels wide. Every filtering step returns the surviving
//! subset together with the original indices it kept, so labels, scores and
//! ground-truth match indices stay aligned across stages.

pub mod config;
pub mod error;
pub mod processing;

pub use crate::config::RpnConfig;
pub use crate::error::{Error, Result};
pub use crate::processing::ImageShape;
