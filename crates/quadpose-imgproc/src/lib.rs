#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// border following and contour extraction.
pub mod contours;

/// utilities to draw on images.
pub mod draw;

/// morphological operations on binary masks.
pub mod morphology;

/// module containing parallization utilities.
pub mod parallel;

/// polygon measurements and simplification.
pub mod polygon;

/// operations to threshold images.
pub mod threshold;
