/// Error types used for morphological operations.
pub mod error;
pub use error::MorphologyError;

/// Kernel (structuring element) utilities.
pub mod kernel;
pub use kernel::{Kernel, KernelShape};

/// Dilation, erosion and their compositions.
pub mod ops;
pub use ops::{close, dilate, erode, open};
