/// Errors related to morphological operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MorphologyError {
    /// The provided kernel has a zero dimension.
    #[error("Kernel must have a non-zero size, got {0}x{1}")]
    EmptyKernel(usize, usize),

    /// The kernel data does not match its declared size.
    #[error("Kernel data length ({0}) does not match its size ({1})")]
    KernelShapeMismatch(usize, usize),

    /// The kernel must have odd dimensions so that it has a centre element.
    #[error("Kernel dimensions must be odd, got {0}x{1}")]
    EvenSizedKernel(usize, usize),

    /// All elements in the kernel are inactive.
    #[error("Kernel has no active elements")]
    AllKernelElementsInactive,

    /// The source and destination images differ in size.
    #[error(transparent)]
    Image(#[from] quadpose_image::ImageError),
}
