use thiserror::Error;

/// Shape and configuration errors reported before a tensor reaches the backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("{input}: expected {expected} channels, got {actual}")]
    ChannelMismatch {
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{input}: spatial size {height}x{width} is not a non-zero multiple of {multiple}")]
    SpatialSize {
        input: &'static str,
        height: usize,
        width: usize,
        multiple: usize,
    },

    #[error("{input}: shape {actual:?} does not match {expected:?}")]
    ShapeMismatch {
        input: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("quality vector must have shape [batch, 1, {expected}], got {actual:?}")]
    QualityShape { expected: usize, actual: Vec<usize> },

    #[error("{side}: discriminator expects {discriminator} channels, generator has {generator}")]
    IncompatiblePair {
        side: &'static str,
        generator: usize,
        discriminator: usize,
    },

    #[error("{field} must be greater than zero")]
    ZeroSized { field: &'static str },

    #[error("dropout probability {0} is outside [0, 1)")]
    Dropout(f64),
}
