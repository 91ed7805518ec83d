pub type MosaicResult<T> = Result<T, MosaicError>;

/// Errors surfaced while packing clips, compiling kernels, dispatching a
/// render or reading results back.
#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    /// An argument failed validation (dimensions, ranges, byte lengths).
    #[error("validation error: {0}")]
    Validation(String),

    /// A real-valued field cannot be quantized into `i32` at the requested
    /// precision.
    #[error("fixed-point overflow: {0}")]
    PrecisionOverflow(String),

    /// A render was requested with no clips and no base image.
    #[error("empty clip set: no clips and no base image")]
    EmptyClipSet,

    /// A compute kernel failed to build on the acquired device.
    #[error("kernel compile error: {0}")]
    KernelCompile(String),

    /// No usable accelerated device could be acquired.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Copying or mapping a rendered canvas back to the host failed.
    #[error("device readback error: {0}")]
    DeviceReadback(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MosaicError {
    /// Build a [`MosaicError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MosaicError::PrecisionOverflow`] value.
    pub fn precision_overflow(msg: impl Into<String>) -> Self {
        Self::PrecisionOverflow(msg.into())
    }

    /// Build a [`MosaicError::KernelCompile`] value.
    pub fn kernel_compile(msg: impl Into<String>) -> Self {
        Self::KernelCompile(msg.into())
    }

    /// Build a [`MosaicError::DeviceUnavailable`] value.
    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    /// Build a [`MosaicError::DeviceReadback`] value.
    pub fn device_readback(msg: impl Into<String>) -> Self {
        Self::DeviceReadback(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
