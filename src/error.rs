use thiserror::Error;

/// Errors surfaced while formatting a volume.
///
/// Write failures from the device abort the whole sequence; the volume is
/// left as-is (no rollback), so the failing step is carried in the error for
/// the caller to report.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{step} write failed: {source}")]
    StepFailed {
        step: &'static str,
        source: std::io::Error,
    },

    #[error("volume too small: {0} bytes")]
    VolumeTooSmall(u64),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl FormatError {
    /// Tag an I/O error with the formatting step it belongs to.
    pub(crate) fn step(step: &'static str) -> impl FnOnce(std::io::Error) -> FormatError {
        move |source| FormatError::StepFailed { step, source }
    }
}
