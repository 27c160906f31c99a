use thiserror::Error;

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Failures surfaced to the host by the device and its rendering libraries.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The host refused to register the device.
    #[error("failed to start graphics device: {0}")]
    DeviceInit(String),

    /// The call violates the device lifecycle (no page, closed device, single-page device).
    #[error("invalid device state: {0}")]
    InvalidState(String),

    /// The linked rendering library cannot do what was asked.
    #[error("unsupported by rendering library: {0}")]
    UnsupportedFeature(String),

    #[error("invalid color descriptor: '{0}'")]
    InvalidColor(String),

    #[error("invalid geometry descriptor: '{0}'")]
    InvalidGeometry(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rendering library error: {0}")]
    Backend(Box<dyn std::error::Error + Send + Sync>),
}

impl DeviceError {
    pub(crate) fn no_page() -> Self {
        DeviceError::InvalidState("graphics device has zero pages".into())
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Backend(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<cairo::Error> for DeviceError {
    fn from(err: cairo::Error) -> Self {
        DeviceError::Backend(Box::new(err))
    }
}

#[cfg(feature = "cairo")]
impl From<cairo::BorrowError> for DeviceError {
    fn from(err: cairo::BorrowError) -> Self {
        DeviceError::Backend(Box::new(err))
    }
}

#[cfg(feature = "svg")]
impl From<png::EncodingError> for DeviceError {
    fn from(err: png::EncodingError) -> Self {
        DeviceError::Backend(Box::new(err))
    }
}
