use thiserror::Error;

/// Enumeration representing the various errors that can occur within graft.
#[derive(Debug, Error)]
pub enum GraftError {
    /// Operands or parameters have incompatible dimensions
    #[error("{0}")]
    ShapeError(Box<str>),
    /// Argument is outside of its valid range
    #[error("Invalid value {0}")]
    ValueError(Box<str>),
    /// Error parsing json document
    #[error("Parse {0}")]
    ParseError(Box<str>),
    /// Error from file operations
    #[error("IO {0}")]
    IOError(#[from] std::io::Error),
    /// Invalid configuration
    #[error("Config {0}")]
    ConfigError(Box<str>),
    /// Device memory error
    #[error("Device {0}")]
    DeviceError(Box<str>),
}

impl GraftError {
    /// Shape error
    #[track_caller]
    pub fn shape_error(e: Box<str>) -> Self {
        Self::ShapeError(with_location(e))
    }

    /// Value error
    #[track_caller]
    pub fn value_error(e: Box<str>) -> Self {
        Self::ValueError(with_location(e))
    }

    /// Parse error
    #[track_caller]
    pub fn parse_error(e: Box<str>) -> Self {
        Self::ParseError(with_location(e))
    }

    /// Device error
    #[track_caller]
    pub fn device_error(e: Box<str>) -> Self {
        Self::DeviceError(with_location(e))
    }
}

#[track_caller]
fn with_location(e: Box<str>) -> Box<str> {
    let location = std::panic::Location::caller();
    format!("{e}, {}:{}:{}", location.file(), location.line(), location.column()).into()
}

impl From<nanoserde::DeJsonErr> for GraftError {
    #[track_caller]
    fn from(value: nanoserde::DeJsonErr) -> Self {
        Self::parse_error(format!("{value:?}").into())
    }
}
