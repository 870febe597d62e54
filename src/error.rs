use std::fmt;

//===========================================================================//

/// The result type returned by parsing and decoding operations.
pub type BmpResult<T> = Result<T, BmpError>;

//===========================================================================//

/// An error encountered while parsing or decoding an ICO or BMP image.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum BmpError {
    /// The host could not provide pixel storage for the decoded image.
    #[error("insufficient memory for a {width}x{height} bitmap")]
    InsufficientMemory {
        /// Requested bitmap width, in pixels.
        width: u32,
        /// Requested bitmap height, in pixels.
        height: u32,
    },
    /// The input ended before all of the declared data could be read.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
    /// A read fell outside of the input buffer.
    #[error(
        "read of {len} bytes at offset {offset} is out of bounds \
         (buffer has {available} bytes)"
    )]
    OutOfBounds {
        /// Offset of the attempted read.
        offset: usize,
        /// Number of bytes requested.
        len: usize,
        /// Length of the buffer.
        available: usize,
    },
    /// A container or file header has the wrong magic or type fields.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The data is structurally invalid or uses an unsupported feature.
    #[error("invalid data: {0}")]
    DataError(String),
}

impl BmpError {
    /// Returns the coarse result code a host application branches on.
    pub fn code(&self) -> ErrorCode {
        match *self {
            BmpError::InsufficientMemory { .. } => {
                ErrorCode::InsufficientMemory
            }
            BmpError::InsufficientData(_) | BmpError::OutOfBounds { .. } => {
                ErrorCode::InsufficientData
            }
            BmpError::InvalidHeader(_) | BmpError::DataError(_) => {
                ErrorCode::DataError
            }
        }
    }
}

//===========================================================================//

/// The failure codes reported to host applications.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorCode {
    /// Pixel storage could not be allocated.
    InsufficientMemory,
    /// The input is truncated relative to its declared sizes.
    InsufficientData,
    /// The input is malformed or unsupported.
    DataError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            ErrorCode::InsufficientMemory => "BMP_INSUFFICIENT_MEMORY",
            ErrorCode::InsufficientData => "BMP_INSUFFICIENT_DATA",
            ErrorCode::DataError => "BMP_DATA_ERROR",
        };
        f.write_str(name)
    }
}

//===========================================================================//


//===========================================================================//
