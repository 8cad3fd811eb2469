//! Common error types for storage operations

use core::fmt;

/// A common error type for key-value storage operations.
///
/// Kept small and `Copy` so it travels through the delivery engine's logging
/// without allocation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// An error occurred during a write or remove.
    WriteError,
    /// An error occurred during a read or enumeration.
    ReadError,
    /// A stored record failed its integrity check or could not be decoded.
    Corrupted,
    /// The backing store cannot be opened or has gone away.
    Unavailable,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::WriteError => write!(f, "write failed"),
            Error::ReadError => write!(f, "read failed"),
            Error::Corrupted => write!(f, "corrupted record"),
            Error::Unavailable => write!(f, "store unavailable"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::Corrupted => defmt::write!(f, "Corrupted"),
            Error::Unavailable => defmt::write!(f, "Unavailable"),
        }
    }
}
