use std::{array::TryFromSliceError, fmt, sync::PoisonError};

use log::error;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Error {
    // Failure reported by the symmetric primitives (AEAD tag mismatch, message too long)
    Crypto,
    TLSStack,
    NoSpace,
    Invalid,
    InvalidData,
    InvalidKeyLength,
    // Encoded point is malformed, off the curve or the identity
    InvalidPoint,
    InvalidSignature,
    InvalidState,
    MacMismatch,
    RwLock,
}

/// The broad class an [`Error`] belongs to.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ErrorCategory {
    /// An operation was invoked outside of the protocol state it requires
    StatePrecondition,
    /// A buffer was too short, too long or not a valid encoding
    LengthOrFormat,
    /// Arithmetic failure, rejected point or failed authentication
    Cryptographic,
    /// The underlying backend or a shared resource failed
    Backend,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidState => ErrorCategory::StatePrecondition,
            Error::NoSpace | Error::Invalid | Error::InvalidData | Error::InvalidKeyLength => {
                ErrorCategory::LengthOrFormat
            }
            Error::Crypto | Error::InvalidPoint | Error::InvalidSignature | Error::MacMismatch => {
                ErrorCategory::Cryptographic
            }
            Error::TLSStack | Error::RwLock => ErrorCategory::Backend,
        }
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_e: PoisonError<T>) -> Self {
        Self::RwLock
    }
}

#[cfg(feature = "crypto_openssl")]
impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        error!("Error in TLS: {}", e);
        Self::TLSStack
    }
}

impl From<ccm::aead::Error> for Error {
    fn from(_e: ccm::aead::Error) -> Self {
        Self::Crypto
    }
}

impl From<TryFromSliceError> for Error {
    fn from(_e: TryFromSliceError) -> Self {
        Self::Invalid
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}
