//! Crypto platform abstraction for Matter commissioning.
//!
//! The [`crypto`] module carries the stateless primitives (hashing, MACs,
//! KDFs, AES-CCM, the DRBG and P-256 key pairs). The [`secure_channel`]
//! module carries the Spake2+ engine used to establish a PASE session, its
//! curve binding and the passcode helpers around it.

pub mod crypto;
pub mod error;
pub mod secure_channel;
