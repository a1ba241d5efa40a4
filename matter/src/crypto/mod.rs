//! Platform-agnostic crypto primitives.
//!
//! Every function here is a single stateless call: inputs are slices, outputs
//! go into caller-supplied slices whose length is the declared capacity. The
//! capacity is checked before anything is written.

use crate::error::Error;

pub const P256_FE_LEN: usize = 32;
pub const P256_POINT_LEN: usize = 2 * P256_FE_LEN + 1;
pub const SHA256_HASH_LEN_BYTES: usize = 32;

pub const MAX_ECDH_SECRET_LEN: usize = P256_FE_LEN;
pub const MAX_ECDSA_SIGNATURE_LEN: usize = 72;
pub const MAX_FE_LEN: usize = P256_FE_LEN;
pub const MAX_POINT_LEN: usize = P256_POINT_LEN;
pub const MAX_HASH_LEN: usize = SHA256_HASH_LEN_BYTES;
pub const MAX_CSR_LEN: usize = 512;

pub const P256_PRIVATE_KEY_LEN: usize = 32;
pub const P256_PUBLIC_KEY_LEN: usize = 65;

// APIs particular to a KeyPair so a KeyPair object can be defined
pub trait CryptoKeyPair {
    fn get_csr<'a>(&self, csr: &'a mut [u8]) -> Result<&'a [u8], Error>;
    fn get_public_key(&self, pub_key: &mut [u8]) -> Result<usize, Error>;
    fn derive_secret(&self, peer_pub_key: &[u8], secret: &mut [u8]) -> Result<usize, Error>;
    fn sign_msg(&self, msg: &[u8], signature: &mut [u8]) -> Result<usize, Error>;
    fn verify_msg(&self, msg: &[u8], signature: &[u8]) -> Result<(), Error>;
}

mod aead;
pub use self::aead::*;

mod hash;
pub use self::hash::*;

mod kdf;
pub use self::kdf::*;

pub mod drbg;
pub use self::drbg::{add_entropy_source, drbg_get_bytes, EntropySource};

#[cfg(feature = "crypto_openssl")]
mod crypto_openssl;
#[cfg(feature = "crypto_openssl")]
pub use self::crypto_openssl::*;
