pub mod crypto;
#[cfg(feature = "crypto_openssl")]
pub mod crypto_openssl;

pub mod pake;
pub mod spake2p;
