use zeroize::Zeroize;

use crate::error::Error;

// This trait allows us to switch between crypto providers for Spake2+. The
// Spake2+ engine is written purely in terms of these operations; a provider
// fixes the curve, hash, MAC and KDF.
//
// A provider owns its backend state (curve group, bignum scratch, the
// transcript hash) and hands out owned field elements and points. Field
// elements hold secrets and must scrub themselves when zeroized or dropped.
#[allow(non_snake_case)]
pub trait CryptoSpake2 {
    type FieldElement: Zeroize;
    type Point;

    const FE_LEN: usize;
    const POINT_LEN: usize;
    const HASH_LEN: usize;

    // Uncompressed encodings of the protocol constants M and N
    const SPAKE2P_M: &'static [u8];
    const SPAKE2P_N: &'static [u8];

    fn new() -> Result<Self, Error>
    where
        Self: Sized;

    /// Reset per-exchange backend state, starting a fresh transcript hash.
    fn init_impl(&mut self) -> Result<(), Error>;
    fn hash(&mut self, data: &[u8]) -> Result<(), Error>;
    /// Finish the transcript hash into `out[..HASH_LEN]`.
    fn hash_finalize(&mut self, out: &mut [u8]) -> Result<(), Error>;

    fn mac(&self, key: &[u8], data: &[u8], out: &mut [u8]) -> Result<usize, Error>;
    /// Constant-time check of `mac` against the MAC of `data`.
    fn mac_verify(&self, key: &[u8], mac: &[u8], data: &[u8]) -> Result<(), Error>;
    fn kdf(&self, ikm: &[u8], salt: &[u8], info: &[u8], out: &mut [u8]) -> Result<(), Error>;

    /// Load a big-endian integer reduced modulo the group order.
    fn fe_load(&mut self, data: &[u8]) -> Result<Self::FieldElement, Error>;
    /// Write `fe` as a FE_LEN big-endian integer.
    fn fe_write(&self, fe: &Self::FieldElement, out: &mut [u8]) -> Result<usize, Error>;
    /// Uniformly random non-zero element below the group order.
    fn fe_generate(&mut self) -> Result<Self::FieldElement, Error>;
    fn fe_mul(
        &mut self,
        fe1: &Self::FieldElement,
        fe2: &Self::FieldElement,
    ) -> Result<Self::FieldElement, Error>;

    /// Load a point from 0x04 || X || Y.
    fn point_load(&mut self, data: &[u8]) -> Result<Self::Point, Error>;
    /// Write a point as 0x04 || X || Y.
    fn point_write(&mut self, p: &Self::Point, out: &mut [u8]) -> Result<usize, Error>;
    fn generator(&self) -> Result<Self::Point, Error>;
    /// fe1 * P1
    fn point_mul(
        &mut self,
        p1: &Self::Point,
        fe1: &Self::FieldElement,
    ) -> Result<Self::Point, Error>;
    /// fe1 * P1 + fe2 * P2
    fn point_add_mul(
        &mut self,
        p1: &Self::Point,
        fe1: &Self::FieldElement,
        p2: &Self::Point,
        fe2: &Self::FieldElement,
    ) -> Result<Self::Point, Error>;
    fn point_invert(&mut self, p: &mut Self::Point) -> Result<(), Error>;
    fn point_cofactor_mul(&mut self, p: &mut Self::Point) -> Result<(), Error>;
    /// Fails with `Error::InvalidPoint` unless `p` is on the curve and not the
    /// identity.
    fn point_is_valid(&mut self, p: &Self::Point) -> Result<(), Error>;

    /// L = w1 * G, written uncompressed into `L`.
    fn compute_L(&mut self, w1: &[u8], L: &mut [u8]) -> Result<usize, Error>;
}
