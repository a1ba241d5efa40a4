use byteorder::{ByteOrder, LittleEndian};
use log::error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::crypto::CryptoSpake2;
use crate::crypto::{self, Sha256Stream, MAX_FE_LEN, MAX_POINT_LEN, SHA256_HASH_LEN_BYTES};
use crate::error::Error;

// This file deals with everything that surrounds a PASE Spake2+ exchange but
// is not part of the protocol engine itself: the context hash over the
// PBKDFParamRequest/Response, turning a passcode into w0/w1 (or the
// verifier's w0/L), and splitting Ke into the session keys.

pub const PASE_CONTEXT_PREFIX: &[u8] = b"CHIP PAKE V1 Commissioning";

// Matter bounds the PBKDF2 iteration count to 1000..=100000
pub const PBKDF2_ITERATIONS_MIN: u32 = 1000;
pub const PBKDF2_ITERATIONS_MAX: u32 = 100000;

// and the salt to 16..=32 bytes
pub const PBKDF2_SALT_LEN_MIN: usize = 16;
pub const PBKDF2_SALT_LEN_MAX: usize = 32;

// w0s and w1s are 64 bits wider than a field element, so reducing them
// modulo the group order is close to uniform
const W_EXTRA_BYTES: usize = 8;
pub const MAX_W_SIZE_BYTES: usize = MAX_FE_LEN + W_EXTRA_BYTES;

const SPAKE2_SESSION_KEYS_INFO: [u8; 11] = *b"SessionKeys";
pub const SESSION_KEY_LEN: usize = 16;

/// Hash of the PASE negotiation, used as the Spake2+ context.
pub fn pase_context(req: &[u8], resp: &[u8], out: &mut [u8]) -> Result<usize, Error> {
    let mut context = Sha256Stream::new();
    context.begin();
    context.add_data(PASE_CONTEXT_PREFIX)?;
    context.add_data(req)?;
    context.add_data(resp)?;
    context.finish(out)?;
    Ok(SHA256_HASH_LEN_BYTES)
}

fn check_pbkdf_params(iterations: u32, salt: &[u8]) -> Result<(), Error> {
    if !(PBKDF2_ITERATIONS_MIN..=PBKDF2_ITERATIONS_MAX).contains(&iterations) {
        error!("PBKDF2 iteration count {} out of range", iterations);
        return Err(Error::Invalid);
    }
    if !(PBKDF2_SALT_LEN_MIN..=PBKDF2_SALT_LEN_MAX).contains(&salt.len()) {
        error!("PBKDF2 salt length {} out of range", salt.len());
        return Err(Error::Invalid);
    }
    Ok(())
}

/// PBKDF2 over the little-endian passcode, producing w0s || w1s in `w0w1s`.
pub fn passcode_w0w1s(
    passcode: u32,
    iterations: u32,
    salt: &[u8],
    w0w1s: &mut [u8],
) -> Result<(), Error> {
    check_pbkdf_params(iterations, salt)?;
    let mut pw_str: [u8; 4] = [0; 4];
    LittleEndian::write_u32(&mut pw_str, passcode);
    crypto::pbkdf2_hmac(&pw_str, iterations as usize, salt, w0w1s)
}

/// The prover's secrets w0 and w1 for a given passcode.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PasscodeSecrets {
    w0: [u8; MAX_FE_LEN],
    w1: [u8; MAX_FE_LEN],
    fe_len: usize,
}

impl PasscodeSecrets {
    pub fn derive<C: CryptoSpake2>(passcode: u32, iterations: u32, salt: &[u8]) -> Result<Self, Error> {
        let w_len = C::FE_LEN + W_EXTRA_BYTES;
        if w_len > MAX_W_SIZE_BYTES {
            return Err(Error::NoSpace);
        }
        let mut w0w1s = [0u8; 2 * MAX_W_SIZE_BYTES];
        let r = passcode_w0w1s(passcode, iterations, salt, &mut w0w1s[..2 * w_len])
            .and_then(|_| Self::reduce::<C>(&w0w1s[..w_len], &w0w1s[w_len..2 * w_len]));
        w0w1s.zeroize();
        r
    }

    fn reduce<C: CryptoSpake2>(w0s: &[u8], w1s: &[u8]) -> Result<Self, Error> {
        let mut crypto = C::new()?;
        let mut secrets = Self {
            w0: [0; MAX_FE_LEN],
            w1: [0; MAX_FE_LEN],
            fe_len: C::FE_LEN,
        };
        let w0 = crypto.fe_load(w0s)?;
        crypto.fe_write(&w0, &mut secrets.w0[..C::FE_LEN])?;
        let w1 = crypto.fe_load(w1s)?;
        crypto.fe_write(&w1, &mut secrets.w1[..C::FE_LEN])?;
        Ok(secrets)
    }

    pub fn w0(&self) -> &[u8] {
        &self.w0[..self.fe_len]
    }

    pub fn w1(&self) -> &[u8] {
        &self.w1[..self.fe_len]
    }

    /// The verifier's view of these secrets: w0 and L = w1*G.
    pub fn verifier<C: CryptoSpake2>(&self) -> Result<Verifier, Error> {
        if self.fe_len != C::FE_LEN {
            return Err(Error::InvalidData);
        }
        let mut crypto = C::new()?;
        let mut verifier = Verifier {
            w0: self.w0,
            l: [0; MAX_POINT_LEN],
            fe_len: C::FE_LEN,
            point_len: C::POINT_LEN,
        };
        crypto.compute_L(self.w1(), &mut verifier.l[..C::POINT_LEN])?;
        Ok(verifier)
    }
}

/// What an accessory stores instead of its passcode. Serialized as w0 || L.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Verifier {
    w0: [u8; MAX_FE_LEN],
    l: [u8; MAX_POINT_LEN],
    fe_len: usize,
    point_len: usize,
}

impl Verifier {
    pub fn serialized_len(&self) -> usize {
        self.fe_len + self.point_len
    }

    /// Parses w0 || L. L is only checked for length here; it is validated as
    /// a curve point when handed to `Spake2p::begin_verifier`.
    pub fn from_bytes<C: CryptoSpake2>(data: &[u8]) -> Result<Self, Error> {
        if data.len() != C::FE_LEN + C::POINT_LEN
            || C::FE_LEN > MAX_FE_LEN
            || C::POINT_LEN > MAX_POINT_LEN
        {
            return Err(Error::InvalidData);
        }
        let mut verifier = Self {
            w0: [0; MAX_FE_LEN],
            l: [0; MAX_POINT_LEN],
            fe_len: C::FE_LEN,
            point_len: C::POINT_LEN,
        };
        verifier.w0[..C::FE_LEN].copy_from_slice(&data[..C::FE_LEN]);
        verifier.l[..C::POINT_LEN].copy_from_slice(&data[C::FE_LEN..]);
        Ok(verifier)
    }

    pub fn to_bytes(&self, out: &mut [u8]) -> Result<usize, Error> {
        let len = self.serialized_len();
        if out.len() < len {
            return Err(Error::NoSpace);
        }
        out[..self.fe_len].copy_from_slice(self.w0());
        out[self.fe_len..len].copy_from_slice(self.l());
        Ok(len)
    }

    pub fn w0(&self) -> &[u8] {
        &self.w0[..self.fe_len]
    }

    pub fn l(&self) -> &[u8] {
        &self.l[..self.point_len]
    }
}

/// Keys of a PASE session, expanded from the Spake2+ shared secret Ke.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    pub i2r_key: [u8; SESSION_KEY_LEN],
    pub r2i_key: [u8; SESSION_KEY_LEN],
    pub attestation_challenge: [u8; SESSION_KEY_LEN],
}

impl SessionKeys {
    pub fn derive(ke: &[u8]) -> Result<Self, Error> {
        if ke.is_empty() {
            return Err(Error::InvalidData);
        }
        let mut session_keys = [0u8; 3 * SESSION_KEY_LEN];
        crypto::hkdf_sha256(&[], ke, &SPAKE2_SESSION_KEYS_INFO, &mut session_keys)
            .map_err(|_x| Error::NoSpace)?;

        let mut keys = Self {
            i2r_key: [0; SESSION_KEY_LEN],
            r2i_key: [0; SESSION_KEY_LEN],
            attestation_challenge: [0; SESSION_KEY_LEN],
        };
        keys.i2r_key.copy_from_slice(&session_keys[0..16]);
        keys.r2i_key.copy_from_slice(&session_keys[16..32]);
        keys.attestation_challenge
            .copy_from_slice(&session_keys[32..48]);
        session_keys.zeroize();
        Ok(keys)
    }
}
