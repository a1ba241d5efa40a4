use hmac::{Hmac, Mac, NewMac};
use sha2::{Digest, Sha256};

use super::SHA256_HASH_LEN_BYTES;
use crate::error::Error;

pub fn hash_sha256(data: &[u8], out: &mut [u8]) -> Result<(), Error> {
    if out.len() < SHA256_HASH_LEN_BYTES {
        return Err(Error::NoSpace);
    }
    let digest = Sha256::digest(data);
    out[..SHA256_HASH_LEN_BYTES].copy_from_slice(digest.as_slice());
    Ok(())
}

pub fn hmac_sha256(key: &[u8], data: &[u8], out: &mut [u8]) -> Result<usize, Error> {
    if out.len() < SHA256_HASH_LEN_BYTES {
        return Err(Error::NoSpace);
    }
    let mut mac = Hmac::<Sha256>::new_from_slice(key).map_err(|_x| Error::InvalidKeyLength)?;
    mac.update(data);
    let r = mac.finalize().into_bytes();
    out[..SHA256_HASH_LEN_BYTES].copy_from_slice(r.as_slice());
    Ok(SHA256_HASH_LEN_BYTES)
}

/// Incremental SHA-256.
///
/// `begin` must be called before data is added. `finish` consumes the running
/// state, so a second `finish` without a new `begin` fails.
#[derive(Default)]
pub struct Sha256Stream {
    ctx: Option<Sha256>,
}

impl Sha256Stream {
    pub fn new() -> Self {
        Self { ctx: None }
    }

    pub fn begin(&mut self) {
        self.ctx = Some(Sha256::new());
    }

    pub fn add_data(&mut self, data: &[u8]) -> Result<(), Error> {
        self.ctx.as_mut().ok_or(Error::InvalidState)?.update(data);
        Ok(())
    }

    pub fn finish(&mut self, out: &mut [u8]) -> Result<(), Error> {
        if out.len() < SHA256_HASH_LEN_BYTES {
            return Err(Error::NoSpace);
        }
        let ctx = self.ctx.take().ok_or(Error::InvalidState)?;
        out[..SHA256_HASH_LEN_BYTES].copy_from_slice(ctx.finalize().as_slice());
        Ok(())
    }

    pub fn clear(&mut self) {
        self.ctx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_matches_single_shot() {
        let mut single = [0u8; 32];
        hash_sha256(b"abcdbcdecdefdefg", &mut single).unwrap();

        let mut stream = Sha256Stream::new();
        stream.begin();
        stream.add_data(b"abcd").unwrap();
        stream.add_data(b"").unwrap();
        stream.add_data(b"bcdecdefdefg").unwrap();
        let mut streamed = [0u8; 32];
        stream.finish(&mut streamed).unwrap();
        assert_eq!(single, streamed);
    }

    #[test]
    fn test_sha256_abc() {
        let mut out = [0u8; 32];
        hash_sha256(b"abc", &mut out).unwrap();
        assert_eq!(
            hex::encode(out),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_stream_finish_once() {
        let mut stream = Sha256Stream::new();
        let mut out = [0u8; 32];
        assert_eq!(stream.add_data(b"x"), Err(Error::InvalidState));

        stream.begin();
        assert_eq!(stream.finish(&mut out[..0]), Err(Error::NoSpace));
        // A failed finish leaves the running state intact
        stream.finish(&mut out).unwrap();
        assert_eq!(stream.finish(&mut out), Err(Error::InvalidState));
    }

    #[test]
    fn test_hmac_rfc4231_case2() {
        let mut out = [0u8; 32];
        let len = hmac_sha256(b"Jefe", b"what do ya want for nothing?", &mut out).unwrap();
        assert_eq!(len, 32);
        assert_eq!(
            hex::encode(out),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_short_outputs() {
        let mut out = [0u8; 31];
        assert_eq!(hash_sha256(b"abc", &mut out), Err(Error::NoSpace));
        assert_eq!(hmac_sha256(b"k", b"abc", &mut out), Err(Error::NoSpace));
    }
}
