use hkdf::Hkdf;
use hmac::Hmac;
use sha2::Sha256;

use crate::error::Error;

/// HKDF-SHA256. An empty salt is treated as absent.
pub fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], key: &mut [u8]) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::NoSpace);
    }
    let salt = if salt.is_empty() { None } else { Some(salt) };
    let h = Hkdf::<Sha256>::new(salt, ikm);
    h.expand(info, key).map_err(|_x| Error::NoSpace)
}

/// PBKDF2 with HMAC-SHA256 as the PRF.
pub fn pbkdf2_hmac(pass: &[u8], iter: usize, salt: &[u8], key: &mut [u8]) -> Result<(), Error> {
    if iter == 0 || key.is_empty() {
        return Err(Error::Invalid);
    }
    pbkdf2::pbkdf2::<Hmac<Sha256>>(pass, salt, iter as u32, key);
    Ok(())
}
