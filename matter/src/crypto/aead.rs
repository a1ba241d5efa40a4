use aes::Aes128;
use ccm::aead::{generic_array::ArrayLength, generic_array::GenericArray, AeadInPlace, NewAead};
use ccm::{
    consts::{U10, U11, U12, U13, U14, U16, U4, U6, U7, U8, U9},
    Ccm, NonceSize, TagSize,
};
use zeroize::Zeroize;

use crate::error::Error;

pub const AES_CCM_128_KEY_LEN: usize = 16;

// Tag and nonce lengths are type parameters of the cipher, so runtime lengths
// are mapped onto concrete instantiations here.
macro_rules! with_nonce_len {
    ($iv_len:expr, $tag:ty, $f:ident($($arg:expr),*)) => {
        match $iv_len {
            7 => $f::<$tag, U7>($($arg),*),
            8 => $f::<$tag, U8>($($arg),*),
            9 => $f::<$tag, U9>($($arg),*),
            10 => $f::<$tag, U10>($($arg),*),
            11 => $f::<$tag, U11>($($arg),*),
            12 => $f::<$tag, U12>($($arg),*),
            13 => $f::<$tag, U13>($($arg),*),
            _ => Err(Error::InvalidData),
        }
    };
}

macro_rules! with_ccm_params {
    ($tag_len:expr, $iv_len:expr, $f:ident($($arg:expr),*)) => {
        match $tag_len {
            4 => with_nonce_len!($iv_len, U4, $f($($arg),*)),
            6 => with_nonce_len!($iv_len, U6, $f($($arg),*)),
            8 => with_nonce_len!($iv_len, U8, $f($($arg),*)),
            10 => with_nonce_len!($iv_len, U10, $f($($arg),*)),
            12 => with_nonce_len!($iv_len, U12, $f($($arg),*)),
            14 => with_nonce_len!($iv_len, U14, $f($($arg),*)),
            16 => with_nonce_len!($iv_len, U16, $f($($arg),*)),
            _ => Err(Error::InvalidData),
        }
    };
}

fn check_ccm_params(tag_len: usize, iv_len: usize) -> Result<(), Error> {
    if !(7..=13).contains(&iv_len) || !(4..=16).contains(&tag_len) || tag_len % 2 != 0 {
        return Err(Error::InvalidData);
    }
    Ok(())
}

fn seal<M, N>(key: &[u8], iv: &[u8], aad: &[u8], buf: &mut [u8], tag: &mut [u8]) -> Result<(), Error>
where
    M: ArrayLength<u8> + TagSize,
    N: ArrayLength<u8> + NonceSize,
{
    let cipher = Ccm::<Aes128, M, N>::new(GenericArray::from_slice(key));
    let t = cipher.encrypt_in_place_detached(GenericArray::from_slice(iv), aad, buf)?;
    tag.copy_from_slice(t.as_slice());
    Ok(())
}

fn open<M, N>(key: &[u8], iv: &[u8], aad: &[u8], buf: &mut [u8], tag: &[u8]) -> Result<(), Error>
where
    M: ArrayLength<u8> + TagSize,
    N: ArrayLength<u8> + NonceSize,
{
    let cipher = Ccm::<Aes128, M, N>::new(GenericArray::from_slice(key));
    cipher.decrypt_in_place_detached(
        GenericArray::from_slice(iv),
        aad,
        buf,
        GenericArray::from_slice(tag),
    )?;
    Ok(())
}

/// AES-128-CCM encryption. The tag length is `tag.len()`; `ciphertext` must
/// hold at least `plaintext.len()` bytes.
pub fn aes_ccm_encrypt(
    plaintext: &[u8],
    aad: &[u8],
    key: &[u8],
    iv: &[u8],
    ciphertext: &mut [u8],
    tag: &mut [u8],
) -> Result<(), Error> {
    if key.len() != AES_CCM_128_KEY_LEN {
        return Err(Error::InvalidKeyLength);
    }
    check_ccm_params(tag.len(), iv.len())?;
    if ciphertext.len() < plaintext.len() {
        return Err(Error::NoSpace);
    }
    let out = &mut ciphertext[..plaintext.len()];
    out.copy_from_slice(plaintext);
    let tag_len = tag.len();
    let result = with_ccm_params!(tag_len, iv.len(), seal(key, iv, aad, &mut *out, &mut *tag));
    if result.is_err() {
        out.zeroize();
        tag.zeroize();
    }
    result
}

/// AES-128-CCM decryption. Nothing is left in `plaintext` unless the tag
/// verifies.
pub fn aes_ccm_decrypt(
    ciphertext: &[u8],
    aad: &[u8],
    tag: &[u8],
    key: &[u8],
    iv: &[u8],
    plaintext: &mut [u8],
) -> Result<(), Error> {
    if key.len() != AES_CCM_128_KEY_LEN {
        return Err(Error::InvalidKeyLength);
    }
    check_ccm_params(tag.len(), iv.len())?;
    if plaintext.len() < ciphertext.len() {
        return Err(Error::NoSpace);
    }
    let out = &mut plaintext[..ciphertext.len()];
    out.copy_from_slice(ciphertext);
    let result = with_ccm_params!(tag.len(), iv.len(), open(key, iv, aad, &mut *out, tag));
    if result.is_err() {
        out.zeroize();
    }
    result
}
