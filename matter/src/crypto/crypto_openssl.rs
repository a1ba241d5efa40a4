use crate::error::Error;

use log::error;
use openssl::asn1::Asn1Type;
use openssl::bn::{BigNum, BigNumContext};
use openssl::derive::Deriver;
use openssl::ec::{EcGroup, EcKey, EcPoint, PointConversionForm};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{self, PKey};
use openssl::x509::{X509NameBuilder, X509ReqBuilder};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{
    hash_sha256, CryptoKeyPair, MAX_ECDH_SECRET_LEN, MAX_ECDSA_SIGNATURE_LEN,
    P256_PRIVATE_KEY_LEN, P256_PUBLIC_KEY_LEN, SHA256_HASH_LEN_BYTES,
};

#[derive(Clone)]
pub struct P256PublicKey(pub [u8; P256_PUBLIC_KEY_LEN]);

/// Raw big-endian P-256 private scalar, scrubbed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct P256PrivateKey(pub [u8; P256_PRIVATE_KEY_LEN]);

pub struct KeyPair {
    key: EcKey<pkey::Private>,
}

fn p256_group() -> Result<EcGroup, Error> {
    Ok(EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?)
}

fn public_from_bytes(pub_key: &[u8]) -> Result<EcKey<pkey::Public>, Error> {
    if pub_key.len() != P256_PUBLIC_KEY_LEN {
        return Err(Error::InvalidKeyLength);
    }
    let group = p256_group()?;
    let mut ctx = BigNumContext::new()?;
    let point = EcPoint::from_bytes(&group, pub_key, &mut ctx).map_err(|e| {
        error!("Invalid public key: {}", e);
        Error::InvalidPoint
    })?;
    Ok(EcKey::from_public_key(&group, &point)?)
}

impl KeyPair {
    pub fn new() -> Result<Self, Error> {
        let group = p256_group()?;
        let key = EcKey::generate(&group)?;
        Ok(Self { key })
    }

    pub fn new_from_private(priv_key: &[u8]) -> Result<Self, Error> {
        if priv_key.len() != P256_PRIVATE_KEY_LEN {
            return Err(Error::InvalidKeyLength);
        }
        let group = p256_group()?;
        let mut ctx = BigNumContext::new()?;
        let mut private = BigNum::from_slice(priv_key)?;
        private.set_const_time();
        let mut public = EcPoint::new(&group)?;
        public.mul_generator2(&group, &private, &mut ctx)?;
        let key = EcKey::from_private_components(&group, &private, &public)?;
        private.clear();
        key.check_key()?;
        Ok(Self { key })
    }

    pub fn get_private_key(&self) -> Result<P256PrivateKey, Error> {
        let mut raw = self
            .key
            .private_key()
            .to_vec_padded(P256_PRIVATE_KEY_LEN as i32)?;
        let mut out = P256PrivateKey([0; P256_PRIVATE_KEY_LEN]);
        out.0.copy_from_slice(&raw);
        raw.zeroize();
        Ok(out)
    }
}

impl CryptoKeyPair for KeyPair {
    fn get_public_key(&self, pub_key: &mut [u8]) -> Result<usize, Error> {
        if pub_key.len() < P256_PUBLIC_KEY_LEN {
            return Err(Error::NoSpace);
        }
        let group = p256_group()?;
        let mut bn_ctx = BigNumContext::new()?;
        let s = self.key.public_key().to_bytes(
            &group,
            PointConversionForm::UNCOMPRESSED,
            &mut bn_ctx,
        )?;
        let len = s.len();
        pub_key[..len].copy_from_slice(s.as_slice());
        Ok(len)
    }

    fn derive_secret(&self, peer_pub_key: &[u8], secret: &mut [u8]) -> Result<usize, Error> {
        if secret.len() < MAX_ECDH_SECRET_LEN {
            return Err(Error::NoSpace);
        }
        let self_pkey = PKey::from_ec_key(self.key.clone())?;
        let peer_pkey = PKey::from_ec_key(public_from_bytes(peer_pub_key)?)?;

        let mut deriver = Deriver::new(&self_pkey)?;
        deriver.set_peer(&peer_pkey)?;
        Ok(deriver.derive(secret)?)
    }

    fn get_csr<'a>(&self, out_csr: &'a mut [u8]) -> Result<&'a [u8], Error> {
        let mut builder = X509ReqBuilder::new()?;
        builder.set_version(0)?;

        let pkey = PKey::from_ec_key(self.key.clone())?;
        builder.set_pubkey(&pkey)?;

        let mut name_builder = X509NameBuilder::new()?;
        name_builder.append_entry_by_text_with_type("O", "CSR", Asn1Type::IA5STRING)?;
        let subject_name = name_builder.build();
        builder.set_subject_name(&subject_name)?;

        builder.sign(&pkey, MessageDigest::sha256())?;

        let csr_vec = builder.build().to_der()?;
        let csr = csr_vec.as_slice();
        if csr.len() <= out_csr.len() {
            let a = &mut out_csr[0..csr.len()];
            a.copy_from_slice(csr);
            Ok(a)
        } else {
            Err(Error::NoSpace)
        }
    }

    /// Produces an ASN.1 DER encoded ECDSA-with-SHA256 signature.
    fn sign_msg(&self, msg: &[u8], signature: &mut [u8]) -> Result<usize, Error> {
        if signature.len() < MAX_ECDSA_SIGNATURE_LEN {
            return Err(Error::NoSpace);
        }
        let mut digest = [0u8; SHA256_HASH_LEN_BYTES];
        hash_sha256(msg, &mut digest)?;

        let sig = EcdsaSig::sign(&digest, &self.key)?.to_der()?;
        let len = sig.len();
        signature[..len].copy_from_slice(sig.as_slice());
        Ok(len)
    }

    fn verify_msg(&self, msg: &[u8], signature: &[u8]) -> Result<(), Error> {
        verify_with_key(&self.key, msg, signature)
    }
}

fn verify_with_key<T: pkey::HasPublic>(
    key: &EcKey<T>,
    msg: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    let mut digest = [0u8; SHA256_HASH_LEN_BYTES];
    hash_sha256(msg, &mut digest)?;

    let sig = EcdsaSig::from_der(signature).map_err(|_x| Error::InvalidSignature)?;
    if sig.verify(&digest, key)? {
        Ok(())
    } else {
        error!("Signature verification failed");
        Err(Error::InvalidSignature)
    }
}

pub fn new_ecp_keypair() -> Result<(P256PublicKey, P256PrivateKey), Error> {
    let key_pair = KeyPair::new()?;
    let mut public = P256PublicKey([0; P256_PUBLIC_KEY_LEN]);
    key_pair.get_public_key(&mut public.0)?;
    Ok((public, key_pair.get_private_key()?))
}

pub fn ecdsa_sign_msg(msg: &[u8], private_key: &[u8], signature: &mut [u8]) -> Result<usize, Error> {
    KeyPair::new_from_private(private_key)?.sign_msg(msg, signature)
}

pub fn ecdsa_validate_msg_signature(
    msg: &[u8],
    public_key: &[u8],
    signature: &[u8],
) -> Result<(), Error> {
    verify_with_key(&public_from_bytes(public_key)?, msg, signature)
}

/// Writes the x-coordinate of the shared point into `secret`.
pub fn ecdh_derive_secret(
    remote_public_key: &[u8],
    local_private_key: &[u8],
    secret: &mut [u8],
) -> Result<usize, Error> {
    KeyPair::new_from_private(local_private_key)?.derive_secret(remote_public_key, secret)
}

/// PKCS#10 request for `public_key`, signed with `private_key`.
pub fn new_csr(public_key: &[u8], private_key: &[u8], csr: &mut [u8]) -> Result<usize, Error> {
    let key_pair = KeyPair::new_from_private(private_key)?;
    let mut derived = [0u8; P256_PUBLIC_KEY_LEN];
    key_pair.get_public_key(&mut derived)?;
    if derived[..] != *public_key {
        error!("Public key does not belong to the private key");
        return Err(Error::Invalid);
    }
    Ok(key_pair.get_csr(csr)?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MAX_CSR_LEN;

    #[test]
    fn test_sign_verify() {
        let (public, private) = new_ecp_keypair().unwrap();
        let mut sig = [0u8; MAX_ECDSA_SIGNATURE_LEN];
        let len = ecdsa_sign_msg(b"commissioning", &private.0, &mut sig).unwrap();
        assert_eq!(sig[0], 0x30);
        ecdsa_validate_msg_signature(b"commissioning", &public.0, &sig[..len]).unwrap();
        assert_eq!(
            ecdsa_validate_msg_signature(b"commissionin", &public.0, &sig[..len]),
            Err(Error::InvalidSignature)
        );
    }

    #[test]
    fn test_sign_short_buffer() {
        let (_, private) = new_ecp_keypair().unwrap();
        let mut sig = [0u8; MAX_ECDSA_SIGNATURE_LEN - 1];
        assert_eq!(
            ecdsa_sign_msg(b"msg", &private.0, &mut sig),
            Err(Error::NoSpace)
        );
    }

    #[test]
    fn test_ecdh_agreement() {
        let (pub_a, priv_a) = new_ecp_keypair().unwrap();
        let (pub_b, priv_b) = new_ecp_keypair().unwrap();
        let mut s1 = [0u8; MAX_ECDH_SECRET_LEN];
        let mut s2 = [0u8; MAX_ECDH_SECRET_LEN];
        assert_eq!(ecdh_derive_secret(&pub_b.0, &priv_a.0, &mut s1).unwrap(), 32);
        assert_eq!(ecdh_derive_secret(&pub_a.0, &priv_b.0, &mut s2).unwrap(), 32);
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_ecdh_rejects_bad_point() {
        let (pub_a, priv_a) = new_ecp_keypair().unwrap();
        let mut bad = pub_a.0;
        bad[64] ^= 0x01;
        let mut s = [0u8; MAX_ECDH_SECRET_LEN];
        assert_eq!(
            ecdh_derive_secret(&bad, &priv_a.0, &mut s),
            Err(Error::InvalidPoint)
        );
    }

    #[test]
    fn test_private_key_one_is_generator() {
        let mut one = [0u8; P256_PRIVATE_KEY_LEN];
        one[31] = 1;
        let kp = KeyPair::new_from_private(&one).unwrap();
        let mut public = [0u8; P256_PUBLIC_KEY_LEN];
        assert_eq!(kp.get_public_key(&mut public).unwrap(), P256_PUBLIC_KEY_LEN);
        let g = hex::decode(
            "046b17d1f2e12c4247f8bce6e563a440f277037d812deb33a0f4a13945d898c296\
             4fe342e2fe1a7f9b8ee7eb4a7c0f9e162bce33576b315ececbb6406837bf51f5",
        )
        .unwrap();
        assert_eq!(&public[..], &g[..]);
        assert_eq!(&kp.get_private_key().unwrap().0, &one);
    }

    #[test]
    fn test_csr() {
        let (public, private) = new_ecp_keypair().unwrap();
        let mut csr = [0u8; MAX_CSR_LEN];
        let len = new_csr(&public.0, &private.0, &mut csr).unwrap();
        assert!(len > 0);
        assert_eq!(csr[0], 0x30);

        let (other, _) = new_ecp_keypair().unwrap();
        assert_eq!(new_csr(&other.0, &private.0, &mut csr), Err(Error::Invalid));
    }
}
