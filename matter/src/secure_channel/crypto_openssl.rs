use log::error;
use openssl::bn::{BigNum, BigNumContext};
use openssl::ec::{EcGroup, EcPoint, PointConversionForm};
use openssl::nid::Nid;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::crypto::{
    hkdf_sha256, hmac_sha256, Sha256Stream, P256_FE_LEN, P256_POINT_LEN, SHA256_HASH_LEN_BYTES,
};
use crate::error::Error;

use super::crypto::CryptoSpake2;

// Spake2+ parameters for P256, from draft-bar-cfrg-spake2plus-01 (ciphersuites)
pub const SPAKE2P_M_P256: [u8; P256_POINT_LEN] = [
    0x04, 0x88, 0x6e, 0x2f, 0x97, 0xac, 0xe4, 0x6e, 0x55, 0xba, 0x9d, 0xd7, 0x24, 0x25, 0x79, 0xf2,
    0x99, 0x3b, 0x64, 0xe1, 0x6e, 0xf3, 0xdc, 0xab, 0x95, 0xaf, 0xd4, 0x97, 0x33, 0x3d, 0x8f, 0xa1,
    0x2f, 0x5f, 0xf3, 0x55, 0x16, 0x3e, 0x43, 0xce, 0x22, 0x4e, 0x0b, 0x0e, 0x65, 0xff, 0x02, 0xac,
    0x8e, 0x5c, 0x7b, 0xe0, 0x94, 0x19, 0xc7, 0x85, 0xe0, 0xca, 0x54, 0x7d, 0x55, 0xa1, 0x2e, 0x2d,
    0x20,
];
pub const SPAKE2P_N_P256: [u8; P256_POINT_LEN] = [
    0x04, 0xd8, 0xbb, 0xd6, 0xc6, 0x39, 0xc6, 0x29, 0x37, 0xb0, 0x4d, 0x99, 0x7f, 0x38, 0xc3, 0x77,
    0x07, 0x19, 0xc6, 0x29, 0xd7, 0x01, 0x4d, 0x49, 0xa2, 0x4b, 0x4f, 0x98, 0xba, 0xa1, 0x29, 0x2b,
    0x49, 0x07, 0xd6, 0x0a, 0xa6, 0xbf, 0xad, 0xe4, 0x50, 0x08, 0xa6, 0x36, 0x33, 0x7f, 0x51, 0x68,
    0xc6, 0x4d, 0x9b, 0xd3, 0x60, 0x34, 0x80, 0x8c, 0xd5, 0x64, 0x49, 0x0b, 0x1e, 0x65, 0x6e, 0xdb,
    0xe7,
];

// Inputs wider than the group order (e.g. the 40-byte w0s/w1s) are accepted
// and reduced.
const MAX_FE_INPUT_LEN: usize = 2 * P256_FE_LEN;

/// A scalar modulo the P-256 group order. Cleared with `BN_clear` when
/// zeroized or dropped.
pub struct P256Scalar(BigNum);

impl Zeroize for P256Scalar {
    fn zeroize(&mut self) {
        self.0.clear();
    }
}

impl Drop for P256Scalar {
    fn drop(&mut self) {
        self.zeroize();
    }
}

pub struct P256Point(EcPoint);

/// Spake2+ over P-256 with SHA-256, HKDF-SHA256 and HMAC-SHA256.
pub struct CryptoOpenSSL {
    group: EcGroup,
    order: BigNum,
    cofactor: BigNum,
    bn_ctx: BigNumContext,
    transcript: Sha256Stream,
}

impl CryptoOpenSSL {
    fn scalar(&self) -> Result<P256Scalar, Error> {
        let mut bn = BigNum::new()?;
        bn.set_const_time();
        Ok(P256Scalar(bn))
    }

    fn point(&self) -> Result<P256Point, Error> {
        Ok(P256Point(EcPoint::new(&self.group)?))
    }
}

#[allow(non_snake_case)]
impl CryptoSpake2 for CryptoOpenSSL {
    type FieldElement = P256Scalar;
    type Point = P256Point;

    const FE_LEN: usize = P256_FE_LEN;
    const POINT_LEN: usize = P256_POINT_LEN;
    const HASH_LEN: usize = SHA256_HASH_LEN_BYTES;

    const SPAKE2P_M: &'static [u8] = &SPAKE2P_M_P256;
    const SPAKE2P_N: &'static [u8] = &SPAKE2P_N_P256;

    fn new() -> Result<Self, Error> {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1)?;
        let mut bn_ctx = BigNumContext::new()?;
        let mut order = BigNum::new()?;
        group.order(&mut order, &mut bn_ctx)?;
        let mut cofactor = BigNum::new()?;
        group.cofactor(&mut cofactor, &mut bn_ctx)?;
        Ok(Self {
            group,
            order,
            cofactor,
            bn_ctx,
            transcript: Sha256Stream::new(),
        })
    }

    fn init_impl(&mut self) -> Result<(), Error> {
        self.transcript.begin();
        Ok(())
    }

    fn hash(&mut self, data: &[u8]) -> Result<(), Error> {
        self.transcript.add_data(data)
    }

    fn hash_finalize(&mut self, out: &mut [u8]) -> Result<(), Error> {
        self.transcript.finish(out)
    }

    fn mac(&self, key: &[u8], data: &[u8], out: &mut [u8]) -> Result<usize, Error> {
        hmac_sha256(key, data, out)
    }

    fn mac_verify(&self, key: &[u8], mac: &[u8], data: &[u8]) -> Result<(), Error> {
        let mut expected = [0u8; SHA256_HASH_LEN_BYTES];
        hmac_sha256(key, data, &mut expected)?;
        let ok = mac.ct_eq(&expected).unwrap_u8() == 1;
        expected.zeroize();
        if ok {
            Ok(())
        } else {
            Err(Error::MacMismatch)
        }
    }

    fn kdf(&self, ikm: &[u8], salt: &[u8], info: &[u8], out: &mut [u8]) -> Result<(), Error> {
        hkdf_sha256(salt, ikm, info, out)
    }

    fn fe_load(&mut self, data: &[u8]) -> Result<P256Scalar, Error> {
        if data.is_empty() || data.len() > MAX_FE_INPUT_LEN {
            return Err(Error::InvalidData);
        }
        let raw = P256Scalar(BigNum::from_slice(data)?);
        let mut fe = self.scalar()?;
        fe.0.nnmod(&raw.0, &self.order, &mut self.bn_ctx)?;
        Ok(fe)
    }

    fn fe_write(&self, fe: &P256Scalar, out: &mut [u8]) -> Result<usize, Error> {
        if out.len() < P256_FE_LEN {
            return Err(Error::NoSpace);
        }
        let mut v = fe.0.to_vec_padded(P256_FE_LEN as i32)?;
        out[..P256_FE_LEN].copy_from_slice(&v);
        v.zeroize();
        Ok(P256_FE_LEN)
    }

    fn fe_generate(&mut self) -> Result<P256Scalar, Error> {
        let mut fe = self.scalar()?;
        loop {
            self.order.rand_range(&mut fe.0)?;
            if fe.0.num_bits() > 0 {
                return Ok(fe);
            }
        }
    }

    fn fe_mul(&mut self, fe1: &P256Scalar, fe2: &P256Scalar) -> Result<P256Scalar, Error> {
        let mut fer = self.scalar()?;
        fer.0
            .mod_mul(&fe1.0, &fe2.0, &self.order, &mut self.bn_ctx)?;
        Ok(fer)
    }

    fn point_load(&mut self, data: &[u8]) -> Result<P256Point, Error> {
        if data.len() != P256_POINT_LEN {
            return Err(Error::InvalidData);
        }
        let p = EcPoint::from_bytes(&self.group, data, &mut self.bn_ctx).map_err(|e| {
            error!("Rejecting point encoding: {}", e);
            Error::InvalidPoint
        })?;
        Ok(P256Point(p))
    }

    fn point_write(&mut self, p: &P256Point, out: &mut [u8]) -> Result<usize, Error> {
        if out.len() < P256_POINT_LEN {
            return Err(Error::NoSpace);
        }
        let v = p
            .0
            .to_bytes(&self.group, PointConversionForm::UNCOMPRESSED, &mut self.bn_ctx)?;
        // The identity encodes as a single byte
        if v.len() != P256_POINT_LEN {
            return Err(Error::InvalidPoint);
        }
        out[..P256_POINT_LEN].copy_from_slice(&v);
        Ok(P256_POINT_LEN)
    }

    fn generator(&self) -> Result<P256Point, Error> {
        Ok(P256Point(self.group.generator().to_owned(&self.group)?))
    }

    fn point_mul(&mut self, p1: &P256Point, fe1: &P256Scalar) -> Result<P256Point, Error> {
        let mut r = self.point()?;
        r.0.mul2(&self.group, &p1.0, &fe1.0, &mut self.bn_ctx)?;
        Ok(r)
    }

    fn point_add_mul(
        &mut self,
        p1: &P256Point,
        fe1: &P256Scalar,
        p2: &P256Point,
        fe2: &P256Scalar,
    ) -> Result<P256Point, Error> {
        let a = self.point_mul(p1, fe1)?;
        let b = self.point_mul(p2, fe2)?;
        let mut r = self.point()?;
        r.0.add(&self.group, &a.0, &b.0, &mut self.bn_ctx)?;
        Ok(r)
    }

    fn point_invert(&mut self, p: &mut P256Point) -> Result<(), Error> {
        p.0.invert2(&self.group, &mut self.bn_ctx)?;
        Ok(())
    }

    fn point_cofactor_mul(&mut self, p: &mut P256Point) -> Result<(), Error> {
        let mut r = self.point()?;
        r.0.mul2(&self.group, &p.0, &self.cofactor, &mut self.bn_ctx)?;
        *p = r;
        Ok(())
    }

    fn point_is_valid(&mut self, p: &P256Point) -> Result<(), Error> {
        if p.0.is_infinity(&self.group) {
            error!("Point is the identity");
            return Err(Error::InvalidPoint);
        }
        if !p.0.is_on_curve(&self.group, &mut self.bn_ctx)? {
            error!("Point is not on the curve");
            return Err(Error::InvalidPoint);
        }
        Ok(())
    }

    fn compute_L(&mut self, w1: &[u8], L: &mut [u8]) -> Result<usize, Error> {
        if L.len() < P256_POINT_LEN {
            return Err(Error::NoSpace);
        }
        let w1 = self.fe_load(w1)?;
        let mut p = self.point()?;
        p.0.mul_generator2(&self.group, &w1.0, &mut self.bn_ctx)?;
        self.point_write(&p, L)
    }
}
