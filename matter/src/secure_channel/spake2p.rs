use byteorder::{ByteOrder, LittleEndian};
use log::error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{MAX_HASH_LEN, MAX_POINT_LEN};
use crate::error::Error;

use super::crypto::CryptoSpake2;

#[cfg(feature = "crypto_openssl")]
use super::crypto_openssl::CryptoOpenSSL;

// This file handles the Spake2+ protocol (draft-bar-cfrg-spake2plus-01). In
// itself it is independent of the BigNum and EC operations that Spake2+
// needs; everything curve specific goes through the CryptoSpake2 trait.
//
//     Commissioner                     Accessory
//     ------------                     ---------
//
//     init
//     begin_prover
//     compute_round_one  ------------->
//                                      init
//                                      begin_verifier
//                                  /-  compute_round_one
//                      <-------------  compute_round_two
//     compute_round_two  ------------->
//     key_confirm                      key_confirm
//     get_keys                         get_keys
//
// Every exchanged value is fed to the transcript hash as an 8-byte
// little-endian length followed by the value. Both sides must hash the same
// sequence: Context, prover identity, verifier identity, M, N, X, Y, Z, V, w0.

const SPAKE2P_KEY_CONFIRM_INFO: [u8; 16] = *b"ConfirmationKeys";

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Spake2pRole {
    // Accessory, holds w0 and L
    Verifier,
    // Commissioner, holds w0 and w1
    Prover,
}

#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Spake2pState {
    PreInit,
    Init,
    Started,
    RoundOne,
    RoundTwo,
    KeyConfirmed,
    // A call failed after its preconditions held; the engine must be discarded
    Failed,
}

#[allow(non_snake_case)]
#[derive(Zeroize, ZeroizeOnDrop)]
struct Keys {
    // Ka || Ke
    KaKe: [u8; MAX_HASH_LEN],
    // KcA || KcB
    KcAKcB: [u8; MAX_HASH_LEN],
    half: usize,
}

#[allow(non_snake_case)]
impl Keys {
    fn new(hash_len: usize) -> Self {
        Self {
            KaKe: [0; MAX_HASH_LEN],
            KcAKcB: [0; MAX_HASH_LEN],
            half: hash_len / 2,
        }
    }

    fn Ke(&self) -> &[u8] {
        &self.KaKe[self.half..2 * self.half]
    }

    fn KcA(&self) -> &[u8] {
        &self.KcAKcB[..self.half]
    }

    fn KcB(&self) -> &[u8] {
        &self.KcAKcB[self.half..2 * self.half]
    }
}

#[allow(non_snake_case)]
struct CurvePoints<C: CryptoSpake2> {
    G: C::Point,
    M: C::Point,
    N: C::Point,
}

#[allow(non_snake_case)]
enum RoleSecret<C: CryptoSpake2> {
    Prover { w1: C::FieldElement },
    Verifier { L: C::Point },
}

struct Started<C: CryptoSpake2> {
    points: CurvePoints<C>,
    w0: C::FieldElement,
    secret: RoleSecret<C>,
}

#[allow(non_snake_case)]
struct RoundOne<C: CryptoSpake2> {
    started: Started<C>,
    // x for the prover, y for the verifier
    xy: C::FieldElement,
    // X for the prover, Y for the verifier
    XY: C::Point,
}

#[allow(non_snake_case)]
struct RoundTwo {
    // Our own round one contribution, which the peer MACs in key confirmation
    XY: [u8; MAX_POINT_LEN],
    keys: Keys,
}

enum State<C: CryptoSpake2> {
    PreInit,
    Init(CurvePoints<C>),
    Started(Started<C>),
    RoundOne(RoundOne<C>),
    RoundTwo(RoundTwo),
    KeyConfirmed(Keys),
    Failed,
}

impl<C: CryptoSpake2> State<C> {
    fn phase(&self) -> Spake2pState {
        match self {
            State::PreInit => Spake2pState::PreInit,
            State::Init(_) => Spake2pState::Init,
            State::Started(_) => Spake2pState::Started,
            State::RoundOne(_) => Spake2pState::RoundOne,
            State::RoundTwo(_) => Spake2pState::RoundTwo,
            State::KeyConfirmed(_) => Spake2pState::KeyConfirmed,
            State::Failed => Spake2pState::Failed,
        }
    }

    // Overwrite secrets in place, without releasing them
    fn scrub(&mut self) {
        match self {
            State::Started(s) => s.scrub(),
            State::RoundOne(r) => {
                r.started.scrub();
                r.xy.zeroize();
            }
            State::RoundTwo(r) => r.keys.zeroize(),
            State::KeyConfirmed(k) => k.zeroize(),
            State::PreInit | State::Init(_) | State::Failed => (),
        }
    }
}

impl<C: CryptoSpake2> Started<C> {
    fn scrub(&mut self) {
        self.w0.zeroize();
        if let RoleSecret::Prover { w1 } = &mut self.secret {
            w1.zeroize();
        }
    }
}

/// A Spake2+ engine for one exchange, generic over the curve binding.
///
/// Calls must follow `init`, `begin_prover`/`begin_verifier`,
/// `compute_round_one`, `compute_round_two`, `key_confirm`, `get_keys`. A call
/// made in the wrong state fails with `Error::InvalidState` and changes
/// nothing. Any other failure moves the engine to `Spake2pState::Failed` and
/// drops its secrets.
pub struct Spake2p<C: CryptoSpake2> {
    crypto: C,
    role: Option<Spake2pRole>,
    state: State<C>,
}

#[cfg(feature = "crypto_openssl")]
pub type Spake2pP256Sha256HkdfHmac = Spake2p<CryptoOpenSSL>;

#[allow(non_snake_case)]
impl<C: CryptoSpake2> Spake2p<C> {
    pub fn new() -> Result<Self, Error> {
        Ok(Self {
            crypto: C::new()?,
            role: None,
            state: State::PreInit,
        })
    }

    pub fn role(&self) -> Option<Spake2pRole> {
        self.role
    }

    pub fn state(&self) -> Spake2pState {
        self.state.phase()
    }

    fn check_state(&self, expected: Spake2pState) -> Result<(), Error> {
        if self.state.phase() == expected {
            Ok(())
        } else {
            Err(Error::InvalidState)
        }
    }

    // The caller has already checked the phase; whatever happens next, the
    // engine stays Failed until a successful transition replaces it.
    fn take_state(&mut self) -> State<C> {
        std::mem::replace(&mut self.state, State::Failed)
    }

    fn internal_hash(&mut self, data: &[u8]) -> Result<(), Error> {
        let mut len = [0u8; 8];
        LittleEndian::write_u64(&mut len, data.len() as u64);
        self.crypto.hash(&len)?;
        if !data.is_empty() {
            self.crypto.hash(data)?;
        }
        Ok(())
    }

    fn hash_point(&mut self, p: &C::Point) -> Result<(), Error> {
        let mut buf = [0u8; MAX_POINT_LEN];
        let len = self.crypto.point_write(p, &mut buf)?;
        let r = self.internal_hash(&buf[..len]);
        buf.zeroize();
        r
    }

    /// Start the exchange with context specific information, typically the
    /// transcript of the parameter negotiation.
    pub fn init(&mut self, context: &[u8]) -> Result<(), Error> {
        self.check_state(Spake2pState::PreInit)?;
        self.state = State::Failed;

        self.crypto.init_impl()?;
        let points = CurvePoints {
            G: self.crypto.generator()?,
            M: self.crypto.point_load(C::SPAKE2P_M)?,
            N: self.crypto.point_load(C::SPAKE2P_N)?,
        };
        self.internal_hash(context)?;

        self.state = State::Init(points);
        Ok(())
    }

    fn check_fe_input(fe: &[u8]) -> Result<(), Error> {
        if fe.len() == C::FE_LEN {
            Ok(())
        } else {
            Err(Error::InvalidData)
        }
    }

    fn write_MN(&mut self, points: &CurvePoints<C>) -> Result<(), Error> {
        self.hash_point(&points.M)?;
        self.hash_point(&points.N)
    }

    /// Start as a prover (commissioner). Identities may be empty.
    pub fn begin_prover(
        &mut self,
        my_identity: &[u8],
        peer_identity: &[u8],
        w0: &[u8],
        w1: &[u8],
    ) -> Result<(), Error> {
        self.check_state(Spake2pState::Init)?;
        Self::check_fe_input(w0)?;
        Self::check_fe_input(w1)?;
        let points = match self.take_state() {
            State::Init(points) => points,
            _ => return Err(Error::InvalidState),
        };

        self.internal_hash(my_identity)?;
        self.internal_hash(peer_identity)?;
        self.write_MN(&points)?;
        let w0 = self.crypto.fe_load(w0)?;
        let w1 = self.crypto.fe_load(w1)?;

        self.role = Some(Spake2pRole::Prover);
        self.state = State::Started(Started {
            points,
            w0,
            secret: RoleSecret::Prover { w1 },
        });
        Ok(())
    }

    /// Start as a verifier (accessory). `L` is the uncompressed point w1*G,
    /// either provisioned or obtained from [`Spake2p::compute_L`]; the engine
    /// never derives it on its own.
    pub fn begin_verifier(
        &mut self,
        my_identity: &[u8],
        peer_identity: &[u8],
        w0: &[u8],
        L: &[u8],
    ) -> Result<(), Error> {
        self.check_state(Spake2pState::Init)?;
        Self::check_fe_input(w0)?;
        if L.len() != C::POINT_LEN {
            return Err(Error::InvalidData);
        }
        let points = match self.take_state() {
            State::Init(points) => points,
            _ => return Err(Error::InvalidState),
        };

        self.internal_hash(peer_identity)?;
        self.internal_hash(my_identity)?;
        self.write_MN(&points)?;
        let w0 = self.crypto.fe_load(w0)?;
        let L = self.crypto.point_load(L)?;
        self.crypto.point_is_valid(&L)?;

        self.role = Some(Spake2pRole::Verifier);
        self.state = State::Started(Started {
            points,
            w0,
            secret: RoleSecret::Verifier { L },
        });
        Ok(())
    }

    /// Compute L = w1*G into `L`. Usable in any state; it does not touch
    /// the exchange.
    pub fn compute_L(&mut self, w1: &[u8], L: &mut [u8]) -> Result<usize, Error> {
        Self::check_fe_input(w1)?;
        if L.len() < C::POINT_LEN {
            return Err(Error::NoSpace);
        }
        self.crypto.compute_L(w1, L)
    }

    /// Writes pA (prover) or pB (verifier) into `out`.
    pub fn compute_round_one(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        self.round_one(out, |crypto| crypto.fe_generate())
    }

    // Same as compute_round_one, with a fixed x (or y)
    #[cfg(test)]
    fn compute_round_one_with(&mut self, xy: &[u8], out: &mut [u8]) -> Result<usize, Error> {
        self.round_one(out, |crypto| crypto.fe_load(xy))
    }

    fn round_one<F>(&mut self, out: &mut [u8], ephemeral: F) -> Result<usize, Error>
    where
        F: FnOnce(&mut C) -> Result<C::FieldElement, Error>,
    {
        self.check_state(Spake2pState::Started)?;
        if out.len() < C::POINT_LEN {
            return Err(Error::NoSpace);
        }
        let started = match self.take_state() {
            State::Started(s) => s,
            _ => return Err(Error::InvalidState),
        };

        let xy = ephemeral(&mut self.crypto)?;
        // X = x*G + w0*M, Y = y*G + w0*N
        let MN = match started.secret {
            RoleSecret::Prover { .. } => &started.points.M,
            RoleSecret::Verifier { .. } => &started.points.N,
        };
        let XY = self
            .crypto
            .point_add_mul(&started.points.G, &xy, MN, &started.w0)?;
        let len = self.crypto.point_write(&XY, out)?;

        self.state = State::RoundOne(RoundOne { started, xy, XY });
        Ok(len)
    }

    /// Consumes the peer's round one contribution and writes our key
    /// confirmation MAC (cA for the prover, cB for the verifier) into `out`.
    pub fn compute_round_two(&mut self, peer: &[u8], out: &mut [u8]) -> Result<usize, Error> {
        self.check_state(Spake2pState::RoundOne)?;
        if peer.len() != C::POINT_LEN {
            return Err(Error::InvalidData);
        }
        if out.len() < C::HASH_LEN {
            return Err(Error::NoSpace);
        }
        let RoundOne { started, xy, XY } = match self.take_state() {
            State::RoundOne(r) => r,
            _ => return Err(Error::InvalidState),
        };
        let Started {
            points,
            w0,
            secret,
        } = started;
        let is_prover = matches!(secret, RoleSecret::Prover { .. });

        let mut own = [0u8; MAX_POINT_LEN];
        self.crypto.point_write(&XY, &mut own)?;
        let own_len = C::POINT_LEN;
        if is_prover {
            self.internal_hash(&own[..own_len])?;
            self.internal_hash(peer)?;
        } else {
            self.internal_hash(peer)?;
            self.internal_hash(&own[..own_len])?;
        }

        let peer_XY = self.crypto.point_load(peer)?;
        if let Err(e) = self.crypto.point_is_valid(&peer_XY) {
            error!("Peer contribution rejected");
            return Err(e);
        }

        // The peer blinded its contribution with the other constant
        let mut MN = if is_prover { points.N } else { points.M };
        self.crypto.point_invert(&mut MN)?;

        // Z = xy * (peer_XY - w0*MN)
        let tmp = self.crypto.fe_mul(&xy, &w0)?;
        let mut Z = self.crypto.point_add_mul(&peer_XY, &xy, &MN, &tmp)?;
        self.crypto.point_cofactor_mul(&mut Z)?;

        // Prover: V = w1 * (Y - w0*N), Verifier: V = y * L
        let mut V = match &secret {
            RoleSecret::Prover { w1 } => {
                let tmp = self.crypto.fe_mul(w1, &w0)?;
                self.crypto.point_add_mul(&peer_XY, w1, &MN, &tmp)?
            }
            RoleSecret::Verifier { L } => self.crypto.point_mul(L, &xy)?,
        };
        self.crypto.point_cofactor_mul(&mut V)?;

        self.hash_point(&Z)?;
        self.hash_point(&V)?;
        let mut w0_buf = [0u8; MAX_POINT_LEN];
        let w0_len = self.crypto.fe_write(&w0, &mut w0_buf)?;
        let r = self.internal_hash(&w0_buf[..w0_len]);
        w0_buf.zeroize();
        r?;

        let keys = self.generate_keys()?;

        // cA = HMAC(KcA, Y), cB = HMAC(KcB, X)
        let kc = if is_prover { keys.KcA() } else { keys.KcB() };
        let len = self.crypto.mac(kc, peer, out)?;

        self.state = State::RoundTwo(RoundTwo { XY: own, keys });
        Ok(len)
    }

    fn generate_keys(&mut self) -> Result<Keys, Error> {
        let mut keys = Keys::new(C::HASH_LEN);
        // Ka || Ke = Hash(TT)
        self.crypto.hash_finalize(&mut keys.KaKe[..C::HASH_LEN])?;
        // KcA || KcB = KDF(nil, Ka, "ConfirmationKeys")
        let Keys { KaKe, KcAKcB, half } = &mut keys;
        self.crypto.kdf(
            &KaKe[..*half],
            &[],
            &SPAKE2P_KEY_CONFIRM_INFO,
            &mut KcAKcB[..C::HASH_LEN],
        )?;
        Ok(keys)
    }

    /// Verify the peer's key confirmation MAC.
    pub fn key_confirm(&mut self, peer_mac: &[u8]) -> Result<(), Error> {
        self.check_state(Spake2pState::RoundTwo)?;
        if peer_mac.len() != C::HASH_LEN {
            return Err(Error::InvalidData);
        }
        let r2 = match self.take_state() {
            State::RoundTwo(r) => r,
            _ => return Err(Error::InvalidState),
        };

        let kc = match self.role {
            Some(Spake2pRole::Prover) => r2.keys.KcB(),
            Some(Spake2pRole::Verifier) => r2.keys.KcA(),
            None => return Err(Error::InvalidState),
        };
        if let Err(e) = self
            .crypto
            .mac_verify(kc, peer_mac, &r2.XY[..C::POINT_LEN])
        {
            error!("Key confirmation failed");
            return Err(e);
        }

        let RoundTwo { keys, .. } = r2;
        self.state = State::KeyConfirmed(keys);
        Ok(())
    }

    /// Copy the shared secret Ke into `out`, which must hold at least
    /// HASH_LEN bytes. Returns the length of Ke, HASH_LEN / 2.
    pub fn get_keys(&self, out: &mut [u8]) -> Result<usize, Error> {
        let keys = match &self.state {
            State::KeyConfirmed(keys) => keys,
            _ => return Err(Error::InvalidState),
        };
        let ke = keys.Ke();
        if out.len() < C::HASH_LEN {
            return Err(Error::NoSpace);
        }
        out[..ke.len()].copy_from_slice(ke);
        Ok(ke.len())
    }

    /// Overwrite every secret held by the engine and return it to PreInit.
    pub fn clear(&mut self) {
        self.state.scrub();
        self.state = State::PreInit;
        self.role = None;
        // Drops the transcript, which has absorbed Z, V and w0
        let _ = self.crypto.init_impl();
    }
}

impl<C: CryptoSpake2> Drop for Spake2p<C> {
    fn drop(&mut self) {
        self.clear();
    }
}
