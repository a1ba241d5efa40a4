use matter_crypto::{
    crypto::{drbg_get_bytes, P256_FE_LEN, P256_POINT_LEN, SHA256_HASH_LEN_BYTES},
    error::Error,
    secure_channel::spake2p::{Spake2pP256Sha256HkdfHmac, Spake2pState},
};

pub type Engine = Spake2pP256Sha256HkdfHmac;

pub const KE_LEN: usize = SHA256_HASH_LEN_BYTES / 2;

/// Both ends of a Spake2+ exchange, started with the same context.
pub struct ExchangeCtx {
    pub prover: Engine,
    pub verifier: Engine,
}

impl ExchangeCtx {
    pub fn start(
        context: &[u8],
        prover_id: &[u8],
        verifier_id: &[u8],
        w0: &[u8],
        w1: &[u8],
    ) -> Result<Self, Error> {
        let mut prover = Engine::new()?;
        let mut verifier = Engine::new()?;

        let mut l = [0u8; P256_POINT_LEN];
        verifier.compute_L(w1, &mut l)?;

        prover.init(context)?;
        prover.begin_prover(prover_id, verifier_id, w0, w1)?;
        verifier.init(context)?;
        verifier.begin_verifier(verifier_id, prover_id, w0, &l)?;
        Ok(Self { prover, verifier })
    }

    /// Round one on both sides, returning (pA, pB).
    pub fn round_one(&mut self) -> Result<([u8; P256_POINT_LEN], [u8; P256_POINT_LEN]), Error> {
        let mut pa = [0u8; P256_POINT_LEN];
        let mut pb = [0u8; P256_POINT_LEN];
        self.prover.compute_round_one(&mut pa)?;
        self.verifier.compute_round_one(&mut pb)?;
        Ok((pa, pb))
    }

    /// Round two on both sides, returning (cA, cB).
    pub fn round_two(
        &mut self,
        pa: &[u8],
        pb: &[u8],
    ) -> Result<([u8; SHA256_HASH_LEN_BYTES], [u8; SHA256_HASH_LEN_BYTES]), Error> {
        let mut ca = [0u8; SHA256_HASH_LEN_BYTES];
        let mut cb = [0u8; SHA256_HASH_LEN_BYTES];
        self.verifier.compute_round_two(pa, &mut cb)?;
        self.prover.compute_round_two(pb, &mut ca)?;
        Ok((ca, cb))
    }

    /// Run the whole exchange and return (prover Ke, verifier Ke).
    pub fn run(&mut self) -> Result<([u8; KE_LEN], [u8; KE_LEN]), Error> {
        let (pa, pb) = self.round_one()?;
        let (ca, cb) = self.round_two(&pa, &pb)?;
        self.verifier.key_confirm(&ca)?;
        self.prover.key_confirm(&cb)?;
        assert_eq!(self.prover.state(), Spake2pState::KeyConfirmed);
        assert_eq!(self.verifier.state(), Spake2pState::KeyConfirmed);

        let mut ke_p = [0u8; SHA256_HASH_LEN_BYTES];
        let mut ke_v = [0u8; SHA256_HASH_LEN_BYTES];
        assert_eq!(self.prover.get_keys(&mut ke_p)?, KE_LEN);
        assert_eq!(self.verifier.get_keys(&mut ke_v)?, KE_LEN);
        // Nothing is written past Ke
        assert_eq!(ke_p[KE_LEN..], [0u8; KE_LEN]);

        let mut out = ([0u8; KE_LEN], [0u8; KE_LEN]);
        out.0.copy_from_slice(&ke_p[..KE_LEN]);
        out.1.copy_from_slice(&ke_v[..KE_LEN]);
        Ok(out)
    }
}

/// A random scalar, kept below the group order.
pub fn random_w() -> [u8; P256_FE_LEN] {
    let mut w = [0u8; P256_FE_LEN];
    drbg_get_bytes(&mut w).unwrap();
    w[0] &= 0x7f;
    w
}
