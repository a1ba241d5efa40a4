mod common;

use common::exchange::{random_w, Engine, ExchangeCtx, KE_LEN};
use matter_crypto::{
    crypto::{P256_POINT_LEN, SHA256_HASH_LEN_BYTES},
    error::{Error, ErrorCategory},
    secure_channel::{
        crypto_openssl::CryptoOpenSSL,
        pake::{pase_context, PasscodeSecrets, SessionKeys, Verifier},
        spake2p::{Spake2pRole, Spake2pState},
    },
};
use rand::Rng;

#[test]
fn test_random_passcodes_agree() {
    common::init_logger();
    let mut rng = rand::thread_rng();
    for _ in 0..4 {
        let passcode: u32 = rng.gen_range(1..=99999998);
        let mut salt = [0u8; 32];
        rng.fill(&mut salt[..]);

        let secrets = PasscodeSecrets::derive::<CryptoOpenSSL>(passcode, 1000, &salt).unwrap();
        let verifier = secrets.verifier::<CryptoOpenSSL>().unwrap();

        let mut context = [0u8; SHA256_HASH_LEN_BYTES];
        pase_context(b"pbkdf-req", b"pbkdf-resp", &mut context).unwrap();

        let mut prover = Engine::new().unwrap();
        prover.init(&context).unwrap();
        prover
            .begin_prover(&[], &[], secrets.w0(), secrets.w1())
            .unwrap();
        let mut accessory = Engine::new().unwrap();
        accessory.init(&context).unwrap();
        accessory
            .begin_verifier(&[], &[], verifier.w0(), verifier.l())
            .unwrap();

        let mut ctx = ExchangeCtx {
            prover,
            verifier: accessory,
        };
        let (ke_p, ke_v) = ctx.run().unwrap();
        assert_eq!(ke_p, ke_v);

        let keys_p = SessionKeys::derive(&ke_p).unwrap();
        let keys_v = SessionKeys::derive(&ke_v).unwrap();
        assert_eq!(keys_p.i2r_key, keys_v.i2r_key);
        assert_eq!(keys_p.r2i_key, keys_v.r2i_key);
        assert_eq!(keys_p.attestation_challenge, keys_v.attestation_challenge);
    }
}

#[test]
fn test_random_w0_w1_agree() {
    common::init_logger();
    for _ in 0..8 {
        let w0 = random_w();
        let w1 = random_w();
        let mut ctx = ExchangeCtx::start(b"ctx", b"prover", b"verifier", &w0, &w1).unwrap();
        assert_eq!(ctx.prover.role(), Some(Spake2pRole::Prover));
        assert_eq!(ctx.verifier.role(), Some(Spake2pRole::Verifier));
        let (ke_p, ke_v) = ctx.run().unwrap();
        assert_eq!(ke_p, ke_v);
    }
}

#[test]
fn test_fresh_keys_per_exchange() {
    let w0 = random_w();
    let w1 = random_w();
    let (ke1, _) = ExchangeCtx::start(&[], &[], &[], &w0, &w1)
        .unwrap()
        .run()
        .unwrap();
    let (ke2, _) = ExchangeCtx::start(&[], &[], &[], &w0, &w1)
        .unwrap()
        .run()
        .unwrap();
    assert_ne!(ke1, ke2);
}

#[test]
fn test_wrong_password_fails_confirmation() {
    common::init_logger();
    let w1 = random_w();
    let mut prover = Engine::new().unwrap();
    let mut verifier = Engine::new().unwrap();
    let mut l = [0u8; P256_POINT_LEN];
    verifier.compute_L(&w1, &mut l).unwrap();

    prover.init(&[]).unwrap();
    prover.begin_prover(&[], &[], &random_w(), &w1).unwrap();
    verifier.init(&[]).unwrap();
    verifier.begin_verifier(&[], &[], &random_w(), &l).unwrap();

    let mut ctx = ExchangeCtx { prover, verifier };
    let (pa, pb) = ctx.round_one().unwrap();
    let (ca, cb) = ctx.round_two(&pa, &pb).unwrap();
    assert_eq!(ctx.verifier.key_confirm(&ca), Err(Error::MacMismatch));
    assert_eq!(ctx.prover.key_confirm(&cb), Err(Error::MacMismatch));
    assert_eq!(ctx.prover.state(), Spake2pState::Failed);
}

#[test]
fn test_mismatched_identities_fail_confirmation() {
    let w0 = random_w();
    let w1 = random_w();
    let mut ctx = ExchangeCtx::start(&[], b"alice", b"bob", &w0, &w1).unwrap();
    // Rebuild the verifier with the identities swapped
    let mut l = [0u8; P256_POINT_LEN];
    let mut verifier = Engine::new().unwrap();
    verifier.compute_L(&w1, &mut l).unwrap();
    verifier.init(&[]).unwrap();
    verifier.begin_verifier(b"alice", b"bob", &w0, &l).unwrap();
    ctx.verifier = verifier;

    let (pa, pb) = ctx.round_one().unwrap();
    let (ca, _) = ctx.round_two(&pa, &pb).unwrap();
    assert_eq!(ctx.verifier.key_confirm(&ca), Err(Error::MacMismatch));
}

#[test]
fn test_state_order() {
    let mut engine = Engine::new().unwrap();
    let mut out = [0u8; P256_POINT_LEN];
    let mut mac = [0u8; SHA256_HASH_LEN_BYTES];
    let mut ke = [0u8; KE_LEN];

    assert_eq!(engine.state(), Spake2pState::PreInit);
    assert_eq!(
        engine.begin_prover(&[], &[], &random_w(), &random_w()),
        Err(Error::InvalidState)
    );
    engine.init(b"ctx").unwrap();
    engine
        .begin_prover(&[], &[], &random_w(), &random_w())
        .unwrap();

    // Round two before round one
    let err = engine.compute_round_two(&out, &mut mac).unwrap_err();
    assert_eq!(err, Error::InvalidState);
    assert_eq!(err.category(), ErrorCategory::StatePrecondition);
    assert_eq!(engine.state(), Spake2pState::Started);

    engine.compute_round_one(&mut out).unwrap();
    assert_eq!(engine.get_keys(&mut ke), Err(Error::InvalidState));
    assert_eq!(engine.key_confirm(&mac), Err(Error::InvalidState));
    assert_eq!(engine.state(), Spake2pState::RoundOne);
    assert_eq!(ke, [0u8; KE_LEN]);
}

#[test]
fn test_get_keys_before_confirm() {
    let mut ctx = ExchangeCtx::start(&[], &[], &[], &random_w(), &random_w()).unwrap();
    let (pa, pb) = ctx.round_one().unwrap();
    ctx.round_two(&pa, &pb).unwrap();
    let mut ke = [0u8; KE_LEN];
    assert_eq!(ctx.prover.get_keys(&mut ke), Err(Error::InvalidState));
    assert_eq!(ke, [0u8; KE_LEN]);
}

#[test]
fn test_get_keys_short_buffer() {
    let mut ctx = ExchangeCtx::start(&[], &[], &[], &random_w(), &random_w()).unwrap();
    ctx.run().unwrap();
    let mut short = [0u8; SHA256_HASH_LEN_BYTES - 1];
    let err = ctx.prover.get_keys(&mut short).unwrap_err();
    assert_eq!(err, Error::NoSpace);
    assert_eq!(err.category(), ErrorCategory::LengthOrFormat);
    // Still usable with a large enough buffer
    let mut ke = [0u8; SHA256_HASH_LEN_BYTES];
    assert_eq!(ctx.prover.get_keys(&mut ke).unwrap(), KE_LEN);
}

#[test]
fn test_peer_point_rejection() {
    common::init_logger();
    let mut ctx = ExchangeCtx::start(&[], &[], &[], &random_w(), &random_w()).unwrap();
    let (pa, _) = ctx.round_one().unwrap();
    let mut mac = [0u8; SHA256_HASH_LEN_BYTES];

    // Wrong length is a format error and leaves the engine untouched
    assert_eq!(
        ctx.verifier.compute_round_two(&pa[..64], &mut mac),
        Err(Error::InvalidData)
    );
    assert_eq!(ctx.verifier.state(), Spake2pState::RoundOne);

    // All-zero coordinates do not describe a point on the curve
    let mut zero = [0u8; P256_POINT_LEN];
    zero[0] = 0x04;
    let err = ctx.verifier.compute_round_two(&zero, &mut mac).unwrap_err();
    assert_eq!(err, Error::InvalidPoint);
    assert_eq!(err.category(), ErrorCategory::Cryptographic);
    assert_eq!(ctx.verifier.state(), Spake2pState::Failed);
    assert_eq!(mac, [0u8; SHA256_HASH_LEN_BYTES]);

    let mut off_curve = pa;
    off_curve[P256_POINT_LEN - 1] ^= 0x01;
    assert_eq!(
        ctx.prover.compute_round_two(&off_curve, &mut mac),
        Err(Error::InvalidPoint)
    );
}

#[test]
fn test_mac_bit_flips_rejected() {
    let w0 = random_w();
    let w1 = random_w();
    for bit in [0usize, 7, 100, 255] {
        let mut ctx = ExchangeCtx::start(&[], &[], &[], &w0, &w1).unwrap();
        let (pa, pb) = ctx.round_one().unwrap();
        let (mut ca, mut cb) = ctx.round_two(&pa, &pb).unwrap();
        ca[bit / 8] ^= 1 << (bit % 8);
        cb[bit / 8] ^= 1 << (bit % 8);
        assert_eq!(ctx.verifier.key_confirm(&ca), Err(Error::MacMismatch));
        assert_eq!(ctx.prover.key_confirm(&cb), Err(Error::MacMismatch));

        let mut ke = [0u8; KE_LEN];
        assert_eq!(ctx.verifier.get_keys(&mut ke), Err(Error::InvalidState));
    }
}

#[test]
fn test_short_mac_is_format_error() {
    let mut ctx = ExchangeCtx::start(&[], &[], &[], &random_w(), &random_w()).unwrap();
    let (pa, pb) = ctx.round_one().unwrap();
    let (ca, _) = ctx.round_two(&pa, &pb).unwrap();
    assert_eq!(
        ctx.verifier.key_confirm(&ca[..31]),
        Err(Error::InvalidData)
    );
    assert_eq!(ctx.verifier.state(), Spake2pState::RoundTwo);
    ctx.verifier.key_confirm(&ca).unwrap();
}

#[test]
fn test_compute_l_policy() {
    let w1 = random_w();
    let mut engine = Engine::new().unwrap();
    let mut l1 = [0u8; P256_POINT_LEN];
    let mut l2 = [0u8; P256_POINT_LEN];

    // Usable before init, without moving the state
    assert_eq!(engine.compute_L(&w1, &mut l1).unwrap(), P256_POINT_LEN);
    assert_eq!(engine.state(), Spake2pState::PreInit);
    assert_eq!(l1[0], 0x04);

    engine.init(&[]).unwrap();
    engine.compute_L(&w1, &mut l2).unwrap();
    assert_eq!(engine.state(), Spake2pState::Init);
    assert_eq!(l1, l2);

    assert_eq!(
        engine.compute_L(&w1, &mut l2[..64]),
        Err(Error::NoSpace)
    );
    assert_eq!(engine.compute_L(&w1[..31], &mut l2), Err(Error::InvalidData));

    // The verifier uses exactly the L it is given: an L for another w1 is
    // accepted as a point but fails key confirmation
    let w0 = random_w();
    let mut other_l = [0u8; P256_POINT_LEN];
    engine.compute_L(&random_w(), &mut other_l).unwrap();
    engine.begin_verifier(&[], &[], &w0, &other_l).unwrap();

    let mut prover = Engine::new().unwrap();
    prover.init(&[]).unwrap();
    prover.begin_prover(&[], &[], &w0, &w1).unwrap();
    let mut ctx = ExchangeCtx {
        prover,
        verifier: engine,
    };
    let (pa, pb) = ctx.round_one().unwrap();
    let (ca, _) = ctx.round_two(&pa, &pb).unwrap();
    assert_eq!(ctx.verifier.key_confirm(&ca), Err(Error::MacMismatch));
}

#[test]
fn test_verifier_rejects_invalid_l() {
    let mut engine = Engine::new().unwrap();
    engine.init(&[]).unwrap();
    let mut l = [0u8; P256_POINT_LEN];
    l[0] = 0x04;
    assert_eq!(
        engine.begin_verifier(&[], &[], &random_w(), &l),
        Err(Error::InvalidPoint)
    );
    assert_eq!(engine.state(), Spake2pState::Failed);

    let mut engine = Engine::new().unwrap();
    engine.init(&[]).unwrap();
    assert_eq!(
        engine.begin_verifier(&[], &[], &random_w(), &l[..33]),
        Err(Error::InvalidData)
    );
    assert_eq!(engine.state(), Spake2pState::Init);
}

#[test]
fn test_stored_verifier_round_trip() {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill(&mut salt[..]);
    let secrets = PasscodeSecrets::derive::<CryptoOpenSSL>(20202021, 1000, &salt).unwrap();
    let mut stored = [0u8; 97];
    secrets
        .verifier::<CryptoOpenSSL>()
        .unwrap()
        .to_bytes(&mut stored)
        .unwrap();
    let verifier = Verifier::from_bytes::<CryptoOpenSSL>(&stored).unwrap();

    let mut prover = Engine::new().unwrap();
    prover.init(b"ctx").unwrap();
    prover
        .begin_prover(b"c", b"a", secrets.w0(), secrets.w1())
        .unwrap();
    let mut accessory = Engine::new().unwrap();
    accessory.init(b"ctx").unwrap();
    accessory
        .begin_verifier(b"a", b"c", verifier.w0(), verifier.l())
        .unwrap();
    let (ke_p, ke_v) = ExchangeCtx {
        prover,
        verifier: accessory,
    }
    .run()
    .unwrap();
    assert_eq!(ke_p, ke_v);
}

#[test]
fn test_clear_allows_reuse() {
    let w0 = random_w();
    let w1 = random_w();
    let mut ctx = ExchangeCtx::start(&[], &[], &[], &w0, &w1).unwrap();
    ctx.run().unwrap();

    ctx.prover.clear();
    ctx.verifier.clear();
    assert_eq!(ctx.prover.state(), Spake2pState::PreInit);
    assert_eq!(ctx.prover.role(), None);

    let mut l = [0u8; P256_POINT_LEN];
    ctx.verifier.compute_L(&w1, &mut l).unwrap();
    ctx.prover.init(b"second").unwrap();
    ctx.prover.begin_prover(&[], &[], &w0, &w1).unwrap();
    ctx.verifier.init(b"second").unwrap();
    ctx.verifier.begin_verifier(&[], &[], &w0, &l).unwrap();
    let (ke_p, ke_v) = ctx.run().unwrap();
    assert_eq!(ke_p, ke_v);
}
