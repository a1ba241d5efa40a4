extern crate clap;
use clap::{App, Arg};
use log::{error, info};
use matter_crypto::crypto::{drbg_get_bytes, P256_POINT_LEN, SHA256_HASH_LEN_BYTES};
use matter_crypto::error::Error;
use matter_crypto::secure_channel::crypto_openssl::CryptoOpenSSL;
use matter_crypto::secure_channel::pake::{
    pase_context, PasscodeSecrets, SessionKeys, Verifier, PBKDF2_ITERATIONS_MIN,
    PBKDF2_SALT_LEN_MIN,
};
use matter_crypto::secure_channel::spake2p::Spake2pP256Sha256HkdfHmac;
use simple_logger::SimpleLogger;
use std::process;

fn main() {
    if SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .with_colors(true)
        .without_timestamps()
        .init()
        .is_err()
    {
        eprintln!("Logger already initialised");
    }

    let m = App::new("spake2p_tool")
        .arg(
            Arg::with_name("passcode")
                .short("p")
                .long("passcode")
                .takes_value(true)
                .required(true)
                .help("The setup passcode"),
        )
        .arg(
            Arg::with_name("salt")
                .short("s")
                .long("salt")
                .takes_value(true)
                .help("PBKDF2 salt in hexadecimal (Default: random 16 bytes)"),
        )
        .arg(
            Arg::with_name("iterations")
                .short("i")
                .long("iterations")
                .takes_value(true)
                .help("PBKDF2 iteration count (Default: 1000)"),
        )
        .arg(
            Arg::with_name("exchange")
                .short("x")
                .long("exchange")
                .help("Also run a local commissioner/accessory exchange"),
        )
        .get_matches();

    let passcode = match m.value_of("passcode").map(str::parse::<u32>) {
        Some(Ok(p)) => p,
        _ => {
            eprintln!("Error parsing passcode");
            process::exit(1);
        }
    };

    let iterations = match m.value_of("iterations") {
        Some(i) => match i.parse::<u32>() {
            Ok(i) => i,
            Err(_) => {
                eprintln!("Error parsing iteration count: {}", i);
                process::exit(1);
            }
        },
        None => PBKDF2_ITERATIONS_MIN,
    };

    let salt = match m.value_of("salt") {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(s);
            match hex::decode(s) {
                Ok(salt) => salt,
                Err(e) => {
                    eprintln!("Error parsing salt: {}", e);
                    process::exit(1);
                }
            }
        }
        None => {
            let mut salt = vec![0; PBKDF2_SALT_LEN_MIN];
            if drbg_get_bytes(&mut salt).is_err() {
                eprintln!("Failed to generate a salt");
                process::exit(1);
            }
            salt
        }
    };

    if let Err(e) = run(passcode, iterations, &salt, m.is_present("exchange")) {
        error!("Failed: {}", e);
        process::exit(1);
    }
}

fn run(passcode: u32, iterations: u32, salt: &[u8], exchange: bool) -> Result<(), Error> {
    let secrets = PasscodeSecrets::derive::<CryptoOpenSSL>(passcode, iterations, salt)?;
    let verifier = secrets.verifier::<CryptoOpenSSL>()?;

    let mut stored = [0u8; 128];
    let len = verifier.to_bytes(&mut stored)?;
    println!("Iterations: {}", iterations);
    println!("Salt:       {}", hex::encode(salt));
    println!("Verifier:   {}", hex::encode(&stored[..len]));

    if exchange {
        local_exchange(&secrets, &Verifier::from_bytes::<CryptoOpenSSL>(&stored[..len])?)?;
    }
    Ok(())
}

fn local_exchange(secrets: &PasscodeSecrets, verifier: &Verifier) -> Result<(), Error> {
    let mut context = [0u8; SHA256_HASH_LEN_BYTES];
    pase_context(b"spake2p_tool request", b"spake2p_tool response", &mut context)?;

    let mut prover = Spake2pP256Sha256HkdfHmac::new()?;
    let mut accessory = Spake2pP256Sha256HkdfHmac::new()?;
    prover.init(&context)?;
    prover.begin_prover(&[], &[], secrets.w0(), secrets.w1())?;
    accessory.init(&context)?;
    accessory.begin_verifier(&[], &[], verifier.w0(), verifier.l())?;

    let mut pa = [0u8; P256_POINT_LEN];
    let mut pb = [0u8; P256_POINT_LEN];
    prover.compute_round_one(&mut pa)?;
    accessory.compute_round_one(&mut pb)?;
    info!("pA: {}", hex::encode(pa));
    info!("pB: {}", hex::encode(pb));

    let mut ca = [0u8; SHA256_HASH_LEN_BYTES];
    let mut cb = [0u8; SHA256_HASH_LEN_BYTES];
    accessory.compute_round_two(&pa, &mut cb)?;
    prover.compute_round_two(&pb, &mut ca)?;
    info!("cA: {}", hex::encode(ca));
    info!("cB: {}", hex::encode(cb));

    accessory.key_confirm(&ca)?;
    prover.key_confirm(&cb)?;

    let mut ke_p = [0u8; SHA256_HASH_LEN_BYTES];
    let mut ke_a = [0u8; SHA256_HASH_LEN_BYTES];
    let len = prover.get_keys(&mut ke_p)?;
    accessory.get_keys(&mut ke_a)?;
    if ke_p[..len] != ke_a[..len] {
        return Err(Error::MacMismatch);
    }

    let keys = SessionKeys::derive(&ke_p[..len])?;
    println!("I2R key:    {}", hex::encode(keys.i2r_key));
    println!("R2I key:    {}", hex::encode(keys.r2i_key));
    println!("Att. chal.: {}", hex::encode(keys.attestation_challenge));
    Ok(())
}
