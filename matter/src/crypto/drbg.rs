//! Process-wide deterministic random bit generator.
//!
//! The generator is seeded from the operating system and from every entropy
//! source registered with [`add_entropy_source`]. Registering a source
//! forces a reseed on the next request; the generator also reseeds itself
//! after [`RESEED_INTERVAL`] requests.

use std::sync::Mutex;

use log::{debug, error};
use rand::{rngs::OsRng, rngs::StdRng, RngCore, SeedableRng};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::Error;

pub const RESEED_INTERVAL: u64 = 1 << 16;

// Upper bound on calls made to one source while collecting its threshold
const MAX_SOURCE_POLLS: usize = 64;

/// Something that can fill a buffer with entropy.
///
/// Returns the number of bytes actually written. Closures of the shape
/// `FnMut(&mut [u8]) -> Result<usize, Error>` implement this directly.
pub trait EntropySource: Send {
    fn fill(&mut self, out: &mut [u8]) -> Result<usize, Error>;
}

impl<F> EntropySource for F
where
    F: FnMut(&mut [u8]) -> Result<usize, Error> + Send,
{
    fn fill(&mut self, out: &mut [u8]) -> Result<usize, Error> {
        self(out)
    }
}

struct Source {
    source: Box<dyn EntropySource>,
    threshold: usize,
}

impl Source {
    fn collect(&mut self, hasher: &mut Sha256) -> Result<(), Error> {
        let mut buf = [0u8; 32];
        let mut collected = 0;
        let mut polls = 0;
        while collected < self.threshold {
            if polls == MAX_SOURCE_POLLS {
                error!("Entropy source did not reach its threshold");
                return Err(Error::Invalid);
            }
            polls += 1;
            let len = self.source.fill(&mut buf)?.min(buf.len());
            hasher.update(&buf[..len]);
            collected += len;
        }
        buf.zeroize();
        Ok(())
    }
}

struct Drbg {
    rng: Option<StdRng>,
    sources: Vec<Source>,
    requests: u64,
}

impl Drbg {
    const fn new() -> Self {
        Self {
            rng: None,
            sources: Vec::new(),
            requests: 0,
        }
    }

    fn reseed(&mut self) -> Result<(), Error> {
        let mut hasher = Sha256::new();
        let mut os = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut os)
            .map_err(|_x| Error::Crypto)?;
        hasher.update(os);
        os.zeroize();
        for s in self.sources.iter_mut() {
            s.collect(&mut hasher)?;
        }

        let mut seed = <StdRng as SeedableRng>::Seed::default();
        seed.copy_from_slice(hasher.finalize().as_slice());
        self.rng = Some(StdRng::from_seed(seed));
        seed.zeroize();
        self.requests = 0;
        debug!("DRBG reseeded from {} extra source(s)", self.sources.len());
        Ok(())
    }

    fn fill(&mut self, out: &mut [u8]) -> Result<(), Error> {
        if self.rng.is_none() || self.requests >= RESEED_INTERVAL {
            self.reseed()?;
        }
        let rng = self.rng.as_mut().ok_or(Error::InvalidState)?;
        rng.try_fill_bytes(out).map_err(|_x| Error::Crypto)?;
        self.requests += 1;
        Ok(())
    }
}

static DRBG: Mutex<Drbg> = Mutex::new(Drbg::new());

/// Seed the generator now instead of on first use.
pub fn drbg_init() -> Result<(), Error> {
    DRBG.lock()?.reseed()
}

/// Drop the generator state and every registered source.
pub fn drbg_deinit() -> Result<(), Error> {
    let mut drbg = DRBG.lock()?;
    drbg.rng = None;
    drbg.sources.clear();
    drbg.requests = 0;
    Ok(())
}

/// Register an additional entropy source. At least `threshold` bytes are
/// pulled from it on every reseed.
pub fn add_entropy_source(source: Box<dyn EntropySource>, threshold: usize) -> Result<(), Error> {
    let mut drbg = DRBG.lock()?;
    drbg.sources.push(Source { source, threshold });
    // Fold the new source in before the next output
    drbg.rng = None;
    Ok(())
}

pub fn drbg_get_bytes(out: &mut [u8]) -> Result<(), Error> {
    if out.is_empty() {
        return Err(Error::Invalid);
    }
    DRBG.lock()?.fill(out)
}
