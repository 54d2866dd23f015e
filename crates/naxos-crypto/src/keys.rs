//! Long-term and ephemeral key material.
//!
//! A party owns one static keypair `(sk, pk = g^sk)` for its lifetime and
//! draws a fresh 64-byte ephemeral secret for every protocol run.

use std::fmt;

use crypto_bigint::U2048;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{NaxosError, Result};
use crate::group::{GroupElement, GroupParameters, Scalar, uint_from_fixed_be};

/// Ephemeral secret length: the SHA-512 output size used by H2.
pub const EPHEMERAL_SECRET_LEN: usize = 64;

/// Give up after this many rejected draws; a working CSPRNG never gets close.
const MAX_SAMPLING_ATTEMPTS: usize = 256;

/// A long-term NAXOS keypair.
#[derive(Clone)]
pub struct StaticKeyPair {
    secret: Scalar,
    public: GroupElement,
}

impl fmt::Debug for StaticKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl StaticKeyPair {
    /// Generate a new keypair from the OS random source.
    pub fn generate(params: &GroupParameters) -> Result<Self> {
        Self::generate_with_rng(params, &mut OsRng)
    }

    /// Generate a keypair from the given CSPRNG.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(
        params: &GroupParameters,
        rng: &mut R,
    ) -> Result<Self> {
        let secret = random_scalar(params, rng)?;
        Ok(Self::from_scalar(params, secret))
    }

    /// Rebuild a keypair from a known secret in `[1, q - 1]`.
    pub fn from_secret(params: &GroupParameters, secret: U2048) -> Result<Self> {
        let secret = params.scalar(secret)?;
        Ok(Self::from_scalar(params, secret))
    }

    /// Reduce an arbitrary big-endian integer modulo `q` and use it as the secret.
    ///
    /// Fails with [`NaxosError::Range`] if the reduction lands on zero.
    pub fn from_secret_reduced(params: &GroupParameters, secret_be: &[u8]) -> Result<Self> {
        let reduced = params.reduce_wide(secret_be)?;
        Self::from_secret(params, *reduced.expose())
    }

    fn from_scalar(params: &GroupParameters, secret: Scalar) -> Self {
        let public = params.pow_generator(&secret);
        Self { secret, public }
    }

    /// The public key `pk = g^sk mod p`.
    pub const fn public_key(&self) -> &GroupElement {
        &self.public
    }

    /// The secret exponent. Handle with care.
    pub const fn secret(&self) -> &Scalar {
        &self.secret
    }
}

/// A single-use 64-byte ephemeral secret. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EphemeralSecret {
    bytes: [u8; EPHEMERAL_SECRET_LEN],
}

impl fmt::Debug for EphemeralSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EphemeralSecret([REDACTED])")
    }
}

impl EphemeralSecret {
    /// Draw a fresh secret from the OS random source.
    pub fn generate() -> Result<Self> {
        Self::generate_with_rng(&mut OsRng)
    }

    /// Draw a fresh secret from the given CSPRNG.
    ///
    /// The bytes are used directly as H1 input.
    pub fn generate_with_rng<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut bytes = [0u8; EPHEMERAL_SECRET_LEN];
        if let Err(e) = rng.try_fill_bytes(&mut bytes) {
            bytes.zeroize();
            return Err(NaxosError::Entropy(e.to_string()));
        }
        Ok(Self { bytes })
    }

    /// Wrap caller-provided bytes, e.g. fixed test vectors.
    pub const fn from_bytes(bytes: [u8; EPHEMERAL_SECRET_LEN]) -> Self {
        Self { bytes }
    }

    /// Raw secret bytes. Handle with care.
    pub const fn as_bytes(&self) -> &[u8; EPHEMERAL_SECRET_LEN] {
        &self.bytes
    }
}

/// Uniform draw from `[1, q - 1]` by masked rejection sampling.
fn random_scalar<R: RngCore + CryptoRng>(params: &GroupParameters, rng: &mut R) -> Result<Scalar> {
    let len = params.scalar_len();
    let excess_bits = len * 8 - params.order_bits();
    let mask = 0xFFu8 >> excess_bits;
    let mut buf = Zeroizing::new(vec![0u8; len]);

    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        rng.try_fill_bytes(&mut buf)
            .map_err(|e| NaxosError::Entropy(e.to_string()))?;
        buf[0] &= mask;
        let Some(candidate) = uint_from_fixed_be(&buf) else {
            continue;
        };
        // Zero and values >= q are rejected here.
        if let Ok(scalar) = params.scalar(candidate) {
            return Ok(scalar);
        }
    }
    Err(NaxosError::Entropy(
        "random source produced no value in [1, q - 1]".into(),
    ))
}
