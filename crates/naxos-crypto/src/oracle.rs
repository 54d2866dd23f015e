//! The two random oracles of NAXOS.
//!
//! Both are SHA-512 with distinct domain prefixes:
//!
//! - `H1: {0,1}* -> Z_q` turns `(esk, sk)` into the exchange exponent. The
//!   digest is expanded in counter mode to at least `|q| + 128` bits before
//!   reduction so the result is close to uniform for any size of `q`.
//! - `H2: {0,1}* -> {0,1}^512` turns the encoded shared values into the
//!   session key.

use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use crate::error::{NaxosError, Result};
use crate::group::{GroupParameters, Scalar};
use crate::session::SessionKey;

/// Domain prefix for H1.
const H1_DOMAIN: &[u8] = b"NAXOS-v1/H1";

/// Domain prefix for H2.
const H2_DOMAIN: &[u8] = b"NAXOS-v1/H2";

/// SHA-512 output size.
pub const DIGEST_LEN: usize = 64;

/// Extra bits drawn beyond `|q|` to keep the reduction bias negligible.
const H1_EXTRA_BITS: usize = 128;

/// `H1(esk, sk) mod q`.
///
/// `esk` is length-prefixed and `sk` is encoded at the fixed scalar width of
/// the group, so distinct inputs never share a preimage.
pub fn h1(params: &GroupParameters, esk: &[u8], sk: &Scalar) -> Result<Scalar> {
    let esk_len = u32::try_from(esk.len())
        .map_err(|_| NaxosError::Range("ephemeral secret too long".into()))?;
    let sk_bytes = params.encode_scalar(sk);
    let blocks = (params.order_bits() + H1_EXTRA_BITS).div_ceil(DIGEST_LEN * 8);

    let mut wide = Zeroizing::new(Vec::with_capacity(blocks * DIGEST_LEN));
    for counter in (0u32..).take(blocks) {
        let digest = Sha512::new()
            .chain_update(H1_DOMAIN)
            .chain_update(counter.to_be_bytes())
            .chain_update(esk_len.to_be_bytes())
            .chain_update(esk)
            .chain_update(sk_bytes.as_slice())
            .finalize();
        wide.extend_from_slice(&digest);
    }
    params.reduce_wide(&wide)
}

/// `H2(input)`, the session key.
pub fn h2(input: &[u8]) -> SessionKey {
    let digest = Sha512::new()
        .chain_update(H2_DOMAIN)
        .chain_update(input)
        .finalize();
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&digest);
    SessionKey::from_bytes(bytes)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use crypto_bigint::U2048;

    use super::*;

    fn toy() -> GroupParameters {
        GroupParameters::toy().unwrap()
    }

    #[test]
    fn h1_is_deterministic_and_reduced() {
        let params = toy();
        let sk = params.scalar(U2048::from_u64(92_752)).unwrap();
        let a = h1(&params, &[7u8; 64], &sk).unwrap();
        let b = h1(&params, &[7u8; 64], &sk).unwrap();
        assert_eq!(a.expose(), b.expose());
        assert!(a.expose() < params.order());
    }

    #[test]
    fn h1_depends_on_both_inputs() {
        let params = GroupParameters::modp_2048().unwrap();
        let sk1 = params.scalar(U2048::from_u64(1_000_003)).unwrap();
        let sk2 = params.scalar(U2048::from_u64(1_000_004)).unwrap();
        let base = h1(&params, &[1u8; 64], &sk1).unwrap();
        assert_ne!(base.expose(), h1(&params, &[2u8; 64], &sk1).unwrap().expose());
        assert_ne!(base.expose(), h1(&params, &[1u8; 64], &sk2).unwrap().expose());
    }

    #[test]
    fn h1_esk_length_is_part_of_the_input() {
        let params = GroupParameters::modp_2048().unwrap();
        let sk = params.scalar(U2048::from_u64(5)).unwrap();
        // Same byte stream split differently between esk and sk must differ.
        let short = h1(&params, &[0u8; 63], &sk).unwrap();
        let long = h1(&params, &[0u8; 64], &sk).unwrap();
        assert_ne!(short.expose(), long.expose());
    }

    #[test]
    fn h1_output_is_wide_for_large_groups() {
        let params = GroupParameters::modp_2048().unwrap();
        let sk = params.scalar(U2048::from_u64(42)).unwrap();
        let e = h1(&params, &[9u8; 64], &sk).unwrap();
        // A bare 512-bit digest would never exceed 2^512.
        assert!(e.expose().bits_vartime() > 1024);
        assert!(e.expose() < params.order());
    }

    #[test]
    fn h2_is_deterministic_and_input_sensitive() {
        let a = h2(b"shared input");
        let b = h2(b"shared input");
        let c = h2(b"shared inpuu");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
        assert_eq!(a.as_bytes().len(), DIGEST_LEN);
    }

    #[test]
    fn h2_is_domain_separated_from_plain_sha512() {
        let key = h2(b"abc");
        let plain = Sha512::digest(b"abc");
        assert_ne!(key.as_bytes().as_slice(), plain.as_slice());
    }
}
