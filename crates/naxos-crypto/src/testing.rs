//! Fixed test vectors and a mid-size test group.

use sha2::{Digest, Sha512};

use crate::error::Result;
use crate::group::GroupParameters;
use crate::keys::{EPHEMERAL_SECRET_LEN, EphemeralSecret};

/// Initiator's long-term secret before reduction mod q.
pub const TOY_SECRET_A: u64 = 20_437_654_686_587_653;
/// Responder's long-term secret before reduction mod q.
pub const TOY_SECRET_B: u64 = 66_918_976_967_567_567;

/// 256-bit safe prime `p = 2q + 1` with `p = 3 (mod 8)`, generator 4.
const GROUP_256_MODULUS: &str = "c1bb77736557d74e0f7402388c98bc06d12bc24e0901bb1d653019ad548f482b";
const GROUP_256_ORDER: &str = "60ddbbb9b2abeba707ba011c464c5e036895e1270480dd8eb2980cd6aa47a415";

/// A 256-bit group: large enough that H1 collisions never show up in tests,
/// small enough to keep exponentiation cheap.
pub fn group_256() -> Result<GroupParameters> {
    GroupParameters::from_hex(GROUP_256_MODULUS, GROUP_256_ORDER, "4")
}

/// Deterministic stand-in ephemeral secret: `SHA-512(label)`.
pub fn fixed_ephemeral(label: &[u8]) -> EphemeralSecret {
    let mut bytes = [0u8; EPHEMERAL_SECRET_LEN];
    bytes.copy_from_slice(&Sha512::digest(label));
    EphemeralSecret::from_bytes(bytes)
}

/// Ephemeral bytes for which `H1(esk, TOY_SECRET_A mod q)` is 0 in the toy group.
pub fn zero_exponent_ephemeral() -> EphemeralSecret {
    let mut bytes = [0u8; EPHEMERAL_SECRET_LEN];
    bytes[EPHEMERAL_SECRET_LEN - 8..].copy_from_slice(&174_512u64.to_be_bytes());
    EphemeralSecret::from_bytes(bytes)
}
