//! Safe-prime group parameters.
//!
//! All protocol arithmetic happens in the order-`q` subgroup of `Z_p^*`
//! where `p = 2q + 1`. Exponentiation uses Montgomery form with a fixed
//! window schedule, so running time depends only on the public bit length
//! of `q` and never on the exponent value.

use std::fmt;

use crypto_bigint::modular::runtime_mod::{DynResidue, DynResidueParams};
use crypto_bigint::{Encoding, NonZero, U2048, U4096};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{NaxosError, Result};

/// Widest supported modulus.
pub const MAX_MODULUS_BITS: usize = 2048;

const LIMBS: usize = U2048::LIMBS;

/// RFC 3526 group 14 prime (2048-bit MODP).
const MODP_2048_PRIME: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1\
    29024E088A67CC74020BBEA63B139B22514A08798E3404DD\
    EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245\
    E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D\
    C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F\
    83655D23DCA3AD961C62F356208552BB9ED529077096966D\
    670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9\
    DE2BCBF6955817183995497CEA956AE515D2261898FA0510\
    15728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// Demonstration group: `p = 292427`, `q = 146213`.
const TOY_MODULUS: u64 = 292_427;
const TOY_ORDER: u64 = 146_213;
/// `2` has order `2q` here (p = 3 mod 8), so the subgroup generator is `2^2`.
const TOY_GENERATOR: u64 = 4;

/// Validated description of a safe-prime group `(p, q, g)`.
///
/// Immutable after construction and safe to share between threads.
#[derive(Clone)]
pub struct GroupParameters {
    modulus: U2048,
    order: U2048,
    generator: U2048,
    monty: DynResidueParams<LIMBS>,
    order_wide: NonZero<U4096>,
    order_bits: usize,
    element_len: usize,
    scalar_len: usize,
}

impl fmt::Debug for GroupParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupParameters")
            .field("modulus_bits", &self.modulus.bits_vartime())
            .field("order_bits", &self.order_bits)
            .field("generator", &hex::encode(self.encode_fixed(&self.generator, self.element_len)))
            .finish()
    }
}

impl PartialEq for GroupParameters {
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus
            && self.order == other.order
            && self.generator == other.generator
    }
}

impl Eq for GroupParameters {}

impl GroupParameters {
    /// Validate `(p, q, g)` and build the group.
    ///
    /// Fails with [`NaxosError::InvalidGroup`] unless `p = 2q + 1`, both are
    /// prime, and `g` generates the subgroup of order `q`.
    pub fn new(modulus: U2048, order: U2048, generator: U2048) -> Result<Self> {
        if order.bits_vartime() >= MAX_MODULUS_BITS {
            return Err(NaxosError::InvalidGroup(format!(
                "modulus must fit in {MAX_MODULUS_BITS} bits"
            )));
        }
        if order.shl_vartime(1).wrapping_add(&U2048::ONE) != modulus {
            return Err(NaxosError::InvalidGroup(
                "modulus must equal 2 * order + 1".into(),
            ));
        }
        if !crypto_primes::is_prime(&order) {
            return Err(NaxosError::InvalidGroup("order is not prime".into()));
        }
        if !crypto_primes::is_prime(&modulus) {
            return Err(NaxosError::InvalidGroup("modulus is not prime".into()));
        }
        if generator <= U2048::ONE || generator >= modulus {
            return Err(NaxosError::InvalidGroup(
                "generator must lie in [2, p - 1]".into(),
            ));
        }

        // p = 2q + 1 with q prime, so p is odd and Montgomery form applies.
        let monty = DynResidueParams::new(&modulus);
        let order_bits = order.bits_vartime();
        let g_to_q = DynResidue::new(&generator, monty)
            .pow_bounded_exp(&order, order_bits)
            .retrieve();
        if g_to_q != U2048::ONE {
            return Err(NaxosError::InvalidGroup(
                "generator does not have order q".into(),
            ));
        }

        let order_wide = Option::<NonZero<U4096>>::from(NonZero::new(widen(&order)))
            .ok_or_else(|| NaxosError::InvalidGroup("order is zero".into()))?;

        let params = Self {
            modulus,
            order,
            generator,
            monty,
            order_wide,
            order_bits,
            element_len: modulus.bits_vartime().div_ceil(8),
            scalar_len: order_bits.div_ceil(8),
        };
        tracing::debug!(
            modulus_bits = modulus.bits_vartime(),
            order_bits,
            "group parameters validated"
        );
        Ok(params)
    }

    /// Build from big-endian hex strings (optional `0x` prefix, whitespace ignored).
    pub fn from_hex(modulus: &str, order: &str, generator: &str) -> Result<Self> {
        Self::new(
            parse_hex_uint(modulus, "modulus")?,
            parse_hex_uint(order, "order")?,
            parse_hex_uint(generator, "generator")?,
        )
    }

    /// RFC 3526 2048-bit MODP group (group 14) with `g = 2`.
    pub fn modp_2048() -> Result<Self> {
        let modulus = parse_hex_uint(MODP_2048_PRIME, "modulus")?;
        let order = modulus.shr_vartime(1);
        Self::new(modulus, order, U2048::from_u64(2))
    }

    /// Small demonstration group. Offers no security.
    pub fn toy() -> Result<Self> {
        Self::new(
            U2048::from_u64(TOY_MODULUS),
            U2048::from_u64(TOY_ORDER),
            U2048::from_u64(TOY_GENERATOR),
        )
    }

    /// Look up a named preset (`"modp2048"` or `"toy"`).
    pub fn preset(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "modp2048" | "modp-2048" | "rfc3526-14" => Self::modp_2048(),
            "toy" => Self::toy(),
            other => Err(NaxosError::Config(format!("unknown group preset: {other}"))),
        }
    }

    pub const fn modulus(&self) -> &U2048 {
        &self.modulus
    }

    pub const fn order(&self) -> &U2048 {
        &self.order
    }

    pub const fn generator(&self) -> &U2048 {
        &self.generator
    }

    /// Byte width of an encoded group element.
    pub const fn element_len(&self) -> usize {
        self.element_len
    }

    /// Byte width of an encoded exponent.
    pub const fn scalar_len(&self) -> usize {
        self.scalar_len
    }

    /// Bit length of `q`.
    pub const fn order_bits(&self) -> usize {
        self.order_bits
    }

    /// Accept `value` as a group element if `1 <= value < p` and `value^q = 1`.
    pub fn element(&self, value: U2048) -> Result<GroupElement> {
        if value < U2048::ONE || value >= self.modulus {
            return Err(NaxosError::Range("group element outside [1, p - 1]".into()));
        }
        if self.pow_uint(&value, &self.order) != U2048::ONE {
            return Err(NaxosError::Range(
                "value is not in the order-q subgroup".into(),
            ));
        }
        Ok(GroupElement(value))
    }

    /// Decode a fixed-width big-endian group element.
    pub fn element_from_bytes(&self, bytes: &[u8]) -> Result<GroupElement> {
        if bytes.len() != self.element_len {
            return Err(NaxosError::Range(format!(
                "group element must be {} bytes, got {}",
                self.element_len,
                bytes.len()
            )));
        }
        let value = uint_from_be_slice(bytes)
            .ok_or_else(|| NaxosError::Range("group element too wide".into()))?;
        self.element(value)
    }

    /// Accept `value` as a secret exponent in `[1, q - 1]`.
    pub fn scalar(&self, value: U2048) -> Result<Scalar> {
        let scalar = Scalar(value);
        if scalar.0 < U2048::ONE || scalar.0 >= self.order {
            return Err(NaxosError::Range("exponent outside [1, q - 1]".into()));
        }
        Ok(scalar)
    }

    /// Reduce an arbitrary big-endian integer of up to 4096 bits modulo `q`.
    pub fn reduce_wide(&self, bytes: &[u8]) -> Result<Scalar> {
        if bytes.len() > U4096::BYTES {
            return Err(NaxosError::Range(format!(
                "cannot reduce more than {} bytes",
                U4096::BYTES
            )));
        }
        let mut buf = Zeroizing::new([0u8; U4096::BYTES]);
        buf[U4096::BYTES - bytes.len()..].copy_from_slice(bytes);
        let wide = Zeroizing::new(U4096::from_be_slice(&*buf));
        let reduced = Zeroizing::new(wide.rem(&self.order_wide));
        let reduced_bytes = Zeroizing::new(reduced.to_be_bytes());
        Ok(Scalar(U2048::from_be_slice(
            &reduced_bytes[U4096::BYTES - U2048::BYTES..],
        )))
    }

    /// `g^exp mod p`.
    pub fn pow_generator(&self, exp: &Scalar) -> GroupElement {
        GroupElement(self.pow_uint(&self.generator, &exp.0))
    }

    /// `base^exp mod p`; the result stays in the subgroup.
    pub fn pow(&self, base: &GroupElement, exp: &Scalar) -> GroupElement {
        GroupElement(self.pow_uint(&base.0, &exp.0))
    }

    /// Fixed-width big-endian encoding of a group element.
    pub fn encode_element(&self, element: &GroupElement) -> Vec<u8> {
        self.encode_fixed(&element.0, self.element_len)
    }

    /// Append the fixed-width encoding without an intermediate copy.
    pub(crate) fn append_element(&self, element: &GroupElement, out: &mut Vec<u8>) {
        let bytes = Zeroizing::new(element.0.to_be_bytes());
        out.extend_from_slice(&bytes[U2048::BYTES - self.element_len..]);
    }

    pub(crate) fn encode_scalar(&self, scalar: &Scalar) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.encode_fixed(&scalar.0, self.scalar_len))
    }

    /// Exponents are always below `q`, so only `order_bits` bits are walked.
    fn pow_uint(&self, base: &U2048, exp: &U2048) -> U2048 {
        DynResidue::new(base, self.monty)
            .pow_bounded_exp(exp, self.order_bits)
            .retrieve()
    }

    fn encode_fixed(&self, value: &U2048, len: usize) -> Vec<u8> {
        let bytes = Zeroizing::new(value.to_be_bytes());
        bytes[U2048::BYTES - len..].to_vec()
    }
}

/// Element of the order-`q` subgroup. Public data.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct GroupElement(U2048);

impl GroupElement {
    pub const fn as_uint(&self) -> &U2048 {
        &self.0
    }
}

// Shared Diffie-Hellman values are group elements too and must be wiped.
impl Zeroize for GroupElement {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for GroupElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.0.to_be_bytes();
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        write!(f, "GroupElement({})", hex::encode(&bytes[start..]))
    }
}

/// Secret exponent modulo `q`. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Scalar(U2048);

impl Scalar {
    /// Raw integer value. Handle with care.
    pub const fn expose(&self) -> &U2048 {
        &self.0
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Scalar([REDACTED])")
    }
}

/// Left-pad a fixed-width big-endian buffer into a `U2048`.
///
/// Timing depends only on `bytes.len()`, so this is the decoder for secret
/// bytes. `None` if the buffer is wider than 2048 bits.
pub(crate) fn uint_from_fixed_be(bytes: &[u8]) -> Option<U2048> {
    if bytes.len() > U2048::BYTES {
        return None;
    }
    let mut buf = Zeroizing::new([0u8; U2048::BYTES]);
    buf[U2048::BYTES - bytes.len()..].copy_from_slice(bytes);
    Some(U2048::from_be_slice(&*buf))
}

/// Left-pad a big-endian byte string into a `U2048`, ignoring leading zeros.
///
/// Variable time; only for public input.
pub(crate) fn uint_from_be_slice(bytes: &[u8]) -> Option<U2048> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > U2048::BYTES {
        return None;
    }
    let mut buf = Zeroizing::new([0u8; U2048::BYTES]);
    buf[U2048::BYTES - significant.len()..].copy_from_slice(significant);
    Some(U2048::from_be_slice(&*buf))
}

fn widen(value: &U2048) -> U4096 {
    let mut buf = [0u8; U4096::BYTES];
    buf[U4096::BYTES - U2048::BYTES..].copy_from_slice(&value.to_be_bytes());
    U4096::from_be_slice(&buf)
}

fn parse_hex_uint(input: &str, what: &str) -> Result<U2048> {
    let mut digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(stripped) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        digits = stripped.to_string();
    }
    if digits.is_empty() {
        return Err(NaxosError::InvalidGroup(format!("{what} is empty")));
    }
    if digits.len() % 2 == 1 {
        digits.insert(0, '0');
    }
    let bytes = hex::decode(&digits)
        .map_err(|e| NaxosError::InvalidGroup(format!("{what} is not valid hex: {e}")))?;
    uint_from_be_slice(&bytes).ok_or_else(|| {
        NaxosError::InvalidGroup(format!("{what} exceeds {MAX_MODULUS_BITS} bits"))
    })
}
