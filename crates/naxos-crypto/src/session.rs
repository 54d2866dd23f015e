//! Session key derivation.
//!
//! Both parties compute the same three group elements from different
//! secrets:
//!
//! | term | initiator A     | responder B     | value          |
//! |------|-----------------|-----------------|----------------|
//! | k1   | `Y^skA`         | `pkA^eB`        | `g^(skA*eB)`   |
//! | k2   | `pkB^eA`        | `X^skB`         | `g^(eA*skB)`   |
//! | k3   | `Y^eA`          | `X^eB`          | `g^(eA*eB)`    |
//!
//! and hash them with both identities through H2. The H2 input is
//! `k1 || k2 || k3 || len(id_A) || id_A || len(id_B) || id_B` with each `k`
//! at the fixed element width of the group and each length a big-endian
//! `u32`, so no two distinct inputs share an encoding.

use std::fmt;

use crypto_bigint::U2048;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{NaxosError, Result};
use crate::group::{GroupElement, GroupParameters};
use crate::keys::{EphemeralSecret, StaticKeyPair};
use crate::exchange::exchange_exponent;
use crate::oracle::{DIGEST_LEN, h2};

/// Session key length in bytes.
pub const SESSION_KEY_LEN: usize = DIGEST_LEN;

/// Which side of the exchange a party plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Party A, sends `X`.
    Initiator,
    /// Party B, sends `Y`.
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiator => write!(f, "initiator"),
            Self::Responder => write!(f, "responder"),
        }
    }
}

/// The agreed `(id_A, id_B)` ordering for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub initiator: String,
    pub responder: String,
}

impl SessionIdentity {
    pub fn new(initiator: impl Into<String>, responder: impl Into<String>) -> Self {
        Self {
            initiator: initiator.into(),
            responder: responder.into(),
        }
    }
}

/// The peer's public data as received over the message channel.
#[derive(Debug, Clone, Copy)]
pub struct PeerPublic<'a> {
    /// Peer's long-term public key.
    pub static_public: &'a GroupElement,
    /// Peer's exchange value (`X` or `Y`).
    pub public_value: &'a GroupElement,
}

/// A derived 64-byte session key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    bytes: [u8; SESSION_KEY_LEN],
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

impl PartialEq for SessionKey {
    fn eq(&self, other: &Self) -> bool {
        equal_keys(self, other)
    }
}

impl Eq for SessionKey {}

impl SessionKey {
    pub(crate) const fn from_bytes(bytes: [u8; SESSION_KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Raw key bytes. Handle with care.
    pub const fn as_bytes(&self) -> &[u8; SESSION_KEY_LEN] {
        &self.bytes
    }
}

/// Initiator side: `H2(Y^skA, pkB^eA, Y^eA, id_A, id_B)`.
pub fn derive_initiator_key(
    params: &GroupParameters,
    esk: &EphemeralSecret,
    own: &StaticKeyPair,
    peer: PeerPublic<'_>,
    ids: &SessionIdentity,
) -> Result<SessionKey> {
    let peer_static = revalidate(params, peer.static_public)?;
    let y = revalidate(params, peer.public_value)?;
    let e = exchange_exponent(params, esk, own.secret())?;

    let shared = Zeroizing::new([
        params.pow(&y, own.secret()),
        params.pow(&peer_static, &e),
        params.pow(&y, &e),
    ]);
    let key = hash_shared(params, &shared, ids)?;
    tracing::debug!(role = %Role::Initiator, initiator = %ids.initiator, responder = %ids.responder, "session key derived");
    Ok(key)
}

/// Responder side: `H2(pkA^eB, X^skB, X^eB, id_A, id_B)`.
pub fn derive_responder_key(
    params: &GroupParameters,
    esk: &EphemeralSecret,
    own: &StaticKeyPair,
    peer: PeerPublic<'_>,
    ids: &SessionIdentity,
) -> Result<SessionKey> {
    let peer_static = revalidate(params, peer.static_public)?;
    let x = revalidate(params, peer.public_value)?;
    let e = exchange_exponent(params, esk, own.secret())?;

    let shared = Zeroizing::new([
        params.pow(&peer_static, &e),
        params.pow(&x, own.secret()),
        params.pow(&x, &e),
    ]);
    let key = hash_shared(params, &shared, ids)?;
    tracing::debug!(role = %Role::Responder, initiator = %ids.initiator, responder = %ids.responder, "session key derived");
    Ok(key)
}

/// Dispatch on `role`.
pub fn derive_session_key(
    role: Role,
    params: &GroupParameters,
    esk: &EphemeralSecret,
    own: &StaticKeyPair,
    peer: PeerPublic<'_>,
    ids: &SessionIdentity,
) -> Result<SessionKey> {
    match role {
        Role::Initiator => derive_initiator_key(params, esk, own, peer, ids),
        Role::Responder => derive_responder_key(params, esk, own, peer, ids),
    }
}

/// Constant-time session key comparison.
pub fn equal_keys(a: &SessionKey, b: &SessionKey) -> bool {
    constant_time_eq(a.as_bytes(), b.as_bytes())
}

/// Constant-time byte comparison; `false` on any length or content mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Fail with [`NaxosError::KeyMismatch`] unless both keys are equal.
pub fn confirm_agreement(a: &SessionKey, b: &SessionKey) -> Result<()> {
    if equal_keys(a, b) {
        Ok(())
    } else {
        Err(NaxosError::KeyMismatch)
    }
}

/// Elements may have been decoded against a different group. The identity
/// element is never a legitimate public value.
fn revalidate(params: &GroupParameters, element: &GroupElement) -> Result<GroupElement> {
    let element = params.element(*element.as_uint())?;
    if element.as_uint() == &U2048::ONE {
        return Err(NaxosError::Range("peer sent the identity element".into()));
    }
    Ok(element)
}

fn hash_shared(
    params: &GroupParameters,
    shared: &[GroupElement; 3],
    ids: &SessionIdentity,
) -> Result<SessionKey> {
    let capacity =
        3 * params.element_len() + 8 + ids.initiator.len() + ids.responder.len();
    let mut input = Zeroizing::new(Vec::with_capacity(capacity));
    for k in shared {
        params.append_element(k, &mut input);
    }
    append_len_prefixed(&mut input, ids.initiator.as_bytes())?;
    append_len_prefixed(&mut input, ids.responder.as_bytes())?;
    Ok(h2(&input))
}

fn append_len_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| NaxosError::Range("identity longer than u32::MAX bytes".into()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::exchange::compute_public_value;
    use crate::testing::{TOY_SECRET_A, zero_exponent_ephemeral};

    struct Side {
        keys: StaticKeyPair,
        esk: EphemeralSecret,
        value: GroupElement,
    }

    fn side(params: &GroupParameters) -> Side {
        let keys = StaticKeyPair::generate(params).unwrap();
        // Redraw on the rare zero exponent in the toy group.
        loop {
            let esk = EphemeralSecret::generate().unwrap();
            if let Ok(value) = compute_public_value(&esk, &keys, params) {
                return Side { keys, esk, value };
            }
        }
    }

    fn derive_both(
        params: &GroupParameters,
        a: &Side,
        b: &Side,
        ids: &SessionIdentity,
    ) -> (SessionKey, SessionKey) {
        let ka = derive_initiator_key(
            params,
            &a.esk,
            &a.keys,
            PeerPublic {
                static_public: b.keys.public_key(),
                public_value: &b.value,
            },
            ids,
        )
        .unwrap();
        let kb = derive_responder_key(
            params,
            &b.esk,
            &b.keys,
            PeerPublic {
                static_public: a.keys.public_key(),
                public_value: &a.value,
            },
            ids,
        )
        .unwrap();
        (ka, kb)
    }

    #[test]
    fn both_roles_agree_in_toy_group() {
        let params = GroupParameters::toy().unwrap();
        let ids = SessionIdentity::new("Alice", "Bob");
        for _ in 0..50 {
            let (a, b) = (side(&params), side(&params));
            let (ka, kb) = derive_both(&params, &a, &b, &ids);
            assert!(equal_keys(&ka, &kb));
            confirm_agreement(&ka, &kb).unwrap();
        }
    }

    #[test]
    fn derive_session_key_dispatches_on_role() {
        let params = GroupParameters::toy().unwrap();
        let ids = SessionIdentity::new("Alice", "Bob");
        let (a, b) = (side(&params), side(&params));
        let (ka, kb) = derive_both(&params, &a, &b, &ids);
        let via_dispatch = derive_session_key(
            Role::Initiator,
            &params,
            &a.esk,
            &a.keys,
            PeerPublic {
                static_public: b.keys.public_key(),
                public_value: &b.value,
            },
            &ids,
        )
        .unwrap();
        assert_eq!(via_dispatch, ka);
        assert_eq!(via_dispatch, kb);
    }

    #[test]
    fn swapped_identities_break_agreement() {
        let params = GroupParameters::toy().unwrap();
        let (a, b) = (side(&params), side(&params));
        let ka = derive_initiator_key(
            &params,
            &a.esk,
            &a.keys,
            PeerPublic {
                static_public: b.keys.public_key(),
                public_value: &b.value,
            },
            &SessionIdentity::new("Alice", "Bob"),
        )
        .unwrap();
        let kb = derive_responder_key(
            &params,
            &b.esk,
            &b.keys,
            PeerPublic {
                static_public: a.keys.public_key(),
                public_value: &a.value,
            },
            &SessionIdentity::new("Bob", "Alice"),
        )
        .unwrap();
        assert!(!equal_keys(&ka, &kb));
        assert!(matches!(confirm_agreement(&ka, &kb), Err(NaxosError::KeyMismatch)));
    }

    #[test]
    fn identity_split_is_unambiguous() {
        let params = GroupParameters::toy().unwrap();
        let (a, b) = (side(&params), side(&params));
        let (k1, _) = derive_both(&params, &a, &b, &SessionIdentity::new("AliceB", "ob"));
        let (k2, _) = derive_both(&params, &a, &b, &SessionIdentity::new("Alice", "Bob"));
        assert_ne!(k1, k2);
    }

    #[test]
    fn wrong_peer_static_key_breaks_agreement() {
        let params = GroupParameters::toy().unwrap();
        let ids = SessionIdentity::new("Alice", "Bob");
        let (a, b, mallory) = (side(&params), side(&params), side(&params));
        let ka = derive_initiator_key(
            &params,
            &a.esk,
            &a.keys,
            PeerPublic {
                static_public: mallory.keys.public_key(),
                public_value: &b.value,
            },
            &ids,
        )
        .unwrap();
        let (_, kb) = derive_both(&params, &a, &b, &ids);
        // Probability of a collision in the toy group is about 1/q per term.
        assert_ne!(ka.as_bytes(), kb.as_bytes());
    }

    #[test]
    fn element_from_another_group_is_rejected() {
        let toy = GroupParameters::toy().unwrap();
        let big = crate::testing::group_256().unwrap();
        // 101982 is in the toy subgroup but a non-residue modulo the 256-bit prime.
        let foreign = toy.element(U2048::from_u64(101_982)).unwrap();
        let own = side(&big);
        let err = derive_responder_key(
            &big,
            &own.esk,
            &own.keys,
            PeerPublic {
                static_public: &own.value,
                public_value: &foreign,
            },
            &SessionIdentity::new("Alice", "Bob"),
        )
        .unwrap_err();
        assert!(matches!(err, NaxosError::Range(_)), "{err:?}");
    }

    #[test]
    fn identity_element_from_peer_is_rejected() {
        let params = GroupParameters::toy().unwrap();
        let (a, b) = (side(&params), side(&params));
        let one = params.element(U2048::ONE).unwrap();
        let ids = SessionIdentity::new("Alice", "Bob");

        let as_value = derive_initiator_key(
            &params,
            &a.esk,
            &a.keys,
            PeerPublic {
                static_public: b.keys.public_key(),
                public_value: &one,
            },
            &ids,
        );
        assert!(matches!(as_value, Err(NaxosError::Range(_))));

        let as_static = derive_responder_key(
            &params,
            &b.esk,
            &b.keys,
            PeerPublic {
                static_public: &one,
                public_value: &a.value,
            },
            &ids,
        );
        assert!(matches!(as_static, Err(NaxosError::Range(_))));
    }

    #[test]
    fn zero_exponent_refuses_to_derive() {
        let params = GroupParameters::toy().unwrap();
        let a = StaticKeyPair::from_secret_reduced(&params, &TOY_SECRET_A.to_be_bytes()).unwrap();
        let b = side(&params);
        let err = derive_initiator_key(
            &params,
            &zero_exponent_ephemeral(),
            &a,
            PeerPublic {
                static_public: b.keys.public_key(),
                public_value: &b.value,
            },
            &SessionIdentity::new("Alice", "Bob"),
        )
        .unwrap_err();
        assert!(matches!(err, NaxosError::Range(_)), "{err:?}");
    }

    #[test]
    fn constant_time_eq_handles_length_mismatch() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"a"));
    }

    #[test]
    fn session_key_debug_is_redacted() {
        let key = h2(b"input");
        let out = format!("{key:?}");
        assert_eq!(out, "SessionKey([REDACTED])");
    }

    #[test]
    fn role_display_and_serde() {
        assert_eq!(Role::Initiator.to_string(), "initiator");
        assert_eq!(serde_json::to_string(&Role::Responder).unwrap(), "\"responder\"");
    }
}
