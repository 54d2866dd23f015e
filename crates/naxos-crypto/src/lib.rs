//! NAXOS Authenticated Key Exchange
//!
//! Two-party AKE over the prime-order subgroup of a safe-prime group.
//! Each party holds a long-term keypair and draws a fresh ephemeral secret
//! per run; only public keys, exchange values and identities ever cross the
//! message channel.
//!
//! ## Crypto primitives
//!
//! - **Group**: `Z_p^*` with `p = 2q + 1`, constant-time Montgomery exponentiation
//! - **H1**: SHA-512 (counter-mode expanded) → `Z_q`, prefix `NAXOS-v1/H1`
//! - **H2**: SHA-512 → 64-byte session key, prefix `NAXOS-v1/H2`
//! - **Session key**: `H2(k1 || k2 || k3 || id_A || id_B)`, fixed-width and length-prefixed

pub mod config;
pub mod error;
pub mod exchange;
pub mod group;
pub mod keys;
pub mod message;
pub mod oracle;
pub mod party;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;


pub use config::{Config, load_config};
pub use error::{NaxosError, Result};
pub use exchange::{ExchangeValue, compute_public_value};
pub use group::{GroupElement, GroupParameters, Scalar};
pub use keys::{EPHEMERAL_SECRET_LEN, EphemeralSecret, StaticKeyPair};
pub use message::{DecodedMessage, PartyMessage};
pub use oracle::{h1, h2};
#[cfg(any(test, feature = "test-utils"))]
pub use party::perform_exchange;
pub use party::{ExpectedPeer, Party, SessionState};
pub use session::{
    PeerPublic, Role, SESSION_KEY_LEN, SessionIdentity, SessionKey, confirm_agreement,
    constant_time_eq, derive_initiator_key, derive_responder_key, derive_session_key, equal_keys,
};
