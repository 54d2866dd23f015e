//! Per-party protocol session.
//!
//! A [`Party`] walks a strictly linear lifecycle:
//!
//! ```text
//! Uninitialized -> KeysGenerated -> EphemeralGenerated -> MessageSent -> KeyDerived
//! ```
//!
//! Any failure, including a call made in the wrong state, moves the session
//! to `Aborted` and drops every secret it holds. There is no way back.

use std::fmt;
use std::sync::Arc;

use crate::error::{NaxosError, Result};
use crate::exchange::{ExchangeValue, exchange_exponent};
use crate::group::{GroupElement, GroupParameters};
use crate::keys::{EphemeralSecret, StaticKeyPair};
use crate::message::{DecodedMessage, PartyMessage};
use crate::session::{Role, SessionIdentity, SessionKey, derive_session_key};

/// Lifecycle position of a [`Party`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    KeysGenerated,
    EphemeralGenerated,
    MessageSent,
    KeyDerived,
    Aborted,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::KeysGenerated => "keys_generated",
            Self::EphemeralGenerated => "ephemeral_generated",
            Self::MessageSent => "message_sent",
            Self::KeyDerived => "key_derived",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Zero exponents occur with probability `1/q`; this bound is never hit
/// by a working random source.
const MAX_EPHEMERAL_DRAWS: usize = 8;

/// The peer a party agrees to talk to, fixed before the run.
///
/// NAXOS authenticates only against a static key the caller already trusts;
/// the identity and key carried in a [`PartyMessage`] are checked against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedPeer {
    pub identity: String,
    pub static_public: GroupElement,
}

impl ExpectedPeer {
    pub fn new(identity: impl Into<String>, static_public: GroupElement) -> Self {
        Self {
            identity: identity.into(),
            static_public,
        }
    }

    fn check(&self, message: &DecodedMessage) -> Result<()> {
        if message.identity != self.identity {
            return Err(NaxosError::PeerMismatch(format!(
                "expected {}, message claims {}",
                self.identity, message.identity
            )));
        }
        if message.static_public != self.static_public {
            return Err(NaxosError::PeerMismatch(format!(
                "static public key does not match the key pinned for {}",
                self.identity
            )));
        }
        Ok(())
    }
}

/// One side of a NAXOS run.
pub struct Party {
    params: Arc<GroupParameters>,
    role: Role,
    identity: String,
    state: SessionState,
    static_keys: Option<StaticKeyPair>,
    ephemeral: Option<EphemeralSecret>,
    exchange: Option<ExchangeValue>,
}

impl fmt::Debug for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Party")
            .field("role", &self.role)
            .field("identity", &self.identity)
            .field("state", &self.state)
            .field("static_public", &self.static_public())
            .finish_non_exhaustive()
    }
}

impl Party {
    pub fn new(params: Arc<GroupParameters>, role: Role, identity: impl Into<String>) -> Self {
        Self {
            params,
            role,
            identity: identity.into(),
            state: SessionState::Uninitialized,
            static_keys: None,
            ephemeral: None,
            exchange: None,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub const fn role(&self) -> Role {
        self.role
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Own long-term public key, once keys are in place.
    pub fn static_public(&self) -> Option<&GroupElement> {
        self.static_keys.as_ref().map(StaticKeyPair::public_key)
    }

    /// `Uninitialized -> KeysGenerated` with a freshly generated keypair.
    pub fn generate_static_keys(&mut self) -> Result<GroupElement> {
        self.advance(SessionState::Uninitialized, SessionState::KeysGenerated, |party| {
            let keys = StaticKeyPair::generate(&party.params)?;
            let public = *keys.public_key();
            party.static_keys = Some(keys);
            Ok(public)
        })
    }

    /// `Uninitialized -> KeysGenerated` with an existing keypair.
    pub fn install_static_keys(&mut self, keys: StaticKeyPair) -> Result<()> {
        self.advance(SessionState::Uninitialized, SessionState::KeysGenerated, |party| {
            // Keys built for another group would fail later; catch it here.
            party.params.element(*keys.public_key().as_uint())?;
            party.params.scalar(*keys.secret().expose())?;
            party.static_keys = Some(keys);
            Ok(())
        })
    }

    /// `KeysGenerated -> EphemeralGenerated` with a fresh ephemeral secret.
    ///
    /// A draw whose exponent `H1(esk, sk)` is zero is discarded and redrawn.
    pub fn generate_ephemeral(&mut self) -> Result<()> {
        self.advance(SessionState::KeysGenerated, SessionState::EphemeralGenerated, |party| {
            let state = party.state;
            let keys = party.static_keys.as_ref().ok_or_else(|| NaxosError::InvalidState {
                expected: SessionState::KeysGenerated.as_str(),
                actual: state.as_str(),
            })?;
            for _ in 0..MAX_EPHEMERAL_DRAWS {
                let esk = EphemeralSecret::generate()?;
                match exchange_exponent(&party.params, &esk, keys.secret()) {
                    Ok(_) => {
                        party.ephemeral = Some(esk);
                        return Ok(());
                    }
                    Err(NaxosError::Range(_)) => {}
                    Err(e) => return Err(e),
                }
            }
            Err(NaxosError::Entropy(
                "random source kept producing zero exchange exponents".into(),
            ))
        })
    }

    /// `KeysGenerated -> EphemeralGenerated` with caller-provided bytes.
    pub fn install_ephemeral(&mut self, esk: EphemeralSecret) -> Result<()> {
        self.advance(SessionState::KeysGenerated, SessionState::EphemeralGenerated, |party| {
            party.ephemeral = Some(esk);
            Ok(())
        })
    }

    /// `EphemeralGenerated -> MessageSent`: compute `X`/`Y` and package it.
    pub fn outgoing_message(&mut self) -> Result<PartyMessage> {
        self.advance(SessionState::EphemeralGenerated, SessionState::MessageSent, |party| {
            let (keys, esk) = party.secrets()?;
            let exchange = ExchangeValue::compute(esk, keys, &party.params)?;
            let message = PartyMessage::new(
                &party.params,
                party.identity.clone(),
                keys.public_key(),
                exchange.public_value(),
            );
            party.exchange = Some(exchange);
            Ok(message)
        })
    }

    /// `MessageSent -> KeyDerived`: validate the peer's message and derive the key.
    ///
    /// The message must come from `expected`; any other identity or static
    /// key aborts with [`NaxosError::PeerMismatch`]. The ephemeral secret and
    /// exchange exponent are discarded afterwards.
    pub fn derive_key(
        &mut self,
        expected: &ExpectedPeer,
        peer: &PartyMessage,
    ) -> Result<SessionKey> {
        self.advance(SessionState::MessageSent, SessionState::KeyDerived, |party| {
            let decoded = peer.decode(&party.params)?;
            expected.check(&decoded)?;
            let ids = match party.role {
                Role::Initiator => {
                    SessionIdentity::new(party.identity.clone(), expected.identity.clone())
                }
                Role::Responder => {
                    SessionIdentity::new(expected.identity.clone(), party.identity.clone())
                }
            };
            let (keys, esk) = party.secrets()?;
            let key = derive_session_key(party.role, &party.params, esk, keys, decoded.peer(), &ids)?;
            party.ephemeral = None;
            party.exchange = None;
            Ok(key)
        })
    }

    /// Abandon the session and drop all secrets.
    pub fn abort(&mut self) {
        if self.state != SessionState::Aborted {
            tracing::debug!(role = %self.role, from = %self.state, "session aborted");
        }
        self.static_keys = None;
        self.ephemeral = None;
        self.exchange = None;
        self.state = SessionState::Aborted;
    }

    fn secrets(&self) -> Result<(&StaticKeyPair, &EphemeralSecret)> {
        match (&self.static_keys, &self.ephemeral) {
            (Some(keys), Some(esk)) => Ok((keys, esk)),
            _ => Err(NaxosError::InvalidState {
                expected: SessionState::EphemeralGenerated.as_str(),
                actual: self.state.as_str(),
            }),
        }
    }

    fn advance<T>(
        &mut self,
        from: SessionState,
        to: SessionState,
        step: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        if self.state != from {
            let err = NaxosError::InvalidState {
                expected: from.as_str(),
                actual: self.state.as_str(),
            };
            self.abort();
            return Err(err);
        }
        match step(self) {
            Ok(value) => {
                tracing::trace!(role = %self.role, from = %from, to = %to, "session state advanced");
                self.state = to;
                Ok(value)
            }
            Err(e) => {
                self.abort();
                Err(e)
            }
        }
    }
}

/// Run a full exchange between two fresh parties and return both keys.
///
/// Convenience for tests. In production each side drives its own
/// [`Party`] and moves [`PartyMessage`]s over a real channel.
#[cfg(any(test, feature = "test-utils"))]
pub fn perform_exchange(
    params: Arc<GroupParameters>,
    ids: &SessionIdentity,
) -> Result<(SessionKey, SessionKey)> {
    let mut initiator = Party::new(Arc::clone(&params), Role::Initiator, ids.initiator.clone());
    let mut responder = Party::new(params, Role::Responder, ids.responder.clone());

    let pk_a = initiator.generate_static_keys()?;
    let pk_b = responder.generate_static_keys()?;
    let expect_b = ExpectedPeer::new(ids.responder.clone(), pk_b);
    let expect_a = ExpectedPeer::new(ids.initiator.clone(), pk_a);
    initiator.generate_ephemeral()?;
    responder.generate_ephemeral()?;

    let x = initiator.outgoing_message()?;
    let y = responder.outgoing_message()?;

    let initiator_key = initiator.derive_key(&expect_b, &y)?;
    let responder_key = responder.derive_key(&expect_a, &x)?;
    Ok((initiator_key, responder_key))
}
