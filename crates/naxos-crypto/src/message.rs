//! Public data a party hands to the message channel.
//!
//! The transport itself is a collaborator's concern; this type only fixes
//! what crosses it: the sender's identity, its long-term public key and its
//! exchange value, both as fixed-width big-endian hex.

use serde::{Deserialize, Serialize};

use crate::error::{NaxosError, Result};
use crate::group::{GroupElement, GroupParameters};
use crate::session::PeerPublic;

/// One party's outgoing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMessage {
    pub identity: String,
    pub static_public: String,
    pub public_value: String,
}

/// A [`PartyMessage`] whose group elements have been validated.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    pub identity: String,
    pub static_public: GroupElement,
    pub public_value: GroupElement,
}

impl DecodedMessage {
    /// Borrow the public values for session key derivation.
    pub const fn peer(&self) -> PeerPublic<'_> {
        PeerPublic {
            static_public: &self.static_public,
            public_value: &self.public_value,
        }
    }
}

impl PartyMessage {
    pub fn new(
        params: &GroupParameters,
        identity: impl Into<String>,
        static_public: &GroupElement,
        public_value: &GroupElement,
    ) -> Self {
        Self {
            identity: identity.into(),
            static_public: hex::encode(params.encode_element(static_public)),
            public_value: hex::encode(params.encode_element(public_value)),
        }
    }

    /// Decode and validate both elements against `params`.
    ///
    /// Malformed hex is a [`NaxosError::Serialization`] error; values outside
    /// the subgroup are [`NaxosError::Range`].
    pub fn decode(&self, params: &GroupParameters) -> Result<DecodedMessage> {
        Ok(DecodedMessage {
            identity: self.identity.clone(),
            static_public: decode_element(params, &self.static_public, "static_public")?,
            public_value: decode_element(params, &self.public_value, "public_value")?,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| NaxosError::Serialization(format!("Failed to encode message: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| NaxosError::Serialization(format!("Failed to parse message: {e}")))
    }
}

fn decode_element(params: &GroupParameters, hex_str: &str, field: &str) -> Result<GroupElement> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| NaxosError::Serialization(format!("{field} is not valid hex: {e}")))?;
    params.element_from_bytes(&bytes)
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use crypto_bigint::U2048;

    use super::*;

    fn sample(params: &GroupParameters) -> PartyMessage {
        let pk = params.element(U2048::from_u64(101_982)).unwrap();
        let x = params.element(U2048::from_u64(16)).unwrap();
        PartyMessage::new(params, "Alice", &pk, &x)
    }

    #[test]
    fn message_encodes_fixed_width_hex() {
        let params = GroupParameters::toy().unwrap();
        let msg = sample(&params);
        assert_eq!(msg.static_public, "018e5e");
        assert_eq!(msg.public_value, "000010");
    }

    #[test]
    fn json_survives_transport_and_decodes() {
        let params = GroupParameters::toy().unwrap();
        let msg = sample(&params);
        let parsed = PartyMessage::from_json(&msg.to_json().unwrap()).unwrap();
        assert_eq!(parsed, msg);

        let decoded = parsed.decode(&params).unwrap();
        assert_eq!(decoded.identity, "Alice");
        assert_eq!(decoded.static_public.as_uint(), &U2048::from_u64(101_982));
        assert_eq!(decoded.peer().public_value.as_uint(), &U2048::from_u64(16));
    }

    #[test]
    fn bad_hex_is_a_serialization_error() {
        let params = GroupParameters::toy().unwrap();
        let mut msg = sample(&params);
        msg.public_value = "not hex".into();
        assert!(matches!(msg.decode(&params), Err(NaxosError::Serialization(_))));
    }

    #[test]
    fn out_of_subgroup_value_is_a_range_error() {
        let params = GroupParameters::toy().unwrap();
        let mut msg = sample(&params);
        // 2 is not in the order-q subgroup.
        msg.public_value = "000002".into();
        assert!(matches!(msg.decode(&params), Err(NaxosError::Range(_))));
        // Zero and wrong widths are rejected too.
        msg.public_value = "000000".into();
        assert!(matches!(msg.decode(&params), Err(NaxosError::Range(_))));
        msg.public_value = "10".into();
        assert!(matches!(msg.decode(&params), Err(NaxosError::Range(_))));
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(matches!(
            PartyMessage::from_json("{\"identity\": 5}"),
            Err(NaxosError::Serialization(_))
        ));
    }
}
