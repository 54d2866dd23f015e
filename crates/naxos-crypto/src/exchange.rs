//! Exchange value computation.
//!
//! Each party sends `g^H1(esk, sk)`: the initiator's value is `X`, the
//! responder's is `Y`. The exponent mixes the ephemeral and static secret,
//! so leaking either one alone does not reveal it.

use std::fmt;

use crypto_bigint::U2048;
use subtle::ConstantTimeEq;

use crate::error::{NaxosError, Result};
use crate::group::{GroupElement, GroupParameters, Scalar};
use crate::keys::{EphemeralSecret, StaticKeyPair};
use crate::oracle::h1;

/// A party's exchange exponent and the public value derived from it.
pub struct ExchangeValue {
    exponent: Scalar,
    public_value: GroupElement,
}

impl fmt::Debug for ExchangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeValue")
            .field("public_value", &self.public_value)
            .field("exponent", &"[REDACTED]")
            .finish()
    }
}

impl ExchangeValue {
    /// `e = H1(esk, sk)`, `public = g^e mod p`.
    pub fn compute(
        esk: &EphemeralSecret,
        static_keys: &StaticKeyPair,
        params: &GroupParameters,
    ) -> Result<Self> {
        let exponent = exchange_exponent(params, esk, static_keys.secret())?;
        let public_value = params.pow_generator(&exponent);
        Ok(Self {
            exponent,
            public_value,
        })
    }

    /// The value to transmit (`X` or `Y`).
    pub const fn public_value(&self) -> &GroupElement {
        &self.public_value
    }

    /// The secret exponent. Never transmitted.
    pub const fn exponent(&self) -> &Scalar {
        &self.exponent
    }
}

/// Convenience wrapper returning only the transmittable value.
pub fn compute_public_value(
    esk: &EphemeralSecret,
    static_keys: &StaticKeyPair,
    params: &GroupParameters,
) -> Result<GroupElement> {
    ExchangeValue::compute(esk, static_keys, params).map(|value| *value.public_value())
}

/// `e = H1(esk, sk)`, rejected if it is zero.
///
/// A zero exponent would publish the identity element and collapse two of
/// the three shared values to 1.
pub(crate) fn exchange_exponent(
    params: &GroupParameters,
    esk: &EphemeralSecret,
    sk: &Scalar,
) -> Result<Scalar> {
    let exponent = h1(params, esk.as_bytes(), sk)?;
    if bool::from(exponent.expose().ct_eq(&U2048::ZERO)) {
        return Err(NaxosError::Range("exchange exponent outside [1, q - 1]".into()));
    }
    Ok(exponent)
}
