//! Access PIN handling.
//!
//! The gate only needs a secret comparison: the stored form is an
//! HMAC-SHA-256 of the PIN keyed by a random per-install salt, and checks use
//! the MAC's constant-time verification.
//!
//! # Security Properties
//!
//! - The PIN itself is never stored, logged or formatted
//! - Entered PINs are zeroized when dropped
//! - Comparison time does not depend on where the digests differ

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{env::Environment, error::GateError};

type HmacSha256 = Hmac<Sha256>;

/// Shortest accepted PIN.
pub const MIN_PIN_LEN: usize = 4;

/// Longest accepted PIN.
pub const MAX_PIN_LEN: usize = 8;

/// Salt length in bytes.
const SALT_LEN: usize = 16;

/// A well-formed PIN: 4 to 8 ASCII digits.
pub struct Pin {
    digits: String,
}

impl Pin {
    /// Validate and wrap user input.
    ///
    /// # Errors
    ///
    /// - `GateError::MalformedSecret` if the input is not 4-8 ASCII digits
    pub fn parse(input: &str) -> Result<Self, GateError> {
        if input.len() < MIN_PIN_LEN {
            return Err(GateError::MalformedSecret { reason: "too short" });
        }
        if input.len() > MAX_PIN_LEN {
            return Err(GateError::MalformedSecret { reason: "too long" });
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GateError::MalformedSecret { reason: "digits only" });
        }

        Ok(Self { digits: input.to_owned() })
    }

    fn as_bytes(&self) -> &[u8] {
        self.digits.as_bytes()
    }
}

impl Drop for Pin {
    fn drop(&mut self) {
        self.digits.zeroize();
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(<redacted>)")
    }
}

/// Stored form of a PIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDigest {
    /// Random HMAC key.
    pub salt: [u8; SALT_LEN],
    /// HMAC-SHA-256 of the PIN digits.
    pub mac: [u8; 32],
}

impl PinDigest {
    fn compute(salt: [u8; SALT_LEN], pin: &Pin) -> Self {
        let mut mac = keyed(&salt);
        mac.update(pin.as_bytes());
        let result = mac.finalize().into_bytes();

        let mut out = [0u8; 32];
        out.copy_from_slice(&result);
        Self { salt, mac: out }
    }
}

fn keyed(salt: &[u8]) -> HmacSha256 {
    let Ok(mac) = HmacSha256::new_from_slice(salt) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac
}

/// Secret comparison gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinVerifier {
    digest: PinDigest,
}

impl PinVerifier {
    /// Derive a verifier for `pin` with a fresh salt from `env`.
    pub fn new<E: Environment>(env: &E, pin: &Pin) -> Self {
        let mut salt = [0u8; SALT_LEN];
        env.random_bytes(&mut salt);
        Self { digest: PinDigest::compute(salt, pin) }
    }

    /// Restore a verifier from its stored digest.
    pub fn from_digest(digest: PinDigest) -> Self {
        Self { digest }
    }

    /// Stored form, for persistence.
    pub fn digest(&self) -> &PinDigest {
        &self.digest
    }

    /// Check `pin` in constant time.
    ///
    /// # Errors
    ///
    /// - `GateError::InvalidSecret` if the PIN does not match
    pub fn verify(&self, pin: &Pin) -> Result<(), GateError> {
        let mut mac = keyed(&self.digest.salt);
        mac.update(pin.as_bytes());
        mac.verify_slice(&self.digest.mac).map_err(|_| GateError::InvalidSecret)
    }

    /// Replace the PIN after checking the current one. Uses a fresh salt.
    ///
    /// # Errors
    ///
    /// - `GateError::InvalidSecret` if `current` does not match
    pub fn change_pin<E: Environment>(
        &mut self,
        env: &E,
        current: &Pin,
        new: &Pin,
    ) -> Result<(), GateError> {
        self.verify(current)?;
        *self = Self::new(env, new);
        Ok(())
    }
}
