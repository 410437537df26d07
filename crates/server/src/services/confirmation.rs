//! Order confirmation tokens.
//!
//! A token is `hex(HMAC-SHA256(key, "{order_id}:{user_id}:{email}"))`. It is
//! handed to the buyer in the checkout event and presented back to confirm the
//! order. Nothing is stored; verification recomputes the MAC.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use procura_core::{Email, OrderId, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies order confirmation tokens.
#[derive(Clone)]
pub struct ConfirmationTokens {
    keyed: HmacSha256,
}

impl std::fmt::Debug for ConfirmationTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationTokens")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl ConfirmationTokens {
    /// Create a token service from a secret key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` if the key is rejected by the MAC.
    pub fn new(key: &[u8]) -> Result<Self, InvalidLength> {
        Ok(Self {
            keyed: HmacSha256::new_from_slice(key)?,
        })
    }

    fn mac(&self, order_id: OrderId, user_id: UserId, email: &Email) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{order_id}:{user_id}:{}", email.as_str()).as_bytes());
        mac
    }

    /// Issue the token for an order.
    #[must_use]
    pub fn issue(&self, order_id: OrderId, user_id: UserId, email: &Email) -> String {
        hex::encode(self.mac(order_id, user_id, email).finalize().into_bytes())
    }

    /// Check a presented token in constant time.
    #[must_use]
    pub fn verify(&self, order_id: OrderId, user_id: UserId, email: &Email, token: &str) -> bool {
        let Ok(bytes) = hex::decode(token.trim()) else {
            return false;
        };
        self.mac(order_id, user_id, email)
            .verify_slice(&bytes)
            .is_ok()
    }
}
