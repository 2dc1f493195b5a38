use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ServiceError, ServiceResult};

/// Validation constants
pub const MAX_SESSION_KEY_LENGTH: usize = 128;
pub const MIN_CART_QUANTITY: u32 = 1;
pub const MAX_CART_QUANTITY: u32 = 1000;

/// How concurrent mutations of the same session's cart are coordinated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcurrencyPolicy {
    /// Unsynchronized read-modify-write. Overlapping mutations of one session can
    /// overwrite each other and lose an update.
    LastWriteWins,
    /// Mutations of one session key run one at a time; other keys are unaffected.
    #[default]
    PerKeySerialized,
}

impl fmt::Display for ConcurrencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcurrencyPolicy::LastWriteWins => write!(f, "last_write_wins"),
            ConcurrencyPolicy::PerKeySerialized => write!(f, "per_key_serialized"),
        }
    }
}

/// Opaque per-client identifier locating a cart in the session store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    /// Validate a client-supplied key
    pub fn parse(raw: &str) -> ServiceResult<Self> {
        if raw.is_empty() {
            return Err(ServiceError::InvalidSessionKey {
                reason: "session key cannot be empty".to_string(),
            });
        }

        if raw.len() > MAX_SESSION_KEY_LENGTH {
            return Err(ServiceError::InvalidSessionKey {
                reason: format!(
                    "session key length {} exceeds maximum of {}",
                    raw.len(),
                    MAX_SESSION_KEY_LENGTH
                ),
            });
        }

        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ServiceError::InvalidSessionKey {
                reason: "session key contains invalid characters".to_string(),
            });
        }

        Ok(Self(raw.to_string()))
    }

    /// Issue a fresh random key
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validate a requested cart quantity
pub fn validate_cart_quantity(quantity: u32) -> ServiceResult<()> {
    if !(MIN_CART_QUANTITY..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(ServiceError::InvalidQuantity { quantity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_keys() {
        assert!(SessionKey::parse("S1").is_ok());
        assert!(SessionKey::parse("3f2a9c_session-key").is_ok());

        let key = SessionKey::parse("abc123").unwrap();
        assert_eq!(key.as_str(), "abc123");
        assert_eq!(key.to_string(), "abc123");
    }

    #[test]
    fn test_parse_rejects_invalid_keys() {
        assert!(SessionKey::parse("").is_err());
        assert!(SessionKey::parse("has space").is_err());
        assert!(SessionKey::parse("semi;colon").is_err());
        assert!(SessionKey::parse(&"a".repeat(MAX_SESSION_KEY_LENGTH + 1)).is_err());
        assert!(SessionKey::parse(&"a".repeat(MAX_SESSION_KEY_LENGTH)).is_ok());
    }

    #[test]
    fn test_generated_keys_are_valid_and_distinct() {
        let first = SessionKey::generate();
        let second = SessionKey::generate();

        assert_ne!(first, second);
        assert!(SessionKey::parse(first.as_str()).is_ok());
    }

    #[test]
    fn test_concurrency_policy_serde() {
        let policy: ConcurrencyPolicy = serde_json::from_str(r#""last_write_wins""#).unwrap();
        assert_eq!(policy, ConcurrencyPolicy::LastWriteWins);
        assert_eq!(ConcurrencyPolicy::default(), ConcurrencyPolicy::PerKeySerialized);
        assert_eq!(
            ConcurrencyPolicy::PerKeySerialized.to_string(),
            "per_key_serialized"
        );
    }

    #[test]
    fn test_validate_cart_quantity() {
        assert!(validate_cart_quantity(1).is_ok());
        assert!(validate_cart_quantity(MAX_CART_QUANTITY).is_ok());
        assert!(matches!(
            validate_cart_quantity(0),
            Err(ServiceError::InvalidQuantity { quantity: 0 })
        ));
        assert!(validate_cart_quantity(MAX_CART_QUANTITY + 1).is_err());
    }
}
