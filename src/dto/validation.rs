//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted user identifier.
pub const MAX_USER_ID_LEN: usize = 64;

/// Validates that a user id is 1 to 64 characters among ASCII letters,
/// digits, `-`, `_`, `:` and `.`.
///
/// ```ignore
/// validate_user_id("123456789")     // Ok, messaging-platform id
/// validate_user_id("tg:alice_01")   // Ok
/// validate_user_id("alice/../bob")  // Err - forbidden character
/// ```
pub fn validate_user_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_USER_ID_LEN {
        let mut err = ValidationError::new("user_id_length");
        err.message = Some(
            format!(
                "User ID must be between 1 and {MAX_USER_ID_LEN} characters (got {})",
                id.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
    {
        let mut err = ValidationError::new("user_id_format");
        err.message = Some("User ID contains forbidden characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_platform_and_generated_ids() {
        assert!(validate_user_id("123456789").is_ok());
        assert!(validate_user_id("tg:alice_01").is_ok());
        assert!(validate_user_id("0f8e3c1c-5a4d-4a8b-9c0d-2b7e9f6a1d23").is_ok());
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id(&"a".repeat(MAX_USER_ID_LEN + 1)).is_err());
        assert!(validate_user_id(&"a".repeat(MAX_USER_ID_LEN)).is_ok());
    }

    #[test]
    fn rejects_forbidden_characters() {
        assert!(validate_user_id("alice/../bob").is_err());
        assert!(validate_user_id("alice bob").is_err());
        assert!(validate_user_id("pet?id=1").is_err());
    }
}
