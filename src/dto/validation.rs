//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a hex-encoded 128-bit invite token.
pub const INVITE_TOKEN_LENGTH: usize = 32;

/// Validates that an invite token is exactly 32 lowercase hexadecimal characters.
///
/// # Examples
///
/// ```ignore
/// validate_invite_token("00112233445566778899aabbccddeeff") // Ok
/// validate_invite_token("00112233445566778899AABBCCDDEEFF") // Err - uppercase
/// validate_invite_token("deadbeef")                         // Err - too short
/// ```
pub fn validate_invite_token(token: &str) -> Result<(), ValidationError> {
    if token.len() != INVITE_TOKEN_LENGTH {
        let mut err = ValidationError::new("invite_token_length");
        err.message = Some(
            format!(
                "Invite token must be exactly {INVITE_TOKEN_LENGTH} characters (got {})",
                token.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !token
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("invite_token_format");
        err.message = Some("Invite token must contain only lowercase hexadecimal characters".into());
        return Err(err);
    }

    Ok(())
}
