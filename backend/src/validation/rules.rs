//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Validates a facility name.
///
/// Requirements:
/// - 1-100 characters
/// - no leading or trailing whitespace
pub fn validate_facility_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() || name.len() > 100 {
        return Err(ValidationError::new("facility_name_invalid_length"));
    }
    if name.trim() != name {
        return Err(ValidationError::new("facility_name_untrimmed"));
    }
    Ok(())
}

/// Validates a raw credential string as read from a badge.
///
/// Requirements:
/// - 1-128 characters
/// - printable ASCII only (reader firmware emits hex or decimal tag ids)
pub fn validate_credential(credential: &str) -> Result<(), ValidationError> {
    if credential.is_empty() || credential.len() > 128 {
        return Err(ValidationError::new("credential_invalid_length"));
    }
    if !credential
        .chars()
        .all(|c| c.is_ascii_graphic() || c == ' ')
    {
        return Err(ValidationError::new("credential_invalid_characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facility_name_rejects_empty() {
        assert!(validate_facility_name("").is_err());
    }

    #[test]
    fn facility_name_rejects_untrimmed() {
        assert!(validate_facility_name(" Lab").is_err());
        assert!(validate_facility_name("Lab ").is_err());
    }

    #[test]
    fn facility_name_accepts_valid() {
        assert!(validate_facility_name("Electronics Lab").is_ok());
    }

    #[test]
    fn credential_rejects_control_characters() {
        assert!(validate_credential("abc\ndef").is_err());
    }

    #[test]
    fn credential_rejects_empty_and_overlong() {
        assert!(validate_credential("").is_err());
        assert!(validate_credential(&"a".repeat(129)).is_err());
    }

    #[test]
    fn credential_accepts_typical_tag_ids() {
        assert!(validate_credential("04:A3:1B:92").is_ok());
        assert!(validate_credential("0011223344").is_ok());
    }
}
