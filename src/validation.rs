//! Input validation for account names and passwords.
//!
//! Names end up inside PowerShell scripts and ADSI paths, so anything the
//! local account store would refuse is rejected before a provider is called.

use crate::{AccountError, Result};

/// Characters Windows does not allow in local account names.
const FORBIDDEN_CHARS: &str = "\"/\\[]:;|=,+*?<>";

/// Maximum allowed length for account names.
const MAX_NAME_LENGTH: usize = 256;

/// Validates a local user or group name.
///
/// Rejects:
/// - Empty names
/// - Excessive length (>256 characters)
/// - Control characters (including null bytes)
/// - Characters the account store forbids
/// - Names made only of dots and spaces
///
/// # Errors
///
/// Returns [`AccountError::Rejected`] if validation fails.
///
/// # Example
///
/// ```
/// use localacct::validation::validate_account_name;
///
/// assert!(validate_account_name("alice").is_ok());
/// assert!(validate_account_name("svc-backup_01").is_ok());
/// assert!(validate_account_name("Remote Desktop Users").is_ok());
///
/// assert!(validate_account_name("").is_err());
/// assert!(validate_account_name("a/b").is_err());
/// assert!(validate_account_name("...").is_err());
/// ```
pub fn validate_account_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AccountError::Rejected(
            "account name cannot be empty".to_string(),
        ));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(AccountError::Rejected(format!(
            "account name exceeds maximum length of {} characters",
            MAX_NAME_LENGTH
        )));
    }

    if name.chars().any(|c| c.is_control()) {
        return Err(AccountError::Rejected(
            "account name contains control characters".to_string(),
        ));
    }

    if name.chars().any(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(AccountError::Rejected(format!(
            "account name contains forbidden characters (not allowed: {})",
            FORBIDDEN_CHARS
        )));
    }

    if name.chars().all(|c| c == '.' || c == ' ') {
        return Err(AccountError::Rejected(
            "account name cannot consist only of dots and spaces".to_string(),
        ));
    }

    Ok(())
}

/// Validates a new password.
///
/// Only emptiness and null bytes are checked here; complexity rules belong
/// to the operating system's password policy.
pub fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(AccountError::Rejected("password cannot be empty".to_string()));
    }

    if password.contains('\0') {
        return Err(AccountError::Rejected(
            "password contains null byte".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_account_name("alice").is_ok());
        assert!(validate_account_name("Administrator").is_ok());
        assert!(validate_account_name("svc.backup").is_ok());
        assert!(validate_account_name("Remote Desktop Users").is_ok());
        assert!(validate_account_name("user@corp").is_ok());
    }

    #[test]
    fn test_empty_name() {
        let result = validate_account_name("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_too_long() {
        let long_name = "a".repeat(257);
        let result = validate_account_name(&long_name);
        assert!(result.unwrap_err().to_string().contains("maximum length"));
        assert!(validate_account_name(&"a".repeat(256)).is_ok());
    }

    #[test]
    fn test_control_characters() {
        assert!(validate_account_name("name\0null").is_err());
        let result = validate_account_name("name\x01ctl");
        assert!(result.unwrap_err().to_string().contains("control"));
    }

    #[test]
    fn test_forbidden_characters() {
        for name in [
            "a\"b", "a/b", "a\\b", "a[b", "a]b", "a:b", "a;b", "a|b", "a=b", "a,b", "a+b",
            "a*b", "a?b", "a<b", "a>b",
        ] {
            let result = validate_account_name(name);
            assert!(result.is_err(), "Expected '{}' to fail validation", name);
            assert!(result
                .unwrap_err()
                .to_string()
                .contains("forbidden characters"));
        }
    }

    #[test]
    fn test_dots_and_spaces() {
        assert!(validate_account_name(". .").is_err());
        assert!(validate_account_name(".a.").is_ok());
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("Secr3t!").is_ok());
        assert!(validate_password("").is_err());
        assert!(validate_password("a\0b").is_err());
    }

    #[test]
    fn test_rejections_are_soft() {
        assert!(validate_password("").unwrap_err().is_soft());
        assert!(validate_account_name("").unwrap_err().is_soft());
    }
}
