//! Stub credential check for non-Windows platforms.

use crate::{AccountError, Result};

/// Always fails: interactive logons only exist on Windows.
pub fn verify(_user: &str, _domain: &str, _password: &str) -> Result<bool> {
    Err(AccountError::NotSupported(
        "logon checks are only available on Windows".to_string(),
    ))
}
