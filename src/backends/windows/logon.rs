//! Credential check through `LogonUserW`.

use crate::Result;
use tracing::debug;
use ::windows::core::HSTRING;
use ::windows::Win32::Foundation::{CloseHandle, HANDLE};
use ::windows::Win32::Security::{LogonUserW, LOGON32_LOGON_INTERACTIVE, LOGON32_PROVIDER_DEFAULT};

/// Closes the logon token when dropped.
struct TokenGuard(HANDLE);

impl Drop for TokenGuard {
    fn drop(&mut self) {
        if !self.0.is_invalid() {
            // SAFETY: the handle came from a successful LogonUserW and is closed once.
            unsafe {
                let _ = CloseHandle(self.0);
            }
        }
    }
}

/// Attempts an interactive logon. A refused logon is `Ok(false)`.
pub fn verify(user: &str, domain: &str, password: &str) -> Result<bool> {
    let mut token = HANDLE::default();

    // SAFETY: all strings outlive the call and `token` is a valid out pointer.
    let result = unsafe {
        LogonUserW(
            &HSTRING::from(user),
            &HSTRING::from(domain),
            &HSTRING::from(password),
            LOGON32_LOGON_INTERACTIVE,
            LOGON32_PROVIDER_DEFAULT,
            &mut token,
        )
    };
    let _guard = TokenGuard(token);

    match result {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!(account = user, domain, code = e.code().0, "Logon refused");
            Ok(false)
        }
    }
}
