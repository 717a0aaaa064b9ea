//! Windows local account provider.
//!
//! This provider manages the local users and groups of a Windows machine.
//! It runs PowerShell for WMI, WinNT directory and AccountManagement access
//! and calls `LogonUserW` directly for credential checks.
//!
//! # Platform Support
//!
//! The provider compiles everywhere, but `init` fails with
//! [`AccountError::ProviderUnavailable`](crate::AccountError::ProviderUnavailable)
//! on other platforms and logon checks return
//! [`AccountError::NotSupported`](crate::AccountError::NotSupported).
//!
//! # Configuration
//!
//! - `machine_name`: remote machine to manage (default: local machine)
//! - `powershell`: PowerShell executable (default: "powershell.exe")
//!
//! # Example
//!
//! ```no_run
//! use localacct::{Config, ProviderType};
//!
//! let config = Config::new(ProviderType::Windows)
//!     .with_powershell("pwsh.exe");
//! ```

mod provider;
pub mod script;

#[cfg(windows)]
mod logon;
#[cfg(not(windows))]
#[path = "logon_stub.rs"]
mod logon;

pub use provider::WindowsProvider;

use crate::factory;

/// Registers the Windows provider with the factory.
pub fn register() {
    factory::register_provider("windows", |config| {
        Ok(Box::new(WindowsProvider::new(config)))
    });
}
