//! localacct - inspect and modify Windows local users and groups.
//!
//! Windows exposes local accounts through three stores that each hold part
//! of an account: WMI rows (name and SID), WinNT directory entries (profile
//! text, description, password-expired flag) and AccountManagement
//! principals (policy flags, membership, lockout, last logon). localacct
//! reads all three, merges them into one [`LocalUser`] or [`LocalGroup`]
//! record and writes changes back to the store that owns each field.
//!
//! # Features
//!
//! - **Fail-closed reads**: an account missing from any store is reported as not found
//! - **Minimal writes**: only fields that differ are written, one commit per store
//! - **Write hooks**: administrators leave and rejoin their group around policy writes
//! - **Pluggable providers**: a Windows provider and an in-memory mock
//!
//! # Quick Start
//!
//! ```no_run
//! use localacct::{AccountManager, Config, ModifyParam, ProviderType};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> localacct::Result<()> {
//!     localacct::init();
//!
//!     let mut manager = AccountManager::from_config(Config::new(ProviderType::Windows))?;
//!     manager.init().await?;
//!
//!     if let Some(user) = manager.get_user("alice").await {
//!         println!("{} ({})", user.name, user.sid);
//!     }
//!
//!     let param = ModifyParam::new()
//!         .with_full_name("Alice Example")
//!         .with_password_never_expires(true);
//!     manager.set_user("alice", &param).await;
//!
//!     manager.close().await
//! }
//! ```
//!
//! # Providers
//!
//! | Provider | Feature Flag | Requirements |
//! |----------|-------------|--------------|
//! | Mock | `mock` (default) | None |
//! | Windows | `windows-provider` (default) | Windows, PowerShell |

pub mod args;
pub mod backends;
pub mod config;
pub mod error;
pub mod factory;
pub mod group;
pub mod hooks;
pub mod logging;
pub mod manager;
pub mod modify;
pub mod provider;
pub mod record;
pub mod shell;
pub mod user;
pub mod validation;

pub use config::{Config, ProviderType};
pub use error::{AccountError, Result};
pub use group::LocalGroup;
pub use hooks::{AdminGroupRejoin, NoopHook, WriteHook};
pub use manager::AccountManager;
pub use modify::{ChangePlan, EntryChanges, ModifyParam, PrincipalChanges};
pub use provider::Provider;
pub use record::{AccountKind, AccountRow, EntryProps, GroupPrincipalInfo, UserPrincipalInfo};
pub use user::LocalUser;

use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the localacct library.
///
/// This registers all compiled providers with the factory. It is
/// idempotent and must run before [`factory::new_provider`].
pub fn init() {
    INIT.call_once(backends::register_all);
}
