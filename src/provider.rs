//! Provider trait over the native account sources.
//!
//! This module defines the [`Provider`] trait that every account store
//! implementation must satisfy. It exposes the three sources the reader
//! merges (WMI rows, directory entries, principals) and the write primitives
//! the writer issues. Every call is self-contained: it acquires whatever
//! native handles it needs and releases them before returning.

use crate::modify::{EntryChanges, PrincipalChanges};
use crate::record::{
    same_name, AccountKind, AccountRow, EntryProps, GroupPrincipalInfo, UserPrincipalInfo,
};
use crate::Result;
use async_trait::async_trait;

/// Provider represents access to one machine's local account store.
///
/// Lookups by name are case-insensitive. A lookup that finds nothing returns
/// `Ok(None)`; `Err` is reserved for provider failures.
///
/// # Implementations
///
/// - **Windows**: PowerShell over WMI, ADSI and AccountManagement
/// - **Testing**: in-memory mock with failure injection
///
/// # Example
///
/// ```no_run
/// use localacct::{factory, AccountKind, Config, Provider, ProviderType};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> localacct::Result<()> {
///     localacct::init();
///     let mut provider = factory::new_provider(Config::new(ProviderType::Windows))?;
///     provider.init().await?;
///
///     for row in provider.list_rows(AccountKind::User).await? {
///         println!("{} {}", row.name, row.sid);
///     }
///
///     provider.close().await
/// }
/// ```
#[async_trait]
pub trait Provider: Send + Sync {
    // ========================================================================
    // Metadata / lifecycle
    // ========================================================================

    /// Returns the provider name (e.g., "windows", "mock").
    fn name(&self) -> &str;

    /// Checks that the provider can run here.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::ProviderUnavailable`](crate::AccountError::ProviderUnavailable)
    /// when the native tooling is missing.
    async fn init(&mut self) -> Result<()>;

    /// Releases provider resources.
    async fn close(&mut self) -> Result<()>;

    // ========================================================================
    // WMI account rows
    // ========================================================================

    /// Lists local (non-domain) accounts of `kind`.
    async fn list_rows(&self, kind: AccountKind) -> Result<Vec<AccountRow>>;

    /// Finds the row of one local account.
    async fn find_row(&self, kind: AccountKind, name: &str) -> Result<Option<AccountRow>>;

    // ========================================================================
    // Directory entries
    // ========================================================================

    /// Lists the names of every directory entry of `kind`.
    ///
    /// The reader passes this listing to existence checks so they do not
    /// need their own round trip.
    async fn list_entry_names(&self, kind: AccountKind) -> Result<Vec<String>>;

    /// Reads the text properties of one directory entry.
    async fn find_entry(&self, kind: AccountKind, name: &str) -> Result<Option<EntryProps>>;

    /// Writes `changes` to an entry and commits once.
    ///
    /// # Errors
    ///
    /// - [`AccountError::NotFound`](crate::AccountError::NotFound): no such entry
    async fn commit_entry(
        &mut self,
        kind: AccountKind,
        name: &str,
        changes: &EntryChanges,
    ) -> Result<()>;

    /// Adds a new entry and commits it.
    ///
    /// # Errors
    ///
    /// - [`AccountError::AlreadyExists`](crate::AccountError::AlreadyExists)
    async fn create_entry(&mut self, kind: AccountKind, name: &str) -> Result<()>;

    /// Removes an entry from the directory.
    async fn delete_entry(&mut self, kind: AccountKind, name: &str) -> Result<()>;

    /// Renames an entry and commits.
    async fn rename_entry(&mut self, kind: AccountKind, name: &str, new_name: &str) -> Result<()>;

    /// Invokes `SetPassword` on a user entry and commits.
    async fn set_password(&mut self, name: &str, password: &str) -> Result<()>;

    /// Invokes `Add` on a group entry with the user's path.
    async fn add_member(&mut self, group: &str, user: &str) -> Result<()>;

    /// Invokes `Remove` on a group entry with the user's path.
    async fn remove_member(&mut self, group: &str, user: &str) -> Result<()>;

    // ========================================================================
    // Principals
    // ========================================================================

    /// Reads policy flags, membership and logon data of a user.
    async fn find_user_principal(&self, name: &str) -> Result<Option<UserPrincipalInfo>>;

    /// Reads the SID and member list of a group.
    async fn find_group_principal(&self, name: &str) -> Result<Option<GroupPrincipalInfo>>;

    /// Writes `changes` to a user principal and saves once.
    async fn save_principal(&mut self, name: &str, changes: &PrincipalChanges) -> Result<()>;

    /// Reports the current lockout state of a user, `None` when unknown.
    async fn is_locked_out(&self, name: &str) -> Result<Option<bool>>;

    /// Clears the lockout of a user and saves.
    async fn unlock(&mut self, name: &str) -> Result<()>;

    /// Asks the principal store whether `user` is a member of `group`.
    ///
    /// Returns `false` when either side does not exist.
    async fn is_member(&self, user: &str, group: &str) -> Result<bool>;

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Attempts an interactive logon with the given credentials.
    ///
    /// An empty `domain` means the local machine.
    async fn verify_logon(&self, user: &str, domain: &str, password: &str) -> Result<bool>;
}

/// Checks whether a local account exists.
///
/// With `listing` (from [`Provider::list_entry_names`]) the check is done
/// in memory; without it the WMI rows are queried.
pub async fn account_exists(
    provider: &dyn Provider,
    kind: AccountKind,
    name: &str,
    listing: Option<&[String]>,
) -> Result<bool> {
    tracing::debug!(account = name, "Checking existence of {}", kind);
    match listing {
        Some(names) => Ok(names.iter().any(|n| same_name(n, name))),
        None => Ok(provider.find_row(kind, name).await?.is_some()),
    }
}
