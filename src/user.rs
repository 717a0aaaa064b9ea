//! Local user records: reading, merging and writing.
//!
//! A [`LocalUser`] is built by merging the WMI row, the WinNT directory entry
//! and the user principal of one account. Mutators issue only the native
//! writes needed and keep the record equal to what was committed. They log
//! their outcome and return `bool`; nothing is raised to the caller.

use crate::error::log_failure;
use crate::hooks::WriteHook;
use crate::modify::ModifyParam;
use crate::provider::{account_exists, Provider};
use crate::record::{same_name, AccountKind, AccountRow, EntryProps, UserPrincipalInfo};
use crate::validation::{validate_account_name, validate_password};
use crate::{AccountError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const KIND: AccountKind = AccountKind::User;

/// A local user account.
///
/// Serializes with the property names printed by `get` and `listuser`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalUser {
    pub name: String,
    pub full_name: String,
    pub description: String,
    #[serde(rename = "UserMustChangePasswordAtNextLogon")]
    pub must_change_password_at_next_logon: bool,
    #[serde(rename = "UserCannotChangePassword")]
    pub cannot_change_password: bool,
    pub password_never_expires: bool,
    #[serde(rename = "AccountIsDisabled")]
    pub disabled: bool,
    /// Read-only; cleared through [`LocalUser::unlock`]
    #[serde(rename = "AccountIsLockedOut")]
    pub locked_out: bool,
    #[serde(rename = "JoinedGroup")]
    pub joined_groups: Vec<String>,
    pub profile_path: String,
    pub logon_script: String,
    pub home_directory: String,
    pub home_drive: String,
    #[serde(rename = "SID")]
    pub sid: String,
    /// `None` when the account never logged on
    pub last_logon_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    deleted: bool,
}

impl LocalUser {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Combines the three sources into one record.
    ///
    /// Returns `None` unless every source resolved the account.
    pub fn merge(
        row: Option<AccountRow>,
        entry: Option<EntryProps>,
        principal: Option<UserPrincipalInfo>,
    ) -> Option<Self> {
        let (row, entry, principal) = (row?, entry?, principal?);

        Some(Self {
            name: row.name,
            full_name: entry.full_name,
            description: entry.description,
            must_change_password_at_next_logon: entry.password_expired,
            cannot_change_password: principal.user_cannot_change_password,
            password_never_expires: principal.password_never_expires,
            disabled: principal.enabled == Some(false),
            locked_out: principal.locked_out,
            joined_groups: principal.groups,
            profile_path: entry.profile,
            logon_script: entry.login_script,
            home_directory: entry.home_directory,
            home_drive: entry.home_dir_drive,
            sid: row.sid,
            last_logon_time: principal.last_logon,
            deleted: false,
        })
    }

    /// Reads one user from all three sources.
    pub async fn find(provider: &dyn Provider, name: &str) -> Result<Option<Self>> {
        match provider.find_row(KIND, name).await? {
            Some(row) => Self::resolve(provider, row).await,
            None => Ok(None),
        }
    }

    async fn resolve(provider: &dyn Provider, row: AccountRow) -> Result<Option<Self>> {
        let entry = provider.find_entry(KIND, &row.name).await?;
        let principal = provider.find_user_principal(&row.name).await?;
        Ok(Self::merge(Some(row), entry, principal))
    }

    /// Reads every local user.
    ///
    /// Accounts missing from a source are skipped, and so are accounts whose
    /// entry or principal cannot be read; only the listing itself can fail.
    pub async fn load(provider: &dyn Provider) -> Result<Vec<Self>> {
        let rows = provider.list_rows(KIND).await?;
        let mut users = Vec::with_capacity(rows.len());

        for row in rows {
            let name = row.name.clone();
            match Self::resolve(provider, row).await {
                Ok(Some(user)) => users.push(user),
                Ok(None) => tracing::debug!(account = %name, "Skipping partially resolved user"),
                Err(e) => log_failure(&e, "read", KIND, &name),
            }
        }

        Ok(users)
    }

    /// Checks whether a user exists, reusing `listing` when given.
    pub async fn exists(
        provider: &dyn Provider,
        name: &str,
        listing: Option<&[String]>,
    ) -> Result<bool> {
        account_exists(provider, KIND, name, listing).await
    }

    /// Looks a user up by name, logging when it cannot be resolved.
    pub async fn get(provider: &dyn Provider, name: &str) -> Option<Self> {
        info!(account = name, "Getting parameter of {}", KIND);
        match Self::try_get(provider, name).await {
            Ok(user) => Some(user),
            Err(e) => {
                log_failure(&e, "get parameter of", KIND, name);
                None
            }
        }
    }

    async fn try_get(provider: &dyn Provider, name: &str) -> Result<Self> {
        let listing = provider.list_entry_names(KIND).await?;
        if !Self::exists(provider, name, Some(&listing)).await? {
            return Err(AccountError::not_found(KIND, name));
        }
        Self::find(provider, name)
            .await?
            .ok_or_else(|| AccountError::not_found(KIND, name))
    }

    /// Re-reads this record from the providers under its current name.
    ///
    /// Needed after [`rename`](Self::rename) when the SID or memberships
    /// have to be trusted again.
    pub async fn refresh(&mut self, provider: &dyn Provider) -> bool {
        let name = self.name.clone();
        let result = async {
            self.ensure_live()?;
            Self::find(provider, &name)
                .await?
                .ok_or_else(|| AccountError::not_found(KIND, &name))
        }
        .await;

        match result {
            Ok(fresh) => {
                *self = fresh;
                true
            }
            Err(e) => {
                log_failure(&e, "refresh", KIND, &name);
                false
            }
        }
    }

    /// True once [`remove`](Self::remove) succeeded.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Checks the cached membership list (case-insensitive).
    pub fn is_member_of(&self, group: &str) -> bool {
        self.joined_groups.iter().any(|g| same_name(g, group))
    }

    /// Asks the principal store whether `user` belongs to `group`.
    pub async fn is_member_of_live(provider: &dyn Provider, user: &str, group: &str) -> bool {
        info!(account = user, group, "Checking membership of {}", KIND);
        match provider.is_member(user, group).await {
            Ok(member) => member,
            Err(e) => {
                log_failure(&e, "check membership of", KIND, user);
                false
            }
        }
    }

    /// Replaces the cached membership with the principal store's list, in
    /// the store's order and spelling.
    pub async fn reload_groups(&mut self, provider: &dyn Provider) -> Result<()> {
        let principal = provider
            .find_user_principal(&self.name)
            .await?
            .ok_or_else(|| AccountError::not_found(KIND, &self.name))?;
        self.joined_groups = principal.groups;
        Ok(())
    }

    // ========================================================================
    // Writing
    // ========================================================================

    fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(AccountError::AlreadyDeleted {
                kind: KIND,
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Applies the fields of `param` that differ from this record.
    ///
    /// Directory-entry fields are committed once and principal fields are
    /// saved once, entry first. `hook` runs around the writes. A failure in
    /// the principal save leaves already committed entry fields in place.
    pub async fn set_param(
        &mut self,
        provider: &mut dyn Provider,
        param: &ModifyParam,
        hook: &dyn WriteHook,
    ) -> bool {
        let name = self.name.clone();
        info!(account = %name, "Setting parameter of {}", KIND);

        match self.try_set_param(provider, param, hook).await {
            Ok(()) => {
                info!(account = %name, "Successfully set parameter of {}", KIND);
                true
            }
            Err(e) => {
                log_failure(&e, "set parameter of", KIND, &name);
                false
            }
        }
    }

    async fn try_set_param(
        &mut self,
        provider: &mut dyn Provider,
        param: &ModifyParam,
        hook: &dyn WriteHook,
    ) -> Result<()> {
        self.ensure_live()?;

        let plan = param.plan_for(self);
        if plan.is_empty() {
            info!(account = %self.name, "No parameter differs, nothing to write");
            return Ok(());
        }

        let engaged = hook.before(self, provider).await;

        let written = async {
            if !plan.entry.is_empty() {
                info!(
                    account = %self.name,
                    fields = ?plan.entry.fields(),
                    "Committing directory entry"
                );
                provider
                    .commit_entry(KIND, &self.name, &plan.entry)
                    .await
                    .map_err(|e| e.in_provider(provider.name(), "commit-entry", &self.name))?;
                plan.entry.apply_to(self);
            }
            if !plan.principal.is_empty() {
                info!(account = %self.name, fields = ?plan.principal.fields(), "Saving principal");
                provider
                    .save_principal(&self.name, &plan.principal)
                    .await
                    .map_err(|e| e.in_provider(provider.name(), "save-principal", &self.name))?;
                plan.principal.apply_to(self);
            }
            Ok::<(), AccountError>(())
        }
        .await;

        hook.after(self, provider, engaged).await;
        written
    }

    /// Renames the account. Only `name` is updated in memory.
    pub async fn rename(&mut self, provider: &mut dyn Provider, new_name: &str) -> bool {
        let old_name = self.name.clone();
        info!(account = %old_name, new_name, "Renaming {}", KIND);

        let result = async {
            self.ensure_live()?;
            validate_account_name(new_name)?;
            provider
                .rename_entry(KIND, &old_name, new_name)
                .await
                .map_err(|e| e.in_provider(provider.name(), "rename", &old_name))?;
            self.name = new_name.to_string();
            Ok::<(), AccountError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(account = new_name, "Successfully renamed {}", KIND);
                true
            }
            Err(e) => {
                log_failure(&e, "rename", KIND, &old_name);
                false
            }
        }
    }

    /// Creates a new local user.
    pub async fn create(provider: &mut dyn Provider, name: &str) -> bool {
        info!(account = name, "Creating new {}", KIND);

        let result = async {
            validate_account_name(name)?;
            let listing = provider.list_entry_names(KIND).await?;
            if Self::exists(&*provider, name, Some(&listing)).await? {
                return Err(AccountError::AlreadyExists {
                    kind: KIND,
                    name: name.to_string(),
                });
            }
            provider
                .create_entry(KIND, name)
                .await
                .map_err(|e| e.in_provider(provider.name(), "create", name))
        }
        .await;

        match result {
            Ok(()) => {
                info!(account = name, "Successfully created new {}", KIND);
                true
            }
            Err(e) => {
                log_failure(&e, "create", KIND, name);
                false
            }
        }
    }

    /// Alias of [`create`](Self::create).
    pub async fn add(provider: &mut dyn Provider, name: &str) -> bool {
        Self::create(provider, name).await
    }

    /// Deletes the account and marks this record deleted.
    pub async fn remove(&mut self, provider: &mut dyn Provider) -> bool {
        let name = self.name.clone();
        info!(account = %name, "Deleting {}", KIND);

        let result = async {
            self.ensure_live()?;
            provider
                .delete_entry(KIND, &name)
                .await
                .map_err(|e| e.in_provider(provider.name(), "delete", &name))?;
            self.deleted = true;
            Ok::<(), AccountError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(account = %name, "Successfully deleted {}", KIND);
                true
            }
            Err(e) => {
                log_failure(&e, "delete", KIND, &name);
                false
            }
        }
    }

    /// Sets a new password. Empty passwords are refused.
    pub async fn change_password(&mut self, provider: &mut dyn Provider, password: &str) -> bool {
        let name = self.name.clone();
        info!(account = %name, "Changing password of {}", KIND);

        let result = async {
            self.ensure_live()?;
            validate_password(password)?;
            provider
                .set_password(&name, password)
                .await
                .map_err(|e| e.in_provider(provider.name(), "set-password", &name))
        }
        .await;

        match result {
            Ok(()) => {
                info!(account = %name, "Successfully changed password of {}", KIND);
                true
            }
            Err(e) => {
                log_failure(&e, "change password of", KIND, &name);
                false
            }
        }
    }

    /// Clears the lockout flag. Returns false when the account was not
    /// locked.
    pub async fn unlock(&mut self, provider: &mut dyn Provider) -> bool {
        let name = self.name.clone();
        info!(account = %name, "Unlocking account of {}", KIND);

        let result = async {
            self.ensure_live()?;
            let locked = provider
                .is_locked_out(&name)
                .await?
                .ok_or_else(|| AccountError::not_found(KIND, &name))?;
            if !locked {
                return Ok(false);
            }
            provider
                .unlock(&name)
                .await
                .map_err(|e| e.in_provider(provider.name(), "unlock", &name))?;
            self.locked_out = false;
            Ok::<bool, AccountError>(true)
        }
        .await;

        match result {
            Ok(true) => {
                info!(account = %name, "Successfully unlocked account of {}", KIND);
                true
            }
            Ok(false) => {
                info!(account = %name, "Account of {} is not locked", KIND);
                false
            }
            Err(e) => {
                log_failure(&e, "unlock account of", KIND, &name);
                false
            }
        }
    }

    /// Adds the user to `group`. Succeeds without writing when the cached
    /// membership already contains it.
    pub async fn join_group(&mut self, provider: &mut dyn Provider, group: &str) -> bool {
        let name = self.name.clone();
        info!(account = %name, group, "Joining {} to group", KIND);

        let result = async {
            self.ensure_live()?;
            if self.is_member_of(group) {
                info!(account = %name, group, "Already a member of the group");
                return Ok(());
            }
            provider
                .add_member(group, &name)
                .await
                .map_err(|e| e.in_provider(provider.name(), "add-member", &name))?;
            self.joined_groups.push(group.to_string());
            Ok::<(), AccountError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(account = %name, group, "Successfully joined {} to group", KIND);
                true
            }
            Err(e) => {
                log_failure(&e, "join group with", KIND, &name);
                false
            }
        }
    }

    /// Removes the user from `group`. Succeeds without writing when the
    /// cached membership does not contain it.
    pub async fn leave_group(&mut self, provider: &mut dyn Provider, group: &str) -> bool {
        let name = self.name.clone();
        info!(account = %name, group, "Leaving {} from group", KIND);

        let result = async {
            self.ensure_live()?;
            if !self.is_member_of(group) {
                info!(account = %name, group, "Not a member of the group");
                return Ok(());
            }
            provider
                .remove_member(group, &name)
                .await
                .map_err(|e| e.in_provider(provider.name(), "remove-member", &name))?;
            self.joined_groups.retain(|g| !same_name(g, group));
            Ok::<(), AccountError>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!(account = %name, group, "Successfully left group");
                true
            }
            Err(e) => {
                log_failure(&e, "leave group with", KIND, &name);
                false
            }
        }
    }

    // ========================================================================
    // Credentials
    // ========================================================================

    /// Tries an interactive logon with `account` and `password`.
    ///
    /// `account` may be `DOMAIN\user`, `user@domain` or a bare local name.
    pub async fn check_logon(provider: &dyn Provider, account: &str, password: &str) -> bool {
        let (domain, user) = split_account_name(account);
        info!(account = user, domain, "Checking logon of {}", KIND);

        match provider.verify_logon(user, domain, password).await {
            Ok(ok) => ok,
            Err(e) => {
                log_failure(&e, "check logon of", KIND, account);
                false
            }
        }
    }
}

/// Splits `DOMAIN\user` or `user@domain` into `(domain, user)`.
///
/// A bare name yields an empty domain, meaning the local machine.
pub fn split_account_name(account: &str) -> (&str, &str) {
    if let Some((domain, user)) = account.split_once('\\') {
        (domain, user)
    } else if let Some((user, domain)) = account.split_once('@') {
        (domain, user)
    } else {
        ("", account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> AccountRow {
        AccountRow {
            name: "Alice".to_string(),
            sid: "S-1-5-21-1-1001".to_string(),
        }
    }

    fn entry() -> EntryProps {
        EntryProps {
            name: "Alice".to_string(),
            full_name: "Alice Example".to_string(),
            password_expired: true,
            home_dir_drive: "H:".to_string(),
            ..Default::default()
        }
    }

    fn principal() -> UserPrincipalInfo {
        UserPrincipalInfo {
            sid: "S-1-5-21-1-1001".to_string(),
            enabled: Some(false),
            groups: vec!["Users".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_all_sources() {
        let user = LocalUser::merge(Some(row()), Some(entry()), Some(principal())).unwrap();
        assert_eq!(user.name, "Alice");
        assert_eq!(user.sid, "S-1-5-21-1-1001");
        assert_eq!(user.full_name, "Alice Example");
        assert!(user.must_change_password_at_next_logon);
        assert!(user.disabled);
        assert_eq!(user.home_drive, "H:");
        assert!(user.is_member_of("users"));
        assert!(!user.is_deleted());
    }

    #[test]
    fn test_merge_fails_closed() {
        assert!(LocalUser::merge(None, Some(entry()), Some(principal())).is_none());
        assert!(LocalUser::merge(Some(row()), None, Some(principal())).is_none());
        assert!(LocalUser::merge(Some(row()), Some(entry()), None).is_none());
    }

    #[test]
    fn test_unknown_enabled_is_not_disabled() {
        let mut p = principal();
        p.enabled = None;
        let user = LocalUser::merge(Some(row()), Some(entry()), Some(p)).unwrap();
        assert!(!user.disabled);
    }

    #[test]
    fn test_serialization_shape() {
        let user = LocalUser::merge(Some(row()), Some(entry()), Some(principal())).unwrap();
        let value = serde_json::to_value(&user).unwrap();

        assert_eq!(value["Name"], "Alice");
        assert_eq!(value["SID"], "S-1-5-21-1-1001");
        assert_eq!(value["AccountIsDisabled"], true);
        assert_eq!(value["UserMustChangePasswordAtNextLogon"], true);
        assert_eq!(value["JoinedGroup"][0], "Users");
        assert!(value["LastLogonTime"].is_null());
        assert!(value.get("deleted").is_none());
        assert!(value.get("Deleted").is_none());
    }

    #[test]
    fn test_split_account_name() {
        assert_eq!(split_account_name(r"CORP\alice"), ("CORP", "alice"));
        assert_eq!(split_account_name("alice@corp.example"), ("corp.example", "alice"));
        assert_eq!(split_account_name("alice"), ("", "alice"));
    }
}
