//! Local group records.
//!
//! Groups carry far less than users: a description in the directory entry
//! and a member list from the principal store. The member list is a
//! read-only view; membership is changed through
//! [`LocalUser::join_group`](crate::LocalUser::join_group) and
//! [`LocalUser::leave_group`](crate::LocalUser::leave_group).

use crate::error::log_failure;
use crate::modify::EntryChanges;
use crate::provider::{account_exists, Provider};
use crate::record::{same_name, AccountKind, AccountRow, EntryProps, GroupPrincipalInfo};
use crate::validation::validate_account_name;
use crate::{AccountError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

const KIND: AccountKind = AccountKind::Group;

/// A local group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalGroup {
    pub name: String,
    pub description: String,
    pub members: Vec<String>,
    #[serde(rename = "SID")]
    pub sid: String,
    #[serde(skip)]
    deleted: bool,
}

impl LocalGroup {
    /// Combines the three sources into one record, or `None` if any is
    /// missing.
    pub fn merge(
        row: Option<AccountRow>,
        entry: Option<EntryProps>,
        principal: Option<GroupPrincipalInfo>,
    ) -> Option<Self> {
        let (row, entry, principal) = (row?, entry?, principal?);

        Some(Self {
            name: row.name,
            description: entry.description,
            members: principal.members,
            sid: row.sid,
            deleted: false,
        })
    }

    /// Reads one group from all three sources.
    pub async fn find(provider: &dyn Provider, name: &str) -> Result<Option<Self>> {
        match provider.find_row(KIND, name).await? {
            Some(row) => Self::resolve(provider, row).await,
            None => Ok(None),
        }
    }

    async fn resolve(provider: &dyn Provider, row: AccountRow) -> Result<Option<Self>> {
        let entry = provider.find_entry(KIND, &row.name).await?;
        let principal = provider.find_group_principal(&row.name).await?;
        Ok(Self::merge(Some(row), entry, principal))
    }

    /// Reads every local group. A group that cannot be read is logged and
    /// left out.
    pub async fn load(provider: &dyn Provider) -> Result<Vec<Self>> {
        let rows = provider.list_rows(KIND).await?;
        let mut groups = Vec::with_capacity(rows.len());

        for row in rows {
            let name = row.name.clone();
            match Self::resolve(provider, row).await {
                Ok(Some(group)) => groups.push(group),
                Ok(None) => {}
                Err(e) => log_failure(&e, "read", KIND, &name),
            }
        }

        Ok(groups)
    }

    pub async fn exists(
        provider: &dyn Provider,
        name: &str,
        listing: Option<&[String]>,
    ) -> Result<bool> {
        account_exists(provider, KIND, name, listing).await
    }

    /// Looks a group up by name, logging when it cannot be resolved.
    pub async fn get(provider: &dyn Provider, name: &str) -> Option<Self> {
        info!(account = name, "Getting parameter of {}", KIND);
        let result = async {
            let listing = provider.list_entry_names(KIND).await?;
            if !Self::exists(provider, name, Some(&listing)).await? {
                return Err(AccountError::not_found(KIND, name));
            }
            Self::find(provider, name)
                .await?
                .ok_or_else(|| AccountError::not_found(KIND, name))
        }
        .await;

        match result {
            Ok(group) => Some(group),
            Err(e) => {
                log_failure(&e, "get parameter of", KIND, name);
                None
            }
        }
    }

    /// Re-reads this record under its current name.
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

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Checks the cached member list (case-insensitive).
    pub fn has_member(&self, user: &str) -> bool {
        self.members.iter().any(|m| same_name(m, user))
    }

    /// Asks the principal store whether `group` has `user` as a member.
    pub async fn has_member_live(provider: &dyn Provider, group: &str, user: &str) -> bool {
        info!(account = group, user, "Checking membership of {}", KIND);
        match provider.is_member(user, group).await {
            Ok(member) => member,
            Err(e) => {
                log_failure(&e, "check membership of", KIND, group);
                false
            }
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.deleted {
            return Err(AccountError::AlreadyDeleted {
                kind: KIND,
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Updates the description. An absent or empty description is skipped
    /// and reported as a failure; an unchanged one writes nothing.
    pub async fn set_param(
        &mut self,
        provider: &mut dyn Provider,
        description: Option<&str>,
    ) -> bool {
        let name = self.name.clone();
        info!(account = %name, "Setting parameter of {}", KIND);

        let result = async {
            self.ensure_live()?;
            let description = match description {
                Some(d) if !d.is_empty() => d,
                _ => {
                    return Err(AccountError::Rejected(
                        "no description given, skipping".to_string(),
                    ))
                }
            };
            if description == self.description {
                info!(account = %name, "No parameter differs, nothing to write");
                return Ok(());
            }
            provider
                .commit_entry(KIND, &name, &EntryChanges::description(description))
                .await
                .map_err(|e| e.in_provider(provider.name(), "commit-entry", &name))?;
            self.description = description.to_string();
            Ok::<(), AccountError>(())
        }
        .await;

        match result {
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

    /// Renames the group. Only `name` is updated in memory.
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

    /// Creates a new local group.
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

    /// Deletes the group and marks this record deleted.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources() -> (AccountRow, EntryProps, GroupPrincipalInfo) {
        (
            AccountRow {
                name: "Staff".to_string(),
                sid: "S-1-5-21-1-1010".to_string(),
            },
            EntryProps {
                name: "Staff".to_string(),
                description: "All staff".to_string(),
                ..Default::default()
            },
            GroupPrincipalInfo {
                sid: "S-1-5-21-1-1010".to_string(),
                members: vec!["alice".to_string(), "Bob".to_string()],
            },
        )
    }

    #[test]
    fn test_merge() {
        let (row, entry, principal) = sources();
        let group = LocalGroup::merge(Some(row), Some(entry), Some(principal)).unwrap();
        assert_eq!(group.name, "Staff");
        assert_eq!(group.description, "All staff");
        assert!(group.has_member("ALICE"));
        assert!(group.has_member("bob"));
        assert!(!group.has_member("carol"));
    }

    #[test]
    fn test_merge_fails_closed() {
        let (row, entry, principal) = sources();
        assert!(LocalGroup::merge(Some(row.clone()), Some(entry.clone()), None).is_none());
        assert!(LocalGroup::merge(Some(row), None, Some(principal.clone())).is_none());
        assert!(LocalGroup::merge(None, Some(entry), Some(principal)).is_none());
    }

    #[test]
    fn test_serialization_shape() {
        let (row, entry, principal) = sources();
        let group = LocalGroup::merge(Some(row), Some(entry), Some(principal)).unwrap();
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["Name"], "Staff");
        assert_eq!(json["Members"][1], "Bob");
        assert_eq!(json["SID"], "S-1-5-21-1-1010");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
