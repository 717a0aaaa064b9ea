//! Raw records returned by the three native account sources.
//!
//! Each source contributes a disjoint slice of an account. The reader in
//! [`crate::user`] and [`crate::group`] combines them; a record only exists
//! when all three sources resolved the name.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of local account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Local user account
    User,
    /// Local group
    Group,
}

impl AccountKind {
    /// Schema class name used by the WinNT directory ("User" / "Group").
    pub fn schema_class(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
        }
    }

    /// WMI class enumerating accounts of this kind.
    pub fn wmi_class(&self) -> &'static str {
        match self {
            Self::User => "Win32_UserAccount",
            Self::Group => "Win32_Group",
        }
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "local user"),
            Self::Group => write!(f, "local group"),
        }
    }
}

/// One row of the WMI local account listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AccountRow {
    /// Account name with the machine's casing
    pub name: String,
    /// Security identifier in string form
    #[serde(rename = "SID")]
    pub sid: String,
}

/// Editable text properties of a WinNT directory entry.
///
/// Groups only carry `name` and `description`; the other fields stay empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EntryProps {
    /// Entry name
    pub name: String,
    /// `FullName` property
    pub full_name: String,
    /// `Description` property
    pub description: String,
    /// `PasswordExpired` property (1 forces a change at next logon)
    pub password_expired: bool,
    /// `Profile` property
    pub profile: String,
    /// `LoginScript` property
    pub login_script: String,
    /// `HomeDirectory` property
    pub home_directory: String,
    /// `HomeDirDrive` property
    pub home_dir_drive: String,
}

/// Policy flags and membership of a user principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserPrincipalInfo {
    /// Security identifier
    pub sid: String,
    pub user_cannot_change_password: bool,
    pub password_never_expires: bool,
    /// `None` when the store does not report the flag
    pub enabled: Option<bool>,
    pub locked_out: bool,
    /// Names of the groups the user belongs to
    pub groups: Vec<String>,
    pub last_logon: Option<DateTime<Utc>>,
}

/// Membership of a group principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GroupPrincipalInfo {
    /// Security identifier
    pub sid: String,
    /// Names of the member principals
    pub members: Vec<String>,
}

/// Case-insensitive account name comparison, the way the account store
/// compares names.
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(AccountKind::User.to_string(), "local user");
        assert_eq!(AccountKind::Group.to_string(), "local group");
        assert_eq!(AccountKind::Group.schema_class(), "Group");
        assert_eq!(AccountKind::User.wmi_class(), "Win32_UserAccount");
    }

    #[test]
    fn test_same_name() {
        assert!(same_name("Administrators", "administrators"));
        assert!(same_name("ÄDMIN", "ädmin"));
        assert!(!same_name("alice", "alice2"));
    }

    #[test]
    fn test_entry_props_from_partial_json() {
        let props: EntryProps =
            serde_json::from_str(r#"{"Name":"alice","FullName":"Alice A."}"#).unwrap();
        assert_eq!(props.name, "alice");
        assert_eq!(props.full_name, "Alice A.");
        assert_eq!(props.description, "");
        assert!(!props.password_expired);
    }

    #[test]
    fn test_principal_from_json() {
        let info: UserPrincipalInfo = serde_json::from_str(
            r#"{"Sid":"S-1-5-21-1-1001","Enabled":false,"LockedOut":true,
                "Groups":["Users"],"LastLogon":"2024-03-01T08:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(info.enabled, Some(false));
        assert!(info.locked_out);
        assert_eq!(info.groups, vec!["Users".to_string()]);
        assert!(info.last_logon.is_some());
    }
}
