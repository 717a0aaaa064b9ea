//! Partial updates and the per-target change plans derived from them.

use crate::LocalUser;
use serde::{Deserialize, Serialize};

/// Caller-supplied partial update of a local user.
///
/// Every field is optional: `None` leaves the property unchanged, `Some`
/// sets it when it differs from the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyParam {
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub must_change_password: Option<bool>,
    pub cannot_change_password: Option<bool>,
    pub password_never_expires: Option<bool>,
    pub disabled: Option<bool>,
    pub profile_path: Option<String>,
    pub logon_script: Option<String>,
    pub home_directory: Option<String>,
    pub home_drive: Option<String>,
}

impl ModifyParam {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_full_name(mut self, value: impl Into<String>) -> Self {
        self.full_name = Some(value.into());
        self
    }

    pub fn with_description(mut self, value: impl Into<String>) -> Self {
        self.description = Some(value.into());
        self
    }

    pub fn with_must_change_password(mut self, value: bool) -> Self {
        self.must_change_password = Some(value);
        self
    }

    pub fn with_cannot_change_password(mut self, value: bool) -> Self {
        self.cannot_change_password = Some(value);
        self
    }

    pub fn with_password_never_expires(mut self, value: bool) -> Self {
        self.password_never_expires = Some(value);
        self
    }

    pub fn with_disabled(mut self, value: bool) -> Self {
        self.disabled = Some(value);
        self
    }

    pub fn with_profile_path(mut self, value: impl Into<String>) -> Self {
        self.profile_path = Some(value.into());
        self
    }

    pub fn with_logon_script(mut self, value: impl Into<String>) -> Self {
        self.logon_script = Some(value.into());
        self
    }

    pub fn with_home_directory(mut self, value: impl Into<String>) -> Self {
        self.home_directory = Some(value.into());
        self
    }

    pub fn with_home_drive(mut self, value: impl Into<String>) -> Self {
        self.home_drive = Some(value.into());
        self
    }

    /// Splits this update into the writes each store actually needs for
    /// `user`. Fields that are absent or already equal are dropped.
    pub fn plan_for(&self, user: &LocalUser) -> ChangePlan {
        ChangePlan {
            entry: EntryChanges {
                full_name: changed(&self.full_name, &user.full_name),
                description: changed(&self.description, &user.description),
                password_expired: changed(
                    &self.must_change_password,
                    &user.must_change_password_at_next_logon,
                ),
                profile: changed(&self.profile_path, &user.profile_path),
                login_script: changed(&self.logon_script, &user.logon_script),
                home_directory: changed(&self.home_directory, &user.home_directory),
                home_dir_drive: changed(&self.home_drive, &user.home_drive),
            },
            principal: PrincipalChanges {
                user_cannot_change_password: changed(
                    &self.cannot_change_password,
                    &user.cannot_change_password,
                ),
                password_never_expires: changed(
                    &self.password_never_expires,
                    &user.password_never_expires,
                ),
                enabled: changed(&self.disabled, &user.disabled).map(|disabled| !disabled),
            },
        }
    }
}

fn changed<T: Clone + PartialEq>(wanted: &Option<T>, current: &T) -> Option<T> {
    match wanted {
        Some(value) if value != current => Some(value.clone()),
        _ => None,
    }
}

/// Pending writes against a WinNT directory entry, committed together.
///
/// Field names follow the directory's property names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EntryChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_dir_drive: Option<String>,
}

impl EntryChanges {
    /// Changes touching only the description, as group updates do.
    pub fn description(value: impl Into<String>) -> Self {
        Self {
            description: Some(value.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Mirrors committed changes into the in-memory record.
    pub fn apply_to(&self, user: &mut LocalUser) {
        if let Some(ref v) = self.full_name {
            user.full_name = v.clone();
        }
        if let Some(ref v) = self.description {
            user.description = v.clone();
        }
        if let Some(v) = self.password_expired {
            user.must_change_password_at_next_logon = v;
        }
        if let Some(ref v) = self.profile {
            user.profile_path = v.clone();
        }
        if let Some(ref v) = self.login_script {
            user.logon_script = v.clone();
        }
        if let Some(ref v) = self.home_directory {
            user.home_directory = v.clone();
        }
        if let Some(ref v) = self.home_dir_drive {
            user.home_drive = v.clone();
        }
    }

    /// Field names that will be written, for logging.
    pub fn fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.full_name.is_some() {
            out.push("FullName");
        }
        if self.description.is_some() {
            out.push("Description");
        }
        if self.password_expired.is_some() {
            out.push("PasswordExpired");
        }
        if self.profile.is_some() {
            out.push("Profile");
        }
        if self.login_script.is_some() {
            out.push("LoginScript");
        }
        if self.home_directory.is_some() {
            out.push("HomeDirectory");
        }
        if self.home_dir_drive.is_some() {
            out.push("HomeDirDrive");
        }
        out
    }
}

/// Pending writes against a user principal, saved together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrincipalChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_cannot_change_password: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_never_expires: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl PrincipalChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Mirrors saved changes into the in-memory record.
    pub fn apply_to(&self, user: &mut LocalUser) {
        if let Some(v) = self.user_cannot_change_password {
            user.cannot_change_password = v;
        }
        if let Some(v) = self.password_never_expires {
            user.password_never_expires = v;
        }
        if let Some(v) = self.enabled {
            user.disabled = !v;
        }
    }

    pub fn fields(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.user_cannot_change_password.is_some() {
            out.push("UserCannotChangePassword");
        }
        if self.password_never_expires.is_some() {
            out.push("PasswordNeverExpires");
        }
        if self.enabled.is_some() {
            out.push("Enabled");
        }
        out
    }
}

/// Writes needed to bring a user in line with a [`ModifyParam`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
    pub entry: EntryChanges,
    pub principal: PrincipalChanges,
}

impl ChangePlan {
    pub fn is_empty(&self) -> bool {
        self.entry.is_empty() && self.principal.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> LocalUser {
        let mut user = LocalUser::default();
        user.name = "alice".to_string();
        user.full_name = "Alice".to_string();
        user.description = "ops".to_string();
        user.sid = "S-1-5-21-1-1001".to_string();
        user
    }

    #[test]
    fn test_empty_param_plans_nothing() {
        let plan = ModifyParam::new().plan_for(&sample_user());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_equal_values_are_dropped() {
        let param = ModifyParam::new()
            .with_full_name("Alice")
            .with_description("ops")
            .with_disabled(false)
            .with_password_never_expires(false);
        assert!(param.plan_for(&sample_user()).is_empty());
    }

    #[test]
    fn test_fields_split_by_target() {
        let param = ModifyParam::new()
            .with_description("dev")
            .with_home_drive("H:")
            .with_password_never_expires(true)
            .with_disabled(true);
        let plan = param.plan_for(&sample_user());

        assert_eq!(plan.entry.fields(), vec!["Description", "HomeDirDrive"]);
        assert_eq!(plan.principal.fields(), vec!["PasswordNeverExpires", "Enabled"]);
        assert_eq!(plan.principal.enabled, Some(false));
    }

    #[test]
    fn test_must_change_password_is_an_entry_field() {
        let plan = ModifyParam::new()
            .with_must_change_password(true)
            .plan_for(&sample_user());
        assert_eq!(plan.entry.password_expired, Some(true));
        assert!(plan.principal.is_empty());
    }

    #[test]
    fn test_apply_to_mirrors_changes() {
        let mut user = sample_user();
        let plan = ModifyParam::new()
            .with_full_name("Alice B.")
            .with_disabled(true)
            .with_cannot_change_password(true)
            .plan_for(&user);

        plan.entry.apply_to(&mut user);
        plan.principal.apply_to(&mut user);

        assert_eq!(user.full_name, "Alice B.");
        assert!(user.disabled);
        assert!(user.cannot_change_password);
        assert_eq!(user.description, "ops");
    }

    #[test]
    fn test_entry_changes_serialize_only_present_fields() {
        let json = serde_json::to_string(&EntryChanges::description("x")).unwrap();
        assert_eq!(json, r#"{"Description":"x"}"#);
    }
}
