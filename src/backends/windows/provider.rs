//! Windows local account provider implementation.

use super::logon;
use super::script::{Script, EXIT_NOT_FOUND};
use crate::modify::{EntryChanges, PrincipalChanges};
use crate::record::{
    same_name, AccountKind, AccountRow, EntryProps, GroupPrincipalInfo, UserPrincipalInfo,
};
use crate::shell;
use crate::{AccountError, Config, Provider, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Windows local account provider.
///
/// Uses PowerShell to reach WMI, the WinNT directory and
/// AccountManagement principals, and `LogonUserW` for credential checks.
pub struct WindowsProvider {
    powershell: String,
    machine: Option<String>,
}

/// JSON handed to every script on stdin.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ScriptInput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    machine: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wmi_class: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    changes: Option<serde_json::Value>,
}

impl WindowsProvider {
    /// Creates a new Windows provider from configuration.
    pub fn new(config: Config) -> Self {
        Self {
            powershell: config.powershell,
            machine: config.machine_name,
        }
    }

    fn input(&self) -> ScriptInput<'_> {
        ScriptInput {
            machine: self.machine.as_deref(),
            ..Default::default()
        }
    }

    /// Runs `script` with `input` on stdin.
    ///
    /// Returns `Ok(None)` when the script reports a missing account.
    async fn run_script(&self, script: Script, input: &ScriptInput<'_>) -> Result<Option<String>> {
        let encoded = script.encoded();
        let stdin = serde_json::to_string(input)?;
        debug!(operation = script.operation(), "Running PowerShell script");

        let output = shell::capture(
            &self.powershell,
            &[
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-EncodedCommand",
                encoded.as_str(),
            ],
            Some(&stdin),
        )
        .await?;

        match output.code {
            Some(0) => Ok(Some(output.stdout.trim().to_string())),
            Some(EXIT_NOT_FOUND) => Ok(None),
            code => Err(AccountError::CommandFailed(format!(
                "PowerShell {} exited with {}: {}",
                script.operation(),
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                output.stderr.trim()
            ))),
        }
    }

    async fn query<T: DeserializeOwned>(
        &self,
        script: Script,
        input: &ScriptInput<'_>,
    ) -> Result<Option<T>> {
        match self.run_script(script, input).await? {
            Some(out) => Ok(Some(parse_output(&out)?)),
            None => Ok(None),
        }
    }

    /// Runs a write script; a missing account becomes `NotFound`.
    async fn write(
        &self,
        script: Script,
        input: &ScriptInput<'_>,
        kind: AccountKind,
        name: &str,
    ) -> Result<()> {
        self.run_script(script, input)
            .await?
            .map(|_| ())
            .ok_or_else(|| AccountError::not_found(kind, name))
    }
}

/// Parses script output, treating empty output as JSON `null`.
fn parse_output<T: DeserializeOwned>(out: &str) -> Result<T> {
    let out = if out.is_empty() { "null" } else { out };
    serde_json::from_str(out).map_err(AccountError::from)
}

#[async_trait]
impl Provider for WindowsProvider {
    fn name(&self) -> &str {
        "windows"
    }

    async fn init(&mut self) -> Result<()> {
        if !cfg!(windows) {
            return Err(AccountError::ProviderUnavailable(
                "Windows local accounts are only available on Windows".to_string(),
            ));
        }
        if !shell::check_command_exists(&self.powershell).await? {
            return Err(AccountError::ProviderUnavailable(format!(
                "PowerShell ({}) is required for the Windows provider",
                self.powershell
            )));
        }

        let major: Option<u32> = self.query(Script::Probe, &self.input()).await?;
        debug!(version = ?major, "PowerShell available");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn list_rows(&self, kind: AccountKind) -> Result<Vec<AccountRow>> {
        let input = ScriptInput {
            wmi_class: Some(kind.wmi_class()),
            ..self.input()
        };
        Ok(self.query(Script::ListRows, &input).await?.unwrap_or_default())
    }

    async fn find_row(&self, kind: AccountKind, name: &str) -> Result<Option<AccountRow>> {
        let rows = self.list_rows(kind).await?;
        Ok(rows.into_iter().find(|r| same_name(&r.name, name)))
    }

    async fn list_entry_names(&self, kind: AccountKind) -> Result<Vec<String>> {
        let input = ScriptInput {
            schema_class: Some(kind.schema_class()),
            ..self.input()
        };
        Ok(self
            .query(Script::ListEntryNames, &input)
            .await?
            .unwrap_or_default())
    }

    async fn find_entry(&self, kind: AccountKind, name: &str) -> Result<Option<EntryProps>> {
        let input = ScriptInput {
            name: Some(name),
            schema_class: Some(kind.schema_class()),
            ..self.input()
        };
        self.query(Script::FindEntry, &input).await
    }

    async fn commit_entry(
        &mut self,
        kind: AccountKind,
        name: &str,
        changes: &EntryChanges,
    ) -> Result<()> {
        let changes = match kind {
            AccountKind::User => serde_json::to_value(changes)?,
            // groups only carry a description
            AccountKind::Group => serde_json::to_value(EntryChanges {
                description: changes.description.clone(),
                ..Default::default()
            })?,
        };
        let input = ScriptInput {
            name: Some(name),
            schema_class: Some(kind.schema_class()),
            changes: Some(changes),
            ..self.input()
        };
        self.write(Script::CommitEntry, &input, kind, name).await
    }

    async fn create_entry(&mut self, kind: AccountKind, name: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(name),
            schema_class: Some(kind.schema_class()),
            ..self.input()
        };
        self.run_script(Script::CreateEntry, &input).await.map(|_| ())
    }

    async fn delete_entry(&mut self, kind: AccountKind, name: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(name),
            schema_class: Some(kind.schema_class()),
            ..self.input()
        };
        self.write(Script::DeleteEntry, &input, kind, name).await
    }

    async fn rename_entry(&mut self, kind: AccountKind, name: &str, new_name: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(name),
            new_name: Some(new_name),
            schema_class: Some(kind.schema_class()),
            ..self.input()
        };
        self.write(Script::RenameEntry, &input, kind, name).await
    }

    async fn set_password(&mut self, name: &str, password: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(name),
            password: Some(password),
            ..self.input()
        };
        self.write(Script::SetPassword, &input, AccountKind::User, name)
            .await
    }

    async fn add_member(&mut self, group: &str, user: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(user),
            group: Some(group),
            ..self.input()
        };
        self.write(Script::AddMember, &input, AccountKind::Group, group)
            .await
    }

    async fn remove_member(&mut self, group: &str, user: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(user),
            group: Some(group),
            ..self.input()
        };
        self.write(Script::RemoveMember, &input, AccountKind::Group, group)
            .await
    }

    async fn find_user_principal(&self, name: &str) -> Result<Option<UserPrincipalInfo>> {
        let input = ScriptInput {
            name: Some(name),
            ..self.input()
        };
        self.query(Script::FindUserPrincipal, &input).await
    }

    async fn find_group_principal(&self, name: &str) -> Result<Option<GroupPrincipalInfo>> {
        let input = ScriptInput {
            name: Some(name),
            ..self.input()
        };
        self.query(Script::FindGroupPrincipal, &input).await
    }

    async fn save_principal(&mut self, name: &str, changes: &PrincipalChanges) -> Result<()> {
        let input = ScriptInput {
            name: Some(name),
            changes: Some(serde_json::to_value(changes)?),
            ..self.input()
        };
        self.write(Script::SavePrincipal, &input, AccountKind::User, name)
            .await
    }

    async fn is_locked_out(&self, name: &str) -> Result<Option<bool>> {
        let input = ScriptInput {
            name: Some(name),
            ..self.input()
        };
        self.query(Script::IsLockedOut, &input).await
    }

    async fn unlock(&mut self, name: &str) -> Result<()> {
        let input = ScriptInput {
            name: Some(name),
            ..self.input()
        };
        self.write(Script::Unlock, &input, AccountKind::User, name)
            .await
    }

    async fn is_member(&self, user: &str, group: &str) -> Result<bool> {
        let input = ScriptInput {
            name: Some(user),
            group: Some(group),
            ..self.input()
        };
        Ok(self
            .query(Script::IsMember, &input)
            .await?
            .unwrap_or(false))
    }

    async fn verify_logon(&self, user: &str, domain: &str, password: &str) -> Result<bool> {
        let domain = if domain.is_empty() {
            self.machine.as_deref().unwrap_or(".")
        } else {
            domain
        };
        logon::verify(user, domain, password)
    }
}
