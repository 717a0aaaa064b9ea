//! Configuration types for provider initialization.

use crate::args::is_truthy;
use crate::hooks::AdminGroupRejoin;
use crate::{AccountError, Result};
use std::str::FromStr;

/// Provider type identifier.
///
/// Each variant corresponds to one account store implementation.
/// Providers must be enabled via Cargo feature flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    /// In-memory store for tests and dry runs
    Mock,
    /// Windows local accounts through PowerShell (Windows only)
    Windows,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mock => write!(f, "mock"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "windows" | "win" => Ok(Self::Windows),
            other => Err(AccountError::Other(anyhow::anyhow!(
                "unknown provider type: {}",
                other
            ))),
        }
    }
}

/// Configuration for creating a provider and the manager around it.
///
/// Use the builder pattern for ergonomic configuration:
///
/// ```
/// use localacct::{Config, ProviderType};
///
/// let config = Config::new(ProviderType::Windows)
///     .with_machine_name("WS-042")
///     .with_admin_group("Administratoren")
///     .with_powershell("pwsh.exe");
///
/// assert_eq!(config.admin_group, "Administratoren");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider type
    pub provider: ProviderType,

    /// Machine whose accounts are managed (default: local machine)
    pub machine_name: Option<String>,

    /// Group left and rejoined around policy writes (default: "Administrators")
    pub admin_group: String,

    /// Whether the admin group rejoin hook runs at all (default: true)
    pub admin_rejoin: bool,

    /// PowerShell executable (default: "powershell.exe")
    pub powershell: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderType::Windows,
            machine_name: None,
            admin_group: AdminGroupRejoin::DEFAULT_GROUP.to_string(),
            admin_rejoin: true,
            powershell: "powershell.exe".to_string(),
        }
    }
}

impl Config {
    /// Creates a new configuration for the specified provider.
    ///
    /// # Example
    ///
    /// ```
    /// use localacct::{Config, ProviderType};
    ///
    /// let config = Config::new(ProviderType::Mock);
    /// assert_eq!(config.provider, ProviderType::Mock);
    /// assert!(config.admin_rejoin);
    /// ```
    pub fn new(provider: ProviderType) -> Self {
        Self {
            provider,
            ..Default::default()
        }
    }

    /// Builds a configuration from `LOCALACCT_*` environment variables.
    ///
    /// Unset variables keep their defaults. `LOCALACCT_ADMIN_REJOIN` takes
    /// the same truthy words as boolean flags. Fails on an unknown
    /// `LOCALACCT_PROVIDER`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(provider) = lookup("LOCALACCT_PROVIDER") {
            config.provider = provider.parse()?;
        }
        if let Some(machine) = lookup("LOCALACCT_MACHINE").filter(|m| !m.is_empty()) {
            config.machine_name = Some(machine);
        }
        if let Some(group) = lookup("LOCALACCT_ADMIN_GROUP").filter(|g| !g.is_empty()) {
            config.admin_group = group;
        }
        if let Some(rejoin) = lookup("LOCALACCT_ADMIN_REJOIN") {
            config.admin_rejoin = is_truthy(rejoin.trim());
        }
        if let Some(powershell) = lookup("LOCALACCT_POWERSHELL").filter(|p| !p.is_empty()) {
            config.powershell = powershell;
        }

        Ok(config)
    }

    /// Targets another machine instead of the local one.
    pub fn with_machine_name(mut self, machine: impl Into<String>) -> Self {
        self.machine_name = Some(machine.into());
        self
    }

    /// Sets the group left and rejoined around principal writes.
    ///
    /// Localized Windows installations name the built-in administrators
    /// group differently.
    pub fn with_admin_group(mut self, group: impl Into<String>) -> Self {
        self.admin_group = group.into();
        self
    }

    /// Enables or disables the admin group rejoin hook.
    pub fn with_admin_rejoin(mut self, enabled: bool) -> Self {
        self.admin_rejoin = enabled;
        self
    }

    /// Sets the PowerShell executable the Windows provider runs.
    pub fn with_powershell(mut self, program: impl Into<String>) -> Self {
        self.powershell = program.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_builder() {
        let config = Config::new(ProviderType::Windows)
            .with_machine_name("WS-01")
            .with_admin_group("Administrateurs")
            .with_admin_rejoin(false)
            .with_powershell("pwsh");

        assert_eq!(config.provider, ProviderType::Windows);
        assert_eq!(config.machine_name.as_deref(), Some("WS-01"));
        assert_eq!(config.admin_group, "Administrateurs");
        assert!(!config.admin_rejoin);
        assert_eq!(config.powershell, "pwsh");
    }

    #[test]
    fn test_provider_type_display_and_parse() {
        assert_eq!(ProviderType::Mock.to_string(), "mock");
        assert_eq!(ProviderType::Windows.to_string(), "windows");
        assert_eq!("WINDOWS".parse::<ProviderType>().unwrap(), ProviderType::Windows);
        assert_eq!(" mock ".parse::<ProviderType>().unwrap(), ProviderType::Mock);
        assert!("ldap".parse::<ProviderType>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider, ProviderType::Windows);
        assert_eq!(config.admin_group, "Administrators");
        assert!(config.admin_rejoin);
        assert_eq!(config.powershell, "powershell.exe");
        assert!(config.machine_name.is_none());
    }

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("LOCALACCT_PROVIDER", "mock"),
            ("LOCALACCT_MACHINE", "WS-07"),
            ("LOCALACCT_ADMIN_REJOIN", "off"),
            ("LOCALACCT_ADMIN_GROUP", ""),
        ]
        .into_iter()
        .collect();

        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.provider, ProviderType::Mock);
        assert_eq!(config.machine_name.as_deref(), Some("WS-07"));
        assert!(!config.admin_rejoin);
        assert_eq!(config.admin_group, "Administrators");
    }

    #[test]
    fn test_from_lookup_rejects_unknown_provider() {
        let result =
            Config::from_lookup(|k| (k == "LOCALACCT_PROVIDER").then(|| "ldap".to_string()));
        assert!(result.is_err());
    }
}
