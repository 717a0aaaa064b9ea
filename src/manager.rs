//! Command dispatch over one provider.
//!
//! [`AccountManager`] owns the provider and the write hook and exposes one
//! method per command. [`AccountManager::execute`] maps a parsed
//! [`ArgsParam`] onto those methods and prints the result.

use crate::args::{ArgsParam, Verb};
use crate::hooks::{AdminGroupRejoin, NoopHook, WriteHook};
use crate::modify::ModifyParam;
use crate::record::AccountKind;
use crate::{factory, Config, LocalGroup, LocalUser, Provider, Result};
use serde::Serialize;
use std::io::{self, Write};
use tracing::{debug, error, info, warn};

/// Line printed for an unrecognized verb.
pub const INVALID_COMMAND: &str = "Invalid command.";

/// Writes the fixed invalid-command line.
pub fn write_invalid_command(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "{}", INVALID_COMMAND)
}

/// Runs account commands against one provider.
///
/// # Example
///
/// ```
/// use localacct::backends::mock::MockProvider;
/// use localacct::args::ArgsParam;
/// use localacct::AccountManager;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> std::io::Result<()> {
///     let provider = MockProvider::new();
///     provider.add_user("alice").await;
///
///     let mut manager = AccountManager::new(Box::new(provider));
///     let mut out = Vec::new();
///     manager
///         .execute(&ArgsParam::parse(["get", "/u", "alice"]), &mut out)
///         .await?;
///
///     assert!(String::from_utf8_lossy(&out).contains("\"Name\": \"alice\""));
///     Ok(())
/// }
/// ```
pub struct AccountManager {
    provider: Box<dyn Provider>,
    hook: Box<dyn WriteHook>,
}

impl AccountManager {
    /// Creates a manager with the default [`AdminGroupRejoin`] hook.
    pub fn new(provider: Box<dyn Provider>) -> Self {
        Self {
            provider,
            hook: Box::new(AdminGroupRejoin::default()),
        }
    }

    /// Replaces the hook run around user parameter writes.
    pub fn with_hook(mut self, hook: Box<dyn WriteHook>) -> Self {
        self.hook = hook;
        self
    }

    /// Builds the provider named in `config` and the hook it selects.
    ///
    /// Call [`init`](crate::init) first so providers are registered.
    pub fn from_config(config: Config) -> Result<Self> {
        let hook: Box<dyn WriteHook> = if config.admin_rejoin {
            Box::new(AdminGroupRejoin::new(config.admin_group.clone()))
        } else {
            Box::new(NoopHook)
        };
        let provider = factory::new_provider(config)?;
        Ok(Self { provider, hook })
    }

    pub async fn init(&mut self) -> Result<()> {
        self.provider.init().await
    }

    pub async fn close(&mut self) -> Result<()> {
        self.provider.close().await
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn hook(&self) -> &dyn WriteHook {
        self.hook.as_ref()
    }

    // ========================================================================
    // Users
    // ========================================================================

    /// Reads every local user, `None` if the listing failed.
    pub async fn list_users(&self) -> Option<Vec<LocalUser>> {
        info!("Listing {}s", AccountKind::User);
        match LocalUser::load(self.provider()).await {
            Ok(users) => Some(users),
            Err(e) => {
                error!(error = ?e, "Failed to list {}s: {}", AccountKind::User, e);
                None
            }
        }
    }

    pub async fn get_user(&self, name: &str) -> Option<LocalUser> {
        LocalUser::get(self.provider(), name).await
    }

    /// Applies `param` to the user through the configured hook.
    pub async fn set_user(&mut self, name: &str, param: &ModifyParam) -> bool {
        let Some(mut user) = LocalUser::get(self.provider(), name).await else {
            return false;
        };
        user.set_param(self.provider.as_mut(), param, self.hook.as_ref())
            .await
    }

    pub async fn add_user(&mut self, name: &str) -> bool {
        LocalUser::add(self.provider.as_mut(), name).await
    }

    pub async fn remove_user(&mut self, name: &str) -> bool {
        match LocalUser::get(self.provider(), name).await {
            Some(mut user) => user.remove(self.provider.as_mut()).await,
            None => false,
        }
    }

    pub async fn rename_user(&mut self, name: &str, new_name: &str) -> bool {
        match LocalUser::get(self.provider(), name).await {
            Some(mut user) => user.rename(self.provider.as_mut(), new_name).await,
            None => false,
        }
    }

    pub async fn change_password(&mut self, name: &str, password: &str) -> bool {
        match LocalUser::get(self.provider(), name).await {
            Some(mut user) => user.change_password(self.provider.as_mut(), password).await,
            None => false,
        }
    }

    pub async fn join_group(&mut self, user: &str, group: &str) -> bool {
        match LocalUser::get(self.provider(), user).await {
            Some(mut u) => u.join_group(self.provider.as_mut(), group).await,
            None => false,
        }
    }

    pub async fn leave_group(&mut self, user: &str, group: &str) -> bool {
        match LocalUser::get(self.provider(), user).await {
            Some(mut u) => u.leave_group(self.provider.as_mut(), group).await,
            None => false,
        }
    }

    pub async fn unlock_user(&mut self, name: &str) -> bool {
        match LocalUser::get(self.provider(), name).await {
            Some(mut user) => user.unlock(self.provider.as_mut()).await,
            None => false,
        }
    }

    pub async fn check_logon(&self, account: &str, password: &str) -> bool {
        LocalUser::check_logon(self.provider(), account, password).await
    }

    // ========================================================================
    // Groups
    // ========================================================================

    /// Reads every local group, `None` if the listing failed.
    pub async fn list_groups(&self) -> Option<Vec<LocalGroup>> {
        info!("Listing {}s", AccountKind::Group);
        match LocalGroup::load(self.provider()).await {
            Ok(groups) => Some(groups),
            Err(e) => {
                error!(error = ?e, "Failed to list {}s: {}", AccountKind::Group, e);
                None
            }
        }
    }

    pub async fn get_group(&self, name: &str) -> Option<LocalGroup> {
        LocalGroup::get(self.provider(), name).await
    }

    pub async fn set_group(&mut self, name: &str, description: Option<&str>) -> bool {
        match LocalGroup::get(self.provider(), name).await {
            Some(mut group) => group.set_param(self.provider.as_mut(), description).await,
            None => false,
        }
    }

    pub async fn add_group(&mut self, name: &str) -> bool {
        LocalGroup::add(self.provider.as_mut(), name).await
    }

    pub async fn remove_group(&mut self, name: &str) -> bool {
        match LocalGroup::get(self.provider(), name).await {
            Some(mut group) => group.remove(self.provider.as_mut()).await,
            None => false,
        }
    }

    pub async fn rename_group(&mut self, name: &str, new_name: &str) -> bool {
        match LocalGroup::get(self.provider(), name).await {
            Some(mut group) => group.rename(self.provider.as_mut(), new_name).await,
            None => false,
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Runs the command in `args`, printing JSON results to `out`.
    ///
    /// Returns whether the operation succeeded. Only failures writing to
    /// `out` are returned as errors.
    pub async fn execute(&mut self, args: &ArgsParam, out: &mut impl Write) -> io::Result<bool> {
        debug!(verb = ?args.verb, "Dispatching command");
        let group_form = args.targets_group();

        let ok = match args.verb {
            Verb::None => {
                write_invalid_command(out)?;
                false
            }
            Verb::ListUser => match self.list_users().await {
                Some(users) => print_json(out, &users)?,
                None => false,
            },
            Verb::ListGroup => match self.list_groups().await {
                Some(groups) => print_json(out, &groups)?,
                None => false,
            },
            Verb::Get if group_form => match self.get_group(group_name(args)).await {
                Some(group) => print_json(out, &group)?,
                None => false,
            },
            Verb::Get => match required(&args.user_name, "user name") {
                Some(name) => match self.get_user(name).await {
                    Some(user) => print_json(out, &user)?,
                    None => false,
                },
                None => false,
            },
            Verb::Set if group_form => {
                let description = args.modify.as_ref().and_then(|m| m.description.as_deref());
                self.set_group(group_name(args), description).await
            }
            Verb::Set => match required(&args.user_name, "user name") {
                Some(name) => {
                    let param = args.modify.clone().unwrap_or_default();
                    self.set_user(name, &param).await
                }
                None => false,
            },
            Verb::Add if group_form => self.add_group(group_name(args)).await,
            Verb::Add => match required(&args.user_name, "user name") {
                Some(name) => self.add_user(name).await,
                None => false,
            },
            Verb::Remove if group_form => self.remove_group(group_name(args)).await,
            Verb::Remove => match required(&args.user_name, "user name") {
                Some(name) => self.remove_user(name).await,
                None => false,
            },
            Verb::Rename => match required(&args.new_name, "new name") {
                Some(new_name) if group_form => {
                    self.rename_group(group_name(args), new_name).await
                }
                Some(new_name) => match required(&args.user_name, "user name") {
                    Some(name) => self.rename_user(name, new_name).await,
                    None => false,
                },
                None => false,
            },
            Verb::ChangePassword => match required(&args.user_name, "user name") {
                Some(name) => {
                    let password = args.password.as_deref().unwrap_or_default();
                    self.change_password(name, password).await
                }
                None => false,
            },
            Verb::Join | Verb::Leave => {
                match (
                    required(&args.user_name, "user name"),
                    required(&args.group_name, "group name"),
                ) {
                    (Some(user), Some(group)) if args.verb == Verb::Join => {
                        self.join_group(user, group).await
                    }
                    (Some(user), Some(group)) => self.leave_group(user, group).await,
                    _ => false,
                }
            }
            Verb::Unlock => match required(&args.user_name, "user name") {
                Some(name) => self.unlock_user(name).await,
                None => false,
            },
            Verb::CheckLogon => match required(&args.user_name, "user name") {
                Some(name) => {
                    let password = args.password.as_deref().unwrap_or_default();
                    let ok = self.check_logon(name, password).await;
                    print_json(out, &ok)?;
                    ok
                }
                None => false,
            },
        };

        debug!(verb = ?args.verb, ok, "Command finished");
        Ok(ok)
    }
}

fn required<'a>(value: &'a Option<String>, what: &str) -> Option<&'a str> {
    let value = value.as_deref();
    if value.is_none() {
        warn!("No {} given, skipping", what);
    }
    value
}

/// Group name of a group-form command; only called when one was given.
fn group_name(args: &ArgsParam) -> &str {
    args.group_name.as_deref().unwrap_or_default()
}

fn print_json<T: Serialize + ?Sized>(out: &mut impl Write, value: &T) -> io::Result<bool> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(true)
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backends::mock::MockProvider;

    async fn manager() -> (AccountManager, MockProvider) {
        let provider = MockProvider::new();
        provider.add_user("alice").await;
        provider.add_group("Users").await;
        provider.add_membership("Users", "alice").await;
        (AccountManager::new(Box::new(provider.clone())), provider)
    }

    async fn run(manager: &mut AccountManager, argv: &[&str]) -> (bool, String) {
        let mut out = Vec::new();
        let ok = manager
            .execute(&ArgsParam::parse(argv), &mut out)
            .await
            .unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    #[tokio::test]
    async fn test_invalid_command() {
        let (mut manager, provider) = manager().await;
        let (ok, out) = run(&mut manager, &["bogus", "/u", "alice"]).await;
        assert!(!ok);
        assert_eq!(out, "Invalid command.\n");
        assert_eq!(provider.writes().await.total(), 0);
    }

    #[tokio::test]
    async fn test_get_user_prints_json() {
        let (mut manager, _) = manager().await;
        let (ok, out) = run(&mut manager, &["get", "--user", "ALICE"]).await;
        assert!(ok);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["Name"], "alice");
        assert_eq!(value["JoinedGroup"][0], "Users");
    }

    #[tokio::test]
    async fn test_get_group_form() {
        let (mut manager, _) = manager().await;
        let (ok, out) = run(&mut manager, &["get", "/g", "users"]).await;
        assert!(ok);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["Members"][0], "alice");
    }

    #[tokio::test]
    async fn test_get_missing_prints_nothing() {
        let (mut manager, _) = manager().await;
        let (ok, out) = run(&mut manager, &["get", "/u", "nobody"]).await;
        assert!(!ok);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_mutation_prints_nothing() {
        let (mut manager, provider) = manager().await;
        let (ok, out) = run(&mut manager, &["set", "/u", "alice", "/desc", "ops"]).await;
        assert!(ok);
        assert!(out.is_empty());
        assert_eq!(provider.writes().await.entry_commits, 1);
    }

    #[tokio::test]
    async fn test_missing_user_name() {
        let (mut manager, provider) = manager().await;
        let (ok, out) = run(&mut manager, &["remove"]).await;
        assert!(!ok);
        assert!(out.is_empty());
        assert_eq!(provider.writes().await.total(), 0);
    }

    #[tokio::test]
    async fn test_from_config_selects_hook() {
        crate::init();
        let config = Config::new(crate::ProviderType::Mock).with_admin_rejoin(false);
        let manager = AccountManager::from_config(config).unwrap();
        assert_eq!(manager.hook().name(), "noop");
        assert_eq!(manager.provider().name(), "mock");

        let config = Config::new(crate::ProviderType::Mock);
        let manager = AccountManager::from_config(config).unwrap();
        assert_eq!(manager.hook().name(), "admin-group-rejoin");
    }
}
