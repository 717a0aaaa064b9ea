//! Hooks that run around the field-write step of a user update.
//!
//! Some account-policy writes fail on Windows while the user belongs to the
//! Administrators group. [`AdminGroupRejoin`] leaves that group before the
//! writes and rejoins afterwards, whether the writes succeeded or not.
//! [`NoopHook`] turns the behaviour off.

use crate::provider::Provider;
use crate::LocalUser;
use async_trait::async_trait;

/// Pre/post pair wrapped around [`LocalUser::set_param`]'s writes.
///
/// `before` returns whether it changed anything; that value is handed back
/// to `after` so it can undo exactly what was done.
#[async_trait]
pub trait WriteHook: Send + Sync {
    /// Hook name, for logging.
    fn name(&self) -> &str;

    /// Runs before any field is written.
    async fn before(&self, user: &mut LocalUser, provider: &mut dyn Provider) -> bool;

    /// Runs after the writes, on success and on failure.
    async fn after(&self, user: &mut LocalUser, provider: &mut dyn Provider, engaged: bool);
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl WriteHook for NoopHook {
    fn name(&self) -> &str {
        "noop"
    }

    async fn before(&self, _user: &mut LocalUser, _provider: &mut dyn Provider) -> bool {
        false
    }

    async fn after(&self, _user: &mut LocalUser, _provider: &mut dyn Provider, _engaged: bool) {}
}

/// Temporarily removes the user from an administrators group while its
/// properties are written.
#[derive(Debug, Clone)]
pub struct AdminGroupRejoin {
    group: String,
}

impl AdminGroupRejoin {
    /// Default name of the built-in administrators group.
    pub const DEFAULT_GROUP: &'static str = "Administrators";

    pub fn new(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Default for AdminGroupRejoin {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GROUP)
    }
}

#[async_trait]
impl WriteHook for AdminGroupRejoin {
    fn name(&self) -> &str {
        "admin-group-rejoin"
    }

    async fn before(&self, user: &mut LocalUser, provider: &mut dyn Provider) -> bool {
        if !user.is_member_of(&self.group) {
            return false;
        }
        tracing::info!(
            account = %user.name,
            group = %self.group,
            "User is a member of the group, leaving it while parameters are modified"
        );
        user.leave_group(provider, &self.group).await
    }

    async fn after(&self, user: &mut LocalUser, provider: &mut dyn Provider, engaged: bool) {
        if !engaged {
            return;
        }
        tracing::info!(
            account = %user.name,
            group = %self.group,
            "Re-joining the group after modifying parameters"
        );
        if !user.join_group(provider, &self.group).await {
            tracing::error!(
                account = %user.name,
                group = %self.group,
                "Could not restore group membership"
            );
            return;
        }
        // join_group appends the configured spelling at the end
        if let Err(e) = user.reload_groups(&*provider).await {
            tracing::warn!(
                account = %user.name,
                error = %e,
                "Could not re-read group membership after rejoining"
            );
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::backends::mock::MockProvider;

    #[tokio::test]
    async fn test_noop_hook_never_engages() {
        let mut provider = MockProvider::new();
        provider.add_user("alice").await;
        provider.add_group("Administrators").await;
        provider.add_membership("Administrators", "alice").await;

        let mut user = LocalUser::find(&provider, "alice").await.unwrap().unwrap();
        assert!(!NoopHook.before(&mut user, &mut provider).await);
        assert!(user.is_member_of("Administrators"));
    }

    #[tokio::test]
    async fn test_admin_rejoin_round_trip() {
        let mut provider = MockProvider::new();
        provider.add_user("alice").await;
        provider.add_group("Administrators").await;
        provider.add_membership("Administrators", "alice").await;

        let hook = AdminGroupRejoin::default();
        let mut user = LocalUser::find(&provider, "alice").await.unwrap().unwrap();

        let engaged = hook.before(&mut user, &mut provider).await;
        assert!(engaged);
        assert!(!user.is_member_of("Administrators"));
        assert!(!provider.is_member("alice", "Administrators").await.unwrap());

        hook.after(&mut user, &mut provider, engaged).await;
        assert!(user.is_member_of("Administrators"));
        assert!(provider.is_member("alice", "Administrators").await.unwrap());
    }

    #[tokio::test]
    async fn test_admin_rejoin_restores_store_order() {
        let mut provider = MockProvider::new();
        provider.add_user("alice").await;
        provider.add_group("Administrators").await;
        provider.add_group("Users").await;
        provider.add_membership("Administrators", "alice").await;
        provider.add_membership("Users", "alice").await;

        let hook = AdminGroupRejoin::new("administrators");
        let mut user = LocalUser::find(&provider, "alice").await.unwrap().unwrap();

        let engaged = hook.before(&mut user, &mut provider).await;
        hook.after(&mut user, &mut provider, engaged).await;
        assert_eq!(user.joined_groups, vec!["Administrators", "Users"]);
    }

    #[tokio::test]
    async fn test_admin_rejoin_skips_non_members() {
        let mut provider = MockProvider::new();
        provider.add_user("bob").await;
        provider.add_group("Administrators").await;

        let hook = AdminGroupRejoin::new("administrators");
        let mut user = LocalUser::find(&provider, "bob").await.unwrap().unwrap();

        assert!(!hook.before(&mut user, &mut provider).await);
        hook.after(&mut user, &mut provider, false).await;
        assert_eq!(provider.membership_log().await.len(), 0);
    }
}
