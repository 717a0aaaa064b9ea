//! Mock provider for testing.
//!
//! This provider keeps a complete local account store in memory, counts
//! every native write it receives and can inject failures, hide single
//! sources, or refuse policy writes for members of a group the way Windows
//! does for administrators.

use crate::modify::{EntryChanges, PrincipalChanges};
use crate::record::{
    same_name, AccountKind, AccountRow, EntryProps, GroupPrincipalInfo, UserPrincipalInfo,
};
use crate::{AccountError, Provider, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Machine name the mock answers to in logon checks.
pub const MOCK_MACHINE: &str = "MOCKHOST";

const SID_PREFIX: &str = "S-1-5-21-1004336348-1177238915-682003330";

/// Provider operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    ListRows,
    FindEntry,
    FindPrincipal,
    CommitEntry,
    SavePrincipal,
    Create,
    Delete,
    Rename,
    SetPassword,
    Membership,
    Unlock,
}

/// One of the three read sources, for hiding an account from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Row,
    Entry,
    Principal,
}

/// Membership change seen by the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Added { group: String, user: String },
    Removed { group: String, user: String },
}

/// Count of native writes received, per primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub entry_commits: usize,
    pub principal_saves: usize,
    pub creates: usize,
    pub deletes: usize,
    pub renames: usize,
    pub password_sets: usize,
    pub membership_changes: usize,
    pub unlocks: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.entry_commits
            + self.principal_saves
            + self.creates
            + self.deletes
            + self.renames
            + self.password_sets
            + self.membership_changes
            + self.unlocks
    }
}

#[derive(Debug, Clone)]
struct MockUser {
    name: String,
    sid: String,
    full_name: String,
    description: String,
    password_expired: bool,
    cannot_change_password: bool,
    password_never_expires: bool,
    enabled: bool,
    locked_out: bool,
    profile: String,
    login_script: String,
    home_directory: String,
    home_dir_drive: String,
    password: Option<String>,
    last_logon: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct MockGroup {
    name: String,
    sid: String,
    description: String,
    members: Vec<String>,
}

#[derive(Debug, Default)]
struct MockState {
    users: Vec<MockUser>,
    groups: Vec<MockGroup>,
    next_rid: u32,
    failures: HashMap<FailPoint, String>,
    account_failures: HashMap<(FailPoint, String), String>,
    hidden: HashSet<(Source, String)>,
    policy_locked_group: Option<String>,
    writes: WriteCounts,
    membership_log: Vec<MembershipChange>,
}

impl MockState {
    fn next_sid(&mut self) -> String {
        if self.next_rid == 0 {
            self.next_rid = 1000;
        }
        let rid = self.next_rid;
        self.next_rid += 1;
        format!("{}-{}", SID_PREFIX, rid)
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        match self.failures.get(&point) {
            Some(msg) => Err(AccountError::CommandFailed(msg.clone())),
            None => Ok(()),
        }
    }

    fn check_for(&self, point: FailPoint, name: &str) -> Result<()> {
        self.check(point)?;
        match self.account_failures.get(&(point, name.to_lowercase())) {
            Some(msg) => Err(AccountError::CommandFailed(msg.clone())),
            None => Ok(()),
        }
    }

    fn is_hidden(&self, source: Source, name: &str) -> bool {
        self.hidden.contains(&(source, name.to_lowercase()))
    }

    fn user(&self, name: &str) -> Option<&MockUser> {
        self.users.iter().find(|u| same_name(&u.name, name))
    }

    fn user_mut(&mut self, name: &str) -> Option<&mut MockUser> {
        self.users.iter_mut().find(|u| same_name(&u.name, name))
    }

    fn group(&self, name: &str) -> Option<&MockGroup> {
        self.groups.iter().find(|g| same_name(&g.name, name))
    }

    fn group_mut(&mut self, name: &str) -> Option<&mut MockGroup> {
        self.groups.iter_mut().find(|g| same_name(&g.name, name))
    }

    fn exists(&self, kind: AccountKind, name: &str) -> bool {
        match kind {
            AccountKind::User => self.user(name).is_some(),
            AccountKind::Group => self.group(name).is_some(),
        }
    }

    fn groups_of(&self, user: &str) -> Vec<String> {
        self.groups
            .iter()
            .filter(|g| g.members.iter().any(|m| same_name(m, user)))
            .map(|g| g.name.clone())
            .collect()
    }

    fn names(&self, kind: AccountKind) -> Vec<String> {
        match kind {
            AccountKind::User => self.users.iter().map(|u| u.name.clone()).collect(),
            AccountKind::Group => self.groups.iter().map(|g| g.name.clone()).collect(),
        }
    }

    fn sid_of(&self, kind: AccountKind, name: &str) -> Option<String> {
        match kind {
            AccountKind::User => self.user(name).map(|u| u.sid.clone()),
            AccountKind::Group => self.group(name).map(|g| g.sid.clone()),
        }
    }

    fn insert(&mut self, kind: AccountKind, name: &str) -> String {
        let sid = self.next_sid();
        match kind {
            AccountKind::User => self.users.push(MockUser {
                name: name.to_string(),
                sid: sid.clone(),
                full_name: String::new(),
                description: String::new(),
                password_expired: false,
                cannot_change_password: false,
                password_never_expires: false,
                enabled: true,
                locked_out: false,
                profile: String::new(),
                login_script: String::new(),
                home_directory: String::new(),
                home_dir_drive: String::new(),
                password: None,
                last_logon: None,
            }),
            AccountKind::Group => self.groups.push(MockGroup {
                name: name.to_string(),
                sid: sid.clone(),
                description: String::new(),
                members: Vec::new(),
            }),
        }
        sid
    }
}

/// Mock provider for testing.
///
/// Clones share the same store, so a test can keep a handle for seeding and
/// inspection after boxing another clone into an
/// [`AccountManager`](crate::AccountManager).
///
/// # Example
///
/// ```
/// use localacct::backends::mock::{FailPoint, MockProvider};
/// use localacct::{LocalUser, ModifyParam, NoopHook};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let mut provider = MockProvider::new();
///     provider.add_user("alice").await;
///
///     let mut user = LocalUser::get(&provider, "alice").await.unwrap();
///
///     provider.fail(FailPoint::CommitEntry, "access denied").await;
///     let param = ModifyParam::new().with_description("ops");
///     assert!(!user.set_param(&mut provider, &param, &NoopHook).await);
/// }
/// ```
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<RwLock<MockState>>,
}

impl MockProvider {
    /// Creates a mock provider with an empty account store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user and returns its SID.
    pub async fn add_user(&self, name: &str) -> String {
        self.state.write().await.insert(AccountKind::User, name)
    }

    /// Adds a group and returns its SID.
    pub async fn add_group(&self, name: &str) -> String {
        self.state.write().await.insert(AccountKind::Group, name)
    }

    /// Puts `user` into `group` without counting a write.
    pub async fn add_membership(&self, group: &str, user: &str) {
        let mut state = self.state.write().await;
        if let Some(g) = state.group_mut(group) {
            if !g.members.iter().any(|m| same_name(m, user)) {
                g.members.push(user.to_string());
            }
        }
    }

    pub async fn set_locked(&self, user: &str, locked: bool) {
        if let Some(u) = self.state.write().await.user_mut(user) {
            u.locked_out = locked;
        }
    }

    pub async fn set_last_logon(&self, user: &str, at: DateTime<Utc>) {
        if let Some(u) = self.state.write().await.user_mut(user) {
            u.last_logon = Some(at);
        }
    }

    /// Makes every call to `point` fail with `message`.
    pub async fn fail(&self, point: FailPoint, message: impl Into<String>) {
        self.state.write().await.failures.insert(point, message.into());
    }

    /// Makes calls to `point` fail with `message` for one account only.
    pub async fn fail_for(&self, point: FailPoint, account: &str, message: impl Into<String>) {
        self.state
            .write()
            .await
            .account_failures
            .insert((point, account.to_lowercase()), message.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.failures.clear();
        state.account_failures.clear();
    }

    /// Makes `source` report `name` as missing.
    pub async fn hide(&self, source: Source, name: &str) {
        self.state
            .write()
            .await
            .hidden
            .insert((source, name.to_lowercase()));
    }

    /// Refuses principal saves for members of `group`.
    pub async fn lock_policy_for_members_of(&self, group: &str) {
        self.state.write().await.policy_locked_group = Some(group.to_string());
    }

    pub async fn writes(&self) -> WriteCounts {
        self.state.read().await.writes
    }

    pub async fn membership_log(&self) -> Vec<MembershipChange> {
        self.state.read().await.membership_log.clone()
    }

    /// Password last set for `user`.
    pub async fn stored_password(&self, user: &str) -> Option<String> {
        self.state.read().await.user(user)?.password.clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn list_rows(&self, kind: AccountKind) -> Result<Vec<AccountRow>> {
        let state = self.state.read().await;
        state.check(FailPoint::ListRows)?;

        Ok(state
            .names(kind)
            .into_iter()
            .filter(|name| !state.is_hidden(Source::Row, name))
            .filter_map(|name| {
                let sid = state.sid_of(kind, &name)?;
                Some(AccountRow { name, sid })
            })
            .collect())
    }

    async fn find_row(&self, kind: AccountKind, name: &str) -> Result<Option<AccountRow>> {
        let rows = self.list_rows(kind).await?;
        Ok(rows.into_iter().find(|r| same_name(&r.name, name)))
    }

    async fn list_entry_names(&self, kind: AccountKind) -> Result<Vec<String>> {
        let state = self.state.read().await;
        state.check(FailPoint::FindEntry)?;

        Ok(state
            .names(kind)
            .into_iter()
            .filter(|name| !state.is_hidden(Source::Entry, name))
            .collect())
    }

    async fn find_entry(&self, kind: AccountKind, name: &str) -> Result<Option<EntryProps>> {
        let state = self.state.read().await;
        state.check_for(FailPoint::FindEntry, name)?;
        if state.is_hidden(Source::Entry, name) {
            return Ok(None);
        }

        let props = match kind {
            AccountKind::User => state.user(name).map(|u| EntryProps {
                name: u.name.clone(),
                full_name: u.full_name.clone(),
                description: u.description.clone(),
                password_expired: u.password_expired,
                profile: u.profile.clone(),
                login_script: u.login_script.clone(),
                home_directory: u.home_directory.clone(),
                home_dir_drive: u.home_dir_drive.clone(),
            }),
            AccountKind::Group => state.group(name).map(|g| EntryProps {
                name: g.name.clone(),
                description: g.description.clone(),
                ..Default::default()
            }),
        };
        Ok(props)
    }

    async fn commit_entry(
        &mut self,
        kind: AccountKind,
        name: &str,
        changes: &EntryChanges,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::CommitEntry)?;

        match kind {
            AccountKind::User => {
                let user = state
                    .user_mut(name)
                    .ok_or_else(|| AccountError::not_found(kind, name))?;
                if let Some(ref v) = changes.full_name {
                    user.full_name = v.clone();
                }
                if let Some(ref v) = changes.description {
                    user.description = v.clone();
                }
                if let Some(v) = changes.password_expired {
                    user.password_expired = v;
                }
                if let Some(ref v) = changes.profile {
                    user.profile = v.clone();
                }
                if let Some(ref v) = changes.login_script {
                    user.login_script = v.clone();
                }
                if let Some(ref v) = changes.home_directory {
                    user.home_directory = v.clone();
                }
                if let Some(ref v) = changes.home_dir_drive {
                    user.home_dir_drive = v.clone();
                }
            }
            AccountKind::Group => {
                let group = state
                    .group_mut(name)
                    .ok_or_else(|| AccountError::not_found(kind, name))?;
                if let Some(ref v) = changes.description {
                    group.description = v.clone();
                }
            }
        }

        state.writes.entry_commits += 1;
        Ok(())
    }

    async fn create_entry(&mut self, kind: AccountKind, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Create)?;

        if state.exists(AccountKind::User, name) || state.exists(AccountKind::Group, name) {
            return Err(AccountError::AlreadyExists {
                kind,
                name: name.to_string(),
            });
        }
        state.insert(kind, name);
        state.writes.creates += 1;
        Ok(())
    }

    async fn delete_entry(&mut self, kind: AccountKind, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Delete)?;

        if !state.exists(kind, name) {
            return Err(AccountError::not_found(kind, name));
        }
        match kind {
            AccountKind::User => {
                state.users.retain(|u| !same_name(&u.name, name));
                for group in state.groups.iter_mut() {
                    group.members.retain(|m| !same_name(m, name));
                }
            }
            AccountKind::Group => state.groups.retain(|g| !same_name(&g.name, name)),
        }
        state.writes.deletes += 1;
        Ok(())
    }

    async fn rename_entry(&mut self, kind: AccountKind, name: &str, new_name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Rename)?;

        if !state.exists(kind, name) {
            return Err(AccountError::not_found(kind, name));
        }
        let taken = state.exists(AccountKind::User, new_name)
            || state.exists(AccountKind::Group, new_name);
        if taken && !same_name(name, new_name) {
            return Err(AccountError::AlreadyExists {
                kind,
                name: new_name.to_string(),
            });
        }

        match kind {
            AccountKind::User => {
                if let Some(user) = state.user_mut(name) {
                    user.name = new_name.to_string();
                }
                for group in state.groups.iter_mut() {
                    for member in group.members.iter_mut() {
                        if same_name(member, name) {
                            *member = new_name.to_string();
                        }
                    }
                }
            }
            AccountKind::Group => {
                if let Some(group) = state.group_mut(name) {
                    group.name = new_name.to_string();
                }
            }
        }
        state.writes.renames += 1;
        Ok(())
    }

    async fn set_password(&mut self, name: &str, password: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::SetPassword)?;

        let user = state
            .user_mut(name)
            .ok_or_else(|| AccountError::not_found(AccountKind::User, name))?;
        user.password = Some(password.to_string());
        state.writes.password_sets += 1;
        Ok(())
    }

    async fn add_member(&mut self, group: &str, user: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Membership)?;

        if state.user(user).is_none() {
            return Err(AccountError::not_found(AccountKind::User, user));
        }
        let entry = state
            .group_mut(group)
            .ok_or_else(|| AccountError::not_found(AccountKind::Group, group))?;
        if entry.members.iter().any(|m| same_name(m, user)) {
            return Err(AccountError::CommandFailed(format!(
                "{} is already a member of {}",
                user, group
            )));
        }
        entry.members.push(user.to_string());

        state.writes.membership_changes += 1;
        state.membership_log.push(MembershipChange::Added {
            group: group.to_string(),
            user: user.to_string(),
        });
        Ok(())
    }

    async fn remove_member(&mut self, group: &str, user: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Membership)?;

        let entry = state
            .group_mut(group)
            .ok_or_else(|| AccountError::not_found(AccountKind::Group, group))?;
        let before = entry.members.len();
        entry.members.retain(|m| !same_name(m, user));
        if entry.members.len() == before {
            return Err(AccountError::CommandFailed(format!(
                "{} is not a member of {}",
                user, group
            )));
        }

        state.writes.membership_changes += 1;
        state.membership_log.push(MembershipChange::Removed {
            group: group.to_string(),
            user: user.to_string(),
        });
        Ok(())
    }

    async fn find_user_principal(&self, name: &str) -> Result<Option<UserPrincipalInfo>> {
        let state = self.state.read().await;
        state.check_for(FailPoint::FindPrincipal, name)?;
        if state.is_hidden(Source::Principal, name) {
            return Ok(None);
        }

        Ok(state.user(name).map(|u| UserPrincipalInfo {
            sid: u.sid.clone(),
            user_cannot_change_password: u.cannot_change_password,
            password_never_expires: u.password_never_expires,
            enabled: Some(u.enabled),
            locked_out: u.locked_out,
            groups: state.groups_of(&u.name),
            last_logon: u.last_logon,
        }))
    }

    async fn find_group_principal(&self, name: &str) -> Result<Option<GroupPrincipalInfo>> {
        let state = self.state.read().await;
        state.check_for(FailPoint::FindPrincipal, name)?;
        if state.is_hidden(Source::Principal, name) {
            return Ok(None);
        }

        Ok(state.group(name).map(|g| GroupPrincipalInfo {
            sid: g.sid.clone(),
            members: g.members.clone(),
        }))
    }

    async fn save_principal(&mut self, name: &str, changes: &PrincipalChanges) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::SavePrincipal)?;

        if let Some(group) = state.policy_locked_group.clone() {
            if state.groups_of(name).iter().any(|g| same_name(g, &group)) {
                return Err(AccountError::CommandFailed(format!(
                    "access denied while {} is a member of {}",
                    name, group
                )));
            }
        }

        let user = state
            .user_mut(name)
            .ok_or_else(|| AccountError::not_found(AccountKind::User, name))?;
        if let Some(v) = changes.user_cannot_change_password {
            user.cannot_change_password = v;
        }
        if let Some(v) = changes.password_never_expires {
            user.password_never_expires = v;
        }
        if let Some(v) = changes.enabled {
            user.enabled = v;
        }
        state.writes.principal_saves += 1;
        Ok(())
    }

    async fn is_locked_out(&self, name: &str) -> Result<Option<bool>> {
        let state = self.state.read().await;
        state.check(FailPoint::FindPrincipal)?;
        Ok(state.user(name).map(|u| u.locked_out))
    }

    async fn unlock(&mut self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Unlock)?;

        let user = state
            .user_mut(name)
            .ok_or_else(|| AccountError::not_found(AccountKind::User, name))?;
        user.locked_out = false;
        state.writes.unlocks += 1;
        Ok(())
    }

    async fn is_member(&self, user: &str, group: &str) -> Result<bool> {
        let state = self.state.read().await;
        state.check(FailPoint::FindPrincipal)?;
        Ok(state
            .group(group)
            .map(|g| g.members.iter().any(|m| same_name(m, user)))
            .unwrap_or(false))
    }

    async fn verify_logon(&self, user: &str, domain: &str, password: &str) -> Result<bool> {
        let state = self.state.read().await;
        if !(domain.is_empty() || domain == "." || same_name(domain, MOCK_MACHINE)) {
            return Ok(false);
        }
        Ok(state.user(user).is_some_and(|u| {
            u.enabled && !u.locked_out && u.password.as_deref() == Some(password)
        }))
    }
}

/// Registers the mock provider with the factory.
pub fn register() {
    crate::factory::register_provider("mock", |_cfg| Ok(Box::new(MockProvider::new())));
}
