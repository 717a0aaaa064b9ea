//! Windows provider integration tests against the real local account store.
//!
//! These tests create, modify and delete a throwaway local account, so they
//! must run elevated on a disposable machine.
//!
//! Run with:
//!   cargo test --test integration_windows -- --ignored --test-threads=1

#![cfg(all(windows, feature = "windows-provider"))]

use localacct::{
    factory, Config, LocalGroup, LocalUser, ModifyParam, NoopHook, Provider, ProviderType,
};

const TEST_USER: &str = "lacct-it-user";
const TEST_GROUP: &str = "lacct-it-group";

async fn setup_provider() -> Box<dyn Provider> {
    localacct::init();

    let mut provider = factory::new_provider(Config::new(ProviderType::Windows))
        .expect("Failed to create provider");
    provider.init().await.expect("Failed to initialize provider");
    provider
}

async fn cleanup(provider: &mut dyn Provider) {
    if let Some(mut user) = LocalUser::get(&*provider, TEST_USER).await {
        user.remove(provider).await;
    }
    if let Some(mut group) = LocalGroup::get(&*provider, TEST_GROUP).await {
        group.remove(provider).await;
    }
}

#[tokio::test]
#[ignore] // Mutates real local accounts
async fn test_windows_lists_builtin_accounts() {
    let provider = setup_provider().await;

    let users = LocalUser::load(provider.as_ref()).await.unwrap();
    assert!(users.iter().any(|u| u.sid.ends_with("-500")));

    let groups = LocalGroup::load(provider.as_ref()).await.unwrap();
    assert!(groups.iter().any(|g| g.sid == "S-1-5-32-544"));
}

#[tokio::test]
#[ignore] // Mutates real local accounts
async fn test_windows_user_lifecycle() {
    let mut provider = setup_provider().await;
    cleanup(provider.as_mut()).await;

    assert!(LocalUser::create(provider.as_mut(), TEST_USER).await);
    let mut user = LocalUser::get(provider.as_ref(), TEST_USER).await.unwrap();
    assert!(user.sid.starts_with("S-1-5-21-"));

    let param = ModifyParam::new()
        .with_full_name("Integration Test")
        .with_password_never_expires(true);
    assert!(user.set_param(provider.as_mut(), &param, &NoopHook).await);

    let fresh = LocalUser::get(provider.as_ref(), TEST_USER).await.unwrap();
    assert_eq!(fresh.full_name, "Integration Test");
    assert!(fresh.password_never_expires);

    assert!(user.change_password(provider.as_mut(), "It-Passw0rd!x").await);
    assert!(LocalUser::check_logon(provider.as_ref(), TEST_USER, "It-Passw0rd!x").await);
    assert!(!LocalUser::check_logon(provider.as_ref(), TEST_USER, "wrong").await);

    assert!(user.remove(provider.as_mut()).await);
    assert!(!user.remove(provider.as_mut()).await);
}

#[tokio::test]
#[ignore] // Mutates real local accounts
async fn test_windows_group_membership() {
    let mut provider = setup_provider().await;
    cleanup(provider.as_mut()).await;

    assert!(LocalUser::create(provider.as_mut(), TEST_USER).await);
    assert!(LocalGroup::create(provider.as_mut(), TEST_GROUP).await);

    let mut user = LocalUser::get(provider.as_ref(), TEST_USER).await.unwrap();
    assert!(user.join_group(provider.as_mut(), TEST_GROUP).await);
    assert!(LocalGroup::has_member_live(provider.as_ref(), TEST_GROUP, TEST_USER).await);

    assert!(user.leave_group(provider.as_mut(), TEST_GROUP).await);
    assert!(!LocalUser::is_member_of_live(provider.as_ref(), TEST_USER, TEST_GROUP).await);

    cleanup(provider.as_mut()).await;
}
