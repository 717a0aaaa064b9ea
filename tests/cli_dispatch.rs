//! Command-line dispatch against the in-memory provider.
//!
//! Run with:
//!   cargo test --test cli_dispatch

#![cfg(feature = "mock")]

use localacct::args::ArgsParam;
use localacct::backends::mock::{FailPoint, MockProvider};
use localacct::{factory, AccountManager, Config, NoopHook, ProviderType};
use serde_json::Value;

async fn setup() -> (AccountManager, MockProvider) {
    let provider = MockProvider::new();
    provider.add_group("Administrators").await;
    provider.add_group("Users").await;
    provider.add_user("Administrator").await;
    provider.add_user("alice").await;
    provider.add_membership("Administrators", "Administrator").await;
    provider.add_membership("Users", "alice").await;

    let manager = AccountManager::new(Box::new(provider.clone()));
    (manager, provider)
}

async fn run(manager: &mut AccountManager, argv: &[&str]) -> (bool, String) {
    let mut out = Vec::new();
    let ok = manager
        .execute(&ArgsParam::parse(argv), &mut out)
        .await
        .expect("writing to a Vec cannot fail");
    (ok, String::from_utf8(out).expect("output is UTF-8"))
}

fn json(out: &str) -> Value {
    serde_json::from_str(out).expect("output is JSON")
}

#[tokio::test]
async fn test_listuser_prints_array() {
    let (mut manager, _) = setup().await;

    let (ok, out) = run(&mut manager, &["listuser"]).await;
    assert!(ok);
    let users = json(&out);
    let names: Vec<_> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["Name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Administrator", "alice"]);
    assert!(out.contains("\n  "), "output is pretty-printed");
}

#[tokio::test]
async fn test_listuser_survives_unreadable_account() {
    let (mut manager, provider) = setup().await;
    provider
        .fail_for(FailPoint::FindPrincipal, "Administrator", "access is denied")
        .await;

    let (ok, out) = run(&mut manager, &["listuser"]).await;
    assert!(ok);
    let users = json(&out);
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["Name"], "alice");
}

#[tokio::test]
async fn test_listgroup_prints_array() {
    let (mut manager, _) = setup().await;

    let (ok, out) = run(&mut manager, &["listgroup"]).await;
    assert!(ok);
    let groups = json(&out);
    assert_eq!(groups[0]["Name"], "Administrators");
    assert_eq!(groups[0]["Members"][0], "Administrator");
}

#[tokio::test]
async fn test_unknown_verb() {
    let (mut manager, provider) = setup().await;

    let (ok, out) = run(&mut manager, &["delete", "/u", "alice"]).await;
    assert!(!ok);
    assert_eq!(out.trim_end(), "Invalid command.");
    assert_eq!(provider.writes().await.total(), 0);

    let (_, out) = run(&mut manager, &[]).await;
    assert_eq!(out.trim_end(), "Invalid command.");
}

#[tokio::test]
async fn test_set_disable_false_enables() {
    let (mut manager, provider) = setup().await;

    let (ok, _) = run(&mut manager, &["set", "/u", "alice", "--disableaccount", "yes"]).await;
    assert!(ok);
    let (_, out) = run(&mut manager, &["get", "/u", "alice"]).await;
    assert_eq!(json(&out)["AccountIsDisabled"], true);

    let (ok, out) = run(&mut manager, &["set", "/u", "alice", "--DisableAccount", "false"]).await;
    assert!(ok);
    assert!(out.is_empty());
    let (_, out) = run(&mut manager, &["get", "/u", "alice"]).await;
    assert_eq!(json(&out)["AccountIsDisabled"], false);
    assert_eq!(provider.writes().await.principal_saves, 2);
}

#[tokio::test]
async fn test_set_admin_keeps_membership() {
    let (mut manager, provider) = setup().await;

    let (ok, _) = run(
        &mut manager,
        &["set", "/u", "Administrator", "/never", "on", "/fn", "Built-in"],
    )
    .await;
    assert!(ok);

    let (_, out) = run(&mut manager, &["get", "/u", "administrator"]).await;
    let admin = json(&out);
    assert_eq!(admin["FullName"], "Built-in");
    assert_eq!(admin["PasswordNeverExpires"], true);
    assert_eq!(admin["JoinedGroup"][0], "Administrators");
    assert_eq!(provider.membership_log().await.len(), 2);
}

#[tokio::test]
async fn test_noop_hook_leaves_membership_alone() {
    let (manager, provider) = setup().await;
    let mut manager = manager.with_hook(Box::new(NoopHook));

    let (ok, _) = run(&mut manager, &["set", "/u", "Administrator", "/desc", "x"]).await;
    assert!(ok);
    assert!(provider.membership_log().await.is_empty());
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (mut manager, provider) = setup().await;

    assert!(run(&mut manager, &["add", "--username", "bob"]).await.0);
    assert!(run(&mut manager, &["changepassword", "/u", "bob", "/p", "Pa55word!"]).await.0);
    assert!(!run(&mut manager, &["changepassword", "/u", "bob"]).await.0);
    assert!(run(&mut manager, &["join", "/u", "bob", "/g", "Users"]).await.0);
    assert!(run(&mut manager, &["rename", "/u", "bob", "/n", "robert"]).await.0);

    let (ok, out) = run(&mut manager, &["get", "/u", "robert"]).await;
    assert!(ok);
    assert_eq!(json(&out)["JoinedGroup"][0], "Users");
    assert_eq!(provider.stored_password("robert").await.as_deref(), Some("Pa55word!"));

    assert!(run(&mut manager, &["leave", "/u", "robert", "/g", "Users"]).await.0);
    assert!(run(&mut manager, &["remove", "/u", "robert"]).await.0);
    assert!(!run(&mut manager, &["remove", "/u", "robert"]).await.0);
    assert!(!run(&mut manager, &["get", "/u", "robert"]).await.0);
}

#[tokio::test]
async fn test_group_form_commands() {
    let (mut manager, _) = setup().await;

    assert!(run(&mut manager, &["add", "/g", "Builders"]).await.0);
    assert!(run(&mut manager, &["set", "/g", "Builders", "/desc", "CI agents"]).await.0);
    assert!(!run(&mut manager, &["set", "/g", "Builders"]).await.0);
    assert!(run(&mut manager, &["rename", "/g", "Builders", "/n", "Agents"]).await.0);

    let (ok, out) = run(&mut manager, &["get", "--groupname", "agents"]).await;
    assert!(ok);
    let group = json(&out);
    assert_eq!(group["Name"], "Agents");
    assert_eq!(group["Description"], "CI agents");

    assert!(run(&mut manager, &["remove", "/g", "Agents"]).await.0);
    assert!(!run(&mut manager, &["get", "/g", "Agents"]).await.0);
}

#[tokio::test]
async fn test_join_without_group() {
    let (mut manager, provider) = setup().await;

    assert!(!run(&mut manager, &["join", "/u", "alice"]).await.0);
    assert_eq!(provider.writes().await.total(), 0);
}

#[tokio::test]
async fn test_unlock_and_checklogon() {
    let (mut manager, provider) = setup().await;
    assert!(run(&mut manager, &["changepassword", "/u", "alice", "/p", "s3cret"]).await.0);

    let (ok, out) = run(&mut manager, &["checklogon", "/u", "alice", "/p", "s3cret"]).await;
    assert!(ok);
    assert_eq!(out.trim(), "true");

    provider.set_locked("alice", true).await;
    let (ok, out) = run(&mut manager, &["checklogon", "/u", "alice", "/p", "s3cret"]).await;
    assert!(!ok);
    assert_eq!(out.trim(), "false");

    assert!(run(&mut manager, &["unlock", "/u", "alice"]).await.0);
    assert!(!run(&mut manager, &["unlock", "/u", "alice"]).await.0);
    assert!(run(&mut manager, &["checklogon", "/u", "alice", "/p", "s3cret"]).await.0);
}

#[tokio::test]
async fn test_factory_builds_manager() {
    localacct::init();

    let config = Config::new(ProviderType::Mock).with_admin_rejoin(false);
    let mut manager = AccountManager::from_config(config).unwrap();
    manager.init().await.unwrap();

    let (ok, out) = run(&mut manager, &["listuser"]).await;
    assert!(ok);
    assert_eq!(json(&out), Value::Array(Vec::new()));
    manager.close().await.unwrap();

    assert!(factory::new_provider(Config::new(ProviderType::Mock)).is_ok());
}
