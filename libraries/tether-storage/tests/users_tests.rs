
use test_helpers::{google_link, google_user, TestDb};
use tether_core::types::{NewUser, ProviderLink, UserId, UserUpdate};
use tether_core::{CoreError, UserStore};

#[tokio::test]
async fn test_create_and_get_user() {
    let db = TestDb::new().await;

    let created = db
        .store
        .create_user(google_user("Alice", "alice@example.com", "g1"))
        .await
        .expect("Failed to create user");

    let fetched = db
        .store
        .get_user(&created.id)
        .await
        .unwrap()
        .expect("User should exist");

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.name.as_deref(), Some("Alice"));
    assert_eq!(fetched.email.as_deref(), Some("alice@example.com"));
    assert_eq!(fetched.username, None);
    assert_eq!(fetched.providers, vec![google_link("g1")]);
    assert_eq!(fetched, created);
}

/// The user returned by create is exactly the user read back later
#[tokio::test]
async fn test_created_user_matches_stored_user() {
    let db = TestDb::new().await;

    let created = db
        .store
        .create_user(google_user("Alice", "alice@example.com", "g1"))
        .await
        .unwrap();

    let by_provider = db.store.find_by_provider("google", "g1").await.unwrap();
    assert_eq!(by_provider, Some(created.clone()));

    let listed = db.store.list_users().await.unwrap();
    assert_eq!(listed, vec![created]);
}

#[tokio::test]
async fn test_get_unknown_user_returns_none() {
    let db = TestDb::new().await;

    let user = db.store.get_user(&UserId::new("missing")).await.unwrap();
    assert!(user.is_none());
}

#[tokio::test]
async fn test_find_by_provider_matches_name_and_identifier() {
    let db = TestDb::new().await;

    let alice = db
        .store
        .create_user(google_user("Alice", "alice@example.com", "g1"))
        .await
        .unwrap();

    let found = db.store.find_by_provider("google", "g1").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(alice.id));

    assert!(db
        .store
        .find_by_provider("google", "g2")
        .await
        .unwrap()
        .is_none());
    assert!(db
        .store
        .find_by_provider("github", "g1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_same_identity_cannot_belong_to_two_users() {
    let db = TestDb::new().await;

    db.store
        .create_user(google_user("Alice", "alice@example.com", "g1"))
        .await
        .unwrap();

    let result = db
        .store
        .create_user(google_user("Mallory", "mallory@example.com", "g1"))
        .await;

    assert!(matches!(result, Err(CoreError::Duplicate(_))));
    assert_eq!(db.store.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_replaces_providers_and_clears_email() {
    let db = TestDb::new().await;

    let user = db
        .store
        .create_user(NewUser {
            name: Some("Bob".into()),
            username: Some("bob".into()),
            email: Some("bob@example.com".into()),
            providers: vec![google_link("g1"), ProviderLink::new("github", "gh1")],
        })
        .await
        .unwrap();

    let updated = db
        .store
        .update_user(&user.id, UserUpdate::default().providers(vec![]).clear_email())
        .await
        .unwrap();

    assert!(updated.providers.is_empty());
    assert_eq!(updated.email, None);
    assert_eq!(updated.username.as_deref(), Some("bob"));

    // The identity is free again once unlinked
    assert!(db
        .store
        .find_by_provider("google", "g1")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_update_preserves_provider_order() {
    let db = TestDb::new().await;

    let user = db
        .store
        .create_user(NewUser {
            providers: vec![ProviderLink::new("github", "gh1")],
            ..NewUser::default()
        })
        .await
        .unwrap();

    let providers = vec![ProviderLink::new("github", "gh1"), google_link("g7")];
    let updated = db
        .store
        .update_user(&user.id, UserUpdate::default().providers(providers.clone()))
        .await
        .unwrap();

    assert_eq!(updated.providers, providers);
}

#[tokio::test]
async fn test_update_without_email_leaves_it_untouched() {
    let db = TestDb::new().await;

    let user = db
        .store
        .create_user(google_user("Carol", "carol@example.com", "g3"))
        .await
        .unwrap();

    let updated = db
        .store
        .update_user(&user.id, UserUpdate::default().name("Caroline"))
        .await
        .unwrap();

    assert_eq!(updated.name.as_deref(), Some("Caroline"));
    assert_eq!(updated.email.as_deref(), Some("carol@example.com"));
    assert_eq!(updated.providers, vec![google_link("g3")]);
}

#[tokio::test]
async fn test_update_unknown_user() {
    let db = TestDb::new().await;

    let result = db
        .store
        .update_user(&UserId::new("missing"), UserUpdate::default().clear_email())
        .await;

    assert!(matches!(result, Err(CoreError::UserNotFound(_))));
}

#[tokio::test]
async fn test_list_users() {
    let db = TestDb::new().await;

    db.store
        .create_user(google_user("Alice", "alice@example.com", "g1"))
        .await
        .unwrap();
    db.store
        .create_user(google_user("Bob", "bob@example.com", "g2"))
        .await
        .unwrap();

    let users = db.store.list_users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.providers.len() == 1));
}
