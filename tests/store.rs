use axum_typed_sessions::{MemoryStore, SessionId, SessionService, SessionStore, StoreError};
use serde::{Deserialize, Serialize};

#[tokio::test]
async fn load_of_missing_entry_is_not_found() {
    let store = MemoryStore::new();

    let err = store.load(&SessionId::from("nope")).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[tokio::test]
async fn create_overwrites_an_existing_entry() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let id = SessionId::from("id");

    store.create(&id, b"first".to_vec()).await?;
    store.create(&id, b"second".to_vec()).await?;

    assert_eq!(store.load(&id).await?, b"second");
    assert_eq!(store.len().await, 1);

    Ok(())
}

#[tokio::test]
async fn save_is_an_upsert() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let id = SessionId::from("never-created");

    store.save(&id, b"payload".to_vec()).await?;
    assert_eq!(store.load(&id).await?, b"payload");

    store.save(&id, b"replaced".to_vec()).await?;
    assert_eq!(store.load(&id).await?, b"replaced");

    Ok(())
}

#[tokio::test]
async fn delete_is_idempotent() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let id = SessionId::from("id");

    store.create(&id, b"payload".to_vec()).await?;
    store.delete(&id).await?;
    store.delete(&id).await?;

    assert!(matches!(
        store.load(&id).await.unwrap_err(),
        StoreError::NotFound
    ));
    assert!(store.is_empty().await);

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Cart {
    items: Vec<String>,
}

// The store deals in serialized bytes only, so one handle can back
// services with different payload types without entries interfering.
#[tokio::test]
async fn one_store_backs_services_of_different_payload_types() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let users = SessionService::builder()
        .store(store.clone())
        .build::<User>();
    let carts = SessionService::builder()
        .store(store.clone())
        .build::<Cart>();

    let user = users
        .create_session(User {
            name: "admin".into(),
        })
        .await?;
    let cart = carts
        .create_session(Cart {
            items: vec!["book".into()],
        })
        .await?;

    assert_eq!(store.len().await, 2);

    let mut user_session = users.resume(user.id());
    users.load_session(&mut user_session).await?;
    assert_eq!(user_session.payload().unwrap().name, "admin");

    let mut cart_session = carts.resume(cart.id());
    carts.load_session(&mut cart_session).await?;
    assert_eq!(cart_session.payload().unwrap().items, vec!["book"]);

    Ok(())
}
