mod common;

use chrono::{DateTime, Utc};
use common::{User, store};
use docrepo::prelude::*;
use serde::{Deserialize, Serialize};

#[tokio::test]
async fn configure_indexes_creates_declared_intents() {
    let store = store();
    let users = store.repository::<User>();

    users.configure_indexes().await.unwrap();

    let records = store.backend().list_indexes("users").await.unwrap();
    assert!(records.contains(&IndexRecord::new("email_1", true)));
}

#[tokio::test]
async fn reconverging_is_idempotent() {
    let store = store();
    let users = store.repository::<User>();

    users.configure_indexes().await.unwrap();
    let first = store.backend().list_indexes("users").await.unwrap();

    users.configure_indexes().await.unwrap();
    let second = store.backend().list_indexes("users").await.unwrap();

    assert_eq!(first, second);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Subscriber {
    id: DocumentId,
    email: String,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Document for Subscriber {
    fn id(&self) -> &DocumentId {
        &self.id
    }

    fn set_id(&mut self, id: DocumentId) {
        self.id = id;
    }

    fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn set_updated_at(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }

    fn collection_name() -> &'static str {
        "users"
    }

    fn indexes() -> Vec<IndexIntent> {
        // Same field as User's declaration, uniqueness relaxed.
        vec![IndexIntent::plain("email")]
    }
}

#[tokio::test]
async fn uniqueness_change_replaces_the_index() {
    let store = store();

    store
        .repository::<User>()
        .configure_indexes()
        .await
        .unwrap();
    let before = store.backend().list_indexes("users").await.unwrap();
    assert!(before.contains(&IndexRecord::new("email_1", true)));

    store
        .repository::<Subscriber>()
        .configure_indexes()
        .await
        .unwrap();
    let after = store.backend().list_indexes("users").await.unwrap();

    assert!(after.contains(&IndexRecord::new("email_1", false)));
    assert!(!after.contains(&IndexRecord::new("email_1", true)));
}

#[tokio::test]
async fn unmatched_live_indexes_are_dropped() {
    let store = store();
    store
        .backend()
        .create_index("users", "legacy", false)
        .await
        .unwrap();

    store
        .repository::<User>()
        .configure_indexes()
        .await
        .unwrap();

    let records = store.backend().list_indexes("users").await.unwrap();
    assert!(!records.iter().any(|r| r.name == "legacy_1"));
    assert!(records.contains(&IndexRecord::new("email_1", true)));
}
