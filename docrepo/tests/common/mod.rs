#![allow(dead_code)]

use chrono::{DateTime, Utc};
use docrepo::memory::MemoryStore;
use docrepo::prelude::*;
use serde::{Deserialize, Serialize};

pub fn store() -> DocumentStore<MemoryStore> {
    DocumentStore::new(MemoryStore::new())
}

/// Basic fixture with random identity and a unique email index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: DocumentId,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(name: &str, email: &str, age: i64) -> Self {
        Self {
            id: DocumentId::empty(),
            name: name.to_string(),
            email: email.to_string(),
            age,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Document for User {
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
        vec![IndexIntent::unique("email")]
    }
}

/// Fixture whose identity derives from a natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: DocumentId,
    pub code: String,
    pub balance: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(code: &str, balance: i64) -> Self {
        Self {
            id: DocumentId::empty(),
            code: code.to_string(),
            balance,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Document for Account {
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
        "accounts"
    }

    fn alternate_key(&self) -> Option<String> {
        Some(self.code.clone())
    }
}
