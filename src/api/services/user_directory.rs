//! Built-in user accounts for the login endpoint.
//!
//! A fixed directory until a real user store exists.

use serde::Serialize;
use utoipa::ToSchema;

/// An account that can log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserAccount {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub role: String,
}

struct DirectoryEntry {
    id: u64,
    username: &'static str,
    password: &'static str,
    email: &'static str,
    role: &'static str,
}

const ENTRIES: &[DirectoryEntry] = &[
    DirectoryEntry {
        id: 1,
        username: "admin",
        password: "admin123",
        email: "admin@example.com",
        role: "admin",
    },
    DirectoryEntry {
        id: 2,
        username: "user",
        password: "user123",
        email: "user@example.com",
        role: "user",
    },
];

#[derive(Debug, Clone, Copy, Default)]
pub struct UserDirectory;

impl UserDirectory {
    pub fn new() -> Self {
        Self
    }

    /// Check credentials, returning the account on a match.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<UserAccount> {
        ENTRIES
            .iter()
            .find(|entry| entry.username == username && entry.password == password)
            .map(|entry| UserAccount {
                id: entry.id,
                username: entry.username.to_string(),
                email: entry.email.to_string(),
                role: entry.role.to_string(),
            })
    }

    /// Look up an account by username, used when refreshing tokens.
    pub fn find(&self, username: &str) -> Option<UserAccount> {
        ENTRIES
            .iter()
            .find(|entry| entry.username == username)
            .map(|entry| UserAccount {
                id: entry.id,
                username: entry.username.to_string(),
                email: entry.email.to_string(),
                role: entry.role.to_string(),
            })
    }
}
