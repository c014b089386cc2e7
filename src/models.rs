//! Persistence models: users and their tasks.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A registered account.
///
/// Created at registration, read at login and session restore. Accounts are
/// never updated or deleted.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: PasswordHash,
}

/// A dated task owned by exactly one user.
///
/// The owner never changes; all reads and mutations are scoped to
/// `(id, user_id)` at the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub deadline_date: NaiveDate,
    pub done: bool,
}

/// PBKDF2 iteration count for newly created hashes.
const PBKDF2_ITERATIONS: u32 = 100_000;

/// Scheme tag stored alongside each hash so the format can evolve.
const SCHEME: &str = "pbkdf2-sha256";

/// A PBKDF2-HMAC-SHA256 password hash.
///
/// Serialized as `pbkdf2-sha256$<iterations>$<hex salt>$<hex digest>`.
/// Verification recomputes the digest with the stored salt and iteration
/// count and compares in constant time. A malformed stored value never
/// verifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a plaintext password with a fresh random salt.
    pub fn new(plaintext: &str) -> Self {
        use rand::RngCore;

        let mut salt = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = derive(plaintext, &salt, PBKDF2_ITERATIONS);
        Self(format!(
            "{SCHEME}${PBKDF2_ITERATIONS}${}${}",
            hex::encode(salt),
            hex::encode(digest)
        ))
    }

    /// Wrap a hash string loaded from storage.
    pub fn from_stored(stored: String) -> Self {
        Self(stored)
    }

    /// The serialized form, as persisted.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a plaintext password against this hash.
    pub fn check(&self, plaintext: &str) -> bool {
        let mut parts = self.0.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(digest), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };
        if scheme != SCHEME {
            return false;
        }
        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        let Ok(salt) = hex::decode(salt) else {
            return false;
        };
        let Ok(digest) = hex::decode(digest) else {
            return false;
        };
        let derived = derive(plaintext, &salt, iterations);
        constant_time_eq(&derived, &digest)
    }
}

fn derive(plaintext: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut out = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(plaintext.as_bytes(), salt, iterations, &mut out);
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
