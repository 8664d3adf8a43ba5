//! Credential hashing.
//!
//! Student and admin passwords are stored as bcrypt hashes and never echoed
//! back. Both operations run on the blocking pool since bcrypt is deliberately slow.
use bcrypt::{hash, verify};
use thiserror::Error;
use tokio::task::spawn_blocking;

/// bcrypt ignores everything past 72 bytes.
pub const MAX_PASSWORD_LENGTH: usize = 72;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("hashing failed: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    let password = password.to_string();

    Ok(spawn_blocking(move || hash(password, cost)).await??)
}

/// `Ok(false)` on a wrong password. Malformed stored hashes are also treated
/// as a mismatch so a corrupted row can't be logged into.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let password = password.to_string();
    let stored_hash = stored_hash.to_string();

    let verified = spawn_blocking(move || verify(password, &stored_hash)).await?;

    Ok(verified.unwrap_or(false))
}
