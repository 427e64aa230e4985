use sha2::{Digest, Sha256};

use crate::types::CourierId;

pub const PROFILE_KEY_PREFIX: &str = "profiles-";

/// Cache key of a single courier profile: hex encoded SHA-256 of `profiles-<id>`.
pub fn cache_key(id: CourierId) -> String {
    let digest = Sha256::digest(format!("{PROFILE_KEY_PREFIX}{id}").as_bytes());
    hex::encode(digest)
}
