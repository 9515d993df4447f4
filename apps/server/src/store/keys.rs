use sha2::{Digest, Sha256};

pub const CONFIG_PREFIX: &str = "config:";
pub const METADATA_PREFIX: &str = "metadata:";
pub const RATE_LIMIT_PREFIX: &str = "ratelimit:";

/// SHA256 hex of a form id, so arbitrary external ids make safe keys
pub fn hash_form_id(form_id: &str) -> String {
    hex::encode(Sha256::digest(form_id.as_bytes()))
}

pub fn config_key(form_id: &str) -> String {
    format!("{}{}", CONFIG_PREFIX, hash_form_id(form_id))
}

pub fn metadata_key(form_id: &str) -> String {
    format!("{}{}", METADATA_PREFIX, hash_form_id(form_id))
}

pub fn quota_key(version: &str, identity: &str) -> String {
    format!("{}{}:{}", RATE_LIMIT_PREFIX, version, identity)
}
