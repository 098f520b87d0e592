use std::{fmt::Display, ops::Deref};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Parts for a key that only needs its prefix.
pub const NO_PARTS: &[()] = &[];

/// A store key of the form `<prefix>:<hex sha256 of the serialized parts>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

/// Derives a deterministic key from a readable prefix and the values that
/// discriminate one cached result from another (filters, pagination, ids).
///
/// `parts` is usually a slice or a tuple; both serialize to the same JSON
/// array, so element order matters. Object fields, struct fields included,
/// are hashed in sorted key order. Fails only for values JSON cannot
/// represent, such as maps with non-string keys.
///
/// ```
/// use serde_json::json;
///
/// let key = cache::derive_key("course:list", &(json!({ "level": 2 }), 1)).unwrap();
/// assert!(key.starts_with("course:list:"));
/// ```
pub fn derive_key<P: Serialize + ?Sized>(
    prefix: &str,
    parts: &P,
) -> Result<CacheKey, serde_json::Error> {
    // through `Value` so object keys come out sorted
    let canonical = serde_json::to_value(parts)?.to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(CacheKey(format!("{}:{}", prefix, hex::encode(digest))))
}

impl CacheKey {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.0
            .rsplit_once(':')
            .map(|(prefix, _)| prefix)
            .unwrap_or(&self.0)
    }
}

impl Deref for CacheKey {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for CacheKey {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
