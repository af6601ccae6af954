use std::fmt;

/// A cache key of the form `<domain>:sku:<sku>`.
///
/// ```
/// use storefront_cache::CacheKey;
///
/// let key = CacheKey::for_sku("price", 12345);
/// assert_eq!(key.as_str(), "price:sku:12345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_sku(domain: &str, sku: impl fmt::Display) -> Self {
        CacheKey(format!("{domain}:sku:{sku}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
