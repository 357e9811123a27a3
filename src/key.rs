use crate::error::CacheError;
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::fmt;
use std::path::{Path, PathBuf};

/// The closed set of key representations a cached store accepts.
///
/// Build-tool caches are keyed by file paths, content names or numeric ids; nothing else is
/// hashed stably enough to be shared between the in-memory layer and the store on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CacheKey {
    Text(String),
    Integer(i64),
    Path(PathBuf),
}

impl CacheKey {
    /// Validated construction for callers that only hold a dynamically typed key.
    ///
    /// Accepts `String`, `&'static str`, the primitive integers that fit in an `i64`, `PathBuf`
    /// and `CacheKey` itself. Anything else is a contract violation.
    pub fn from_any<T: Any>(key: &T) -> Result<CacheKey, CacheError> {
        let key = key as &dyn Any;

        if let Some(text) = key.downcast_ref::<String>() {
            return Ok(CacheKey::Text(text.clone()));
        }
        if let Some(text) = key.downcast_ref::<&'static str>() {
            return Ok(CacheKey::Text((*text).to_owned()));
        }
        if let Some(path) = key.downcast_ref::<PathBuf>() {
            return Ok(CacheKey::Path(path.clone()));
        }
        if let Some(value) = key.downcast_ref::<i64>() {
            return Ok(CacheKey::Integer(*value));
        }
        if let Some(value) = key.downcast_ref::<i32>() {
            return Ok(CacheKey::Integer(i64::from(*value)));
        }
        if let Some(value) = key.downcast_ref::<u32>() {
            return Ok(CacheKey::Integer(i64::from(*value)));
        }
        if let Some(cache_key) = key.downcast_ref::<CacheKey>() {
            return Ok(cache_key.clone());
        }

        Err(CacheError::UnsupportedKey {
            type_name: type_name::<T>(),
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Text(text) => write!(f, "{text}"),
            CacheKey::Integer(value) => write!(f, "{value}"),
            CacheKey::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey::Text(value)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        CacheKey::Text(value.to_owned())
    }
}

impl From<i64> for CacheKey {
    fn from(value: i64) -> Self {
        CacheKey::Integer(value)
    }
}

impl From<i32> for CacheKey {
    fn from(value: i32) -> Self {
        CacheKey::Integer(i64::from(value))
    }
}

impl From<u32> for CacheKey {
    fn from(value: u32) -> Self {
        CacheKey::Integer(i64::from(value))
    }
}

impl From<PathBuf> for CacheKey {
    fn from(value: PathBuf) -> Self {
        CacheKey::Path(value)
    }
}

impl From<&Path> for CacheKey {
    fn from(value: &Path) -> Self {
        CacheKey::Path(value.to_path_buf())
    }
}

impl From<&CacheKey> for CacheKey {
    fn from(value: &CacheKey) -> Self {
        value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_supported_dynamic_keys() {
        assert_eq!(
            CacheKey::from_any(&String::from("a.txt")).unwrap(),
            CacheKey::Text("a.txt".into())
        );
        assert_eq!(CacheKey::from_any(&"b").unwrap(), CacheKey::Text("b".into()));
        assert_eq!(CacheKey::from_any(&42i64).unwrap(), CacheKey::Integer(42));
        assert_eq!(CacheKey::from_any(&7u32).unwrap(), CacheKey::Integer(7));
        assert_eq!(
            CacheKey::from_any(&PathBuf::from("/tmp/x")).unwrap(),
            CacheKey::Path("/tmp/x".into())
        );
    }

    #[test]
    fn rejects_unsupported_dynamic_keys() {
        let err = CacheKey::from_any(&3.5f64).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedKey { type_name: "f64" }));

        let err = CacheKey::from_any(&vec![1u8, 2]).unwrap_err();
        assert!(matches!(err, CacheError::UnsupportedKey { .. }));
    }

    #[test]
    fn path_and_text_keys_are_distinct() {
        assert_ne!(CacheKey::from("a"), CacheKey::from(Path::new("a")));
    }
}
