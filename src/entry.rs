/// What the in-memory layer knows about one key.
///
/// `Absent` is a remembered negative answer from the store, which is different from having no
/// entry at all: a key without an entry has never been looked up since the last invalidation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CacheEntry<Value> {
    Absent,
    Present(Value),
}

impl<Value> CacheEntry<Value> {
    pub fn value(&self) -> Option<&Value> {
        match self {
            CacheEntry::Absent => None,
            CacheEntry::Present(value) => Some(value),
        }
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            CacheEntry::Absent => None,
            CacheEntry::Present(value) => Some(value),
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, CacheEntry::Present(_))
    }
}

impl<Value> From<Option<Value>> for CacheEntry<Value> {
    fn from(value: Option<Value>) -> Self {
        match value {
            None => CacheEntry::Absent,
            Some(value) => CacheEntry::Present(value),
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum CacheLookup<Value> {
    /// Answered from memory, the store was not consulted.
    Hit(Option<Value>),

    /// No entry in memory, the store was queried and its answer recorded.
    Miss(Option<Value>),
}

impl<Value> CacheLookup<Value> {
    pub fn into_value(self) -> Option<Value> {
        match self {
            CacheLookup::Hit(value) | CacheLookup::Miss(value) => value,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}
