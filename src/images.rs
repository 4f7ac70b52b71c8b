//! Image references and the ordered sets a slideshow cycles through.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

/// Opaque reference to one image, usually a URL or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef(Arc<str>);

impl ImageRef {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this reference must be fetched over HTTP rather than read from disk.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageRef {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ImageRef {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<'de> Deserialize<'de> for ImageRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Immutable, ordered set of images owned by one slideshow instance.
///
/// Clones share identity with the original; two sets built separately are
/// distinct identities even when their contents match. Schedulers and the
/// preload coordinator key their lifecycle off that identity.
#[derive(Clone)]
pub struct ImageSet {
    items: Arc<[ImageRef]>,
}

impl ImageSet {
    pub fn new(items: Vec<ImageRef>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// A set with no images. Slideshows over it render nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of images contained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the set is too small to ever transition.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.items.len() <= 1
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ImageRef> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageRef> {
        self.items.iter()
    }

    /// True when both handles refer to the same set instance.
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl fmt::Debug for ImageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Into<ImageRef>> FromIterator<T> for ImageSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a ImageSet {
    type Item = &'a ImageRef;
    type IntoIter = std::slice::Iter<'a, ImageRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
