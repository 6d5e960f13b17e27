//! Namespaced identifiers for vertex types, relation types and properties.

use std::{fmt, sync::Arc};

/// A `(namespace, local name)` pair used as the key for every vocabulary item.
///
/// The namespace may be empty, in which case the name is *unqualified* and
/// renders as just its local part.
///
/// # Examples
/// ```
/// use graphgen_core::QualifiedName;
///
/// let thing = QualifiedName::parse("core.Thing");
/// assert_eq!(thing.namespace(), "core");
/// assert_eq!(thing.local_name(), "Thing");
/// assert_eq!(thing.to_string(), "core.Thing");
///
/// let monkey = QualifiedName::parse("Monkey");
/// assert!(!monkey.is_qualified());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QualifiedName {
    namespace: Arc<str>,
    local_name: Arc<str>,
}

impl QualifiedName {
    /// Builds a name from explicit parts.
    #[must_use]
    pub fn new(namespace: impl AsRef<str>, local_name: impl AsRef<str>) -> Self {
        Self {
            namespace: Arc::from(namespace.as_ref()),
            local_name: Arc::from(local_name.as_ref()),
        }
    }

    /// Builds a name with an empty namespace.
    #[must_use]
    pub fn unqualified(local_name: impl AsRef<str>) -> Self {
        Self::new("", local_name)
    }

    /// Parses `namespace.local`, splitting at the last dot.
    ///
    /// A string without a dot yields an unqualified name.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.rsplit_once('.') {
            Some((namespace, local_name)) => Self::new(namespace, local_name),
            None => Self::unqualified(raw),
        }
    }

    /// Returns the namespace, which is empty for unqualified names.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Returns whether the name carries a namespace.
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Returns this name placed in `namespace` when it has none of its own.
    #[must_use]
    pub fn in_namespace(&self, namespace: &str) -> Self {
        if self.is_qualified() {
            self.clone()
        } else {
            Self::new(namespace, &*self.local_name)
        }
    }

    pub(crate) fn to_arc(&self) -> Arc<str> {
        Arc::from(self.to_string())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_qualified() {
            write!(f, "{}.{}", self.namespace, self.local_name)
        } else {
            f.write_str(&self.local_name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}
