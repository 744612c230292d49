//! Composite cache key for a workload's replica record.

use std::fmt;

/// Separator placed between namespace and workload name.
pub const KEY_SEPARATOR: char = '-';

/// Cache-store key for a (namespace, workload) pair, encoded `"<namespace>-<name>"`.
///
/// The separator is not escaped. Namespace `a-b` with workload `c` and
/// namespace `a` with workload `b-c` both encode to `a-b-c` and share a record.
/// Other processes read the store with this exact encoding, so the collision is
/// kept rather than changing the format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadKey {
    inner: String,
}

impl WorkloadKey {
    pub fn new(namespace: &str, name: &str) -> Self {
        let mut inner = String::with_capacity(namespace.len() + name.len() + 1);
        inner.push_str(namespace);
        inner.push(KEY_SEPARATOR);
        inner.push_str(name);
        Self { inner }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.inner.as_bytes()
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl AsRef<str> for WorkloadKey {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}
