//! Backend identifiers and run selection.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::BitOr;

use clap::ValueEnum;

/// One data store under benchmark.
///
/// Declaration order is the fixed order in which a run visits backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum BackendKind {
    /// Document store (MongoDB).
    #[value(name = "document", alias = "doc")]
    DocumentStore,
    /// Key-value store (Redis).
    #[value(name = "kv", alias = "redis")]
    KeyValueStore,
    /// Relational store (PostgreSQL).
    #[value(name = "relational", alias = "postgres")]
    Relational,
    /// Embedded native key-value engine (sled).
    #[value(name = "native-kv", alias = "sled")]
    NativeKv,
    /// SQL-over-KV overlay (RediSQL).
    #[value(name = "sql-overlay", alias = "redisql")]
    SqlOverlay,
}

impl BackendKind {
    /// Every backend, in run order.
    pub const ALL: [BackendKind; 5] = [
        BackendKind::DocumentStore,
        BackendKind::KeyValueStore,
        BackendKind::Relational,
        BackendKind::NativeKv,
        BackendKind::SqlOverlay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::DocumentStore => "DocumentStore",
            BackendKind::KeyValueStore => "KeyValueStore",
            BackendKind::Relational => "Relational",
            BackendKind::NativeKv => "NativeKV",
            BackendKind::SqlOverlay => "SqlOverlay",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The set of backends taking part in a run. The empty set is a valid no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSet {
    kinds: BTreeSet<BackendKind>,
}

impl BackendSet {
    /// Create an empty selection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Select every backend.
    pub fn all() -> Self {
        BackendKind::ALL.into_iter().collect()
    }

    /// Select a single backend.
    pub fn only(kind: BackendKind) -> Self {
        Self::empty().with(kind)
    }

    /// Add a backend (builder form).
    pub fn with(mut self, kind: BackendKind) -> Self {
        self.kinds.insert(kind);
        self
    }

    pub fn insert(&mut self, kind: BackendKind) -> bool {
        self.kinds.insert(kind)
    }

    pub fn remove(&mut self, kind: BackendKind) -> bool {
        self.kinds.remove(&kind)
    }

    /// Union of two selections.
    pub fn union(&self, other: &BackendSet) -> BackendSet {
        self.kinds.union(&other.kinds).copied().collect()
    }

    /// Membership test. Absence means "skip", never an error.
    pub fn is_selected(&self, kind: BackendKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Selected backends in run order, independent of insertion order.
    pub fn iter(&self) -> impl Iterator<Item = BackendKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl FromIterator<BackendKind> for BackendSet {
    fn from_iter<I: IntoIterator<Item = BackendKind>>(iter: I) -> Self {
        Self {
            kinds: iter.into_iter().collect(),
        }
    }
}

impl Extend<BackendKind> for BackendSet {
    fn extend<I: IntoIterator<Item = BackendKind>>(&mut self, iter: I) {
        self.kinds.extend(iter);
    }
}

impl BitOr for BackendSet {
    type Output = BackendSet;

    fn bitor(self, rhs: BackendSet) -> BackendSet {
        self.union(&rhs)
    }
}

impl BitOr<BackendKind> for BackendSet {
    type Output = BackendSet;

    fn bitor(self, rhs: BackendKind) -> BackendSet {
        self.with(rhs)
    }
}

impl fmt::Display for BackendSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<_> = self.iter().map(|k| k.name()).collect();
        f.write_str(&names.join(", "))
    }
}
