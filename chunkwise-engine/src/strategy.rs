//! Container strategy trait and closure-built custom strategies
//!
//! A strategy makes one container kind chunkable: it decides which field
//! signatures it owns, reports a container's length, extracts a bounded
//! window, builds an empty instance, and appends one container onto another.
//!
//! Strategies are registered once on a [`RegistryBuilder`](crate::RegistryBuilder)
//! and are read-only afterwards, so implementations must not keep per-call
//! mutable state.

use crate::descriptor::FieldDescriptor;
use chunkwise_model::{ChunkError, Result, TypeSignature};
use serde_json::Value;
use std::fmt;

/// Container kind handled by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Growable ordered sequence (`Vec<T>`, `List<T>`)
    Sequence,
    /// Ordered collection wrapper (`VecDeque<T>`, `LinkedList<T>`, `Collection<T>`)
    Collection,
    /// Key-value map (`HashMap<K, V>`, `BTreeMap<K, V>`, `Dictionary<K, V>`)
    Map,
    /// Fixed array or slice (`[T; N]`, `[T]`, `Box<[T]>`, `T[]`)
    Array,
    /// Set of unique elements (`HashSet<T>`, `BTreeSet<T>`, `SortedSet<T>`)
    Set,
    /// Caller-registered strategy
    Custom,
}

impl ContainerKind {
    /// Built-in kinds in resolution precedence order
    pub const BUILTIN: [ContainerKind; 5] = [
        ContainerKind::Sequence,
        ContainerKind::Collection,
        ContainerKind::Map,
        ContainerKind::Array,
        ContainerKind::Set,
    ];

    /// Whether this kind claims the signature. Nullability is ignored:
    /// `Option<Vec<T>>` matches exactly like `Vec<T>`.
    pub fn matches(&self, signature: &TypeSignature) -> bool {
        match self {
            ContainerKind::Sequence => generic_one_of(signature, &["Vec", "List"], 1),
            ContainerKind::Collection => {
                generic_one_of(signature, &["VecDeque", "LinkedList", "Collection"], 1)
            }
            ContainerKind::Map => generic_one_of(
                signature,
                &[
                    "HashMap",
                    "BTreeMap",
                    "IndexMap",
                    "AHashMap",
                    "Dictionary",
                    "SortedDictionary",
                    "Map",
                ],
                2,
            ),
            ContainerKind::Array => {
                signature.is_array()
                    || (generic_one_of(signature, &["Box", "Rc", "Arc"], 1)
                        && signature.args()[0].is_array())
            }
            ContainerKind::Set => generic_one_of(
                signature,
                &["HashSet", "BTreeSet", "IndexSet", "AHashSet", "SortedSet"],
                1,
            ),
            ContainerKind::Custom => false,
        }
    }

    /// Stable lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerKind::Sequence => "sequence",
            ContainerKind::Collection => "collection",
            ContainerKind::Map => "map",
            ContainerKind::Array => "array",
            ContainerKind::Set => "set",
            ContainerKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn generic_one_of(signature: &TypeSignature, names: &[&str], arity: usize) -> bool {
    signature.args().len() == arity && names.iter().any(|name| signature.is_generic(name))
}

/// Operations that make one container kind chunkable and mergeable
pub trait ContainerStrategy: Send + Sync {
    /// Unique strategy name
    fn name(&self) -> &str;

    /// Container kind (custom strategies keep the default)
    fn kind(&self) -> ContainerKind {
        ContainerKind::Custom
    }

    /// Whether this strategy owns fields declared with `signature`
    fn matches(&self, signature: &TypeSignature) -> bool;

    /// Number of elements in a non-null container value.
    ///
    /// This is also the shape check: a value the strategy cannot operate on
    /// must be rejected here, because [`slice`](Self::slice) is infallible.
    fn length(&self, field: &FieldDescriptor, value: &Value) -> Result<usize>;

    /// Elements `[start, start + count)` of a value accepted by `length`.
    /// Windows past the end yield an empty container.
    fn slice(&self, value: &Value, start: usize, count: usize) -> Value;

    /// Empty container used to start a merge
    fn empty_instance(&self, field: &FieldDescriptor) -> Value;

    /// Append the contents of `source` onto `target`, preserving order
    fn merge_append(&self, field: &FieldDescriptor, target: &mut Value, source: &Value)
        -> Result<()>;

    /// Normalize a merged container once every chunk has been appended.
    ///
    /// Called once per merge on each non-null container field, so work that
    /// spans all chunks (such as set deduplication) stays linear.
    fn finish_merge(&self, _field: &FieldDescriptor, _target: &mut Value) -> Result<()> {
        Ok(())
    }
}

type Matcher = Box<dyn Fn(&TypeSignature) -> bool + Send + Sync>;
type LengthFn = Box<dyn Fn(&Value) -> Option<usize> + Send + Sync>;
type SliceFn = Box<dyn Fn(&Value, usize, usize) -> Value + Send + Sync>;
type EmptyFn = Box<dyn Fn(&TypeSignature) -> Value + Send + Sync>;
type MergeFn = Box<dyn Fn(&mut Value, &Value) -> Result<()> + Send + Sync>;

/// Strategy assembled from closures
///
/// `length` returns `None` for values the strategy cannot handle; the engine
/// turns that into [`ChunkError::ValueShape`].
pub struct FnStrategy {
    name: String,
    matcher: Matcher,
    length: LengthFn,
    slice: SliceFn,
    empty_instance: EmptyFn,
    merge_append: MergeFn,
}

impl FnStrategy {
    /// Build a strategy from its six operations
    pub fn new<M, L, S, E, A>(
        name: impl Into<String>,
        matcher: M,
        length: L,
        slice: S,
        empty_instance: E,
        merge_append: A,
    ) -> Self
    where
        M: Fn(&TypeSignature) -> bool + Send + Sync + 'static,
        L: Fn(&Value) -> Option<usize> + Send + Sync + 'static,
        S: Fn(&Value, usize, usize) -> Value + Send + Sync + 'static,
        E: Fn(&TypeSignature) -> Value + Send + Sync + 'static,
        A: Fn(&mut Value, &Value) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matcher: Box::new(matcher),
            length: Box::new(length),
            slice: Box::new(slice),
            empty_instance: Box::new(empty_instance),
            merge_append: Box::new(merge_append),
        }
    }
}

impl fmt::Debug for FnStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ContainerStrategy for FnStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, signature: &TypeSignature) -> bool {
        (self.matcher)(signature)
    }

    fn length(&self, field: &FieldDescriptor, value: &Value) -> Result<usize> {
        (self.length)(value).ok_or_else(|| {
            ChunkError::value_shape(field.name(), &self.name, &format!("{} container", self.name), value)
        })
    }

    fn slice(&self, value: &Value, start: usize, count: usize) -> Value {
        (self.slice)(value, start, count)
    }

    fn empty_instance(&self, field: &FieldDescriptor) -> Value {
        (self.empty_instance)(field.signature())
    }

    fn merge_append(
        &self,
        _field: &FieldDescriptor,
        target: &mut Value,
        source: &Value,
    ) -> Result<()> {
        (self.merge_append)(target, source)
    }
}
