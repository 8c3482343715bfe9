//! Resolved record type and field descriptors

use crate::strategy::ContainerStrategy;
use ahash::AHashMap;
use chunkwise_model::{RecordSchema, TypeSignature};
use std::fmt;
use std::sync::Arc;

/// Reference to a registered strategy
#[derive(Clone)]
pub struct StrategyHandle {
    index: usize,
    strategy: Arc<dyn ContainerStrategy>,
}

impl StrategyHandle {
    pub(crate) fn new(index: usize, strategy: Arc<dyn ContainerStrategy>) -> Self {
        Self { index, strategy }
    }

    /// Position in the registry's precedence list
    pub fn index(&self) -> usize {
        self.index
    }

    /// Strategy name
    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// The strategy itself
    pub fn strategy(&self) -> &dyn ContainerStrategy {
        self.strategy.as_ref()
    }
}

impl fmt::Debug for StrategyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyHandle")
            .field("index", &self.index)
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for StrategyHandle {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.name() == other.name()
    }
}

impl Eq for StrategyHandle {}

/// How a field takes part in chunking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Copied verbatim into every chunk, last write wins on merge
    Scalar,
    /// Sliced per chunk and appended on merge
    Container(StrategyHandle),
}

/// Resolved field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    signature: TypeSignature,
    kind: FieldKind,
}

impl FieldDescriptor {
    /// Create a descriptor
    pub fn new(name: impl Into<String>, signature: TypeSignature, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            signature,
            kind,
        }
    }

    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared signature
    pub fn signature(&self) -> &TypeSignature {
        &self.signature
    }

    /// Resolved kind
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Strategy handle for container fields
    pub fn strategy(&self) -> Option<&StrategyHandle> {
        match &self.kind {
            FieldKind::Container(handle) => Some(handle),
            FieldKind::Scalar => None,
        }
    }

    /// Whether the field is chunked
    pub fn is_container(&self) -> bool {
        matches!(self.kind, FieldKind::Container(_))
    }
}

/// Resolved record type: fields in declaration order, each with its kind
#[derive(Debug, Clone)]
pub struct RecordType {
    name: String,
    fields: Vec<FieldDescriptor>,
    positions: AHashMap<String, usize>,
}

impl RecordType {
    pub(crate) fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        let positions = fields
            .iter()
            .enumerate()
            .map(|(idx, field)| (field.name.clone(), idx))
            .collect();
        Self {
            name: name.into(),
            fields,
            positions,
        }
    }

    /// Record type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the type declares no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.position(name).map(|idx| &self.fields[idx])
    }

    /// Declaration index of a field
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Fields resolved to a strategy
    pub fn container_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.is_container())
    }

    /// The unresolved schema this type was built from
    pub fn schema(&self) -> RecordSchema {
        self.fields
            .iter()
            .fold(RecordSchema::new(self.name.clone()), |schema, field| {
                schema.with_field(field.name.clone(), field.signature.to_string())
            })
    }
}

/// Same type: identical instance, or same name and field layout
pub(crate) fn same_type(a: &Arc<RecordType>, b: &Arc<RecordType>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for RecordType {}
