//! Strategy registry
//!
//! The registry is an explicit precedence list of container strategies plus
//! the record types resolved against it. It is assembled once through
//! [`RegistryBuilder`] and is immutable afterwards, so a built registry can be
//! shared freely across threads.
//!
//! Resolution is first-match-wins over the precedence list. Built-ins come in
//! this order: `sequence`, `collection`, `map`, `array`, `set`. Custom
//! strategies are appended after them with
//! [`register_strategy`](RegistryBuilder::register_strategy) or placed in front
//! with [`register_strategy_first`](RegistryBuilder::register_strategy_first).

use crate::builtin::builtin_strategies;
use crate::chunk::{chunk, ChunkSequence};
use crate::descriptor::{FieldDescriptor, FieldKind, RecordType, StrategyHandle};
use crate::merge::{merge_chunks, merge_into};
use crate::record::Record;
use crate::strategy::{ContainerStrategy, FnStrategy};
use crate::UnknownContainerPolicy;
use ahash::AHashMap;
use chunkwise_model::{ChunkError, RecordSchema, Result, TypeSignature};
use serde_json::Value;
use std::borrow::Borrow;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Builder collecting strategies and record schemas before resolution
pub struct RegistryBuilder {
    strategies: Vec<Arc<dyn ContainerStrategy>>,
    schemas: Vec<RecordSchema>,
    policy: UnknownContainerPolicy,
}

impl RegistryBuilder {
    /// Builder preloaded with the built-in strategies
    pub fn new() -> Self {
        Self {
            strategies: builtin_strategies().into_iter().map(Arc::from).collect(),
            schemas: Vec::new(),
            policy: UnknownContainerPolicy::default(),
        }
    }

    /// Builder with no strategies at all
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
            schemas: Vec::new(),
            policy: UnknownContainerPolicy::default(),
        }
    }

    /// Append a strategy at the lowest precedence
    pub fn register_strategy(mut self, strategy: impl ContainerStrategy + 'static) -> Self {
        self.strategies.push(Arc::new(strategy));
        self
    }

    /// Insert a strategy at the highest precedence
    pub fn register_strategy_first(mut self, strategy: impl ContainerStrategy + 'static) -> Self {
        self.strategies.insert(0, Arc::new(strategy));
        self
    }

    /// Append a strategy assembled from closures; see [`FnStrategy::new`]
    pub fn register_fn<M, L, S, E, A>(
        self,
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
        self.register_strategy(FnStrategy::new(
            name,
            matcher,
            length,
            slice,
            empty_instance,
            merge_append,
        ))
    }

    /// Add a record schema to resolve at build time
    pub fn record_type(mut self, schema: RecordSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Policy for container-looking fields no strategy matches
    pub fn unknown_containers(mut self, policy: UnknownContainerPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Freeze the strategy list and resolve every registered schema
    pub fn build(self) -> Result<Registry> {
        let mut names: Vec<&str> = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            if names.contains(&strategy.name()) {
                return Err(ChunkError::Registry(format!(
                    "strategy '{}' is already registered",
                    strategy.name()
                )));
            }
            names.push(strategy.name());
        }

        let mut registry = Registry {
            strategies: self.strategies,
            record_types: AHashMap::new(),
            policy: self.policy,
        };

        for schema in &self.schemas {
            if registry.record_types.contains_key(&schema.name) {
                return Err(ChunkError::Registry(format!(
                    "record type '{}' is already registered",
                    schema.name
                )));
            }
            let record_type = registry.describe(schema)?;
            registry
                .record_types
                .insert(schema.name.clone(), record_type);
        }

        debug!(
            strategies = registry.strategies.len(),
            record_types = registry.record_types.len(),
            policy = ?registry.policy,
            "strategy registry built"
        );

        Ok(registry)
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable strategy registry with resolved record types
pub struct Registry {
    strategies: Vec<Arc<dyn ContainerStrategy>>,
    record_types: AHashMap<String, Arc<RecordType>>,
    policy: UnknownContainerPolicy,
}

impl Registry {
    /// Start building a registry preloaded with the built-ins
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with only the built-in strategies and no record types
    pub fn with_builtins() -> Self {
        Self {
            strategies: builtin_strategies().into_iter().map(Arc::from).collect(),
            record_types: AHashMap::new(),
            policy: UnknownContainerPolicy::default(),
        }
    }

    /// First strategy matching the signature
    pub fn resolve(&self, signature: &TypeSignature) -> Option<StrategyHandle> {
        self.strategies
            .iter()
            .enumerate()
            .find(|(_, strategy)| strategy.matches(signature))
            .map(|(index, strategy)| StrategyHandle::new(index, Arc::clone(strategy)))
    }

    /// Strategy names in precedence order
    pub fn strategies(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|strategy| strategy.name())
    }

    /// Policy applied to unmatched container-looking fields
    pub fn policy(&self) -> UnknownContainerPolicy {
        self.policy
    }

    /// Registered record type by name
    pub fn record_type(&self, name: &str) -> Option<Arc<RecordType>> {
        self.record_types.get(name).cloned()
    }

    /// Names of registered record types, sorted
    pub fn record_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.record_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve a schema against this registry without registering it
    pub fn describe(&self, schema: &RecordSchema) -> Result<Arc<RecordType>> {
        schema.validate()?;

        let mut fields = Vec::with_capacity(schema.fields.len());
        for spec in &schema.fields {
            let signature = spec.parse_signature()?;
            let kind = match self.resolve(&signature) {
                Some(handle) => {
                    debug!(
                        record_type = %schema.name,
                        field = %spec.name,
                        signature = %signature,
                        strategy = handle.name(),
                        "field resolved to container strategy"
                    );
                    FieldKind::Container(handle)
                }
                None => {
                    if signature.looks_like_container() {
                        match self.policy {
                            UnknownContainerPolicy::Strict => {
                                return Err(ChunkError::UnsupportedContainer {
                                    record_type: schema.name.clone(),
                                    field: spec.name.clone(),
                                    signature: spec.signature.clone(),
                                });
                            }
                            UnknownContainerPolicy::Permissive => {
                                warn!(
                                    record_type = %schema.name,
                                    field = %spec.name,
                                    signature = %signature,
                                    "no strategy matches container-like field; copying it as a scalar"
                                );
                            }
                        }
                    }
                    FieldKind::Scalar
                }
            };
            fields.push(FieldDescriptor::new(spec.name.clone(), signature, kind));
        }

        Ok(Arc::new(RecordType::new(schema.name.clone(), fields)))
    }

    /// Split a record into chunks of at most `chunk_size` elements per container
    pub fn chunk<'a>(&self, record: &'a Record, chunk_size: usize) -> Result<ChunkSequence<'a>> {
        chunk(record, chunk_size)
    }

    /// Reassemble chunks of `record_type` into one record
    pub fn merge_chunks<I>(&self, record_type: &Arc<RecordType>, chunks: I) -> Result<Record>
    where
        I: IntoIterator,
        I::Item: Borrow<Record>,
    {
        merge_chunks(record_type, chunks)
    }

    /// Reassemble chunks onto an existing base record
    pub fn merge_into<I>(&self, base: Record, chunks: I) -> Result<Record>
    where
        I: IntoIterator,
        I::Item: Borrow<Record>,
    {
        merge_into(base, chunks)
    }

    /// Install the process-wide registry. Fails if one is already in place,
    /// including the default one handed out by an earlier [`global`](Self::global).
    pub fn install_global(self) -> Result<&'static Registry> {
        let mut slot = Some(self);
        let installed = GLOBAL.get_or_init(|| {
            slot.take()
                .unwrap_or_else(Registry::with_builtins)
        });
        if slot.is_some() {
            return Err(ChunkError::Registry(
                "global registry is already installed".to_string(),
            ));
        }
        Ok(installed)
    }

    /// The process-wide registry, defaulting to the built-ins
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Registry::with_builtins)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("strategies", &self.strategies().collect::<Vec<_>>())
            .field("record_types", &self.record_type_names())
            .field("policy", &self.policy)
            .finish()
    }
}
