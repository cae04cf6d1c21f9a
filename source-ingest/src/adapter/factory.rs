//! Adapter selection by source type

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{AdapterBuilder, ConsumerAdapter};
use crate::error::{AdapterError, SourceConfigError};
use crate::handler::MessageHandler;
use crate::types::{Source, SourceType};

/// Maps each [`SourceType`] to the builder of its adapter
#[derive(Clone, Default)]
pub struct AdapterFactory {
    builders: HashMap<SourceType, Arc<dyn AdapterBuilder>>,
}

impl AdapterFactory {
    /// Create a factory with no builders
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `builder` for `source_type`, replacing any previous one
    pub fn register(&mut self, source_type: SourceType, builder: Arc<dyn AdapterBuilder>) {
        self.builders.insert(source_type, builder);
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_builder(mut self, source_type: SourceType, builder: Arc<dyn AdapterBuilder>) -> Self {
        self.register(source_type, builder);
        self
    }

    /// Whether a builder is registered for `source_type`
    pub fn supports(&self, source_type: SourceType) -> bool {
        self.builders.contains_key(&source_type)
    }

    /// Build an unstarted adapter for `source`
    ///
    /// # Errors
    /// Fails on an invalid config or an unregistered source type.
    pub fn build(
        &self,
        source: &Source,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<Box<dyn ConsumerAdapter>, AdapterError> {
        source.config.validate()?;

        let source_type = source.source_type();
        let builder = self
            .builders
            .get(&source_type)
            .ok_or(SourceConfigError::UnsupportedType(source_type))?;
        builder.build(source, handler)
    }
}

impl fmt::Debug for AdapterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.builders.keys().map(SourceType::name).collect();
        types.sort_unstable();
        f.debug_struct("AdapterFactory").field("types", &types).finish()
    }
}
