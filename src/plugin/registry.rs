//! Extractor registry
//!
//! Discovery is an explicit registration call per extractor collected into
//! one map from type name to factory; the built-in map is composed once and
//! shared as a static. No global mutable registration state.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use super::{ExtractionError, Extractor, SourceTypeDescriptor};
use crate::extract::document::DocumentCursor;
use crate::extract::relational::RelationalCursor;
use crate::source::{SourceCatalog, SourceInputs};

/// Builds a cursor bound to one source's inputs.
pub type ExtractorFactory = fn(&SourceInputs) -> Result<Extractor, ExtractionError>;

struct Registration {
    descriptor: SourceTypeDescriptor,
    factory: ExtractorFactory,
}

/// Map from source-type name to descriptor and factory.
#[derive(Default)]
pub struct ExtractorRegistry {
    registrations: BTreeMap<&'static str, Registration>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: SourceTypeDescriptor, factory: ExtractorFactory) {
        self.registrations
            .insert(descriptor.name, Registration { descriptor, factory });
    }

    /// A lookup miss is a configuration error, not a runtime fault of an
    /// extraction call.
    pub fn resolve(
        &self,
        type_name: &str,
    ) -> Result<(&SourceTypeDescriptor, ExtractorFactory), ExtractionError> {
        self.registrations
            .get(type_name)
            .map(|registration| (&registration.descriptor, registration.factory))
            .ok_or_else(|| {
                ExtractionError::Configuration(format!(
                    "no extractor registered for source type '{}'",
                    type_name
                ))
            })
    }

    pub fn type_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.registrations.keys().copied()
    }

    /// Resolve a logical source to a cursor bound to its stored inputs:
    /// catalog lookup, descriptor input validation, then factory invocation.
    pub fn open(
        &self,
        catalog: &SourceCatalog,
        source_name: &str,
    ) -> Result<Extractor, ExtractionError> {
        let config = catalog.get(source_name)?;
        let (descriptor, factory) = self.resolve(&config.source_type)?;
        descriptor.validate_inputs(&config.inputs.names())?;
        tracing::debug!(
            source = source_name,
            source_type = descriptor.name,
            "opening extractor"
        );
        factory(&config.inputs)
    }
}

static BUILTIN: Lazy<ExtractorRegistry> = Lazy::new(|| {
    let mut registry = ExtractorRegistry::new();
    registry.register(RelationalCursor::descriptor(), |inputs| {
        Ok(Extractor::Relational(RelationalCursor::from_inputs(inputs)?))
    });
    registry.register(DocumentCursor::descriptor(), |inputs| {
        Ok(Extractor::Document(DocumentCursor::from_inputs(inputs)?))
    });
    registry
});

/// The registry of extractors shipped with the engine.
pub fn builtin_registry() -> &'static ExtractorRegistry {
    &BUILTIN
}
