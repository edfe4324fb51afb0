//! Semi-structured document extractor
//!
//! Infers ER entities from the hierarchical structure of an XML document.
//! Without a schema the instance tree alone drives inference; with an XSD the
//! declared structure drives it instead, enabling shared entities and
//! key/keyref relations the instance cannot express.

mod guided;
mod instance;
mod tree;
mod xsd;

use std::collections::BTreeSet;

use crate::models::Entity;
use crate::plugin::{ExtractionError, SourceCursor, SourceTypeDescriptor};
use crate::source::SourceInputs;

fn validate_inputs(provided: &BTreeSet<&str>) -> Result<(), String> {
    if provided.contains("data") {
        Ok(())
    } else {
        Err("input 'data' is required".to_string())
    }
}

/// Cursor over one XML document, optionally paired with an XSD.
#[derive(Debug)]
pub struct DocumentCursor {
    data: String,
    xsd: Option<String>,
}

impl DocumentCursor {
    pub fn descriptor() -> SourceTypeDescriptor {
        SourceTypeDescriptor::new("document", &["data", "xsd", "dtd"], validate_inputs)
    }

    pub fn from_inputs(inputs: &SourceInputs) -> Result<Self, ExtractionError> {
        if inputs.contains("dtd") {
            return Err(ExtractionError::UnsupportedFeature(
                "DTD schemas are not supported; provide an XSD instead".to_string(),
            ));
        }
        Ok(Self {
            data: inputs.require("data")?.to_string(),
            xsd: inputs.get("xsd").map(str::to_string),
        })
    }
}

impl SourceCursor for DocumentCursor {
    fn get_all_entities(&self) -> Result<Vec<Entity>, ExtractionError> {
        let root = tree::parse_document(&self.data)?;
        let arena = match &self.xsd {
            Some(xsd_text) => {
                let schema = xsd::XsdSchema::parse(xsd_text)?;
                tracing::debug!(root = %root.tag, "schema-guided document extraction");
                guided::infer(&schema, &root)?
            }
            None => {
                tracing::debug!(root = %root.tag, "schema-less document extraction");
                instance::infer(&root)
            }
        };
        Ok(arena.into_entities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cardinality;

    #[test]
    fn test_schema_less_extraction_via_cursor() {
        let inputs = SourceInputs::new()
            .with("data", r#"<Library><Book title="X"/></Library>"#);
        let cursor = DocumentCursor::from_inputs(&inputs).unwrap();
        let entities = cursor.get_all_entities().unwrap();
        assert_eq!(entities.len(), 2);
        let book = entities
            .iter()
            .find(|e| e.canonical_name() == "Library/Book")
            .unwrap();
        assert!(book.is_weak());
        assert_eq!(
            book.incoming_relations[0].object_cardinality,
            Cardinality::OneOrMore
        );
    }

    #[test]
    fn test_missing_data_input_is_configuration_error() {
        let inputs = SourceInputs::new();
        assert!(matches!(
            DocumentCursor::from_inputs(&inputs),
            Err(ExtractionError::Configuration(_))
        ));
    }

    #[test]
    fn test_dtd_input_is_unsupported() {
        let inputs = SourceInputs::new()
            .with("data", "<a/>")
            .with("dtd", "<!ELEMENT a EMPTY>");
        assert!(matches!(
            DocumentCursor::from_inputs(&inputs),
            Err(ExtractionError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_malformed_document_is_input_data_error() {
        let inputs = SourceInputs::new().with("data", "<a><b></a>");
        let cursor = DocumentCursor::from_inputs(&inputs).unwrap();
        assert!(matches!(
            cursor.get_all_entities(),
            Err(ExtractionError::InputData(_))
        ));
    }
}
