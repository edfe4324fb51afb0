//! XML Schema subset
//!
//! There is no dedicated XSD crate, so the subset this extractor understands
//! is modelled directly over the parsed schema document: global and nested
//! elements, named and inline complex types, sequence/choice/all groups,
//! attributes, simple content, occurrence ranges and key/keyref identity
//! constraints. Constructs outside the subset are an unsupported dialect
//! feature and fatal.

use std::collections::BTreeMap;

use crate::plugin::ExtractionError;

use super::tree::{local_name, parse_document, XmlNode};

#[derive(Debug, Clone)]
pub(crate) struct XsdAttribute {
    pub name: String,
    pub required: bool,
    /// `xs:IDREFS` is a whitespace-separated list, i.e. unbounded use.
    pub idrefs: bool,
}

/// `xs:key` or `xs:unique`: a selector path and the fields forming the key.
#[derive(Debug, Clone)]
pub(crate) struct XsdIdentity {
    pub name: String,
    pub selector: String,
    pub fields: Vec<String>,
}

/// `xs:keyref`: like a key, plus the name of the key it refers to.
#[derive(Debug, Clone)]
pub(crate) struct XsdKeyRef {
    pub name: String,
    pub refer: String,
    pub selector: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct XsdComplexType {
    pub attributes: Vec<XsdAttribute>,
    pub children: Vec<XsdElement>,
    /// complexType with simpleContent carries a scalar value next to its
    /// attributes.
    pub simple_content: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct XsdElement {
    pub name: String,
    pub type_ref: Option<String>,
    pub inline_complex: Option<XsdComplexType>,
    pub inline_simple: bool,
    pub ref_name: Option<String>,
    pub min_occurs: u64,
    pub max_occurs: Option<u64>,
    pub keys: Vec<XsdIdentity>,
    pub keyrefs: Vec<XsdKeyRef>,
}

/// A declaration with references and named types resolved away.
pub(crate) struct ResolvedElement<'a> {
    pub name: &'a str,
    pub complex: Option<&'a XsdComplexType>,
    pub min_occurs: u64,
    pub max_occurs: Option<u64>,
    pub keys: &'a [XsdIdentity],
    pub keyrefs: &'a [XsdKeyRef],
}

#[derive(Debug, Clone, Default)]
pub(crate) struct XsdSchema {
    pub elements: Vec<XsdElement>,
    complex_types: BTreeMap<String, XsdComplexType>,
}

const UNSUPPORTED_CONSTRUCTS: &[&str] = &[
    "include",
    "import",
    "redefine",
    "override",
    "group",
    "attributeGroup",
];

impl XsdSchema {
    pub fn parse(xsd: &str) -> Result<Self, ExtractionError> {
        let root = parse_document(xsd)?;
        if local_name(&root.tag) != "schema" {
            return Err(ExtractionError::InputData(
                "schema input is not an XML Schema document".to_string(),
            ));
        }

        let mut schema = XsdSchema::default();
        for child in &root.children {
            match local_name(&child.tag) {
                "element" => schema.elements.push(parse_element(child)?),
                "complexType" => {
                    let name = child.attribute("name").ok_or_else(|| {
                        ExtractionError::InputData(
                            "top-level complexType without a name".to_string(),
                        )
                    })?;
                    schema
                        .complex_types
                        .insert(name.to_string(), parse_complex_type(child)?);
                }
                "simpleType" | "annotation" | "notation" => {}
                other if UNSUPPORTED_CONSTRUCTS.contains(&other) => {
                    return Err(ExtractionError::UnsupportedFeature(format!(
                        "schema construct 'xs:{}' is not supported",
                        other
                    )));
                }
                _ => {}
            }
        }
        Ok(schema)
    }

    pub fn global_element(&self, name: &str) -> Option<&XsdElement> {
        self.elements
            .iter()
            .find(|element| local_name(&element.name) == local_name(name))
    }

    /// Follow `ref` and named-type indirection. A reference to an undeclared
    /// global element is an input-data error.
    pub fn resolve<'a>(
        &'a self,
        element: &'a XsdElement,
    ) -> Result<ResolvedElement<'a>, ExtractionError> {
        if let Some(ref_name) = &element.ref_name {
            let target = self.global_element(ref_name).ok_or_else(|| {
                ExtractionError::InputData(format!(
                    "element ref '{}' has no global declaration",
                    ref_name
                ))
            })?;
            let resolved = self.resolve(target)?;
            // Occurrence bounds come from the referencing position.
            return Ok(ResolvedElement {
                min_occurs: element.min_occurs,
                max_occurs: element.max_occurs,
                ..resolved
            });
        }

        let complex = if element.inline_simple {
            None
        } else if let Some(inline) = &element.inline_complex {
            Some(inline)
        } else if let Some(type_ref) = &element.type_ref {
            self.complex_types.get(local_name(type_ref))
        } else {
            None
        };

        Ok(ResolvedElement {
            name: local_name(&element.name),
            complex,
            min_occurs: element.min_occurs,
            max_occurs: element.max_occurs,
            keys: &element.keys,
            keyrefs: &element.keyrefs,
        })
    }
}

fn parse_occurs(node: &XmlNode) -> Result<(u64, Option<u64>), ExtractionError> {
    let min = match node.attribute("minOccurs") {
        Some(raw) => raw.parse::<u64>().map_err(|_| {
            ExtractionError::InputData(format!("invalid minOccurs '{}'", raw))
        })?,
        None => 1,
    };
    let max = match node.attribute("maxOccurs") {
        Some("unbounded") => None,
        Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
            ExtractionError::InputData(format!("invalid maxOccurs '{}'", raw))
        })?),
        None => Some(1),
    };
    Ok((min, max))
}

fn parse_identity(node: &XmlNode) -> Result<(String, String, Vec<String>), ExtractionError> {
    let name = node
        .attribute("name")
        .ok_or_else(|| ExtractionError::InputData("identity constraint without name".to_string()))?
        .to_string();
    let selector = node
        .children
        .iter()
        .find(|child| local_name(&child.tag) == "selector")
        .and_then(|child| child.attribute("xpath"))
        .ok_or_else(|| {
            ExtractionError::InputData(format!("identity constraint '{}' has no selector", name))
        })?
        .to_string();
    let fields = node
        .children
        .iter()
        .filter(|child| local_name(&child.tag) == "field")
        .filter_map(|child| child.attribute("xpath"))
        .map(str::to_string)
        .collect();
    Ok((name, selector, fields))
}

fn parse_element(node: &XmlNode) -> Result<XsdElement, ExtractionError> {
    let (min_occurs, max_occurs) = parse_occurs(node)?;
    let mut element = XsdElement {
        name: node
            .attribute("name")
            .or_else(|| node.attribute("ref"))
            .unwrap_or_default()
            .to_string(),
        type_ref: node.attribute("type").map(str::to_string),
        inline_complex: None,
        inline_simple: false,
        ref_name: node.attribute("ref").map(str::to_string),
        min_occurs,
        max_occurs,
        keys: Vec::new(),
        keyrefs: Vec::new(),
    };
    if element.name.is_empty() {
        return Err(ExtractionError::InputData(
            "element without name or ref".to_string(),
        ));
    }

    for child in &node.children {
        match local_name(&child.tag) {
            "complexType" => element.inline_complex = Some(parse_complex_type(child)?),
            "simpleType" => element.inline_simple = true,
            "key" | "unique" => {
                let (name, selector, fields) = parse_identity(child)?;
                element.keys.push(XsdIdentity {
                    name,
                    selector,
                    fields,
                });
            }
            "keyref" => {
                let (name, selector, fields) = parse_identity(child)?;
                let refer = child
                    .attribute("refer")
                    .ok_or_else(|| {
                        ExtractionError::InputData(format!("keyref '{}' has no refer", name))
                    })?
                    .to_string();
                element.keyrefs.push(XsdKeyRef {
                    name,
                    refer,
                    selector,
                    fields,
                });
            }
            _ => {}
        }
    }
    Ok(element)
}

fn parse_attribute(node: &XmlNode) -> Option<XsdAttribute> {
    let name = node.attribute("name")?.to_string();
    Some(XsdAttribute {
        name,
        required: node.attribute("use") == Some("required"),
        idrefs: node
            .attribute("type")
            .map(|t| local_name(t) == "IDREFS")
            .unwrap_or(false),
    })
}

fn parse_complex_type(node: &XmlNode) -> Result<XsdComplexType, ExtractionError> {
    let mut complex = XsdComplexType::default();
    collect_content(node, &mut complex)?;
    Ok(complex)
}

fn collect_content(node: &XmlNode, complex: &mut XsdComplexType) -> Result<(), ExtractionError> {
    for child in &node.children {
        match local_name(&child.tag) {
            "element" => complex.children.push(parse_element(child)?),
            "attribute" => {
                if let Some(attribute) = parse_attribute(child) {
                    complex.attributes.push(attribute);
                }
            }
            "sequence" | "choice" | "all" | "complexContent" | "extension" | "restriction" => {
                collect_content(child, complex)?;
            }
            "simpleContent" => {
                complex.simple_content = true;
                collect_content(child, complex)?;
            }
            "annotation" => {}
            other if UNSUPPORTED_CONSTRUCTS.contains(&other) => {
                return Err(ExtractionError::UnsupportedFeature(format!(
                    "schema construct 'xs:{}' is not supported",
                    other
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY_XSD: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="library">
            <xs:complexType>
              <xs:sequence>
                <xs:element name="book" type="BookType" minOccurs="0" maxOccurs="unbounded"/>
              </xs:sequence>
              <xs:attribute name="name" use="required"/>
            </xs:complexType>
            <xs:key name="bookKey">
              <xs:selector xpath="book"/>
              <xs:field xpath="@id"/>
            </xs:key>
          </xs:element>
          <xs:complexType name="BookType">
            <xs:sequence>
              <xs:element name="title" type="xs:string"/>
            </xs:sequence>
            <xs:attribute name="id" use="required"/>
          </xs:complexType>
        </xs:schema>"#;

    #[test]
    fn test_parse_schema_shape() {
        let schema = XsdSchema::parse(LIBRARY_XSD).unwrap();
        let library = schema.global_element("library").unwrap();
        assert_eq!(library.keys.len(), 1);
        assert_eq!(library.keys[0].fields, vec!["@id"]);

        let resolved = schema.resolve(library).unwrap();
        let complex = resolved.complex.unwrap();
        assert_eq!(complex.attributes[0].name, "name");
        assert_eq!(complex.children.len(), 1);

        let book = schema.resolve(&complex.children[0]).unwrap();
        assert_eq!(book.name, "book");
        assert_eq!(book.min_occurs, 0);
        assert_eq!(book.max_occurs, None);
        assert!(book.complex.is_some());
    }

    #[test]
    fn test_primitive_resolution() {
        let schema = XsdSchema::parse(LIBRARY_XSD).unwrap();
        let library = schema.global_element("library").unwrap();
        let complex = schema.resolve(library).unwrap().complex.unwrap();
        let book = schema.resolve(&complex.children[0]).unwrap();
        let title = schema.resolve(&book.complex.unwrap().children[0]).unwrap();
        assert!(title.complex.is_none());
    }

    #[test]
    fn test_non_schema_root_is_input_data_error() {
        assert!(matches!(
            XsdSchema::parse("<library/>"),
            Err(ExtractionError::InputData(_))
        ));
    }

    #[test]
    fn test_import_is_unsupported() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
            <xs:import namespace="urn:other"/>
        </xs:schema>"#;
        assert!(matches!(
            XsdSchema::parse(xsd),
            Err(ExtractionError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_element_ref_resolution() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
          <xs:element name="root">
            <xs:complexType>
              <xs:sequence>
                <xs:element ref="item" maxOccurs="unbounded"/>
              </xs:sequence>
            </xs:complexType>
          </xs:element>
          <xs:element name="item">
            <xs:complexType>
              <xs:attribute name="id"/>
            </xs:complexType>
          </xs:element>
        </xs:schema>"#;
        let schema = XsdSchema::parse(xsd).unwrap();
        let root = schema.global_element("root").unwrap();
        let complex = schema.resolve(root).unwrap().complex.unwrap();
        let item = schema.resolve(&complex.children[0]).unwrap();
        assert_eq!(item.name, "item");
        assert_eq!(item.max_occurs, None);
        assert!(item.complex.is_some());
    }
}
