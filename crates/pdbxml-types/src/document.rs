//! Owned element tree for type database documents.
//!
//! The reader never touches XML directly: a [`Document`] is built once by the
//! loader and then walked positionally. Only element nodes are kept; text,
//! comments and processing instructions are dropped.

use crate::error::{ReadError, ReadResult};
use std::path::Path;
use std::str::FromStr;

/// Number of top-level sections a document must carry.
pub const SECTION_COUNT: usize = 3;

/// Section holding function-argument records.
pub const FUNCTION_SECTION: usize = 0;
/// Section holding unnamed (anonymous) type records.
pub const UNNAMED_SECTION: usize = 1;
/// Section holding named type records.
pub const NAMED_SECTION: usize = 2;

/// One element: tag, attributes in document order, element children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an attribute that must be present.
    pub fn required_attr(&self, name: &'static str) -> ReadResult<&str> {
        self.attr(name).ok_or_else(|| ReadError::MissingAttribute {
            tag: self.tag.clone(),
            attr: name,
        })
    }

    /// Get a required attribute parsed as an integer.
    pub fn int_attr<T: FromStr>(&self, name: &'static str) -> ReadResult<T> {
        let value = self.required_attr(name)?;
        parse_int(name, value)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// Parse an integer field of a record or descriptor.
pub(crate) fn parse_int<T: FromStr>(attr: &'static str, value: &str) -> ReadResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ReadError::InvalidNumber {
            attr,
            value: value.to_string(),
        })
}

/// A loaded type database document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Parse document text.
    pub fn parse(text: &str) -> ReadResult<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let xml = roxmltree::Document::parse_with_options(text, options)?;
        let root = convert(xml.root_element());
        Self::from_root(root)
    }

    /// Read and parse a document file.
    pub fn load(path: impl AsRef<Path>) -> ReadResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Wrap an already-built tree, checking it has all sections.
    pub fn from_root(root: Element) -> ReadResult<Self> {
        if root.len() < SECTION_COUNT {
            return Err(ReadError::MissingSection {
                index: root.len(),
                found: root.len(),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Get a top-level section by position.
    pub fn section(&self, index: usize) -> Option<&Element> {
        self.root.children.get(index)
    }

    // The three sections below are guaranteed by `from_root`.

    pub fn functions(&self) -> &Element {
        &self.root.children[FUNCTION_SECTION]
    }

    pub fn unnamed(&self) -> &Element {
        &self.root.children[UNNAMED_SECTION]
    }

    pub fn named(&self) -> &Element {
        &self.root.children[NAMED_SECTION]
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    Element {
        tag: node.tag_name().name().to_string(),
        attrs: node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        children: node
            .children()
            .filter(|n| n.is_element())
            .map(convert)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections() {
        let doc = Document::parse(
            r#"<types>
                 <funcs><func id="0"/></funcs>
                 <unnamed/>
                 <named><struct name="S"/></named>
               </types>"#,
        )
        .unwrap();
        assert_eq!(doc.functions().len(), 1);
        assert!(doc.unnamed().is_empty());
        assert_eq!(doc.named().children[0].attr("name"), Some("S"));
    }

    #[test]
    fn test_sections_are_positional() {
        // Tag names of the sections do not matter
        let doc = Document::parse("<r><x/><y><a id=\"1\"/></y><z/></r>").unwrap();
        assert_eq!(doc.unnamed().tag, "y");
        assert_eq!(doc.unnamed().len(), 1);
    }

    #[test]
    fn test_text_and_comments_dropped() {
        let doc = Document::parse("<r> text <!-- c --><a/>\n<b/><c/></r>").unwrap();
        assert_eq!(doc.root().len(), 3);
    }

    #[test]
    fn test_doctype_accepted() {
        let doc = Document::parse(
            "<?xml version=\"1.0\"?>\n<!DOCTYPE types>\n\
             <types><funcs/><unnamed/><named><struct name=\"S\"/></named></types>",
        )
        .unwrap();
        assert_eq!(doc.named().children[0].attr("name"), Some("S"));
    }

    #[test]
    fn test_missing_section() {
        let err = Document::parse("<r><a/><b/></r>").unwrap_err();
        assert!(matches!(err, ReadError::MissingSection { index: 2, found: 2 }));
    }

    #[test]
    fn test_malformed_xml() {
        let err = Document::parse("<r><a></r>").unwrap_err();
        assert!(matches!(err, ReadError::Xml(_)));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("types.xml");
        std::fs::write(&path, "<r><a/><b/><c/></r>").unwrap();
        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.root().tag, "r");

        let err = Document::load(dir.path().join("missing.xml")).unwrap_err();
        assert!(matches!(err, ReadError::Io(_)));
    }

    #[test]
    fn test_attrs() {
        let e = Element::new("bit-field")
            .with_attr("name", "flags")
            .with_attr("len", " 3");
        assert_eq!(e.attr("name"), Some("flags"));
        assert_eq!(e.attr("base"), None);
        assert_eq!(e.int_attr::<u32>("len").unwrap(), 3);

        let err = e.required_attr("base").unwrap_err();
        assert!(matches!(
            err,
            ReadError::MissingAttribute { ref tag, attr: "base" } if tag == "bit-field"
        ));
    }

    #[test]
    fn test_int_attr_invalid() {
        let e = Element::new("bit-field").with_attr("len", "three");
        let err = e.int_attr::<u32>("len").unwrap_err();
        assert!(matches!(err, ReadError::InvalidNumber { attr: "len", .. }));

        let neg = Element::new("bit-field").with_attr("len", "-1");
        assert!(neg.int_attr::<u32>("len").is_err());
    }

    #[test]
    fn test_from_root() {
        let root = Element::new("r")
            .with_child(Element::new("a"))
            .with_child(Element::new("b"))
            .with_child(Element::new("c"));
        let doc = Document::from_root(root).unwrap();
        assert_eq!(doc.named().tag, "c");
        assert_eq!(doc.section(0).map(|s| s.tag.as_str()), Some("a"));
        assert!(doc.section(3).is_none());
    }
}
