//! Owned, mutable XML element tree for SVG templates
//!
//! The tree keeps each element's qualified name exactly as written alongside
//! its resolved namespace URI, so a template can be matched with Clark
//! notation (`{uri}local`) and still serialize with its original prefixes.

use std::fmt;
use std::path::Path;

use quick_xml::escape::{escape, unescape};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// Namespace bound to the reserved `xml` prefix
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of `xmlns` declaration attributes
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Errors that can occur when loading a template document
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed XML at byte {position}: {source}")]
    Xml {
        position: usize,
        source: quick_xml::Error,
    },

    #[error("malformed attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("template is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed XML declaration: {0}")]
    Declaration(String),

    #[error("unsupported template encoding '{0}' (use UTF-8 or ISO-8859-1)")]
    UnsupportedEncoding(String),

    #[error("namespace prefix '{prefix}' in '{name}' is not bound")]
    UnboundPrefix { prefix: String, name: String },

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("document has no root element")]
    NoRoot,

    #[error("element '{name}' is never closed")]
    Unclosed { name: String },

    #[error("unexpected closing tag '{name}'")]
    UnexpectedClose { name: String },

    #[error("text content outside the root element")]
    TextOutsideRoot,
}

/// An element or attribute name, as written and as resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    /// Name as written in the source, including any prefix
    pub raw: String,
    /// Resolved namespace URI, if any
    pub namespace: Option<String>,
    /// Local part of the name
    pub local: String,
}

impl QualifiedName {
    /// An un-namespaced name
    pub fn local(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            raw: name.clone(),
            namespace: None,
            local: name,
        }
    }

    /// Name in Clark notation: `{uri}local`, or just `local`
    pub fn clark(&self) -> String {
        match &self.namespace {
            Some(uri) => format!("{{{}}}{}", uri, self.local),
            None => self.local.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QualifiedName,
    /// Unescaped attribute value
    pub value: String,
}

/// A child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Character data, still escaped as in the source
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
}

impl Node {
    fn write_to(&self, out: &mut String) {
        match self {
            Node::Element(element) => element.write_to(out),
            Node::Text(raw) => out.push_str(raw),
            Node::CData(content) => {
                out.push_str("<![CDATA[");
                out.push_str(content);
                out.push_str("]]>");
            }
            Node::Comment(content) => {
                out.push_str("<!--");
                out.push_str(content);
                out.push_str("-->");
            }
            Node::ProcessingInstruction(content) => {
                out.push_str("<?");
                out.push_str(content);
                out.push_str("?>");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QualifiedName,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    /// Create an empty element with an un-namespaced name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: QualifiedName::local(name),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of an attribute in the given namespace
    pub fn attribute_ns(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.local == local && a.name.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    /// Value of an un-namespaced attribute
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attribute_ns(None, local)
    }

    /// Set an un-namespaced attribute, replacing any existing value in place
    pub fn set_attribute(&mut self, local: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .attributes
            .iter_mut()
            .find(|a| a.name.local == local && a.name.namespace.is_none())
        {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute {
                name: QualifiedName::local(local),
                value,
            }),
        }
    }

    /// Child elements paired with their index in `children`
    pub fn child_elements(&self) -> impl Iterator<Item = (usize, &Element)> {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                Node::Element(element) => Some((index, element)),
                _ => None,
            })
    }

    /// Concatenated, unescaped text of this element and all descendants
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, text: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(element) => element.collect_text(text),
                Node::Text(raw) => match unescape(raw) {
                    Ok(unescaped) => text.push_str(&unescaped),
                    Err(_) => text.push_str(raw),
                },
                Node::CData(content) => text.push_str(content),
                Node::Comment(_) | Node::ProcessingInstruction(_) => {}
            }
        }
    }

    /// Element reached by following child indices from this element
    pub fn element_at(&self, route: &[usize]) -> Option<&Element> {
        route
            .iter()
            .try_fold(self, |element, &index| match element.children.get(index) {
                Some(Node::Element(child)) => Some(child),
                _ => None,
            })
    }

    /// Mutable variant of [`Element::element_at`]
    pub fn element_at_mut(&mut self, route: &[usize]) -> Option<&mut Element> {
        let mut element = self;
        for &index in route {
            element = match element.children.get_mut(index) {
                Some(Node::Element(child)) => child,
                _ => return None,
            };
        }
        Some(element)
    }

    fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name.raw);
        for attribute in &self.attributes {
            out.push(' ');
            out.push_str(&attribute.name.raw);
            out.push_str("=\"");
            out.push_str(&escape(&attribute.value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_to(out);
        }
        out.push_str("</");
        out.push_str(&self.name.raw);
        out.push('>');
    }
}

/// A parsed template: the root element plus whatever surrounds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    prolog: String,
    pub root: Element,
    epilog: String,
}

impl Document {
    /// Load a document from a file
    ///
    /// The file is decoded according to its XML declaration. UTF-8 (the
    /// default), US-ASCII and ISO-8859-1 are understood; serialization is
    /// always UTF-8.
    pub fn from_file(path: &Path) -> Result<Self, TreeError> {
        let bytes = std::fs::read(path)?;
        Self::parse(&decode(&bytes)?)
    }

    /// Parse a document from XML text
    pub fn parse(source: &str) -> Result<Self, TreeError> {
        let mut reader = Reader::from_str(source);
        let mut builder = TreeBuilder::default();

        loop {
            let event = reader.read_event().map_err(|source| TreeError::Xml {
                position: reader.buffer_position(),
                source,
            })?;
            match event {
                Event::Start(start) => {
                    let element = builder.open_element(&start, reader.buffer_position())?;
                    builder.open.push(element);
                }
                Event::Empty(start) => {
                    let element = builder.open_element(&start, reader.buffer_position())?;
                    builder.scopes.pop();
                    builder.push(Node::Element(element))?;
                }
                Event::End(end) => {
                    builder.scopes.pop();
                    let element = builder.open.pop().ok_or_else(|| TreeError::UnexpectedClose {
                        name: String::from_utf8_lossy(end.name().as_ref()).into_owned(),
                    })?;
                    builder.push(Node::Element(element))?;
                }
                Event::Text(text) => {
                    builder.push(Node::Text(std::str::from_utf8(&text)?.to_string()))?;
                }
                Event::CData(data) => {
                    builder.push(Node::CData(std::str::from_utf8(&data)?.to_string()))?;
                }
                Event::Comment(comment) => {
                    builder.push(Node::Comment(std::str::from_utf8(&comment)?.to_string()))?;
                }
                Event::PI(instruction) => {
                    builder.push(Node::ProcessingInstruction(
                        std::str::from_utf8(&instruction)?.to_string(),
                    ))?;
                }
                Event::Decl(decl) => builder.prolog.push_str(&declaration(&decl)?),
                Event::DocType(doctype) => {
                    let content = std::str::from_utf8(&doctype)?;
                    builder.prolog.push_str("<!DOCTYPE ");
                    builder.prolog.push_str(content.trim_start());
                    builder.prolog.push('>');
                }
                Event::Eof => break,
            }
        }

        builder.finish()
    }

    /// Serialize the document back to XML text
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.prolog.len() + self.epilog.len() + 1024);
        out.push_str(&self.prolog);
        self.root.write_to(&mut out);
        out.push_str(&self.epilog);
        out
    }

    /// Serialized document as UTF-8 bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_xml())
    }
}

fn declaration(decl: &BytesDecl<'_>) -> Result<String, TreeError> {
    let version = decl
        .version()
        .map_err(|e| TreeError::Declaration(e.to_string()))?;
    let mut out = format!(
        "<?xml version=\"{}\"",
        String::from_utf8_lossy(version.as_ref())
    );
    match decl.encoding() {
        // the serialized document is UTF-8 whatever the source was
        Some(Ok(encoding)) => {
            let label = String::from_utf8_lossy(encoding.as_ref());
            let label = if is_utf8_label(&label) { &*label } else { "UTF-8" };
            out.push_str(&format!(" encoding=\"{}\"", label));
        }
        Some(Err(e)) => return Err(TreeError::Declaration(e.to_string())),
        None => {}
    }
    match decl.standalone() {
        Some(Ok(standalone)) => out.push_str(&format!(
            " standalone=\"{}\"",
            String::from_utf8_lossy(standalone.as_ref())
        )),
        Some(Err(e)) => return Err(TreeError::Declaration(e.to_string())),
        None => {}
    }
    out.push_str("?>");
    Ok(out)
}

fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

/// Encoding named by the XML declaration at the start of `bytes`, if any
fn declared_encoding(bytes: &[u8]) -> Result<Option<String>, TreeError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let event = reader
        .read_event_into(&mut buf)
        .map_err(|source| TreeError::Xml {
            position: reader.buffer_position(),
            source,
        })?;
    match event {
        Event::Decl(decl) => match decl.encoding() {
            Some(Ok(label)) => Ok(Some(String::from_utf8_lossy(label.as_ref()).into_owned())),
            Some(Err(e)) => Err(TreeError::Declaration(e.to_string())),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// Decode a template file into text
fn decode(bytes: &[u8]) -> Result<String, TreeError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match declared_encoding(bytes)? {
        None => Ok(std::str::from_utf8(bytes)?.to_string()),
        Some(label) if is_utf8_label(&label) => Ok(std::str::from_utf8(bytes)?.to_string()),
        Some(label)
            if label.eq_ignore_ascii_case("us-ascii") || label.eq_ignore_ascii_case("ascii") =>
        {
            Ok(std::str::from_utf8(bytes)?.to_string())
        }
        Some(label)
            if ["iso-8859-1", "iso8859-1", "latin1", "latin-1", "l1"]
                .iter()
                .any(|known| label.eq_ignore_ascii_case(known)) =>
        {
            Ok(bytes.iter().map(|&b| char::from(b)).collect())
        }
        Some(label) => Err(TreeError::UnsupportedEncoding(label)),
    }
}

/// A namespace declaration; `uri: None` undeclares the default namespace
struct Binding {
    prefix: Option<String>,
    uri: Option<String>,
}

#[derive(Default)]
struct TreeBuilder {
    scopes: Vec<Vec<Binding>>,
    open: Vec<Element>,
    root: Option<Element>,
    prolog: String,
    epilog: String,
}

impl TreeBuilder {
    /// `position` is the reader offset just past the tag, for error reports
    fn open_element(
        &mut self,
        start: &BytesStart<'_>,
        position: usize,
    ) -> Result<Element, TreeError> {
        let raw_name = std::str::from_utf8(start.name().as_ref())?.to_string();

        let mut raw_attributes = Vec::new();
        let mut bindings = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = std::str::from_utf8(attribute.key.as_ref())?.to_string();
            let value = attribute
                .unescape_value()
                .map_err(|source| TreeError::Xml { position, source })?
                .into_owned();
            if key == "xmlns" {
                bindings.push(Binding {
                    prefix: None,
                    uri: (!value.is_empty()).then(|| value.clone()),
                });
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                bindings.push(Binding {
                    prefix: Some(prefix.to_string()),
                    uri: Some(value.clone()),
                });
            }
            raw_attributes.push((key, value));
        }
        self.scopes.push(bindings);

        let name = self.resolve(&raw_name, true)?;
        let attributes = raw_attributes
            .into_iter()
            .map(|(key, value)| {
                Ok(Attribute {
                    name: self.resolve(&key, false)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>, TreeError>>()?;

        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|binding| binding.prefix.as_deref() == prefix)
            .and_then(|binding| binding.uri.as_deref())
    }

    fn resolve(&self, raw: &str, is_element: bool) -> Result<QualifiedName, TreeError> {
        let (namespace, local) = match raw.split_once(':') {
            Some(("xmlns", local)) => (Some(XMLNS_NAMESPACE), local),
            Some(("xml", local)) => (Some(XML_NAMESPACE), local),
            Some((prefix, local)) => {
                let uri = self
                    .lookup(Some(prefix))
                    .ok_or_else(|| TreeError::UnboundPrefix {
                        prefix: prefix.to_string(),
                        name: raw.to_string(),
                    })?;
                (Some(uri), local)
            }
            None if raw == "xmlns" => (Some(XMLNS_NAMESPACE), raw),
            // the default namespace applies to elements, never to attributes
            None if is_element => (self.lookup(None), raw),
            None => (None, raw),
        };
        Ok(QualifiedName {
            raw: raw.to_string(),
            namespace: namespace.map(str::to_string),
            local: local.to_string(),
        })
    }

    fn push(&mut self, node: Node) -> Result<(), TreeError> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(node);
            return Ok(());
        }
        match node {
            Node::Element(element) => {
                if self.root.is_some() {
                    return Err(TreeError::MultipleRoots);
                }
                self.root = Some(element);
            }
            Node::Text(raw) if !raw.trim().is_empty() => return Err(TreeError::TextOutsideRoot),
            other => {
                let target = if self.root.is_some() {
                    &mut self.epilog
                } else {
                    &mut self.prolog
                };
                other.write_to(target);
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Document, TreeError> {
        if let Some(unclosed) = self.open.pop() {
            return Err(TreeError::Unclosed {
                name: unclosed.name.raw,
            });
        }
        let root = self.root.ok_or(TreeError::NoRoot)?;
        Ok(Document {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}
