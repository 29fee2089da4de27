use crate::utils::{is_nc_name, split_iri};
use oxiri::{Iri, IriParseError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;
use tessera_model::vocab::{rdf, xml};
use tessera_model::{
    Literal, NamedNode, NamedOrBlankNode, Predicate, Quad, SerializerError, Subject, Term, Triple,
};
use tracing::{debug, warn};

/// Local names of the RDF namespace that can't be used as node or property element names.
const RESERVED_RDF_NAMES: [&str; 12] = [
    "RDF",
    "Description",
    "ID",
    "about",
    "aboutEach",
    "aboutEachPrefix",
    "bagID",
    "datatype",
    "li",
    "nodeID",
    "parseType",
    "resource",
];

/// A [RDF/XML](https://www.w3.org/TR/rdf-syntax-grammar/) serializer.
///
/// Consecutive triples sharing a subject are grouped in the same node element.
/// When such a group has a single `rdf:type` whose class is in the RDF namespace or in a declared prefix,
/// a typed node element is written.
///
/// ```
/// use tessera_model::{NamedNode, Triple};
/// use tessera_model::vocab::rdf;
/// use tessera_xml::RdfXmlSerializer;
///
/// let mut serializer = RdfXmlSerializer::new()
///     .with_prefix("schema", "http://schema.org/")?
///     .for_writer(Vec::new());
/// serializer.serialize_triple(&Triple::new(
///     NamedNode::new("http://example.com#me")?,
///     rdf::TYPE,
///     NamedNode::new("http://schema.org/Person")?,
/// ))?;
/// assert_eq!(
///     b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\" xmlns:schema=\"http://schema.org/\">\n\t<schema:Person rdf:about=\"http://example.com#me\"/>\n</rdf:RDF>",
///     serializer.finish()?.as_slice()
/// );
/// # Result::<_,Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct RdfXmlSerializer {
    prefixes: BTreeMap<String, String>,
    base_iri: Option<String>,
}

impl RdfXmlSerializer {
    /// Builds a new [`RdfXmlSerializer`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a namespace prefix on the root element.
    ///
    /// Prefix names that are not valid XML names, and attempts to rebind `rdf` or `xml`,
    /// are ignored with a warning.
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        let prefix_name = prefix_name.into();
        let prefix_iri = Iri::parse(prefix_iri.into())?.into_inner();
        if !is_nc_name(&prefix_name) || prefix_name.to_ascii_lowercase().starts_with("xml") {
            warn!(
                prefix = prefix_name,
                "Ignoring a prefix that is not usable in RDF/XML"
            );
        } else if prefix_name == "rdf" {
            if prefix_iri != rdf::NAMESPACE {
                warn!(
                    namespace = prefix_iri,
                    "The rdf prefix is reserved to the RDF namespace, ignoring it"
                );
            }
        } else {
            self.prefixes.insert(prefix_name, prefix_iri);
        }
        Ok(self)
    }

    /// Writes a `xml:base` attribute on the root element.
    ///
    /// IRIs are still written in their absolute form.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.base_iri = Some(Iri::parse(base_iri.into())?.into_inner());
        Ok(self)
    }

    /// Writes a RDF/XML file to a [`Write`] implementation.
    ///
    /// This writer does unbuffered writes. You might want to use [`BufWriter`](std::io::BufWriter) to avoid that.
    pub fn for_writer<W: Write>(self, writer: W) -> WriterRdfXmlSerializer<W> {
        if !self.prefixes.is_empty() || self.base_iri.is_some() {
            debug!(
                format = "RDF/XML",
                prefixes = self.prefixes.len(),
                base_iri = self.base_iri.as_deref(),
                "Creating a serializer with non-default options"
            );
        }
        WriterRdfXmlSerializer {
            writer: Writer::new_with_indent(writer, b'\t', 1),
            failure: None,
            prefixes: self.prefixes,
            base_iri: self.base_iri,
            is_started: false,
            current: None,
        }
    }
}

/// Writes a RDF/XML file to a [`Write`] implementation.
///
/// Can be built using [`RdfXmlSerializer::for_writer`].
///
/// Once a call failed the serializer is unusable and every following call returns the same error.
#[must_use]
pub struct WriterRdfXmlSerializer<W: Write> {
    writer: Writer<W>,
    failure: Option<SerializerError>,
    prefixes: BTreeMap<String, String>,
    base_iri: Option<String>,
    is_started: bool,
    current: Option<Description>,
}

/// The triples of the node element being built.
struct Description {
    subject: NamedOrBlankNode,
    properties: Vec<(NamedNode, Term)>,
}

impl<W: Write> WriterRdfXmlSerializer<W> {
    /// Writes an extra triple.
    ///
    /// Embedded triples, blank node predicates and predicates without a valid XML local name
    /// fail with [`ErrorKind::UnrepresentableInTargetFormat`](tessera_model::ErrorKind::UnrepresentableInTargetFormat).
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let result = self.write_triple(triple);
        result.map_err(|error| self.failure.get_or_insert(error).clone())
    }

    /// Writes a quad of the default graph.
    ///
    /// Quads of named graphs are not representable in RDF/XML.
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        if !quad.graph_name.is_default_graph() {
            let error = SerializerError::unrepresentable(format!(
                "RDF/XML cannot store the named graph {}",
                quad.graph_name
            ));
            return Err(self.failure.get_or_insert(error).clone());
        }
        self.serialize_triple(&Triple::new(
            quad.subject.clone(),
            quad.predicate.clone(),
            quad.object.clone(),
        ))
    }

    /// Ends the write process and returns the underlying [`Write`].
    pub fn finish(mut self) -> Result<W, SerializerError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        self.write_start()?;
        if let Some(description) = self.current.take() {
            write_description(&mut self.writer, &self.prefixes, &description)?;
        }
        self.writer
            .write_event(Event::End(BytesEnd::new("rdf:RDF")))?;
        let mut writer = self.writer.into_inner();
        writer.flush()?;
        Ok(writer)
    }

    fn write_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        triple.validate(false)?;
        let subject = match &triple.subject {
            Subject::NamedNode(node) => NamedOrBlankNode::from(node.clone()),
            Subject::BlankNode(node) => node.clone().into(),
            Subject::Triple(_) => {
                return Err(SerializerError::unrepresentable(
                    "RDF/XML cannot store embedded triples",
                ));
            }
        };
        let Predicate::NamedNode(predicate) = &triple.predicate else {
            return Err(SerializerError::unrepresentable(
                "RDF/XML cannot store blank node predicates",
            ));
        };
        if qualified_name(&self.prefixes, predicate.as_str()).is_none() {
            return Err(SerializerError::unrepresentable(format!(
                "The predicate {predicate} cannot be written as an XML element name"
            )));
        }
        match &triple.object {
            Term::Triple(_) => {
                return Err(SerializerError::unrepresentable(
                    "RDF/XML cannot store embedded triples",
                ));
            }
            Term::Literal(literal) if !literal.value().chars().all(is_xml_char) => {
                return Err(SerializerError::unrepresentable(format!(
                    "The literal {literal} contains characters forbidden in XML 1.0"
                )));
            }
            _ => (),
        }

        self.write_start()?;
        if let Some(description) = &mut self.current {
            if description.subject == subject {
                description
                    .properties
                    .push((predicate.clone(), triple.object.clone()));
                return Ok(());
            }
        }
        if let Some(description) = self.current.take() {
            write_description(&mut self.writer, &self.prefixes, &description)?;
        }
        self.current = Some(Description {
            subject,
            properties: vec![(predicate.clone(), triple.object.clone())],
        });
        Ok(())
    }

    fn write_start(&mut self) -> Result<(), SerializerError> {
        if self.is_started {
            return Ok(());
        }
        self.is_started = true;
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        let mut root = BytesStart::new("rdf:RDF");
        root.push_attribute(("xmlns:rdf", rdf::NAMESPACE));
        for (prefix_name, prefix_iri) in &self.prefixes {
            root.push_attribute((format!("xmlns:{prefix_name}").as_str(), prefix_iri.as_str()));
        }
        if let Some(base_iri) = &self.base_iri {
            root.push_attribute(("xml:base", base_iri.as_str()));
        }
        self.writer.write_event(Event::Start(root))?;
        Ok(())
    }
}

fn write_description<W: Write>(
    writer: &mut Writer<W>,
    prefixes: &BTreeMap<String, String>,
    description: &Description,
) -> Result<(), SerializerError> {
    // A single rdf:type becomes the element name
    let mut types = description
        .properties
        .iter()
        .enumerate()
        .filter(|(_, (predicate, object))| {
            *predicate == rdf::TYPE && matches!(object, Term::NamedNode(_))
        });
    // Declaring a default namespace on the node element would leak into XML literals
    let typed_node = match (types.next(), types.next()) {
        (Some((position, (_, Term::NamedNode(class)))), None) => {
            qualified_name(prefixes, class.as_str())
                .filter(|name| name.namespace.is_none())
                .map(|name| (position, name.name))
        }
        _ => None,
    };
    let element_name = match &typed_node {
        Some((_, name)) => name.clone(),
        None => Cow::Borrowed("rdf:Description"),
    };

    let mut node_start = BytesStart::new(element_name.clone());
    match &description.subject {
        NamedOrBlankNode::NamedNode(node) => node_start.push_attribute(("rdf:about", node.as_str())),
        NamedOrBlankNode::BlankNode(node) => {
            node_start.push_attribute(("rdf:nodeID", node.as_str()))
        }
    }

    let properties = description
        .properties
        .iter()
        .enumerate()
        .filter(|(i, _)| typed_node.as_ref().is_none_or(|(position, _)| position != i))
        .map(|(_, property)| property)
        .collect::<Vec<_>>();
    if properties.is_empty() {
        writer.write_event(Event::Empty(node_start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(node_start))?;
    for (predicate, object) in properties {
        write_property(writer, prefixes, predicate, object)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element_name)))?;
    Ok(())
}

fn write_property<W: Write>(
    writer: &mut Writer<W>,
    prefixes: &BTreeMap<String, String>,
    predicate: &NamedNode,
    object: &Term,
) -> Result<(), SerializerError> {
    let name = qualified_name(prefixes, predicate.as_str()).ok_or_else(|| {
        SerializerError::unrepresentable(format!(
            "The predicate {predicate} cannot be written as an XML element name"
        ))
    })?;
    let is_xml_literal = matches!(object, Term::Literal(literal) if literal.datatype() == rdf::XML_LITERAL);
    let (element_name, namespace_declaration) = match name.namespace {
        // The content of XML literals must not inherit a default namespace
        Some(namespace) if is_xml_literal => {
            (Cow::Owned(format!("ns0:{}", name.name)), Some(("xmlns:ns0", namespace)))
        }
        Some(namespace) => (name.name, Some(("xmlns", namespace))),
        None => (name.name, None),
    };
    let mut start = BytesStart::new(element_name.clone());
    if let Some(declaration) = namespace_declaration {
        start.push_attribute(declaration);
    }
    let content = match object {
        Term::NamedNode(node) => {
            start.push_attribute(("rdf:resource", node.as_str()));
            None
        }
        Term::BlankNode(node) => {
            start.push_attribute(("rdf:nodeID", node.as_str()));
            None
        }
        Term::Literal(literal) => Some(literal_content(&mut start, literal)),
        Term::Triple(_) => {
            return Err(SerializerError::unrepresentable(
                "RDF/XML cannot store embedded triples",
            ));
        }
    };
    if let Some(content) = content {
        writer.write_event(Event::Start(start))?;
        writer.write_event(Event::Text(content))?;
        writer.write_event(Event::End(BytesEnd::new(element_name)))?;
    } else {
        writer.write_event(Event::Empty(start))?;
    }
    Ok(())
}

/// Adds the literal attributes to the property element and returns its content.
fn literal_content<'a>(start: &mut BytesStart<'_>, literal: &'a Literal) -> BytesText<'a> {
    if let Some(language) = literal.language() {
        start.push_attribute(("xml:lang", language));
    } else if literal.datatype() == rdf::XML_LITERAL && is_well_formed_fragment(literal.value()) {
        start.push_attribute(("rdf:parseType", "Literal"));
        return BytesText::from_escaped(literal.value());
    } else if !literal.is_plain() {
        start.push_attribute(("rdf:datatype", literal.datatype().as_str()));
    }
    let escaped = quick_xml::escape::escape(literal.value());
    // Carriage returns would be normalized away by XML parsers
    if escaped.contains('\r') {
        BytesText::from_escaped(escaped.replace('\r', "&#13;"))
    } else {
        BytesText::from_escaped(escaped)
    }
}

/// An XML element name for an IRI, with the default namespace to declare if no prefix applies.
struct QualifiedName<'a> {
    name: Cow<'a, str>,
    namespace: Option<&'a str>,
}

fn qualified_name<'a>(
    prefixes: &'a BTreeMap<String, String>,
    iri: &'a str,
) -> Option<QualifiedName<'a>> {
    if let Some(local) = iri.strip_prefix(rdf::NAMESPACE) {
        if is_nc_name(local) {
            return (!RESERVED_RDF_NAMES.contains(&local)).then(|| QualifiedName {
                name: Cow::Owned(format!("rdf:{local}")),
                namespace: None,
            });
        }
    }
    // The longest declared namespace wins
    let declared = prefixes
        .iter()
        .filter_map(|(prefix_name, prefix_iri)| {
            let local = iri.strip_prefix(prefix_iri.as_str())?;
            is_nc_name(local).then_some((prefix_name, prefix_iri.len(), local))
        })
        .max_by_key(|(_, len, _)| *len);
    if let Some((prefix_name, _, local)) = declared {
        return Some(QualifiedName {
            name: Cow::Owned(format!("{prefix_name}:{local}")),
            namespace: None,
        });
    }
    let (namespace, local) = split_iri(iri)?;
    if namespace == xml::NAMESPACE || namespace == xml::XMLNS_NAMESPACE {
        return None;
    }
    Some(QualifiedName {
        name: Cow::Borrowed(local),
        namespace: Some(namespace),
    })
}

/// Checks that the value can be written as the content of an element without changing its meaning.
fn is_well_formed_fragment(value: &str) -> bool {
    let wrapped = format!("<fragment>{value}</fragment>");
    let mut reader = Reader::from_str(&wrapped);
    let mut depth = 0_usize;
    let mut closed = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(_)) if !closed => depth += 1,
            Ok(Event::End(_)) if depth > 0 => {
                depth -= 1;
                closed = depth == 0;
            }
            Ok(Event::Text(text)) if !closed => {
                if text.unescape().is_err() {
                    return false;
                }
            }
            Ok(Event::Empty(_) | Event::CData(_) | Event::Comment(_) | Event::PI(_))
                if !closed => {}
            Ok(Event::Eof) => return closed,
            Ok(_) | Err(_) => return false,
        }
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::vocab::xsd;
    use tessera_model::{BlankNode, ErrorKind, GraphName};

    fn e(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://e/{name}"))
    }

    fn serialize(serializer: RdfXmlSerializer, triples: &[Triple]) -> String {
        let mut serializer = serializer.for_writer(Vec::new());
        for triple in triples {
            serializer.serialize_triple(triple).unwrap();
        }
        String::from_utf8(serializer.finish().unwrap()).unwrap()
    }

    #[test]
    fn empty_document() {
        assert_eq!(
            serialize(RdfXmlSerializer::new(), &[]),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n</rdf:RDF>"
        );
    }

    #[test]
    fn groups_by_subject() {
        let output = serialize(
            RdfXmlSerializer::new().with_prefix("ex", "http://e/").unwrap(),
            &[
                Triple::new(e("s"), e("p"), e("o")),
                Triple::new(e("s"), e("q"), Literal::new_language_tagged_literal_unchecked("a", "en")),
                Triple::new(e("s"), e("q"), Literal::new_typed_literal("1", xsd::INTEGER)),
            ],
        );
        assert_eq!(
            output,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\" xmlns:ex=\"http://e/\">\n\t<rdf:Description rdf:about=\"http://e/s\">\n\t\t<ex:p rdf:resource=\"http://e/o\"/>\n\t\t<ex:q xml:lang=\"en\">a</ex:q>\n\t\t<ex:q rdf:datatype=\"http://www.w3.org/2001/XMLSchema#integer\">1</ex:q>\n\t</rdf:Description>\n</rdf:RDF>"
        );
    }

    #[test]
    fn undeclared_namespaces_use_default_namespace() {
        let output = serialize(
            RdfXmlSerializer::new(),
            &[Triple::new(
                BlankNode::new_unchecked("b"),
                NamedNode::new_unchecked("http://other.example/ns#name"),
                Literal::new_simple_literal("x < y"),
            )],
        );
        assert!(output.contains("<rdf:Description rdf:nodeID=\"b\">"));
        assert!(output.contains("<name xmlns=\"http://other.example/ns#\">x &lt; y</name>"));
    }

    #[test]
    fn typed_node_only_for_single_type() {
        let typed = serialize(
            RdfXmlSerializer::new().with_prefix("ex", "http://e/").unwrap(),
            &[
                Triple::new(e("s"), rdf::TYPE, e("C")),
                Triple::new(e("s"), e("p"), e("o")),
            ],
        );
        assert!(typed.contains("<ex:C rdf:about=\"http://e/s\">"));
        assert!(!typed.contains("rdf:type"));

        let undeclared = serialize(
            RdfXmlSerializer::new(),
            &[Triple::new(e("s"), rdf::TYPE, e("C"))],
        );
        assert!(undeclared.contains("<rdf:Description rdf:about=\"http://e/s\">"));
        assert!(undeclared.contains("<rdf:type rdf:resource=\"http://e/C\"/>"));

        let untyped = serialize(
            RdfXmlSerializer::new().with_prefix("ex", "http://e/").unwrap(),
            &[
                Triple::new(e("s"), rdf::TYPE, e("C")),
                Triple::new(e("s"), rdf::TYPE, e("D")),
            ],
        );
        assert!(untyped.contains("<rdf:Description rdf:about=\"http://e/s\">"));
        assert_eq!(untyped.matches("<rdf:type ").count(), 2);
    }

    #[test]
    fn xml_literals() {
        let output = serialize(
            RdfXmlSerializer::new().with_prefix("ex", "http://e/").unwrap(),
            &[
                Triple::new(e("s"), e("p"), Literal::new_typed_literal("<b>x</b>", rdf::XML_LITERAL)),
                Triple::new(e("s"), e("p"), Literal::new_typed_literal("<b>", rdf::XML_LITERAL)),
            ],
        );
        assert!(output.contains("<ex:p rdf:parseType=\"Literal\"><b>x</b></ex:p>"));

        let undeclared = serialize(
            RdfXmlSerializer::new(),
            &[Triple::new(e("s"), e("p"), Literal::new_typed_literal("<b>x</b>", rdf::XML_LITERAL))],
        );
        assert!(undeclared.contains(
            "<ns0:p xmlns:ns0=\"http://e/\" rdf:parseType=\"Literal\"><b>x</b></ns0:p>"
        ));
        assert!(output.contains(
            "<ex:p rdf:datatype=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral\">&lt;b&gt;</ex:p>"
        ));
    }

    #[test]
    fn fragments() {
        assert!(is_well_formed_fragment(""));
        assert!(is_well_formed_fragment("text <a x=\"1\">b<c/></a> &amp;"));
        assert!(!is_well_formed_fragment("<a>"));
        assert!(!is_well_formed_fragment("</fragment><fragment>"));
        assert!(!is_well_formed_fragment("&unknown;"));
    }

    #[test]
    fn unrepresentable_terms() {
        for triple in [
            Triple::new(Triple::new(e("s"), e("p"), e("o")), e("p"), e("o")),
            Triple::new(e("s"), e("p"), Triple::new(e("s"), e("p"), e("o"))),
            Triple::new(e("s"), NamedNode::new_unchecked("http://e/1"), e("o")),
            Triple::new(e("s"), NamedNode::new_unchecked(format!("{}li", rdf::NAMESPACE)), e("o")),
            Triple::new(e("s"), e("p"), Literal::new_simple_literal("\u{1}")),
        ] {
            let mut serializer = RdfXmlSerializer::new().for_writer(Vec::new());
            assert_eq!(
                serializer.serialize_triple(&triple).unwrap_err().kind(),
                ErrorKind::UnrepresentableInTargetFormat,
                "{triple}"
            );
            // The serializer keeps failing
            assert_eq!(
                serializer
                    .serialize_triple(&Triple::new(e("s"), e("p"), e("o")))
                    .unwrap_err()
                    .kind(),
                ErrorKind::UnrepresentableInTargetFormat
            );
            assert!(serializer.finish().is_err());
        }
    }

    #[test]
    fn named_graphs_are_unrepresentable() {
        let mut serializer = RdfXmlSerializer::new().for_writer(Vec::new());
        let error = serializer
            .serialize_quad(&Quad::new(e("s"), e("p"), e("o"), GraphName::from(e("g"))))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UnrepresentableInTargetFormat);
    }

    #[test]
    fn invalid_prefixes_are_skipped() {
        let output = serialize(
            RdfXmlSerializer::new()
                .with_prefix("1a", "http://e/")
                .unwrap()
                .with_prefix("rdf", "http://e/")
                .unwrap()
                .with_prefix("xmlfoo", "http://e/")
                .unwrap(),
            &[],
        );
        assert!(!output.contains("http://e/"));
        assert!(RdfXmlSerializer::new().with_prefix("ex", "relative").is_err());
    }

    #[test]
    fn qualified_names() {
        let prefixes = BTreeMap::from([
            ("ex".to_owned(), "http://e/".to_owned()),
            ("exa".to_owned(), "http://e/a/".to_owned()),
        ]);
        let name = |iri| qualified_name(&prefixes, iri).map(|n| (n.name.into_owned(), n.namespace));
        assert_eq!(name("http://e/a/b"), Some(("exa:b".into(), None)));
        assert_eq!(name("http://e/b"), Some(("ex:b".into(), None)));
        assert_eq!(
            name("http://f/x.y"),
            Some(("x.y".into(), Some("http://f/")))
        );
        assert_eq!(
            name("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
            Some(("rdf:type".into(), None))
        );
        assert_eq!(name("http://www.w3.org/1999/02/22-rdf-syntax-ns#about"), None);
        assert_eq!(name("http://f/"), None);
    }
}
