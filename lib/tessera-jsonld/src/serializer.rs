use json_event_parser::{JsonEvent, WriterJsonSerializer};
use oxiri::{Iri, IriParseError};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use tessera_model::vocab::xsd;
use tessera_model::{
    GraphName, NamedNode, NamedOrBlankNode, Predicate, Quad, SerializerError, Subject, Term,
    Triple,
};
use tracing::{debug, warn};

/// A [JSON-LD](https://www.w3.org/TR/json-ld/) serializer.
///
/// Quads are written in the [expanded document form](https://www.w3.org/TR/json-ld/#expanded-document-form):
/// consecutive quads sharing a graph and a subject are grouped in the same node object
/// and the triples of named graphs are nested in `{"@id": ..., "@graph": [...]}` objects.
/// If prefixes are declared, a `@context` is written and IRIs are compacted with them.
///
/// ```
/// use tessera_jsonld::JsonLdSerializer;
/// use tessera_model::{NamedNode, Quad};
/// use tessera_model::vocab::rdf;
///
/// let mut serializer = JsonLdSerializer::new()
///     .with_prefix("schema", "http://schema.org/")?
///     .for_writer(Vec::new());
/// serializer.serialize_quad(&Quad::new(
///     NamedNode::new("http://example.com#me")?,
///     rdf::TYPE,
///     NamedNode::new("http://schema.org/Person")?,
///     NamedNode::new("http://example.com")?,
/// ))?;
/// assert_eq!(
///     b"{\"@context\":{\"schema\":\"http://schema.org/\"},\"@graph\":[{\"@id\":\"http://example.com\",\"@graph\":[{\"@id\":\"http://example.com#me\",\"http://www.w3.org/1999/02/22-rdf-syntax-ns#type\":[{\"@id\":\"schema:Person\"}]}]}]}",
///     serializer.finish()?.as_slice()
/// );
/// # Result::<_,Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Default, Clone)]
#[must_use]
pub struct JsonLdSerializer {
    prefixes: BTreeMap<String, String>,
    base_iri: Option<Iri<String>>,
}

impl JsonLdSerializer {
    /// Builds a new [`JsonLdSerializer`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a prefix in the written `@context`.
    ///
    /// The empty prefix name sets `@vocab`.
    /// Prefixes that can't be used to write compact IRIs are still declared, with a warning.
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, IriParseError> {
        let prefix_name = prefix_name.into();
        let prefix_iri = Iri::parse(prefix_iri.into())?.into_inner();
        if !prefix_name.is_empty() && !is_compaction_prefix(&prefix_name, &prefix_iri) {
            warn!(
                prefix = prefix_name,
                namespace = prefix_iri,
                "This JSON-LD prefix will not be used to compact IRIs"
            );
        }
        self.prefixes.insert(prefix_name, prefix_iri);
        Ok(self)
    }

    /// Writes a `@base` entry in the `@context`.
    ///
    /// IRIs are still written in their absolute form.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, IriParseError> {
        self.base_iri = Some(Iri::parse(base_iri.into())?);
        Ok(self)
    }

    /// Writes a JSON-LD file to a [`Write`] implementation.
    ///
    /// This writer does unbuffered writes. You might want to use [`BufWriter`](std::io::BufWriter) to avoid that.
    pub fn for_writer<W: Write>(self, writer: W) -> WriterJsonLdSerializer<W> {
        if !self.prefixes.is_empty() || self.base_iri.is_some() {
            debug!(
                format = "JSON-LD",
                prefixes = self.prefixes.len(),
                base_iri = self.base_iri.as_ref().map(Iri::as_str),
                "Creating a serializer with non-default options"
            );
        }
        WriterJsonLdSerializer {
            writer: WriterJsonSerializer::new(writer),
            failure: None,
            inner: InnerJsonLdWriter {
                started: false,
                current_graph_name: None,
                current_subject: None,
                current_predicate: None,
                emitted_predicates: BTreeSet::new(),
                compaction_prefixes: self
                    .prefixes
                    .iter()
                    .filter(|(name, iri)| is_compaction_prefix(name, iri))
                    .map(|(name, iri)| (name.clone(), iri.clone()))
                    .collect(),
                prefixes: self.prefixes,
                base_iri: self.base_iri,
            },
        }
    }
}

/// Writes a JSON-LD file to a [`Write`] implementation.
///
/// Can be built using [`JsonLdSerializer::for_writer`].
///
/// Once a call failed the serializer is unusable and every following call returns the same error.
#[must_use]
pub struct WriterJsonLdSerializer<W: Write> {
    writer: WriterJsonSerializer<W>,
    failure: Option<SerializerError>,
    inner: InnerJsonLdWriter,
}

impl<W: Write> WriterJsonLdSerializer<W> {
    /// Writes an extra triple in the default graph.
    pub fn serialize_triple(&mut self, triple: &Triple) -> Result<(), SerializerError> {
        self.serialize_quad(&Quad::new(
            triple.subject.clone(),
            triple.predicate.clone(),
            triple.object.clone(),
            GraphName::DefaultGraph,
        ))
    }

    /// Writes an extra quad.
    ///
    /// Embedded triples and blank node predicates fail with
    /// [`ErrorKind::UnrepresentableInTargetFormat`](tessera_model::ErrorKind::UnrepresentableInTargetFormat).
    pub fn serialize_quad(&mut self, quad: &Quad) -> Result<(), SerializerError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        let mut buffer = Vec::new();
        let result = self
            .inner
            .serialize_quad(quad, &mut buffer)
            .and_then(|()| flush_buffer(&mut self.writer, &mut buffer));
        result.map_err(|error| self.failure.get_or_insert(error).clone())
    }

    /// Ends the write process and returns the underlying [`Write`].
    pub fn finish(mut self) -> Result<W, SerializerError> {
        if let Some(failure) = self.failure.take() {
            return Err(failure);
        }
        let mut buffer = Vec::new();
        self.inner.finish(&mut buffer);
        flush_buffer(&mut self.writer, &mut buffer)?;
        let mut writer = self.writer.finish()?;
        writer.flush()?;
        Ok(writer)
    }
}

fn flush_buffer<W: Write>(
    writer: &mut WriterJsonSerializer<W>,
    buffer: &mut Vec<JsonEvent<'_>>,
) -> Result<(), SerializerError> {
    for event in buffer.drain(..) {
        writer.serialize_event(event)?;
    }
    Ok(())
}

struct InnerJsonLdWriter {
    started: bool,
    current_graph_name: Option<GraphName>,
    current_subject: Option<NamedOrBlankNode>,
    current_predicate: Option<NamedNode>,
    emitted_predicates: BTreeSet<String>,
    prefixes: BTreeMap<String, String>,
    compaction_prefixes: BTreeMap<String, String>,
    base_iri: Option<Iri<String>>,
}

impl InnerJsonLdWriter {
    fn serialize_quad<'a>(
        &mut self,
        quad: &'a Quad,
        output: &mut Vec<JsonEvent<'a>>,
    ) -> Result<(), SerializerError> {
        let subject = match &quad.subject {
            Subject::NamedNode(node) => NamedOrBlankNode::from(node.clone()),
            Subject::BlankNode(node) => node.clone().into(),
            Subject::Triple(_) => {
                return Err(SerializerError::unrepresentable(
                    "JSON-LD cannot store embedded triples",
                ));
            }
        };
        let Predicate::NamedNode(predicate) = &quad.predicate else {
            return Err(SerializerError::unrepresentable(
                "JSON-LD cannot store blank node predicates",
            ));
        };
        if let Term::Triple(_) = &quad.object {
            return Err(SerializerError::unrepresentable(
                "JSON-LD cannot store embedded triples",
            ));
        }
        quad.validate(false)?;

        if !self.started {
            self.serialize_start(output);
            self.started = true;
        }

        if self
            .current_graph_name
            .as_ref()
            .is_some_and(|graph_name| *graph_name != quad.graph_name)
        {
            if self.current_subject.is_some() {
                if self.current_predicate.is_some() {
                    output.push(JsonEvent::EndArray);
                }
                output.push(JsonEvent::EndObject);
            }
            if self
                .current_graph_name
                .as_ref()
                .is_some_and(|g| !g.is_default_graph())
            {
                output.push(JsonEvent::EndArray);
                output.push(JsonEvent::EndObject);
            }
            self.current_graph_name = None;
            self.current_subject = None;
            self.current_predicate = None;
            self.emitted_predicates.clear();
        } else if self
            .current_subject
            .as_ref()
            .is_some_and(|current| *current != subject)
            || (self
                .current_predicate
                .as_ref()
                .is_some_and(|current| current != predicate)
                && self.emitted_predicates.contains(predicate.as_str()))
        {
            // New subject or already used predicate: a new node object is opened
            output.push(JsonEvent::EndArray);
            output.push(JsonEvent::EndObject);
            self.current_subject = None;
            self.emitted_predicates.clear();
            self.current_predicate = None;
        } else if self
            .current_predicate
            .as_ref()
            .is_some_and(|current| current != predicate)
        {
            output.push(JsonEvent::EndArray);
            if let Some(current_predicate) = self.current_predicate.take() {
                self.emitted_predicates
                    .insert(current_predicate.into_string());
            }
        }

        if self.current_graph_name.is_none() {
            match &quad.graph_name {
                GraphName::NamedNode(node) => {
                    self.open_graph(NamedOrBlankNode::from(node.clone()), output);
                }
                GraphName::BlankNode(node) => {
                    self.open_graph(node.clone().into(), output);
                }
                GraphName::DefaultGraph => (),
            }
            self.current_graph_name = Some(quad.graph_name.clone());
        }

        if self.current_subject.is_none() {
            output.push(JsonEvent::StartObject);
            output.push(JsonEvent::ObjectKey("@id".into()));
            output.push(JsonEvent::String(self.id_value(&subject)));
            self.current_subject = Some(subject);
        }

        if self.current_predicate.is_none() {
            output.push(JsonEvent::ObjectKey(self.compact_iri(predicate.as_str())));
            output.push(JsonEvent::StartArray);
            self.current_predicate = Some(predicate.clone());
        }

        self.serialize_term(&quad.object, output);
        Ok(())
    }

    fn open_graph(&self, graph_name: NamedOrBlankNode, output: &mut Vec<JsonEvent<'_>>) {
        output.push(JsonEvent::StartObject);
        output.push(JsonEvent::ObjectKey("@id".into()));
        output.push(JsonEvent::String(self.id_value(&graph_name).into_owned().into()));
        output.push(JsonEvent::ObjectKey("@graph".into()));
        output.push(JsonEvent::StartArray);
    }

    fn has_context(&self) -> bool {
        self.base_iri.is_some() || !self.prefixes.is_empty()
    }

    fn serialize_start(&self, output: &mut Vec<JsonEvent<'_>>) {
        if self.has_context() {
            output.push(JsonEvent::StartObject);
            output.push(JsonEvent::ObjectKey("@context".into()));
            output.push(JsonEvent::StartObject);
            if let Some(base_iri) = &self.base_iri {
                output.push(JsonEvent::ObjectKey("@base".into()));
                output.push(JsonEvent::String(base_iri.as_str().to_owned().into()));
            }
            for (prefix_name, prefix_iri) in &self.prefixes {
                output.push(JsonEvent::ObjectKey(if prefix_name.is_empty() {
                    "@vocab".into()
                } else {
                    prefix_name.clone().into()
                }));
                output.push(JsonEvent::String(prefix_iri.clone().into()));
            }
            output.push(JsonEvent::EndObject);
            output.push(JsonEvent::ObjectKey("@graph".into()));
        }
        output.push(JsonEvent::StartArray);
    }

    fn serialize_term<'a>(&self, term: &'a Term, output: &mut Vec<JsonEvent<'a>>) {
        output.push(JsonEvent::StartObject);
        match term {
            Term::NamedNode(node) => {
                output.push(JsonEvent::ObjectKey("@id".into()));
                output.push(JsonEvent::String(self.compact_iri(node.as_str())));
            }
            Term::BlankNode(node) => {
                output.push(JsonEvent::ObjectKey("@id".into()));
                output.push(JsonEvent::String(format!("_:{}", node.as_str()).into()));
            }
            Term::Literal(literal) => {
                if let Some(language) = literal.language() {
                    output.push(JsonEvent::ObjectKey("@language".into()));
                    output.push(JsonEvent::String(language.into()));
                } else if literal.datatype() != xsd::STRING {
                    output.push(JsonEvent::ObjectKey("@type".into()));
                    output.push(JsonEvent::String(
                        self.compact_iri(literal.datatype().as_str())
                            .into_owned()
                            .into(),
                    ));
                }
                output.push(JsonEvent::ObjectKey("@value".into()));
                output.push(JsonEvent::String(literal.value().into()));
            }
            // Rejected before
            Term::Triple(_) => (),
        }
        output.push(JsonEvent::EndObject);
    }

    fn id_value<'a>(&self, id: &NamedOrBlankNode) -> Cow<'a, str> {
        match id {
            NamedOrBlankNode::NamedNode(node) => self.compact_iri(node.as_str()).into_owned().into(),
            NamedOrBlankNode::BlankNode(node) => format!("_:{}", node.as_str()).into(),
        }
    }

    /// Writes the IRI as `prefix:local` if a declared prefix matches, else unchanged.
    fn compact_iri<'a>(&self, iri: &'a str) -> Cow<'a, str> {
        let best = self
            .compaction_prefixes
            .iter()
            .filter_map(|(name, prefix_iri)| {
                let local = iri.strip_prefix(prefix_iri.as_str())?;
                (!local.is_empty() && !local.starts_with("//")).then_some((name, local))
            })
            .max_by_key(|(name, local)| (usize::MAX - local.len(), usize::MAX - name.len()));
        match best {
            Some((name, local)) => format!("{name}:{local}").into(),
            None => iri.into(),
        }
    }

    fn finish(&mut self, output: &mut Vec<JsonEvent<'static>>) {
        if !self.started {
            self.serialize_start(output);
        }
        if self.current_predicate.is_some() {
            output.push(JsonEvent::EndArray)
        }
        if self.current_subject.is_some() {
            output.push(JsonEvent::EndObject)
        }
        if self
            .current_graph_name
            .as_ref()
            .is_some_and(|g| !g.is_default_graph())
        {
            output.push(JsonEvent::EndArray);
            output.push(JsonEvent::EndObject)
        }
        output.push(JsonEvent::EndArray);
        if self.has_context() {
            output.push(JsonEvent::EndObject);
        }
    }
}

/// A prefix is usable for compaction if reading `name:local` back expands to the same IRI.
fn is_compaction_prefix(name: &str, iri: &str) -> bool {
    !name.is_empty()
        && name != "_"
        && !name.contains([':', '/'])
        && !name.starts_with('@')
        && iri.ends_with([':', '/', '?', '#', '[', ']', '@'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_model::{BlankNode, Literal};

    fn serialize(
        serializer: JsonLdSerializer,
        quads: &[Quad],
    ) -> Result<String, Box<dyn std::error::Error>> {
        let mut writer = serializer.for_writer(Vec::new());
        for quad in quads {
            writer.serialize_quad(quad)?;
        }
        Ok(String::from_utf8(writer.finish()?)?)
    }

    #[test]
    fn groups_by_subject_and_graph() -> Result<(), Box<dyn std::error::Error>> {
        let s = NamedNode::new("http://e/s")?;
        let p = NamedNode::new("http://e/p")?;
        let g = NamedNode::new("http://e/g")?;
        let quads = [
            Quad::new(s.clone(), p.clone(), Literal::new_simple_literal("a"), GraphName::DefaultGraph),
            Quad::new(s.clone(), p.clone(), Literal::new_language_tagged_literal("b", "en")?, GraphName::DefaultGraph),
            Quad::new(s.clone(), p.clone(), BlankNode::new("x")?, g),
        ];
        assert_eq!(
            serialize(JsonLdSerializer::new(), &quads)?,
            r#"[{"@id":"http://e/s","http://e/p":[{"@value":"a"},{"@language":"en","@value":"b"}]},{"@id":"http://e/g","@graph":[{"@id":"http://e/s","http://e/p":[{"@id":"_:x"}]}]}]"#
        );
        Ok(())
    }

    #[test]
    fn compacts_with_prefixes() -> Result<(), Box<dyn std::error::Error>> {
        let quads = [Quad::new(
            NamedNode::new("http://e/s")?,
            NamedNode::new("http://e/p")?,
            Literal::new_typed_literal("1", xsd::INTEGER),
            GraphName::DefaultGraph,
        )];
        assert_eq!(
            serialize(
                JsonLdSerializer::new()
                    .with_prefix("ex", "http://e/")?
                    .with_prefix("xsd", "http://www.w3.org/2001/XMLSchema#")?
                    .with_prefix("not", "http://e/no")?,
                &quads
            )?,
            r#"{"@context":{"ex":"http://e/","not":"http://e/no","xsd":"http://www.w3.org/2001/XMLSchema#"},"@graph":[{"@id":"ex:s","ex:p":[{"@type":"xsd:integer","@value":"1"}]}]}"#
        );
        Ok(())
    }

    #[test]
    fn rejects_blank_node_predicates() -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = JsonLdSerializer::new().for_writer(Vec::new());
        let quad = Quad::new(
            NamedNode::new("http://e/s")?,
            BlankNode::new("p")?,
            NamedNode::new("http://e/o")?,
            GraphName::DefaultGraph,
        );
        let error = writer.serialize_quad(&quad).err();
        assert_eq!(
            error.map(|e| e.kind()),
            Some(tessera_model::ErrorKind::UnrepresentableInTargetFormat)
        );
        assert!(writer.finish().is_err());
        Ok(())
    }

    #[test]
    fn rejects_relative_iris() -> Result<(), Box<dyn std::error::Error>> {
        let mut writer = JsonLdSerializer::new().for_writer(Vec::new());
        let triple = Triple::new(
            NamedNode::new_unchecked("relative"),
            NamedNode::new("http://e/p")?,
            Literal::new_simple_literal("o"),
        );
        assert_eq!(
            writer.serialize_triple(&triple).err().map(|e| e.kind()),
            Some(tessera_model::ErrorKind::InvalidTerm)
        );
        assert_eq!(
            writer.finish().err().map(|e| e.kind()),
            Some(tessera_model::ErrorKind::InvalidTerm)
        );
        Ok(())
    }

    #[test]
    fn empty_output() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(serialize(JsonLdSerializer::new(), &[])?, "[]");
        Ok(())
    }
}
