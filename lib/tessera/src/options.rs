use crate::error::CodecOptionsError;
use crate::parser::RdfParser;
use crate::serializer::RdfSerializer;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;
use tessera_jsonld::{JsonLdRemoteDocument, LoadDocumentCallback};
use tessera_model::{BaseIri, NamedNode};

/// The options shared by all the codecs.
///
/// Options that do not make sense for a format are ignored by it:
/// prefixes are only used by the Turtle, TriG, RDF/XML and JSON-LD codecs
/// and the remote context loader is only used by the JSON-LD parser.
///
/// ```
/// use tessera::{CodecOptions, RdfFormat};
///
/// let options = CodecOptions::new()
///     .with_base_iri("http://example.com/")?
///     .with_prefix("ex", "http://example.com/ns#")?;
/// let quads = options
///     .apply_to_parser(RdfFormat::Turtle.into())?
///     .for_slice("<s> ex:p ex:o .")
///     .collect::<Result<Vec<_>, _>>()?;
/// assert_eq!(quads[0].object.to_string(), "<http://example.com/ns#o>");
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Clone)]
#[must_use]
pub struct CodecOptions {
    base_iri: Option<BaseIri>,
    strict: bool,
    rdf_star: bool,
    generalized_rdf: bool,
    prefixes: BTreeMap<String, String>,
    remote_context_loader: Option<Arc<LoadDocumentCallback>>,
}

impl Default for CodecOptions {
    #[inline]
    fn default() -> Self {
        Self {
            base_iri: None,
            strict: true,
            rdf_star: true,
            generalized_rdf: false,
            prefixes: BTreeMap::new(),
            remote_context_loader: None,
        }
    }
}

impl CodecOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the IRI used to resolve relative IRIs and written by the serializers that support it.
    ///
    /// Fails with [`ErrorKind::InvalidBase`](tessera_model::ErrorKind::InvalidBase) if the IRI is not absolute.
    #[inline]
    pub fn with_base_iri(mut self, base_iri: impl Into<String>) -> Result<Self, CodecOptionsError> {
        self.base_iri = Some(BaseIri::parse(base_iri)?);
        Ok(self)
    }

    /// Declares a prefix, used by parsers as if declared at the start of the document
    /// and by serializers to abbreviate IRIs.
    ///
    /// Fails with [`ErrorKind::InvalidIri`](tessera_model::ErrorKind::InvalidIri) if the IRI is not valid.
    #[inline]
    pub fn with_prefix(
        mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<Self, CodecOptionsError> {
        let prefix_name = prefix_name.into();
        let prefix_iri = prefix_iri.into();
        if let Err(error) = NamedNode::new(prefix_iri.as_str()) {
            return Err(CodecOptionsError::InvalidPrefix {
                prefix: prefix_name,
                iri: prefix_iri,
                error,
            });
        }
        self.prefixes.insert(prefix_name, prefix_iri);
        Ok(self)
    }

    /// Skips IRI and language tag validation.
    #[inline]
    pub fn lenient(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Rejects RDF-star embedded triples.
    #[inline]
    pub fn without_rdf_star(mut self) -> Self {
        self.rdf_star = false;
        self
    }

    /// Allows blank nodes in predicate position.
    #[inline]
    pub fn with_generalized_rdf(mut self) -> Self {
        self.generalized_rdf = true;
        self
    }

    /// Sets the function used by the JSON-LD parser to load remote contexts.
    #[inline]
    pub fn with_remote_context_loader(
        mut self,
        loader: impl Fn(&str) -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.remote_context_loader = Some(Arc::new(loader));
        self
    }

    #[inline]
    pub fn base_iri(&self) -> Option<&str> {
        self.base_iri.as_ref().map(BaseIri::as_str)
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[inline]
    pub fn prefixes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes
            .iter()
            .map(|(name, iri)| (name.as_str(), iri.as_str()))
    }

    /// Configures a parser with these options.
    pub fn apply_to_parser(&self, mut parser: RdfParser) -> Result<RdfParser, CodecOptionsError> {
        if let Some(base_iri) = &self.base_iri {
            parser = parser.with_base_iri(base_iri.as_str())?;
        }
        for (prefix_name, prefix_iri) in &self.prefixes {
            parser = parser
                .with_prefix(prefix_name.as_str(), prefix_iri.as_str())
                .map_err(|error| CodecOptionsError::InvalidPrefix {
                    prefix: prefix_name.clone(),
                    iri: prefix_iri.clone(),
                    error,
                })?;
        }
        if !self.strict {
            parser = parser.lenient();
        }
        if !self.rdf_star {
            parser = parser.without_rdf_star();
        }
        if self.generalized_rdf {
            parser = parser.with_generalized_rdf();
        }
        if let Some(loader) = &self.remote_context_loader {
            parser = parser.with_shared_load_document_callback(Arc::clone(loader));
        }
        Ok(parser)
    }

    /// Configures a serializer with these options.
    pub fn apply_to_serializer(
        &self,
        mut serializer: RdfSerializer,
    ) -> Result<RdfSerializer, CodecOptionsError> {
        if let Some(base_iri) = &self.base_iri {
            serializer = serializer
                .with_base_iri(base_iri.as_str())
                .map_err(|error| CodecOptionsError::InvalidBase {
                    iri: base_iri.to_string(),
                    error: Box::new(error),
                })?;
        }
        for (prefix_name, prefix_iri) in &self.prefixes {
            serializer = serializer
                .with_prefix(prefix_name.as_str(), prefix_iri.as_str())
                .map_err(|error| CodecOptionsError::InvalidPrefix {
                    prefix: prefix_name.clone(),
                    iri: prefix_iri.clone(),
                    error,
                })?;
        }
        if self.generalized_rdf {
            serializer = serializer.with_generalized_rdf();
        }
        Ok(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RdfFormat;
    use tessera_model::ErrorKind;

    #[test]
    fn defaults() {
        let options = CodecOptions::new();
        assert!(options.is_strict());
        assert!(options.rdf_star);
        assert!(!options.generalized_rdf);
        assert_eq!(options.base_iri(), None);
        assert_eq!(options.prefixes().count(), 0);
    }

    #[test]
    fn invalid_values_are_reported_eagerly() {
        let error = CodecOptions::new().with_base_iri("relative/path").err();
        assert_eq!(error.map(|e| e.kind()), Some(ErrorKind::InvalidBase));
        let error = CodecOptions::new().with_prefix("ex", "not an iri").err();
        assert_eq!(error.map(|e| e.kind()), Some(ErrorKind::InvalidIri));
    }

    #[test]
    fn prefixes_are_sorted() -> Result<(), CodecOptionsError> {
        let options = CodecOptions::new()
            .with_prefix("z", "http://z.example/")?
            .with_prefix("a", "http://a.example/")?;
        assert_eq!(
            options.prefixes().collect::<Vec<_>>(),
            [("a", "http://a.example/"), ("z", "http://z.example/")]
        );
        Ok(())
    }

    #[test]
    fn rdf_star_can_be_disabled() -> Result<(), Box<dyn std::error::Error>> {
        let parser = CodecOptions::new()
            .without_rdf_star()
            .apply_to_parser(RdfFormat::NTriples.into())?;
        let error = parser
            .for_slice("<< <http://e/s> <http://e/p> <http://e/o> >> <http://e/p> <http://e/o> .")
            .next()
            .and_then(Result::err);
        assert_eq!(error.map(|e| e.kind()), Some(ErrorKind::UnsupportedFeature));
        Ok(())
    }
}
