use std::collections::BTreeMap;
use tessera_model::{BaseIri, IriParseError, IriResolveError, PrefixEnvironment};
use tracing::debug;

/// Options shared by all the parsers of this crate.
#[derive(Clone)]
pub(crate) struct ParserOptions {
    /// The base IRI and the prefixes declared before the document starts.
    pub env: PrefixEnvironment,
    pub lenient: bool,
    pub rdf_star: bool,
    pub generalized_rdf: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            env: PrefixEnvironment::default(),
            lenient: false,
            rdf_star: true,
            generalized_rdf: false,
        }
    }
}

impl ParserOptions {
    pub fn set_base_iri(
        &mut self,
        base_iri: impl Into<String>,
    ) -> Result<(), IriResolveError> {
        self.env.set_base(BaseIri::parse(base_iri)?);
        Ok(())
    }

    pub fn add_prefix(
        &mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<(), IriParseError> {
        let prefix_iri = oxiri::Iri::parse(prefix_iri.into())?;
        self.env.bind(prefix_name, prefix_iri.into_inner());
        Ok(())
    }

    /// Logs the options that differ from the defaults.
    pub fn log_non_default(&self, format: &'static str) {
        let prefix_count = self.env.iter().count();
        if self.env.base().is_some()
            || prefix_count > 0
            || self.lenient
            || !self.rdf_star
            || self.generalized_rdf
        {
            debug!(
                format,
                base_iri = self.env.base().map(BaseIri::as_str),
                prefixes = prefix_count,
                lenient = self.lenient,
                rdf_star = self.rdf_star,
                generalized_rdf = self.generalized_rdf,
                "Creating a parser with non-default options"
            );
        }
    }
}

/// Options of the Turtle and TriG serializers.
#[derive(Clone, Default)]
pub(crate) struct SerializerOptions {
    pub prefixes: BTreeMap<String, String>,
    pub base_iri: Option<String>,
    pub generalized_rdf: bool,
}

impl SerializerOptions {
    pub fn add_prefix(
        &mut self,
        prefix_name: impl Into<String>,
        prefix_iri: impl Into<String>,
    ) -> Result<(), IriParseError> {
        let prefix_iri = oxiri::Iri::parse(prefix_iri.into())?;
        self.prefixes
            .insert(prefix_name.into(), prefix_iri.into_inner());
        Ok(())
    }

    pub fn set_base_iri(&mut self, base_iri: impl Into<String>) -> Result<(), IriParseError> {
        self.base_iri = Some(oxiri::Iri::parse(base_iri.into())?.into_inner());
        Ok(())
    }
}
