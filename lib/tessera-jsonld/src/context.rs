use crate::MAX_CONTEXT_RECURSION;
use crate::error::{JsonLdErrorCode, JsonLdSyntaxError};
use crate::json::{JsonNode, json_slice_to_node, pointer_child};
use oxiri::Iri;
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::Arc;
use tessera_model::ErrorKind;
use tracing::debug;

/// Loads a remote JSON-LD document from its URL.
pub type LoadDocumentCallback =
    dyn Fn(&str) -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> + Send + Sync;

/// Returned information about a remote JSON-LD document or context.
pub struct JsonLdRemoteDocument {
    /// The retrieved document
    pub document: Vec<u8>,
    /// The final URL of the loaded document. This is important to handle HTTP redirects properly
    pub document_url: String,
}

#[derive(Default, Clone)]
pub struct JsonLdContext {
    pub base_iri: Option<Iri<String>>,
    pub original_base_url: Option<Iri<String>>,
    pub vocabulary_mapping: Option<String>,
    pub default_language: Option<String>,
    pub default_direction: Option<String>,
    pub term_definitions: HashMap<String, JsonLdTermDefinition>,
    pub previous_context: Option<Box<JsonLdContext>>,
}

impl JsonLdContext {
    pub fn new_empty(original_base_url: Option<Iri<String>>) -> Self {
        Self {
            base_iri: original_base_url.clone(),
            original_base_url,
            ..Self::default()
        }
    }

    /// [IRI Expansion](https://www.w3.org/TR/json-ld-api/#iri-expansion) once all the needed terms are defined.
    ///
    /// Returns `None` if the value is mapped to `null` or is an unknown keyword.
    pub fn expand_iri(
        &self,
        value: &str,
        document_relative: bool,
        vocab: bool,
        lenient: bool,
    ) -> Option<String> {
        // 1)
        if has_keyword_form(value) {
            return is_keyword(value).then(|| value.into());
        }
        // 4) and 5)
        if let Some(term_definition) = self.term_definitions.get(value) {
            match &term_definition.iri_mapping {
                Some(iri_mapping) if vocab || is_keyword(iri_mapping) => {
                    return Some(iri_mapping.clone());
                }
                None if vocab => return None,
                _ => (),
            }
        }
        // 6)
        if let Some((prefix, suffix)) = split_compact_iri(value) {
            // 6.2)
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.into());
            }
            // 6.4)
            if let Some(term_definition) = self.term_definitions.get(prefix) {
                if let Some(iri_mapping) = &term_definition.iri_mapping {
                    if term_definition.prefix_flag {
                        return Some(format!("{iri_mapping}{suffix}"));
                    }
                }
            }
            // 6.5)
            if Iri::parse(value).is_ok() {
                return Some(value.into());
            }
        }
        // 7)
        if vocab {
            if let Some(vocabulary_mapping) = &self.vocabulary_mapping {
                return Some(format!("{vocabulary_mapping}{value}"));
            }
        }
        // 8)
        if document_relative {
            if let Some(base_iri) = &self.base_iri {
                if lenient {
                    return Some(base_iri.resolve_unchecked(value).into_inner());
                } else if let Ok(iri) = base_iri.resolve(value) {
                    return Some(iri.into_inner());
                }
            }
        }
        Some(value.into())
    }

    pub fn has_protected_terms(&self) -> bool {
        self.term_definitions.values().any(|d| d.protected)
    }
}

/// The `@container` values of a term, as a set.
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct Container(u8);

impl Container {
    pub const LIST: Self = Self(1);
    pub const SET: Self = Self(1 << 1);
    pub const INDEX: Self = Self(1 << 2);
    pub const ID: Self = Self(1 << 3);
    pub const TYPE: Self = Self(1 << 4);
    pub const LANGUAGE: Self = Self(1 << 5);
    pub const GRAPH: Self = Self(1 << 6);

    const ALLOWED: [u8; 16] = [
        0,
        Self::LIST.0,
        Self::SET.0,
        Self::INDEX.0,
        Self::ID.0,
        Self::TYPE.0,
        Self::LANGUAGE.0,
        Self::GRAPH.0,
        Self::SET.0 | Self::INDEX.0,
        Self::SET.0 | Self::ID.0,
        Self::SET.0 | Self::TYPE.0,
        Self::SET.0 | Self::LANGUAGE.0,
        Self::GRAPH.0 | Self::ID.0,
        Self::GRAPH.0 | Self::INDEX.0,
        Self::GRAPH.0 | Self::SET.0 | Self::ID.0,
        Self::GRAPH.0 | Self::SET.0 | Self::INDEX.0,
    ];

    fn from_keyword(keyword: &str) -> Option<Self> {
        Some(match keyword {
            "@list" => Self::LIST,
            "@set" => Self::SET,
            "@index" => Self::INDEX,
            "@id" => Self::ID,
            "@type" => Self::TYPE,
            "@language" => Self::LANGUAGE,
            "@graph" => Self::GRAPH,
            _ => return None,
        })
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn is_valid(self) -> bool {
        Self::ALLOWED.contains(&self.0) || self.0 == Self::GRAPH.0 | Self::SET.0
    }
}

#[derive(Clone, PartialEq)]
pub struct JsonLdTermDefinition {
    /// `None` if the term is mapped to `null`
    pub iri_mapping: Option<String>,
    pub prefix_flag: bool,
    pub protected: bool,
    pub reverse_property: bool,
    pub base_url: Option<Iri<String>>,
    pub context: Option<JsonNode>,
    pub container_mapping: Container,
    pub index_mapping: Option<String>,
    // In the following fields, None is unset and Some(None) is set to null
    pub language_mapping: Option<Option<String>>,
    pub direction_mapping: Option<Option<String>>,
    pub nest_value: Option<String>,
    pub type_mapping: Option<String>,
}

impl JsonLdTermDefinition {
    fn new(protected: bool) -> Self {
        Self {
            iri_mapping: None,
            prefix_flag: false,
            protected,
            reverse_property: false,
            base_url: None,
            context: None,
            container_mapping: Container::default(),
            index_mapping: None,
            language_mapping: None,
            direction_mapping: None,
            nest_value: None,
            type_mapping: None,
        }
    }

    /// Equality ignoring the protected flag.
    fn is_same_definition(&self, other: &Self) -> bool {
        let mut other = other.clone();
        other.protected = self.protected;
        *self == other
    }
}

pub struct JsonLdContextProcessor {
    pub lenient: bool,
    pub remote_context_cache: RefCell<HashMap<String, (Option<Iri<String>>, JsonNode)>>,
    pub load_document_callback: Option<Arc<LoadDocumentCallback>>,
}

impl JsonLdContextProcessor {
    /// [Context Processing Algorithm](https://www.w3.org/TR/json-ld-api/#algorithm)
    #[expect(clippy::too_many_arguments)]
    pub fn process_context(
        &self,
        active_context: &JsonLdContext,
        local_context: &JsonNode,
        base_url: Option<&Iri<String>>,
        remote_contexts: &mut Vec<String>,
        override_protected: bool,
        mut propagate: bool,
        validate_scoped_context: bool,
        pointer: &str,
    ) -> Result<JsonLdContext, JsonLdSyntaxError> {
        // 1)
        let mut result = active_context.clone();
        // 2)
        if let JsonNode::Object(local_context) = local_context {
            if let Some(propagate_node) = local_context.get("@propagate") {
                let JsonNode::Boolean(new) = propagate_node else {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidPropagateValue,
                        "@propagate value must be a boolean",
                    )
                    .at(&pointer_child(pointer, "@propagate")));
                };
                propagate = *new;
            }
        }
        // 3)
        if !propagate && result.previous_context.is_none() {
            result.previous_context = Some(Box::new(active_context.clone()));
        }
        // 4) and 5)
        for context in local_context.as_slice() {
            let context = match context {
                // 5.1)
                JsonNode::Null => {
                    // 5.1.1)
                    if !override_protected && result.has_protected_terms() {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidContextNullification,
                            "A context with protected terms can't be set to null",
                        )
                        .at(pointer));
                    }
                    // 5.1.2)
                    let previous_context = result.previous_context.take();
                    result = JsonLdContext::new_empty(active_context.original_base_url.clone());
                    if !propagate {
                        result.previous_context = previous_context;
                    }
                    continue;
                }
                // 5.2)
                JsonNode::String(context) => {
                    let (loaded_base, loaded_context) = self.load_remote_context(
                        context,
                        base_url,
                        remote_contexts,
                        validate_scoped_context,
                        pointer,
                    )?;
                    let Some(loaded_context) = loaded_context else {
                        continue;
                    };
                    // 5.2.6)
                    let processed = self.process_context(
                        &result,
                        &loaded_context,
                        loaded_base.as_ref(),
                        remote_contexts,
                        false,
                        true,
                        validate_scoped_context,
                        pointer,
                    );
                    remote_contexts.pop();
                    result = processed?;
                    continue;
                }
                // 5.3)
                JsonNode::Array(_) | JsonNode::Number(_) | JsonNode::Boolean(_) => {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidLocalContext,
                        "@context value must be null, a string or an object",
                    )
                    .at(pointer));
                }
                // 5.4)
                JsonNode::Object(context) => context,
            };
            let mut context = Cow::Borrowed(context);
            // 5.6)
            if let Some(import) = context.get("@import") {
                let import_pointer = pointer_child(pointer, "@import");
                let JsonNode::String(import) = import else {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidImportValue,
                        "@import value must be a string",
                    )
                    .at(&import_pointer));
                };
                let import_url = self.resolve_context_url(import, base_url, &import_pointer)?;
                let (_, imported) = self.load_document(&import_url, &import_pointer)?;
                let JsonNode::Object(imported) = imported else {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidRemoteContext,
                        format!("The imported context {import_url} must be an object"),
                    )
                    .at(&import_pointer));
                };
                if imported.contains_key("@import") {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidContextEntry,
                        format!("The imported context {import_url} must not contain @import"),
                    )
                    .at(&import_pointer));
                }
                let mut merged = imported;
                for (key, value) in context.iter() {
                    merged.insert(key.clone(), value.clone());
                }
                context = Cow::Owned(merged);
            }
            let mut protected = false;
            for (key, value) in context.iter() {
                let key_pointer = pointer_child(pointer, key);
                match key.as_str() {
                    // 5.5)
                    "@version" => {
                        if !matches!(value, JsonNode::Number(version) if version == "1.1") {
                            return Err(JsonLdSyntaxError::new(
                                JsonLdErrorCode::InvalidVersionValue,
                                "The only supported @version value is 1.1",
                            )
                            .at(&key_pointer));
                        }
                    }
                    // 5.7)
                    "@base" => {
                        if remote_contexts.is_empty() {
                            result.base_iri = match value {
                                // 5.7.2)
                                JsonNode::Null => None,
                                // 5.7.3) and 5.7.4)
                                JsonNode::String(value) => {
                                    Some(self.resolve_base(result.base_iri.as_ref(), value).map_err(
                                        |e| {
                                            JsonLdSyntaxError::new(
                                                JsonLdErrorCode::InvalidBaseIri,
                                                format!("Invalid @base '{value}': {e}"),
                                            )
                                            .with_source(e)
                                            .at(&key_pointer)
                                        },
                                    )?)
                                }
                                _ => {
                                    return Err(JsonLdSyntaxError::new(
                                        JsonLdErrorCode::InvalidBaseIri,
                                        "@base value must be a string",
                                    )
                                    .at(&key_pointer));
                                }
                            };
                        }
                    }
                    // 5.8)
                    "@vocab" => {
                        result.vocabulary_mapping = match value {
                            // 5.8.2)
                            JsonNode::Null => None,
                            // 5.8.3)
                            JsonNode::String(value) => {
                                let Some(vocab) =
                                    result.expand_iri(value, true, true, self.lenient)
                                else {
                                    return Err(JsonLdSyntaxError::new(
                                        JsonLdErrorCode::InvalidVocabMapping,
                                        format!("Invalid @vocab '{value}'"),
                                    )
                                    .at(&key_pointer));
                                };
                                if !self.lenient
                                    && !vocab.starts_with("_:")
                                    && Iri::parse(vocab.as_str()).is_err()
                                {
                                    return Err(JsonLdSyntaxError::new(
                                        JsonLdErrorCode::InvalidVocabMapping,
                                        format!("@vocab must be an IRI or a blank node, found '{vocab}'"),
                                    )
                                    .at(&key_pointer));
                                }
                                Some(vocab)
                            }
                            _ => {
                                return Err(JsonLdSyntaxError::new(
                                    JsonLdErrorCode::InvalidVocabMapping,
                                    "@vocab value must be a string",
                                )
                                .at(&key_pointer));
                            }
                        }
                    }
                    // 5.9)
                    "@language" => {
                        result.default_language = match value {
                            JsonNode::Null => None,
                            JsonNode::String(value) => Some(value.clone()),
                            _ => {
                                return Err(JsonLdSyntaxError::new(
                                    JsonLdErrorCode::InvalidDefaultLanguage,
                                    "@language value must be a string",
                                )
                                .at(&key_pointer));
                            }
                        }
                    }
                    // 5.10)
                    "@direction" => {
                        result.default_direction = parse_direction(value)
                            .map_err(|e| e.at(&key_pointer))?;
                    }
                    // 5.13)
                    "@protected" => {
                        let JsonNode::Boolean(value) = value else {
                            return Err(JsonLdSyntaxError::new(
                                JsonLdErrorCode::InvalidProtectedValue,
                                "@protected value must be a boolean",
                            )
                            .at(&key_pointer));
                        };
                        protected = *value;
                    }
                    _ => (),
                }
            }
            // 5.14)
            let mut defined = HashMap::new();
            for term in context.keys() {
                if matches!(
                    term.as_str(),
                    "@base"
                        | "@direction"
                        | "@import"
                        | "@language"
                        | "@propagate"
                        | "@protected"
                        | "@version"
                        | "@vocab"
                ) {
                    continue;
                }
                self.create_term_definition(
                    &mut result,
                    &context,
                    term,
                    &mut defined,
                    base_url,
                    protected,
                    override_protected,
                    remote_contexts,
                    pointer,
                )?;
            }
        }
        // 6)
        Ok(result)
    }

    /// Steps 5.2.1 to 5.2.5 of context processing.
    ///
    /// Returns `None` if the context has already been processed.
    /// Otherwise the context URL is pushed on `remote_contexts`.
    fn load_remote_context(
        &self,
        context: &str,
        base_url: Option<&Iri<String>>,
        remote_contexts: &mut Vec<String>,
        validate_scoped_context: bool,
        pointer: &str,
    ) -> Result<(Option<Iri<String>>, Option<JsonNode>), JsonLdSyntaxError> {
        // 5.2.1)
        let context = self.resolve_context_url(context, base_url, pointer)?;
        // 5.2.2)
        if !validate_scoped_context && remote_contexts.contains(&context) {
            return Ok((None, None));
        }
        // 5.2.3)
        if remote_contexts.len() >= MAX_CONTEXT_RECURSION {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::ContextOverflow,
                format!(
                    "This processor only allows {MAX_CONTEXT_RECURSION} nested remote contexts, threshold exceeded"
                ),
            )
            .at(pointer));
        }
        // 5.2.4) and 5.2.5)
        let (document_url, document) = self.load_document(&context, pointer)?;
        let JsonNode::Object(mut document) = document else {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::InvalidRemoteContext,
                format!("Remote context {context} must be an object"),
            )
            .at(pointer));
        };
        let Some(loaded_context) = document.remove("@context") else {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::InvalidRemoteContext,
                format!("Remote context {context} must contain a @context key"),
            )
            .at(pointer));
        };
        remote_contexts.push(context);
        Ok((document_url, Some(loaded_context)))
    }

    fn resolve_context_url(
        &self,
        url: &str,
        base_url: Option<&Iri<String>>,
        pointer: &str,
    ) -> Result<String, JsonLdSyntaxError> {
        match base_url {
            Some(base_url) => base_url.resolve(url),
            None => Iri::parse(url.to_owned()),
        }
        .map(Iri::into_inner)
        .map_err(|e| {
            JsonLdSyntaxError::new(
                JsonLdErrorCode::LoadingRemoteContextFailed,
                format!("Invalid remote context URL '{url}': {e}"),
            )
            .with_source(e)
            .at(pointer)
        })
    }

    /// Loads a remote document through the cache.
    fn load_document(
        &self,
        url: &str,
        pointer: &str,
    ) -> Result<(Option<Iri<String>>, JsonNode), JsonLdSyntaxError> {
        if let Some(loaded) = self.remote_context_cache.borrow().get(url) {
            return Ok(loaded.clone());
        }
        let Some(load_document_callback) = &self.load_document_callback else {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::LoadingRemoteContextFailed,
                format!("No loader has been provided to load the remote context {url}"),
            )
            .with_kind(ErrorKind::ContextLoaderUnavailable)
            .at(pointer));
        };
        let remote_document = load_document_callback(url).map_err(|e| {
            JsonLdSyntaxError::new(
                JsonLdErrorCode::LoadingRemoteContextFailed,
                format!("Failed to load remote context {url}: {e}"),
            )
            .at(pointer)
        })?;
        let document = json_slice_to_node(&remote_document.document).map_err(|e| {
            JsonLdSyntaxError::new(
                JsonLdErrorCode::LoadingRemoteContextFailed,
                format!("Failed to parse remote context {url}: {e}"),
            )
            .with_source(e)
            .at(pointer)
        })?;
        let document_url = Iri::parse(remote_document.document_url).ok();
        debug!(
            url,
            document_url = document_url.as_ref().map(Iri::as_str),
            "Loaded a remote JSON-LD context"
        );
        self.remote_context_cache
            .borrow_mut()
            .insert(url.into(), (document_url.clone(), document.clone()));
        Ok((document_url, document))
    }

    fn resolve_base(
        &self,
        current: Option<&Iri<String>>,
        value: &str,
    ) -> Result<Iri<String>, oxiri::IriParseError> {
        if self.lenient {
            return Ok(match current {
                Some(base_iri) => base_iri.resolve_unchecked(value),
                None => Iri::parse_unchecked(value.into()),
            });
        }
        match current {
            Some(base_iri) => base_iri.resolve(value),
            None => Iri::parse(value.into()),
        }
    }

    /// [Create Term Definition](https://www.w3.org/TR/json-ld-api/#create-term-definition)
    #[expect(clippy::too_many_arguments)]
    fn create_term_definition(
        &self,
        active_context: &mut JsonLdContext,
        local_context: &BTreeMap<String, JsonNode>,
        term: &str,
        defined: &mut HashMap<String, bool>,
        base_url: Option<&Iri<String>>,
        protected: bool,
        override_protected: bool,
        remote_contexts: &[String],
        context_pointer: &str,
    ) -> Result<(), JsonLdSyntaxError> {
        let pointer = pointer_child(context_pointer, term);
        // 1)
        if let Some(defined_value) = defined.get(term) {
            if !defined_value {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::CyclicIriMapping,
                    format!("The definition of {term} is cyclic"),
                )
                .at(&pointer));
            }
            return Ok(());
        }
        // 2)
        if term.is_empty() {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::InvalidTermDefinition,
                "@context terms must not be the empty strings",
            )
            .at(&pointer));
        }
        defined.insert(term.into(), false);
        // 3)
        let Some(value) = local_context.get(term) else {
            defined.insert(term.into(), true);
            return Ok(());
        };
        // 4)
        if term == "@type" {
            let is_valid = value.as_object().is_some_and(|map| {
                !map.is_empty()
                    && map.iter().all(|(k, v)| match k.as_str() {
                        "@container" => *v == JsonNode::String("@set".into()),
                        "@protected" => matches!(v, JsonNode::Boolean(_)),
                        _ => false,
                    })
            });
            if !is_valid {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::KeywordRedefinition,
                    "@type can only be redefined with @container: @set and @protected",
                )
                .at(&pointer));
            }
            defined.insert(term.into(), true);
            return Ok(());
        }
        // 5)
        if is_keyword(term) {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::KeywordRedefinition,
                format!("{term} keyword can't be redefined in context"),
            )
            .at(&pointer));
        }
        if has_keyword_form(term) {
            debug!(term, "Ignoring a term having the form of a keyword");
            defined.insert(term.into(), true);
            return Ok(());
        }
        // 6)
        let previous_definition = active_context.term_definitions.remove(term);
        let (value, simple_term) = match value {
            // 7)
            JsonNode::Null => (
                Cow::Owned(BTreeMap::from([("@id".to_owned(), JsonNode::Null)])),
                false,
            ),
            // 8)
            JsonNode::String(id) => (
                Cow::Owned(BTreeMap::from([(
                    "@id".to_owned(),
                    JsonNode::String(id.clone()),
                )])),
                true,
            ),
            // 9)
            JsonNode::Object(map) => (Cow::Borrowed(map), false),
            _ => {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTermDefinition,
                    "Term definition value must be null, a string or a map",
                )
                .at(&pointer));
            }
        };
        // 10)
        let mut definition = JsonLdTermDefinition::new(protected);
        let iri_mapping;
        // 11)
        if let Some(protected) = value.get("@protected") {
            let JsonNode::Boolean(protected) = protected else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidProtectedValue,
                    "@protected value must be a boolean",
                )
                .at(&pointer_child(&pointer, "@protected")));
            };
            definition.protected = *protected;
        }
        // 12)
        if let Some(r#type) = value.get("@type") {
            let type_pointer = pointer_child(&pointer, "@type");
            // 12.1)
            let JsonNode::String(r#type) = r#type else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTypeMapping,
                    "The value of @type in a term definition must be a string",
                )
                .at(&type_pointer));
            };
            // 12.2)
            let expanded = self
                .expand_iri_in_context(
                    active_context,
                    r#type,
                    false,
                    true,
                    local_context,
                    defined,
                    base_url,
                    remote_contexts,
                    context_pointer,
                )?
                .unwrap_or_default();
            // 12.4)
            let is_valid = if has_keyword_form(&expanded) {
                matches!(expanded.as_str(), "@id" | "@json" | "@none" | "@vocab")
            } else {
                !expanded.starts_with("_:")
                    && (self.lenient || Iri::parse(expanded.as_str()).is_ok())
            };
            if !is_valid {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTypeMapping,
                    format!("Invalid @type value in term definition: {type}"),
                )
                .at(&type_pointer));
            }
            // 12.5)
            definition.type_mapping = Some(expanded);
        }
        // 13)
        if let Some(reverse) = value.get("@reverse") {
            let reverse_pointer = pointer_child(&pointer, "@reverse");
            // 13.1)
            if value.contains_key("@id") || value.contains_key("@nest") {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidReverseProperty,
                    "@reverse can't be used together with @id or @nest",
                )
                .at(&reverse_pointer));
            }
            // 13.2)
            let JsonNode::String(reverse) = reverse else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidIriMapping,
                    "@reverse value must be a string",
                )
                .at(&reverse_pointer));
            };
            // 13.3)
            if has_keyword_form(reverse) {
                debug!(term, "Ignoring a reverse term mapped to a keyword-like value");
                defined.insert(term.into(), true);
                return Ok(());
            }
            // 13.4)
            let expanded = self.expand_iri_in_context(
                active_context,
                reverse,
                false,
                true,
                local_context,
                defined,
                base_url,
                remote_contexts,
                context_pointer,
            )?;
            let Some(expanded) = expanded.filter(|iri| iri.contains(':')) else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidIriMapping,
                    format!("{reverse} is not a valid IRI or blank node"),
                )
                .at(&reverse_pointer));
            };
            definition.iri_mapping = Some(expanded);
            // 13.5)
            if let Some(container) = value.get("@container") {
                match container {
                    JsonNode::Null => (),
                    JsonNode::String(c) if c == "@set" || c == "@index" => {
                        definition.container_mapping = Container::from_keyword(c).unwrap_or_default();
                    }
                    _ => {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidReverseProperty,
                            "@reverse is only compatible with @index or @set containers",
                        )
                        .at(&pointer_child(&pointer, "@container")));
                    }
                }
            }
            // 13.6)
            definition.reverse_property = true;
            // 13.7)
            return self.set_term_definition(
                active_context,
                term,
                definition,
                previous_definition,
                defined,
                override_protected,
                &pointer,
            );
        }
        // 14)
        let id = value.get("@id");
        if let Some(id) = id.filter(|id| **id != JsonNode::String(term.into())) {
            let id_pointer = pointer_child(&pointer, "@id");
            match id {
                // 14.1)
                JsonNode::Null => iri_mapping = None,
                JsonNode::String(id) => {
                    // 14.2.2)
                    if !is_keyword(id) && has_keyword_form(id) {
                        debug!(term, "Ignoring a term mapped to a keyword-like value");
                        defined.insert(term.into(), true);
                        return Ok(());
                    }
                    // 14.2.3)
                    let Some(expanded) = self.expand_iri_in_context(
                        active_context,
                        id,
                        false,
                        true,
                        local_context,
                        defined,
                        base_url,
                        remote_contexts,
                        context_pointer,
                    )?
                    else {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidIriMapping,
                            format!("{id} is not a valid IRI"),
                        )
                        .at(&id_pointer));
                    };
                    if expanded == "@context" {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidKeywordAlias,
                            "@context cannot be aliased",
                        )
                        .at(&id_pointer));
                    }
                    if !is_keyword(&expanded) && !expanded.contains(':') {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidIriMapping,
                            format!("{term} must be mapped to an IRI, a blank node or a keyword, found {expanded}"),
                        )
                        .at(&id_pointer));
                    }
                    // 14.2.4)
                    let inner_colon = term
                        .get(1..term.len().saturating_sub(1))
                        .is_some_and(|t| t.contains(':'));
                    if inner_colon || term.contains('/') {
                        // 14.2.4.1)
                        defined.insert(term.into(), true);
                        // 14.2.4.2)
                        let expanded_term = self.expand_iri_in_context(
                            active_context,
                            term,
                            false,
                            true,
                            local_context,
                            defined,
                            base_url,
                            remote_contexts,
                            context_pointer,
                        )?;
                        if expanded_term.as_deref() != Some(expanded.as_str()) {
                            return Err(JsonLdSyntaxError::new(
                                JsonLdErrorCode::InvalidIriMapping,
                                format!("{term} looks like an IRI that differs from its mapping {expanded}"),
                            )
                            .at(&id_pointer));
                        }
                    }
                    // 14.2.5)
                    if !term.contains(':')
                        && !term.contains('/')
                        && simple_term
                        && (expanded.ends_with([':', '/', '?', '#', '[', ']', '@'])
                            || expanded.starts_with("_:"))
                    {
                        definition.prefix_flag = true;
                    }
                    iri_mapping = Some(expanded);
                }
                _ => {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidIriMapping,
                        "@id value in a term definition must be a string or null",
                    )
                    .at(&id_pointer));
                }
            }
        } else if let Some((prefix, suffix)) = split_compact_iri(term) {
            // 15)
            if local_context.contains_key(prefix) {
                // 15.1)
                self.create_term_definition(
                    active_context,
                    local_context,
                    prefix,
                    defined,
                    base_url,
                    protected,
                    false,
                    remote_contexts,
                    context_pointer,
                )?;
            }
            iri_mapping = Some(
                match active_context
                    .term_definitions
                    .get(prefix)
                    .and_then(|d| d.iri_mapping.as_ref())
                {
                    // 15.2)
                    Some(prefix_iri) => format!("{prefix_iri}{suffix}"),
                    // 15.3)
                    None => term.into(),
                },
            );
        } else if term.contains('/') {
            // 16)
            let expanded = active_context.expand_iri(term, false, true, self.lenient);
            let Some(expanded) = expanded.filter(|iri| Iri::parse(iri.as_str()).is_ok()) else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidIriMapping,
                    format!("The relative IRI term {term} can't be expanded to an IRI"),
                )
                .at(&pointer));
            };
            iri_mapping = Some(expanded);
        } else if let Some(vocabulary_mapping) = &active_context.vocabulary_mapping {
            // 18)
            iri_mapping = Some(format!("{vocabulary_mapping}{term}"));
        } else {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::InvalidIriMapping,
                format!("No @vocab to build an IRI for the term {term}"),
            )
            .at(&pointer));
        }
        definition.iri_mapping = iri_mapping;
        // 19)
        if let Some(container) = value.get("@container") {
            let container_pointer = pointer_child(&pointer, "@container");
            let mut mapping = Container::default();
            for item in container.as_slice() {
                let JsonNode::String(item) = item else {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidContainerMapping,
                        "@container values must be strings",
                    )
                    .at(&container_pointer));
                };
                let Some(item) = Container::from_keyword(item) else {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidContainerMapping,
                        format!("{item} is not a valid @container value"),
                    )
                    .at(&container_pointer));
                };
                mapping.0 |= item.0;
            }
            if !mapping.is_valid() || mapping.is_empty() {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidContainerMapping,
                    "Invalid combination of @container values",
                )
                .at(&container_pointer));
            }
            // 19.4)
            if mapping.contains(Container::TYPE) {
                match definition.type_mapping.as_deref() {
                    None => definition.type_mapping = Some("@id".into()),
                    Some("@id" | "@vocab") => (),
                    Some(_) => {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidTypeMapping,
                            "Type maps require the term to have @id or @vocab as @type",
                        )
                        .at(&container_pointer));
                    }
                }
            }
            definition.container_mapping = mapping;
        }
        // 20)
        if let Some(index) = value.get("@index") {
            let index_pointer = pointer_child(&pointer, "@index");
            let JsonNode::String(index) = index else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTermDefinition,
                    "@index value must be a string",
                )
                .at(&index_pointer));
            };
            let is_iri = active_context
                .expand_iri(index, false, true, self.lenient)
                .is_some_and(|iri| !has_keyword_form(&iri) && iri.contains(':'));
            if !definition.container_mapping.contains(Container::INDEX) || !is_iri {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTermDefinition,
                    "@index requires an @index container and must expand to an IRI",
                )
                .at(&index_pointer));
            }
            definition.index_mapping = Some(index.clone());
        }
        // 21)
        if let Some(context) = value.get("@context") {
            let context_pointer = pointer_child(&pointer, "@context");
            // 21.3)
            self.process_context(
                active_context,
                context,
                base_url,
                &mut remote_contexts.to_vec(),
                true,
                true,
                false,
                &context_pointer,
            )
            .map_err(|e| {
                let message = format!("Invalid scoped context: {}", e.message());
                JsonLdSyntaxError::new(JsonLdErrorCode::InvalidScopedContext, message)
                    .with_kind(e.kind())
                    .at(e.pointer())
            })?;
            // 21.4)
            definition.context = Some(context.clone());
            definition.base_url = base_url.cloned();
        }
        // 22)
        if let Some(language) = value.get("@language") {
            if value.contains_key("@type") {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidLanguageMapping,
                    "Both @language and @type can't be set at the same time",
                )
                .at(&pointer));
            }
            definition.language_mapping = Some(match language {
                JsonNode::String(language) => Some(language.clone()),
                JsonNode::Null => None,
                _ => {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidLanguageMapping,
                        "@language value must be a string or null",
                    )
                    .at(&pointer_child(&pointer, "@language")));
                }
            });
        }
        // 23)
        if let Some(direction) = value.get("@direction") {
            if value.contains_key("@type") {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidBaseDirection,
                    "Both @direction and @type can't be set at the same time",
                )
                .at(&pointer));
            }
            definition.direction_mapping = Some(
                parse_direction(direction)
                    .map_err(|e| e.at(&pointer_child(&pointer, "@direction")))?,
            );
        }
        // 24)
        if let Some(nest) = value.get("@nest") {
            match nest {
                JsonNode::String(nest) if nest == "@nest" || !has_keyword_form(nest) => {
                    definition.nest_value = Some(nest.clone());
                }
                _ => {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidNestValue,
                        "@nest value must be a string that is not a keyword other than @nest",
                    )
                    .at(&pointer_child(&pointer, "@nest")));
                }
            }
        }
        // 25)
        if let Some(prefix) = value.get("@prefix") {
            let prefix_pointer = pointer_child(&pointer, "@prefix");
            if term.contains(':') || term.contains('/') {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTermDefinition,
                    "@prefix can't be set on compact IRI or IRI terms",
                )
                .at(&prefix_pointer));
            }
            let JsonNode::Boolean(prefix) = prefix else {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidPrefixValue,
                    "@prefix value must be a boolean",
                )
                .at(&prefix_pointer));
            };
            if *prefix
                && definition
                    .iri_mapping
                    .as_deref()
                    .is_some_and(is_keyword)
            {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidTermDefinition,
                    "A keyword alias can't be used as a prefix",
                )
                .at(&prefix_pointer));
            }
            definition.prefix_flag = *prefix;
        }
        // 26)
        if let Some(key) = value.keys().find(|key| {
            !matches!(
                key.as_str(),
                "@id"
                    | "@reverse"
                    | "@container"
                    | "@context"
                    | "@direction"
                    | "@index"
                    | "@language"
                    | "@nest"
                    | "@prefix"
                    | "@protected"
                    | "@type"
            )
        }) {
            return Err(JsonLdSyntaxError::new(
                JsonLdErrorCode::InvalidTermDefinition,
                format!("Unexpected key in term definition '{key}'"),
            )
            .at(&pointer_child(&pointer, key)));
        }
        self.set_term_definition(
            active_context,
            term,
            definition,
            previous_definition,
            defined,
            override_protected,
            &pointer,
        )
    }

    /// Steps 27 and 28 of term definition creation
    fn set_term_definition(
        &self,
        active_context: &mut JsonLdContext,
        term: &str,
        mut definition: JsonLdTermDefinition,
        previous_definition: Option<JsonLdTermDefinition>,
        defined: &mut HashMap<String, bool>,
        override_protected: bool,
        pointer: &str,
    ) -> Result<(), JsonLdSyntaxError> {
        // 27)
        if !override_protected {
            if let Some(previous_definition) = previous_definition {
                if previous_definition.protected {
                    // 27.1)
                    if !definition.is_same_definition(&previous_definition) {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::ProtectedTermRedefinition,
                            format!("Overriding the protected term {term}"),
                        )
                        .at(pointer));
                    }
                    // 27.2)
                    definition = previous_definition;
                }
            }
        }
        // 28)
        active_context
            .term_definitions
            .insert(term.into(), definition);
        defined.insert(term.into(), true);
        Ok(())
    }

    /// IRI expansion that first defines the terms of the local context the value depends on.
    #[expect(clippy::too_many_arguments)]
    fn expand_iri_in_context(
        &self,
        active_context: &mut JsonLdContext,
        value: &str,
        document_relative: bool,
        vocab: bool,
        local_context: &BTreeMap<String, JsonNode>,
        defined: &mut HashMap<String, bool>,
        base_url: Option<&Iri<String>>,
        remote_contexts: &[String],
        context_pointer: &str,
    ) -> Result<Option<String>, JsonLdSyntaxError> {
        if !has_keyword_form(value) {
            // 3)
            if local_context.contains_key(value) && defined.get(value) != Some(&true) {
                self.create_term_definition(
                    active_context,
                    local_context,
                    value,
                    defined,
                    base_url,
                    false,
                    false,
                    remote_contexts,
                    context_pointer,
                )?;
            }
            // 6.3)
            if let Some((prefix, _)) = split_compact_iri(value) {
                if local_context.contains_key(prefix) && defined.get(prefix) != Some(&true) {
                    self.create_term_definition(
                        active_context,
                        local_context,
                        prefix,
                        defined,
                        base_url,
                        false,
                        false,
                        remote_contexts,
                        context_pointer,
                    )?;
                }
            }
        }
        Ok(active_context.expand_iri(value, document_relative, vocab, self.lenient))
    }
}

fn parse_direction(value: &JsonNode) -> Result<Option<String>, JsonLdSyntaxError> {
    match value {
        JsonNode::Null => Ok(None),
        JsonNode::String(direction) if direction == "ltr" || direction == "rtl" => {
            Ok(Some(direction.clone()))
        }
        _ => Err(JsonLdSyntaxError::new(
            JsonLdErrorCode::InvalidBaseDirection,
            "@direction value must be null, \"ltr\" or \"rtl\"",
        )),
    }
}

/// Splits `prefix:suffix` if the colon is not the first character.
fn split_compact_iri(value: &str) -> Option<(&str, &str)> {
    value.split_once(':').filter(|(prefix, _)| !prefix.is_empty())
}

pub fn has_keyword_form(value: &str) -> bool {
    value
        .strip_prefix('@')
        .is_some_and(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_alphabetic()))
}

pub fn is_keyword(value: &str) -> bool {
    matches!(
        value,
        "@base"
            | "@container"
            | "@context"
            | "@direction"
            | "@graph"
            | "@id"
            | "@import"
            | "@included"
            | "@index"
            | "@json"
            | "@language"
            | "@list"
            | "@nest"
            | "@none"
            | "@prefix"
            | "@propagate"
            | "@protected"
            | "@reverse"
            | "@set"
            | "@type"
            | "@value"
            | "@version"
            | "@vocab"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::json_slice_to_node;

    fn processor() -> JsonLdContextProcessor {
        JsonLdContextProcessor {
            lenient: false,
            remote_context_cache: RefCell::default(),
            load_document_callback: None,
        }
    }

    fn process(context: &str) -> Result<JsonLdContext, JsonLdSyntaxError> {
        let context = json_slice_to_node(context.as_bytes()).map_err(JsonLdSyntaxError::from)?;
        processor().process_context(
            &JsonLdContext::new_empty(Iri::parse("http://example.com/doc".into()).ok()),
            &context,
            None,
            &mut Vec::new(),
            false,
            true,
            true,
            "/@context",
        )
    }

    #[test]
    fn prefixes_and_vocab() -> Result<(), JsonLdSyntaxError> {
        let context = process(
            r#"{"@vocab": "http://v/", "ex": "http://e/", "name": "ex:name", "knows": {"@id": "ex:knows", "@type": "@id"}}"#,
        )?;
        assert_eq!(
            context.expand_iri("ex:a", false, true, false).as_deref(),
            Some("http://e/a")
        );
        assert_eq!(
            context.expand_iri("name", false, true, false).as_deref(),
            Some("http://e/name")
        );
        assert_eq!(
            context.expand_iri("other", false, true, false).as_deref(),
            Some("http://v/other")
        );
        assert_eq!(
            context.expand_iri("rel", true, false, false).as_deref(),
            Some("http://example.com/rel")
        );
        assert!(context.term_definitions["ex"].prefix_flag);
        assert!(!context.term_definitions["name"].prefix_flag);
        assert_eq!(
            context.term_definitions["knows"].type_mapping.as_deref(),
            Some("@id")
        );
        Ok(())
    }

    #[test]
    fn null_terms_are_dropped() -> Result<(), JsonLdSyntaxError> {
        let context = process(r#"{"@vocab": "http://v/", "hidden": null}"#)?;
        assert_eq!(context.expand_iri("hidden", false, true, false), None);
        assert_eq!(context.expand_iri("@unknown", false, true, false), None);
        Ok(())
    }

    #[test]
    fn cyclic_definitions() {
        let error = process(r#"{"a": "b:x", "b": "a:y"}"#).err();
        assert_eq!(
            error.and_then(|e| e.code()),
            Some(JsonLdErrorCode::CyclicIriMapping)
        );
    }

    #[test]
    fn protected_terms() {
        let error = process(
            r#"[{"@protected": true, "p": "http://e/p"}, {"p": "http://e/other"}]"#,
        )
        .err();
        assert_eq!(
            error.and_then(|e| e.code()),
            Some(JsonLdErrorCode::ProtectedTermRedefinition)
        );
        assert!(
            process(r#"[{"@protected": true, "p": "http://e/p"}, {"p": "http://e/p"}]"#).is_ok()
        );
        let error = process(r#"[{"@protected": true, "p": "http://e/p"}, null]"#).err();
        assert_eq!(
            error.and_then(|e| e.code()),
            Some(JsonLdErrorCode::InvalidContextNullification)
        );
    }

    #[test]
    fn invalid_containers() {
        let error = process(r#"{"p": {"@id": "http://e/p", "@container": ["@list", "@set"]}}"#)
            .err();
        assert_eq!(
            error.as_ref().and_then(JsonLdSyntaxError::code),
            Some(JsonLdErrorCode::InvalidContainerMapping)
        );
        assert_eq!(
            error.as_ref().map(JsonLdSyntaxError::pointer),
            Some("/@context/p/@container")
        );
        assert!(
            process(r#"{"p": {"@id": "http://e/p", "@container": ["@graph", "@id"]}}"#).is_ok()
        );
    }

    #[test]
    fn remote_contexts() -> Result<(), JsonLdSyntaxError> {
        let error = process(r#""http://e/context""#).err();
        assert_eq!(
            error.map(|e| e.kind()),
            Some(ErrorKind::ContextLoaderUnavailable)
        );

        let mut processor = processor();
        processor.load_document_callback = Some(Arc::new(
            |url: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
            if url == "http://e/context" {
                Ok(JsonLdRemoteDocument {
                    document: br#"{"@context": {"ex": "http://e/"}}"#.to_vec(),
                    document_url: url.into(),
                })
            } else {
                Err("not found".into())
            }
        },
        ));
        let context = processor.process_context(
            &JsonLdContext::default(),
            &JsonNode::String("http://e/context".into()),
            None,
            &mut Vec::new(),
            false,
            true,
            true,
            "",
        )?;
        assert_eq!(
            context.expand_iri("ex:a", false, true, false).as_deref(),
            Some("http://e/a")
        );
        assert_eq!(processor.remote_context_cache.borrow().len(), 1);
        let error = processor
            .process_context(
                &JsonLdContext::default(),
                &JsonNode::String("http://e/missing".into()),
                None,
                &mut Vec::new(),
                false,
                true,
                true,
                "",
            )
            .err();
        assert_eq!(error.map(|e| e.kind()), Some(ErrorKind::RemoteContextFailed));
        Ok(())
    }

    #[test]
    fn recursive_remote_contexts() {
        let mut processor = processor();
        processor.load_document_callback = Some(Arc::new(
            |url: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
            let next = url.len();
            Ok(JsonLdRemoteDocument {
                document: format!(r#"{{"@context": "http://e/{next}"}}"#).into_bytes(),
                document_url: url.into(),
            })
        },
        ));
        let error = processor
            .process_context(
                &JsonLdContext::default(),
                &JsonNode::String("http://e/0".into()),
                None,
                &mut Vec::new(),
                false,
                true,
                true,
                "",
            )
            .err();
        assert_eq!(
            error.and_then(|e| e.code()),
            Some(JsonLdErrorCode::ContextOverflow)
        );
    }
}
