use crate::context::{Container, JsonLdContext, JsonLdContextProcessor, is_keyword};
use crate::error::{JsonLdErrorCode, JsonLdSyntaxError};
use crate::json::{JsonNode, pointer_child};
use oxiri::Iri;
use std::borrow::Cow;
use std::collections::BTreeMap;

type JsonMap = BTreeMap<String, JsonNode>;

/// Implements the [Expansion Algorithm](https://www.w3.org/TR/json-ld-api/#expansion-algorithm).
///
/// The output is the expanded document form, kept as a JSON tree.
pub struct JsonLdExpander {
    pub processor: JsonLdContextProcessor,
    pub base_url: Option<Iri<String>>,
}

impl JsonLdExpander {
    /// Expands a full document into its list of top-level objects.
    pub fn expand_document(&self, document: &JsonNode) -> Result<Vec<JsonNode>, JsonLdSyntaxError> {
        let context = JsonLdContext::new_empty(self.base_url.clone());
        Ok(match self.expand(&context, None, document, false, "")? {
            Some(JsonNode::Object(mut object))
                if object.len() == 1 && object.contains_key("@graph") =>
            {
                into_vec(object.remove("@graph"))
            }
            expanded => into_vec(expanded),
        })
    }

    /// The context in force at the root of the document, used to report prefixes.
    pub fn root_context(&self, document: &JsonNode) -> Result<JsonLdContext, JsonLdSyntaxError> {
        let context = JsonLdContext::new_empty(self.base_url.clone());
        let Some(local_context) = document.as_object().and_then(|o| o.get("@context")) else {
            return Ok(context);
        };
        self.processor.process_context(
            &context,
            local_context,
            self.base_url.as_ref(),
            &mut Vec::new(),
            false,
            true,
            true,
            "/@context",
        )
    }

    fn expand(
        &self,
        active_context: &JsonLdContext,
        active_property: Option<&str>,
        element: &JsonNode,
        from_map: bool,
        pointer: &str,
    ) -> Result<Option<JsonNode>, JsonLdSyntaxError> {
        let property_definition =
            active_property.and_then(|p| active_context.term_definitions.get(p));
        match element {
            // 1)
            JsonNode::Null => Ok(None),
            // 4)
            JsonNode::String(_) | JsonNode::Number(_) | JsonNode::Boolean(_) => {
                // 4.1)
                if active_property.is_none_or(|p| p == "@graph") {
                    return Ok(None);
                }
                // 4.2)
                if let Some(definition) = property_definition {
                    if let Some(context) = &definition.context {
                        let scoped_context = self.processor.process_context(
                            active_context,
                            context,
                            definition.base_url.as_ref(),
                            &mut Vec::new(),
                            false,
                            true,
                            true,
                            pointer,
                        )?;
                        return Ok(Some(self.expand_value(
                            &scoped_context,
                            active_property,
                            element,
                        )));
                    }
                }
                // 4.3)
                Ok(Some(self.expand_value(
                    active_context,
                    active_property,
                    element,
                )))
            }
            // 5)
            JsonNode::Array(items) => {
                let is_list = property_definition
                    .is_some_and(|d| d.container_mapping.contains(Container::LIST));
                let mut result = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    let item_pointer = pointer_child(pointer, &i.to_string());
                    match self.expand(active_context, active_property, item, from_map, &item_pointer)? {
                        // 5.2.2)
                        Some(JsonNode::Array(expanded)) if is_list => {
                            result.push(list_object(expanded));
                        }
                        // 5.2.3)
                        Some(JsonNode::Array(expanded)) => result.extend(expanded),
                        Some(expanded) => result.push(expanded),
                        None => (),
                    }
                }
                Ok(Some(JsonNode::Array(result)))
            }
            JsonNode::Object(element) => {
                self.expand_object(active_context, active_property, element, from_map, pointer)
            }
        }
    }

    fn expand_object(
        &self,
        active_context: &JsonLdContext,
        active_property: Option<&str>,
        element: &JsonMap,
        from_map: bool,
        pointer: &str,
    ) -> Result<Option<JsonNode>, JsonLdSyntaxError> {
        let property_definition =
            active_property.and_then(|p| active_context.term_definitions.get(p));
        let mut active_context = Cow::Borrowed(active_context);
        // 7)
        if !from_map {
            let reverted = active_context.previous_context.as_ref().filter(|_| {
                let has_value = element
                    .keys()
                    .any(|k| self.expand_key(&active_context, k).as_deref() == Some("@value"));
                let only_id = element.len() == 1
                    && element
                        .keys()
                        .all(|k| self.expand_key(&active_context, k).as_deref() == Some("@id"));
                !has_value && !only_id
            });
            if let Some(previous_context) = reverted {
                active_context = Cow::Owned(previous_context.as_ref().clone());
            }
        }
        // 8)
        if let Some(definition) = property_definition {
            if let Some(context) = &definition.context {
                active_context = Cow::Owned(self.processor.process_context(
                    &active_context,
                    context,
                    definition.base_url.as_ref(),
                    &mut Vec::new(),
                    true,
                    true,
                    true,
                    pointer,
                )?);
            }
        }
        // 9)
        if let Some(local_context) = element.get("@context") {
            active_context = Cow::Owned(self.processor.process_context(
                &active_context,
                local_context,
                self.base_url.as_ref(),
                &mut Vec::new(),
                false,
                true,
                true,
                &pointer_child(pointer, "@context"),
            )?);
        }
        // 10)
        let type_scoped_context = active_context.clone();
        // 11)
        let mut input_type = None;
        for (key, value) in element {
            if self.expand_key(&active_context, key).as_deref() != Some("@type") {
                continue;
            }
            let mut terms = value
                .as_slice()
                .iter()
                .filter_map(|v| match v {
                    JsonNode::String(v) => Some(v.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>();
            // 12)
            if input_type.is_none() {
                input_type = terms
                    .last()
                    .and_then(|t| active_context.expand_iri(t, false, true, self.processor.lenient));
            }
            terms.sort_unstable();
            for term in terms {
                let Some(definition) = type_scoped_context.term_definitions.get(term) else {
                    continue;
                };
                if let Some(context) = &definition.context {
                    active_context = Cow::Owned(self.processor.process_context(
                        &active_context,
                        context,
                        definition.base_url.as_ref(),
                        &mut Vec::new(),
                        false,
                        false,
                        true,
                        &pointer_child(pointer, key),
                    )?);
                }
            }
        }
        // 13) and 14)
        let mut result = JsonMap::new();
        self.expand_entries(
            &active_context,
            &type_scoped_context,
            active_property,
            element,
            input_type.as_deref(),
            &mut result,
            pointer,
        )?;

        if let Some(value) = result.get("@value") {
            // 15.1)
            if result.keys().any(|k| {
                !matches!(
                    k.as_str(),
                    "@direction" | "@index" | "@language" | "@type" | "@value"
                )
            }) || (result.contains_key("@type")
                && (result.contains_key("@language") || result.contains_key("@direction")))
            {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidValueObject,
                    "A value object can only contain @direction, @index, @language, @type and @value and can't mix @type with @language or @direction",
                )
                .at(pointer));
            }
            let r#type = result.get("@type");
            if r#type != Some(&JsonNode::String("@json".into())) {
                // 15.3)
                if *value == JsonNode::Null || *value == JsonNode::Array(Vec::new()) {
                    return Ok(None);
                }
                // 15.4)
                if !matches!(value, JsonNode::String(_)) && result.contains_key("@language") {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidLanguageTaggedValue,
                        "Only strings can be language-tagged",
                    )
                    .at(pointer));
                }
                // 15.5)
                if let Some(r#type) = r#type {
                    let is_valid = match r#type {
                        JsonNode::String(t) => {
                            !t.starts_with("_:")
                                && (self.processor.lenient || Iri::parse(t.as_str()).is_ok())
                        }
                        _ => false,
                    };
                    if !is_valid {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidTypedValue,
                            "The @type of a value object must be an IRI",
                        )
                        .at(pointer));
                    }
                }
            }
        } else if let Some(r#type) = result.get_mut("@type") {
            // 16)
            if !matches!(r#type, JsonNode::Array(_)) {
                *r#type = JsonNode::Array(vec![r#type.clone()]);
            }
        }
        // 17)
        if result.contains_key("@set") || result.contains_key("@list") {
            if result.len() > 2
                || result
                    .keys()
                    .any(|k| !matches!(k.as_str(), "@set" | "@list" | "@index"))
                || (result.contains_key("@set") && result.contains_key("@list"))
            {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidSetOrListObject,
                    "@set and @list objects can only contain an @index entry",
                )
                .at(pointer));
            }
            if let Some(set) = result.remove("@set") {
                return Ok(match set {
                    JsonNode::Null => None,
                    set => Some(set),
                });
            }
        }
        // 18)
        if result.len() == 1 && result.contains_key("@language") {
            return Ok(None);
        }
        // 19)
        if active_property.is_none_or(|p| p == "@graph")
            && (result.is_empty()
                || result.contains_key("@value")
                || result.contains_key("@list")
                || (result.len() == 1 && result.contains_key("@id")))
        {
            return Ok(None);
        }
        Ok(Some(JsonNode::Object(result)))
    }

    /// Steps 13 and 14 of the expansion algorithm.
    #[expect(clippy::too_many_arguments)]
    fn expand_entries(
        &self,
        active_context: &JsonLdContext,
        type_scoped_context: &JsonLdContext,
        active_property: Option<&str>,
        element: &JsonMap,
        input_type: Option<&str>,
        result: &mut JsonMap,
        pointer: &str,
    ) -> Result<(), JsonLdSyntaxError> {
        let lenient = self.processor.lenient;
        let mut nests = Vec::new();
        for (key, value) in element {
            // 13.1)
            if key == "@context" {
                continue;
            }
            let key_pointer = pointer_child(pointer, key);
            // 13.2) and 13.3)
            let Some(expanded_property) = self.expand_key(active_context, key) else {
                continue;
            };
            if !is_keyword(&expanded_property) {
                if expanded_property.contains(':') {
                    self.expand_property(
                        active_context,
                        key,
                        value,
                        expanded_property,
                        result,
                        &key_pointer,
                    )?;
                }
                continue;
            }
            // 13.4.1)
            if active_property == Some("@reverse") {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidReversePropertyMap,
                    "A reverse property map can't contain keywords",
                )
                .at(&key_pointer));
            }
            // 13.4.2)
            if result.contains_key(&expanded_property)
                && !matches!(expanded_property.as_str(), "@included" | "@type")
            {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::CollidingKeywords,
                    format!("{expanded_property} is set multiple times"),
                )
                .at(&key_pointer));
            }
            let expanded_value = match expanded_property.as_str() {
                // 13.4.3)
                "@id" => match value {
                    JsonNode::String(id) => active_context
                        .expand_iri(id, true, false, lenient)
                        .map_or(JsonNode::Null, JsonNode::String),
                    JsonNode::Object(_) => {
                        return Err(JsonLdSyntaxError::unsupported(
                            "Embedded nodes as @id values are not supported",
                        )
                        .at(&key_pointer));
                    }
                    _ => {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidIdValue,
                            "@id value must be a string",
                        )
                        .at(&key_pointer));
                    }
                },
                // 13.4.4)
                "@type" => {
                    let expand_type = |t: &JsonNode| match t {
                        JsonNode::String(t) => Ok(type_scoped_context
                            .expand_iri(t, true, true, lenient)
                            .map_or(JsonNode::Null, JsonNode::String)),
                        _ => Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidTypeValue,
                            "@type value must be a string or an array of strings",
                        )
                        .at(&key_pointer)),
                    };
                    let expanded = match value {
                        JsonNode::Array(types) => JsonNode::Array(
                            types.iter().map(&expand_type).collect::<Result<_, _>>()?,
                        ),
                        value => expand_type(value)?,
                    };
                    // 13.4.4.5)
                    match result.remove("@type") {
                        Some(previous) => {
                            let mut types = into_vec(Some(previous));
                            types.extend(into_vec(Some(expanded)));
                            JsonNode::Array(types)
                        }
                        None => expanded,
                    }
                }
                // 13.4.5)
                "@graph" => JsonNode::Array(into_vec(self.expand(
                    active_context,
                    Some("@graph"),
                    value,
                    false,
                    &key_pointer,
                )?)),
                // 13.4.6)
                "@included" => {
                    let included =
                        into_vec(self.expand(active_context, None, value, false, &key_pointer)?);
                    if !included.iter().all(is_node_object) {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidIncludedValue,
                            "@included values must be node objects",
                        )
                        .at(&key_pointer));
                    }
                    let mut all = into_vec(result.remove("@included"));
                    all.extend(included);
                    JsonNode::Array(all)
                }
                // 13.4.7)
                "@value" => {
                    if input_type != Some("@json")
                        && !value.is_scalar()
                        && *value != JsonNode::Null
                    {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidValueObjectValue,
                            "@value value must be a scalar or null",
                        )
                        .at(&key_pointer));
                    }
                    value.clone()
                }
                // 13.4.8)
                "@language" => {
                    if !matches!(value, JsonNode::String(_)) {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidLanguageTaggedString,
                            "@language value must be a string",
                        )
                        .at(&key_pointer));
                    }
                    value.clone()
                }
                // 13.4.9)
                "@direction" => match value {
                    JsonNode::String(d) if d == "ltr" || d == "rtl" => value.clone(),
                    _ => {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidBaseDirection,
                            "@direction value must be \"ltr\" or \"rtl\"",
                        )
                        .at(&key_pointer));
                    }
                },
                // 13.4.10)
                "@index" => {
                    if !matches!(value, JsonNode::String(_)) {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidIndexValue,
                            "@index value must be a string",
                        )
                        .at(&key_pointer));
                    }
                    value.clone()
                }
                // 13.4.11)
                "@list" => {
                    if active_property.is_none_or(|p| p == "@graph") {
                        continue;
                    }
                    JsonNode::Array(into_vec(self.expand(
                        active_context,
                        active_property,
                        value,
                        false,
                        &key_pointer,
                    )?))
                }
                // 13.4.12)
                "@set" => self
                    .expand(active_context, active_property, value, false, &key_pointer)?
                    .unwrap_or(JsonNode::Null),
                // 13.4.13)
                "@reverse" => {
                    if !matches!(value, JsonNode::Object(_)) {
                        return Err(JsonLdSyntaxError::new(
                            JsonLdErrorCode::InvalidReverseValue,
                            "@reverse value must be an object",
                        )
                        .at(&key_pointer));
                    }
                    let Some(JsonNode::Object(mut expanded)) =
                        self.expand(active_context, Some("@reverse"), value, false, &key_pointer)?
                    else {
                        continue;
                    };
                    // 13.4.13.3)
                    if let Some(JsonNode::Object(double_reversed)) = expanded.remove("@reverse") {
                        for (property, items) in double_reversed {
                            push_values(result, &property, into_vec(Some(items)));
                        }
                    }
                    // 13.4.13.4)
                    for (property, items) in expanded {
                        let items = into_vec(Some(items));
                        if items.iter().any(|i| is_value_object(i) || is_list_object(i)) {
                            return Err(JsonLdSyntaxError::new(
                                JsonLdErrorCode::InvalidReversePropertyValue,
                                "Reverse properties can only have node objects as values",
                            )
                            .at(&pointer_child(&key_pointer, &property)));
                        }
                        push_reverse_values(result, &property, items);
                    }
                    continue;
                }
                // 13.4.14)
                "@nest" => {
                    nests.push(key);
                    continue;
                }
                _ => continue,
            };
            // 13.4.16)
            result.insert(expanded_property, expanded_value);
        }
        // 14)
        for nesting_key in nests {
            let nest_pointer = pointer_child(pointer, nesting_key);
            for (i, nested_value) in element[nesting_key].as_slice().iter().enumerate() {
                let JsonNode::Object(nested_value) = nested_value else {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidNestValue,
                        "@nest values must be objects",
                    )
                    .at(&nest_pointer));
                };
                if nested_value
                    .keys()
                    .any(|k| self.expand_key(active_context, k).as_deref() == Some("@value"))
                {
                    return Err(JsonLdSyntaxError::new(
                        JsonLdErrorCode::InvalidNestValue,
                        "@nest values can't be value objects",
                    )
                    .at(&nest_pointer));
                }
                self.expand_entries(
                    active_context,
                    type_scoped_context,
                    Some(nesting_key.as_str()),
                    nested_value,
                    input_type,
                    result,
                    &pointer_child(&nest_pointer, &i.to_string()),
                )?;
            }
        }
        Ok(())
    }

    /// Steps 13.5 to 13.14 of the expansion algorithm, for keys that are not keywords.
    fn expand_property(
        &self,
        active_context: &JsonLdContext,
        key: &str,
        value: &JsonNode,
        expanded_property: String,
        result: &mut JsonMap,
        pointer: &str,
    ) -> Result<(), JsonLdSyntaxError> {
        let definition = active_context.term_definitions.get(key);
        // 13.5)
        let container = definition
            .map(|d| d.container_mapping)
            .unwrap_or_default();
        let expanded_value = match value {
            // 13.6)
            _ if definition.and_then(|d| d.type_mapping.as_deref()) == Some("@json") => {
                JsonNode::Object(JsonMap::from([
                    ("@value".into(), value.clone()),
                    ("@type".into(), JsonNode::String("@json".into())),
                ]))
            }
            // 13.7)
            JsonNode::Object(language_map) if container.contains(Container::LANGUAGE) => {
                let direction = match definition.and_then(|d| d.direction_mapping.clone()) {
                    Some(direction) => direction,
                    None => active_context.default_direction.clone(),
                };
                let mut items = Vec::new();
                for (language, language_value) in language_map {
                    let is_none = self.expand_key(active_context, language).as_deref() == Some("@none");
                    for item in language_value.as_slice() {
                        match item {
                            JsonNode::Null => continue,
                            JsonNode::String(_) => (),
                            _ => {
                                return Err(JsonLdSyntaxError::new(
                                    JsonLdErrorCode::InvalidLanguageMapValue,
                                    "Language map values must be strings",
                                )
                                .at(&pointer_child(pointer, language)));
                            }
                        }
                        let mut object = JsonMap::from([("@value".into(), item.clone())]);
                        if !is_none {
                            object.insert("@language".into(), JsonNode::String(language.clone()));
                        }
                        if let Some(direction) = &direction {
                            object.insert("@direction".into(), JsonNode::String(direction.clone()));
                        }
                        items.push(JsonNode::Object(object));
                    }
                }
                JsonNode::Array(items)
            }
            // 13.8)
            JsonNode::Object(map)
                if container.contains(Container::INDEX)
                    || container.contains(Container::TYPE)
                    || container.contains(Container::ID) =>
            {
                self.expand_index_map(active_context, key, container, map, pointer)?
            }
            // 13.9)
            _ => match self.expand(active_context, Some(key), value, false, pointer)? {
                Some(expanded) => expanded,
                // 13.10)
                None => return Ok(()),
            },
        };
        let mut expanded_value = expanded_value;
        // 13.11)
        if container.contains(Container::LIST) && !is_list_object(&expanded_value) {
            expanded_value = list_object(into_vec(Some(expanded_value)));
        }
        // 13.12)
        if container.contains(Container::GRAPH)
            && !container.contains(Container::ID)
            && !container.contains(Container::INDEX)
        {
            expanded_value = JsonNode::Array(
                into_vec(Some(expanded_value))
                    .into_iter()
                    .map(|item| graph_object(into_vec(Some(item))))
                    .collect(),
            );
        }
        let items = into_vec(Some(expanded_value));
        if definition.is_some_and(|d| d.reverse_property) {
            // 13.13)
            if items.iter().any(|i| is_value_object(i) || is_list_object(i)) {
                return Err(JsonLdSyntaxError::new(
                    JsonLdErrorCode::InvalidReversePropertyValue,
                    "Reverse properties can only have node objects as values",
                )
                .at(pointer));
            }
            push_reverse_values(result, &expanded_property, items);
        } else {
            // 13.14)
            push_values(result, &expanded_property, items);
        }
        Ok(())
    }

    /// Step 13.8: index, id and type maps.
    fn expand_index_map(
        &self,
        active_context: &JsonLdContext,
        key: &str,
        container: Container,
        map: &JsonMap,
        pointer: &str,
    ) -> Result<JsonNode, JsonLdSyntaxError> {
        let lenient = self.processor.lenient;
        let index_key = active_context
            .term_definitions
            .get(key)
            .and_then(|d| d.index_mapping.as_deref())
            .unwrap_or("@index");
        let mut items = Vec::new();
        for (index, index_value) in map {
            let index_pointer = pointer_child(pointer, index);
            // 13.8.3.1)
            let mut map_context = Cow::Borrowed(active_context);
            if container.contains(Container::ID) || container.contains(Container::TYPE) {
                if let Some(previous_context) = &active_context.previous_context {
                    map_context = Cow::Borrowed(previous_context.as_ref());
                }
            }
            // 13.8.3.2)
            if container.contains(Container::TYPE) {
                let scoped = match map_context.term_definitions.get(index) {
                    Some(definition) => match &definition.context {
                        Some(context) => Some(self.processor.process_context(
                            &map_context,
                            context,
                            definition.base_url.as_ref(),
                            &mut Vec::new(),
                            false,
                            true,
                            true,
                            &index_pointer,
                        )?),
                        None => None,
                    },
                    None => None,
                };
                if let Some(scoped) = scoped {
                    map_context = Cow::Owned(scoped);
                }
            }
            // 13.8.3.4)
            let expanded_index = self.expand_key(active_context, index);
            let is_none = expanded_index.as_deref() == Some("@none");
            // 13.8.3.6)
            let values = into_vec(self.expand(
                &map_context,
                Some(key),
                &JsonNode::Array(index_value.as_slice().to_vec()),
                true,
                &index_pointer,
            )?);
            for item in values {
                // 13.8.3.7.1)
                let mut item = if container.contains(Container::GRAPH) && !is_graph_object(&item) {
                    graph_object(vec![item])
                } else {
                    item
                };
                if let (false, JsonNode::Object(object)) = (is_none, &mut item) {
                    if container.contains(Container::INDEX) && index_key != "@index" {
                        // 13.8.3.7.2)
                        if object.contains_key("@value") {
                            return Err(JsonLdSyntaxError::new(
                                JsonLdErrorCode::InvalidValueObject,
                                "Property-valued indexes can't be applied to value objects",
                            )
                            .at(&index_pointer));
                        }
                        let re_expanded_index = self.expand_value(
                            active_context,
                            Some(index_key),
                            &JsonNode::String(index.clone()),
                        );
                        if let Some(expanded_index_key) = self.expand_key(active_context, index_key) {
                            let mut index_values = vec![re_expanded_index];
                            index_values.extend(into_vec(object.remove(&expanded_index_key)));
                            object.insert(expanded_index_key, JsonNode::Array(index_values));
                        }
                    } else if container.contains(Container::INDEX) {
                        // 13.8.3.7.3)
                        if !object.contains_key("@index") {
                            object.insert("@index".into(), JsonNode::String(index.clone()));
                        }
                    } else if container.contains(Container::ID) {
                        // 13.8.3.7.4)
                        if !object.contains_key("@id") {
                            let id = active_context.expand_iri(index, true, false, lenient);
                            object.insert("@id".into(), id.map_or(JsonNode::Null, JsonNode::String));
                        }
                    } else if container.contains(Container::TYPE) {
                        // 13.8.3.7.5)
                        let mut types = vec![
                            expanded_index
                                .clone()
                                .map_or(JsonNode::Null, JsonNode::String),
                        ];
                        types.extend(into_vec(object.remove("@type")));
                        object.insert("@type".into(), JsonNode::Array(types));
                    }
                }
                items.push(item);
            }
        }
        Ok(JsonNode::Array(items))
    }

    /// [Value Expansion](https://www.w3.org/TR/json-ld-api/#value-expansion)
    fn expand_value(
        &self,
        active_context: &JsonLdContext,
        active_property: Option<&str>,
        value: &JsonNode,
    ) -> JsonNode {
        let lenient = self.processor.lenient;
        let definition = active_property.and_then(|p| active_context.term_definitions.get(p));
        let type_mapping = definition.and_then(|d| d.type_mapping.as_deref());
        // 1) and 2)
        if let JsonNode::String(value) = value {
            let id = match type_mapping {
                Some("@id") => Some(active_context.expand_iri(value, true, false, lenient)),
                Some("@vocab") => Some(active_context.expand_iri(value, true, true, lenient)),
                _ => None,
            };
            if let Some(id) = id {
                return JsonNode::Object(JsonMap::from([(
                    "@id".into(),
                    id.map_or(JsonNode::Null, JsonNode::String),
                )]));
            }
        }
        // 3)
        let mut result = JsonMap::from([("@value".into(), value.clone())]);
        match type_mapping {
            // 4)
            Some(r#type) if !matches!(r#type, "@id" | "@vocab" | "@none") => {
                result.insert("@type".into(), JsonNode::String(r#type.into()));
            }
            // 5)
            _ => {
                if let JsonNode::String(_) = value {
                    let language = match definition.and_then(|d| d.language_mapping.clone()) {
                        Some(language) => language,
                        None => active_context.default_language.clone(),
                    };
                    if let Some(language) = language {
                        result.insert("@language".into(), JsonNode::String(language));
                    }
                    let direction = match definition.and_then(|d| d.direction_mapping.clone()) {
                        Some(direction) => direction,
                        None => active_context.default_direction.clone(),
                    };
                    if let Some(direction) = direction {
                        result.insert("@direction".into(), JsonNode::String(direction));
                    }
                }
            }
        }
        JsonNode::Object(result)
    }

    fn expand_key(&self, active_context: &JsonLdContext, key: &str) -> Option<String> {
        active_context.expand_iri(key, false, true, self.processor.lenient)
    }
}

fn into_vec(node: Option<JsonNode>) -> Vec<JsonNode> {
    match node {
        None => Vec::new(),
        Some(JsonNode::Array(items)) => items,
        Some(node) => vec![node],
    }
}

fn push_values(map: &mut JsonMap, key: &str, values: Vec<JsonNode>) {
    let entry = map
        .entry(key.into())
        .or_insert_with(|| JsonNode::Array(Vec::new()));
    match entry {
        JsonNode::Array(items) => items.extend(values),
        entry => {
            let mut items = vec![entry.clone()];
            items.extend(values);
            *entry = JsonNode::Array(items);
        }
    }
}

fn push_reverse_values(result: &mut JsonMap, property: &str, values: Vec<JsonNode>) {
    if let JsonNode::Object(reverse_map) = result
        .entry("@reverse".into())
        .or_insert_with(|| JsonNode::Object(JsonMap::new()))
    {
        push_values(reverse_map, property, values);
    }
}

fn list_object(items: Vec<JsonNode>) -> JsonNode {
    JsonNode::Object(JsonMap::from([("@list".into(), JsonNode::Array(items))]))
}

fn graph_object(items: Vec<JsonNode>) -> JsonNode {
    JsonNode::Object(JsonMap::from([("@graph".into(), JsonNode::Array(items))]))
}

pub fn is_value_object(node: &JsonNode) -> bool {
    node.as_object().is_some_and(|o| o.contains_key("@value"))
}

pub fn is_list_object(node: &JsonNode) -> bool {
    node.as_object().is_some_and(|o| o.contains_key("@list"))
}

fn is_graph_object(node: &JsonNode) -> bool {
    node.as_object().is_some_and(|o| {
        o.contains_key("@graph")
            && o
                .keys()
                .all(|k| matches!(k.as_str(), "@graph" | "@id" | "@index" | "@context"))
    })
}

pub fn is_node_object(node: &JsonNode) -> bool {
    node.as_object().is_some_and(|o| {
        !o.contains_key("@value") && !o.contains_key("@list") && !o.contains_key("@set")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::json_slice_to_node;
    use std::cell::RefCell;

    fn expand(document: &str) -> Result<Vec<JsonNode>, JsonLdSyntaxError> {
        let expander = JsonLdExpander {
            processor: JsonLdContextProcessor {
                lenient: false,
                remote_context_cache: RefCell::default(),
                load_document_callback: None,
            },
            base_url: Iri::parse("http://example.com/".to_owned()).ok(),
        };
        expander.expand_document(&json_slice_to_node(document.as_bytes())?)
    }

    fn json(document: &str) -> Vec<JsonNode> {
        match json_slice_to_node(document.as_bytes()) {
            Ok(JsonNode::Array(items)) => items,
            Ok(node) => vec![node],
            Err(e) => panic!("{e}"),
        }
    }

    #[test]
    fn simple_node() -> Result<(), JsonLdSyntaxError> {
        assert_eq!(
            expand(
                r#"{"@context": {"name": "http://schema.org/name", "knows": {"@id": "http://schema.org/knows", "@type": "@id"}}, "@id": "a", "name": "Alice", "knows": "b"}"#
            )?,
            json(
                r#"[{"@id": "http://example.com/a", "http://schema.org/name": [{"@value": "Alice"}], "http://schema.org/knows": [{"@id": "http://example.com/b"}]}]"#
            )
        );
        Ok(())
    }

    #[test]
    fn free_floating_values_are_dropped() -> Result<(), JsonLdSyntaxError> {
        assert_eq!(expand(r#"["a", {"@value": 1}, {"@id": "http://e/x"}]"#)?, Vec::new());
        assert_eq!(
            expand(r#"{"@context": {"@vocab": "http://v/"}, "@graph": [{"p": "o"}]}"#)?,
            json(r#"[{"http://v/p": [{"@value": "o"}]}]"#)
        );
        Ok(())
    }

    #[test]
    fn containers() -> Result<(), JsonLdSyntaxError> {
        assert_eq!(
            expand(
                r#"{"@context": {"@vocab": "http://v/", "label": {"@container": "@language"}, "list": {"@container": "@list"}}, "label": {"en": "Hi", "fr": ["Salut"]}, "list": [1, [2]]}"#
            )?,
            json(
                r#"[{"http://v/label": [{"@value": "Hi", "@language": "en"}, {"@value": "Salut", "@language": "fr"}], "http://v/list": [{"@list": [{"@value": 1}, {"@list": [{"@value": 2}]}]}]}]"#
            )
        );
        assert_eq!(
            expand(
                r#"{"@context": {"@vocab": "http://v/", "byId": {"@container": "@id"}}, "byId": {"x": {"p": "o"}}}"#
            )?,
            json(
                r#"[{"http://v/byId": [{"@id": "http://example.com/x", "http://v/p": [{"@value": "o"}]}]}]"#
            )
        );
        Ok(())
    }

    #[test]
    fn reverse_and_nest() -> Result<(), JsonLdSyntaxError> {
        assert_eq!(
            expand(
                r#"{"@context": {"@vocab": "http://v/", "parent": {"@reverse": "http://v/child"}, "meta": "@nest"}, "@id": "http://e/a", "parent": {"@id": "http://e/b"}, "meta": {"p": "o"}}"#
            )?,
            json(
                r#"[{"@id": "http://e/a", "@reverse": {"http://v/child": [{"@id": "http://e/b"}]}, "http://v/p": [{"@value": "o"}]}]"#
            )
        );
        Ok(())
    }

    #[test]
    fn scoped_contexts() -> Result<(), JsonLdSyntaxError> {
        assert_eq!(
            expand(
                r#"{"@context": {"@vocab": "http://v/", "Person": {"@context": {"name": "http://schema.org/name"}}}, "@type": "Person", "name": "Bob", "knows": {"name": "Carol"}}"#
            )?,
            json(
                r#"[{"@type": ["http://v/Person"], "http://schema.org/name": [{"@value": "Bob"}], "http://v/knows": [{"http://v/name": [{"@value": "Carol"}]}]}]"#
            )
        );
        Ok(())
    }

    #[test]
    fn errors() {
        let error = expand(r#"{"@context": {"@vocab": "http://v/"}, "@graph": [{"@id": 1}]}"#).err();
        assert_eq!(
            error.as_ref().and_then(JsonLdSyntaxError::code),
            Some(JsonLdErrorCode::InvalidIdValue)
        );
        assert_eq!(
            error.as_ref().map(JsonLdSyntaxError::pointer),
            Some("/@graph/0/@id")
        );
        let error = expand(r#"{"http://v/p": {"@value": "x", "@language": "en", "@type": "http://t"}}"#).err();
        assert_eq!(
            error.and_then(|e| e.code()),
            Some(JsonLdErrorCode::InvalidValueObject)
        );
        let error = expand(r#"{"http://v/p": {"@value": true, "@language": "en"}}"#).err();
        assert_eq!(
            error.and_then(|e| e.code()),
            Some(JsonLdErrorCode::InvalidLanguageTaggedValue)
        );
    }
}
