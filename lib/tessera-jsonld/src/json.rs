use json_event_parser::{JsonEvent, JsonSyntaxError, SliceJsonParser, WriterJsonSerializer};
use std::collections::BTreeMap;
use std::io;
use std::str::FromStr;

/// An in-memory JSON value.
///
/// Numbers keep their lexical form. Object keys are sorted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum JsonNode {
    String(String),
    Number(String),
    Boolean(bool),
    Null,
    Array(Vec<JsonNode>),
    Object(BTreeMap<String, JsonNode>),
}

impl JsonNode {
    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonNode>> {
        if let Self::Object(object) = self {
            Some(object)
        } else {
            None
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::String(_) | Self::Number(_) | Self::Boolean(_))
    }

    /// The value itself if it is an array, else a one element slice.
    pub fn as_slice(&self) -> &[JsonNode] {
        if let Self::Array(array) = self {
            array
        } else {
            std::slice::from_ref(self)
        }
    }
}

enum BuildingNode {
    Object(BTreeMap<String, JsonNode>),
    ObjectWithPendingKey(BTreeMap<String, JsonNode>, String),
    Array(Vec<JsonNode>),
}

/// Builds a [`JsonNode`] from a stream of [`JsonEvent`]s.
#[derive(Default)]
pub struct JsonTreeBuilder {
    stack: Vec<BuildingNode>,
}

impl JsonTreeBuilder {
    /// Returns the root value once its last event has been pushed.
    pub fn push_event(&mut self, event: JsonEvent<'_>) -> Option<JsonNode> {
        match event {
            JsonEvent::String(value) => self.push_value(JsonNode::String(value.into())),
            JsonEvent::Number(value) => self.push_value(JsonNode::Number(value.into())),
            JsonEvent::Boolean(value) => self.push_value(JsonNode::Boolean(value)),
            JsonEvent::Null => self.push_value(JsonNode::Null),
            JsonEvent::EndArray | JsonEvent::EndObject => {
                let value = match self.stack.pop()? {
                    BuildingNode::Object(object)
                    | BuildingNode::ObjectWithPendingKey(object, _) => JsonNode::Object(object),
                    BuildingNode::Array(array) => JsonNode::Array(array),
                };
                self.push_value(value)
            }
            JsonEvent::StartArray => {
                self.stack.push(BuildingNode::Array(Vec::new()));
                None
            }
            JsonEvent::StartObject => {
                self.stack.push(BuildingNode::Object(BTreeMap::new()));
                None
            }
            JsonEvent::ObjectKey(key) => {
                if let Some(BuildingNode::Object(object)) = self.stack.pop() {
                    self.stack
                        .push(BuildingNode::ObjectWithPendingKey(object, key.into()));
                }
                None
            }
            JsonEvent::Eof => None,
        }
    }

    fn push_value(&mut self, value: JsonNode) -> Option<JsonNode> {
        match self.stack.pop() {
            Some(BuildingNode::ObjectWithPendingKey(mut object, key)) => {
                // The last occurrence of a duplicated key wins
                object.insert(key, value);
                self.stack.push(BuildingNode::Object(object));
                None
            }
            Some(BuildingNode::Object(object)) => {
                self.stack.push(BuildingNode::Object(object));
                None
            }
            Some(BuildingNode::Array(mut array)) => {
                array.push(value);
                self.stack.push(BuildingNode::Array(array));
                None
            }
            None => Some(value),
        }
    }
}

pub fn json_slice_to_node(data: &[u8]) -> Result<JsonNode, JsonSyntaxError> {
    let mut parser = SliceJsonParser::new(data);
    let mut builder = JsonTreeBuilder::default();
    loop {
        let event = parser.parse_next()?;
        let is_eof = matches!(event, JsonEvent::Eof);
        if let Some(node) = builder.push_event(event) {
            return Ok(node);
        }
        if is_eof {
            // The parser fails on truncated documents before returning Eof
            return Ok(JsonNode::Null);
        }
    }
}

/// Appends a key or an index to a JSON pointer, escaping `~` and `/`.
pub fn pointer_child(pointer: &str, segment: &str) -> String {
    let mut result = String::with_capacity(pointer.len() + segment.len() + 1);
    result.push_str(pointer);
    result.push('/');
    for c in segment.chars() {
        match c {
            '~' => result.push_str("~0"),
            '/' => result.push_str("~1"),
            c => result.push(c),
        }
    }
    result
}

/// Serializes a value following the [JSON Canonicalization Scheme](https://www.rfc-editor.org/rfc/rfc8785).
pub fn to_canonical_json(node: &JsonNode) -> io::Result<String> {
    let mut writer = WriterJsonSerializer::new(Vec::new());
    write_canonical_json(node, &mut writer)?;
    String::from_utf8(writer.finish()?)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_canonical_json(
    node: &JsonNode,
    writer: &mut WriterJsonSerializer<Vec<u8>>,
) -> io::Result<()> {
    match node {
        JsonNode::String(value) => writer.serialize_event(JsonEvent::String(value.into())),
        JsonNode::Number(value) => {
            let value = f64::from_str(value)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            let mut buffer = ryu_js::Buffer::new();
            writer.serialize_event(JsonEvent::Number(buffer.format(value).into()))
        }
        JsonNode::Boolean(value) => writer.serialize_event(JsonEvent::Boolean(*value)),
        JsonNode::Null => writer.serialize_event(JsonEvent::Null),
        JsonNode::Array(array) => {
            writer.serialize_event(JsonEvent::StartArray)?;
            for item in array {
                write_canonical_json(item, writer)?;
            }
            writer.serialize_event(JsonEvent::EndArray)
        }
        JsonNode::Object(object) => {
            writer.serialize_event(JsonEvent::StartObject)?;
            // Keys are compared by UTF-16 code units
            let mut entries = object.iter().collect::<Vec<_>>();
            entries.sort_by(|(k1, _), (k2, _)| k1.encode_utf16().cmp(k2.encode_utf16()));
            for (key, value) in entries {
                writer.serialize_event(JsonEvent::ObjectKey(key.into()))?;
                write_canonical_json(value, writer)?;
            }
            writer.serialize_event(JsonEvent::EndObject)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tree() -> Result<(), JsonSyntaxError> {
        let node = json_slice_to_node(br#"{"b": [1, "x", null], "a": {"c": true}, "a": false}"#)?;
        assert_eq!(
            node,
            JsonNode::Object(BTreeMap::from([
                ("a".into(), JsonNode::Boolean(false)),
                (
                    "b".into(),
                    JsonNode::Array(vec![
                        JsonNode::Number("1".into()),
                        JsonNode::String("x".into()),
                        JsonNode::Null
                    ])
                ),
            ]))
        );
        Ok(())
    }

    #[test]
    fn canonical_json() -> Result<(), Box<dyn std::error::Error>> {
        let node = json_slice_to_node(
            "{\"z\": 1.0E2, \"a\": [true, null, \"\u{e9}\"], \"m\": {\"y\": 0.5, \"x\": -0}}"
                .as_bytes(),
        )?;
        assert_eq!(
            to_canonical_json(&node)?,
            "{\"a\":[true,null,\"\u{e9}\"],\"m\":{\"x\":0,\"y\":0.5},\"z\":100}"
        );
        Ok(())
    }

    #[test]
    fn pointer_escaping() {
        assert_eq!(pointer_child("", "@graph"), "/@graph");
        assert_eq!(pointer_child("/a", "b/c~d"), "/a/b~1c~0d");
    }
}
