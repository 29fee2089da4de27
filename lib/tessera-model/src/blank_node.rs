use rand::random;
use std::fmt;

/// An owned RDF [blank node](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node).
///
/// Decoders never keep the labels found in documents: every label is mapped to a freshly minted
/// node by a [`BlankNodeScope`](crate::BlankNodeScope). Minted nodes carry a random 128 bits
/// identifier printed in lowercase hexadecimal, so nodes minted by two decode invocations never collide.
///
/// ```
/// use tessera_model::BlankNode;
///
/// assert_eq!("_:a122", BlankNode::new("a122")?.to_string());
/// assert_ne!(BlankNode::default(), BlankNode::default());
/// # Result::<_, tessera_model::BlankNodeIdParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct BlankNode {
    id: String,
}

impl BlankNode {
    /// Creates a blank node from an identifier valid according to the N-Triples and Turtle grammars.
    pub fn new(id: impl Into<String>) -> Result<Self, BlankNodeIdParseError> {
        let id = id.into();
        validate_blank_node_identifier(&id)?;
        Ok(Self::new_unchecked(id))
    }

    /// Creates a blank node without validating its identifier.
    #[inline]
    pub fn new_unchecked(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Creates a blank node from a numerical id, printed in hexadecimal.
    #[inline]
    pub fn new_from_unique_id(id: u128) -> Self {
        Self {
            id: format!("{id:x}"),
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn into_string(self) -> String {
        self.id
    }
}

impl Default for BlankNode {
    /// Mints a blank node with a random identifier.
    fn default() -> Self {
        // The id must not start with a digit to also be a valid XML NCName
        loop {
            let id: u128 = random();
            let node = Self::new_from_unique_id(id);
            if matches!(node.id.as_bytes().first(), Some(b'a'..=b'f')) {
                return node;
            }
        }
    }
}

impl fmt::Display for BlankNode {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_:{}", self.id)
    }
}

fn is_label_start_char(c: char) -> bool {
    matches!(c,
        '0'..='9'
        | '_'
        | 'A'..='Z'
        | 'a'..='z'
        | '\u{00C0}'..='\u{00D6}'
        | '\u{00D8}'..='\u{00F6}'
        | '\u{00F8}'..='\u{02FF}'
        | '\u{0370}'..='\u{037D}'
        | '\u{037F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_label_char(c: char) -> bool {
    is_label_start_char(c)
        || matches!(c, '.' | '-' | '\u{00B7}' | '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}')
}

fn validate_blank_node_identifier(id: &str) -> Result<(), BlankNodeIdParseError> {
    let mut chars = id.chars();
    if !chars.next().is_some_and(is_label_start_char) {
        return Err(BlankNodeIdParseError);
    }
    if !chars.all(is_label_char) || id.ends_with('.') {
        return Err(BlankNodeIdParseError);
    }
    Ok(())
}

/// An error raised when a blank node identifier is not valid.
#[derive(Debug, thiserror::Error)]
#[error("The blank node identifier is invalid")]
pub struct BlankNodeIdParseError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_id_is_hexadecimal() {
        assert_eq!(BlankNode::new_from_unique_id(0x42).as_str(), "42");
        assert_eq!(
            BlankNode::new_from_unique_id(0x7777_6666_5555_4444_3333_2222_1111_0000).as_str(),
            "77776666555544443333222211110000"
        );
    }

    #[test]
    fn new_validation() {
        BlankNode::new("").unwrap_err();
        BlankNode::new("a").unwrap();
        BlankNode::new("-").unwrap_err();
        BlankNode::new("a-").unwrap();
        BlankNode::new(".").unwrap_err();
        BlankNode::new("a.").unwrap_err();
        BlankNode::new("a.a").unwrap();
        BlankNode::new("a b").unwrap_err();
    }

    #[test]
    fn minted_nodes_start_with_a_letter() {
        for _ in 0..64 {
            let node = BlankNode::default();
            assert!(
                node.as_str().starts_with(|c: char| c.is_ascii_lowercase()),
                "{node} starts with a digit"
            );
        }
    }
}
