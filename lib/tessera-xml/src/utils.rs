pub fn is_name(name: &str) -> bool {
    // NameStartChar (NameChar)*
    let mut chars = name.chars();
    if !chars.next().is_some_and(is_name_start_char) {
        return false;
    }
    chars.all(is_name_char)
}

/// An XML name without colon, usable as `rdf:ID`, `rdf:nodeID` or as the local part of a QName.
pub fn is_nc_name(name: &str) -> bool {
    is_name(name) && !name.contains(':')
}

pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':'
        | 'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c, '-' | '.' | '0'..='9' | '\u{B7}' | '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}')
}

pub fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r')
}

/// Splits an IRI into a namespace and a local name that is a valid NCName.
///
/// The local name is the longest suffix that is a NCName. Returns `None` if there is none.
pub fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let mut start = iri.len();
    for (i, c) in iri.char_indices().rev() {
        if c == ':' || !is_name_char(c) {
            break;
        }
        start = i;
    }
    // The local name must start with a NameStartChar
    let offset = iri[start..].find(|c| is_name_start_char(c) && c != ':')?;
    let (namespace, local) = iri.split_at(start + offset);
    (!namespace.is_empty()).then_some((namespace, local))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert!(is_nc_name("foo-bar.1"));
        assert!(is_nc_name("_b0"));
        assert!(!is_nc_name("1foo"));
        assert!(!is_nc_name("ex:foo"));
        assert!(is_name("ex:foo"));
        assert!(!is_name(""));
    }

    #[test]
    fn iri_splitting() {
        assert_eq!(
            split_iri("http://schema.org/Person"),
            Some(("http://schema.org/", "Person"))
        );
        assert_eq!(split_iri("http://schema.org/"), None);
        assert_eq!(
            split_iri("http://schema.org#foo"),
            Some(("http://schema.org#", "foo"))
        );
        assert_eq!(split_iri("urn:isbn:foo"), Some(("urn:isbn:", "foo")));
        assert_eq!(
            split_iri("http://example.com/1.5-a"),
            Some(("http://example.com/1.5-", "a"))
        );
        assert_eq!(split_iri("http://example.com/123"), None);
    }
}
