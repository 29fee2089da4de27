use crate::toolkit::{RuleRecognizerError, TokenRecognizer, TokenRecognizerError};
use memchr::memchr2;
use oxilangtag::LanguageTag;
use oxiri::Iri;
use std::borrow::Cow;
use std::cmp::min;
use std::ops::Range;
use std::str;
use tessera_model::{ErrorKind, NamedNode, PrefixEnvironment};
use tracing::warn;

#[derive(Debug, PartialEq, Eq)]
pub enum TurtleToken<'a> {
    IriRef(String),
    PrefixedName {
        prefix: &'a str,
        local: Cow<'a, str>,
        might_be_invalid_iri: bool,
    },
    BlankNodeLabel(&'a str),
    String(String),
    Integer(&'a str),
    Decimal(&'a str),
    Double(&'a str),
    LangTag(&'a str),
    Punctuation(&'a str),
    PlainKeyword(&'a str),
}

#[derive(Eq, PartialEq, Clone, Copy)]
pub enum TurtleLexerMode {
    /// N-Triples and N-Quads: only `"` strings, no prefixed names nor numbers.
    NTriples,
    Turtle,
}

/// Splits Turtle family documents into tokens.
///
/// The options are the prefix environment of the document: relative IRIs are resolved against its base.
pub struct TurtleLexer {
    mode: TurtleLexerMode,
    lenient: bool,
}

impl TokenRecognizer for TurtleLexer {
    type Token<'a> = TurtleToken<'a>;
    type Options = PrefixEnvironment;

    fn recognize_next_token<'a>(
        &mut self,
        data: &'a [u8],
        is_ending: bool,
        options: &PrefixEnvironment,
    ) -> Option<(usize, Result<TurtleToken<'a>, TokenRecognizerError>)> {
        match *data.first()? {
            b'<' => match data.get(1) {
                Some(b'<') => Some((2, Ok(TurtleToken::Punctuation("<<")))),
                Some(_) => self.recognize_iri(data, is_ending, options),
                None => is_ending.then(|| (1, Err((0, "Unexpected end of file after '<'").into()))),
            },
            b'>' => match data.get(1) {
                Some(b'>') => Some((2, Ok(TurtleToken::Punctuation(">>")))),
                Some(_) => Some((1, Err((0, "Unexpected character '>'").into()))),
                None => is_ending.then(|| (1, Err((0, "Unexpected character '>'").into()))),
            },
            b'_' => match data.get(1) {
                Some(b':') => Self::recognize_blank_node_label(data, is_ending),
                Some(c) => Some((
                    1,
                    Err((0, format!("Unexpected character '_{}'", char::from(*c))).into()),
                )),
                None => is_ending.then(|| (1, Err((0, "Unexpected character '_'").into()))),
            },
            b'"' => {
                if self.mode == TurtleLexerMode::Turtle && starts_long_string(data, b'"', is_ending)? {
                    self.recognize_long_string(data, b'"', is_ending)
                } else {
                    self.recognize_string(data, b'"', is_ending)
                }
            }
            b'\'' if self.mode == TurtleLexerMode::Turtle => {
                if starts_long_string(data, b'\'', is_ending)? {
                    self.recognize_long_string(data, b'\'', is_ending)
                } else {
                    self.recognize_string(data, b'\'', is_ending)
                }
            }
            b'@' => self.recognize_lang_tag(data, is_ending),
            b'.' => match data.get(1) {
                Some(b'0'..=b'9') if self.mode == TurtleLexerMode::Turtle => {
                    Self::recognize_number(data, is_ending)
                }
                Some(_) => Some((1, Ok(TurtleToken::Punctuation(".")))),
                None => is_ending.then_some((1, Ok(TurtleToken::Punctuation(".")))),
            },
            b'^' => match data.get(1) {
                Some(b'^') => Some((2, Ok(TurtleToken::Punctuation("^^")))),
                Some(_) => Some((1, Err((0, "A datatype should be introduced by '^^'").into()))),
                None => is_ending.then(|| (1, Err((0, "Unexpected character '^'").into()))),
            },
            b'(' => Some((1, Ok(TurtleToken::Punctuation("(")))),
            b')' => Some((1, Ok(TurtleToken::Punctuation(")")))),
            b'[' => Some((1, Ok(TurtleToken::Punctuation("[")))),
            b']' => Some((1, Ok(TurtleToken::Punctuation("]")))),
            b'{' => match data.get(1) {
                Some(b'|') => Some((2, Ok(TurtleToken::Punctuation("{|")))),
                Some(_) => Some((1, Ok(TurtleToken::Punctuation("{")))),
                None => is_ending.then_some((1, Ok(TurtleToken::Punctuation("{")))),
            },
            b'}' => Some((1, Ok(TurtleToken::Punctuation("}")))),
            b'|' => match data.get(1) {
                Some(b'}') => Some((2, Ok(TurtleToken::Punctuation("|}")))),
                Some(_) => Some((1, Err((0, "Unexpected character '|'").into()))),
                None => is_ending.then(|| (1, Err((0, "Unexpected character '|'").into()))),
            },
            b',' => Some((1, Ok(TurtleToken::Punctuation(",")))),
            b';' => Some((1, Ok(TurtleToken::Punctuation(";")))),
            b'0'..=b'9' | b'+' | b'-' if self.mode == TurtleLexerMode::Turtle => {
                Self::recognize_number(data, is_ending)
            }
            _ => self.recognize_pname_or_keyword(data, is_ending),
        }
    }
}

impl TurtleLexer {
    pub fn new(mode: TurtleLexerMode, lenient: bool) -> Self {
        Self { mode, lenient }
    }

    fn recognize_iri(
        &self,
        data: &[u8],
        is_ending: bool,
        options: &PrefixEnvironment,
    ) -> Option<(usize, Result<TurtleToken<'static>, TokenRecognizerError>)> {
        // [18] IRIREF  ::=  '<' ([^#x00-#x20<>"{}|^`\] | UCHAR)* '>'
        let mut string = Vec::new();
        let mut i = 1;
        loop {
            let end = memchr2(b'>', b'\\', &data[i..])?;
            if !self.lenient {
                if let Some(bad) = data[i..i + end].iter().position(|c| is_forbidden_in_iri(*c)) {
                    let position = i + bad;
                    return Some((
                        position + 1,
                        Err(TokenRecognizerError::from((
                            position,
                            format!(
                                "The character {:?} is not allowed in IRIs",
                                char::from(data[position])
                            ),
                        ))
                        .with_kind(ErrorKind::InvalidIri)),
                    ));
                }
            }
            string.extend_from_slice(&data[i..i + end]);
            i += end;
            if data[i] == b'>' {
                return Some((i + 1, self.parse_iri(string, 0..i + 1, options)));
            }
            // Escape sequence
            let (consumed, c) = self.recognize_escape(&data[i..], i, false, is_ending)?;
            match c {
                Ok(c) => {
                    if !self.lenient && u8::try_from(c).is_ok_and(is_forbidden_in_iri) {
                        return Some((
                            i + consumed,
                            Err(TokenRecognizerError::from((
                                i..i + consumed,
                                format!("The escaped character {c:?} is not allowed in IRIs"),
                            ))
                            .with_kind(ErrorKind::InvalidIri)),
                        ));
                    }
                    let mut buf = [0; 4];
                    string.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    i += consumed;
                }
                Err(e) => return Some((i + consumed, Err(e))),
            }
        }
    }

    fn parse_iri(
        &self,
        iri: Vec<u8>,
        position: Range<usize>,
        options: &PrefixEnvironment,
    ) -> Result<TurtleToken<'static>, TokenRecognizerError> {
        let iri = string_from_utf8(iri, position.clone())?;
        let invalid = |message: String| {
            TokenRecognizerError::from((position.clone(), message)).with_kind(ErrorKind::InvalidIri)
        };
        Ok(TurtleToken::IriRef(match options.base() {
            Some(base_iri) if self.lenient => base_iri.resolve_unchecked(&iri).into_string(),
            Some(base_iri) => base_iri
                .resolve(&iri)
                .map_err(|e| invalid(e.to_string()))?
                .into_string(),
            None if self.lenient => iri,
            None => Iri::parse(iri)
                .map_err(|e| invalid(format!("The IRI is not absolute and no base IRI is set: {e}")))?
                .into_inner(),
        }))
    }

    fn recognize_pname_or_keyword<'a>(
        &self,
        data: &'a [u8],
        is_ending: bool,
    ) -> Option<(usize, Result<TurtleToken<'a>, TokenRecognizerError>)> {
        // [139s]  PNAME_NS   ::=  PN_PREFIX? ':'
        // [140s]  PNAME_LN   ::=  PNAME_NS PN_LOCAL
        // [167s]  PN_PREFIX  ::=  PN_CHARS_BASE ((PN_CHARS | '.')* PN_CHARS)?
        let mut i = 0;
        loop {
            let Some(r) = recognize_unicode_char(&data[i..], i) else {
                if !is_ending {
                    return None;
                }
                return Some(Self::keyword_until(data, i));
            };
            let (c, consumed) = match r {
                Ok(r) => r,
                Err(e) => return Some((e.location.end, Err(e))),
            };
            if c == ':' && self.mode == TurtleLexerMode::Turtle {
                i += consumed;
                break;
            } else if i == 0 {
                if !is_possible_pn_chars_base(c) {
                    return Some((
                        consumed,
                        Err((
                            0..consumed,
                            format!("Unexpected character '{c}'"),
                        )
                            .into()),
                    ));
                }
                i += consumed;
            } else if is_possible_pn_chars(c) || c == '.' {
                i += consumed;
            } else {
                return Some(Self::keyword_until(data, i));
            }
        }
        let pn_prefix = match str_from_utf8(&data[..i - 1], 0..i - 1) {
            Ok(pn_prefix) => pn_prefix,
            Err(e) => return Some((i, Err(e))),
        };
        if pn_prefix.ends_with('.') {
            return Some((
                i,
                Err((
                    0..i,
                    format!(
                        "'{pn_prefix}' is not a valid prefix: prefixes are not allowed to end with '.'"
                    ),
                )
                    .into()),
            ));
        }

        let (consumed, pn_local_result) =
            self.recognize_optional_pn_local(&data[i..], i, is_ending)?;
        Some((
            consumed + i,
            pn_local_result.map(|(local, might_be_invalid_iri)| TurtleToken::PrefixedName {
                prefix: pn_prefix,
                local,
                might_be_invalid_iri,
            }),
        ))
    }

    /// Returns the keyword of `data[..end]` without its trailing dots.
    fn keyword_until(
        data: &[u8],
        mut end: usize,
    ) -> (usize, Result<TurtleToken<'_>, TokenRecognizerError>) {
        while data[..end].ends_with(b".") {
            end -= 1;
        }
        if end == 0 {
            return (
                1,
                Err((0, format!("Unexpected byte {:#04x}", data[0])).into()),
            );
        }
        (
            end,
            str_from_utf8(&data[..end], 0..end).map(TurtleToken::PlainKeyword),
        )
    }

    fn recognize_optional_pn_local<'a>(
        &self,
        data: &'a [u8],
        offset: usize,
        is_ending: bool,
    ) -> Option<(usize, Result<(Cow<'a, str>, bool), TokenRecognizerError>)> {
        // [168s]  PN_LOCAL  ::=  (PN_CHARS_U | ':' | [0-9] | PLX) ((PN_CHARS | '.' | ':' | PLX)* (PN_CHARS | ':' | PLX))?
        let mut i = 0;
        let mut buffer: Option<String> = None; // Only allocated when there are escaped characters
        let mut copied_up_to = 0;
        let mut might_be_invalid_iri = false;
        let mut trailing_dots = 0;
        loop {
            let Some(r) = recognize_unicode_char(&data[i..], offset + i) else {
                if !is_ending {
                    return None;
                }
                break;
            };
            let (c, consumed) = match r {
                Ok(r) => r,
                Err(e) => return Some((e.location.end - offset, Err(e))),
            };
            if c == '%' {
                // [170s]  PERCENT  ::=  '%' HEX HEX
                let hex = data.get(i + 1..i + 3)?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    return Some((
                        i + 3,
                        Err((
                            offset + i..offset + i + 3,
                            format!(
                                "Percent escapes should be followed by two hexadecimal characters, found '%{}'",
                                String::from_utf8_lossy(hex)
                            ),
                        )
                            .into()),
                    ));
                }
                i += 3;
                trailing_dots = 0;
            } else if c == '\\' {
                // [172s]  PN_LOCAL_ESC  ::=  '\' ('_' | '~' | '.' | '-' | '!' | '$' | '&' | "'" | '(' | ')' | '*' | '+' | ',' | ';' | '=' | '/' | '?' | '#' | '@' | '%')
                let escaped = char::from(*data.get(i + 1)?);
                if matches!(
                    escaped,
                    '_' | '~' | '.' | '-' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ','
                        | ';' | '='
                ) {
                    // Always valid in IRIs
                } else if matches!(escaped, '/' | '?' | '#' | '@' | '%') {
                    might_be_invalid_iri = true;
                } else {
                    return Some((
                        i + 2,
                        Err(TokenRecognizerError::from((
                            offset + i..offset + i + 2,
                            format!(
                                "The characters that are allowed to be escaped in local names are _~.-!$&'()*+,;=/?#@%, found '{escaped}'"
                            ),
                        ))
                        .with_kind(ErrorKind::InvalidEscape)),
                    ));
                }
                let buffer = buffer.get_or_insert_with(String::new);
                match str_from_utf8(&data[copied_up_to..i], offset + copied_up_to..offset + i) {
                    Ok(s) => buffer.push_str(s),
                    Err(e) => return Some((i, Err(e))),
                }
                buffer.push(escaped);
                i += 2;
                copied_up_to = i;
                trailing_dots = 0;
            } else if i == 0 {
                if !(is_possible_pn_chars_u(c) || c == ':' || c.is_ascii_digit()) {
                    return Some((0, Ok((Cow::Borrowed(""), false))));
                }
                might_be_invalid_iri |= is_possible_pn_chars_base_but_not_valid_iri(c) || c == ':';
                i += consumed;
            } else if is_possible_pn_chars(c) || c == ':' {
                might_be_invalid_iri |= is_possible_pn_chars_base_but_not_valid_iri(c) || c == ':';
                i += consumed;
                trailing_dots = 0;
            } else if c == '.' {
                i += consumed;
                trailing_dots += 1;
            } else {
                break;
            }
        }
        // The last dots are not part of the local name
        i -= trailing_dots;
        let tail = match str_from_utf8(&data[copied_up_to..i], offset + copied_up_to..offset + i)
        {
            Ok(tail) => tail,
            Err(e) => return Some((i, Err(e))),
        };
        let local = match buffer {
            Some(mut buffer) => {
                buffer.push_str(tail);
                Cow::Owned(buffer)
            }
            None => Cow::Borrowed(tail),
        };
        Some((i, Ok((local, might_be_invalid_iri))))
    }

    fn recognize_blank_node_label(
        data: &[u8],
        is_ending: bool,
    ) -> Option<(usize, Result<TurtleToken<'_>, TokenRecognizerError>)> {
        // [141s]  BLANK_NODE_LABEL  ::=  '_:' (PN_CHARS_U | [0-9]) ((PN_CHARS | '.')* PN_CHARS)?
        let mut i = 2;
        let mut trailing_dots = 0;
        loop {
            let Some(r) = recognize_unicode_char(&data[i..], i) else {
                if !is_ending {
                    return None;
                }
                break;
            };
            let (c, consumed) = match r {
                Ok(r) => r,
                Err(e) => return Some((e.location.end, Err(e))),
            };
            if i == 2 {
                if !(is_possible_pn_chars_u(c) || c.is_ascii_digit()) {
                    return Some((i, Err((0..i, "A blank node label cannot be empty").into())));
                }
            } else if c == '.' {
                trailing_dots += 1;
                i += consumed;
                continue;
            } else if !is_possible_pn_chars(c) {
                break;
            }
            trailing_dots = 0;
            i += consumed;
        }
        i -= trailing_dots;
        if i == 2 {
            return Some((i, Err((0..i, "A blank node label cannot be empty").into())));
        }
        Some((
            i,
            str_from_utf8(&data[2..i], 2..i).map(TurtleToken::BlankNodeLabel),
        ))
    }

    fn recognize_lang_tag<'a>(
        &self,
        data: &'a [u8],
        is_ending: bool,
    ) -> Option<(usize, Result<TurtleToken<'a>, TokenRecognizerError>)> {
        // [144s]  LANGTAG  ::=  '@' [a-zA-Z]+ ('-' [a-zA-Z0-9]+)*
        let mut i = 1;
        let mut in_first_block = true;
        let mut is_block_empty = true;
        loop {
            let Some(c) = data.get(i) else {
                if !is_ending {
                    return None;
                }
                break;
            };
            if c.is_ascii_alphabetic() || (!in_first_block && c.is_ascii_digit()) {
                is_block_empty = false;
            } else if *c == b'-' && !is_block_empty {
                in_first_block = false;
                is_block_empty = true;
            } else {
                break;
            }
            i += 1;
        }
        if i == 1 {
            return Some((
                1,
                Err(TokenRecognizerError::from((
                    0..1,
                    "A language tag should always start with a letter",
                ))
                .with_kind(ErrorKind::InvalidLanguageTag)),
            ));
        }
        if is_block_empty {
            // We do not consume a trailing '-'
            i -= 1;
        }
        Some((i, self.parse_lang_tag(&data[1..i], 1..i)))
    }

    fn parse_lang_tag<'a>(
        &self,
        lang_tag: &'a [u8],
        position: Range<usize>,
    ) -> Result<TurtleToken<'a>, TokenRecognizerError> {
        let lang_tag = str_from_utf8(lang_tag, position.clone())?;
        if self.lenient || matches!(lang_tag, "prefix" | "base") {
            return Ok(TurtleToken::LangTag(lang_tag));
        }
        Ok(TurtleToken::LangTag(
            LanguageTag::parse(lang_tag)
                .map_err(|e| {
                    TokenRecognizerError::from((position, e.to_string()))
                        .with_kind(ErrorKind::InvalidLanguageTag)
                })?
                .into_inner(),
        ))
    }

    fn recognize_string(
        &self,
        data: &[u8],
        delimiter: u8,
        is_ending: bool,
    ) -> Option<(usize, Result<TurtleToken<'static>, TokenRecognizerError>)> {
        // [22]  STRING_LITERAL_QUOTE         ::=  '"' ([^#x22#x5C#xA#xD] | ECHAR | UCHAR)* '"'
        // [23]  STRING_LITERAL_SINGLE_QUOTE  ::=  "'" ([^#x27#x5C#xA#xD] | ECHAR | UCHAR)* "'"
        let mut string = String::new();
        let mut i = 1;
        loop {
            let end = if self.lenient {
                memchr2(delimiter, b'\\', &data[i..])
            } else {
                // Line jumps are also a stop: they are not allowed
                data[i..]
                    .iter()
                    .position(|c| matches!(*c, b'\\' | b'\n' | b'\r') || *c == delimiter)
            };
            let Some(end) = end else {
                return is_ending.then(|| {
                    (
                        data.len(),
                        Err((0..data.len(), "The string literal is never closed").into()),
                    )
                });
            };
            match str_from_utf8(&data[i..i + end], i..i + end) {
                Ok(s) => string.push_str(s),
                Err(e) => return Some((i + end, Err(e))),
            }
            i += end;
            match data[i] {
                b'\\' => {
                    let (consumed, c) = self.recognize_escape(&data[i..], i, true, is_ending)?;
                    match c {
                        Ok(c) => string.push(c),
                        Err(e) => return Some((i + consumed, Err(e))),
                    }
                    i += consumed;
                }
                b'\n' | b'\r' => {
                    return Some((
                        i + 1,
                        Err((
                            i..i + 1,
                            "Line jumps are not allowed in string literals, use \\n",
                        )
                            .into()),
                    ));
                }
                _ => return Some((i + 1, Ok(TurtleToken::String(string)))),
            }
        }
    }

    fn recognize_long_string(
        &self,
        data: &[u8],
        delimiter: u8,
        is_ending: bool,
    ) -> Option<(usize, Result<TurtleToken<'static>, TokenRecognizerError>)> {
        // [24]  STRING_LITERAL_LONG_SINGLE_QUOTE  ::=  "'''" (("'" | "''")? ([^'\] | ECHAR | UCHAR))* "'''"
        // [25]  STRING_LITERAL_LONG_QUOTE         ::=  '"""' (('"' | '""')? ([^"\] | ECHAR | UCHAR))* '"""'
        let mut string = String::new();
        let mut i = 3;
        loop {
            let Some(end) = memchr2(delimiter, b'\\', &data[i..]) else {
                return is_ending.then(|| {
                    (
                        data.len(),
                        Err((0..data.len(), "The long string literal is never closed").into()),
                    )
                });
            };
            match str_from_utf8(&data[i..i + end], i..i + end) {
                Ok(s) => string.push_str(s),
                Err(e) => return Some((i + end, Err(e))),
            }
            i += end;
            if data[i] == delimiter {
                if data.get(i..i + 3)? == [delimiter; 3] {
                    // There might be up to two other delimiters that are part of the content
                    let mut end = i + 3;
                    while end < i + 5 && data.get(end) == Some(&delimiter) {
                        end += 1;
                    }
                    if end == data.len() && !is_ending {
                        return None;
                    }
                    for _ in i + 3..end {
                        string.push(char::from(delimiter));
                    }
                    return Some((end, Ok(TurtleToken::String(string))));
                }
                string.push(char::from(delimiter));
                i += 1;
            } else {
                let (consumed, c) = self.recognize_escape(&data[i..], i, true, is_ending)?;
                match c {
                    Ok(c) => string.push(c),
                    Err(e) => return Some((i + consumed, Err(e))),
                }
                i += consumed;
            }
        }
    }

    fn recognize_number(
        data: &[u8],
        is_ending: bool,
    ) -> Option<(usize, Result<TurtleToken<'_>, TokenRecognizerError>)> {
        // [19]  INTEGER    ::=  [+-]? [0-9]+
        // [20]  DECIMAL    ::=  [+-]? [0-9]* '.' [0-9]+
        // [21]  DOUBLE     ::=  [+-]? ([0-9]+ '.' [0-9]* EXPONENT | '.' [0-9]+ EXPONENT | [0-9]+ EXPONENT)
        // [154s] EXPONENT  ::=  [eE] [+-]? [0-9]+
        let mut i = 0;
        if matches!(data.first()?, b'+' | b'-') {
            i += 1;
        }
        let count_before = recognize_digits(&data[i..], is_ending)?;
        i += count_before;

        let mut count_after = None;
        if peek(data, i, is_ending)? == Some(b'.') {
            let after = recognize_digits(&data[i + 1..], is_ending)?;
            if after > 0 || peek(data, i + 1, is_ending)?.is_some_and(|c| matches!(c, b'e' | b'E')) {
                i += 1 + after;
                count_after = Some(after);
            }
            // Otherwise the '.' is the end of the statement
        }

        if matches!(peek(data, i, is_ending)?, Some(b'e' | b'E')) {
            i += 1;
            if matches!(peek(data, i, is_ending)?, Some(b'+' | b'-')) {
                i += 1;
            }
            let count_exp = recognize_digits(&data[i..], is_ending)?;
            i += count_exp;
            return Some((
                i,
                if count_exp == 0 {
                    Err((0..i, "A double exponent cannot be empty").into())
                } else if count_before == 0 && count_after.unwrap_or(0) == 0 {
                    Err((0..i, "A double should not be empty").into())
                } else {
                    str_from_utf8(&data[..i], 0..i).map(TurtleToken::Double)
                },
            ));
        }
        Some((
            i,
            match count_after {
                Some(_) => str_from_utf8(&data[..i], 0..i).map(TurtleToken::Decimal),
                None if count_before == 0 => {
                    Err((0..i.max(1), "A number should contain at least one digit").into())
                }
                None => str_from_utf8(&data[..i], 0..i).map(TurtleToken::Integer),
            },
        ))
        .map(|(consumed, result)| (consumed.max(1), result))
    }

    /// Decodes the escape sequence at the start of `data`.
    ///
    /// Returns the number of consumed bytes including the `\`.
    fn recognize_escape(
        &self,
        data: &[u8],
        position: usize,
        with_echar: bool,
        is_ending: bool,
    ) -> Option<(usize, Result<char, TokenRecognizerError>)> {
        // [26]   UCHAR  ::=  '\u' HEX HEX HEX HEX | '\U' HEX HEX HEX HEX HEX HEX HEX HEX
        // [159s] ECHAR  ::=  '\' [tbnrf"'\]
        let escape_error = |range: Range<usize>, message: String| {
            Some((
                range.end - position,
                Err(TokenRecognizerError::from((range, message)).with_kind(ErrorKind::InvalidEscape)),
            ))
        };
        let c = match *data.get(1)? {
            b'u' => {
                let code_point = match parse_hex(data.get(2..6)?) {
                    Ok(code_point) => code_point,
                    Err(hex) => {
                        return escape_error(
                            position..position + 6,
                            format!("The escape sequence '\\u{hex}' is not a valid hexadecimal string"),
                        );
                    }
                };
                match code_point {
                    0xD800..=0xDBFF => {
                        let following = &data[6..];
                        if following.len() < 6 && !is_ending {
                            return None;
                        }
                        let low = following
                            .strip_prefix(b"\\u")
                            .and_then(|f| f.get(..4))
                            .and_then(|hex| parse_hex(hex).ok())
                            .filter(|low| matches!(low, 0xDC00..=0xDFFF));
                        if let Some(low) = low {
                            let c = 0x10000 + ((code_point - 0xD800) << 10) + (low - 0xDC00);
                            return Some((12, char::from_u32(c).ok_or_else(|| {
                                TokenRecognizerError::from((position..position + 12, "Invalid UTF-16 surrogate pair"))
                                    .with_kind(ErrorKind::InvalidEscape)
                            })));
                        }
                        return self.lone_surrogate(position, code_point);
                    }
                    0xDC00..=0xDFFF => return self.lone_surrogate(position, code_point),
                    _ => {
                        return Some((6, char::from_u32(code_point).ok_or_else(|| {
                            TokenRecognizerError::from((position..position + 6, format!("The escape sequence '\\u{code_point:04X}' is not a valid unicode character")))
                                .with_kind(ErrorKind::InvalidEscape)
                        })));
                    }
                }
            }
            b'U' => {
                let code_point = match parse_hex(data.get(2..10)?) {
                    Ok(code_point) => code_point,
                    Err(hex) => {
                        return escape_error(
                            position..position + 10,
                            format!("The escape sequence '\\U{hex}' is not a valid hexadecimal string"),
                        );
                    }
                };
                return match char::from_u32(code_point) {
                    Some(c) => Some((10, Ok(c))),
                    None => escape_error(
                        position..position + 10,
                        format!("The escape sequence '\\U{code_point:08X}' is encoding {code_point:X} that is not a valid unicode character"),
                    ),
                };
            }
            b't' if with_echar => '\t',
            b'b' if with_echar => '\x08',
            b'n' if with_echar => '\n',
            b'r' if with_echar => '\r',
            b'f' if with_echar => '\x0C',
            b'"' if with_echar => '"',
            b'\'' if with_echar => '\'',
            b'\\' if with_echar => '\\',
            c => {
                return escape_error(
                    position..position + 2,
                    format!("Unexpected escape character '\\{}'", char::from(c)),
                );
            }
        };
        Some((2, Ok(c)))
    }

    fn lone_surrogate(
        &self,
        position: usize,
        code_point: u32,
    ) -> Option<(usize, Result<char, TokenRecognizerError>)> {
        if self.lenient {
            warn!(
                "Replacing the lone UTF-16 surrogate escape \\u{code_point:04X} by U+FFFD"
            );
            return Some((6, Ok(char::REPLACEMENT_CHARACTER)));
        }
        Some((
            6,
            Err(TokenRecognizerError::from((
                position..position + 6,
                format!(
                    "The escape sequence '\\u{code_point:04X}' is a UTF-16 surrogate that is not part of a valid pair"
                ),
            ))
            .with_kind(ErrorKind::InvalidEscape)),
        ))
    }
}

/// Resolves the prefixed name `prefix:local` in `env`.
pub fn resolve_local_name(
    prefix: &str,
    local: &str,
    might_be_invalid_iri: bool,
    env: &PrefixEnvironment,
) -> Result<NamedNode, RuleRecognizerError> {
    let Some(namespace) = env.lookup(prefix) else {
        return Err(RuleRecognizerError::new(
            ErrorKind::UndefinedPrefix,
            format!("The prefix {prefix}: has not been declared"),
        ));
    };
    let iri = format!("{namespace}{local}");
    if might_be_invalid_iri || Iri::parse_unchecked(namespace).path().is_empty() {
        // We validate again. We always validate if the local part might be the IRI authority.
        if let Err(e) = Iri::parse(iri.as_str()) {
            return Err(RuleRecognizerError::new(
                ErrorKind::InvalidIri,
                format!("The prefixed name {prefix}:{local} builds IRI {iri} that is invalid: {e}"),
            ));
        }
    }
    Ok(NamedNode::new_unchecked(iri))
}

/// `None` if more data is needed to know if `data` starts with a triple delimiter.
fn starts_long_string(data: &[u8], delimiter: u8, is_ending: bool) -> Option<bool> {
    match data.get(1..3) {
        Some(next) => Some(next == [delimiter; 2]),
        None if is_ending => Some(false),
        None => None,
    }
}

fn is_forbidden_in_iri(c: u8) -> bool {
    c <= 0x20 || matches!(c, b'<' | b'"' | b'{' | b'}' | b'|' | b'^' | b'`' | 0x7F)
}

/// Parses hexadecimal digits, returns the lossy string on failure.
fn parse_hex(hex: &[u8]) -> Result<u32, String> {
    let mut value = 0;
    for c in hex {
        value = value * 16
            + u32::from(match c {
                b'0'..=b'9' => c - b'0',
                b'a'..=b'f' => c - b'a' + 10,
                b'A'..=b'F' => c - b'A' + 10,
                _ => return Err(String::from_utf8_lossy(hex).into_owned()),
            });
    }
    Ok(value)
}

/// `Some(None)` is the end of the document, `None` means more data is needed.
fn peek(data: &[u8], i: usize, is_ending: bool) -> Option<Option<u8>> {
    match data.get(i) {
        Some(c) => Some(Some(*c)),
        None if is_ending => Some(None),
        None => None,
    }
}

fn recognize_digits(data: &[u8], is_ending: bool) -> Option<usize> {
    match data.iter().position(|c| !c.is_ascii_digit()) {
        Some(count) => Some(count),
        None => is_ending.then_some(data.len()),
    }
}

fn recognize_unicode_char(
    data: &[u8],
    position: usize,
) -> Option<Result<(char, usize), TokenRecognizerError>> {
    let first = *data.first()?;
    let len = match first {
        0x00..=0x7F => return Some(Ok((char::from(first), 1))),
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => {
            return Some(Err(
                (position..=position, "Invalid UTF-8 character encoding").into()
            ));
        }
    };
    let Some(bytes) = data.get(..len) else {
        // We check the available bytes first to fail early
        return match str::from_utf8(data) {
            Err(e) if e.error_len().is_some() => Some(Err((
                position..position + data.len(),
                "Invalid UTF-8 character encoding",
            )
                .into())),
            _ => None,
        };
    };
    match str::from_utf8(bytes).ok().and_then(|s| s.chars().next()) {
        Some(c) => Some(Ok((c, len))),
        None => Some(Err(
            (position..position + len, "Invalid UTF-8 character encoding").into(),
        )),
    }
}

// [157s]  PN_CHARS_BASE  ::=  [A-Z] | [a-z] | [#x00C0-#x00D6] | [#x00D8-#x00F6] | [#x00F8-#x02FF] | [#x0370-#x037D] | [#x037F-#x1FFF] | [#x200C-#x200D] | [#x2070-#x218F] | [#x2C00-#x2FEF] | [#x3001-#xD7FF] | [#xF900-#xFDCF] | [#xFDF0-#xFFFD] | [#x10000-#xEFFFF]
pub(crate) fn is_possible_pn_chars_base(c: char) -> bool {
    matches!(c,
        'A'..='Z'
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

// [158s]  PN_CHARS_U  ::=  PN_CHARS_BASE | '_'
pub(crate) fn is_possible_pn_chars_u(c: char) -> bool {
    is_possible_pn_chars_base(c) || c == '_'
}

// [160s]  PN_CHARS  ::=  PN_CHARS_U | '-' | [0-9] | #x00B7 | [#x0300-#x036F] | [#x203F-#x2040]
pub(crate) fn is_possible_pn_chars(c: char) -> bool {
    is_possible_pn_chars_u(c)
        || matches!(c,
        '-' | '0'..='9' | '\u{00B7}' | '\u{0300}'..='\u{036F}' | '\u{203F}'..='\u{2040}')
}

fn is_possible_pn_chars_base_but_not_valid_iri(c: char) -> bool {
    matches!(c, '\u{FFF0}'..='\u{FFFD}')
        || u32::from(c) % u32::from('\u{FFFE}') == 0
        || u32::from(c) % u32::from('\u{FFFF}') == 0
}

fn str_from_utf8(data: &[u8], range: Range<usize>) -> Result<&str, TokenRecognizerError> {
    str::from_utf8(data).map_err(|e| {
        (
            range.start + e.valid_up_to()..min(range.end, range.start + e.valid_up_to() + 4),
            format!("Invalid UTF-8: {e}"),
        )
            .into()
    })
}

fn string_from_utf8(data: Vec<u8>, range: Range<usize>) -> Result<String, TokenRecognizerError> {
    String::from_utf8(data).map_err(|e| {
        (
            range.start + e.utf8_error().valid_up_to()
                ..min(range.end, range.start + e.utf8_error().valid_up_to() + 4),
            format!("Invalid UTF-8: {e}"),
        )
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(mode: TurtleLexerMode, data: &str) -> Vec<String> {
        let mut lexer = TurtleLexer::new(mode, false);
        let env = PrefixEnvironment::default();
        let mut data = data.as_bytes();
        let mut tokens = Vec::new();
        while !data.is_empty() {
            data = data.trim_ascii_start();
            let Some((consumed, token)) = lexer.recognize_next_token(data, true, &env) else {
                break;
            };
            tokens.push(match token {
                Ok(token) => format!("{token:?}"),
                Err(e) => format!("{:?}: {}", e.kind, e.message),
            });
            data = &data[consumed..];
        }
        tokens
    }

    #[test]
    fn numbers() {
        assert_eq!(
            tokenize(TurtleLexerMode::Turtle, "1 -2.5 .5e3 3."),
            [
                "Integer(\"1\")",
                "Decimal(\"-2.5\")",
                "Double(\".5e3\")",
                "Integer(\"3\")",
                "Punctuation(\".\")"
            ]
        );
    }

    #[test]
    fn prefixed_names_drop_trailing_dots() {
        assert_eq!(
            tokenize(TurtleLexerMode::Turtle, "ex:a.b. a"),
            [
                "PrefixedName { prefix: \"ex\", local: \"a.b\", might_be_invalid_iri: false }",
                "Punctuation(\".\")",
                "PlainKeyword(\"a\")"
            ]
        );
    }

    #[test]
    fn local_name_escapes() {
        assert_eq!(
            tokenize(TurtleLexerMode::Turtle, r"ex:a\~b%20"),
            ["PrefixedName { prefix: \"ex\", local: \"a~b%20\", might_be_invalid_iri: false }"]
        );
    }

    #[test]
    fn surrogate_pairs_are_combined() {
        assert_eq!(
            tokenize(TurtleLexerMode::NTriples, r#""\uD83D\uDE00""#),
            ["String(\"\u{1F600}\")"]
        );
    }

    #[test]
    fn lone_surrogate_is_an_invalid_escape() {
        assert_eq!(
            tokenize(TurtleLexerMode::NTriples, r#""\uD800""#)[0],
            "InvalidEscape: The escape sequence '\\uD800' is a UTF-16 surrogate that is not part of a valid pair"
        );
    }

    #[test]
    fn out_of_range_escape() {
        assert!(tokenize(TurtleLexerMode::NTriples, r#""\UFFFFFFFF""#)[0].starts_with("InvalidEscape"));
    }

    #[test]
    fn relative_iri_without_base() {
        assert!(tokenize(TurtleLexerMode::NTriples, "<foo>")[0].starts_with("InvalidIri"));
    }

    #[test]
    fn iri_with_space() {
        assert!(tokenize(TurtleLexerMode::NTriples, "<http://a b>")[0].starts_with("InvalidIri"));
    }

    #[test]
    fn language_tags() {
        assert_eq!(
            tokenize(TurtleLexerMode::Turtle, "@en-GB @prefix"),
            ["LangTag(\"en-GB\")", "LangTag(\"prefix\")"]
        );
    }
}
