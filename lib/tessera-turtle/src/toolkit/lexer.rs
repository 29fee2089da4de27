use crate::toolkit::error::{TextPosition, TurtleSyntaxError};
use memchr::{memchr_iter, memchr2, memrchr};
use std::cmp::min;
use std::io::{self, Read};
use std::ops::{Deref, Range, RangeInclusive};
use tessera_model::ErrorKind;

pub trait TokenRecognizer {
    type Token<'a>
    where
        Self: 'a;
    type Options: Default;

    fn recognize_next_token<'a>(
        &mut self,
        data: &'a [u8],
        is_ending: bool,
        options: &Self::Options,
    ) -> Option<(usize, Result<Self::Token<'a>, TokenRecognizerError>)>;
}

pub struct TokenRecognizerError {
    pub location: Range<usize>,
    pub message: String,
    pub kind: ErrorKind,
}

impl TokenRecognizerError {
    /// Overrides the default [`ErrorKind::Lexical`] kind.
    #[must_use]
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }
}

impl<S: Into<String>> From<(Range<usize>, S)> for TokenRecognizerError {
    fn from((location, message): (Range<usize>, S)) -> Self {
        Self {
            location,
            message: message.into(),
            kind: ErrorKind::Lexical,
        }
    }
}

#[expect(clippy::range_plus_one)]
impl<S: Into<String>> From<(RangeInclusive<usize>, S)> for TokenRecognizerError {
    fn from((location, message): (RangeInclusive<usize>, S)) -> Self {
        (*location.start()..*location.end() + 1, message).into()
    }
}

impl<S: Into<String>> From<(usize, S)> for TokenRecognizerError {
    fn from((location, message): (usize, S)) -> Self {
        (location..=location, message).into()
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum TokenOrLineJump<T> {
    Token(T),
    LineJump,
}

#[derive(Clone, Copy)]
struct Position {
    line_start_buffer_offset: usize,
    buffer_offset: usize,
    global_offset: u64,
    global_line: u64,
}

impl Position {
    fn advance(&mut self, data: &[u8], consumed: usize) {
        let end = self.buffer_offset + consumed;
        let consumed_data = &data[self.buffer_offset..end];
        let line_jumps = memchr_iter(b'\n', consumed_data).count();
        if let Some(last_line_jump) = memrchr(b'\n', consumed_data) {
            self.line_start_buffer_offset = self.buffer_offset + last_line_jump + 1;
        }
        self.global_line += line_jumps as u64;
        self.global_offset += consumed as u64;
        self.buffer_offset = end;
    }
}

pub struct Lexer<B, R: TokenRecognizer> {
    parser: R,
    data: B,
    position: Position,
    previous_position: Position, // Start of the last returned token
    is_ending: bool,
    min_buffer_size: usize,
    max_buffer_size: usize,
    is_line_jump_whitespace: bool,
    line_comment_start: Option<&'static [u8]>,
}

impl<B, R: TokenRecognizer> Lexer<B, R> {
    pub fn new(
        parser: R,
        data: B,
        is_ending: bool,
        min_buffer_size: usize,
        max_buffer_size: usize,
        is_line_jump_whitespace: bool,
        line_comment_start: Option<&'static [u8]>,
    ) -> Self {
        let position = Position {
            line_start_buffer_offset: 0,
            buffer_offset: 0,
            global_offset: 0,
            global_line: 0,
        };
        Self {
            parser,
            data,
            position,
            previous_position: position,
            is_ending,
            min_buffer_size,
            max_buffer_size,
            is_line_jump_whitespace,
            line_comment_start,
        }
    }
}

impl<R: TokenRecognizer> Lexer<Vec<u8>, R> {
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.shrink_data();
        self.data.extend_from_slice(other);
    }

    #[inline]
    pub fn end(&mut self) {
        self.is_ending = true;
    }

    pub fn extend_from_reader(&mut self, reader: &mut impl Read) -> io::Result<()> {
        self.shrink_data();
        if self.data.len() == self.max_buffer_size {
            return Err(io::Error::new(
                io::ErrorKind::OutOfMemory,
                format!(
                    "Reached the buffer maximal size of {}",
                    self.max_buffer_size
                ),
            ));
        }
        let min_end = min(self.data.len() + self.min_buffer_size, self.max_buffer_size);
        let new_start = self.data.len();
        self.data.resize(min_end, 0);
        if self.data.len() < self.data.capacity() {
            // We keep extending to have as much space as available without reallocation
            self.data.resize(self.data.capacity(), 0);
        }
        let read = reader.read(&mut self.data[new_start..])?;
        self.data.truncate(new_start + read);
        self.is_ending = read == 0;
        Ok(())
    }

    /// Drops the bytes before the start of the current line.
    ///
    /// The current line is kept to be able to compute column numbers.
    fn shrink_data(&mut self) {
        let start = self.position.line_start_buffer_offset;
        if start > 0 {
            self.data.copy_within(start.., 0);
            self.data.truncate(self.data.len() - start);
            self.position.buffer_offset -= start;
            self.position.line_start_buffer_offset = 0;
            self.previous_position = self.position;
        }
    }
}

impl<B: Deref<Target = [u8]>, R: TokenRecognizer> Lexer<B, R> {
    pub fn read_next(
        &mut self,
        options: &R::Options,
    ) -> Option<Result<TokenOrLineJump<R::Token<'_>>, TurtleSyntaxError>> {
        self.skip_whitespaces_and_comments()?;
        self.previous_position = self.position;
        if !self.is_line_jump_whitespace {
            match self.data.get(self.position.buffer_offset..) {
                Some([b'\r', b'\n', ..]) => {
                    self.position.advance(&self.data, 2);
                    return Some(Ok(TokenOrLineJump::LineJump));
                }
                Some([b'\r' | b'\n', ..]) => {
                    self.position.advance(&self.data, 1);
                    return Some(Ok(TokenOrLineJump::LineJump));
                }
                _ => (),
            }
        }
        let Some((consumed, result)) = self.parser.recognize_next_token(
            &self.data[self.position.buffer_offset..],
            self.is_ending,
            options,
        ) else {
            return if self.is_ending {
                if self.position.buffer_offset == self.data.len() {
                    None // We have finished
                } else {
                    let location = self.location_from_buffer_offset_range(
                        self.position.buffer_offset..self.data.len(),
                    );
                    // We consume everything
                    self.position
                        .advance(&self.data, self.data.len() - self.position.buffer_offset);
                    Some(Err(TurtleSyntaxError::new(
                        ErrorKind::Lexical,
                        location,
                        "Unexpected end of file",
                    )))
                }
            } else {
                None
            };
        };
        debug_assert!(
            consumed > 0,
            "The lexer must consume at least one byte each time"
        );
        debug_assert!(
            self.position.buffer_offset + consumed <= self.data.len(),
            "The lexer tried to consumed {consumed} bytes but only {} bytes are readable",
            self.data.len() - self.position.buffer_offset
        );
        self.position.advance(&self.data, consumed);
        Some(match result {
            Ok(token) => Ok(TokenOrLineJump::Token(token)),
            Err(e) => {
                let start = self.previous_position.buffer_offset;
                Err(TurtleSyntaxError::new(
                    e.kind,
                    self.location_from_buffer_offset_range(
                        start + e.location.start..start + e.location.end,
                    ),
                    e.message,
                ))
            }
        })
    }

    pub fn location_from_buffer_offset_range(
        &self,
        offset_range: Range<usize>,
    ) -> Range<TextPosition> {
        self.text_position(offset_range.start)..self.text_position(offset_range.end)
    }

    /// Computes the position of a buffer offset located after the start of the last token.
    fn text_position(&self, buffer_offset: usize) -> TextPosition {
        let from = self.previous_position;
        let buffer_offset = buffer_offset.clamp(from.buffer_offset, self.data.len());
        let between = &self.data[from.buffer_offset..buffer_offset];
        let (line, line_start) = match memrchr(b'\n', between) {
            Some(last_line_jump) => (
                from.global_line + memchr_iter(b'\n', between).count() as u64,
                from.buffer_offset + last_line_jump + 1,
            ),
            None => (from.global_line, from.line_start_buffer_offset),
        };
        TextPosition {
            line,
            column: count_code_points(&self.data[line_start..buffer_offset]),
            offset: from.global_offset + (buffer_offset - from.buffer_offset) as u64,
        }
    }

    pub fn last_token_location(&self) -> Range<TextPosition> {
        self.location_from_buffer_offset_range(
            self.previous_position.buffer_offset..self.position.buffer_offset,
        )
    }

    pub fn last_token_source(&self) -> String {
        String::from_utf8_lossy(
            &self.data[self.previous_position.buffer_offset..self.position.buffer_offset],
        )
        .into_owned()
    }

    /// Number of lines read so far.
    pub fn line_count(&self) -> u64 {
        self.position.global_line
    }

    pub fn is_end(&self) -> bool {
        self.is_ending && self.data.len() == self.position.buffer_offset
    }

    fn skip_whitespaces_and_comments(&mut self) -> Option<()> {
        loop {
            self.skip_whitespaces();

            let buf = &self.data[self.position.buffer_offset..];
            if let Some(line_comment_start) = self.line_comment_start {
                if buf.starts_with(line_comment_start) {
                    // Comment
                    if let Some(end) = memchr2(b'\r', b'\n', &buf[line_comment_start.len()..]) {
                        self.position
                            .advance(&self.data, end + line_comment_start.len());
                        continue;
                    }
                    if self.is_ending {
                        // EOF
                        self.position
                            .advance(&self.data, self.data.len() - self.position.buffer_offset);
                        return Some(());
                    }
                    return None; // We need more data
                }
            }
            return Some(());
        }
    }

    fn skip_whitespaces(&mut self) {
        let buf = &self.data[self.position.buffer_offset..];
        let count = if self.is_line_jump_whitespace {
            buf.iter()
                .position(|c| !matches!(c, b' ' | b'\t' | b'\r' | b'\n'))
        } else {
            buf.iter().position(|c| !matches!(c, b' ' | b'\t'))
        }
        .unwrap_or(buf.len());
        self.position.advance(&self.data, count);
    }
}

fn count_code_points(data: &[u8]) -> u64 {
    data.iter().filter(|b| (**b & 0xC0) != 0x80).count() as u64
}
