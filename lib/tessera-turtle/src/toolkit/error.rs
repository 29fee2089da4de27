use std::ops::Range;
use std::{fmt, io};
use tessera_model::ErrorKind;

/// A position in a text i.e. a `line` number starting from 0, a `column` number starting from 0 (in number of code points) and a global file `offset` starting from 0 (in number of bytes).
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default)]
pub struct TextPosition {
    pub line: u64,
    pub column: u64,
    pub offset: u64,
}

/// An error in the syntax of the parsed file.
///
/// It is composed of an [`ErrorKind`], a message and a range of positions in the input.
#[derive(Debug, thiserror::Error)]
pub struct TurtleSyntaxError {
    kind: ErrorKind,
    location: Range<TextPosition>,
    message: String,
}

impl TurtleSyntaxError {
    pub(crate) fn new(
        kind: ErrorKind,
        location: Range<TextPosition>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location,
            message: message.into(),
        }
    }

    /// The kind of failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The location of the error inside of the file.
    #[inline]
    pub fn location(&self) -> Range<TextPosition> {
        self.location.clone()
    }

    /// The error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TurtleSyntaxError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.start.offset + 1 >= self.location.end.offset {
            write!(
                f,
                "{} at line {} column {} (byte {}): {}",
                self.kind,
                self.location.start.line + 1,
                self.location.start.column + 1,
                self.location.start.offset,
                self.message
            )
        } else if self.location.start.line == self.location.end.line {
            write!(
                f,
                "{} at line {} between columns {} and {} (byte {}): {}",
                self.kind,
                self.location.start.line + 1,
                self.location.start.column + 1,
                self.location.end.column + 1,
                self.location.start.offset,
                self.message
            )
        } else {
            write!(
                f,
                "{} between line {} column {} and line {} column {} (byte {}): {}",
                self.kind,
                self.location.start.line + 1,
                self.location.start.column + 1,
                self.location.end.line + 1,
                self.location.end.column + 1,
                self.location.start.offset,
                self.message
            )
        }
    }
}

impl From<TurtleSyntaxError> for io::Error {
    #[inline]
    fn from(error: TurtleSyntaxError) -> Self {
        Self::new(io::ErrorKind::InvalidData, error)
    }
}

/// A parsing error.
///
/// It is the union of [`TurtleSyntaxError`] and [`io::Error`].
#[derive(Debug, thiserror::Error)]
pub enum TurtleParseError {
    /// I/O error during parsing (file not found...).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// An error in the file syntax.
    #[error(transparent)]
    Syntax(#[from] TurtleSyntaxError),
}

impl TurtleParseError {
    /// The kind of failure, [`ErrorKind::ReadFailure`] for I/O errors.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::ReadFailure,
            Self::Syntax(e) => e.kind(),
        }
    }
}

impl From<TurtleParseError> for io::Error {
    #[inline]
    fn from(error: TurtleParseError) -> Self {
        match error {
            TurtleParseError::Syntax(e) => e.into(),
            TurtleParseError::Io(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_single_position() {
        let position = TextPosition {
            line: 2,
            column: 4,
            offset: 30,
        };
        let error = TurtleSyntaxError::new(
            ErrorKind::UndefinedPrefix,
            position..TextPosition {
                offset: 31,
                column: 5,
                ..position
            },
            "The prefix ex: has not been declared",
        );
        assert_eq!(
            error.to_string(),
            "UndefinedPrefix at line 3 column 5 (byte 30): The prefix ex: has not been declared"
        );
    }

    #[test]
    fn io_conversion_keeps_kind() {
        let error = TurtleParseError::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(error.kind(), ErrorKind::ReadFailure);
        assert_eq!(io::Error::from(error).kind(), io::ErrorKind::BrokenPipe);
    }
}
