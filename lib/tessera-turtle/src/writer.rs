use std::io::Write;
use tessera_model::SerializerError;

/// Wraps a [`Write`] and keeps the first error raised while writing to it.
///
/// Once an error has been returned, every following operation returns a clone of it.
pub(crate) struct FailableWriter<W: Write> {
    writer: W,
    failure: Option<SerializerError>,
}

impl<W: Write> FailableWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failure: None,
        }
    }

    /// Runs `action` against the inner writer unless a previous call failed.
    pub fn run(
        &mut self,
        action: impl FnOnce(&mut W) -> Result<(), SerializerError>,
    ) -> Result<(), SerializerError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        action(&mut self.writer).or_else(|e| self.fail(e))
    }

    /// Records `error` as the failure of the writer, unless it already failed.
    pub fn fail(&mut self, error: SerializerError) -> Result<(), SerializerError> {
        Err(self.failure.get_or_insert(error).clone())
    }

    /// Flushes the inner writer and returns it.
    pub fn finish(mut self) -> Result<W, SerializerError> {
        if let Some(failure) = self.failure {
            return Err(failure);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tessera_model::ErrorKind;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn keeps_first_failure() {
        let mut writer = FailableWriter::new(BrokenPipe);
        let error = writer
            .run(|w| Ok(w.write_all(b"foo")?))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::WriteFailure);
        let again = writer
            .run(|_| Err(SerializerError::invalid_term("other")))
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::WriteFailure);
        assert_eq!(writer.finish().err().map(|e| e.kind()), Some(ErrorKind::WriteFailure));
    }
}
