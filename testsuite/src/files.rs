use anyhow::{Context, Result, bail};
use std::error::Error;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tessera::model::Dataset;
use tessera::{CodecOptions, JsonLdRemoteDocument, RdfFormat, load_dataset};
use tracing::debug;

/// Maps the IRIs used by the manifests to the files of a local copy of the test suites.
///
/// Each mapping binds an IRI prefix to a directory. The longest matching prefix wins.
#[derive(Clone, Debug, Default)]
pub struct FileResolver {
    mappings: Vec<(String, PathBuf)>,
}

impl FileResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps the `file:` IRI of `directory` and all its descendants to itself.
    pub fn with_local_directory(mut self, directory: impl AsRef<Path>) -> Result<Self> {
        let directory = std::path::absolute(directory.as_ref())?;
        let mut prefix = path_to_url(&directory)?;
        if !prefix.ends_with('/') {
            prefix.push('/');
        }
        self.add_mapping(prefix, directory);
        Ok(self)
    }

    /// Binds `prefix` to `directory`, replacing a previous binding of the same prefix.
    pub fn add_mapping(&mut self, prefix: impl Into<String>, directory: impl Into<PathBuf>) {
        let prefix = prefix.into();
        let directory = directory.into();
        debug!(prefix, directory = %directory.display(), "Mapping test suite IRIs");
        self.mappings.retain(|(p, _)| *p != prefix);
        self.mappings.push((prefix, directory));
    }

    /// The local path of the file identified by `url`.
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let url = url.split_once('#').map_or(url, |(url, _)| url);
        let Some((prefix, directory)) = self
            .mappings
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
        else {
            bail!("Not supported url for file: {url}")
        };
        let mut path = directory.clone();
        for segment in url[prefix.len()..].split('/') {
            match segment {
                "" | "." => (),
                ".." => bail!("The url {url} escapes the test suite directory"),
                segment => path.push(percent_decode(segment)?),
            }
        }
        Ok(path)
    }

    pub fn open(&self, url: &str) -> Result<BufReader<File>> {
        let path = self.resolve(url)?;
        File::open(&path)
            .map(BufReader::new)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn read_to_vec(&self, url: &str) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.open(url)?.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Options parsing `url` with it as base IRI and JSON-LD contexts loaded from the local copy.
    pub fn codec_options(&self, base_iri: &str) -> Result<CodecOptions> {
        let resolver = self.clone();
        Ok(CodecOptions::new()
            .with_base_iri(base_iri)?
            .with_remote_context_loader(
                move |url: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
                    Ok(JsonLdRemoteDocument {
                        document: resolver.read_to_vec(url).map_err(|e| e.to_string())?,
                        document_url: url.into(),
                    })
                },
            ))
    }

    /// Parses the file identified by `url` using `base_iri` to resolve relative IRIs.
    pub fn load_dataset(&self, url: &str, format: RdfFormat, base_iri: &str) -> Result<Dataset> {
        let options = self.codec_options(base_iri)?;
        Ok(load_dataset(format, self.open(url)?, &options)?)
    }
}

pub fn guess_rdf_format(url: &str) -> Result<RdfFormat> {
    url.rsplit_once('.')
        .and_then(|(_, extension)| RdfFormat::from_extension(extension))
        .with_context(|| format!("Serialization type not found for {url}"))
}

/// The `file:` IRI of an absolute path.
pub fn path_to_url(path: &Path) -> Result<String> {
    const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

    let Some(path) = path.to_str() else {
        bail!("The path {} is not valid UTF-8", path.display())
    };
    let path = path.replace('\\', "/");
    let mut url = String::from("file://");
    if !path.starts_with('/') {
        url.push('/');
    }
    for byte in path.bytes() {
        if byte.is_ascii_alphanumeric() || b"-._~/:@!$&'()*+,;=".contains(&byte) {
            url.push(char::from(byte));
        } else {
            url.push('%');
            url.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
            url.push(char::from(HEX_DIGITS[usize::from(byte & 0xF)]));
        }
    }
    Ok(url)
}

fn percent_decode(segment: &str) -> Result<String> {
    let mut bytes = Vec::with_capacity(segment.len());
    let mut input = segment.bytes();
    while let Some(byte) = input.next() {
        if byte == b'%' {
            let (Some(high), Some(low)) = (input.next(), input.next()) else {
                bail!("Truncated percent encoding in {segment}")
            };
            let hex = [high, low];
            let hex = std::str::from_utf8(&hex)?;
            bytes.push(u8::from_str_radix(hex, 16)?);
        } else {
            bytes.push(byte);
        }
    }
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_prefix_wins() -> Result<()> {
        let mut resolver = FileResolver::new();
        resolver.add_mapping("http://example.com/tests/", "/suite");
        resolver.add_mapping("http://example.com/tests/turtle/", "/other");
        assert_eq!(
            resolver.resolve("http://example.com/tests/turtle/a%20b.ttl#frag")?,
            Path::new("/other/a b.ttl")
        );
        assert_eq!(
            resolver.resolve("http://example.com/tests/nt/a.nt")?,
            Path::new("/suite/nt/a.nt")
        );
        assert!(resolver.resolve("http://example.org/a.nt").is_err());
        assert!(resolver.resolve("http://example.com/tests/../secret").is_err());
        Ok(())
    }

    #[test]
    fn local_paths_round_trip() -> Result<()> {
        let resolver = FileResolver::new().with_local_directory("/tmp/test suite")?;
        let url = path_to_url(Path::new("/tmp/test suite/manifest.ttl"))?;
        assert_eq!(url, "file:///tmp/test%20suite/manifest.ttl");
        assert_eq!(
            resolver.resolve(&url)?,
            Path::new("/tmp/test suite/manifest.ttl")
        );
        Ok(())
    }

    #[test]
    fn formats_are_guessed_from_extensions() -> Result<()> {
        assert_eq!(guess_rdf_format("http://e/manifest.ttl")?, RdfFormat::Turtle);
        assert_eq!(guess_rdf_format("http://e/0001-out.nq")?, RdfFormat::NQuads);
        assert!(guess_rdf_format("http://e/README").is_err());
        Ok(())
    }
}
