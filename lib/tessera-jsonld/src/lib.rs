#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod context;
mod error;
mod expansion;
mod json;
mod serializer;
mod to_rdf;

pub use crate::context::{JsonLdRemoteDocument, LoadDocumentCallback};
pub use crate::error::{JsonLdErrorCode, JsonLdParseError, JsonLdSyntaxError};
pub use crate::serializer::{JsonLdSerializer, WriterJsonLdSerializer};
pub use crate::to_rdf::{JsonLdParser, JsonLdPrefixesIter, ReaderJsonLdParser, SliceJsonLdParser};

/// Maximal number of nested remote contexts.
const MAX_CONTEXT_RECURSION: usize = 8;
