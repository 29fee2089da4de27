#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod codec;
mod error;
mod format;
mod options;
mod parser;
mod serializer;

pub use crate::codec::{
    dump_dataset, load_dataset, read, read_jsonld, read_nquads, read_ntriples, read_rdfxml,
    read_trig, read_turtle, write, write_jsonld, write_nquads, write_ntriples, write_rdfxml,
    write_trig, write_turtle,
};
pub use crate::error::{CodecOptionsError, RdfParseError, RdfSyntaxError};
pub use crate::format::RdfFormat;
pub use crate::options::CodecOptions;
pub use crate::parser::{RdfParser, ReaderQuadParser, SliceQuadParser};
pub use crate::serializer::{RdfSerializer, WriterQuadSerializer};
pub use tessera_jsonld::JsonLdRemoteDocument;
pub use tessera_turtle::TextPosition;
/// The RDF data model: terms, triples, quads and datasets.
pub use tessera_model as model;
