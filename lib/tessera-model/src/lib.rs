#![doc = include_str!("../README.md")]
#![doc(test(attr(deny(warnings))))]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod blank_node;
pub mod dataset;
mod env;
mod error;
mod iri;
mod literal;
mod named_node;
mod scope;
mod triple;
pub mod vocab;

pub use crate::blank_node::{BlankNode, BlankNodeIdParseError};
pub use crate::dataset::Dataset;
pub use crate::env::{PrefixEnvironment, UndefinedPrefixError};
pub use crate::error::{ErrorKind, SerializerError};
pub use crate::iri::{BaseIri, IriResolveError, resolve};
pub use crate::literal::{Literal, print_quoted_str};
pub use crate::named_node::{NamedNode, NamedNodeRef};
pub use crate::scope::BlankNodeScope;
pub use crate::triple::{GraphName, NamedOrBlankNode, Predicate, Quad, Subject, Term, Triple};
pub use oxilangtag::LanguageTagParseError;
pub use oxiri::IriParseError;
