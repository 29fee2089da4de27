//! Round trips between the RDF/XML serializer and parser.

use std::io::{self, Read};
use tessera_model::vocab::{rdf, xsd};
use tessera_model::{BlankNode, Dataset, ErrorKind, Literal, NamedNode, Quad, Triple};
use tessera_xml::{RdfXmlParseError, RdfXmlParser, RdfXmlSerializer};

fn e(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://e/{name}"))
}

fn round_trip(serializer: RdfXmlSerializer, triples: &[Triple]) -> Dataset {
    let mut writer = serializer.for_writer(Vec::new());
    for triple in triples {
        writer.serialize_triple(triple).unwrap();
    }
    let output = writer.finish().unwrap();
    RdfXmlParser::new()
        .for_slice(&output)
        .map(|t| t.map(Quad::from))
        .collect::<Result<Dataset, _>>()
        .unwrap()
}

#[test]
fn graph_round_trip() {
    let bob = BlankNode::default();
    let triples = [
        Triple::new(e("alice"), rdf::TYPE, e("Person")),
        Triple::new(e("alice"), e("knows"), bob.clone()),
        Triple::new(e("alice"), e("name"), Literal::new_simple_literal("Alice\r\n& co")),
        Triple::new(bob.clone(), rdf::TYPE, e("Person")),
        Triple::new(bob.clone(), rdf::TYPE, e("Agent")),
        Triple::new(bob.clone(), e("age"), Literal::new_typed_literal("42", xsd::INTEGER)),
        Triple::new(
            bob,
            NamedNode::new_unchecked("http://other.example/vocab#label"),
            Literal::new_language_tagged_literal_unchecked("Bob", "en-gb"),
        ),
        Triple::new(e("doc"), e("body"), Literal::new_typed_literal("<p>Hi <em>there</em></p>", rdf::XML_LITERAL)),
        Triple::new(e("doc"), e("empty"), Literal::new_simple_literal("")),
        Triple::new(e("alice"), e("seq"), e("s")),
    ];
    let expected = triples.iter().cloned().map(Quad::from).collect::<Dataset>();
    for serializer in [
        RdfXmlSerializer::new(),
        RdfXmlSerializer::new()
            .with_prefix("ex", "http://e/")
            .unwrap()
            .with_base_iri("http://e/")
            .unwrap(),
    ] {
        let actual = round_trip(serializer, &triples);
        assert!(expected.is_isomorphic(&actual), "{actual}");
    }
}

#[test]
fn rdf_namespace_properties_round_trip() {
    let triples = [
        Triple::new(e("s"), NamedNode::new_unchecked(format!("{}_1", rdf::NAMESPACE)), e("a")),
        Triple::new(e("s"), rdf::FIRST, Literal::new_simple_literal("v")),
    ];
    let expected = triples.iter().cloned().map(Quad::from).collect::<Dataset>();
    assert!(expected.is_isomorphic(&round_trip(RdfXmlSerializer::new(), &triples)));
}

struct FailingRead;

impl Read for FailingRead {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionAborted, "aborted"))
    }
}

#[test]
fn read_failures() {
    let error = RdfXmlParser::new()
        .for_reader(FailingRead)
        .find_map(Result::err)
        .unwrap();
    assert!(matches!(error, RdfXmlParseError::Io(_)));
    assert_eq!(error.kind(), ErrorKind::ReadFailure);
}

#[test]
fn base_iri_option() {
    let triples = RdfXmlParser::new()
        .with_base_iri("http://e/dir/doc")
        .unwrap()
        .for_slice(br##"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://e/"><rdf:Description rdf:about="../s"><ex:p rdf:resource="#frag"/></rdf:Description></rdf:RDF>"##)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        triples,
        [Triple::new(
            e("s"),
            e("p"),
            NamedNode::new_unchecked("http://e/dir/doc#frag")
        )]
    );
    assert_eq!(
        RdfXmlParser::new()
            .with_base_iri("not absolute")
            .err()
            .map(|e| e.kind()),
        Some(ErrorKind::InvalidBase)
    );
}

#[test]
fn lenient_mode_accepts_broken_terms() {
    let file = br#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns:ex="http://e/"><rdf:Description rdf:about="http://e/a b" xml:lang="a_b" ex:p="x"/></rdf:RDF>"#;
    assert!(
        RdfXmlParser::new()
            .for_slice(file)
            .next()
            .unwrap()
            .is_err()
    );
    let triples = RdfXmlParser::new()
        .lenient()
        .for_slice(file)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(triples.len(), 1);
}
