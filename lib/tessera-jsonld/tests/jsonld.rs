//! Parsing scenarios and round trips between the JSON-LD serializer and parser.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tessera_jsonld::{
    JsonLdErrorCode, JsonLdParser, JsonLdRemoteDocument, JsonLdSerializer, JsonLdSyntaxError,
};
use tessera_model::vocab::{rdf, xsd};
use tessera_model::{
    BlankNode, Dataset, ErrorKind, GraphName, Literal, NamedNode, Quad, Subject, Term,
};

fn e(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://e/{name}"))
}

fn parse(parser: JsonLdParser, document: &str) -> Result<Dataset, JsonLdSyntaxError> {
    parser.for_slice(document).collect()
}

#[test]
fn person_scenario() {
    let dataset = parse(
        JsonLdParser::new(),
        r#"{
            "@context": {
                "@vocab": "http://e/",
                "knows": {"@type": "@id"},
                "age": {"@type": "http://www.w3.org/2001/XMLSchema#integer"}
            },
            "@id": "http://e/alice",
            "@type": "Person",
            "name": "Alice",
            "age": "42",
            "knows": "http://e/bob",
            "height": 1.7
        }"#,
    )
    .unwrap();
    let expected = [
        Quad::new(e("alice"), rdf::TYPE, e("Person"), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("name"), Literal::new_simple_literal("Alice"), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("age"), Literal::new_typed_literal("42", xsd::INTEGER), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("knows"), e("bob"), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("height"), Literal::new_typed_literal("1.7E0", xsd::DOUBLE), GraphName::DefaultGraph),
    ]
    .into_iter()
    .collect::<Dataset>();
    assert_eq!(dataset, expected, "{dataset}");
}

#[test]
fn base_iri_resolution() {
    let dataset = parse(
        JsonLdParser::new().with_base_iri("http://e/dir/doc").unwrap(),
        r##"{"@id": "../s", "http://e/p": {"@id": "#frag"}}"##,
    )
    .unwrap();
    assert!(dataset.contains(&Quad::new(
        e("s"),
        e("p"),
        NamedNode::new_unchecked("http://e/dir/doc#frag"),
        GraphName::DefaultGraph
    )));
}

#[test]
fn remote_context_loader_is_called_once_per_url() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let parser = JsonLdParser::new().with_load_document_callback(
        move |url: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
            counter.fetch_add(1, Ordering::Relaxed);
            if url == "http://e/context" {
                Ok(JsonLdRemoteDocument {
                    document: br#"{"@context": {"p": "http://e/p"}}"#.to_vec(),
                    document_url: url.into(),
                })
            } else {
                Err(format!("unknown document {url}").into())
            }
        },
    );
    let dataset = parse(
        parser,
        r#"[
            {"@context": "http://e/context", "@id": "http://e/s1", "p": "a"},
            {"@context": "http://e/context", "@id": "http://e/s2", "p": "b"}
        ]"#,
    )
    .unwrap();
    assert_eq!(dataset.len(), 2);
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn failing_remote_context() {
    let parser = JsonLdParser::new().with_load_document_callback(
        |_: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
            Err("network is down".into())
        },
    );
    let error = parse(parser, r#"{"@context": "http://e/context", "@id": "http://e/s"}"#)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::RemoteContextFailed);
    assert_eq!(
        error.code(),
        Some(JsonLdErrorCode::LoadingRemoteContextFailed)
    );
}

#[test]
fn missing_context_loader() {
    let error = parse(
        JsonLdParser::new(),
        r#"{"@context": ["http://e/context"], "@id": "http://e/s"}"#,
    )
    .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::ContextLoaderUnavailable);
}

#[test]
fn error_pointer() {
    let error = parse(
        JsonLdParser::new(),
        r#"{"@context": {"p": "http://e/p"}, "p": [{"@value": "x", "@language": 1}]}"#,
    )
    .unwrap_err();
    assert_eq!(error.code(), Some(JsonLdErrorCode::InvalidLanguageTaggedString));
    assert_eq!(error.pointer(), "/p/0/@language");
}

#[test]
fn reader_and_slice_agree() {
    let document = r#"{"@id": "http://e/s", "http://e/p": {"@list": [1, true, "x"]}}"#;
    let from_slice = parse(JsonLdParser::new(), document).unwrap();
    let from_reader = JsonLdParser::new()
        .for_reader(document.as_bytes())
        .collect::<Result<Dataset, _>>()
        .unwrap();
    assert!(from_slice.is_isomorphic(&from_reader));
    assert_eq!(from_slice.len(), 7);
}

#[test]
fn dataset_round_trip() {
    let bob = BlankNode::default();
    let graph = BlankNode::default();
    let quads = [
        Quad::new(e("alice"), rdf::TYPE, e("Person"), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("knows"), bob.clone(), GraphName::DefaultGraph),
        Quad::new(bob.clone(), e("name"), Literal::new_language_tagged_literal_unchecked("Bob", "en-gb"), GraphName::DefaultGraph),
        Quad::new(bob.clone(), e("age"), Literal::new_typed_literal("42", xsd::INTEGER), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("name"), Literal::new_simple_literal("Alice \"A\"\n"), e("g")),
        Quad::new(e("alice"), e("knows"), bob.clone(), graph.clone()),
        Quad::new(bob, e("data"), Literal::new_typed_literal("{\"a\":1}", rdf::JSON), graph),
    ];
    let expected = quads.iter().cloned().collect::<Dataset>();
    for serializer in [
        JsonLdSerializer::new(),
        JsonLdSerializer::new()
            .with_prefix("ex", "http://e/")
            .unwrap()
            .with_prefix("", "http://e/")
            .unwrap()
            .with_base_iri("http://e/")
            .unwrap(),
    ] {
        let mut writer = serializer.for_writer(Vec::new());
        for quad in &quads {
            writer.serialize_quad(quad).unwrap();
        }
        let output = writer.finish().unwrap();
        let actual = JsonLdParser::new()
            .for_slice(&output)
            .collect::<Result<Dataset, _>>()
            .unwrap();
        assert!(
            expected.is_isomorphic(&actual),
            "{actual}\n{}",
            String::from_utf8_lossy(&output)
        );
    }
}

#[test]
fn embedded_triples_are_unrepresentable() {
    let mut writer = JsonLdSerializer::new().for_writer(Vec::new());
    let embedded = tessera_model::Triple::new(e("s"), e("p"), e("o"));
    let error = writer
        .serialize_quad(&Quad::new(
            Subject::from(embedded),
            e("p"),
            Term::from(e("o")),
            GraphName::DefaultGraph,
        ))
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UnrepresentableInTargetFormat);
}
