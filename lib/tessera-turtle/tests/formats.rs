//! End-to-end behavior of the Turtle family parsers and serializers.

use tessera_model::vocab::{rdf, xsd};
use tessera_model::{Dataset, ErrorKind, GraphName, Literal, NamedNode, Quad, Term, Triple};
use tessera_turtle::{
    NQuadsParser, NQuadsSerializer, NTriplesParser, NTriplesSerializer, TriGParser,
    TriGSerializer, TurtleParser, TurtleSerializer,
};

fn e(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://e/{name}"))
}

fn to_ntriples(triples: &[Triple]) -> String {
    let mut serializer = NTriplesSerializer::new().for_writer(Vec::new());
    for triple in triples {
        serializer.serialize_triple(triple).unwrap();
    }
    String::from_utf8(serializer.finish().unwrap()).unwrap()
}

#[test]
fn turtle_to_ntriples_normalization() {
    let triples = TurtleParser::new()
        .for_slice(br#"@prefix ex: <http://e/> . ex:a ex:p "x"@en, "y" ."#)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        to_ntriples(&triples),
        "<http://e/a> <http://e/p> \"x\"@en .\n<http://e/a> <http://e/p> \"y\" .\n"
    );
}

#[test]
fn collection_expansion_order() {
    let triples = TurtleParser::new()
        .with_base_iri("http://e/")
        .unwrap()
        .for_slice(b"<a> <p> ( 1 2 ) .")
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let b1 = triples[0].object.clone().into_subject().unwrap();
    let b2 = triples[2].object.clone().into_subject().unwrap();
    let one = Literal::new_typed_literal("1", xsd::INTEGER);
    let two = Literal::new_typed_literal("2", xsd::INTEGER);
    assert_eq!(
        triples,
        [
            Triple::new(e("a"), e("p"), Term::from(b1.clone())),
            Triple::new(b1.clone(), rdf::FIRST, one),
            Triple::new(b1, rdf::REST, Term::from(b2.clone())),
            Triple::new(b2.clone(), rdf::FIRST, two),
            Triple::new(b2, rdf::REST, rdf::NIL),
        ]
    );
}

#[test]
fn trig_named_graph() {
    let dataset = TriGParser::new()
        .with_base_iri("http://e/")
        .unwrap()
        .for_slice(b"<g> { <s> <p> <o> }")
        .collect::<Result<Dataset, _>>()
        .unwrap();
    assert_eq!(dataset.len(), 1);
    assert!(dataset.contains(&Quad::new(e("s"), e("p"), e("o"), e("g"))));
    assert_eq!(dataset.triples_in(&GraphName::DefaultGraph).count(), 0);
}

#[test]
fn embedded_triple_round_trip() {
    let file = b"<< <http://e/s> <http://e/p> <http://e/o> >> <http://e/q> <http://e/r> .\n";
    let triples = TurtleParser::new()
        .for_slice(file)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        triples,
        [Triple::new(Triple::new(e("s"), e("p"), e("o")), e("q"), e("r"))]
    );
    assert_eq!(to_ntriples(&triples).as_bytes(), file);
    let reparsed = NTriplesParser::new()
        .for_slice(file)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(reparsed, triples);
}

#[test]
fn deeply_embedded_triples() {
    let mut file = String::from("<http://e/s> <http://e/p> <http://e/o>");
    for _ in 0..8 {
        file = format!("<< {file} >> <http://e/p> <http://e/o>");
    }
    file.push_str(" .\n");
    let triples = NTriplesParser::new()
        .for_slice(file.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(to_ntriples(&triples), file);
}

#[test]
fn chunked_reads_match_slice_reads() {
    let file = "@prefix ex: <http://e/> .\nex:a ex:p ( \"a\" [ ex:q 1.5 ] ) ;\n  ex:r \"\"\"long\nstring\"\"\" .\n";
    let expected = TurtleParser::new()
        .for_slice(file.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
        .into_iter()
        .map(Quad::from)
        .collect::<Dataset>();
    for chunk_size in [1, 2, 7] {
        let mut parser = TurtleParser::new().low_level();
        let mut chunks = file.as_bytes().chunks(chunk_size);
        let mut actual = Dataset::new();
        while !parser.is_end() {
            if let Some(chunk) = chunks.next() {
                parser.extend_from_slice(chunk);
            } else {
                parser.end();
            }
            while let Some(triple) = parser.parse_next() {
                actual.add(triple.unwrap().into());
            }
        }
        assert!(expected.is_isomorphic(&actual), "chunk size {chunk_size}");
    }
}

#[test]
fn error_positions() {
    let error = TurtleParser::new()
        .for_slice(b"@prefix ex: <http://e/> .\nex:a ex:b ex:c ;\n  ex:d .\n")
        .find_map(Result::err)
        .unwrap();
    assert_eq!(error.kind(), ErrorKind::Syntax);
    assert_eq!(error.location().start.line, 2);
    assert!(error.to_string().contains("line 3"));
}

#[test]
fn dataset_round_trips() {
    let file = r#"@prefix ex: <http://e/> .
ex:s ex:p ex:o , "chat"@fr , ( ex:a ex:b ) .
_:b ex:p [ ex:q "nested" ] .
ex:g { ex:s ex:p _:b . _:c ex:p << ex:s ex:p _:c >> . }
_:g { ex:s a ex:C }
"#;
    let dataset = TriGParser::new()
        .for_slice(file.as_bytes())
        .collect::<Result<Dataset, _>>()
        .unwrap();

    let mut trig = TriGSerializer::new()
        .with_prefix("ex", "http://e/")
        .unwrap()
        .for_writer(Vec::new());
    let mut nquads = NQuadsSerializer::new().for_writer(Vec::new());
    for quad in dataset.quads() {
        trig.serialize_quad(&quad).unwrap();
        nquads.serialize_quad(&quad).unwrap();
    }
    let trig = trig.finish().unwrap();
    let nquads = nquads.finish().unwrap();

    let from_trig = TriGParser::new()
        .for_slice(&trig)
        .collect::<Result<Dataset, _>>()
        .unwrap();
    let from_nquads = NQuadsParser::new()
        .for_slice(&nquads)
        .collect::<Result<Dataset, _>>()
        .unwrap();
    assert!(dataset.is_isomorphic(&from_trig));
    assert!(dataset.is_isomorphic(&from_nquads));
}

#[test]
fn default_graph_round_trips_through_turtle() {
    let file = br#"@prefix ex: <http://e/> .
ex:a ex:p ( 1 ( 2 3 ) () ) ; ex:q [] , [ ex:r -1.0e2 ] .
"#;
    let triples = TurtleParser::new()
        .for_slice(file)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let mut serializer = TurtleSerializer::new().for_writer(Vec::new());
    for triple in &triples {
        serializer.serialize_triple(triple).unwrap();
    }
    let output = serializer.finish().unwrap();
    let reparsed = TurtleParser::new()
        .for_slice(&output)
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    let expected = triples.into_iter().map(Quad::from).collect::<Dataset>();
    let actual = reparsed.into_iter().map(Quad::from).collect::<Dataset>();
    assert!(expected.is_isomorphic(&actual));
}

#[test]
fn blank_node_identities_are_disjoint_across_documents() {
    let file = b"_:b <http://e/p> <http://e/o> .";
    let first = NTriplesParser::new().for_slice(file).next().unwrap().unwrap();
    let second = NTriplesParser::new().for_slice(file).next().unwrap().unwrap();
    assert_ne!(first.subject, second.subject);
}
