//! End to end scenarios going through the format-agnostic API.

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use tessera::model::vocab::{rdf, xsd};
use tessera::model::{
    BlankNode, Dataset, ErrorKind, GraphName, Literal, NamedNode, Quad, Subject, Triple,
};
use tessera::{
    CodecOptions, JsonLdRemoteDocument, RdfFormat, dump_dataset, load_dataset, read_jsonld,
    read_rdfxml, read_trig, read_turtle, write_ntriples,
};

fn e(name: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("http://e/{name}"))
}

#[test]
fn turtle_to_ntriples_normalization() -> Result<(), Box<dyn Error>> {
    let options = CodecOptions::new();
    let mut writer = write_ntriples(Vec::new(), &options)?;
    for quad in read_turtle(
        r#"@prefix ex: <http://e/> . ex:a ex:p "x"@en, "y" ."#.as_bytes(),
        &options,
    )? {
        writer.serialize_quad(&quad?)?;
    }
    assert_eq!(
        String::from_utf8(writer.finish()?)?,
        "<http://e/a> <http://e/p> \"x\"@en .\n<http://e/a> <http://e/p> \"y\" .\n"
    );
    Ok(())
}

#[test]
fn collection_expansion() -> Result<(), Box<dyn Error>> {
    let options = CodecOptions::new().with_base_iri("http://e/")?;
    let actual = read_turtle("<a> <p> ( 1 2 ) .".as_bytes(), &options)?
        .collect::<Result<Dataset, _>>()?;
    let (b1, b2) = (BlankNode::default(), BlankNode::default());
    let expected = [
        Triple::new(e("a"), e("p"), b1.clone()),
        Triple::new(b1.clone(), rdf::FIRST, Literal::new_typed_literal("1", xsd::INTEGER)),
        Triple::new(b1, rdf::REST, b2.clone()),
        Triple::new(b2.clone(), rdf::FIRST, Literal::new_typed_literal("2", xsd::INTEGER)),
        Triple::new(b2, rdf::REST, rdf::NIL),
    ]
    .into_iter()
    .map(Quad::from)
    .collect::<Dataset>();
    assert!(actual.is_isomorphic(&expected), "{actual}");
    Ok(())
}

#[test]
fn trig_named_graph() -> Result<(), Box<dyn Error>> {
    let options = CodecOptions::new().with_base_iri("http://e/")?;
    let dataset = read_trig("<g> { <s> <p> <o> }".as_bytes(), &options)?
        .collect::<Result<Dataset, _>>()?;
    assert_eq!(dataset.len(), 1);
    assert!(dataset.contains(&Quad::new(e("s"), e("p"), e("o"), e("g"))));
    assert_eq!(dataset.triples_in(&GraphName::DefaultGraph).count(), 0);
    Ok(())
}

#[test]
fn embedded_triple_round_trip() -> Result<(), Box<dyn Error>> {
    let options = CodecOptions::new().with_base_iri("http://e/")?;
    let quads = read_turtle("<< <s> <p> <o> >> <q> <r> .".as_bytes(), &options)?
        .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(quads.len(), 1);
    assert_eq!(
        quads[0].subject,
        Subject::from(Triple::new(e("s"), e("p"), e("o")))
    );
    assert_eq!(quads[0].predicate, e("q").as_ref());

    let mut writer = write_ntriples(Vec::new(), &CodecOptions::new())?;
    writer.serialize_quad(&quads[0])?;
    let output = String::from_utf8(writer.finish()?)?;
    assert_eq!(
        output,
        "<< <http://e/s> <http://e/p> <http://e/o> >> <http://e/q> <http://e/r> .\n"
    );
    let reparsed = load_dataset(RdfFormat::NTriples, output.as_bytes(), &CodecOptions::new())?;
    assert!(reparsed.contains(&quads[0]));
    Ok(())
}

#[test]
fn jsonld_to_quads() -> Result<(), Box<dyn Error>> {
    let quads = read_jsonld(
        r#"{"@context":{"ex":"http://e/"},"@id":"ex:a","ex:p":"x"}"#.as_bytes(),
        &CodecOptions::new(),
    )?
    .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(
        quads,
        [Quad::new(
            e("a"),
            e("p"),
            Literal::new_simple_literal("x"),
            GraphName::DefaultGraph
        )]
    );
    Ok(())
}

#[test]
fn jsonld_remote_context_through_options() -> Result<(), Box<dyn Error>> {
    let options = CodecOptions::new().with_remote_context_loader(
        |url: &str| -> Result<JsonLdRemoteDocument, Box<dyn Error + Send + Sync>> {
            Ok(JsonLdRemoteDocument {
                document: br#"{"@context": {"p": "http://e/p"}}"#.to_vec(),
                document_url: url.into(),
            })
        },
    );
    let dataset = load_dataset(
        RdfFormat::JsonLd,
        r#"{"@context": "http://e/context", "@id": "http://e/s", "p": "v"}"#.as_bytes(),
        &options,
    )?;
    assert!(dataset.contains(&Quad::new(
        e("s"),
        e("p"),
        Literal::new_simple_literal("v"),
        GraphName::DefaultGraph
    )));

    let error = load_dataset(
        RdfFormat::JsonLd,
        r#"{"@context": "http://e/context", "@id": "http://e/s"}"#.as_bytes(),
        &CodecOptions::new(),
    )
    .err();
    assert_eq!(
        error.map(|e| e.kind()),
        Some(ErrorKind::ContextLoaderUnavailable)
    );
    Ok(())
}

#[test]
fn rdfxml_base_inheritance() -> Result<(), Box<dyn Error>> {
    let quads = read_rdfxml(
        r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xml:base="http://e/"><rdf:Description rdf:about="a"><p:q xmlns:p="http://e/" rdf:resource="b"/></rdf:Description></rdf:RDF>"#.as_bytes(),
        &CodecOptions::new(),
    )?
    .collect::<Result<Vec<_>, _>>()?;
    assert_eq!(quads, [Quad::from(Triple::new(e("a"), e("q"), e("b")))]);
    Ok(())
}

#[test]
fn syntax_errors_expose_their_position() {
    let error = load_dataset(
        RdfFormat::Turtle,
        "@prefix ex: <http://e/> .\nex:a ex:p .".as_bytes(),
        &CodecOptions::new(),
    )
    .err();
    let Some(tessera::RdfParseError::Syntax(error)) = error else {
        panic!("a syntax error is expected");
    };
    let location = error.location().map(|l| l.start.line);
    assert_eq!(location, Some(1));
}

#[test]
fn quad_to_ntriples_is_unrepresentable() -> Result<(), Box<dyn Error>> {
    let mut writer = write_ntriples(Vec::new(), &CodecOptions::new())?;
    let error = writer
        .serialize_quad(&Quad::new(e("s"), e("p"), e("o"), e("g")))
        .err();
    assert_eq!(
        error.as_ref().map(|e| e.kind()),
        Some(ErrorKind::UnrepresentableInTargetFormat)
    );
    // The failure is sticky
    let finished = writer.finish().err();
    assert_eq!(
        finished.map(|e| e.kind()),
        Some(ErrorKind::UnrepresentableInTargetFormat)
    );
    Ok(())
}

#[test]
fn format_detection_from_file_names() {
    for (name, format) in [
        ("data.ttl", RdfFormat::Turtle),
        ("data.nt", RdfFormat::NTriples),
        ("data.trig", RdfFormat::TriG),
        ("data.nq", RdfFormat::NQuads),
        ("data.rdf", RdfFormat::RdfXml),
        ("data.xml", RdfFormat::RdfXml),
        ("data.jsonld", RdfFormat::JsonLd),
        ("data.json", RdfFormat::JsonLd),
    ] {
        assert_eq!(RdfFormat::from_path(name), Some(format), "{name}");
    }
}

fn sample_dataset(with_named_graphs: bool) -> Dataset {
    let bob = BlankNode::default();
    let mut dataset = [
        Quad::new(e("alice"), rdf::TYPE, e("Person"), GraphName::DefaultGraph),
        Quad::new(e("alice"), e("knows"), bob.clone(), GraphName::DefaultGraph),
        Quad::new(
            bob.clone(),
            e("name"),
            Literal::new_language_tagged_literal_unchecked("Bob", "en"),
            GraphName::DefaultGraph,
        ),
        Quad::new(
            bob,
            e("age"),
            Literal::new_typed_literal("42", xsd::INTEGER),
            GraphName::DefaultGraph,
        ),
        Quad::new(
            e("alice"),
            e("comment"),
            Literal::new_simple_literal("tab\tquote\" été"),
            GraphName::DefaultGraph,
        ),
    ]
    .into_iter()
    .collect::<Dataset>();
    if with_named_graphs {
        dataset.add(Quad::new(e("alice"), e("name"), Literal::new_simple_literal("Alice"), e("g")));
        dataset.add(Quad::new(
            e("alice"),
            e("name"),
            Literal::new_simple_literal("A."),
            BlankNode::default(),
        ));
    }
    dataset
}

#[test]
fn dump_and_load_through_files() -> Result<(), Box<dyn Error>> {
    let directory = tempfile::tempdir()?;
    let options = CodecOptions::new()
        .with_prefix("ex", "http://e/")?
        .with_base_iri("http://e/")?;
    for format in RdfFormat::ALL {
        let dataset = sample_dataset(format.supports_datasets());
        let path = directory
            .path()
            .join(format!("dump.{}", format.file_extension()));
        let mut file = dump_dataset(
            format,
            &dataset,
            BufWriter::new(File::create(&path)?),
            &options,
        )?;
        file.flush()?;
        drop(file);

        let detected = RdfFormat::from_path(&path).ok_or("unknown extension")?;
        assert_eq!(detected, format);
        let loaded = load_dataset(detected, BufReader::new(File::open(&path)?), &options)?;
        assert!(
            dataset.is_isomorphic(&loaded),
            "{format}:\n{}",
            std::fs::read_to_string(&path)?
        );
    }
    Ok(())
}
