pub mod rdft {
    use tessera::model::NamedNodeRef;

    pub const APPROVAL: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdftest#approval");
    pub const REJECTED: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/ns/rdftest#Rejected");
}

pub mod rdfs {
    use tessera::model::NamedNodeRef;

    pub const COMMENT: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#comment");
}

pub mod mf {
    use tessera::model::NamedNodeRef;

    pub const INCLUDE: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#include",
    );
    pub const ENTRIES: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#entries",
    );
    pub const MANIFEST: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#Manifest",
    );
    pub const NAME: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#name");
    pub const ACTION: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#action",
    );
    pub const RESULT: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#result",
    );
    pub const ASSUMED_TEST_BASE: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "http://www.w3.org/2001/sw/DataAccess/tests/test-manifest#assumedTestBase",
    );
}

pub mod jld {
    use tessera::model::NamedNodeRef;

    pub const TO_RDF_TEST: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3c.github.io/json-ld-api/tests/vocab#ToRDFTest");
    pub const POSITIVE_EVALUATION_TEST: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "https://w3c.github.io/json-ld-api/tests/vocab#PositiveEvaluationTest",
    );
    pub const NEGATIVE_EVALUATION_TEST: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "https://w3c.github.io/json-ld-api/tests/vocab#NegativeEvaluationTest",
    );
    pub const POSITIVE_SYNTAX_TEST: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "https://w3c.github.io/json-ld-api/tests/vocab#PositiveSyntaxTest",
    );
    pub const OPTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3c.github.io/json-ld-api/tests/vocab#option");
    pub const BASE: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3c.github.io/json-ld-api/tests/vocab#base");
    pub const SPEC_VERSION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3c.github.io/json-ld-api/tests/vocab#specVersion");
    pub const PROCESSING_MODE: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "https://w3c.github.io/json-ld-api/tests/vocab#processingMode",
    );
    pub const PRODUCE_GENERALIZED_RDF: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "https://w3c.github.io/json-ld-api/tests/vocab#produceGeneralizedRdf",
    );
    pub const RDF_DIRECTION: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3c.github.io/json-ld-api/tests/vocab#rdfDirection");
    pub const BASE_IRI: NamedNodeRef<'_> =
        NamedNodeRef::new_unchecked("https://w3c.github.io/json-ld-api/tests/vocab#baseIri");
    pub const EXPAND_CONTEXT: NamedNodeRef<'_> = NamedNodeRef::new_unchecked(
        "https://w3c.github.io/json-ld-api/tests/vocab#expandContext",
    );
}
