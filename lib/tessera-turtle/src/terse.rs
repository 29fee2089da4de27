//! Shared parser implementation for Turtle and TriG.

use crate::lexer::{TurtleLexer, TurtleLexerMode, TurtleToken, resolve_local_name};
use crate::options::ParserOptions;
use crate::toolkit::{Lexer, Parser, RuleRecognizer, RuleRecognizerError, TokenOrLineJump};
use crate::{MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use std::collections::VecDeque;
use tessera_model::vocab::{rdf, xsd};
use tessera_model::{
    BaseIri, BlankNodeScope, ErrorKind, GraphName, Literal, NamedNode, NamedOrBlankNode,
    Predicate, PrefixEnvironment, Quad, Subject, Term, Triple,
};
use tracing::warn;

pub struct TriGRecognizer {
    stack: Vec<TriGState>,
    cur_subject: Vec<Subject>,
    cur_predicate: Vec<Predicate>,
    cur_object: Vec<Term>,
    cur_graph: GraphName,
}

#[expect(clippy::partial_pub_fields)]
pub struct TriGRecognizerContext {
    pub env: PrefixEnvironment,
    pub blank_nodes: BlankNodeScope,
    with_graph_name: bool,
    lenient: bool,
    rdf_star: bool,
    generalized_rdf: bool,
}

/// A token once prefixed names and IRI references are resolved.
enum Resolved<'a> {
    Iri(NamedNode),
    Other(TurtleToken<'a>),
}

impl TriGRecognizerContext {
    fn resolve<'a>(&self, token: TurtleToken<'a>) -> Result<Resolved<'a>, RuleRecognizerError> {
        Ok(match token {
            TurtleToken::IriRef(iri) => Resolved::Iri(NamedNode::new_unchecked(iri)),
            TurtleToken::PrefixedName {
                prefix,
                local,
                might_be_invalid_iri,
            } => Resolved::Iri(resolve_local_name(
                prefix,
                &local,
                might_be_invalid_iri,
                &self.env,
            )?),
            token => Resolved::Other(token),
        })
    }

    fn quoted_triples_disabled() -> RuleRecognizerError {
        RuleRecognizerError::new(
            ErrorKind::UnsupportedFeature,
            "Quoted triples are not allowed when RDF-star is disabled",
        )
    }
}

impl RuleRecognizer for TriGRecognizer {
    type TokenRecognizer = TurtleLexer;
    type Output = Quad;
    type Context = TriGRecognizerContext;

    fn recognize_next(
        mut self,
        token: TokenOrLineJump<TurtleToken<'_>>,
        context: &mut TriGRecognizerContext,
        results: &mut VecDeque<Quad>,
        errors: &mut Vec<RuleRecognizerError>,
    ) -> Self {
        let TokenOrLineJump::Token(token) = token else {
            return self;
        };
        let Some(rule) = self.stack.pop() else {
            return self.error(errors, "Unexpected TOKEN after the end of the document");
        };
        match rule {
            // [1g] trigDoc      ::=  (directive | block)*
            // [2g] block        ::=  triplesOrGraph | wrappedGraph | triples2 | "GRAPH" labelOrSubject wrappedGraph
            // [3]  directive    ::=  prefixID | base | sparqlPrefix | sparqlBase
            // [4]  prefixID     ::=  '@prefix' PNAME_NS IRIREF '.'
            // [5]  base         ::=  '@base' IRIREF '.'
            // [5s] sparqlPrefix ::=  "PREFIX" PNAME_NS IRIREF
            // [6s] sparqlBase   ::=  "BASE" IRIREF
            TriGState::TriGDoc => {
                self.cur_graph = GraphName::DefaultGraph;
                self.stack.push(TriGState::TriGDoc);
                match token {
                    TurtleToken::PlainKeyword(k) if k.eq_ignore_ascii_case("base") => {
                        self.stack.push(TriGState::BaseExpectIri);
                        self
                    }
                    TurtleToken::PlainKeyword(k) if k.eq_ignore_ascii_case("prefix") => {
                        self.stack.push(TriGState::PrefixExpectPrefix);
                        self
                    }
                    TurtleToken::LangTag(k) if k.eq_ignore_ascii_case("prefix") => {
                        self.stack.push(TriGState::ExpectDot);
                        self.stack.push(TriGState::PrefixExpectPrefix);
                        self
                    }
                    TurtleToken::LangTag(k) if k.eq_ignore_ascii_case("base") => {
                        self.stack.push(TriGState::ExpectDot);
                        self.stack.push(TriGState::BaseExpectIri);
                        self
                    }
                    TurtleToken::PlainKeyword(k)
                        if k.eq_ignore_ascii_case("graph") && context.with_graph_name =>
                    {
                        self.stack.push(TriGState::WrappedGraph);
                        self.stack.push(TriGState::GraphName);
                        self
                    }
                    TurtleToken::Punctuation("{") if context.with_graph_name => {
                        self.stack.push(TriGState::WrappedGraph);
                        self.recognize_token(token, context, results, errors)
                    }
                    _ => {
                        self.stack.push(TriGState::TriplesOrGraph);
                        self.recognize_token(token, context, results, errors)
                    }
                }
            }
            TriGState::ExpectDot => {
                self.cur_subject.pop();
                if token == TurtleToken::Punctuation(".") {
                    self
                } else {
                    self.error(errors, "A dot is expected at the end of statements, found TOKEN")
                }
            }
            TriGState::BaseExpectIri => {
                if let TurtleToken::IriRef(iri) = token {
                    // The lexer already resolved the IRI against the previous base
                    context.env.set_base(BaseIri::parse_unchecked(iri));
                    self
                } else {
                    self.error(errors, "The BASE keyword should be followed by an IRI")
                }
            }
            TriGState::PrefixExpectPrefix => match token {
                TurtleToken::PrefixedName { prefix, local, .. } if local.is_empty() => {
                    self.stack.push(TriGState::PrefixExpectIri {
                        name: prefix.to_owned(),
                    });
                    self
                }
                _ => self.error(
                    errors,
                    "The PREFIX keyword should be followed by a prefix like 'ex:'",
                ),
            },
            TriGState::PrefixExpectIri { name } => {
                if let TurtleToken::IriRef(iri) = token {
                    context.env.bind(name, iri);
                    self
                } else {
                    self.error(
                        errors,
                        "The PREFIX declaration should be followed by a prefix and its value as an IRI",
                    )
                }
            }
            // [3g]  triplesOrGraph  ::=  labelOrSubject ( wrappedGraph | predicateObjectList '.' ) | quotedTriple predicateObjectList '.'
            // [4g]  triples2        ::=  blankNodePropertyList predicateObjectList? '.' | collection predicateObjectList '.'
            TriGState::TriplesOrGraph => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => {
                    self.stack
                        .push(TriGState::WrappedGraphOrPredicateObjectList { term: iri.into() });
                    self
                }
                Ok(Resolved::Other(TurtleToken::BlankNodeLabel(label))) => {
                    self.stack.push(TriGState::WrappedGraphOrPredicateObjectList {
                        term: context.blank_nodes.intern(label).into(),
                    });
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("["))) => {
                    self.stack
                        .push(TriGState::WrappedGraphBlankNodePropertyListCurrent);
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("("))) => {
                    self.stack.push(TriGState::ExpectDot);
                    self.stack.push(TriGState::PredicateObjectList);
                    self.stack.push(TriGState::SubjectCollectionBeginning);
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("<<"))) => {
                    self.stack.push(TriGState::ExpectDot);
                    self.stack.push(TriGState::PredicateObjectList);
                    self.start_quoted_triple(context, errors, TriGState::SubjectQuotedTripleEnd)
                }
                Ok(Resolved::Other(_)) => {
                    self.error(errors, "TOKEN is not a valid subject or graph name")
                }
            },
            TriGState::WrappedGraphOrPredicateObjectList { term } => {
                if token == TurtleToken::Punctuation("{") && context.with_graph_name {
                    self.cur_graph = term.into();
                    self.stack.push(TriGState::WrappedGraph);
                } else {
                    self.cur_subject.push(term.into());
                    self.stack.push(TriGState::ExpectDot);
                    self.stack.push(TriGState::PredicateObjectList);
                }
                self.recognize_token(token, context, results, errors)
            }
            TriGState::WrappedGraphBlankNodePropertyListCurrent => {
                if token == TurtleToken::Punctuation("]") {
                    self.stack.push(TriGState::WrappedGraphOrPredicateObjectList {
                        term: context.blank_nodes.fresh().into(),
                    });
                    self
                } else {
                    self.cur_subject
                        .push(context.blank_nodes.fresh().into());
                    self.stack.push(TriGState::ExpectDot);
                    self.stack.push(TriGState::SubjectBlankNodePropertyListEnd);
                    self.stack.push(TriGState::PredicateObjectList);
                    self.recognize_token(token, context, results, errors)
                }
            }
            TriGState::SubjectBlankNodePropertyListEnd => {
                if token == TurtleToken::Punctuation("]") {
                    self.stack
                        .push(TriGState::SubjectBlankNodePropertyListAfter);
                    self
                } else {
                    self.error(errors, "blank node property lists should end with a ']', found TOKEN")
                }
            }
            TriGState::SubjectBlankNodePropertyListAfter => {
                if !matches!(token, TurtleToken::Punctuation("." | "}")) {
                    self.stack.push(TriGState::PredicateObjectList);
                }
                self.recognize_token(token, context, results, errors)
            }
            TriGState::SubjectCollectionBeginning => {
                if token == TurtleToken::Punctuation(")") {
                    self.cur_subject.push(rdf::NIL.into());
                    self
                } else {
                    let root = context.blank_nodes.fresh();
                    self.cur_subject.push(root.clone().into());
                    self.cur_subject.push(root.into());
                    self.cur_predicate.push(rdf::FIRST.into());
                    self.stack.push(TriGState::SubjectCollectionPossibleEnd);
                    self.stack.push(TriGState::Object);
                    self.recognize_token(token, context, results, errors)
                }
            }
            TriGState::SubjectCollectionPossibleEnd | TriGState::ObjectCollectionPossibleEnd => {
                let is_subject = matches!(rule, TriGState::SubjectCollectionPossibleEnd);
                let Some(old) = self.cur_subject.pop() else {
                    return self.error(errors, "Unexpected state in a collection");
                };
                self.cur_object.pop();
                if token == TurtleToken::Punctuation(")") {
                    self.cur_predicate.pop();
                    results.push_back(Quad::new(old, rdf::REST, rdf::NIL, self.cur_graph.clone()));
                    self
                } else {
                    let new = context.blank_nodes.fresh();
                    results.push_back(Quad::new(
                        old,
                        rdf::REST,
                        new.clone(),
                        self.cur_graph.clone(),
                    ));
                    self.cur_subject.push(new.into());
                    self.stack.push(if is_subject {
                        TriGState::SubjectCollectionPossibleEnd
                    } else {
                        TriGState::ObjectCollectionPossibleEnd
                    });
                    self.stack.push(TriGState::Object);
                    self.recognize_token(token, context, results, errors)
                }
            }
            // [5g]  wrappedGraph  ::=  '{' triplesBlock? '}'
            // [6g]  triplesBlock  ::=  triples ('.' triplesBlock?)?
            TriGState::WrappedGraph => {
                if token == TurtleToken::Punctuation("{") {
                    self.stack.push(TriGState::WrappedGraphPossibleEnd);
                    self.stack.push(TriGState::Triples);
                    self
                } else {
                    self.error(
                        errors,
                        "The GRAPH keyword should be followed by a graph name and a value in '{'",
                    )
                }
            }
            TriGState::WrappedGraphPossibleEnd => {
                self.cur_subject.pop();
                match token {
                    TurtleToken::Punctuation("}") => self,
                    TurtleToken::Punctuation(".") => {
                        self.stack.push(TriGState::WrappedGraphPossibleEnd);
                        self.stack.push(TriGState::Triples);
                        self
                    }
                    _ => self.error(
                        errors,
                        "A '}' or a '.' is expected at the end of a graph block, found TOKEN",
                    ),
                }
            }
            // [6]   triples  ::=  subject predicateObjectList | blankNodePropertyList predicateObjectList?
            // [10]  subject  ::=  iri | BlankNode | collection | quotedTriple
            TriGState::Triples => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => {
                    self.cur_subject.push(iri.into());
                    self.stack.push(TriGState::PredicateObjectList);
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("}"))) => {
                    // Empty block or a trailing '.'
                    self.recognize_token(TurtleToken::Punctuation("}"), context, results, errors)
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("["))) => {
                    self.cur_subject
                        .push(context.blank_nodes.fresh().into());
                    self.stack
                        .push(TriGState::TriplesBlankNodePropertyListCurrent);
                    self
                }
                Ok(Resolved::Other(TurtleToken::BlankNodeLabel(label))) => {
                    self.cur_subject
                        .push(context.blank_nodes.intern(label).into());
                    self.stack.push(TriGState::PredicateObjectList);
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("("))) => {
                    self.stack.push(TriGState::PredicateObjectList);
                    self.stack.push(TriGState::SubjectCollectionBeginning);
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("<<"))) => {
                    self.stack.push(TriGState::PredicateObjectList);
                    self.start_quoted_triple(context, errors, TriGState::SubjectQuotedTripleEnd)
                }
                Ok(Resolved::Other(_)) => self.error(errors, "TOKEN is not a valid RDF subject"),
            },
            TriGState::TriplesBlankNodePropertyListCurrent => {
                if token == TurtleToken::Punctuation("]") {
                    self.stack.push(TriGState::PredicateObjectList);
                    self
                } else {
                    self.stack.push(TriGState::SubjectBlankNodePropertyListEnd);
                    self.stack.push(TriGState::PredicateObjectList);
                    self.recognize_token(token, context, results, errors)
                }
            }
            // [7g]  labelOrSubject  ::=  iri | BlankNode
            TriGState::GraphName => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => {
                    self.cur_graph = iri.into();
                    self
                }
                Ok(Resolved::Other(TurtleToken::BlankNodeLabel(label))) => {
                    self.cur_graph = context.blank_nodes.intern(label).into();
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("["))) => {
                    self.stack.push(TriGState::GraphNameAnonEnd);
                    self
                }
                Ok(Resolved::Other(_)) => self.error(errors, "TOKEN is not a valid graph name"),
            },
            TriGState::GraphNameAnonEnd => {
                if token == TurtleToken::Punctuation("]") {
                    self.cur_graph = context.blank_nodes.fresh().into();
                    self
                } else {
                    self.error(
                        errors,
                        "Anonymous blank node with a property list are not allowed as graph name",
                    )
                }
            }
            // [7]  predicateObjectList  ::=  verb objectList (';' (verb objectList)?)*
            TriGState::PredicateObjectList => {
                self.stack.push(TriGState::PredicateObjectListEnd);
                self.stack.push(TriGState::ObjectsList);
                self.stack.push(TriGState::Verb);
                self.recognize_token(token, context, results, errors)
            }
            TriGState::PredicateObjectListEnd => {
                self.cur_predicate.pop();
                if token == TurtleToken::Punctuation(";") {
                    self.stack
                        .push(TriGState::PredicateObjectListPossibleContinuation);
                    self
                } else {
                    self.recognize_token(token, context, results, errors)
                }
            }
            TriGState::PredicateObjectListPossibleContinuation => {
                if token == TurtleToken::Punctuation(";") {
                    self.stack
                        .push(TriGState::PredicateObjectListPossibleContinuation);
                    self
                } else if matches!(token, TurtleToken::Punctuation("." | "}" | "]" | "|}")) {
                    self.recognize_token(token, context, results, errors)
                } else {
                    self.stack.push(TriGState::PredicateObjectListEnd);
                    self.stack.push(TriGState::ObjectsList);
                    self.stack.push(TriGState::Verb);
                    self.recognize_token(token, context, results, errors)
                }
            }
            // [8]   objectList  ::=  object annotation? ( ',' object annotation? )*
            // [30t] annotation  ::=  '{|' predicateObjectList '|}'
            TriGState::ObjectsList => {
                self.stack.push(TriGState::ObjectsListEnd);
                self.stack.push(TriGState::Object);
                self.recognize_token(token, context, results, errors)
            }
            TriGState::ObjectsListEnd => match token {
                TurtleToken::Punctuation(",") => {
                    self.cur_object.pop();
                    self.stack.push(TriGState::ObjectsListEnd);
                    self.stack.push(TriGState::Object);
                    self
                }
                TurtleToken::Punctuation("{|") => {
                    if !context.rdf_star {
                        return self.error(errors, TriGRecognizerContext::quoted_triples_disabled());
                    }
                    let (Some(subject), Some(predicate), Some(object)) = (
                        self.cur_subject.last(),
                        self.cur_predicate.last(),
                        self.cur_object.pop(),
                    ) else {
                        return self.error(errors, "An annotation must follow a triple");
                    };
                    let triple = Triple::new(subject.clone(), predicate.clone(), object);
                    self.cur_subject.push(triple.into());
                    self.stack.push(TriGState::AnnotationEnd);
                    self.stack.push(TriGState::PredicateObjectList);
                    self
                }
                _ => {
                    self.cur_object.pop();
                    self.recognize_token(token, context, results, errors)
                }
            },
            TriGState::AnnotationEnd => {
                self.cur_subject.pop();
                self.stack.push(TriGState::ObjectsListAfterAnnotation);
                if token == TurtleToken::Punctuation("|}") {
                    self
                } else {
                    self.error(errors, "Annotations should end with '|}', found TOKEN")
                }
            }
            TriGState::ObjectsListAfterAnnotation => {
                if token == TurtleToken::Punctuation(",") {
                    self.stack.push(TriGState::ObjectsListEnd);
                    self.stack.push(TriGState::Object);
                    self
                } else {
                    self.recognize_token(token, context, results, errors)
                }
            }
            // [9]   verb       ::=  predicate | 'a'
            // [11]  predicate  ::=  iri
            TriGState::Verb => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => {
                    self.cur_predicate.push(iri.into());
                    self
                }
                Ok(Resolved::Other(TurtleToken::PlainKeyword("a"))) => {
                    self.cur_predicate.push(rdf::TYPE.into());
                    self
                }
                Ok(Resolved::Other(TurtleToken::BlankNodeLabel(label)))
                    if context.generalized_rdf =>
                {
                    self.cur_predicate
                        .push(context.blank_nodes.intern(label).into());
                    self
                }
                Ok(Resolved::Other(_)) => self.error(errors, "TOKEN is not a valid predicate"),
            },
            // [12]    object                 ::=  iri | BlankNode | collection | blankNodePropertyList | literal | quotedTriple
            // [13]    literal                ::=  RDFLiteral | NumericLiteral | BooleanLiteral
            // [15]    blankNodePropertyList  ::=  '[' predicateObjectList ']'
            // [16]    collection             ::=  '(' object* ')'
            // [128s]  RDFLiteral             ::=  String (LANGTAG | '^^' iri)?
            // [137s]  BlankNode              ::=  BLANK_NODE_LABEL | ANON
            TriGState::Object => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => self.push_object_and_emit(iri, results),
                Ok(Resolved::Other(token)) => match token {
                    TurtleToken::BlankNodeLabel(label) => {
                        let node = context.blank_nodes.intern(label);
                        self.push_object_and_emit(node, results)
                    }
                    TurtleToken::Punctuation("[") => {
                        self.stack
                            .push(TriGState::ObjectBlankNodePropertyListCurrent);
                        self
                    }
                    TurtleToken::Punctuation("(") => {
                        self.stack.push(TriGState::ObjectCollectionBeginning);
                        self
                    }
                    TurtleToken::String(value) => {
                        self.stack
                            .push(TriGState::LiteralPossibleSuffix { value, emit: true });
                        self
                    }
                    TurtleToken::Punctuation("<<") => self.start_quoted_triple(
                        context,
                        errors,
                        TriGState::ObjectQuotedTripleEnd { emit: true },
                    ),
                    token => match native_literal(&token) {
                        Some(literal) => self.push_object_and_emit(literal, results),
                        None => self.error(errors, "TOKEN is not a valid RDF object"),
                    },
                },
            },
            TriGState::ObjectBlankNodePropertyListCurrent => {
                let node = context.blank_nodes.fresh();
                if token == TurtleToken::Punctuation("]") {
                    self.push_object_and_emit(node, results)
                } else {
                    // The triple pointing to the node comes before the triples inside of it
                    self = self.push_object_and_emit(node.clone(), results);
                    self.cur_subject.push(node.into());
                    self.stack.push(TriGState::ObjectBlankNodePropertyListEnd);
                    self.stack.push(TriGState::PredicateObjectList);
                    self.recognize_token(token, context, results, errors)
                }
            }
            TriGState::ObjectBlankNodePropertyListEnd => {
                if token == TurtleToken::Punctuation("]") {
                    self.cur_subject.pop();
                    self
                } else {
                    self.error(errors, "blank node property lists should end with a ']', found TOKEN")
                }
            }
            TriGState::ObjectCollectionBeginning => {
                if token == TurtleToken::Punctuation(")") {
                    self.push_object_and_emit(rdf::NIL, results)
                } else {
                    let root = context.blank_nodes.fresh();
                    self = self.push_object_and_emit(root.clone(), results);
                    self.cur_subject.push(root.into());
                    self.cur_predicate.push(rdf::FIRST.into());
                    self.stack.push(TriGState::ObjectCollectionPossibleEnd);
                    self.stack.push(TriGState::Object);
                    self.recognize_token(token, context, results, errors)
                }
            }
            TriGState::LiteralPossibleSuffix { value, emit } => match token {
                TurtleToken::LangTag(lang) => {
                    self.cur_object.push(
                        Literal::new_language_tagged_literal_unchecked(
                            value,
                            lang.to_ascii_lowercase(),
                        )
                        .into(),
                    );
                    if emit {
                        self.emit_quad(results);
                    }
                    self
                }
                TurtleToken::Punctuation("^^") => {
                    self.stack
                        .push(TriGState::LiteralExpectDatatype { value, emit });
                    self
                }
                _ => {
                    self.cur_object
                        .push(Literal::new_simple_literal(value).into());
                    if emit {
                        self.emit_quad(results);
                    }
                    self.recognize_token(token, context, results, errors)
                }
            },
            TriGState::LiteralExpectDatatype { value, emit } => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(datatype)) => {
                    if datatype == rdf::LANG_STRING {
                        if !context.lenient {
                            return self.error(
                                errors,
                                "The datatype of a literal without a language tag must not be rdf:langString",
                            );
                        }
                        warn!("Accepting a literal typed rdf:langString without language tag");
                    }
                    self.cur_object
                        .push(Literal::new_typed_literal(value, datatype).into());
                    if emit {
                        self.emit_quad(results);
                    }
                    self
                }
                Ok(Resolved::Other(_)) => {
                    self.error(errors, "Expecting a datatype IRI after ^^, found TOKEN")
                }
            },
            // [27t]  quotedTriple  ::=  '<<' qtSubject verb qtObject '>>'
            TriGState::SubjectQuotedTripleEnd | TriGState::ObjectQuotedTripleEnd { .. } => {
                if token != TurtleToken::Punctuation(">>") {
                    return self.error(errors, "Expecting '>>' to close a quoted triple, found TOKEN");
                }
                let (Some(subject), Some(predicate), Some(object)) = (
                    self.cur_subject.pop(),
                    self.cur_predicate.pop(),
                    self.cur_object.pop(),
                ) else {
                    return self.error(errors, "Incomplete quoted triple");
                };
                let triple = Triple::new(subject, predicate, object);
                match rule {
                    TriGState::ObjectQuotedTripleEnd { emit } => {
                        self.cur_object.push(triple.into());
                        if emit {
                            self.emit_quad(results);
                        }
                    }
                    _ => self.cur_subject.push(triple.into()),
                }
                self
            }
            // [28t]  qtSubject  ::=  iri | BlankNode | quotedTriple
            TriGState::QuotedSubject => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => {
                    self.cur_subject.push(iri.into());
                    self
                }
                Ok(Resolved::Other(TurtleToken::BlankNodeLabel(label))) => {
                    self.cur_subject
                        .push(context.blank_nodes.intern(label).into());
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("["))) => {
                    self.cur_subject
                        .push(context.blank_nodes.fresh().into());
                    self.stack.push(TriGState::QuotedAnonEnd);
                    self
                }
                Ok(Resolved::Other(TurtleToken::Punctuation("<<"))) => {
                    self.start_quoted_triple(context, errors, TriGState::SubjectQuotedTripleEnd)
                }
                Ok(Resolved::Other(_)) => {
                    self.error(errors, "TOKEN is not a valid RDF quoted triple subject")
                }
            },
            // [29t]  qtObject  ::=  iri | BlankNode | literal | quotedTriple
            TriGState::QuotedObject => match context.resolve(token) {
                Err(e) => self.error(errors, e),
                Ok(Resolved::Iri(iri)) => {
                    self.cur_object.push(iri.into());
                    self
                }
                Ok(Resolved::Other(token)) => match token {
                    TurtleToken::BlankNodeLabel(label) => {
                        self.cur_object
                            .push(context.blank_nodes.intern(label).into());
                        self
                    }
                    TurtleToken::Punctuation("[") => {
                        self.cur_object.push(context.blank_nodes.fresh().into());
                        self.stack.push(TriGState::QuotedAnonEnd);
                        self
                    }
                    TurtleToken::String(value) => {
                        self.stack
                            .push(TriGState::LiteralPossibleSuffix { value, emit: false });
                        self
                    }
                    TurtleToken::Punctuation("<<") => self.start_quoted_triple(
                        context,
                        errors,
                        TriGState::ObjectQuotedTripleEnd { emit: false },
                    ),
                    token => match native_literal(&token) {
                        Some(literal) => {
                            self.cur_object.push(literal.into());
                            self
                        }
                        None => self.error(errors, "TOKEN is not a valid RDF quoted triple object"),
                    },
                },
            },
            TriGState::QuotedAnonEnd => {
                if token == TurtleToken::Punctuation("]") {
                    self
                } else {
                    self.error(
                        errors,
                        "Anonymous blank node with a property list are not allowed in quoted triples",
                    )
                }
            }
        }
    }

    fn recognize_end(
        mut self,
        _context: &mut TriGRecognizerContext,
        results: &mut VecDeque<Quad>,
        errors: &mut Vec<RuleRecognizerError>,
    ) {
        match self.stack.as_slice() {
            [] | [TriGState::TriGDoc] => {
                debug_assert!(
                    self.cur_subject.is_empty(),
                    "The cur_subject stack must be empty if the state stack is empty"
                );
                debug_assert!(
                    self.cur_predicate.is_empty(),
                    "The cur_predicate stack must be empty if the state stack is empty"
                );
                debug_assert!(
                    self.cur_object.is_empty(),
                    "The cur_object stack must be empty if the state stack is empty"
                );
            }
            [.., TriGState::LiteralPossibleSuffix { value, emit: true }] => {
                self.cur_object
                    .push(Literal::new_simple_literal(value.clone()).into());
                self.emit_quad(results);
                errors.push("Triples should be followed by a dot".into());
            }
            _ => errors.push("Unexpected end of file in the middle of a statement".into()),
        }
    }

    fn lexer_options(context: &TriGRecognizerContext) -> &PrefixEnvironment {
        &context.env
    }
}

impl TriGRecognizer {
    pub fn new_parser<B>(
        data: B,
        is_ending: bool,
        with_graph_name: bool,
        options: &ParserOptions,
    ) -> Parser<B, Self> {
        Parser::new(
            Lexer::new(
                TurtleLexer::new(TurtleLexerMode::Turtle, options.lenient),
                data,
                is_ending,
                MIN_BUFFER_SIZE,
                MAX_BUFFER_SIZE,
                true,
                Some(b"#"),
            ),
            Self {
                stack: vec![TriGState::TriGDoc],
                cur_subject: Vec::new(),
                cur_predicate: Vec::new(),
                cur_object: Vec::new(),
                cur_graph: GraphName::DefaultGraph,
            },
            TriGRecognizerContext {
                env: options.env.clone(),
                blank_nodes: BlankNodeScope::default(),
                with_graph_name,
                lenient: options.lenient,
                rdf_star: options.rdf_star,
                generalized_rdf: options.generalized_rdf,
            },
        )
    }

    fn recognize_token(
        self,
        token: TurtleToken<'_>,
        context: &mut TriGRecognizerContext,
        results: &mut VecDeque<Quad>,
        errors: &mut Vec<RuleRecognizerError>,
    ) -> Self {
        self.recognize_next(TokenOrLineJump::Token(token), context, results, errors)
    }

    fn start_quoted_triple(
        mut self,
        context: &TriGRecognizerContext,
        errors: &mut Vec<RuleRecognizerError>,
        end: TriGState,
    ) -> Self {
        if !context.rdf_star {
            return self.error(errors, TriGRecognizerContext::quoted_triples_disabled());
        }
        self.stack.push(end);
        self.stack.push(TriGState::QuotedObject);
        self.stack.push(TriGState::Verb);
        self.stack.push(TriGState::QuotedSubject);
        self
    }

    #[must_use]
    fn error(
        mut self,
        errors: &mut Vec<RuleRecognizerError>,
        msg: impl Into<RuleRecognizerError>,
    ) -> Self {
        errors.push(msg.into());
        self.stack.clear();
        self.cur_subject.clear();
        self.cur_predicate.clear();
        self.cur_object.clear();
        self.cur_graph = GraphName::DefaultGraph;
        self
    }

    fn push_object_and_emit(mut self, object: impl Into<Term>, results: &mut VecDeque<Quad>) -> Self {
        self.cur_object.push(object.into());
        self.emit_quad(results);
        self
    }

    fn emit_quad(&mut self, results: &mut VecDeque<Quad>) {
        if let (Some(subject), Some(predicate), Some(object)) = (
            self.cur_subject.last(),
            self.cur_predicate.last(),
            self.cur_object.last(),
        ) {
            results.push_back(Quad::new(
                subject.clone(),
                predicate.clone(),
                object.clone(),
                self.cur_graph.clone(),
            ));
        }
    }
}

/// The literals written without quotes: numbers and booleans.
fn native_literal(token: &TurtleToken<'_>) -> Option<Literal> {
    // [17]    NumericLiteral  ::=  INTEGER | DECIMAL | DOUBLE
    // [133s]  BooleanLiteral  ::=  'true' | 'false'
    Some(match token {
        TurtleToken::Integer(v) => Literal::new_typed_literal(*v, xsd::INTEGER),
        TurtleToken::Decimal(v) => Literal::new_typed_literal(*v, xsd::DECIMAL),
        TurtleToken::Double(v) => Literal::new_typed_literal(*v, xsd::DOUBLE),
        TurtleToken::PlainKeyword(v @ ("true" | "false")) => {
            Literal::new_typed_literal(*v, xsd::BOOLEAN)
        }
        _ => return None,
    })
}

#[derive(Debug)]
enum TriGState {
    TriGDoc,
    ExpectDot,
    BaseExpectIri,
    PrefixExpectPrefix,
    PrefixExpectIri { name: String },
    TriplesOrGraph,
    WrappedGraphBlankNodePropertyListCurrent,
    SubjectBlankNodePropertyListEnd,
    SubjectBlankNodePropertyListAfter,
    SubjectCollectionBeginning,
    SubjectCollectionPossibleEnd,
    WrappedGraphOrPredicateObjectList { term: NamedOrBlankNode },
    WrappedGraph,
    WrappedGraphPossibleEnd,
    GraphName,
    GraphNameAnonEnd,
    Triples,
    TriplesBlankNodePropertyListCurrent,
    PredicateObjectList,
    PredicateObjectListEnd,
    PredicateObjectListPossibleContinuation,
    ObjectsList,
    ObjectsListEnd,
    AnnotationEnd,
    ObjectsListAfterAnnotation,
    Verb,
    Object,
    ObjectBlankNodePropertyListCurrent,
    ObjectBlankNodePropertyListEnd,
    ObjectCollectionBeginning,
    ObjectCollectionPossibleEnd,
    LiteralPossibleSuffix { value: String, emit: bool },
    LiteralExpectDatatype { value: String, emit: bool },
    SubjectQuotedTripleEnd,
    ObjectQuotedTripleEnd { emit: bool },
    QuotedSubject,
    QuotedObject,
    QuotedAnonEnd,
}
