//! Shared parser implementation for N-Triples and N-Quads.

use crate::lexer::{TurtleLexer, TurtleLexerMode, TurtleToken};
use crate::options::ParserOptions;
use crate::toolkit::{Lexer, Parser, RuleRecognizer, RuleRecognizerError, TokenOrLineJump};
use crate::{MAX_BUFFER_SIZE, MIN_BUFFER_SIZE};
use std::collections::VecDeque;
use tessera_model::vocab::rdf;
use tessera_model::{
    BlankNodeScope, ErrorKind, GraphName, Literal, NamedNode, Predicate,
    PrefixEnvironment, Quad, Subject, Term, Triple,
};
use tracing::warn;

pub struct NQuadsRecognizer {
    stack: Vec<NQuadsState>,
    subjects: Vec<Subject>,
    predicates: Vec<Predicate>,
    objects: Vec<Term>,
}

pub struct NQuadsRecognizerContext {
    pub with_graph_name: bool,
    pub lenient: bool,
    pub rdf_star: bool,
    pub generalized_rdf: bool,
    pub env: PrefixEnvironment,
    pub blank_nodes: BlankNodeScope,
}

enum NQuadsState {
    ExpectSubject,
    ExpectPredicate,
    ExpectObject,
    ExpectPossibleGraphOrEndOfQuotedTriple,
    ExpectDot { graph_name: GraphName },
    ExpectLiteralAnnotationOrGraphNameOrDot { value: String },
    ExpectLiteralDatatype { value: String },
    ExpectLineJump,
    QuotedTripleEnd { in_subject: bool },
}

impl RuleRecognizer for NQuadsRecognizer {
    type TokenRecognizer = TurtleLexer;
    type Output = Quad;
    type Context = NQuadsRecognizerContext;

    fn recognize_next(
        mut self,
        token: TokenOrLineJump<TurtleToken<'_>>,
        context: &mut NQuadsRecognizerContext,
        results: &mut VecDeque<Quad>,
        errors: &mut Vec<RuleRecognizerError>,
    ) -> Self {
        match self.stack.pop().unwrap_or(NQuadsState::ExpectSubject) {
            NQuadsState::ExpectSubject => {
                let TokenOrLineJump::Token(token) = token else {
                    return if self.stack.is_empty() {
                        self
                    } else {
                        self.error(errors, "line jumps are not allowed inside of quoted triples")
                    };
                };
                match token {
                    TurtleToken::IriRef(s) => {
                        self.subjects.push(NamedNode::new_unchecked(s).into());
                        self.stack.push(NQuadsState::ExpectPredicate);
                        self
                    }
                    TurtleToken::BlankNodeLabel(s) => {
                        self.subjects.push(context.blank_nodes.intern(s).into());
                        self.stack.push(NQuadsState::ExpectPredicate);
                        self
                    }
                    TurtleToken::Punctuation("<<") => {
                        self.start_quoted_triple(context, errors, true)
                    }
                    _ => self.error(
                        errors,
                        "The subject of a triple must be an IRI, a blank node or a quoted triple, found TOKEN",
                    ),
                }
            }
            NQuadsState::ExpectPredicate => {
                let TokenOrLineJump::Token(token) = token else {
                    return self.error(errors, "line jumps are not allowed in the middle of triples");
                };
                match token {
                    TurtleToken::IriRef(p) => {
                        self.predicates.push(NamedNode::new_unchecked(p).into());
                        self.stack.push(NQuadsState::ExpectObject);
                        self
                    }
                    TurtleToken::BlankNodeLabel(p) if context.generalized_rdf => {
                        self.predicates.push(context.blank_nodes.intern(p).into());
                        self.stack.push(NQuadsState::ExpectObject);
                        self
                    }
                    _ => self.error(errors, "The predicate of a triple must be an IRI, found TOKEN"),
                }
            }
            NQuadsState::ExpectObject => {
                let TokenOrLineJump::Token(token) = token else {
                    return self.error(errors, "line jumps are not allowed in the middle of triples");
                };
                match token {
                    TurtleToken::IriRef(o) => {
                        self.objects.push(NamedNode::new_unchecked(o).into());
                        self.stack
                            .push(NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple);
                        self
                    }
                    TurtleToken::BlankNodeLabel(o) => {
                        self.objects.push(context.blank_nodes.intern(o).into());
                        self.stack
                            .push(NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple);
                        self
                    }
                    TurtleToken::String(value) => {
                        self.stack
                            .push(NQuadsState::ExpectLiteralAnnotationOrGraphNameOrDot { value });
                        self
                    }
                    TurtleToken::Punctuation("<<") => {
                        self.start_quoted_triple(context, errors, false)
                    }
                    _ => self.error(
                        errors,
                        "The object of a triple must be an IRI, a blank node, a literal or a quoted triple, found TOKEN",
                    ),
                }
            }
            NQuadsState::ExpectLiteralAnnotationOrGraphNameOrDot { value } => match token {
                TokenOrLineJump::Token(TurtleToken::LangTag(language)) => {
                    self.objects.push(
                        Literal::new_language_tagged_literal_unchecked(
                            value,
                            language.to_ascii_lowercase(),
                        )
                        .into(),
                    );
                    self.stack
                        .push(NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple);
                    self
                }
                TokenOrLineJump::Token(TurtleToken::Punctuation("^^")) => {
                    self.stack
                        .push(NQuadsState::ExpectLiteralDatatype { value });
                    self
                }
                _ => {
                    self.objects.push(Literal::new_simple_literal(value).into());
                    self.stack
                        .push(NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple);
                    self.recognize_next(token, context, results, errors)
                }
            },
            NQuadsState::ExpectLiteralDatatype { value } => {
                let TokenOrLineJump::Token(token) = token else {
                    return self.error(errors, "line jumps are not allowed in the middle of triples");
                };
                match token {
                    TurtleToken::IriRef(d) => {
                        if d == rdf::LANG_STRING.as_str() {
                            if !context.lenient {
                                return self.error(
                                    errors,
                                    "The datatype of a literal without a language tag must not be rdf:langString",
                                );
                            }
                            warn!("Accepting a literal typed rdf:langString without language tag");
                        }
                        self.objects.push(
                            Literal::new_typed_literal(value, NamedNode::new_unchecked(d)).into(),
                        );
                        self.stack
                            .push(NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple);
                        self
                    }
                    _ => self.error(errors, "A literal datatype must be an IRI, found TOKEN"),
                }
            }
            NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple => {
                match self.stack.pop() {
                    None => match token {
                        TokenOrLineJump::Token(TurtleToken::IriRef(g)) if context.with_graph_name => {
                            self.stack.push(NQuadsState::ExpectDot {
                                graph_name: NamedNode::new_unchecked(g).into(),
                            });
                            self
                        }
                        TokenOrLineJump::Token(TurtleToken::BlankNodeLabel(g))
                            if context.with_graph_name =>
                        {
                            self.stack.push(NQuadsState::ExpectDot {
                                graph_name: context.blank_nodes.intern(g).into(),
                            });
                            self
                        }
                        _ => {
                            self.stack.push(NQuadsState::ExpectDot {
                                graph_name: GraphName::DefaultGraph,
                            });
                            self.recognize_next(token, context, results, errors)
                        }
                    },
                    Some(NQuadsState::QuotedTripleEnd { in_subject })
                        if token == TokenOrLineJump::Token(TurtleToken::Punctuation(">>")) =>
                    {
                        let Some(triple) = self.pop_triple() else {
                            return self.error(errors, "Unexpected end of quoted triple");
                        };
                        if in_subject {
                            self.subjects.push(triple.into());
                            self.stack.push(NQuadsState::ExpectPredicate);
                        } else {
                            self.objects.push(triple.into());
                            self.stack
                                .push(NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple);
                        }
                        self
                    }
                    Some(_) => self.error(errors, "Expecting the end of a quoted triple '>>', found TOKEN"),
                }
            }
            NQuadsState::ExpectDot { graph_name } => {
                if let TokenOrLineJump::Token(TurtleToken::Punctuation(".")) = token {
                    self.emit_quad(results, graph_name);
                    self.stack.push(NQuadsState::ExpectLineJump);
                    self
                } else {
                    self.error(errors, "Quads must be followed by a dot")
                }
            }
            NQuadsState::ExpectLineJump => {
                if let TokenOrLineJump::Token(_) = token {
                    return self.error(
                        errors,
                        "Only a single triple or quad can be written in a line, found TOKEN",
                    );
                }
                self
            }
            NQuadsState::QuotedTripleEnd { .. } => {
                self.error(errors, "Unexpected end of quoted triple")
            }
        }
    }

    fn recognize_end(
        self,
        _context: &mut NQuadsRecognizerContext,
        _results: &mut VecDeque<Quad>,
        errors: &mut Vec<RuleRecognizerError>,
    ) {
        match &*self.stack {
            [NQuadsState::ExpectSubject | NQuadsState::ExpectLineJump] | [] => (),
            [
                NQuadsState::ExpectDot { .. }
                | NQuadsState::ExpectPossibleGraphOrEndOfQuotedTriple
                | NQuadsState::ExpectLiteralAnnotationOrGraphNameOrDot { .. },
            ] => errors.push("Triples must be followed by a dot".into()),
            _ => errors.push("Unexpected end of file in the middle of a triple".into()),
        }
    }

    fn lexer_options(context: &NQuadsRecognizerContext) -> &PrefixEnvironment {
        &context.env
    }
}

impl NQuadsRecognizer {
    pub fn new_parser<B>(
        data: B,
        is_ending: bool,
        with_graph_name: bool,
        options: &ParserOptions,
    ) -> Parser<B, Self> {
        Parser::new(
            Lexer::new(
                TurtleLexer::new(TurtleLexerMode::NTriples, options.lenient),
                data,
                is_ending,
                MIN_BUFFER_SIZE,
                MAX_BUFFER_SIZE,
                false,
                Some(b"#"),
            ),
            Self {
                stack: vec![NQuadsState::ExpectSubject],
                subjects: Vec::new(),
                predicates: Vec::new(),
                objects: Vec::new(),
            },
            NQuadsRecognizerContext {
                with_graph_name,
                lenient: options.lenient,
                rdf_star: options.rdf_star,
                generalized_rdf: options.generalized_rdf,
                env: options.env.clone(),
                blank_nodes: BlankNodeScope::default(),
            },
        )
    }

    fn start_quoted_triple(
        mut self,
        context: &NQuadsRecognizerContext,
        errors: &mut Vec<RuleRecognizerError>,
        in_subject: bool,
    ) -> Self {
        if !context.rdf_star {
            errors.push(RuleRecognizerError::new(
                ErrorKind::UnsupportedFeature,
                "Quoted triples are not allowed when RDF-star is disabled",
            ));
            self.stack.clear();
            return self;
        }
        self.stack.push(NQuadsState::QuotedTripleEnd { in_subject });
        self.stack.push(NQuadsState::ExpectSubject);
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
        self.subjects.clear();
        self.predicates.clear();
        self.objects.clear();
        self
    }

    fn pop_triple(&mut self) -> Option<Triple> {
        Some(Triple {
            subject: self.subjects.pop()?,
            predicate: self.predicates.pop()?,
            object: self.objects.pop()?,
        })
    }

    fn emit_quad(&mut self, results: &mut VecDeque<Quad>, graph_name: GraphName) {
        if let Some(triple) = self.pop_triple() {
            results.push_back(triple.in_graph(graph_name));
        }
    }
}
