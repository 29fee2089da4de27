use crate::blank_node::BlankNode;
use crate::error::SerializerError;
use crate::literal::Literal;
use crate::named_node::{NamedNode, NamedNodeRef};
use oxiri::Iri;
use std::fmt;

/// The union of [IRIs](https://www.w3.org/TR/rdf11-concepts/#dfn-iri) and [blank nodes](https://www.w3.org/TR/rdf11-concepts/#dfn-blank-node).
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum NamedOrBlankNode {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl NamedOrBlankNode {
    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }
}

impl fmt::Display for NamedOrBlankNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for NamedOrBlankNode {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for NamedOrBlankNode {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for NamedOrBlankNode {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

/// The possible subjects of a [`Triple`]: an IRI, a blank node or an embedded triple.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Subject {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Triple(Box<Triple>),
}

impl Subject {
    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    #[inline]
    pub fn is_triple(&self) -> bool {
        matches!(self, Self::Triple(_))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
            Self::Triple(triple) => write!(f, "<< {triple} >>"),
        }
    }
}

impl From<NamedNode> for Subject {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for Subject {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for Subject {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<Triple> for Subject {
    #[inline]
    fn from(triple: Triple) -> Self {
        Self::Triple(Box::new(triple))
    }
}

impl From<Box<Triple>> for Subject {
    #[inline]
    fn from(triple: Box<Triple>) -> Self {
        Self::Triple(triple)
    }
}

impl From<NamedOrBlankNode> for Subject {
    #[inline]
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(node) => Self::NamedNode(node),
            NamedOrBlankNode::BlankNode(node) => Self::BlankNode(node),
        }
    }
}

/// The possible predicates of a [`Triple`].
///
/// Blank nodes are only allowed in [generalized RDF](https://www.w3.org/TR/rdf11-concepts/#section-generalized-rdf).
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Predicate {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
}

impl Predicate {
    /// Returns the IRI if the predicate is not a blank node.
    #[inline]
    pub fn as_named_node(&self) -> Option<&NamedNode> {
        match self {
            Self::NamedNode(node) => Some(node),
            Self::BlankNode(_) => None,
        }
    }

    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for Predicate {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for Predicate {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for Predicate {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl PartialEq<NamedNodeRef<'_>> for Predicate {
    #[inline]
    fn eq(&self, other: &NamedNodeRef<'_>) -> bool {
        self.as_named_node().is_some_and(|node| node == other)
    }
}

/// An RDF [term](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-term), possibly an embedded triple.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub enum Term {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    Literal(Literal),
    Triple(Box<Triple>),
}

impl Term {
    #[inline]
    pub fn is_blank_node(&self) -> bool {
        matches!(self, Self::BlankNode(_))
    }

    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Converts the term to a subject, failing for literals.
    pub fn into_subject(self) -> Option<Subject> {
        match self {
            Self::NamedNode(node) => Some(node.into()),
            Self::BlankNode(node) => Some(node.into()),
            Self::Triple(triple) => Some(triple.into()),
            Self::Literal(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
            Self::Triple(triple) => write!(f, "<< {triple} >>"),
        }
    }
}

impl From<NamedNode> for Term {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for Term {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for Term {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<Literal> for Term {
    #[inline]
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<Triple> for Term {
    #[inline]
    fn from(triple: Triple) -> Self {
        Self::Triple(Box::new(triple))
    }
}

impl From<Box<Triple>> for Term {
    #[inline]
    fn from(triple: Box<Triple>) -> Self {
        Self::Triple(triple)
    }
}

impl From<Subject> for Term {
    #[inline]
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::NamedNode(node) => Self::NamedNode(node),
            Subject::BlankNode(node) => Self::BlankNode(node),
            Subject::Triple(triple) => Self::Triple(triple),
        }
    }
}

impl From<NamedOrBlankNode> for Term {
    #[inline]
    fn from(node: NamedOrBlankNode) -> Self {
        Subject::from(node).into()
    }
}

/// An RDF [triple](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-triple).
///
/// ```
/// use tessera_model::{NamedNode, Triple};
///
/// let ex = NamedNode::new("http://example.com")?;
/// assert_eq!(
///     "<http://example.com> <http://example.com> <http://example.com>",
///     Triple::new(ex.clone(), ex.clone(), ex).to_string()
/// );
/// # Result::<_, tessera_model::IriParseError>::Ok(())
/// ```
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Triple {
    pub subject: Subject,
    pub predicate: Predicate,
    pub object: Term,
}

impl Triple {
    #[inline]
    pub fn new(
        subject: impl Into<Subject>,
        predicate: impl Into<Predicate>,
        object: impl Into<Term>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Puts the triple into a graph.
    #[inline]
    pub fn in_graph(self, graph_name: impl Into<GraphName>) -> Quad {
        Quad {
            subject: self.subject,
            predicate: self.predicate,
            object: self.object,
            graph_name: graph_name.into(),
        }
    }

    /// Checks that the triple only contains terms every encoder can write.
    ///
    /// IRIs must be absolute, language tags well-formed and blank node identifiers valid.
    /// A blank node predicate is unrepresentable unless `generalized_rdf` is set.
    pub fn validate(&self, generalized_rdf: bool) -> Result<(), SerializerError> {
        validate_subject(&self.subject, generalized_rdf)?;
        validate_predicate_and_object(&self.predicate, &self.object, generalized_rdf)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

/// A possible graph name: an IRI, a blank node or the default graph.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash, Default)]
pub enum GraphName {
    NamedNode(NamedNode),
    BlankNode(BlankNode),
    #[default]
    DefaultGraph,
}

impl GraphName {
    #[inline]
    pub fn is_default_graph(&self) -> bool {
        matches!(self, Self::DefaultGraph)
    }
}

impl fmt::Display for GraphName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NamedNode(node) => node.fmt(f),
            Self::BlankNode(node) => node.fmt(f),
            Self::DefaultGraph => f.write_str("DEFAULT"),
        }
    }
}

impl From<NamedNode> for GraphName {
    #[inline]
    fn from(node: NamedNode) -> Self {
        Self::NamedNode(node)
    }
}

impl From<NamedNodeRef<'_>> for GraphName {
    #[inline]
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self::NamedNode(node.into_owned())
    }
}

impl From<BlankNode> for GraphName {
    #[inline]
    fn from(node: BlankNode) -> Self {
        Self::BlankNode(node)
    }
}

impl From<NamedOrBlankNode> for GraphName {
    #[inline]
    fn from(node: NamedOrBlankNode) -> Self {
        match node {
            NamedOrBlankNode::NamedNode(node) => Self::NamedNode(node),
            NamedOrBlankNode::BlankNode(node) => Self::BlankNode(node),
        }
    }
}

/// A [triple](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-triple) in an [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).
///
/// The default formatter returns the N-Quads representation without the final dot.
#[derive(Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Hash)]
pub struct Quad {
    pub subject: Subject,
    pub predicate: Predicate,
    pub object: Term,
    pub graph_name: GraphName,
}

impl Quad {
    #[inline]
    pub fn new(
        subject: impl Into<Subject>,
        predicate: impl Into<Predicate>,
        object: impl Into<Term>,
        graph_name: impl Into<GraphName>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            graph_name: graph_name.into(),
        }
    }

    /// Splits the quad into its triple and its graph name.
    #[inline]
    pub fn into_parts(self) -> (Triple, GraphName) {
        (
            Triple {
                subject: self.subject,
                predicate: self.predicate,
                object: self.object,
            },
            self.graph_name,
        )
    }

    /// Same as [`Triple::validate`], also checking the graph name.
    pub fn validate(&self, generalized_rdf: bool) -> Result<(), SerializerError> {
        match &self.graph_name {
            GraphName::NamedNode(node) => validate_named_node(node)?,
            GraphName::BlankNode(node) => validate_blank_node(node)?,
            GraphName::DefaultGraph => (),
        }
        validate_subject(&self.subject, generalized_rdf)?;
        validate_predicate_and_object(&self.predicate, &self.object, generalized_rdf)
    }
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.graph_name.is_default_graph() {
            write!(f, "{} {} {}", self.subject, self.predicate, self.object)
        } else {
            write!(
                f,
                "{} {} {} {}",
                self.subject, self.predicate, self.object, self.graph_name
            )
        }
    }
}

impl From<Triple> for Quad {
    #[inline]
    fn from(triple: Triple) -> Self {
        triple.in_graph(GraphName::DefaultGraph)
    }
}

fn validate_subject(subject: &Subject, generalized_rdf: bool) -> Result<(), SerializerError> {
    match subject {
        Subject::NamedNode(node) => validate_named_node(node),
        Subject::BlankNode(node) => validate_blank_node(node),
        Subject::Triple(triple) => triple.validate(generalized_rdf),
    }
}

fn validate_predicate_and_object(
    predicate: &Predicate,
    object: &Term,
    generalized_rdf: bool,
) -> Result<(), SerializerError> {
    match predicate {
        Predicate::NamedNode(node) => validate_named_node(node)?,
        Predicate::BlankNode(node) => {
            if !generalized_rdf {
                return Err(SerializerError::unrepresentable(format!(
                    "the blank node {node} is used as a predicate and generalized RDF is not enabled"
                )));
            }
            validate_blank_node(node)?;
        }
    }
    match object {
        Term::NamedNode(node) => validate_named_node(node),
        Term::BlankNode(node) => validate_blank_node(node),
        Term::Literal(literal) => validate_literal(literal),
        Term::Triple(triple) => triple.validate(generalized_rdf),
    }
}

fn validate_named_node(node: &NamedNode) -> Result<(), SerializerError> {
    Iri::parse(node.as_str()).map_err(|e| {
        SerializerError::invalid_term(format!("{node} is not a valid absolute IRI: {e}"))
    })?;
    Ok(())
}

fn validate_blank_node(node: &BlankNode) -> Result<(), SerializerError> {
    BlankNode::new(node.as_str()).map_err(|_| {
        SerializerError::invalid_term(format!("{node} is not a valid blank node identifier"))
    })?;
    Ok(())
}

fn validate_literal(literal: &Literal) -> Result<(), SerializerError> {
    if let Some(language) = literal.language() {
        oxilangtag::LanguageTag::parse(language).map_err(|e| {
            SerializerError::invalid_term(format!(
                "{literal} does not have a valid language tag: {e}"
            ))
        })?;
    }
    validate_named_node(&literal.datatype().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn embedded_triples_display_with_angle_brackets() {
        let ex = NamedNode::new_unchecked("http://example.com/");
        let inner = Triple::new(ex.clone(), ex.clone(), ex.clone());
        let outer = Triple::new(inner, ex.clone(), Literal::from("o"));
        assert_eq!(
            outer.to_string(),
            "<< <http://example.com/> <http://example.com/> <http://example.com/> >> <http://example.com/> \"o\""
        );
    }

    #[test]
    fn blank_predicates_require_generalized_rdf() {
        let ex = NamedNode::new_unchecked("http://example.com/");
        let triple = Triple::new(ex.clone(), BlankNode::default(), ex);
        assert_eq!(
            triple.validate(false).unwrap_err().kind(),
            ErrorKind::UnrepresentableInTargetFormat
        );
        triple.validate(true).unwrap();
    }

    #[test]
    fn relative_iris_are_invalid_terms() {
        let triple = Triple::new(
            NamedNode::new_unchecked("s"),
            NamedNode::new_unchecked("http://example.com/p"),
            NamedNode::new_unchecked("http://example.com/o"),
        );
        assert_eq!(triple.validate(false).unwrap_err().kind(), ErrorKind::InvalidTerm);
    }
}
