//! [In-memory implementation](Dataset) of [RDF datasets](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).
//!
//! Usage example:
//! ```
//! use tessera_model::*;
//!
//! let mut dataset = Dataset::new();
//! let ex = NamedNode::new("http://example.com")?;
//! let quad = Quad::new(ex.clone(), ex.clone(), ex.clone(), ex.clone());
//! assert!(dataset.add(quad.clone()));
//! assert!(!dataset.add(quad.clone()));
//! assert!(dataset.contains(&quad));
//! assert_eq!(dataset.triples_in(&GraphName::NamedNode(ex)).count(), 1);
//! # Result::<_, Box<dyn std::error::Error>>::Ok(())
//! ```
//!
//! Blank nodes are compared by identity. Use [`Dataset::is_isomorphic`] to compare datasets
//! up to blank node renaming.

use crate::blank_node::BlankNode;
use crate::triple::{GraphName, Predicate, Quad, Subject, Term, Triple};
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An in-memory [RDF dataset](https://www.w3.org/TR/rdf11-concepts/#dfn-rdf-dataset).
///
/// Triples are stored per graph in sets: adding a duplicate quad is a no-op.
/// Iteration follows the term order, hence it is stable as long as the dataset is not mutated.
/// The dataset is not synchronized: share it behind a lock to mutate it from several threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    graphs: BTreeMap<GraphName, BTreeSet<Triple>>,
}

impl Dataset {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quad. Returns `false` if it was already present.
    pub fn add(&mut self, quad: Quad) -> bool {
        let (triple, graph_name) = quad.into_parts();
        self.graphs.entry(graph_name).or_default().insert(triple)
    }

    /// Removes a quad. Returns `true` if it was present.
    pub fn remove(&mut self, quad: &Quad) -> bool {
        let Some(graph) = self.graphs.get_mut(&quad.graph_name) else {
            return false;
        };
        let triple = Triple {
            subject: quad.subject.clone(),
            predicate: quad.predicate.clone(),
            object: quad.object.clone(),
        };
        let removed = graph.remove(&triple);
        if graph.is_empty() {
            self.graphs.remove(&quad.graph_name);
        }
        removed
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        self.graphs.get(&quad.graph_name).is_some_and(|graph| {
            graph.contains(&Triple {
                subject: quad.subject.clone(),
                predicate: quad.predicate.clone(),
                object: quad.object.clone(),
            })
        })
    }

    /// The triples of a graph. Empty if the graph does not exist.
    pub fn triples_in<'a>(
        &'a self,
        graph_name: &GraphName,
    ) -> impl Iterator<Item = &'a Triple> + use<'a> {
        self.graphs.get(graph_name).into_iter().flatten()
    }

    /// The names of the graphs holding at least one triple, the default graph included.
    pub fn graphs(&self) -> impl Iterator<Item = &GraphName> {
        self.graphs.keys()
    }

    /// Removes a graph and all its triples. Returns `true` if the graph was not empty.
    pub fn remove_graph(&mut self, graph_name: &GraphName) -> bool {
        self.graphs.remove(graph_name).is_some()
    }

    /// Adds all the quads of `other`. Blank nodes are kept as is.
    pub fn merge(&mut self, other: Self) {
        for (graph_name, triples) in other.graphs {
            self.graphs.entry(graph_name).or_default().extend(triples);
        }
    }

    /// Number of quads.
    pub fn len(&self) -> usize {
        self.graphs.values().map(BTreeSet::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    pub fn clear(&mut self) {
        self.graphs.clear();
    }

    /// Iterates on the graph name and triple of each quad.
    pub fn iter(&self) -> impl Iterator<Item = (&GraphName, &Triple)> {
        self.graphs
            .iter()
            .flat_map(|(graph_name, triples)| triples.iter().map(move |t| (graph_name, t)))
    }

    /// Iterates on owned copies of the quads.
    pub fn quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.iter()
            .map(|(graph_name, triple)| triple.clone().in_graph(graph_name.clone()))
    }

    /// Checks if the two datasets are equal up to a renaming of their blank nodes.
    ///
    /// ```
    /// use tessera_model::*;
    ///
    /// let ex = NamedNode::new("http://example.com")?;
    /// let mut d1 = Dataset::new();
    /// d1.add(Quad::new(ex.clone(), ex.clone(), BlankNode::default(), GraphName::DefaultGraph));
    /// let mut d2 = Dataset::new();
    /// d2.add(Quad::new(ex.clone(), ex.clone(), BlankNode::default(), GraphName::DefaultGraph));
    /// assert_ne!(d1, d2);
    /// assert!(d1.is_isomorphic(&d2));
    /// # Result::<_, Box<dyn std::error::Error>>::Ok(())
    /// ```
    pub fn is_isomorphic(&self, other: &Self) -> bool {
        if self.len() != other.len() || self.graphs.len() != other.graphs.len() {
            return false;
        }
        let mut left = self.clone();
        left.canonicalize();
        let mut right = other.clone();
        right.canonicalize();
        left == right
    }

    /// Renames the blank nodes using identifiers derived from the dataset shape.
    ///
    /// Two isomorphic datasets are equal after canonicalization.
    /// The worst-case complexity is exponential in the number of blank nodes sharing the same neighbourhood.
    pub fn canonicalize(&mut self) {
        let quads_per_blank_node = self.quads_per_blank_node();
        if quads_per_blank_node.is_empty() {
            return;
        }
        let (hashes, partition) = self.hash_blank_nodes(
            quads_per_blank_node.keys().map(|b| (b.clone(), 0)).collect(),
            &quads_per_blank_node,
        );
        let mapping = self
            .distinguish(hashes, &partition, &quads_per_blank_node)
            .into_iter()
            .map(|(from, hash)| (from, BlankNode::new_from_unique_id(hash.into())))
            .collect::<HashMap<_, _>>();
        let quads = self.quads().collect::<Vec<_>>();
        self.clear();
        for quad in quads {
            self.add(map_quad_blank_nodes(quad, &mapping));
        }
    }

    fn quads_per_blank_node(&self) -> HashMap<BlankNode, Vec<Quad>> {
        let mut map = HashMap::<BlankNode, Vec<Quad>>::new();
        for quad in self.quads() {
            let mut bnodes = HashSet::new();
            quad_blank_nodes(&quad, &mut bnodes);
            for bnode in bnodes {
                map.entry(bnode).or_default().push(quad.clone());
            }
        }
        map
    }

    fn hash_blank_nodes(
        &self,
        mut hashes: HashMap<BlankNode, u64>,
        quads_per_blank_node: &HashMap<BlankNode, Vec<Quad>>,
    ) -> (HashMap<BlankNode, u64>, Vec<(u64, Vec<BlankNode>)>) {
        let mut to_hash = Vec::new();
        let mut stable = HashSet::new();
        let mut partition = HashMap::<u64, Vec<BlankNode>>::new();
        let mut old_partition_count = usize::MAX;
        while old_partition_count != partition.len() {
            old_partition_count = partition.len();
            partition.clear();
            let mut new_hashes = hashes.clone();
            for (bnode, old_hash) in &hashes {
                let hash = if stable.contains(bnode) {
                    *old_hash
                } else {
                    for quad in quads_per_blank_node.get(bnode).into_iter().flatten() {
                        to_hash.push((
                            hash_subject(&quad.subject, bnode, &hashes),
                            hash_predicate(&quad.predicate, bnode, &hashes),
                            hash_term(&quad.object, bnode, &hashes),
                            hash_graph_name(&quad.graph_name, bnode, &hashes),
                        ));
                    }
                    to_hash.sort_unstable();
                    let hash = hash_tuple((&to_hash, *old_hash));
                    to_hash.clear();
                    if hash == *old_hash {
                        stable.insert(bnode.clone());
                    } else {
                        new_hashes.insert(bnode.clone(), hash);
                    }
                    hash
                };
                partition.entry(hash).or_default().push(bnode.clone());
            }
            hashes = new_hashes;
        }
        let mut partition = partition.into_iter().collect::<Vec<_>>();
        partition.sort_unstable_by(|(h1, b1), (h2, b2)| (b1.len(), h1).cmp(&(b2.len(), h2)));
        (hashes, partition)
    }

    fn distinguish(
        &self,
        hashes: HashMap<BlankNode, u64>,
        partition: &[(u64, Vec<BlankNode>)],
        quads_per_blank_node: &HashMap<BlankNode, Vec<Quad>>,
    ) -> HashMap<BlankNode, u64> {
        let Some((_, ambiguous)) = partition.iter().find(|(_, b)| b.len() > 1) else {
            return hashes;
        };
        ambiguous
            .iter()
            .map(|bnode| {
                let mut hashes = hashes.clone();
                let marked = hash_tuple((hashes.get(bnode).copied().unwrap_or_default(), 22));
                hashes.insert(bnode.clone(), marked);
                let (hashes, partition) = self.hash_blank_nodes(hashes, quads_per_blank_node);
                self.distinguish(hashes, &partition, quads_per_blank_node)
            })
            .min_by_key(|candidate| {
                let mut values = candidate.values().copied().collect::<Vec<_>>();
                values.sort_unstable();
                values
            })
            .unwrap_or(hashes)
    }
}

impl fmt::Display for Dataset {
    /// Writes the dataset in N-Quads.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quad in self.quads() {
            writeln!(f, "{quad} .")?;
        }
        Ok(())
    }
}

impl FromIterator<Quad> for Dataset {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        let mut dataset = Self::new();
        dataset.extend(iter);
        dataset
    }
}

impl Extend<Quad> for Dataset {
    fn extend<I: IntoIterator<Item = Quad>>(&mut self, iter: I) {
        for quad in iter {
            self.add(quad);
        }
    }
}

impl IntoIterator for Dataset {
    type Item = Quad;
    type IntoIter = std::vec::IntoIter<Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.graphs
            .into_iter()
            .flat_map(|(graph_name, triples)| {
                triples
                    .into_iter()
                    .map(move |t| t.in_graph(graph_name.clone()))
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}

fn quad_blank_nodes(quad: &Quad, bnodes: &mut HashSet<BlankNode>) {
    subject_blank_nodes(&quad.subject, bnodes);
    if let Predicate::BlankNode(bnode) = &quad.predicate {
        bnodes.insert(bnode.clone());
    }
    term_blank_nodes(&quad.object, bnodes);
    if let GraphName::BlankNode(bnode) = &quad.graph_name {
        bnodes.insert(bnode.clone());
    }
}

fn subject_blank_nodes(subject: &Subject, bnodes: &mut HashSet<BlankNode>) {
    match subject {
        Subject::NamedNode(_) => (),
        Subject::BlankNode(bnode) => {
            bnodes.insert(bnode.clone());
        }
        Subject::Triple(triple) => triple_blank_nodes(triple, bnodes),
    }
}

fn term_blank_nodes(term: &Term, bnodes: &mut HashSet<BlankNode>) {
    match term {
        Term::NamedNode(_) | Term::Literal(_) => (),
        Term::BlankNode(bnode) => {
            bnodes.insert(bnode.clone());
        }
        Term::Triple(triple) => triple_blank_nodes(triple, bnodes),
    }
}

fn triple_blank_nodes(triple: &Triple, bnodes: &mut HashSet<BlankNode>) {
    subject_blank_nodes(&triple.subject, bnodes);
    if let Predicate::BlankNode(bnode) = &triple.predicate {
        bnodes.insert(bnode.clone());
    }
    term_blank_nodes(&triple.object, bnodes);
}

fn hash_blank_node(bnode: &BlankNode, current: &BlankNode, hashes: &HashMap<BlankNode, u64>) -> u64 {
    if bnode == current {
        u64::MAX
    } else {
        hashes.get(bnode).copied().unwrap_or_default()
    }
}

fn hash_subject(subject: &Subject, current: &BlankNode, hashes: &HashMap<BlankNode, u64>) -> u64 {
    match subject {
        Subject::NamedNode(node) => hash_tuple(node),
        Subject::BlankNode(bnode) => hash_blank_node(bnode, current, hashes),
        Subject::Triple(triple) => hash_triple(triple, current, hashes),
    }
}

fn hash_predicate(
    predicate: &Predicate,
    current: &BlankNode,
    hashes: &HashMap<BlankNode, u64>,
) -> u64 {
    match predicate {
        Predicate::NamedNode(node) => hash_tuple(node),
        Predicate::BlankNode(bnode) => hash_blank_node(bnode, current, hashes),
    }
}

fn hash_term(term: &Term, current: &BlankNode, hashes: &HashMap<BlankNode, u64>) -> u64 {
    match term {
        Term::NamedNode(node) => hash_tuple(node),
        Term::BlankNode(bnode) => hash_blank_node(bnode, current, hashes),
        Term::Literal(literal) => hash_tuple(literal),
        Term::Triple(triple) => hash_triple(triple, current, hashes),
    }
}

fn hash_graph_name(
    graph_name: &GraphName,
    current: &BlankNode,
    hashes: &HashMap<BlankNode, u64>,
) -> u64 {
    match graph_name {
        GraphName::NamedNode(node) => hash_tuple(node),
        GraphName::BlankNode(bnode) => hash_blank_node(bnode, current, hashes),
        GraphName::DefaultGraph => 0,
    }
}

fn hash_triple(triple: &Triple, current: &BlankNode, hashes: &HashMap<BlankNode, u64>) -> u64 {
    hash_tuple((
        hash_subject(&triple.subject, current, hashes),
        hash_predicate(&triple.predicate, current, hashes),
        hash_term(&triple.object, current, hashes),
    ))
}

fn hash_tuple(v: impl Hash) -> u64 {
    let mut hasher = DefaultHasher::new();
    v.hash(&mut hasher);
    hasher.finish()
}

fn map_blank_node(bnode: BlankNode, mapping: &HashMap<BlankNode, BlankNode>) -> BlankNode {
    mapping.get(&bnode).cloned().unwrap_or(bnode)
}

fn map_subject_blank_nodes(subject: Subject, mapping: &HashMap<BlankNode, BlankNode>) -> Subject {
    match subject {
        Subject::NamedNode(_) => subject,
        Subject::BlankNode(bnode) => map_blank_node(bnode, mapping).into(),
        Subject::Triple(triple) => map_triple_blank_nodes(*triple, mapping).into(),
    }
}

fn map_triple_blank_nodes(triple: Triple, mapping: &HashMap<BlankNode, BlankNode>) -> Triple {
    Triple {
        subject: map_subject_blank_nodes(triple.subject, mapping),
        predicate: match triple.predicate {
            Predicate::BlankNode(bnode) => map_blank_node(bnode, mapping).into(),
            predicate @ Predicate::NamedNode(_) => predicate,
        },
        object: match triple.object {
            Term::BlankNode(bnode) => map_blank_node(bnode, mapping).into(),
            Term::Triple(triple) => map_triple_blank_nodes(*triple, mapping).into(),
            object @ (Term::NamedNode(_) | Term::Literal(_)) => object,
        },
    }
}

fn map_quad_blank_nodes(quad: Quad, mapping: &HashMap<BlankNode, BlankNode>) -> Quad {
    let (triple, graph_name) = quad.into_parts();
    map_triple_blank_nodes(triple, mapping).in_graph(match graph_name {
        GraphName::BlankNode(bnode) => map_blank_node(bnode, mapping).into(),
        graph_name @ (GraphName::NamedNode(_) | GraphName::DefaultGraph) => graph_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Literal, NamedNode};

    fn ex(name: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("http://example.com/{name}"))
    }

    #[test]
    fn duplicates_are_coalesced() {
        let mut dataset = Dataset::new();
        let quad = Quad::new(ex("s"), ex("p"), ex("o"), GraphName::DefaultGraph);
        assert!(dataset.add(quad.clone()));
        assert!(!dataset.add(quad.clone()));
        assert_eq!(dataset.len(), 1);
        assert!(dataset.remove(&quad));
        assert!(!dataset.remove(&quad));
        assert!(dataset.is_empty());
    }

    #[test]
    fn graphs_and_removal() {
        let mut dataset = Dataset::new();
        dataset.add(Quad::new(ex("s"), ex("p"), ex("o"), GraphName::DefaultGraph));
        dataset.add(Quad::new(ex("s"), ex("p"), ex("o"), ex("g")));
        dataset.add(Quad::new(ex("s"), ex("p"), ex("o2"), ex("g")));
        assert_eq!(
            dataset.graphs().cloned().collect::<Vec<_>>(),
            vec![GraphName::NamedNode(ex("g")), GraphName::DefaultGraph]
        );
        assert_eq!(dataset.triples_in(&ex("g").into()).count(), 2);
        assert!(dataset.remove_graph(&ex("g").into()));
        assert_eq!(dataset.triples_in(&ex("g").into()).count(), 0);
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn merge_keeps_distinct_blank_nodes() {
        let mut first = Dataset::new();
        first.add(Quad::new(BlankNode::default(), ex("p"), ex("o"), GraphName::DefaultGraph));
        let mut second = Dataset::new();
        second.add(Quad::new(BlankNode::default(), ex("p"), ex("o"), GraphName::DefaultGraph));
        first.merge(second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn isomorphism_of_cycles() {
        let make = || {
            let (a, b, c) = (BlankNode::default(), BlankNode::default(), BlankNode::default());
            let mut dataset = Dataset::new();
            dataset.add(Quad::new(a.clone(), ex("p"), b.clone(), GraphName::DefaultGraph));
            dataset.add(Quad::new(b, ex("p"), c.clone(), GraphName::DefaultGraph));
            dataset.add(Quad::new(c, ex("p"), a, GraphName::DefaultGraph));
            dataset
        };
        assert!(make().is_isomorphic(&make()));

        let mut line = Dataset::new();
        let (a, b, c) = (BlankNode::default(), BlankNode::default(), BlankNode::default());
        line.add(Quad::new(a.clone(), ex("p"), b.clone(), GraphName::DefaultGraph));
        line.add(Quad::new(b, ex("p"), c.clone(), GraphName::DefaultGraph));
        line.add(Quad::new(c, ex("p"), BlankNode::default(), GraphName::DefaultGraph));
        assert!(!make().is_isomorphic(&line));
    }

    #[test]
    fn isomorphism_with_embedded_triples_and_graph_names() {
        let make = |literal: &str| {
            let (a, g) = (BlankNode::default(), BlankNode::default());
            let mut dataset = Dataset::new();
            dataset.add(Quad::new(
                Triple::new(a.clone(), ex("p"), Literal::from(literal)),
                ex("q"),
                a,
                g,
            ));
            dataset
        };
        assert!(make("x").is_isomorphic(&make("x")));
        assert!(!make("x").is_isomorphic(&make("y")));
    }
}
