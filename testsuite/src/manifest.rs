use crate::files::{FileResolver, guess_rdf_format};
use crate::vocab::{jld, mf, rdfs, rdft};
use anyhow::{Context, Result, bail};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tessera::model::vocab::rdf;
use tessera::model::{Dataset, GraphName, NamedNode, NamedNodeRef, Subject, Term};
use tracing::{debug, info};

pub struct Test {
    pub id: NamedNode,
    pub kinds: Vec<NamedNode>,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub action: Option<String>,
    pub result: Option<String>,
    pub options: JsonLdTestOptions,
    /// Where to find the files the test refers to.
    pub files: FileResolver,
}

impl Test {
    pub fn has_kind(&self, kind: NamedNodeRef<'_>) -> bool {
        self.kinds.iter().any(|k| *k == kind)
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(name) = &self.name {
            write!(f, " named \"{name}\"")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " with comment \"{comment}\"")?;
        }
        if let Some(action) = &self.action {
            write!(f, " on file \"{action}\"")?;
        }
        if let Some(result) = &self.result {
            write!(f, " and expected result {result}")?;
        }
        Ok(())
    }
}

/// The `jld:option` values of a JSON-LD test.
#[derive(Default, Clone, Debug)]
pub struct JsonLdTestOptions {
    pub base: Option<String>,
    pub spec_version: Option<String>,
    pub processing_mode: Option<String>,
    pub produce_generalized_rdf: bool,
    pub rdf_direction: Option<String>,
    pub expand_context: Option<String>,
}

/// Iterates over the tests of W3C manifests written in Turtle or JSON-LD, following `mf:include`.
pub struct TestManifest {
    graph: ManifestGraph,
    files: FileResolver,
    tests_to_do: VecDeque<Term>,
    manifests_to_do: VecDeque<String>,
}

impl Iterator for TestManifest {
    type Item = Result<Test>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(next) = self.next_test().transpose() {
                return Some(next);
            }
            if let Err(e) = self.load_next_manifest().transpose()? {
                return Some(Err(e));
            }
        }
    }
}

impl TestManifest {
    pub fn new<S: ToString>(
        files: FileResolver,
        manifest_urls: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            graph: ManifestGraph::default(),
            files,
            tests_to_do: VecDeque::new(),
            manifests_to_do: manifest_urls
                .into_iter()
                .map(|url| url.to_string())
                .collect(),
        }
    }

    fn next_test(&mut self) -> Result<Option<Test>> {
        loop {
            let Some(test_node) = self.tests_to_do.pop_front() else {
                return Ok(None);
            };
            let Term::NamedNode(test_node) = test_node else {
                bail!("Invalid test identifier. Got {test_node}");
            };
            let subject = Subject::from(test_node.clone());

            if self.graph.contains(&subject, rdft::APPROVAL, rdft::REJECTED) {
                debug!(test = test_node.as_str(), "Skipping rejected test");
                continue;
            }
            let name = self.graph.literal(&subject, mf::NAME);
            let kinds = self
                .graph
                .objects(&subject, rdf::TYPE)
                .map(|kind| match kind {
                    Term::NamedNode(kind) => Ok(kind.clone()),
                    _ => bail!("The test {test_node} has an invalid rdf:type {kind}"),
                })
                .collect::<Result<Vec<_>>>()?;
            if kinds.is_empty() {
                bail!("The test {test_node} has no rdf:type");
            }
            let comment = self.graph.literal(&subject, rdfs::COMMENT);
            let action = match self.graph.object(&subject, mf::ACTION) {
                Some(Term::NamedNode(n)) => Some(n.as_str().to_owned()),
                Some(_) => bail!("Invalid action for test {test_node}"),
                None => bail!("Action not found for test {test_node}"),
            };
            let result = match self.graph.object(&subject, mf::RESULT) {
                Some(Term::NamedNode(n)) => Some(n.as_str().to_owned()),
                Some(Term::Literal(l)) => Some(l.value().to_owned()),
                Some(_) => bail!("Invalid result for test {test_node}"),
                None => None,
            };
            let options = self.json_ld_options(&subject)?;
            return Ok(Some(Test {
                id: test_node,
                kinds,
                name,
                comment,
                action,
                result,
                options,
                files: self.files.clone(),
            }));
        }
    }

    fn json_ld_options(&self, test: &Subject) -> Result<JsonLdTestOptions> {
        let Some(option) = self.graph.object(test, jld::OPTION) else {
            return Ok(JsonLdTestOptions::default());
        };
        let Some(option) = term_to_subject(option) else {
            bail!("Invalid jld:option {option}");
        };
        Ok(JsonLdTestOptions {
            base: match self.graph.object(&option, jld::BASE) {
                Some(Term::NamedNode(base)) => Some(base.as_str().to_owned()),
                Some(Term::Literal(base)) => Some(base.value().to_owned()),
                _ => None,
            },
            spec_version: self.graph.literal(&option, jld::SPEC_VERSION),
            processing_mode: self.graph.literal(&option, jld::PROCESSING_MODE),
            produce_generalized_rdf: self
                .graph
                .literal(&option, jld::PRODUCE_GENERALIZED_RDF)
                .is_some_and(|v| v == "true"),
            rdf_direction: self.graph.literal(&option, jld::RDF_DIRECTION),
            expand_context: match self.graph.object(&option, jld::EXPAND_CONTEXT) {
                Some(Term::NamedNode(context)) => Some(context.as_str().to_owned()),
                Some(Term::Literal(context)) => Some(context.value().to_owned()),
                _ => None,
            },
        })
    }

    fn load_next_manifest(&mut self) -> Result<Option<()>> {
        let Some(url) = self.manifests_to_do.pop_front() else {
            return Ok(None);
        };
        info!(manifest = url, "Loading test manifest");
        let format = guess_rdf_format(&url)?;
        self.graph = ManifestGraph::new(self.files.load_dataset(&url, format, &url)?);
        let mut manifest = self.graph.manifest_node()?;

        let assumed_base = self
            .graph
            .object(&manifest, mf::ASSUMED_TEST_BASE)
            .or_else(|| self.graph.object(&manifest, jld::BASE_IRI));
        if let Some(base) = assumed_base {
            let base = match base {
                Term::NamedNode(base) => base.as_str().to_owned(),
                Term::Literal(base) => base.value().to_owned(),
                _ => bail!("Invalid assumed test base: {base}"),
            };
            let base_directory = match base.rfind('/') {
                Some(position) => &base[..=position],
                None => bail!("The assumed test base {base} is not hierarchical"),
            };
            let local_directory = self
                .files
                .resolve(&url)?
                .parent()
                .with_context(|| format!("{url} has no parent directory"))?
                .to_owned();
            self.files.add_mapping(base_directory, local_directory);
            let file_name = url.rsplit_once('/').map_or(url.as_str(), |(_, name)| name);
            let rebased_url = format!("{base_directory}{file_name}");
            self.graph =
                ManifestGraph::new(self.files.load_dataset(&url, format, &rebased_url)?);
            manifest = self.graph.manifest_node()?;
        }

        if let Some(includes) = self.graph.object(&manifest, mf::INCLUDE) {
            for included in self.graph.list(includes)? {
                match included {
                    Term::NamedNode(included) => {
                        self.manifests_to_do.push_back(included.into_string())
                    }
                    _ => bail!("Invalid included manifest {included}"),
                }
            }
        }

        match self.graph.object(&manifest, mf::ENTRIES) {
            Some(entries) => {
                let entries = self.graph.list(entries)?;
                self.tests_to_do.extend(entries);
            }
            None => debug!(manifest = url, "The manifest has no entries"),
        }
        Ok(Some(()))
    }
}

/// The default graph of a manifest, indexed by subject.
#[derive(Default)]
struct ManifestGraph {
    by_subject: HashMap<Subject, Vec<(NamedNode, Term)>>,
}

impl ManifestGraph {
    fn new(dataset: Dataset) -> Self {
        let mut by_subject = HashMap::<Subject, Vec<(NamedNode, Term)>>::new();
        for triple in dataset.triples_in(&GraphName::DefaultGraph) {
            if let tessera::model::Predicate::NamedNode(predicate) = &triple.predicate {
                by_subject
                    .entry(triple.subject.clone())
                    .or_default()
                    .push((predicate.clone(), triple.object.clone()));
            }
        }
        Self { by_subject }
    }

    fn objects<'a>(
        &'a self,
        subject: &Subject,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = &'a Term> + use<'a> {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .filter(move |(p, _)| *p == predicate)
            .map(|(_, o)| o)
    }

    fn object<'a>(&'a self, subject: &Subject, predicate: NamedNodeRef<'a>) -> Option<&'a Term> {
        self.objects(subject, predicate).next()
    }

    fn literal(&self, subject: &Subject, predicate: NamedNodeRef<'_>) -> Option<String> {
        match self.object(subject, predicate)? {
            Term::Literal(literal) => Some(literal.value().to_owned()),
            _ => None,
        }
    }

    fn contains(
        &self,
        subject: &Subject,
        predicate: NamedNodeRef<'_>,
        object: NamedNodeRef<'_>,
    ) -> bool {
        self.objects(subject, predicate)
            .any(|o| matches!(o, Term::NamedNode(o) if *o == object))
    }

    fn manifest_node(&self) -> Result<Subject> {
        let mut manifests = self
            .by_subject
            .keys()
            .filter(|s| self.contains(s, rdf::TYPE, mf::MANIFEST));
        let Some(manifest) = manifests.next() else {
            bail!("No manifest found")
        };
        if manifests.next().is_some() {
            bail!("The file should contain a single manifest");
        }
        Ok(manifest.clone())
    }

    /// The elements of the RDF list starting at `head`.
    fn list(&self, head: &Term) -> Result<Vec<Term>> {
        let mut elements = Vec::new();
        let mut visited = HashSet::new();
        let mut current = head.clone();
        loop {
            if matches!(&current, Term::NamedNode(n) if *n == rdf::NIL) {
                return Ok(elements);
            }
            let Some(node) = term_to_subject(&current) else {
                bail!("Invalid list node {current}");
            };
            if !visited.insert(node.clone()) {
                bail!("The list starting at {head} is cyclic");
            }
            elements.push(
                self.object(&node, rdf::FIRST)
                    .with_context(|| format!("The list node {node} has no rdf:first"))?
                    .clone(),
            );
            current = self
                .object(&node, rdf::REST)
                .with_context(|| format!("The list node {node} has no rdf:rest"))?
                .clone();
        }
    }
}

fn term_to_subject(term: &Term) -> Option<Subject> {
    match term {
        Term::NamedNode(node) => Some(node.clone().into()),
        Term::BlankNode(node) => Some(node.clone().into()),
        _ => None,
    }
}
