use crate::iri::BaseIri;
use crate::named_node::NamedNode;
use std::collections::HashMap;

/// A stack of `@base` and `@prefix` bindings.
///
/// Lookups walk the frames from the top to the bottom. Binding a prefix again in the same frame
/// replaces the previous binding, and popping a frame restores the bindings and base of the frame below.
///
/// ```
/// use tessera_model::PrefixEnvironment;
///
/// let mut env = PrefixEnvironment::default();
/// env.bind("ex", "http://example.com/");
/// env.push_frame();
/// env.bind("ex", "http://example.org/");
/// assert_eq!(env.expand("ex", "a")?.as_str(), "http://example.org/a");
/// env.pop_frame();
/// assert_eq!(env.expand("ex", "a")?.as_str(), "http://example.com/a");
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
#[derive(Debug, Clone)]
pub struct PrefixEnvironment {
    frames: Vec<Frame>,
}

#[derive(Debug, Clone, Default)]
struct Frame {
    base: Option<BaseIri>,
    prefixes: HashMap<String, String>,
}

impl Default for PrefixEnvironment {
    fn default() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }
}

impl PrefixEnvironment {
    /// Builds an environment with a single frame holding `base`.
    pub fn with_base(base: Option<BaseIri>) -> Self {
        Self {
            frames: vec![Frame {
                base,
                prefixes: HashMap::new(),
            }],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the top frame. The bottom frame is never popped: returns `false` in this case.
    pub fn pop_frame(&mut self) -> bool {
        if self.frames.len() > 1 {
            self.frames.pop();
            true
        } else {
            false
        }
    }

    /// Number of frames, always at least one.
    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Sets the base of the top frame.
    pub fn set_base(&mut self, base: BaseIri) {
        self.top_mut().base = Some(base);
    }

    /// The base of the topmost frame setting one.
    pub fn base(&self) -> Option<&BaseIri> {
        self.frames.iter().rev().find_map(|frame| frame.base.as_ref())
    }

    /// Binds `prefix` in the top frame, replacing a binding of the same frame.
    pub fn bind(&mut self, prefix: impl Into<String>, iri: impl Into<String>) {
        self.top_mut().prefixes.insert(prefix.into(), iri.into());
    }

    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.prefixes.get(prefix))
            .map(String::as_str)
    }

    /// Concatenates the namespace bound to `prefix` with `local`.
    pub fn expand(&self, prefix: &str, local: &str) -> Result<NamedNode, UndefinedPrefixError> {
        let namespace = self.lookup(prefix).ok_or_else(|| UndefinedPrefixError {
            prefix: prefix.into(),
        })?;
        let mut iri = String::with_capacity(namespace.len() + local.len());
        iri.push_str(namespace);
        iri.push_str(local);
        Ok(NamedNode::new_unchecked(iri))
    }

    /// Finds the visible binding with the longest namespace such that `iri` is the namespace
    /// followed by a local name accepted by `is_valid_local`.
    pub fn abbreviate<'a>(
        &'a self,
        iri: &'a str,
        is_valid_local: impl Fn(&str) -> bool,
    ) -> Option<(&'a str, &'a str)> {
        self.iter()
            .filter_map(|(prefix, namespace)| {
                let local = iri.strip_prefix(namespace)?;
                is_valid_local(local).then_some((prefix, namespace.len(), local))
            })
            .max_by(|(p1, l1, _), (p2, l2, _)| l1.cmp(l2).then_with(|| p2.cmp(p1)))
            .map(|(prefix, _, local)| (prefix, local))
    }

    /// The visible bindings, sorted by prefix.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let mut visible = HashMap::<&str, &str>::new();
        for frame in &self.frames {
            for (prefix, namespace) in &frame.prefixes {
                visible.insert(prefix, namespace);
            }
        }
        let mut visible = visible.into_iter().collect::<Vec<_>>();
        visible.sort_unstable();
        visible.into_iter()
    }

    fn top_mut(&mut self) -> &mut Frame {
        if self.frames.is_empty() {
            self.frames.push(Frame::default());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

/// A prefixed name uses a prefix without binding.
#[derive(Debug, Clone, thiserror::Error)]
#[error("The prefix {prefix}: has not been declared")]
pub struct UndefinedPrefixError {
    prefix: String,
}

impl UndefinedPrefixError {
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redefinition_in_same_frame_replaces() {
        let mut env = PrefixEnvironment::default();
        env.bind("ex", "http://a/");
        env.bind("ex", "http://b/");
        assert_eq!(env.lookup("ex"), Some("http://b/"));
        assert_eq!(env.iter().count(), 1);
    }

    #[test]
    fn popped_frame_restores_base() {
        let mut env = PrefixEnvironment::with_base(Some(BaseIri::parse_unchecked("http://a/")));
        env.push_frame();
        env.set_base(BaseIri::parse_unchecked("http://b/"));
        assert_eq!(env.base().map(BaseIri::as_str), Some("http://b/"));
        assert!(env.pop_frame());
        assert_eq!(env.base().map(BaseIri::as_str), Some("http://a/"));
        assert!(!env.pop_frame());
    }

    #[test]
    fn unknown_prefix() {
        let env = PrefixEnvironment::default();
        assert_eq!(env.expand("foo", "bar").unwrap_err().prefix(), "foo");
    }

    #[test]
    fn abbreviate_prefers_longest_namespace() {
        let mut env = PrefixEnvironment::default();
        env.bind("ex", "http://example.com/");
        env.bind("exa", "http://example.com/a/");
        assert_eq!(
            env.abbreviate("http://example.com/a/b", |l| !l.contains('/')),
            Some(("exa", "b"))
        );
        assert_eq!(
            env.abbreviate("http://example.com/c", |l| !l.contains('/')),
            Some(("ex", "c"))
        );
        assert_eq!(env.abbreviate("http://other/", |_| true), None);
    }
}
