//! Static command completion
//!
//! A completion tree maps a command word either to a nested tree of
//! sub-commands or to the list of its final arguments:
//!
//! ```json
//! {
//!     "reboot": ["now", "later"],
//!     "gpio": {
//!         "set": ["0", "1"],
//!         "get": []
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompletionNode {
    Branch(BTreeMap<String, CompletionNode>),
    Leaf(Vec<String>),
}

impl CompletionNode {
    /// Options offered at this node
    fn options(&self) -> Vec<String> {
        match self {
            CompletionNode::Branch(children) => children.keys().cloned().collect(),
            CompletionNode::Leaf(options) => options.clone(),
        }
    }
}

impl Default for CompletionNode {
    fn default() -> Self {
        CompletionNode::Branch(BTreeMap::new())
    }
}

/// Completion tree of one project. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionTree {
    root: CompletionNode,
}

impl CompletionTree {
    pub fn is_empty(&self) -> bool {
        match &self.root {
            CompletionNode::Branch(children) => children.is_empty(),
            CompletionNode::Leaf(options) => options.is_empty(),
        }
    }

    /// Every option that may follow `words`.
    ///
    /// The tree is walked one word at a time. A word that is unknown at the
    /// current level stops the walk and the options of that level are
    /// returned. Empty words are skipped.
    pub fn entries<'a, I>(&self, words: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut node = &self.root;
        for word in words.into_iter().filter(|w| !w.is_empty()) {
            match node {
                CompletionNode::Branch(children) => match children.get(word) {
                    Some(child) => node = child,
                    None => break,
                },
                CompletionNode::Leaf(_) => break,
            }
        }
        node.options()
    }

    /// Complete `line`.
    ///
    /// Returns the part of the line to keep and the candidates for the word
    /// being typed. With a trailing space every option for the next word is
    /// returned and the line is kept as is.
    pub fn search(&self, line: &str) -> (String, Vec<String>) {
        tracing::debug!("Completion search for \"{}\"", line);
        if line.ends_with(' ') {
            return (line.to_string(), self.entries(line.split(' ')));
        }

        let (prefix, partial) = match line.rsplit_once(' ') {
            Some((head, partial)) => (format!("{head} "), partial),
            None => (String::new(), line),
        };
        let candidates = self
            .entries(prefix.split(' '))
            .into_iter()
            .filter(|option| option.starts_with(partial))
            .collect();
        (prefix, candidates)
    }
}

/// Longest prefix shared by every candidate
pub fn common_prefix(candidates: &[String]) -> &str {
    let Some((first, rest)) = candidates.split_first() else {
        return "";
    };
    let mut end = first.len();
    for other in rest {
        end = first
            .char_indices()
            .zip(other.chars())
            .find(|((_, a), b)| a != b)
            .map_or(end.min(other.len()), |((idx, _), _)| idx.min(end));
    }
    &first[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(json: &str) -> CompletionTree {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_partial_word_is_filtered() {
        let t = tree(r#"{"a": {"b": ["c", "cd"]}}"#);
        assert_eq!(t.search("a b c"), ("a b ".to_string(), vec!["c".into(), "cd".into()]));
        assert_eq!(t.search("a b cd"), ("a b ".to_string(), vec!["cd".into()]));
        assert_eq!(t.search("a b x"), ("a b ".to_string(), vec![]));
    }

    #[test]
    fn test_trailing_space_lists_everything() {
        let t = tree(r#"{"a": {"b": ["c", "cd"]}}"#);
        assert_eq!(
            t.search("a b c "),
            ("a b c ".to_string(), vec!["c".into(), "cd".into()])
        );
        assert_eq!(t.search("a "), ("a ".to_string(), vec!["b".into()]));
    }

    #[test]
    fn test_first_word() {
        let t = tree(r#"{"reboot": [], "read": ["x"], "gpio": {}}"#);
        assert_eq!(
            t.search("re"),
            (String::new(), vec!["read".into(), "reboot".into()])
        );
        assert_eq!(t.search("").1, vec!["gpio", "read", "reboot"]);
    }

    #[test]
    fn test_unknown_word_falls_back_to_current_level() {
        let t = tree(r#"{"a": {"b": ["c"], "bb": []}, "z": []}"#);
        assert_eq!(t.entries(["nope"]), vec!["a", "z"]);
        assert_eq!(t.entries(["a", "nope"]), vec!["b", "bb"]);
        assert_eq!(t.search("a nope b").1, vec!["b", "bb"]);
    }

    #[test]
    fn test_empty_tree_never_fails() {
        let t = CompletionTree::default();
        assert!(t.is_empty());
        assert_eq!(t.search("anything"), (String::new(), vec![]));
        assert_eq!(t.search("a b "), ("a b ".to_string(), vec![]));
    }

    #[test]
    fn test_common_prefix() {
        let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(common_prefix(&owned(&["reboot", "read", "reset"])), "re");
        assert_eq!(common_prefix(&owned(&["gpio"])), "gpio");
        assert_eq!(common_prefix(&owned(&["abc", "ab"])), "ab");
        assert_eq!(common_prefix(&owned(&["x", "y"])), "");
        assert_eq!(common_prefix(&[]), "");
    }
}
