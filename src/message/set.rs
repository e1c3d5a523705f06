use std::collections::HashSet;

use indexmap::IndexMap;

use super::message::{Message, PathSegment, Signature};

/// Nested message structure mirroring the shape of the validated input.
///
/// Key segments produce maps, index segments model array slots, and
/// terminals hold the rendered message strings.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageTree {
    Node(IndexMap<PathSegment, MessageTree>),
    Messages(Vec<String>),
}

impl MessageTree {
    /// Child under a map key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&MessageTree> {
        match self {
            MessageTree::Node(map) => map.get(&PathSegment::key(key)),
            MessageTree::Messages(_) => None,
        }
    }

    /// Child under an array index.
    #[must_use]
    pub fn index(&self, index: usize) -> Option<&MessageTree> {
        match self {
            MessageTree::Node(map) => map.get(&PathSegment::Index(index)),
            MessageTree::Messages(_) => None,
        }
    }

    /// Terminal messages, when this is a bucket.
    #[must_use]
    pub fn messages(&self) -> Option<&[String]> {
        match self {
            MessageTree::Messages(list) => Some(list),
            MessageTree::Node(_) => None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            MessageTree::Node(map) => map.is_empty(),
            MessageTree::Messages(list) => list.is_empty(),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MessageTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        match self {
            MessageTree::Messages(list) => list.serialize(serializer),
            MessageTree::Node(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (segment, child) in map {
                    match segment {
                        PathSegment::Key(key) => out.serialize_entry(key, child)?,
                        PathSegment::Index(i) => out.serialize_entry(i, child)?,
                    }
                }
                out.end()
            }
        }
    }
}

/// An ordered set of messages plus the pre-scaffolded placeholder tree
/// they assemble into.
///
/// Messages keep their original evaluation order; duplicates (by
/// signature, within one terminal bucket) collapse to the first
/// occurrence. After hints are merged the set is frozen.
#[derive(Debug, Clone)]
pub struct MessageSet {
    messages: Vec<Message>,
    frozen: bool,
}

impl MessageSet {
    pub(crate) fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            frozen: false,
        }
    }

    /// True when no failure message is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of distinct messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deduped().len()
    }

    /// Distinct messages in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.deduped().into_iter()
    }

    /// Merge hint messages into the failure buckets they annotate.
    ///
    /// Hints are grouped by index-collapsed path and appended to every
    /// terminal bucket that already holds a failure at that path; buckets
    /// then deduplicate by signature. The returned set is frozen.
    pub(crate) fn with_hints(self, hints: &[Message]) -> Self {
        if self.frozen || self.messages.is_empty() {
            return Self {
                frozen: true,
                ..self
            };
        }
        let mut buckets: Vec<Vec<PathSegment>> = Vec::new();
        for m in &self.messages {
            if !buckets.contains(&m.path) {
                buckets.push(m.path.clone());
            }
        }
        let mut merged = self.messages;
        for bucket in &buckets {
            let collapsed: Vec<PathSegment> = bucket
                .iter()
                .filter(|seg| matches!(seg, PathSegment::Key(_)))
                .cloned()
                .collect();
            for hint in hints {
                if hint.index_path() == collapsed {
                    let mut placed = hint.clone();
                    placed.path = bucket.clone();
                    merged.push(placed);
                }
            }
        }
        Self {
            messages: merged,
            frozen: true,
        }
    }

    /// Assemble the nested message structure.
    ///
    /// The placeholder tree is scaffolded from the set of unique paths
    /// first, then messages are inserted in their original order, so the
    /// resulting shape is independent of insertion order.
    #[must_use]
    pub fn to_tree(&self) -> MessageTree {
        let deduped = self.deduped();
        let mut paths: Vec<&[PathSegment]> = Vec::new();
        for m in &deduped {
            if !m.path().is_empty() && !paths.contains(&m.path()) {
                paths.push(m.path());
            }
        }
        let mut root = scaffold(&paths);
        for m in deduped {
            if !m.path().is_empty() {
                insert_text(&mut root, m.path(), m.text().to_owned());
            }
        }
        root
    }

    /// Flat `(path, text)` pairs in evaluation order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<(Vec<PathSegment>, String)> {
        self.deduped()
            .into_iter()
            .map(|m| (m.path().to_vec(), m.text().to_owned()))
            .collect()
    }

    /// Messages attached to the input root rather than any key.
    #[must_use]
    pub fn root_messages(&self) -> Vec<String> {
        self.deduped()
            .into_iter()
            .filter(|m| m.path().is_empty())
            .map(|m| m.text().to_owned())
            .collect()
    }

    /// Per-bucket signature deduplication, preserving first occurrence.
    fn deduped(&self) -> Vec<&Message> {
        let mut seen: HashSet<(Vec<PathSegment>, Signature)> = HashSet::new();
        self.messages
            .iter()
            .filter(|m| seen.insert((m.path.clone(), m.signature())))
            .collect()
    }
}

fn scaffold(paths: &[&[PathSegment]]) -> MessageTree {
    let mut root = MessageTree::Node(IndexMap::new());
    for path in paths {
        scaffold_path(&mut root, path);
    }
    root
}

fn scaffold_path(tree: &mut MessageTree, path: &[PathSegment]) {
    let Some((segment, rest)) = path.split_first() else {
        return;
    };
    let MessageTree::Node(map) = tree else {
        // a shorter path already claimed this slot as a bucket
        return;
    };
    let child = map.entry(segment.clone()).or_insert_with(|| {
        if rest.is_empty() {
            MessageTree::Messages(Vec::new())
        } else {
            MessageTree::Node(IndexMap::new())
        }
    });
    scaffold_path(child, rest);
}

fn insert_text(tree: &mut MessageTree, path: &[PathSegment], text: String) {
    match tree {
        MessageTree::Messages(list) => list.push(text),
        MessageTree::Node(map) => match path.split_first() {
            Some((segment, rest)) => {
                let child = map.entry(segment.clone()).or_insert_with(|| {
                    if rest.is_empty() {
                        MessageTree::Messages(Vec::new())
                    } else {
                        MessageTree::Node(IndexMap::new())
                    }
                });
                insert_text(child, rest, text);
            }
            // a message landing on an interior node attaches to the first
            // child bucket (each-failure pairing convention)
            None => {
                if let Some((_, child)) = map.iter_mut().next() {
                    insert_text(child, &[], text);
                }
            }
        },
    }
}
