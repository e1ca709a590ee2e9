use crc32fast::Hasher;
use kir_model::ComponentId;
use std::collections::{BTreeMap, BTreeSet};

/// Hash an identity path into a raw component id
pub fn path_hash(path: &str) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(path.as_bytes());
    hasher.finalize()
}

/// Hands out stable component ids from identity paths.
///
/// A path names a node by where it sits in the expanded tree, e.g.
/// `App[0]/Column[0]/Card[1]/Text[0]`. Unchanged regions of a document keep their
/// paths across edits, so they keep their ids. Zero and already-issued ids are
/// skipped by linear probing, which keeps allocation deterministic.
#[derive(Debug, Default)]
pub struct IdAllocator {
    issued: BTreeSet<u32>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, path: &str) -> ComponentId {
        let mut id = path_hash(path);
        while id == 0 || self.issued.contains(&id) {
            id = id.wrapping_add(1);
        }
        self.issued.insert(id);
        ComponentId(id)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

/// Ordinals of same-typed siblings under one parent
#[derive(Debug, Default)]
pub struct SiblingCounter {
    seen: BTreeMap<String, usize>,
}

impl SiblingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next path segment for a child named `name`, e.g. `Text[2]`
    pub fn segment(&mut self, name: &str) -> String {
        let ordinal = self.seen.entry(name.to_string()).or_insert(0);
        let segment = format!("{}[{}]", name, ordinal);
        *ordinal += 1;
        segment
    }
}

pub fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{}/{}", parent, segment)
    }
}
