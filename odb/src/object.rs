use crate::error::OdbError;
use crate::oid::ObjectId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Tag,
}

/// One entry of a tree object, in the order the tree stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: ObjectKind,
    pub id: ObjectId,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, kind: ObjectKind, id: ObjectId) -> Self {
        Self {
            name: name.into(),
            kind,
            id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new(entries: Vec<TreeEntry>) -> Self {
        Self { entries }
    }
}

/// Loads subtrees on demand during a walk. Implemented over whatever
/// object store hosts the graph; the walker performs exactly one
/// `read_tree` per interior node it descends into.
pub trait ObjectSource {
    fn read_tree(&self, id: &ObjectId) -> Result<Tree, OdbError>;
}

/// Object source backed by a map, used in tests and anywhere a graph is
/// assembled in memory.
#[derive(Debug, Default)]
pub struct MemoryObjectSource {
    trees: HashMap<ObjectId, Tree>,
}

impl MemoryObjectSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_tree(&mut self, id: ObjectId, tree: Tree) {
        self.trees.insert(id, tree);
    }
}

impl ObjectSource for MemoryObjectSource {
    fn read_tree(&self, id: &ObjectId) -> Result<Tree, OdbError> {
        self.trees
            .get(id)
            .cloned()
            .ok_or_else(|| OdbError::TreeNotFound { id: id.clone() })
    }
}
