//! Tree mutation primitives.
//!
//! A [`ParentIndex`] maps every reachable node to its parent. It is built
//! from a tree snapshot and consumed by the edit that uses it, so an index
//! can never be reused across a mutation boundary. Rules collect their
//! edits during a read-only traversal and apply them as one [`EditBatch`]
//! against one index.

use std::collections::{HashMap, HashSet};

use tracing::{trace, warn};

use crate::domain::ast::{Ast, NodeId};
use crate::domain::kind::NodeKind;

/// Child-to-parent map of one tree state.
pub struct ParentIndex {
    parents: HashMap<NodeId, NodeId>,
    generation: u64,
}

impl ParentIndex {
    pub fn build(ast: &Ast) -> Self {
        let mut parents = HashMap::new();
        for id in ast.iter() {
            for child in ast.children(id) {
                parents.insert(*child, id);
            }
        }
        Self {
            parents,
            generation: ast.generation(),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(&id).copied()
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Nearest strict ancestor of the given kind.
    pub fn enclosing(&self, ast: &Ast, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.ancestors(id).find(|a| ast.is(*a, kind))
    }

    /// Whether `id` sits anywhere below `ancestor`.
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// The node an edit on `target` acts on: `target` itself, or the first
    /// node of kind `stop_at` on the way up from it.
    pub fn locate(&self, ast: &Ast, target: NodeId, stop_at: Option<NodeKind>) -> Option<NodeId> {
        if target != ast.root() && !self.parents.contains_key(&target) {
            return None;
        }
        match stop_at {
            None => Some(target),
            Some(kind) if ast.is(target, kind) => Some(target),
            Some(kind) => self.enclosing(ast, target, kind),
        }
    }

    /// Replaces `target` (or its `stop_at` ancestor) by one or more nodes,
    /// spliced in at the same position.
    pub fn replace(
        self,
        ast: &mut Ast,
        target: NodeId,
        replacement: impl Into<Replacement>,
        stop_at: Option<NodeKind>,
    ) -> bool {
        let mut batch = EditBatch::default();
        batch.replace(target, replacement, stop_at);
        batch.apply(ast, self) == 1
    }

    /// Removes `target` (or its `stop_at` ancestor) from its parent.
    pub fn delete(self, ast: &mut Ast, target: NodeId, stop_at: Option<NodeKind>) -> bool {
        let mut batch = EditBatch::default();
        batch.delete(target, stop_at);
        batch.apply(ast, self) == 1
    }
}

/// Ordered nodes taking the place of a replaced node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement(pub Vec<NodeId>);

impl From<NodeId> for Replacement {
    fn from(id: NodeId) -> Self {
        Replacement(vec![id])
    }
}

impl From<Vec<NodeId>> for Replacement {
    fn from(ids: Vec<NodeId>) -> Self {
        Replacement(ids)
    }
}

#[derive(Debug, Clone)]
enum Edit {
    Replace {
        target: NodeId,
        with: Replacement,
        stop_at: Option<NodeKind>,
    },
    Delete {
        target: NodeId,
        stop_at: Option<NodeKind>,
    },
}

/// Structural edits gathered during one traversal.
#[derive(Debug, Default)]
pub struct EditBatch {
    edits: Vec<Edit>,
}

impl EditBatch {
    pub fn replace(
        &mut self,
        target: NodeId,
        replacement: impl Into<Replacement>,
        stop_at: Option<NodeKind>,
    ) {
        self.edits.push(Edit::Replace {
            target,
            with: replacement.into(),
            stop_at,
        });
    }

    pub fn delete(&mut self, target: NodeId, stop_at: Option<NodeKind>) {
        self.edits.push(Edit::Delete { target, stop_at });
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Applies every edit against `index`, which must describe the tree as
    /// it was when the edits were collected. An edit whose located node
    /// overlaps a node already edited in this batch is skipped. Returns the
    /// number of edits applied.
    pub fn apply(self, ast: &mut Ast, index: ParentIndex) -> usize {
        if index.generation != ast.generation() {
            warn!("Stale parent index, {} edit(s) dropped", self.edits.len());
            return 0;
        }

        let mut touched: HashSet<NodeId> = HashSet::new();
        let mut applied = 0;

        for edit in self.edits {
            let (target, stop_at) = match &edit {
                Edit::Replace {
                    target, stop_at, ..
                } => (*target, *stop_at),
                Edit::Delete { target, stop_at } => (*target, *stop_at),
            };

            let Some(located) = index.locate(ast, target, stop_at) else {
                trace!("Edit target {:?} not in parent index", target);
                continue;
            };
            let Some(parent) = index.parent(located) else {
                trace!("Edit target {:?} is the root", located);
                continue;
            };
            let overlaps = touched.contains(&located)
                || index.ancestors(located).any(|a| touched.contains(&a))
                || touched.iter().any(|t| index.is_within(*t, located));
            if overlaps {
                trace!("Edit on {:?} overlaps an earlier edit", located);
                continue;
            }

            let siblings = ast.children_mut(parent);
            let Some(pos) = siblings.iter().position(|c| *c == located) else {
                continue;
            };
            match edit {
                Edit::Replace { with, .. } => {
                    siblings.splice(pos..=pos, with.0);
                }
                Edit::Delete { .. } => {
                    siblings.remove(pos);
                }
            }
            touched.insert(located);
            applied += 1;
        }

        applied
    }
}
