//! Subjob - 実行ツリーの 1 ノード
//!
//! ツリーは id で参照し合う arena として表現します。
//! parent / children / next はすべて `SubjobId` で、所有参照は持ちません。
//! ノードは投入時にすべて作られ、コアは status と
//! `descendants_complete` を進めるだけです（生成・削除はしない）。

use serde::{Deserialize, Serialize};

use super::ids::{JobId, SubjobId, SuperjobId};
use super::state::SubjobStatus;
use super::worker_ref::WorkerRef;

/// Composition kind of a node. Resolved once when the tree is authored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjobKind {
    /// Executable work pushed to the queue.
    Leaf(WorkerRef),

    /// Plain holder of a sequential child chain.
    Sequential,

    /// Children run independently; done when all of them are.
    Parallel,

    /// Every child is a `BatchChild`; all start together.
    Batch,

    /// Member of a batch wrapping exactly one grandchild.
    BatchChild,

    /// A superjob nested inside another. Has no work of its own.
    NestedSuperjob(WorkerRef),
}

impl SubjobKind {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            SubjobKind::Leaf(_) => "leaf",
            SubjobKind::Sequential => "sequential",
            SubjobKind::Parallel => "parallel",
            SubjobKind::Batch => "batch",
            SubjobKind::BatchChild => "batch_child",
            SubjobKind::NestedSuperjob(_) => "nested_superjob",
        }
    }

    /// Pure composition kinds with no executable payload.
    pub fn worker_less(&self) -> bool {
        matches!(
            self,
            SubjobKind::Sequential | SubjobKind::Parallel | SubjobKind::Batch | SubjobKind::BatchChild
        )
    }

    /// Kinds whose children are chained through `next`.
    pub fn chains_children(&self) -> bool {
        matches!(
            self,
            SubjobKind::Leaf(_) | SubjobKind::Sequential | SubjobKind::NestedSuperjob(_)
        )
    }
}

/// One node of the execution tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subjob {
    pub id: SubjobId,
    pub superjob_id: SuperjobId,
    pub parent_id: Option<SubjobId>,
    pub kind: SubjobKind,
    pub status: SubjobStatus,
    pub descendants_complete: bool,

    /// Insertion order is execution order for sequential chains.
    pub children: Vec<SubjobId>,

    /// Next sibling in a sequential chain.
    pub next: Option<SubjobId>,

    /// Opaque payload handed to the queue for leaves.
    pub args: serde_json::Value,
    pub meta: serde_json::Value,

    /// Set by the dispatcher before the push to the queue.
    pub assigned_job_id: Option<JobId>,
}

impl Subjob {
    /// Create a fresh `Initialized` node with no relatives.
    pub fn new(id: SubjobId, superjob_id: SuperjobId, kind: SubjobKind) -> Self {
        Self {
            id,
            superjob_id,
            parent_id: None,
            kind,
            status: SubjobStatus::Initialized,
            descendants_complete: false,
            children: Vec::new(),
            next: None,
            args: serde_json::Value::Null,
            meta: serde_json::Value::Null,
            assigned_job_id: None,
        }
    }

    pub fn parent(&self) -> Option<SubjobId> {
        self.parent_id
    }

    pub fn children(&self) -> &[SubjobId] {
        &self.children
    }

    pub fn first_child(&self) -> Option<SubjobId> {
        self.children.first().copied()
    }

    pub fn next(&self) -> Option<SubjobId> {
        self.next
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Executable work referenced by this node, if any.
    pub fn worker(&self) -> Option<&WorkerRef> {
        match &self.kind {
            SubjobKind::Leaf(worker) | SubjobKind::NestedSuperjob(worker) => Some(worker),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn node(kind: SubjobKind) -> Subjob {
        Subjob::new(
            SubjobId::from_ulid(Ulid::new()),
            SuperjobId::from_ulid(Ulid::new()),
            kind,
        )
    }

    #[test]
    fn new_node_starts_initialized() {
        let n = node(SubjobKind::Sequential);
        assert_eq!(n.status, SubjobStatus::Initialized);
        assert!(!n.descendants_complete);
        assert!(n.is_root());
        assert!(n.first_child().is_none());
        assert!(n.assigned_job_id.is_none());
    }

    #[test]
    fn only_leaf_and_nested_carry_work() {
        assert_eq!(
            node(SubjobKind::Leaf(WorkerRef::new("w"))).worker(),
            Some(&WorkerRef::new("w"))
        );
        assert!(node(SubjobKind::NestedSuperjob(WorkerRef::new("n"))).worker().is_some());
        assert!(node(SubjobKind::Parallel).worker().is_none());
        assert!(node(SubjobKind::Batch).worker().is_none());
        assert!(node(SubjobKind::BatchChild).worker().is_none());
    }

    #[test]
    fn parallel_and_batch_do_not_chain_children() {
        assert!(SubjobKind::Sequential.chains_children());
        assert!(SubjobKind::Leaf(WorkerRef::new("w")).chains_children());
        assert!(!SubjobKind::Parallel.chains_children());
        assert!(!SubjobKind::Batch.chains_children());
        assert!(!SubjobKind::BatchChild.chains_children());
    }
}
