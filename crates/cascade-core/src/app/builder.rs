//! TreeBuilder - superjob ツリーの組み立て
//!
//! # 学習ポイント
//! - 値としてのツリー記述（NodeSpec）と、id で参照し合う arena への変換
//! - 構築時検証（Fail-fast 設計）
//!
//! 生成されるノードはすべて `Initialized` です。
//! `next` は順次実行の親（Sequential / Leaf / NestedSuperjob）の子だけに張ります。
//! Batch のメンバーは必ず BatchChild で包み、孫をちょうど 1 つ持たせます。

use std::collections::HashMap;

use crate::domain::{Subjob, SubjobId, SubjobKind, SuperjobId, WorkerRef};
use crate::ports::IdGenerator;

/// BuildError はツリー構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("node name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("{0} nodes are pure composition and cannot carry args or meta")]
    PayloadOnComposite(&'static str),
}

#[derive(Debug, Clone)]
enum SpecKind {
    Leaf(WorkerRef),
    Sequential,
    Parallel,
    Batch,
    Nested(WorkerRef),
}

/// Declarative description of one node and its subtree.
///
/// # 使用例
/// ```ignore
/// let root = NodeSpec::sequential(vec![
///     NodeSpec::leaf("fetch").named("A"),
///     NodeSpec::parallel(vec![NodeSpec::leaf("resize"), NodeSpec::leaf("thumb")]),
///     NodeSpec::leaf("publish"),
/// ]);
/// ```
#[derive(Debug, Clone)]
pub struct NodeSpec {
    kind: SpecKind,
    name: Option<String>,
    args: serde_json::Value,
    meta: serde_json::Value,
    children: Vec<NodeSpec>,
}

impl NodeSpec {
    fn with_kind(kind: SpecKind, children: Vec<NodeSpec>) -> Self {
        Self {
            kind,
            name: None,
            args: serde_json::Value::Null,
            meta: serde_json::Value::Null,
            children,
        }
    }

    pub fn leaf(worker: impl Into<String>) -> Self {
        Self::with_kind(SpecKind::Leaf(WorkerRef::new(worker)), Vec::new())
    }

    pub fn sequential(children: Vec<NodeSpec>) -> Self {
        Self::with_kind(SpecKind::Sequential, children)
    }

    pub fn parallel(children: Vec<NodeSpec>) -> Self {
        Self::with_kind(SpecKind::Parallel, children)
    }

    /// Every member is wrapped in its own `BatchChild`.
    pub fn batch(members: Vec<NodeSpec>) -> Self {
        Self::with_kind(SpecKind::Batch, members)
    }

    pub fn nested(worker: impl Into<String>, children: Vec<NodeSpec>) -> Self {
        Self::with_kind(SpecKind::Nested(WorkerRef::new(worker)), children)
    }

    /// Sequential body run after this node completes.
    pub fn then(mut self, children: Vec<NodeSpec>) -> Self {
        self.children.extend(children);
        self
    }

    /// Label used to look the node up in the built tree.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn args(mut self, args: serde_json::Value) -> Self {
        self.args = args;
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// All nodes of one authored superjob.
#[derive(Debug, Clone)]
pub struct SuperjobTree {
    pub superjob_id: SuperjobId,
    pub root_id: SubjobId,
    pub nodes: Vec<Subjob>,
    names: HashMap<String, SubjobId>,
}

impl SuperjobTree {
    /// Id of a node labelled with `NodeSpec::named`.
    pub fn id_of(&self, name: &str) -> Option<SubjobId> {
        self.names.get(name).copied()
    }

    pub fn node(&self, id: SubjobId) -> Option<&Subjob> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// TreeBuilder は NodeSpec を Subjob の arena に変換
pub struct TreeBuilder<'a> {
    ids: &'a dyn IdGenerator,
    superjob_id: SuperjobId,
    nodes: Vec<Subjob>,
    index: HashMap<SubjobId, usize>,
    names: HashMap<String, SubjobId>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(ids: &'a dyn IdGenerator) -> Self {
        Self {
            ids,
            superjob_id: ids.generate_superjob_id(),
            nodes: Vec::new(),
            index: HashMap::new(),
            names: HashMap::new(),
        }
    }

    /// Build the tree rooted at `root`.
    pub fn build(mut self, root: NodeSpec) -> Result<SuperjobTree, BuildError> {
        let root_id = self.place(root, None)?;
        Ok(SuperjobTree {
            superjob_id: self.superjob_id,
            root_id,
            nodes: self.nodes,
            names: self.names,
        })
    }

    fn place(&mut self, spec: NodeSpec, parent: Option<SubjobId>) -> Result<SubjobId, BuildError> {
        let id = self.ids.generate_subjob_id();
        if let Some(name) = spec.name {
            if self.names.contains_key(&name) {
                return Err(BuildError::DuplicateName(name));
            }
            self.names.insert(name, id);
        }

        let kind = match spec.kind {
            SpecKind::Leaf(worker) => SubjobKind::Leaf(worker),
            SpecKind::Sequential => SubjobKind::Sequential,
            SpecKind::Parallel => SubjobKind::Parallel,
            SpecKind::Batch => SubjobKind::Batch,
            SpecKind::Nested(worker) => SubjobKind::NestedSuperjob(worker),
        };
        if kind.worker_less() && !(spec.args.is_null() && spec.meta.is_null()) {
            return Err(BuildError::PayloadOnComposite(kind.label()));
        }

        let mut children = Vec::with_capacity(spec.children.len());
        for child in spec.children {
            let child_id = if kind == SubjobKind::Batch {
                self.place_batch_child(child, id)?
            } else {
                self.place(child, Some(id))?
            };
            children.push(child_id);
        }

        if kind.chains_children() {
            for pair in children.windows(2) {
                let position = self.index[&pair[0]];
                self.nodes[position].next = Some(pair[1]);
            }
        }

        let mut node = Subjob::new(id, self.superjob_id, kind);
        node.parent_id = parent;
        node.children = children;
        node.args = spec.args;
        node.meta = spec.meta;
        self.push(node);
        Ok(id)
    }

    fn place_batch_child(&mut self, member: NodeSpec, batch: SubjobId) -> Result<SubjobId, BuildError> {
        let id = self.ids.generate_subjob_id();
        let grandchild = self.place(member, Some(id))?;

        let mut node = Subjob::new(id, self.superjob_id, SubjobKind::BatchChild);
        node.parent_id = Some(batch);
        node.children = vec![grandchild];
        self.push(node);
        Ok(id)
    }

    fn push(&mut self, node: Subjob) {
        self.index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }
}
