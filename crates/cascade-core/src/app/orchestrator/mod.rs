//! Orchestrator - dispatch / completion の状態機械
//!
//! ツリーの各ノードを「いつ・どうやってキューに渡すか」と、
//! 完了時に「次にどのノードを進めるか」を決めます。
//!
//! # 構成
//! - **claim**: 原子的な状態遷移（重複 dispatch の防止）
//! - **dispatch**: ノードの種類ごとの投入方法
//! - **cascade**: 完了の伝播と次ノードの起動
//! - **failure**: 失敗したブランチの終端処理
//!
//! # 設計原則
//! - 判断に使う状態は毎回 SubjobStore から読み直す
//! - 「1 人だけが先に進む」判断はすべて claim で行う
//! - dispatch / complete は互いに再帰するので、Send な BoxFuture を返す

mod cascade;
mod claim;
mod dispatch;
mod failure;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::ports::{IdGenerator, QueueClient, SubjobStore, SuperjobCoordinator};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Drives a superjob tree through its external collaborators.
///
/// Holds no state of its own; every decision is made against the store.
/// Cheap to share across workers behind an `Arc`.
pub struct Orchestrator {
    store: Arc<dyn SubjobStore>,
    queue: Arc<dyn QueueClient>,
    coordinator: Arc<dyn SuperjobCoordinator>,
    ids: Arc<dyn IdGenerator>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn SubjobStore>,
        queue: Arc<dyn QueueClient>,
        coordinator: Arc<dyn SuperjobCoordinator>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store,
            queue,
            coordinator,
            ids,
        }
    }
}
