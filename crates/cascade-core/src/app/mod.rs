//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **TreeBuilder**: NodeSpec から subjob ツリーを組み立てる
//! - **Orchestrator**: claim / dispatch / completion cascade / failure
//! - **Runtime**: worker 名 → handler の実行
//! - **WorkerGroup**: ジョブ実行ループ（pop→start→handle→complete/fail）

pub mod builder;
pub mod orchestrator;
pub mod runtime;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, NodeSpec, SuperjobTree, TreeBuilder};
pub use self::orchestrator::{BoxFuture, Orchestrator};
pub use self::runtime::{HandlerRegistry, JobHandler, Runtime, RuntimeError};
pub use self::worker_loop::WorkerGroup;
