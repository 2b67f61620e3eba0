//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の in-memory 実装を含めます。
//!
//! # 含まれる実装
//! - **InMemorySubjobStore**: 単一 Mutex で線形化された正本
//! - **InMemoryQueueClient**: pop 付きの配送キュー（unique 設定あり）
//! - **RecordingCoordinator**: superjob の結果を記録するだけ
//!
//! 本番用の実装（DB の行ロック、実キュー）は別クレートに配置します。

pub mod inmem_store;
pub mod inmem_queue;
pub mod recording_coordinator;

pub use self::inmem_store::InMemorySubjobStore;
pub use self::inmem_queue::{InMemoryQueueClient, QueuedJob};
pub use self::recording_coordinator::{FailureReport, RecordingCoordinator};
