//! Ports - 抽象化レイヤー
//!
//! オーケストレーションコアが外部に求めるインターフェースを定義します。
//!
//! # 外部の協調者
//! - **SubjobStore**: 状態の正本（read / 条件付き更新）
//! - **QueueClient**: at-least-once のジョブキュー（push のみ）
//! - **SuperjobCoordinator**: superjob 単位の完了・失敗の通知先

pub mod subjob_store;
pub mod queue_client;
pub mod coordinator;
pub mod clock;
pub mod id_generator;

pub use self::subjob_store::{StoreError, SubjobStore};
pub use self::queue_client::{QueueClient, QueueError, UniqueOptions, Uniqueness};
pub use self::coordinator::{CoordinatorError, SuperjobCoordinator};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
