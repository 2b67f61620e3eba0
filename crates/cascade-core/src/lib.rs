//! cascade-core
//!
//! Orchestration core for superjobs: a tree of subjobs driven to completion
//! through an external queue.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, worker_ref, subjob, state, errors）
//! - **ports**: 抽象化レイヤー（SubjobStore, QueueClient, SuperjobCoordinator, IdGenerator）
//! - **app**: アプリケーションロジック（builder, orchestrator, runtime, worker_loop）
//! - **impls**: in-memory 実装（開発・テスト用）
//! - **config**: 環境変数からのワーカー設定
//! - **observability**: ツリーの状態集計

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
