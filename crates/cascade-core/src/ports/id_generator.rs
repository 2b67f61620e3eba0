//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{JobId, SubjobId, SuperjobId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は分散システムで使える ID を生成
///
/// dispatch 時の `JobId` は外部キューに渡す前に生成されるため、
/// どのプロセスでも調整なしに一意な値を作れる必要があります。
pub trait IdGenerator: Send + Sync {
    fn generate_superjob_id(&self) -> SuperjobId;

    fn generate_subjob_id(&self) -> SubjobId;

    fn generate_job_id(&self) -> JobId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_superjob_id(&self) -> SuperjobId {
        SuperjobId::from(self.next_ulid())
    }

    fn generate_subjob_id(&self) -> SubjobId {
        SubjobId::from(self.next_ulid())
    }

    fn generate_job_id(&self) -> JobId {
        JobId::from(self.next_ulid())
    }
}
