//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + Phantom type
//! すべての ID は ULID を包んだ `Id<T>` で表現します。
//! `T` は実行時には使わないマーカー型で、`SubjobId` と `JobId` を
//! 取り違えるとコンパイルエラーになります。
//!
//! - **SuperjobId**: 投入されたツリー全体
//! - **SubjobId**: ツリーの 1 ノード
//! - **JobId**: dispatch 時に Leaf に割り当てる外部キュー上の ID

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"subjob-", "job-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Superjob のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Superjob {}

impl IdMarker for Superjob {
    fn prefix() -> &'static str {
        "superjob-"
    }
}

/// Subjob のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subjob {}

impl IdMarker for Subjob {
    fn prefix() -> &'static str {
        "subjob-"
    }
}

/// 外部キュー上の Job のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn prefix() -> &'static str {
        "job-"
    }
}

// ========================================
// Type Alias
// ========================================

/// Identifier of a superjob (the whole submitted tree).
pub type SuperjobId = Id<Superjob>;

/// Identifier of one node of the tree.
pub type SubjobId = Id<Subjob>;

/// Identifier assigned to a leaf at dispatch time and handed to the queue.
pub type JobId = Id<Job>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();
        let ulid3 = Ulid::new();

        let superjob = SuperjobId::from_ulid(ulid1);
        let subjob = SubjobId::from_ulid(ulid2);
        let job = JobId::from_ulid(ulid3);

        assert_eq!(superjob.as_ulid(), ulid1);
        assert_eq!(subjob.as_ulid(), ulid2);
        assert_eq!(job.as_ulid(), ulid3);

        assert!(superjob.to_string().starts_with("superjob-"));
        assert!(subjob.to_string().starts_with("subjob-"));
        assert!(job.to_string().starts_with("job-"));

        // let _: JobId = subjob; // <- does not compile
    }

    #[test]
    fn ids_can_be_serialized() {
        let job_id = JobId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&job_id).unwrap();
        let deserialized: JobId = serde_json::from_str(&serialized).unwrap();

        assert_eq!(job_id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<SubjobId>(), size_of::<Ulid>());
        assert_eq!(size_of::<JobId>(), 16);
    }
}
