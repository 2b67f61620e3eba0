//! Domain model (ids, worker references, subjob tree nodes, status, errors).

pub mod errors;
pub mod ids;
pub mod state;
pub mod subjob;
pub mod worker_ref;

pub use self::errors::CascadeError;
pub use self::ids::{JobId, SubjobId, SuperjobId};
pub use self::state::SubjobStatus;
pub use self::subjob::{Subjob, SubjobKind};
pub use self::worker_ref::WorkerRef;
