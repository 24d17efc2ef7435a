pub mod arena;
pub mod augment;
pub mod avl;
pub mod comparator;
pub mod error;
pub mod link;
pub mod rb;

pub use arena::{Arena, SENTINEL};
pub use augment::{IntervalUpdater, MetadataUpdater, NoopUpdater, OrderStatisticUpdater};
pub use avl::map::AvlMap;
pub use comparator::{Comparator, DefaultComparator};
pub use error::{InvariantResult, InvariantViolation};
pub use rb::map::RbMap;
