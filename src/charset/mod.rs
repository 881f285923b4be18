//! Character-set mapping engine: binds a configurable ordered set of
//! characters to chord bitmaps.

pub mod cache;
pub mod registry;
pub mod values;

pub use cache::{CharPair, CharSetCache, CharSetEntry};
pub use registry::{CharSetKind, CharSetRegistry};
