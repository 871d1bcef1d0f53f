//! Line-oriented persistence for studio caches, training sets and models
//!
//! Every store is read and rewritten wholesale by a single writer. Writes go
//! to a temp file that is renamed over the target.

mod cache;
mod codec;
mod model;
mod training;

pub use cache::{CacheRecord, LocalCache};
pub use codec::{
    escape_field, frame_array, lines_preserving_malformed, parse_array, read_records,
    write_lines_atomic, LineRecord, LoadedRecords,
};
pub use model::{ModelArtifact, ModelStore};
pub use training::{MergeStats, TrainingSet};
