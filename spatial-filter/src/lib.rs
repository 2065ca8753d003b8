// Common modules

mod envelope;
mod error;
mod extension;
mod filter;
mod geometry;
mod index;

pub use envelope::{Envelope, EnvelopeEncoder, DEFAULT_BITS_PER_VALUE};
pub use error::FilterError;
pub use extension::{
    FilterExtension, FilterFlags, FilterSituation, ObjectRef, ObjectType, Repository,
    FILTER_EXTENSION_SPATIAL,
};
pub use filter::{FilterContext, MatchResult};
pub use geometry::{cyclic_range_overlaps, range_overlaps};
pub use index::{EnvelopeIndex, IndexOpenError, INDEX_FILENAME};
