//! Internal implementation details.

pub(crate) mod guarded;
pub(crate) mod map;

pub(crate) use guarded::guarded;
pub(crate) use map::FastMap;
