//! Jobs run by the hotfeed daemon.

pub mod hotness;
