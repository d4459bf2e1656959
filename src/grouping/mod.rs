//! Clustering of extracted segments.
//!
//! - [`union_find`]: a disjoint-set forest over string keys
//! - [`groups`]: reference-overlap grouping and singleton suppression built on it

pub mod groups;
pub mod union_find;
