//! Field data attached to mesh entities.

pub mod tag;

pub use tag::{ScalarKind, Tag, TagData};
