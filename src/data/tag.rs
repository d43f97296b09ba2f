//! Named, fixed-width field arrays attached to every entity of one dimension.

use serde::{Deserialize, Serialize};

/// Scalar kind stored by a tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ScalarKind {
    I8,
    I32,
    I64,
    F64,
}

impl ScalarKind {
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::I8 => "i8",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::F64 => "f64",
        }
    }
}

/// Backing array of a tag, one variant per scalar kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TagData {
    I8(Vec<i8>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    F64(Vec<f64>),
}

impl TagData {
    pub fn kind(&self) -> ScalarKind {
        match self {
            TagData::I8(_) => ScalarKind::I8,
            TagData::I32(_) => ScalarKind::I32,
            TagData::I64(_) => ScalarKind::I64,
            TagData::F64(_) => ScalarKind::F64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TagData::I8(v) => v.len(),
            TagData::I32(v) => v.len(),
            TagData::I64(v) => v.len(),
            TagData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    name: String,
    ncomps: usize,
    data: TagData,
}

impl Tag {
    pub(crate) fn new(name: impl Into<String>, ncomps: usize, data: TagData) -> Self {
        Self {
            name: name.into(),
            ncomps,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Components per entity.
    pub fn ncomps(&self) -> usize {
        self.ncomps
    }

    pub fn kind(&self) -> ScalarKind {
        self.data.kind()
    }

    pub fn data(&self) -> &TagData {
        &self.data
    }
}
