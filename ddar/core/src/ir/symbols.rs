//! Symbol interning for points and identifiers for derived objects
//!
//! Points are the only named objects of a construction. Lines and circles
//! are created by the symbol graph as the proof progresses, so they only get
//! numeric identifiers.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for point identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u32);

impl PointId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Newtype wrapper for line node identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub u32);

/// Newtype wrapper for circle node identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CircleId(pub u32);

/// Unordered pair of points, the key of a length variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Segment(PointId, PointId);

impl Segment {
    pub fn new(a: PointId, b: PointId) -> Self {
        if a <= b {
            Segment(a, b)
        } else {
            Segment(b, a)
        }
    }

    pub fn endpoints(&self) -> (PointId, PointId) {
        (self.0, self.1)
    }
}

/// Interning table between point labels and point identifiers
///
/// Each unique label maps to exactly one ID; IDs are dense and allocated in
/// construction order, so they double as indexes into coordinate storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    point_map: FxHashMap<String, PointId>,
    point_labels: Vec<String>,
}

impl SymbolTable {
    /// Create a new empty symbol table
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a point label, returning its ID (creates new ID if label not seen before)
    pub fn get_or_intern_point(&mut self, label: &str) -> PointId {
        if let Some(&id) = self.point_map.get(label) {
            return id;
        }
        let id = PointId(self.point_labels.len() as u32);
        self.point_map.insert(label.to_string(), id);
        self.point_labels.push(label.to_string());
        id
    }

    /// Look up a point without interning it
    pub fn point_id(&self, label: &str) -> Option<PointId> {
        self.point_map.get(label).copied()
    }

    /// Get the label for a point ID
    pub fn point_label(&self, id: PointId) -> Option<&str> {
        self.point_labels.get(id.index()).map(|s| s.as_str())
    }

    /// Label for display, falling back to the raw id
    pub fn display_point(&self, id: PointId) -> String {
        self.point_label(id)
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    /// Get the number of interned points
    pub fn num_points(&self) -> usize {
        self.point_labels.len()
    }

    /// All point IDs in interning order
    pub fn points(&self) -> impl Iterator<Item = PointId> + '_ {
        (0..self.point_labels.len() as u32).map(PointId)
    }
}
