//! # Room Templates
//!
//! A template is a named footprint of cells in template-local coordinates
//! with `(0, 0)` as the anchor, plus selection metadata: which room types may
//! use it, a sampling weight, an optional difficulty band, a door-edge
//! policy, and interior features.
//!
//! All footprint invariants are enforced at construction so later stages can
//! trust every template they see.

use crate::grid::{BoundingBox, Cell, Edge};
use crate::rooms::RoomKind;
use crate::{WarrenError, WarrenResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Kinds of interior features a template may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    Pillar,
    Wall,
    Hazard,
    Decorative,
}

/// Which corner of a rectangle an L-shape cut removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Strategy describing which exterior edges of a template may host doors.
///
/// An exterior edge of a cell is one whose neighbor is not part of the
/// footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorPolicy {
    /// Every exterior edge is a valid door site. The default.
    AllExteriorEdges,
    /// Only exterior edges facing one of the listed directions.
    Sides(Vec<Edge>),
    /// Explicit interior-cell/edge pairs. Each pair must name an exterior
    /// edge of the footprint.
    Explicit(Vec<(Cell, Edge)>),
}

/// A named room footprint plus selection metadata.
///
/// # Examples
///
/// ```
/// use warren::{RoomTemplate, RoomType};
///
/// let template = RoomTemplate::rectangle("combat_3x3", 3, 3)
///     .unwrap()
///     .for_room_types([RoomType::Combat])
///     .with_weight(2.0)
///     .unwrap();
/// assert_eq!(template.cells().len(), 9);
/// assert!(template.allows_room_type(&RoomType::Combat));
/// ```
#[derive(Debug, Clone)]
pub struct RoomTemplate<T: RoomKind> {
    id: String,
    valid_room_types: BTreeSet<T>,
    weight: f64,
    width: i32,
    height: i32,
    cells: BTreeSet<Cell>,
    door_policy: DoorPolicy,
    interior_features: BTreeMap<Cell, FeatureKind>,
    difficulty_bounds: Option<(f64, f64)>,
}

impl<T: RoomKind> RoomTemplate<T> {
    fn from_footprint(id: &str, cells: BTreeSet<Cell>) -> WarrenResult<Self> {
        if id.is_empty() {
            return Err(WarrenError::InvalidConfiguration(
                "template: id must be non-empty".to_string(),
            ));
        }
        if cells.is_empty() {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {id:?}: footprint must contain at least one cell"
            )));
        }
        let bb = BoundingBox::of(cells.iter().copied()).expect("footprint is non-empty");
        Ok(Self {
            id: id.to_string(),
            valid_room_types: BTreeSet::new(),
            weight: 1.0,
            width: bb.width(),
            height: bb.height(),
            cells,
            door_policy: DoorPolicy::AllExteriorEdges,
            interior_features: BTreeMap::new(),
            difficulty_bounds: None,
        })
    }

    /// Creates a solid `width` x `height` rectangle template.
    pub fn rectangle(id: &str, width: i32, height: i32) -> WarrenResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {id:?}: rectangle extents must be positive, got {width}x{height}"
            )));
        }
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
            .collect();
        Self::from_footprint(id, cells)
    }

    /// Creates an L-shaped template: a `width` x `height` rectangle with a
    /// `cut_width` x `cut_height` rectangle removed from the chosen corner.
    pub fn l_shape(
        id: &str,
        width: i32,
        height: i32,
        cut_width: i32,
        cut_height: i32,
        corner: Corner,
    ) -> WarrenResult<Self> {
        if width <= 0 || height <= 0 {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {id:?}: L-shape extents must be positive, got {width}x{height}"
            )));
        }
        if cut_width <= 0 || cut_height <= 0 || cut_width >= width || cut_height >= height {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {id:?}: L-shape cut {cut_width}x{cut_height} must be smaller than \
                 the rectangle {width}x{height}"
            )));
        }
        let in_cut = |x: i32, y: i32| match corner {
            Corner::TopLeft => x < cut_width && y < cut_height,
            Corner::TopRight => x >= width - cut_width && y < cut_height,
            Corner::BottomLeft => x < cut_width && y >= height - cut_height,
            Corner::BottomRight => x >= width - cut_width && y >= height - cut_height,
        };
        let cells = (0..height)
            .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
            .filter(|c| !in_cut(c.x, c.y))
            .collect();
        Self::from_footprint(id, cells)
    }

    /// Creates a template from an explicit cell set.
    pub fn from_cells(id: &str, cells: impl IntoIterator<Item = Cell>) -> WarrenResult<Self> {
        Self::from_footprint(id, cells.into_iter().collect())
    }

    /// Restricts the template to the given room types.
    pub fn for_room_types(mut self, types: impl IntoIterator<Item = T>) -> Self {
        self.valid_room_types = types.into_iter().collect();
        self
    }

    /// Sets the sampling weight. Zero means "never select"; negative weights
    /// are rejected.
    pub fn with_weight(mut self, weight: f64) -> WarrenResult<Self> {
        if weight < 0.0 || !weight.is_finite() {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {:?}: weight must be finite and >= 0, got {weight}",
                self.id
            )));
        }
        self.weight = weight;
        Ok(self)
    }

    /// Restricts the template to nodes whose difficulty lies in `[min, max]`.
    pub fn with_difficulty_bounds(mut self, min: f64, max: f64) -> WarrenResult<Self> {
        if min > max {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {:?}: difficulty bounds inverted ({min} > {max})",
                self.id
            )));
        }
        self.difficulty_bounds = Some((min, max));
        Ok(self)
    }

    /// Sets the door-edge policy.
    pub fn with_door_policy(mut self, policy: DoorPolicy) -> WarrenResult<Self> {
        if let DoorPolicy::Explicit(sites) = &policy {
            for (cell, edge) in sites {
                if !self.is_exterior_edge(*cell, *edge) {
                    return Err(WarrenError::InvalidConfiguration(format!(
                        "template {:?}: door site {cell} / {edge:?} is not an exterior edge",
                        self.id
                    )));
                }
            }
        }
        self.door_policy = policy;
        Ok(self)
    }

    /// Adds an interior feature.
    ///
    /// The cell must belong to the footprint and must not touch any exterior
    /// edge.
    pub fn with_feature(mut self, cell: Cell, kind: FeatureKind) -> WarrenResult<Self> {
        if !self.cells.contains(&cell) {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {:?}: feature at {cell} lies outside the footprint",
                self.id
            )));
        }
        if Edge::all().iter().any(|&e| self.is_exterior_edge(cell, e)) {
            return Err(WarrenError::InvalidConfiguration(format!(
                "template {:?}: feature at {cell} lies on an exterior edge",
                self.id
            )));
        }
        self.interior_features.insert(cell, kind);
        Ok(self)
    }

    /// Template id, unique within a config.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sampling weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Bounding-box width of the footprint.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Bounding-box height of the footprint.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// The footprint in template-local coordinates.
    pub fn cells(&self) -> &BTreeSet<Cell> {
        &self.cells
    }

    /// Interior features keyed by local cell.
    pub fn interior_features(&self) -> &BTreeMap<Cell, FeatureKind> {
        &self.interior_features
    }

    /// Optional difficulty band.
    pub fn difficulty_bounds(&self) -> Option<(f64, f64)> {
        self.difficulty_bounds
    }

    /// Room types this template may be used for.
    pub fn valid_room_types(&self) -> &BTreeSet<T> {
        &self.valid_room_types
    }

    /// Checks whether the template may be used for the given room type.
    pub fn allows_room_type(&self, room_type: &T) -> bool {
        self.valid_room_types.contains(room_type)
    }

    /// Checks whether a node difficulty falls inside the template's band.
    pub fn allows_difficulty(&self, difficulty: f64) -> bool {
        match self.difficulty_bounds {
            Some((min, max)) => difficulty >= min && difficulty <= max,
            None => true,
        }
    }

    /// True when the neighbor of `cell` across `edge` is outside the
    /// footprint.
    pub fn is_exterior_edge(&self, cell: Cell, edge: Edge) -> bool {
        self.cells.contains(&cell) && !self.cells.contains(&cell.neighbor(edge))
    }

    /// Door sites permitted by the door policy, as `(interior cell, edge)`
    /// pairs in template-local coordinates, in footprint order.
    pub fn door_sites(&self) -> Vec<(Cell, Edge)> {
        match &self.door_policy {
            DoorPolicy::Explicit(sites) => sites.clone(),
            DoorPolicy::AllExteriorEdges => self.exterior_sites(&Edge::all()),
            DoorPolicy::Sides(edges) => self.exterior_sites(edges),
        }
    }

    fn exterior_sites(&self, edges: &[Edge]) -> Vec<(Cell, Edge)> {
        let mut sites = Vec::new();
        for &cell in &self.cells {
            for &edge in edges {
                if self.is_exterior_edge(cell, edge) {
                    sites.push((cell, edge));
                }
            }
        }
        sites
    }

    /// The footprint translated to world coordinates for the given anchor.
    pub fn world_cells(&self, anchor: Cell) -> Vec<Cell> {
        self.cells.iter().map(|&c| anchor + c).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rooms::RoomType;

    #[test]
    fn test_rectangle_footprint() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 3, 2).unwrap();
        assert_eq!(t.cells().len(), 6);
        assert_eq!(t.width(), 3);
        assert_eq!(t.height(), 2);
        assert!(t.cells().contains(&Cell::new(2, 1)));
        assert!(!t.cells().contains(&Cell::new(3, 0)));
    }

    #[test]
    fn test_l_shape_footprint() {
        let t = RoomTemplate::<RoomType>::l_shape("l", 4, 4, 2, 2, Corner::TopRight).unwrap();
        assert_eq!(t.cells().len(), 12);
        assert!(!t.cells().contains(&Cell::new(3, 0)));
        assert!(!t.cells().contains(&Cell::new(2, 1)));
        assert!(t.cells().contains(&Cell::new(1, 0)));
        assert!(t.cells().contains(&Cell::new(3, 2)));
    }

    #[test]
    fn test_l_shape_cut_must_be_smaller() {
        assert!(RoomTemplate::<RoomType>::l_shape("l", 3, 3, 3, 1, Corner::TopLeft).is_err());
        assert!(RoomTemplate::<RoomType>::l_shape("l", 3, 3, 0, 1, Corner::TopLeft).is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        assert!(RoomTemplate::<RoomType>::rectangle("", 3, 3).is_err());
    }

    #[test]
    fn test_negative_weight_rejected() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 3, 3).unwrap();
        assert!(t.clone().with_weight(-0.5).is_err());
        assert!(t.with_weight(0.0).is_ok());
    }

    #[test]
    fn test_feature_validation() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 3, 3).unwrap();
        // Center cell of a 3x3 is the only non-exterior cell.
        assert!(t
            .clone()
            .with_feature(Cell::new(1, 1), FeatureKind::Pillar)
            .is_ok());
        assert!(t
            .clone()
            .with_feature(Cell::new(0, 0), FeatureKind::Pillar)
            .is_err());
        assert!(t
            .with_feature(Cell::new(5, 5), FeatureKind::Hazard)
            .is_err());
    }

    #[test]
    fn test_door_sites_all_exterior() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 2, 2).unwrap();
        // Every cell of a 2x2 exposes two exterior edges.
        assert_eq!(t.door_sites().len(), 8);
    }

    #[test]
    fn test_door_sites_sides() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 3, 2)
            .unwrap()
            .with_door_policy(DoorPolicy::Sides(vec![Edge::North]))
            .unwrap();
        let sites = t.door_sites();
        assert_eq!(sites.len(), 3);
        assert!(sites.iter().all(|&(c, e)| e == Edge::North && c.y == 0));
    }

    #[test]
    fn test_explicit_door_sites_validated() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 3, 3).unwrap();
        assert!(t
            .clone()
            .with_door_policy(DoorPolicy::Explicit(vec![(Cell::new(0, 0), Edge::North)]))
            .is_ok());
        // Interior edge: (1,1) has all four neighbors inside the footprint.
        assert!(t
            .with_door_policy(DoorPolicy::Explicit(vec![(Cell::new(1, 1), Edge::North)]))
            .is_err());
    }

    #[test]
    fn test_world_cells() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 2, 1).unwrap();
        let world = t.world_cells(Cell::new(10, -3));
        assert_eq!(world, vec![Cell::new(10, -3), Cell::new(11, -3)]);
    }

    #[test]
    fn test_difficulty_band() {
        let t = RoomTemplate::<RoomType>::rectangle("r", 2, 2)
            .unwrap()
            .with_difficulty_bounds(2.0, 5.0)
            .unwrap();
        assert!(!t.allows_difficulty(1.0));
        assert!(t.allows_difficulty(2.0));
        assert!(t.allows_difficulty(5.0));
        assert!(!t.allows_difficulty(5.1));
    }
}
