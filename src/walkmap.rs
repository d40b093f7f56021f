use crate::geometry::{horizontal, rect_contains};
use glam::{Vec2, Vec3};
use smallvec::SmallVec;
use std::fmt;

/// Index of a region inside the scene-wide walkmap arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionId(pub u32);

impl RegionId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type Adjacency = SmallVec<[RegionId; 4]>;

/// Horizontal floor footprint. `position.y` is the floor height used for eye placement.
#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub position: Vec3,
    pub size: Vec2,
    pub upper_left: Vec2,
    pub upper_right: Vec2,
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
    pub adjacent: Adjacency,
}

impl BoundingBox {
    pub fn new(position: Vec3, size: Vec2) -> Self {
        let half = size * 0.5;
        let (x, z) = (position.x, position.z);
        Self {
            position,
            size,
            upper_left: Vec2::new(x - half.x, z - half.y),
            upper_right: Vec2::new(x + half.x, z - half.y),
            bottom_left: Vec2::new(x - half.x, z + half.y),
            bottom_right: Vec2::new(x + half.x, z + half.y),
            adjacent: SmallVec::new(),
        }
    }

    pub fn min(&self) -> Vec2 {
        self.upper_left
    }

    pub fn max(&self) -> Vec2 {
        self.bottom_right
    }

    /// Horizontal anchor used for path-distance estimates.
    pub fn anchor(&self) -> Vec2 {
        horizontal(self.position)
    }

    pub fn contains(&self, point: Vec2) -> bool {
        rect_contains(self.min(), self.max(), point)
    }

    pub fn contains_position(&self, position: Vec3) -> bool {
        self.contains(horizontal(position))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Walkmap {
    regions: Vec<BoundingBox>,
}

impl Walkmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Offset applied to adjacency indices parsed from the next merged file.
    pub fn merge_offset(&self) -> u32 {
        self.regions.len() as u32
    }

    pub fn push(&mut self, region: BoundingBox) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(region);
        id
    }

    pub fn get(&self, id: RegionId) -> Option<&BoundingBox> {
        self.regions.get(id.index())
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (RegionId, &BoundingBox)> {
        self.regions.iter().enumerate().map(|(index, region)| (RegionId(index as u32), region))
    }

    pub fn find_containing(&self, position: Vec3) -> Option<RegionId> {
        self.iter().find(|(_, region)| region.contains_position(position)).map(|(id, _)| id)
    }

    /// Drops adjacency references that do not resolve to a region in this walkmap.
    /// Returns how many references were removed.
    pub fn prune_dangling(&mut self, from: RegionId) -> usize {
        let len = self.regions.len();
        let mut removed = 0;
        for (index, region) in self.regions.iter_mut().enumerate().skip(from.index()) {
            region.adjacent.retain(|adjacent| {
                let valid = adjacent.index() < len;
                if !valid {
                    log::warn!("[walkmap] region #{index} references missing region {adjacent}, dropping link");
                    removed += 1;
                }
                valid
            });
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_follow_center_and_size() {
        let region = BoundingBox::new(Vec3::new(2.0, 1.0, -4.0), Vec2::new(4.0, 2.0));
        assert_eq!(region.upper_left, Vec2::new(0.0, -5.0));
        assert_eq!(region.upper_right, Vec2::new(4.0, -5.0));
        assert_eq!(region.bottom_left, Vec2::new(0.0, -3.0));
        assert_eq!(region.bottom_right, Vec2::new(4.0, -3.0));
        assert!(region.contains(region.anchor()));
        assert!(region.contains(region.upper_right));
        assert!(!region.contains(Vec2::new(4.01, -4.0)));
    }

    #[test]
    fn zero_sized_region_contains_its_center() {
        let region = BoundingBox::new(Vec3::new(3.0, 0.0, 3.0), Vec2::ZERO);
        assert!(region.contains(region.anchor()));
    }

    #[test]
    fn prune_removes_only_dangling_links() {
        let mut walkmap = Walkmap::new();
        let mut first = BoundingBox::new(Vec3::ZERO, Vec2::splat(2.0));
        first.adjacent.push(RegionId(1));
        first.adjacent.push(RegionId(7));
        walkmap.push(first);
        walkmap.push(BoundingBox::new(Vec3::new(2.0, 0.0, 0.0), Vec2::splat(2.0)));

        assert_eq!(walkmap.prune_dangling(RegionId(0)), 1);
        let first = walkmap.get(RegionId(0)).expect("first region");
        assert_eq!(first.adjacent.as_slice(), &[RegionId(1)]);
    }
}
