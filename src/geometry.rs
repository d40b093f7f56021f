use glam::{Vec2, Vec3};

const NEARLY_EQUAL_EPSILON: f32 = 128.0 * f32::EPSILON;

/// Relative float comparison that stays meaningful for both tiny and large magnitudes.
pub fn nearly_equal(a: f32, b: f32) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let norm = (a.abs() + b.abs()).min(f32::MAX);
    diff < f32::MIN_POSITIVE.max(NEARLY_EQUAL_EPSILON * norm)
}

pub fn nearly_greater_or_eq(a: f32, b: f32) -> bool {
    a > b || nearly_equal(a, b)
}

/// Axis-aligned cuboid overlap test; both volumes are given as center + full size.
pub fn cuboids_intersect(p1: Vec3, s1: Vec3, p2: Vec3, s2: Vec3) -> bool {
    let (h1, h2) = (s1 * 0.5, s2 * 0.5);
    nearly_greater_or_eq(p1.x + h1.x, p2.x - h2.x)
        && nearly_greater_or_eq(p2.x + h2.x, p1.x - h1.x)
        && nearly_greater_or_eq(p1.y + h1.y, p2.y - h2.y)
        && nearly_greater_or_eq(p2.y + h2.y, p1.y - h1.y)
        && nearly_greater_or_eq(p1.z + h1.z, p2.z - h2.z)
        && nearly_greater_or_eq(p2.z + h2.z, p1.z - h1.z)
}

/// Inclusive containment of `point` in the rectangle spanned by `min`..`max`.
pub fn rect_contains(min: Vec2, max: Vec2, point: Vec2) -> bool {
    point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
}

/// Projects a 3D position onto the horizontal (x, z) plane.
pub fn horizontal(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_tolerates_rounding() {
        assert!(nearly_equal(0.1 + 0.2, 0.3));
        assert!(!nearly_equal(1.0, 1.001));
        assert!(nearly_greater_or_eq(2.0, 2.0));
        assert!(!nearly_greater_or_eq(-1.0, 0.5));
    }

    #[test]
    fn touching_cuboids_intersect() {
        let size = Vec3::ONE;
        assert!(cuboids_intersect(Vec3::ZERO, size, Vec3::new(1.0, 0.0, 0.0), size));
        assert!(!cuboids_intersect(Vec3::ZERO, size, Vec3::new(1.5, 0.0, 0.0), size));
        assert!(!cuboids_intersect(Vec3::ZERO, size, Vec3::new(0.0, 0.0, -3.0), size));
    }

    #[test]
    fn rect_bounds_are_inclusive() {
        let (min, max) = (Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
        assert!(rect_contains(min, max, Vec2::new(1.0, -1.0)));
        assert!(!rect_contains(min, max, Vec2::new(1.01, 0.0)));
    }
}
