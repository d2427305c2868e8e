use glam::Vec3;
use std::fmt;

/// Axis-aligned bounding box in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Build the tightest box around a set of points.
    /// Returns `None` for an empty set or when any point is not finite.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        if !first.is_finite() {
            return None;
        }

        let mut bounds = Self::new(first, first);
        for p in iter {
            if !p.is_finite() {
                return None;
            }
            bounds.min = bounds.min.min(p);
            bounds.max = bounds.max.max(p);
        }
        Some(bounds)
    }

    /// Extent along the Y (up) axis
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Eight corners, used when a box is pushed through a transform
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

impl fmt::Display for Aabb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_points() {
        let bounds = Aabb::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, 2.0),
        ])
        .unwrap();

        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 2.0));
        assert_eq!(bounds.height(), 5.0);
    }

    #[test]
    fn test_empty_and_non_finite() {
        assert!(Aabb::from_points(std::iter::empty()).is_none());
        assert!(Aabb::from_points([Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)]).is_none());
    }

    #[test]
    fn test_corners_span_box() {
        let bounds = Aabb::new(Vec3::new(-1.0, 0.0, -2.0), Vec3::new(1.0, 4.0, 2.0));
        let rebuilt = Aabb::from_points(bounds.corners()).unwrap();
        assert_eq!(rebuilt, bounds);
        assert_eq!(bounds.to_string(), "[-1.000, 0.000, -2.000] .. [1.000, 4.000, 2.000]");
    }
}
