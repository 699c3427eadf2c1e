use eldergrove_world::SphereCull;
use glam::{Mat4, Vec3};

/// Plane in `normal . p + distance = 0` form, normal pointing inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    /// Signed offset from the origin.
    pub distance: f32,
}

impl Plane {
    /// Create a plane from an unnormalized normal and offset.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal, distance }
    }

    /// Signed distance; positive on the inside.
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    fn normalized(self) -> Self {
        let length = self.normal.length();
        if length > 0.0 {
            Self::new(self.normal / length, self.distance / length)
        } else {
            self
        }
    }
}

/// View frustum extracted from a view-projection matrix.
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract planes with the Gribb/Hartmann method.
    ///
    /// Clip depth is `[0, 1]` as in wgpu, so the near plane is the z row
    /// alone rather than `w + z`.
    pub fn from_matrix(view_proj: Mat4) -> Self {
        let rows = [
            view_proj.row(0),
            view_proj.row(1),
            view_proj.row(2),
            view_proj.row(3),
        ];
        let plane = |v: glam::Vec4| Plane::new(v.truncate(), v.w).normalized();

        Self {
            planes: [
                plane(rows[3] + rows[0]),
                plane(rows[3] - rows[0]),
                plane(rows[3] + rows[1]),
                plane(rows[3] - rows[1]),
                plane(rows[2]),
                plane(rows[3] - rows[2]),
            ],
        }
    }

    /// Whether any part of a sphere may be visible.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance_to_point(center) >= -radius)
    }

    /// Whether any part of an axis-aligned box may be visible.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        let center = (min + max) * 0.5;
        let extents = (max - min) * 0.5;

        self.planes.iter().all(|plane| {
            let positive_vertex = center
                + Vec3::new(
                    extents.x.copysign(plane.normal.x),
                    extents.y.copysign(plane.normal.y),
                    extents.z.copysign(plane.normal.z),
                );
            plane.distance_to_point(positive_vertex) >= 0.0
        })
    }
}

impl SphereCull for Frustum {
    fn sphere_visible(&self, center: Vec3, radius: f32) -> bool {
        self.intersects_sphere(center, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looking_along_x() -> Frustum {
        let eye = Vec3::new(0.0, 10.0, 0.0);
        let view = Mat4::look_at_rh(eye, eye + Vec3::X, Vec3::Y);
        let proj = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 0.1, 1000.0);
        Frustum::from_matrix(proj * view)
    }

    #[test]
    fn planes_are_normalized() {
        for plane in looking_along_x().planes {
            assert!((plane.normal.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn sphere_in_front_is_visible() {
        let frustum = looking_along_x();
        assert!(frustum.intersects_sphere(Vec3::new(50.0, 10.0, 0.0), 1.0));
        assert!(frustum.sphere_visible(Vec3::new(50.0, 10.0, 0.0), 1.0));
    }

    #[test]
    fn sphere_behind_or_beyond_far_is_culled() {
        let frustum = looking_along_x();
        assert!(!frustum.intersects_sphere(Vec3::new(-50.0, 10.0, 0.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(1500.0, 10.0, 0.0), 1.0));
        assert!(!frustum.intersects_sphere(Vec3::new(50.0, 10.0, 400.0), 5.0));
    }

    #[test]
    fn large_sphere_straddling_the_camera_is_visible() {
        let frustum = looking_along_x();
        assert!(frustum.intersects_sphere(Vec3::new(-20.0, 10.0, 0.0), 44.8));
    }

    #[test]
    fn aabb_tests_match_sphere_intuition() {
        let frustum = looking_along_x();
        assert!(frustum.intersects_aabb(Vec3::new(40.0, 0.0, -5.0), Vec3::new(60.0, 20.0, 5.0)));
        assert!(!frustum.intersects_aabb(
            Vec3::new(-60.0, 0.0, -5.0),
            Vec3::new(-40.0, 20.0, 5.0)
        ));
    }
}
