//! Triangle meshes with Möller-Trumbore ray intersection.

use glam::DVec3;

use super::{Aabb, Ray, Surface};
use crate::geodesy::LocalFrame;

/// Crossings closer than this to the origin count as "at the origin".
const SURFACE_TOLERANCE_M: f64 = 1e-6;

/// Crossings closer together than this are the same crossing (shared edges
/// and vertices are hit by every adjacent triangle).
const MERGE_TOLERANCE_M: f64 = 1e-6;

/// Barycentric slack so that rays through shared edges are never lost.
const BARYCENTRIC_EPSILON: f64 = 1e-9;

/// A single triangle in the Earth-fixed frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: DVec3,
    pub b: DVec3,
    pub c: DVec3,
}

impl Triangle {
    pub fn new(a: DVec3, b: DVec3, c: DVec3) -> Self {
        Self { a, b, c }
    }

    /// Signed distance along the ray to the triangle's plane crossing, if the
    /// crossing lies inside the triangle. Winding is ignored.
    fn intersect(&self, origin: DVec3, dir: DVec3) -> Option<f64> {
        let e1 = self.b - self.a;
        let e2 = self.c - self.a;
        let p = dir.cross(e2);
        let det = e1.dot(p);

        // Parallel (or degenerate triangle)
        if det.abs() <= 1e-12 * e1.length() * e2.length() {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = origin - self.a;
        let u = s.dot(p) * inv_det;
        if !(-BARYCENTRIC_EPSILON..=1.0 + BARYCENTRIC_EPSILON).contains(&u) {
            return None;
        }

        let q = s.cross(e1);
        let v = dir.dot(q) * inv_det;
        if v < -BARYCENTRIC_EPSILON || u + v > 1.0 + BARYCENTRIC_EPSILON {
            return None;
        }

        Some(e2.dot(q) * inv_det)
    }
}

/// A triangle mesh.
///
/// A *closed* mesh is treated as a solid: a ray whose origin lies inside it
/// reports a hit at distance zero, decided by crossing parity along the ray.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    triangles: Vec<Triangle>,
    closed: bool,
    bounds: Aabb,
}

impl TriangleMesh {
    /// Build a mesh. Returns `None` for an empty triangle list.
    pub fn new(triangles: Vec<Triangle>, closed: bool) -> Option<Self> {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| [t.a, t.b, t.c]))?;
        Some(Self {
            triangles,
            closed,
            bounds,
        })
    }

    /// Closed box spanning `min..max` in the local east/north/up frame.
    ///
    /// This is how box-shaped structures (buildings, masts) are placed
    /// around a geodetic anchor.
    pub fn cuboid(frame: &LocalFrame, min: DVec3, max: DVec3) -> Self {
        let lo = min.min(max);
        let hi = min.max(max);
        let corner = |i: usize| {
            frame.to_world(DVec3::new(
                if i & 1 != 0 { hi.x } else { lo.x },
                if i & 2 != 0 { hi.y } else { lo.y },
                if i & 4 != 0 { hi.z } else { lo.z },
            ))
        };
        let corners: Vec<DVec3> = (0..8).map(corner).collect();

        const FACES: [[usize; 4]; 6] = [
            [0, 2, 6, 4], // west
            [1, 3, 7, 5], // east
            [0, 1, 5, 4], // south
            [2, 3, 7, 6], // north
            [0, 1, 3, 2], // bottom
            [4, 5, 7, 6], // top
        ];

        let triangles = FACES
            .iter()
            .flat_map(|[a, b, c, d]| {
                [
                    Triangle::new(corners[*a], corners[*b], corners[*c]),
                    Triangle::new(corners[*a], corners[*c], corners[*d]),
                ]
            })
            .collect::<Vec<_>>();

        let bounds = Aabb::from_points(corners.iter().copied())
            .unwrap_or(Aabb {
                min: corners[0],
                max: corners[0],
            });

        Self {
            triangles,
            closed: true,
            bounds,
        }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// All distinct forward crossings along `ray`, ascending.
    fn crossings(&self, ray: &Ray) -> Vec<f64> {
        let origin = ray.origin_vec();
        let dir = ray.direction();

        let mut hits: Vec<f64> = self
            .triangles
            .iter()
            .filter_map(|t| t.intersect(origin, dir))
            .filter(|t| *t >= -SURFACE_TOLERANCE_M)
            .map(|t| t.max(0.0))
            .collect();

        hits.sort_by(f64::total_cmp);
        hits.dedup_by(|later, earlier| (*later - *earlier).abs() <= MERGE_TOLERANCE_M);
        hits
    }
}

impl Surface for TriangleMesh {
    fn intersect(&self, ray: &Ray) -> Option<f64> {
        if !self.bounds.intersects(ray) {
            return None;
        }

        let crossings = self.crossings(ray);
        let nearest = *crossings.first()?;

        if self.closed && crossings.len() % 2 == 1 {
            // Odd number of exits: the origin is inside the solid.
            return Some(0.0);
        }
        Some(nearest)
    }

    fn bounds(&self) -> Option<Aabb> {
        Some(self.bounds)
    }
}
