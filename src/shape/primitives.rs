//! Line, circle, sphere and Bézier shapes.

use std::f64::consts::{PI, TAU};

use crate::core::vec3::Vec3;
use crate::error::{EffectError, Result};
use crate::shape::PointGenerator;

/// Evenly spaced points from `start` to `end`, both endpoints included.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    start: Vec3,
    end: Vec3,
    samples: u32,
}

impl Line {
    /// `samples` segments, so `samples + 1` points.
    pub fn new(start: Vec3, end: Vec3, samples: u32) -> Result<Self> {
        if samples == 0 {
            return Err(EffectError::invalid("line needs at least one segment"));
        }
        Ok(Self { start, end, samples })
    }
}

impl PointGenerator for Line {
    fn points(&self, _progress: f64, _seed: i64) -> Vec<Vec3> {
        (0..=self.samples)
            .map(|i| self.start.lerp(self.end, i as f64 / self.samples as f64))
            .collect()
    }
}

/// Ring in the XZ plane with `samples` points, no duplicate at the seam.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    radius: f64,
    samples: u32,
}

impl Circle {
    /// Create a circle.
    pub fn new(radius: f64, samples: u32) -> Result<Self> {
        if samples == 0 {
            return Err(EffectError::invalid("circle needs at least one sample"));
        }
        Ok(Self { radius, samples })
    }
}

impl PointGenerator for Circle {
    fn points(&self, _progress: f64, _seed: i64) -> Vec<Vec3> {
        (0..self.samples)
            .map(|i| {
                let a = TAU * i as f64 / self.samples as f64;
                Vec3::new(self.radius * a.cos(), 0.0, self.radius * a.sin())
            })
            .collect()
    }
}

/// Latitude rings of a sphere, poles excluded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    radius: f64,
    rings: u32,
    segments: u32,
}

impl Sphere {
    /// `(rings - 1) * segments` points.
    pub fn new(radius: f64, rings: u32, segments: u32) -> Result<Self> {
        if rings < 2 || segments == 0 {
            return Err(EffectError::invalid("sphere needs rings >= 2 and segments >= 1"));
        }
        Ok(Self { radius, rings, segments })
    }
}

impl PointGenerator for Sphere {
    fn points(&self, _progress: f64, _seed: i64) -> Vec<Vec3> {
        let mut out = Vec::with_capacity(((self.rings - 1) * self.segments) as usize);
        for r in 1..self.rings {
            let phi = PI * r as f64 / self.rings as f64;
            let y = self.radius * phi.cos();
            let ring_r = self.radius * phi.sin();
            for s in 0..self.segments {
                let a = TAU * s as f64 / self.segments as f64;
                out.push(Vec3::new(ring_r * a.cos(), y, ring_r * a.sin()));
            }
        }
        out
    }
}

/// Bézier curve of any degree, sampled with de Casteljau.
#[derive(Clone, Debug, PartialEq)]
pub struct Bezier {
    control: Vec<Vec3>,
    samples: u32,
}

impl Bezier {
    /// Fails on an empty control list or zero samples.
    pub fn new(control: Vec<Vec3>, samples: u32) -> Result<Self> {
        if control.is_empty() {
            return Err(EffectError::invalid("at least one control point is required"));
        }
        if samples == 0 {
            return Err(EffectError::invalid("bezier needs at least one segment"));
        }
        Ok(Self { control, samples })
    }

    /// Curve point at parameter `t`.
    pub fn eval(&self, t: f64) -> Vec3 {
        de_casteljau(&self.control, t)
    }
}

impl PointGenerator for Bezier {
    fn points(&self, _progress: f64, _seed: i64) -> Vec<Vec3> {
        (0..=self.samples)
            .map(|i| self.eval(i as f64 / self.samples as f64))
            .collect()
    }
}

fn de_casteljau(ctrl: &[Vec3], t: f64) -> Vec3 {
    let mut current = ctrl.to_vec();
    while current.len() > 1 {
        current = current.windows(2).map(|w| w[0].lerp(w[1], t)).collect();
    }
    current[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_endpoints() {
        let line = Line::new(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0), 4).unwrap();
        let pts = line.points(0.0, 0);
        assert_eq!(pts.len(), 5);
        assert_eq!(pts[0], Vec3::ZERO);
        assert_eq!(pts[4], Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(pts[1], Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_circle_count_and_radius() {
        let circle = Circle::new(2.0, 96).unwrap();
        let pts = circle.points(0.5, 1);
        assert_eq!(pts.len(), 96);
        for p in pts {
            assert!((p.length() - 2.0).abs() < 1e-9);
            assert_eq!(p.y, 0.0);
        }
    }

    #[test]
    fn test_sphere_count() {
        let sphere = Sphere::new(1.0, 4, 8).unwrap();
        let pts = sphere.points(0.0, 0);
        assert_eq!(pts.len(), 3 * 8);
        for p in pts {
            assert!((p.length() - 1.0).abs() < 1e-9);
        }
        assert!(Sphere::new(1.0, 1, 8).is_err());
    }

    #[test]
    fn test_bezier_empty_rejected() {
        let err = Bezier::new(Vec::new(), 10).unwrap_err();
        assert!(matches!(err, EffectError::InvalidArgument(_)));
    }

    #[test]
    fn test_bezier_single_point() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let curve = Bezier::new(vec![p], 3).unwrap();
        assert!(curve.points(0.0, 0).iter().all(|q| *q == p));
    }

    #[test]
    fn test_bezier_quadratic_midpoint() {
        let curve = Bezier::new(
            vec![Vec3::ZERO, Vec3::new(1.0, 2.0, 0.0), Vec3::new(2.0, 0.0, 0.0)],
            2,
        )
        .unwrap();
        let pts = curve.points(0.0, 0);
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[0], Vec3::ZERO);
        assert_eq!(pts[2], Vec3::new(2.0, 0.0, 0.0));
        assert!(pts[1].distance(Vec3::new(1.0, 1.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_shapes_are_deterministic() {
        let circle = Circle::new(1.5, 32).unwrap();
        assert_eq!(circle.points(0.3, 9), circle.points(0.3, 9));
    }
}
