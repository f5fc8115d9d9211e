//! Seeded Random Source for Shapes
//!
//! Xorshift128+ seeded through SplitMix64. Shape generators must be
//! restartable, so every call builds a fresh generator from `(seed, progress)`
//! instead of keeping one alive between ticks.

use super::vec3::Vec3;

/// Xorshift128+ generator.
///
/// Given the same seed it produces the same sequence on every platform.
#[derive(Clone, Debug)]
pub struct ShapeRng {
    state: [u64; 2],
}

impl ShapeRng {
    /// Create a generator from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // All-zero state would be stuck at zero forever
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generator for one evaluation of a shape at `progress`.
    ///
    /// Progress is folded in bitwise, so the same `(seed, progress)` pair
    /// always yields the same stream.
    pub fn for_sample(seed: i64, progress: f64) -> Self {
        Self::new((seed as u64) ^ progress.to_bits().rotate_left(17))
    }

    /// Next 64-bit value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Uniform value in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // 53 high bits fill the mantissa exactly
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in [min, max).
    #[inline]
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            return min;
        }
        min + (max - min) * self.next_f64()
    }

    /// Uniform point inside a sphere of `radius` (rejection sampling).
    pub fn point_in_sphere(&mut self, radius: f64) -> Vec3 {
        loop {
            let p = Vec3::new(
                self.next_range(-1.0, 1.0),
                self.next_range(-1.0, 1.0),
                self.next_range(-1.0, 1.0),
            );
            if p.length_squared() <= 1.0 {
                return p.scale(radius);
            }
        }
    }
}

/// SplitMix64 for seed initialization.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_known_values() {
        // Must never change: seeded shapes would shift under existing effects
        let mut rng = ShapeRng::new(42);
        assert_eq!(rng.next_u64(), 16629283624882167704);
        assert_eq!(rng.next_u64(), 1420492921613871959);
        assert_eq!(rng.next_u64(), 9768315062676884790);
    }

    #[test]
    fn test_for_sample_restartable() {
        let a: Vec<u64> = {
            let mut r = ShapeRng::for_sample(7, 0.25);
            (0..16).map(|_| r.next_u64()).collect()
        };
        let b: Vec<u64> = {
            let mut r = ShapeRng::for_sample(7, 0.25);
            (0..16).map(|_| r.next_u64()).collect()
        };
        assert_eq!(a, b);

        let mut other = ShapeRng::for_sample(7, 0.5);
        assert_ne!(a[0], other.next_u64());
    }

    #[test]
    fn test_next_f64_range() {
        let mut rng = ShapeRng::new(1234);
        for _ in 0..1000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
        assert_eq!(rng.next_range(3.0, 3.0), 3.0);
    }

    #[test]
    fn test_point_in_sphere_bounded() {
        let mut rng = ShapeRng::new(99);
        for _ in 0..500 {
            assert!(rng.point_in_sphere(2.5).length() <= 2.5 + 1e-12);
        }
    }
}
