//! 2D geometry helpers.

use nalgebra::Vector2;
use rand::Rng;

/// Generates a uniform random position inside the `[0, extent)` square.
pub fn random_position<R: Rng + ?Sized>(extent: f64, rng: &mut R) -> Vector2<f64> {
    Vector2::new(rng.gen_range(0.0..extent), rng.gen_range(0.0..extent))
}

/// Euclidean distance between two points.
pub fn distance(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    (a - b).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_random_position_in_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..100 {
            let p = random_position(15.0, &mut rng);
            assert!(p.x >= 0.0 && p.x < 15.0);
            assert!(p.y >= 0.0 && p.y < 15.0);
        }
    }

    #[test]
    fn test_random_position_deterministic() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(7);
        let mut rng2 = ChaCha8Rng::seed_from_u64(7);

        assert_eq!(random_position(10.0, &mut rng1), random_position(10.0, &mut rng2));
    }

    #[test]
    fn test_distance() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(3.0, 4.0);

        assert_eq!(distance(&a, &b), 5.0);
    }
}
