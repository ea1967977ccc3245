//! Initial body state

use rand::Rng;

use crate::constants::{ATTRACTION_RANGE, BODY_SIZE};

/// Row-major T x T attraction coefficients.
///
/// `get(a, b)` is how strongly a body of type `a` is pulled toward a body of type `b`.
/// Negative values repel.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractionMatrix {
    type_count: u32,
    values: Vec<f32>,
}

impl AttractionMatrix {
    pub fn random<R: Rng + ?Sized>(rng: &mut R, type_count: u32) -> Self {
        let len = (type_count as usize) * (type_count as usize);
        let values = (0..len)
            .map(|_| rng.random_range(-ATTRACTION_RANGE..ATTRACTION_RANGE))
            .collect();
        Self { type_count, values }
    }

    pub fn type_count(&self) -> u32 {
        self.type_count
    }

    pub fn get(&self, a: u32, b: u32) -> f32 {
        self.values[(a * self.type_count + b) as usize]
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}

/// Everything uploaded to the GPU on reset
#[derive(Debug, Clone, PartialEq)]
pub struct BodySeed {
    /// xyz in the unit cube, w = billboard size
    pub positions: Vec<[f32; 4]>,
    /// Type id per body, `i % type_count`
    pub types: Vec<u32>,
    pub attractions: AttractionMatrix,
}

impl BodySeed {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, body_count: u32, type_count: u32) -> Self {
        let positions = (0..body_count)
            .map(|_| [rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>(), BODY_SIZE])
            .collect();
        let types = (0..body_count).map(|i| i % type_count).collect();
        let attractions = AttractionMatrix::random(rng, type_count);

        Self {
            positions,
            types,
            attractions,
        }
    }

    pub fn body_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn type_count(&self) -> u32 {
        self.attractions.type_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seed_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let seed = BodySeed::generate(&mut rng, 1000, 8);

        assert_eq!(seed.body_count(), 1000);
        assert_eq!(seed.type_count(), 8);
        assert_eq!(seed.types.len(), 1000);
        assert_eq!(seed.attractions.values().len(), 64);

        for (i, ty) in seed.types.iter().enumerate() {
            assert_eq!(*ty, i as u32 % 8);
        }

        for p in &seed.positions {
            for c in &p[..3] {
                assert!((0.0..1.0).contains(c), "component {c} outside unit cube");
            }
            assert_eq!(p[3], BODY_SIZE);
        }

        for a in seed.attractions.values() {
            assert!((-ATTRACTION_RANGE..ATTRACTION_RANGE).contains(a));
        }
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = BodySeed::generate(&mut StdRng::seed_from_u64(42), 256, 4);
        let b = BodySeed::generate(&mut StdRng::seed_from_u64(42), 256, 4);
        let c = BodySeed::generate(&mut StdRng::seed_from_u64(43), 256, 4);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_matrix_is_row_major() {
        let mut rng = StdRng::seed_from_u64(1);
        let matrix = AttractionMatrix::random(&mut rng, 3);

        assert_eq!(matrix.get(0, 0), matrix.values()[0]);
        assert_eq!(matrix.get(1, 2), matrix.values()[5]);
        assert_eq!(matrix.get(2, 1), matrix.values()[7]);
    }

    #[test]
    fn test_more_types_than_bodies() {
        let mut rng = StdRng::seed_from_u64(3);
        let seed = BodySeed::generate(&mut rng, 4, 16);

        assert_eq!(seed.types, vec![0, 1, 2, 3]);
        assert_eq!(seed.attractions.values().len(), 256);
    }
}
