use fastnoise_lite::{FastNoiseLite, NoiseType};

use crate::TerrainConfig;

/// Deterministic terrain height function.
///
/// Three independent noise fields compose the sample: a `divisor` field that
/// modulates the frequency of the height lookup and a sign-flipped
/// `bumpiness` field that modulates its amplitude, so large-scale terrain
/// wavelength and relief both drift across the world instead of repeating.
pub struct HeightField {
    height: FastNoiseLite,
    divisor: FastNoiseLite,
    bumpiness: FastNoiseLite,
    params: TerrainConfig,
}

impl HeightField {
    pub fn new(params: &TerrainConfig) -> Self {
        // Unit base frequency everywhere; coordinates are pre-scaled per
        // sample so the height lookup can use a spatially varying frequency.
        let mut height = FastNoiseLite::with_seed(params.seed);
        height.set_noise_type(Some(NoiseType::OpenSimplex2));
        height.set_frequency(Some(1.0));
        let mut divisor = FastNoiseLite::with_seed(params.seed ^ 99_173);
        divisor.set_noise_type(Some(NoiseType::OpenSimplex2));
        divisor.set_frequency(Some(1.0));
        let mut bumpiness = FastNoiseLite::with_seed(params.seed ^ 41_337);
        bumpiness.set_noise_type(Some(NoiseType::OpenSimplex2));
        bumpiness.set_frequency(Some(1.0));
        Self {
            height,
            divisor,
            bumpiness,
            params: params.clone(),
        }
    }

    /// Raw lookup remapped to the [0, 255] byte range.
    #[inline]
    fn sample255(noise: &FastNoiseLite, x: f32, z: f32, freq: f32) -> f32 {
        (noise.get_noise_2d(x * freq, z * freq) + 1.0) * 127.5
    }

    /// Local frequency of the height lookup, in a small positive band.
    pub fn divisor(&self, x: f32, z: f32) -> f32 {
        let n =
            Self::sample255(&self.divisor, x, z, self.params.divisor_frequency) / 255.0 * 2.0 - 1.0;
        n * self.params.divisor_scale + self.params.divisor_offset
    }

    /// Local amplitude of the height lookup. Sign-flipped: positive noise
    /// pushes terrain downward, which pairs with the mesher's negated
    /// normal convention.
    pub fn bumpiness(&self, x: f32, z: f32) -> f32 {
        let n = Self::sample255(&self.bumpiness, x, z, self.params.bumpiness_frequency) / 255.0
            * 2.0
            - 1.0;
        -(n * self.params.bumpiness_scale + self.params.bumpiness_offset)
    }

    pub fn height(&self, x: f32, z: f32) -> f32 {
        let freq = self.divisor(x, z);
        Self::sample255(&self.height, x, z, freq) / 255.0 * self.bumpiness(x, z)
    }

    /// Height at an arbitrary fractional position, bilinearly interpolated
    /// from the four surrounding integer-lattice samples. Independent of any
    /// mesh tessellation.
    pub fn height_at_bilerp(&self, x: f32, z: f32) -> f32 {
        let x0 = x.floor();
        let z0 = z.floor();
        let tx = x - x0;
        let tz = z - z0;
        let h00 = self.height(x0, z0);
        let h10 = self.height(x0 + 1.0, z0);
        let h01 = self.height(x0, z0 + 1.0);
        let h11 = self.height(x0 + 1.0, z0 + 1.0);
        let a = h00 + (h10 - h00) * tx;
        let b = h01 + (h11 - h01) * tx;
        a + (b - a) * tz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> HeightField {
        HeightField::new(&TerrainConfig::default())
    }

    #[test]
    fn samples_are_deterministic_across_instances() {
        let a = field();
        let b = field();
        for (x, z) in [(0.0, 0.0), (17.5, -3.25), (-1000.0, 4096.0)] {
            assert_eq!(a.height(x, z), b.height(x, z));
            assert_eq!(a.divisor(x, z), b.divisor(x, z));
            assert_eq!(a.bumpiness(x, z), b.bumpiness(x, z));
        }
    }

    #[test]
    fn different_seed_changes_terrain() {
        let a = field();
        let b = HeightField::new(&TerrainConfig {
            seed: 2026,
            ..TerrainConfig::default()
        });
        let differs = (0..32).any(|i| {
            let x = i as f32 * 13.7;
            a.height(x, -x) != b.height(x, -x)
        });
        assert!(differs);
    }

    #[test]
    fn divisor_stays_in_positive_frequency_band() {
        let hf = field();
        let p = TerrainConfig::default();
        for i in -50..50 {
            let d = hf.divisor(i as f32 * 37.0, i as f32 * -11.0);
            assert!(d >= p.divisor_offset - p.divisor_scale - 1e-6);
            assert!(d <= p.divisor_offset + p.divisor_scale + 1e-6);
            assert!(d > 0.0);
        }
    }

    #[test]
    fn bumpiness_is_sign_flipped_amplitude_band() {
        let hf = field();
        let p = TerrainConfig::default();
        let lo = -(p.bumpiness_offset + p.bumpiness_scale) - 1e-4;
        let hi = -(p.bumpiness_offset - p.bumpiness_scale) + 1e-4;
        for i in -50..50 {
            let b = hf.bumpiness(i as f32 * 53.0, i as f32 * 7.0);
            assert!((lo..=hi).contains(&b), "bumpiness {b} outside [{lo}, {hi}]");
            assert!(b < 0.0);
        }
    }

    #[test]
    fn height_bounded_by_bumpiness() {
        let hf = field();
        let p = TerrainConfig::default();
        let bound = p.bumpiness_offset + p.bumpiness_scale;
        for i in -100..100 {
            let h = hf.height(i as f32 * 3.1, i as f32 * -9.4);
            assert!(h.abs() <= bound + 1e-4);
        }
    }

    #[test]
    fn bilerp_matches_lattice_at_integers() {
        let hf = field();
        for (x, z) in [(0.0, 0.0), (5.0, -3.0), (-64.0, 17.0)] {
            let direct = hf.height(x, z);
            let lerped = hf.height_at_bilerp(x, z);
            assert!((direct - lerped).abs() < 1e-5);
        }
    }

    #[test]
    fn bilerp_midpoint_is_edge_average() {
        let hf = field();
        let h0 = hf.height(4.0, 9.0);
        let h1 = hf.height(5.0, 9.0);
        let mid = hf.height_at_bilerp(4.5, 9.0);
        assert!((mid - (h0 + h1) * 0.5).abs() < 1e-5);
    }
}
