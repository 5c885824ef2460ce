use rand::Rng;
use rand_distr::StandardNormal;

/// The amount of samples in the synthetic training set.
pub const SAMPLES: usize = 100;

const TRUE_WEIGHT: f32 = 2.;
const TRUE_BIAS: f32 = 10.;
const NOISE_SCALE: f32 = 0.33;

/// An immutable in-memory set of `(x, y)` samples.
#[derive(Debug, Clone)]
pub struct Dataset {
    xs: Vec<f32>,
    ys: Vec<f32>,
}

impl Dataset {
    /// Creates a new `Dataset` from owned buffers.
    ///
    /// # Arguments
    /// * `xs` - The features.
    /// * `ys` - The targets, same length as `xs`.
    ///
    /// # Returns
    /// A new `Dataset` or `None` if the lengths differ.
    pub fn new(xs: Vec<f32>, ys: Vec<f32>) -> Option<Self> {
        (xs.len() == ys.len()).then_some(Self { xs, ys })
    }

    /// Generates the linear regression training set.
    ///
    /// `x` is evenly spaced in `[-1, 1]` and `y = 2x + 0.33 * noise + 10`
    /// with standard normal noise.
    ///
    /// # Arguments
    /// * `rng` - The source of the noise.
    ///
    /// # Returns
    /// A new `Dataset` with `SAMPLES` samples.
    pub fn synthetic<R: Rng>(rng: &mut R) -> Self {
        let xs = linspace(-1., 1., SAMPLES);
        let ys = xs
            .iter()
            .map(|&x| {
                let noise: f32 = rng.sample(StandardNormal);
                TRUE_WEIGHT * x + noise * NOISE_SCALE + TRUE_BIAS
            })
            .collect();

        Self { xs, ys }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Returns the first sample, used for periodic loss evaluation.
    pub fn first(&self) -> Option<(f32, f32)> {
        self.iter().next()
    }

    /// Iterates over the samples in order.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }
}

/// `n` evenly spaced values over `[start, end]`, both ends included.
fn linspace(start: f32, end: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f32;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + step * i as f32 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn linspace_includes_both_ends() {
        let xs = linspace(-1., 1., 5);
        assert_eq!(xs, vec![-1., -0.5, 0., 0.5, 1.]);
        assert!(linspace(0., 1., 0).is_empty());
        assert_eq!(linspace(3., 4., 1), vec![3.]);
    }

    #[test]
    fn synthetic_follows_the_generating_line() {
        let mut rng = StdRng::seed_from_u64(42);
        let dataset = Dataset::synthetic(&mut rng);
        assert_eq!(dataset.len(), SAMPLES);

        let mean_residual = dataset
            .iter()
            .map(|(x, y)| y - (TRUE_WEIGHT * x + TRUE_BIAS))
            .sum::<f32>()
            / SAMPLES as f32;

        assert!(mean_residual.abs() < 0.15, "mean residual {mean_residual}");
        assert_eq!(dataset.first().map(|(x, _)| x), Some(-1.));
    }

    #[test]
    fn same_seed_same_data() {
        let a = Dataset::synthetic(&mut StdRng::seed_from_u64(7));
        let b = Dataset::synthetic(&mut StdRng::seed_from_u64(7));
        assert!(a.iter().eq(b.iter()));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(Dataset::new(vec![1.], vec![]).is_none());
    }
}
