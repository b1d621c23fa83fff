//! Diagonal-Gaussian parameter handling.
//!
//! Both transition estimators emit a single parameter tensor of width
//! `2 * latent_state_size`, laid out as `[mean | std]`. This module owns the
//! layout: splitting raw network output into a valid (mean, std) pair with a
//! strictly positive std floor, sampling via the reparameterization trick,
//! and the closed-form KL divergence between two such parameterizations.

use burn::tensor::activation::softplus;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::noise::NoiseSource;

/// Split a `[.., 2L]` parameter tensor into its `[.., L]` mean and std halves.
pub fn split_params<B: Backend, const D: usize>(
    params: Tensor<B, D>,
    latent_state_size: usize,
) -> (Tensor<B, D>, Tensor<B, D>) {
    let dim = D - 1;
    let mean = params.clone().narrow(dim, 0, latent_state_size);
    let std = params.narrow(dim, latent_state_size, latent_state_size);
    (mean, std)
}

/// Turn raw network output into valid distribution parameters.
///
/// The mean half passes through unchanged; the std half goes through a
/// softplus and is shifted by `min_std`, so `std >= min_std` holds for every
/// input. Output keeps the `[mean | std]` layout and width `2L`.
pub fn mean_std_floor<B: Backend>(
    raw_params: Tensor<B, 2>,
    latent_state_size: usize,
    min_std: f64,
) -> Tensor<B, 2> {
    let (mean, raw_std) = split_params(raw_params, latent_state_size);
    let std = softplus(raw_std, 1.0).add_scalar(min_std);
    Tensor::cat(vec![mean, std], 1)
}

/// Draw a latent-state sample from `[mean | std]` parameters.
///
/// Reparameterization trick: `sample = mean + std ⊙ ε`, ε ~ N(0, 1). The
/// sample stays differentiable with respect to the parameters; the noise
/// draw comes from the injected source.
pub fn sample_gaussian<B: Backend>(
    params: &Tensor<B, 2>,
    latent_state_size: usize,
    noise: &mut dyn NoiseSource<B>,
) -> Tensor<B, 2> {
    let [batch, _] = params.dims();
    let (mean, std) = split_params(params.clone(), latent_state_size);
    let eps = noise.standard_normal([batch, latent_state_size], &params.device());
    mean + std * eps
}

/// Per-dimension KL(q ‖ p) between two diagonal Gaussians.
///
/// Inputs are `[mean | std]` parameter tensors of width `2L`; output has
/// width `L`. Closed form per dimension:
///
/// KL = ln(σp/σq) + (σq² + (μq − μp)²) / (2σp²) − ½
pub fn gaussian_kl<B: Backend, const D: usize>(
    q_params: Tensor<B, D>,
    p_params: Tensor<B, D>,
    latent_state_size: usize,
) -> Tensor<B, D> {
    let (q_mean, q_std) = split_params(q_params, latent_state_size);
    let (p_mean, p_std) = split_params(p_params, latent_state_size);

    let var_ratio = (q_std / p_std.clone()).powf_scalar(2.0);
    let mean_term = ((q_mean - p_mean) / p_std).powf_scalar(2.0);

    // 0.5 * (σq²/σp² + (μq−μp)²/σp² − 1 − ln(σq²/σp²))
    (var_ratio.clone() + mean_term - var_ratio.log())
        .sub_scalar(1.0)
        .mul_scalar(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    /// Noise source that always returns zeros; sampling collapses to the mean.
    struct ZeroNoise;

    impl NoiseSource<B> for ZeroNoise {
        fn standard_normal(
            &mut self,
            shape: [usize; 2],
            device: &<B as Backend>::Device,
        ) -> Tensor<B, 2> {
            Tensor::zeros(shape, device)
        }
    }

    fn params_2d(rows: &[&[f32]], device: &<B as Backend>::Device) -> Tensor<B, 2> {
        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([rows.len(), rows[0].len()])
    }

    #[test]
    fn test_split_params_halves() {
        let device = Default::default();
        let params = params_2d(&[&[1.0, 2.0, 3.0, 4.0]], &device);
        let (mean, std) = split_params(params, 2);

        let mean: Vec<f32> = mean.into_data().to_vec().unwrap();
        let std: Vec<f32> = std.into_data().to_vec().unwrap();
        assert_eq!(mean, vec![1.0, 2.0]);
        assert_eq!(std, vec![3.0, 4.0]);
    }

    #[test]
    fn test_std_floor_holds_for_extreme_inputs() {
        let device = Default::default();
        let min_std = 0.1;
        // Raw std channel driven hard negative, hard positive, and to zero.
        let raw = params_2d(
            &[
                &[0.0, 0.0, -1e6, -30.0],
                &[5.0, -5.0, 0.0, 30.0],
            ],
            &device,
        );
        let params = mean_std_floor(raw, 2, min_std);
        let (_, std) = split_params(params, 2);

        let values: Vec<f32> = std.into_data().to_vec().unwrap();
        for v in values {
            assert!(v.is_finite());
            assert!(v >= min_std as f32, "std {} fell below the floor", v);
        }
    }

    #[test]
    fn test_mean_passes_through_unchanged() {
        let device = Default::default();
        let raw = params_2d(&[&[-2.5, 7.0, 0.3, 0.3]], &device);
        let params = mean_std_floor(raw, 2, 0.1);
        let (mean, _) = split_params(params, 2);

        let values: Vec<f32> = mean.into_data().to_vec().unwrap();
        assert_eq!(values, vec![-2.5, 7.0]);
    }

    #[test]
    fn test_sample_with_zero_noise_is_mean() {
        let device = Default::default();
        let params = params_2d(&[&[1.0, -2.0, 0.5, 0.5]], &device);
        let sample = sample_gaussian(&params, 2, &mut ZeroNoise);

        let values: Vec<f32> = sample.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, -2.0]);
    }

    #[test]
    fn test_kl_of_identical_distributions_is_zero() {
        let device = Default::default();
        let params = params_2d(&[&[0.3, -1.2, 0.7, 1.5]], &device);
        let kl = gaussian_kl(params.clone(), params, 2);

        let values: Vec<f32> = kl.into_data().to_vec().unwrap();
        for v in values {
            assert!(v.abs() < 1e-6, "KL {} should be zero", v);
        }
    }

    #[test]
    fn test_kl_matches_closed_form() {
        let device = Default::default();
        // q = N(1, 2²), p = N(0, 1²), one dimension.
        let q = params_2d(&[&[1.0, 2.0]], &device);
        let p = params_2d(&[&[0.0, 1.0]], &device);
        let kl = gaussian_kl(q, p, 1);

        // ln(1/2) + (4 + 1)/2 − 0.5 = -ln 2 + 2.0
        let expected = 2.0 - (2.0f32).ln();
        let values: Vec<f32> = kl.into_data().to_vec().unwrap();
        assert!((values[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_kl_is_nonnegative() {
        let device = Default::default();
        let q = params_2d(&[&[0.5, -0.5, 0.2, 3.0], &[2.0, 0.0, 1.0, 0.1]], &device);
        let p = params_2d(&[&[0.0, 1.0, 1.0, 0.5], &[-1.0, 0.5, 0.3, 2.0]], &device);
        let kl = gaussian_kl(q, p, 2);

        let values: Vec<f32> = kl.into_data().to_vec().unwrap();
        for v in values {
            assert!(v >= -1e-6, "KL {} must be non-negative", v);
        }
    }
}
