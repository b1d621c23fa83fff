//! Stochastic transition estimators.
//!
//! Prior and posterior beliefs over the latent state share the same two-layer
//! MLP shape; they differ only in input width. The prior sees the belief
//! alone (`p(s_t | h_t)`), the posterior sees the observation encoding
//! concatenated with the belief (`q(s_t | o_t, h_t)`). Both end in the
//! mean/std floor transform, so emitted parameters are always valid.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::dist::mean_std_floor;

/// Configuration for [`TransitionModel`].
#[derive(Debug, Clone)]
pub struct TransitionModelConfig {
    /// Input width (belief size for the prior, encoding + belief for the
    /// posterior).
    pub d_input: usize,
    /// Hidden layer width.
    pub d_hidden: usize,
    /// Latent-state size; output width is twice this.
    pub latent_state_size: usize,
    /// Lower bound on the emitted std.
    pub min_std: f64,
}

impl TransitionModelConfig {
    /// Create a new configuration.
    pub fn new(d_input: usize, d_hidden: usize, latent_state_size: usize) -> Self {
        Self {
            d_input,
            d_hidden,
            latent_state_size,
            min_std: 0.1,
        }
    }

    /// Set the std floor.
    pub fn with_min_std(mut self, min_std: f64) -> Self {
        self.min_std = min_std;
        self
    }

    /// Initialize the transition model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransitionModel<B> {
        TransitionModel {
            fc1: LinearConfig::new(self.d_input, self.d_hidden).init(device),
            fc2: LinearConfig::new(self.d_hidden, 2 * self.latent_state_size).init(device),
            latent_state_size: self.latent_state_size,
            min_std: self.min_std,
        }
    }
}

/// Two-layer MLP emitting `[mean | std]` latent-state distribution parameters.
#[derive(Module, Debug)]
pub struct TransitionModel<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    #[module(skip)]
    latent_state_size: usize,
    #[module(skip)]
    min_std: f64,
}

impl<B: Backend> TransitionModel<B> {
    /// Map `input` [batch, d_input] to distribution parameters
    /// [batch, 2 * latent_state_size] with `std >= min_std`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let hidden = relu(self.fc1.forward(input));
        let raw = relu(self.fc2.forward(hidden));
        mean_std_floor(raw, self.latent_state_size, self.min_std)
    }

    /// Latent-state size this model emits parameters for.
    pub fn latent_state_size(&self) -> usize {
        self.latent_state_size
    }
}
