//! Belief updater: h_t = f(h_{t-1}, s_{t-1}, a_{t-1}).
//!
//! Combines the previous latent-state sample and action into an embedding,
//! then advances the deterministic belief with a single GRU step.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

use super::recurrent::{BeliefCell, GruCell, GruCellConfig};

/// Configuration for [`BeliefModel`].
#[derive(Debug, Clone)]
pub struct BeliefModelConfig {
    /// Latent-state sample size.
    pub latent_state_size: usize,
    /// Action vector size.
    pub action_size: usize,
    /// Belief (recurrent hidden) size.
    pub belief_size: usize,
}

impl BeliefModelConfig {
    /// Create a new configuration.
    pub fn new(latent_state_size: usize, action_size: usize, belief_size: usize) -> Self {
        Self {
            latent_state_size,
            action_size,
            belief_size,
        }
    }

    /// Initialize the belief model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> BeliefModel<B> {
        let embedding = LinearConfig::new(
            self.latent_state_size + self.action_size,
            self.belief_size,
        )
        .init(device);
        let cell = GruCellConfig::new(self.belief_size, self.belief_size).init(device);

        BeliefModel { embedding, cell }
    }
}

/// Deterministic belief updater.
#[derive(Module, Debug)]
pub struct BeliefModel<B: Backend> {
    embedding: Linear<B>,
    cell: GruCell<B>,
}

impl<B: Backend> BeliefModel<B> {
    /// Compute the next belief from the current latent sample, action and
    /// belief. All inputs share the batch dimension; no sampling happens here.
    ///
    /// # Arguments
    /// * `latent_state` - Latent sample [batch, latent_state_size]
    /// * `action` - Action [batch, action_size]
    /// * `belief` - Current belief [batch, belief_size]
    ///
    /// # Returns
    /// New belief [batch, belief_size].
    pub fn forward(
        &self,
        latent_state: Tensor<B, 2>,
        action: Tensor<B, 2>,
        belief: Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let embedding = relu(
            self.embedding
                .forward(Tensor::cat(vec![latent_state, action], 1)),
        );
        self.cell.step(embedding, belief)
    }

    /// Zero belief for the synthetic step 0 of a trajectory.
    pub fn initial_belief(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 2> {
        self.cell.initial_belief(batch_size, device)
    }

    /// Belief dimension.
    pub fn belief_size(&self) -> usize {
        self.cell.belief_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    #[test]
    fn test_belief_update_shape() {
        let device = Default::default();
        let model = BeliefModelConfig::new(4, 2, 8).init::<B>(&device);

        let latent = Tensor::random([3, 4], Distribution::Normal(0.0, 1.0), &device);
        let action = Tensor::random([3, 2], Distribution::Normal(0.0, 1.0), &device);
        let belief = model.initial_belief(3, &device);

        let next = model.forward(latent, action, belief);
        assert_eq!(next.dims(), [3, 8]);
    }

    #[test]
    fn test_belief_update_deterministic() {
        let device = Default::default();
        let model = BeliefModelConfig::new(4, 2, 8).init::<B>(&device);

        let latent: Tensor<B, 2> = Tensor::random([2, 4], Distribution::Normal(0.0, 1.0), &device);
        let action: Tensor<B, 2> = Tensor::random([2, 2], Distribution::Normal(0.0, 1.0), &device);
        let belief: Tensor<B, 2> = Tensor::random([2, 8], Distribution::Normal(0.0, 1.0), &device);

        let a = model
            .forward(latent.clone(), action.clone(), belief.clone())
            .into_data();
        let b = model.forward(latent, action, belief).into_data();
        let sa: &[f32] = a.as_slice().unwrap();
        let sb: &[f32] = b.as_slice().unwrap();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_belief_depends_on_action() {
        let device = Default::default();
        let model = BeliefModelConfig::new(4, 2, 8).init::<B>(&device);

        let latent: Tensor<B, 2> = Tensor::random([1, 4], Distribution::Normal(0.0, 1.0), &device);
        let belief = model.initial_belief(1, &device);

        let a0: Tensor<B, 2> = Tensor::zeros([1, 2], &device);
        let a1: Tensor<B, 2> = Tensor::ones([1, 2], &device);

        let b0 = model
            .forward(latent.clone(), a0, belief.clone())
            .into_data();
        let b1 = model.forward(latent, a1, belief).into_data();
        let s0: &[f32] = b0.as_slice().unwrap();
        let s1: &[f32] = b1.as_slice().unwrap();
        assert_ne!(s0, s1);
    }
}
