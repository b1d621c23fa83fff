//! Deterministic recurrent cells for belief propagation.
//!
//! The belief over the latent state is a deterministic recurrent hidden
//! vector, advanced once per time step. The cell behind it is abstracted as
//! [`BeliefCell`] so alternate architectures (an LSTM-style cell, a custom
//! gated cell) can be substituted without touching the rollout. The default
//! is a GRU cell built from `Linear` layers, since Burn does not ship a GRU.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::sigmoid;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Single-step deterministic recurrent cell.
///
/// Implementations must be pure functions of (input, belief, parameters):
/// no sampling, no interior state.
pub trait BeliefCell<B: Backend>: Module<B> + Clone {
    /// Advance the belief one step.
    ///
    /// # Arguments
    /// * `input` - Input embedding [batch, input_size]
    /// * `belief` - Current belief [batch, belief_size]
    ///
    /// # Returns
    /// New belief [batch, belief_size].
    fn step(&self, input: Tensor<B, 2>, belief: Tensor<B, 2>) -> Tensor<B, 2>;

    /// Zero belief for a fresh trajectory.
    fn initial_belief(&self, batch_size: usize, device: &B::Device) -> Tensor<B, 2> {
        Tensor::zeros([batch_size, self.belief_size()], device)
    }

    /// Belief (hidden) dimension.
    fn belief_size(&self) -> usize;

    /// Input embedding dimension.
    fn input_size(&self) -> usize;
}

// ============================================================================
// GRU cell
// ============================================================================

/// Configuration for [`GruCell`].
#[derive(Debug, Clone)]
pub struct GruCellConfig {
    /// Input feature size.
    pub d_input: usize,
    /// Belief (hidden) size.
    pub d_belief: usize,
    /// Whether the input projection carries a bias.
    pub bias: bool,
}

impl GruCellConfig {
    /// Create a new GRU config.
    pub fn new(d_input: usize, d_belief: usize) -> Self {
        Self {
            d_input,
            d_belief,
            bias: true,
        }
    }

    /// Set bias option.
    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    /// Initialize the cell.
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruCell<B> {
        // Fused projections: one matmul per side produces all three gates,
        // chunked as [reset | update | candidate] along the feature axis.
        let input_proj = LinearConfig::new(self.d_input, 3 * self.d_belief)
            .with_bias(self.bias)
            .init(device);
        let belief_proj = LinearConfig::new(self.d_belief, 3 * self.d_belief)
            .with_bias(false)
            .init(device);

        GruCell {
            input_proj,
            belief_proj,
            d_input: self.d_input,
            d_belief: self.d_belief,
        }
    }
}

/// GRU cell with fused gate projections.
///
/// GRU equations:
/// - r  = σ(W_ir x + W_hr h)          (reset gate)
/// - z  = σ(W_iz x + W_hz h)          (update gate)
/// - n  = tanh(W_in x + r ⊙ W_hn h)   (candidate belief)
/// - h' = (1 - z) ⊙ n + z ⊙ h         (new belief)
#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    input_proj: Linear<B>,
    belief_proj: Linear<B>,
    #[module(skip)]
    d_input: usize,
    #[module(skip)]
    d_belief: usize,
}

impl<B: Backend> BeliefCell<B> for GruCell<B> {
    fn step(&self, input: Tensor<B, 2>, belief: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _] = belief.dims();
        let d = self.d_belief;

        let gates_x = self.input_proj.forward(input);
        let gates_h = self.belief_proj.forward(belief.clone());

        let gate =
            |fused: &Tensor<B, 2>, k: usize| fused.clone().slice([0..batch, k * d..(k + 1) * d]);

        let reset = sigmoid(gate(&gates_x, 0) + gate(&gates_h, 0));
        let update = sigmoid(gate(&gates_x, 1) + gate(&gates_h, 1));
        let candidate = (gate(&gates_x, 2) + reset * gate(&gates_h, 2)).tanh();

        // h' = (1 - z) ⊙ n + z ⊙ h
        candidate.clone() - update.clone() * candidate + update * belief
    }

    fn belief_size(&self) -> usize {
        self.d_belief
    }

    fn input_size(&self) -> usize {
        self.d_input
    }
}
