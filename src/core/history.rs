//! Per-rollout history of states and beliefs.
//!
//! The rollout appends one immutable [`StepRecord`] per time step (including
//! the synthetic zero-filled step 0) and stacks the five channels into
//! time-major tensors exactly once at the end. The structure lives for a
//! single rollout call and holds no state across calls.

use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Everything recorded at one time step of a rollout.
#[derive(Debug, Clone)]
pub struct StepRecord<B: Backend> {
    /// Prior distribution parameters [batch, 2L].
    pub prior_params: Tensor<B, 2>,
    /// Sample drawn from the prior [batch, L].
    pub prior_state: Tensor<B, 2>,
    /// Posterior distribution parameters [batch, 2L].
    pub posterior_params: Tensor<B, 2>,
    /// Sample drawn from the posterior [batch, L].
    pub posterior_state: Tensor<B, 2>,
    /// Belief after this step [batch, H].
    pub belief: Tensor<B, 2>,
}

impl<B: Backend> StepRecord<B> {
    /// Zero-filled placeholder for the synthetic step 0. Its prior/posterior
    /// entries are never meaningful distributions.
    pub fn zero(
        batch_size: usize,
        latent_state_size: usize,
        belief_size: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            prior_params: Tensor::zeros([batch_size, 2 * latent_state_size], device),
            prior_state: Tensor::zeros([batch_size, latent_state_size], device),
            posterior_params: Tensor::zeros([batch_size, 2 * latent_state_size], device),
            posterior_state: Tensor::zeros([batch_size, latent_state_size], device),
            belief: Tensor::zeros([batch_size, belief_size], device),
        }
    }
}

/// Append-only, time-ordered collection of rollout records.
#[derive(Debug)]
pub struct StatesAndBeliefs<B: Backend> {
    steps: Vec<StepRecord<B>>,
}

impl<B: Backend> StatesAndBeliefs<B> {
    /// Create an empty history.
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append one step record. Records must arrive in time order.
    pub fn push(&mut self, record: StepRecord<B>) {
        self.steps.push(record);
    }

    /// Number of recorded steps (T + 1 after a complete rollout).
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether any step has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Records in time order.
    pub fn steps(&self) -> &[StepRecord<B>] {
        &self.steps
    }

    /// Stack each channel along a new leading time axis.
    pub fn stack(self) -> StackedHistory<B> {
        let count = self.steps.len();
        let mut prior_params = Vec::with_capacity(count);
        let mut prior_states = Vec::with_capacity(count);
        let mut posterior_params = Vec::with_capacity(count);
        let mut posterior_states = Vec::with_capacity(count);
        let mut beliefs = Vec::with_capacity(count);

        for step in self.steps {
            prior_params.push(step.prior_params);
            prior_states.push(step.prior_state);
            posterior_params.push(step.posterior_params);
            posterior_states.push(step.posterior_state);
            beliefs.push(step.belief);
        }

        StackedHistory {
            prior_params: Tensor::stack(prior_params, 0),
            prior_states: Tensor::stack(prior_states, 0),
            posterior_params: Tensor::stack(posterior_params, 0),
            posterior_states: Tensor::stack(posterior_states, 0),
            beliefs: Tensor::stack(beliefs, 0),
        }
    }
}

impl<B: Backend> Default for StatesAndBeliefs<B> {
    fn default() -> Self {
        Self::new()
    }
}

/// The five history channels stacked into time-major tensors.
#[derive(Debug, Clone)]
pub struct StackedHistory<B: Backend> {
    /// Prior distribution parameters [T+1, batch, 2L].
    pub prior_params: Tensor<B, 3>,
    /// Prior samples [T+1, batch, L].
    pub prior_states: Tensor<B, 3>,
    /// Posterior distribution parameters [T+1, batch, 2L].
    pub posterior_params: Tensor<B, 3>,
    /// Posterior samples [T+1, batch, L].
    pub posterior_states: Tensor<B, 3>,
    /// Beliefs [T+1, batch, H].
    pub beliefs: Tensor<B, 3>,
}
