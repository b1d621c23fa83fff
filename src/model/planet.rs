//! PlaNet-style recurrent state-space model.
//!
//! Ties the core pieces together: the belief updater, the prior and
//! posterior transition estimators, and the convolutional encoder/decoder.
//! [`PlaNetModel::rollout`] drives the recurrence over a trajectory batch and
//! [`PlaNetModel::loss`] turns the result into the training objective
//! (reconstruction MSE plus a free-nats-floored KL between posterior and
//! prior).
//!
//! One deliberate asymmetry: the recurrence advances on the *prior* sample
//! even though the posterior sample is available during training. At
//! imagination time no observation exists, so the belief update must be
//! self-consistent using prior samples alone; training matches that regime.

use burn::module::{AutodiffModule, Module};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

use crate::batch::TransitionBatch;
use crate::core::belief::{BeliefModel, BeliefModelConfig};
use crate::core::dist::{gaussian_kl, sample_gaussian};
use crate::core::history::{StatesAndBeliefs, StepRecord};
use crate::core::noise::{BackendNoise, NoiseSource};
use crate::core::transition::{TransitionModel, TransitionModelConfig};
use crate::error::ModelError;
use crate::model::decoder::{Conv2dDecoder, Conv2dDecoderConfig};
use crate::model::encoder::{Conv2dEncoder, Conv2dEncoderConfig};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for [`PlaNetModel`].
///
/// Defaults target 64x64 RGB observations with the standard four-layer
/// convolution stacks; every field has a builder setter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaNetModelConfig {
    /// Observation shape (channels, height, width).
    pub obs_shape: (usize, usize, usize),
    /// Width of the encoder's observation encoding.
    pub obs_encoding_size: usize,
    /// Encoder layers as (in_channels, out_channels, kernel_size, stride).
    pub encoder_layers: Vec<(usize, usize, usize, usize)>,
    /// Decoder's initial channel map (channels, height, width).
    pub decoder_initial_map: (usize, usize, usize),
    /// Decoder layers as (in_channels, out_channels, kernel_size, stride).
    pub decoder_layers: Vec<(usize, usize, usize, usize)>,
    /// Stochastic latent-state size.
    pub latent_state_size: usize,
    /// Action vector size.
    pub action_size: usize,
    /// Deterministic belief size.
    pub belief_size: usize,
    /// Hidden width of the transition MLPs.
    pub hidden_size_fcs: usize,
    /// Lower bound on emitted stds.
    pub min_std: f64,
    /// Free-nats floor for the KL term.
    pub free_nats: f64,
}

impl Default for PlaNetModelConfig {
    fn default() -> Self {
        Self {
            obs_shape: (3, 64, 64),
            obs_encoding_size: 1024,
            encoder_layers: vec![(3, 32, 4, 2), (32, 64, 4, 2), (64, 128, 4, 2), (128, 256, 4, 2)],
            decoder_initial_map: (1024, 1, 1),
            decoder_layers: vec![
                (1024, 128, 5, 2),
                (128, 64, 5, 2),
                (64, 32, 6, 2),
                (32, 3, 6, 2),
            ],
            latent_state_size: 30,
            action_size: 1,
            belief_size: 200,
            hidden_size_fcs: 200,
            min_std: 0.1,
            free_nats: 3.0,
        }
    }
}

impl PlaNetModelConfig {
    /// Create a configuration with default convolution stacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the observation shape.
    pub fn with_obs_shape(mut self, obs_shape: (usize, usize, usize)) -> Self {
        self.obs_shape = obs_shape;
        self
    }

    /// Set the observation-encoding width.
    pub fn with_obs_encoding_size(mut self, size: usize) -> Self {
        self.obs_encoding_size = size;
        self
    }

    /// Set the encoder layer spec.
    pub fn with_encoder_layers(mut self, layers: Vec<(usize, usize, usize, usize)>) -> Self {
        self.encoder_layers = layers;
        self
    }

    /// Set the decoder's initial map and layer spec.
    pub fn with_decoder(
        mut self,
        initial_map: (usize, usize, usize),
        layers: Vec<(usize, usize, usize, usize)>,
    ) -> Self {
        self.decoder_initial_map = initial_map;
        self.decoder_layers = layers;
        self
    }

    /// Set the latent-state size.
    pub fn with_latent_state_size(mut self, size: usize) -> Self {
        self.latent_state_size = size;
        self
    }

    /// Set the action size.
    pub fn with_action_size(mut self, size: usize) -> Self {
        self.action_size = size;
        self
    }

    /// Set the belief size.
    pub fn with_belief_size(mut self, size: usize) -> Self {
        self.belief_size = size;
        self
    }

    /// Set the transition MLP hidden width.
    pub fn with_hidden_size_fcs(mut self, size: usize) -> Self {
        self.hidden_size_fcs = size;
        self
    }

    /// Set the std floor.
    pub fn with_min_std(mut self, min_std: f64) -> Self {
        self.min_std = min_std;
        self
    }

    /// Set the free-nats floor.
    pub fn with_free_nats(mut self, free_nats: f64) -> Self {
        self.free_nats = free_nats;
        self
    }

    /// Initialize the model.
    ///
    /// # Panics
    ///
    /// Panics if the encoder/decoder specs disagree with the observation
    /// shape (wrong input channels, or a decoder that does not reproduce the
    /// observation's spatial size).
    pub fn init<B: Backend>(&self, device: &B::Device) -> PlaNetModel<B> {
        let (channels, height, width) = self.obs_shape;
        assert_eq!(
            self.encoder_layers[0].0, channels,
            "first encoder layer must consume the observation channels"
        );

        let encoder = Conv2dEncoderConfig::new(
            self.encoder_layers.clone(),
            (height, width),
            self.obs_encoding_size,
        );

        let decoder = Conv2dDecoderConfig::new(
            self.latent_state_size + self.belief_size,
            self.obs_encoding_size,
            self.decoder_initial_map,
            self.decoder_layers.clone(),
        );
        assert_eq!(
            decoder.output_map_size(),
            (height, width),
            "decoder must invert the observation's spatial size"
        );
        assert_eq!(
            self.decoder_layers.last().map(|l| l.1),
            Some(channels),
            "last decoder layer must emit the observation channels"
        );

        PlaNetModel {
            belief_model: BeliefModelConfig::new(
                self.latent_state_size,
                self.action_size,
                self.belief_size,
            )
            .init(device),
            prior_transition: TransitionModelConfig::new(
                self.belief_size,
                self.hidden_size_fcs,
                self.latent_state_size,
            )
            .with_min_std(self.min_std)
            .init(device),
            posterior_transition: TransitionModelConfig::new(
                self.obs_encoding_size + self.belief_size,
                self.hidden_size_fcs,
                self.latent_state_size,
            )
            .with_min_std(self.min_std)
            .init(device),
            encoder: encoder.init(device),
            decoder: decoder.init(device),
            obs_channels: channels,
            obs_height: height,
            obs_width: width,
            latent_state_size: self.latent_state_size,
            action_size: self.action_size,
            belief_size: self.belief_size,
            free_nats: self.free_nats,
        }
    }
}

// ============================================================================
// Rollout output
// ============================================================================

/// Stacked output of one rollout over a trajectory batch of length T.
///
/// Time-major channels carry T+1 entries; index 0 is the synthetic
/// zero-filled initial step.
#[derive(Debug, Clone)]
pub struct Rollout<B: Backend> {
    /// Prior distribution parameters [T+1, B, 2L].
    pub prior_params: Tensor<B, 3>,
    /// Prior samples [T+1, B, L].
    pub prior_states: Tensor<B, 3>,
    /// Posterior distribution parameters [T+1, B, 2L].
    pub posterior_params: Tensor<B, 3>,
    /// Posterior samples [T+1, B, L].
    pub posterior_states: Tensor<B, 3>,
    /// Beliefs [T+1, B, H].
    pub beliefs: Tensor<B, 3>,
    /// Predicted next observations [B, T, C, H, W].
    pub pred_next_obs: Tensor<B, 5>,
}

/// Scalar loss terms, for logging and model selection.
#[derive(Debug, Clone, Copy)]
pub struct LossComponents {
    /// Mean-squared reconstruction error.
    pub reconstruction: f32,
    /// Batch-averaged, free-nats-clamped KL total.
    pub kl: f32,
}

impl LossComponents {
    /// Combined training objective.
    pub fn total(&self) -> f32 {
        self.reconstruction + self.kl
    }
}

/// Mean-squared error between true and predicted observations, averaged over
/// every element. Exactly zero when the prediction equals the target.
pub fn reconstruction_loss<B: Backend>(
    next_obs: Tensor<B, 5>,
    pred_next_obs: Tensor<B, 5>,
) -> Tensor<B, 1> {
    (next_obs - pred_next_obs).powf_scalar(2.0).mean()
}

// ============================================================================
// Model
// ============================================================================

/// Latent-variable sequential world model.
#[derive(Module, Debug)]
pub struct PlaNetModel<B: Backend> {
    belief_model: BeliefModel<B>,
    prior_transition: TransitionModel<B>,
    posterior_transition: TransitionModel<B>,
    encoder: Conv2dEncoder<B>,
    decoder: Conv2dDecoder<B>,
    #[module(skip)]
    obs_channels: usize,
    #[module(skip)]
    obs_height: usize,
    #[module(skip)]
    obs_width: usize,
    #[module(skip)]
    latent_state_size: usize,
    #[module(skip)]
    action_size: usize,
    #[module(skip)]
    belief_size: usize,
    #[module(skip)]
    free_nats: f64,
}

impl<B: Backend> PlaNetModel<B> {
    /// Free-nats floor applied to the KL term.
    pub fn free_nats(&self) -> f64 {
        self.free_nats
    }

    /// The belief updater. Exposed for imagination-time consumers that
    /// drive the recurrence without observations.
    pub fn belief_model(&self) -> &BeliefModel<B> {
        &self.belief_model
    }

    /// The prior transition estimator.
    pub fn prior_transition(&self) -> &TransitionModel<B> {
        &self.prior_transition
    }

    /// The posterior transition estimator.
    pub fn posterior_transition(&self) -> &TransitionModel<B> {
        &self.posterior_transition
    }

    /// The observation encoder.
    pub fn encoder(&self) -> &Conv2dEncoder<B> {
        &self.encoder
    }

    /// The observation decoder.
    pub fn decoder(&self) -> &Conv2dDecoder<B> {
        &self.decoder
    }

    /// Draw a latent sample from `[mean | std]` parameters.
    pub fn sample_latent(
        &self,
        params: &Tensor<B, 2>,
        noise: &mut dyn NoiseSource<B>,
    ) -> Tensor<B, 2> {
        sample_gaussian(params, self.latent_state_size, noise)
    }

    fn validate_rollout_inputs(
        &self,
        next_obs: &Tensor<B, 5>,
        act: &Tensor<B, 3>,
    ) -> Result<(usize, usize), ModelError> {
        let [batch, steps, channels, height, width] = next_obs.dims();
        let [act_batch, act_steps, act_size] = act.dims();

        if steps == 0 {
            log::warn!("rollout called with a zero-length trajectory batch");
            return Err(ModelError::EmptyBatch);
        }
        let checks = [
            ("observation channels", self.obs_channels, channels),
            ("observation height", self.obs_height, height),
            ("observation width", self.obs_width, width),
            ("action size", self.action_size, act_size),
            ("action batch size", batch, act_batch),
            ("action trajectory length", steps, act_steps),
        ];
        for (what, expected, actual) in checks {
            if expected != actual {
                return Err(ModelError::ShapeMismatch {
                    what,
                    expected,
                    actual,
                });
            }
        }
        Ok((batch, steps))
    }

    /// Roll the model over a trajectory batch with backend-provided noise.
    ///
    /// # Arguments
    /// * `next_obs` - Next observations [B, T, C, H, W]
    /// * `act` - Actions [B, T, A]
    pub fn rollout(
        &self,
        next_obs: Tensor<B, 5>,
        act: Tensor<B, 3>,
    ) -> Result<Rollout<B>, ModelError> {
        self.rollout_with_noise(next_obs, act, &mut BackendNoise)
    }

    /// Roll the model over a trajectory batch, drawing latent-state noise
    /// from the given source.
    ///
    /// Each step computes the new belief, the prior parameters from the
    /// belief alone, the posterior parameters from (observation encoding,
    /// belief), and one independent sample from each distribution. The
    /// recurrence then advances on the prior sample. After the loop the
    /// posterior samples and beliefs for steps 1..=T feed the decoder.
    pub fn rollout_with_noise<N: NoiseSource<B>>(
        &self,
        next_obs: Tensor<B, 5>,
        act: Tensor<B, 3>,
        noise: &mut N,
    ) -> Result<Rollout<B>, ModelError> {
        let (batch, steps) = self.validate_rollout_inputs(&next_obs, &act)?;
        let device = next_obs.device();
        let latent = self.latent_state_size;
        let (channels, height, width) = (self.obs_channels, self.obs_height, self.obs_width);

        let mut current_latent: Tensor<B, 2> = Tensor::zeros([batch, latent], &device);
        let mut current_belief = self.belief_model.initial_belief(batch, &device);

        let mut history = StatesAndBeliefs::new();
        history.push(StepRecord::zero(batch, latent, self.belief_size, &device));

        for t in 0..steps {
            let action_t = act
                .clone()
                .slice([0..batch, t..t + 1, 0..self.action_size])
                .reshape([batch, self.action_size]);
            let next_belief =
                self.belief_model
                    .forward(current_latent, action_t, current_belief);

            let prior_params = self.prior_transition.forward(next_belief.clone());

            let obs_t = next_obs
                .clone()
                .slice([0..batch, t..t + 1, 0..channels, 0..height, 0..width])
                .reshape([batch, channels, height, width]);
            let encoding = self.encoder.forward(obs_t);
            let posterior_params = self
                .posterior_transition
                .forward(Tensor::cat(vec![encoding, next_belief.clone()], 1));

            // Independent noise for the two samples.
            let prior_sample = sample_gaussian(&prior_params, latent, noise);
            let posterior_sample = sample_gaussian(&posterior_params, latent, noise);

            // Advance on the prior sample; see the module docs.
            current_latent = prior_sample.clone();
            current_belief = next_belief.clone();

            history.push(StepRecord {
                prior_params,
                prior_state: prior_sample,
                posterior_params,
                posterior_state: posterior_sample,
                belief: next_belief,
            });
        }

        let stacked = history.stack();

        // Decode from the posterior states and beliefs, skipping the
        // zero-filled step 0. Rows are time-major [T*B, L+H]; the decoded
        // frames are rearranged back to batch-major [B, T, C, H, W].
        let decoder_input = Tensor::cat(
            vec![
                stacked
                    .posterior_states
                    .clone()
                    .slice([1..steps + 1, 0..batch, 0..latent]),
                stacked
                    .beliefs
                    .clone()
                    .slice([1..steps + 1, 0..batch, 0..self.belief_size]),
            ],
            2,
        )
        .reshape([steps * batch, latent + self.belief_size]);

        let pred_next_obs = self
            .decoder
            .forward(decoder_input)
            .reshape([steps, batch, channels, height, width])
            .swap_dims(0, 1);

        Ok(Rollout {
            prior_params: stacked.prior_params,
            prior_states: stacked.prior_states,
            posterior_params: stacked.posterior_params,
            posterior_states: stacked.posterior_states,
            beliefs: stacked.beliefs,
            pred_next_obs,
        })
    }

    /// Free-nats-clamped KL term of a rollout: per-dimension KL(q ‖ p) for
    /// steps 1..=T, summed over latent dimensions and time into one total
    /// per trajectory, clamped below at `free_nats`, then batch-averaged.
    pub fn kl_loss(&self, rollout: &Rollout<B>) -> Tensor<B, 1> {
        let [stacked_steps, batch, twice_latent] = rollout.posterior_params.dims();

        // Step 0 holds placeholder parameters, not a distribution.
        let posterior = rollout
            .posterior_params
            .clone()
            .slice([1..stacked_steps, 0..batch, 0..twice_latent]);
        let prior = rollout
            .prior_params
            .clone()
            .slice([1..stacked_steps, 0..batch, 0..twice_latent]);

        let kl = gaussian_kl(posterior, prior, self.latent_state_size);
        let per_trajectory: Tensor<B, 1> = kl
            .sum_dim(2)
            .squeeze::<2>(2)
            .sum_dim(0)
            .squeeze::<1>(0);

        per_trajectory.clamp_min(self.free_nats).mean()
    }

    /// Training objective: reconstruction MSE plus the clamped KL term.
    pub fn loss(
        &self,
        batch: &TransitionBatch,
        device: &B::Device,
    ) -> Result<Tensor<B, 1>, ModelError> {
        let processed = batch.process::<B>(device);
        let rollout = self.rollout(processed.next_obs.clone(), processed.act)?;

        let reconstruction = reconstruction_loss(processed.next_obs, rollout.pred_next_obs.clone());
        let kl = self.kl_loss(&rollout);
        Ok(reconstruction + kl)
    }

    /// The two loss terms as scalars, for logging and diagnostics.
    pub fn loss_components(
        &self,
        batch: &TransitionBatch,
        device: &B::Device,
    ) -> Result<LossComponents, ModelError> {
        let processed = batch.process::<B>(device);
        let rollout = self.rollout(processed.next_obs.clone(), processed.act)?;

        let reconstruction = tensor_to_scalar(&reconstruction_loss(
            processed.next_obs,
            rollout.pred_next_obs.clone(),
        ));
        let kl = tensor_to_scalar(&self.kl_loss(&rollout));
        log::debug!(
            "loss components: reconstruction={:.5} kl={:.5}",
            reconstruction,
            kl
        );
        Ok(LossComponents { reconstruction, kl })
    }
}

impl<B: AutodiffBackend> PlaNetModel<B> {
    /// Model-selection score: the identical loss computation, run on the
    /// inner backend without gradient tracking.
    pub fn eval_score(
        &self,
        batch: &TransitionBatch,
        device: &B::Device,
    ) -> Result<f32, ModelError> {
        let model = self.valid();
        let loss = model.loss(batch, device)?;
        Ok(tensor_to_scalar(&loss))
    }
}

fn tensor_to_scalar<B: Backend>(tensor: &Tensor<B, 1>) -> f32 {
    let data = tensor.clone().into_data();
    data.as_slice::<f32>().unwrap()[0]
}
