//! # World Model: Recurrent State-Space Model for Model-Based RL
//!
//! A PlaNet-style latent-variable sequential world model built on Burn.
//! Given a batch of trajectories (observations and actions), the model
//! learns a compact recurrent latent representation that predicts future
//! observations, trained with a reconstruction term plus a KL consistency
//! term between two competing estimators of the latent state.
//!
//! ## Architecture Overview
//!
//! ```text
//!            a_{t-1}   s_{t-1}
//!               │        │
//!               ▼        ▼
//!            ┌──────────────┐
//!  h_{t-1} ─▶│ BeliefModel  │─▶ h_t ──────────────┬───────────────┐
//!            │ (GRU step)   │                     │               │
//!            └──────────────┘                     ▼               ▼
//!                                         ┌──────────────┐ ┌──────────────┐
//!  o_t ─▶ [Conv2dEncoder] ─▶ ô_t ────────▶│  posterior   │ │    prior     │
//!                                         │ q(s_t|o_t,h) │ │  p(s_t|h_t)  │
//!                                         └──────┬───────┘ └──────┬───────┘
//!                                                │ sample         │ sample
//!                                                ▼                ▼
//!                                         posterior s_t      prior s_t ──▶ next step
//!                                                │
//!                       [s_t, h_t] ─▶ [Conv2dDecoder] ─▶ predicted o_t
//! ```
//!
//! The recurrence advances on the *prior* sample even during training so the
//! model stays self-consistent at imagination time, when no observation is
//! available.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use world_model::{PlaNetModel, PlaNetModelConfig, TransitionBatch};
//!
//! let config = PlaNetModelConfig::new()
//!     .with_obs_shape((3, 64, 64))
//!     .with_latent_state_size(30)
//!     .with_action_size(4)
//!     .with_belief_size(200);
//! let model: PlaNetModel<B> = config.init(&device);
//!
//! let loss = model.loss(&batch, &device)?;
//! let score = model.eval_score(&batch, &device)?;
//! ```

pub mod batch;
pub mod core;
pub mod error;
pub mod model;

pub use batch::{ProcessedBatch, TransitionBatch};
pub use error::ModelError;

// Core building blocks
pub use core::belief::{BeliefModel, BeliefModelConfig};
pub use core::dist::{gaussian_kl, mean_std_floor, sample_gaussian, split_params};
pub use core::history::{StackedHistory, StatesAndBeliefs, StepRecord};
pub use core::noise::{BackendNoise, NoiseSource, SeededNoise};
pub use core::recurrent::{BeliefCell, GruCell, GruCellConfig};
pub use core::transition::{TransitionModel, TransitionModelConfig};

// Assembled model
pub use model::decoder::{Conv2dDecoder, Conv2dDecoderConfig};
pub use model::encoder::{Conv2dEncoder, Conv2dEncoderConfig};
pub use model::planet::{
    reconstruction_loss, LossComponents, PlaNetModel, PlaNetModelConfig, Rollout,
};
