//! Core building blocks of the recurrent state-space model.

pub mod belief;
pub mod dist;
pub mod history;
pub mod noise;
pub mod recurrent;
pub mod transition;

pub use belief::{BeliefModel, BeliefModelConfig};
pub use dist::{gaussian_kl, mean_std_floor, sample_gaussian, split_params};
pub use history::{StackedHistory, StatesAndBeliefs, StepRecord};
pub use noise::{BackendNoise, NoiseSource, SeededNoise};
pub use recurrent::{BeliefCell, GruCell, GruCellConfig};
pub use transition::{TransitionModel, TransitionModelConfig};
