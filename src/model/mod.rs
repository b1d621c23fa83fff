//! The assembled world model: encoder, decoder, and the PlaNet core.

pub mod decoder;
pub mod encoder;
pub mod planet;


pub use decoder::{Conv2dDecoder, Conv2dDecoderConfig};
pub use encoder::{Conv2dEncoder, Conv2dEncoderConfig};
pub use planet::{reconstruction_loss, LossComponents, PlaNetModel, PlaNetModelConfig, Rollout};
