//! Convolutional observation decoder.
//!
//! Inverts the encoder's spatial reduction: a feature vector (posterior
//! latent sample concatenated with the belief) is projected to an encoding,
//! expanded into an initial channel map, and upsampled back to the
//! observation shape through transposed convolutions.

use burn::module::Module;
use burn::nn::conv::{ConvTranspose2d, ConvTranspose2dConfig};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Spatial size after one valid (unpadded) transposed convolution.
pub(crate) fn deconv_output_size(input: usize, kernel: usize, stride: usize) -> usize {
    (input - 1) * stride + kernel
}

/// Configuration for [`Conv2dDecoder`].
///
/// Each layer entry is `(in_channels, out_channels, kernel_size, stride)`,
/// mirroring the encoder spec but for transposed convolutions.
#[derive(Debug, Clone)]
pub struct Conv2dDecoderConfig {
    /// Decoder input width (latent_state_size + belief_size).
    pub d_input: usize,
    /// Intermediate encoding width.
    pub encoding_size: usize,
    /// Shape of the initial channel map (channels, height, width).
    pub initial_map: (usize, usize, usize),
    /// Transposed-convolution layer spec, applied in order.
    pub layers: Vec<(usize, usize, usize, usize)>,
}

impl Conv2dDecoderConfig {
    /// Create a new configuration.
    pub fn new(
        d_input: usize,
        encoding_size: usize,
        initial_map: (usize, usize, usize),
        layers: Vec<(usize, usize, usize, usize)>,
    ) -> Self {
        Self {
            d_input,
            encoding_size,
            initial_map,
            layers,
        }
    }

    /// Spatial size (height, width) the deconvolution stack produces.
    pub fn output_map_size(&self) -> (usize, usize) {
        let (_, mut height, mut width) = self.initial_map;
        for &(_, _, kernel, stride) in &self.layers {
            height = deconv_output_size(height, kernel, stride);
            width = deconv_output_size(width, kernel, stride);
        }
        (height, width)
    }

    /// Initialize the decoder.
    ///
    /// # Panics
    ///
    /// Panics if the layer spec is empty, the first layer's input channels
    /// disagree with the initial map, or channel counts do not chain.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv2dDecoder<B> {
        assert!(!self.layers.is_empty(), "decoder needs at least one layer");
        assert_eq!(
            self.layers[0].0, self.initial_map.0,
            "first decoder layer must consume the initial map channels"
        );
        for pair in self.layers.windows(2) {
            assert_eq!(
                pair[0].1, pair[1].0,
                "decoder channel counts must chain between layers"
            );
        }

        let (channels, height, width) = self.initial_map;
        let embed = LinearConfig::new(self.d_input, self.encoding_size).init(device);
        let projection =
            LinearConfig::new(self.encoding_size, channels * height * width).init(device);

        let deconvs = self
            .layers
            .iter()
            .map(|&(c_in, c_out, kernel, stride)| {
                ConvTranspose2dConfig::new([c_in, c_out], [kernel, kernel])
                    .with_stride([stride, stride])
                    .init(device)
            })
            .collect();

        Conv2dDecoder {
            embed,
            projection,
            deconvs,
            map_channels: channels,
            map_height: height,
            map_width: width,
        }
    }
}

/// Linear projection followed by a transposed-convolution stack.
#[derive(Module, Debug)]
pub struct Conv2dDecoder<B: Backend> {
    embed: Linear<B>,
    projection: Linear<B>,
    deconvs: Vec<ConvTranspose2d<B>>,
    #[module(skip)]
    map_channels: usize,
    #[module(skip)]
    map_height: usize,
    #[module(skip)]
    map_width: usize,
}

impl<B: Backend> Conv2dDecoder<B> {
    /// Decode a feature batch [batch, latent + belief] into a predicted
    /// observation batch [batch, C, H, W].
    pub fn forward(&self, feature: Tensor<B, 2>) -> Tensor<B, 4> {
        let [batch, _] = feature.dims();
        let encoding = self.embed.forward(feature);
        let mut x = self.projection.forward(encoding).reshape([
            batch,
            self.map_channels,
            self.map_height,
            self.map_width,
        ]);
        let last = self.deconvs.len() - 1;
        for (index, deconv) in self.deconvs.iter().enumerate() {
            x = deconv.forward(x);
            // No activation on the output layer; pixels stay unconstrained.
            if index < last {
                x = relu(x);
            }
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::encoder::conv_output_size;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    #[test]
    fn test_deconv_output_size() {
        assert_eq!(deconv_output_size(1, 5, 2), 5);
        assert_eq!(deconv_output_size(2, 6, 2), 8);
        assert_eq!(deconv_output_size(13, 6, 2), 30);
    }

    #[test]
    fn test_decoder_output_shape() {
        let device = Default::default();
        let config = Conv2dDecoderConfig::new(8, 16, (4, 2, 2), vec![(4, 1, 6, 2)]);
        assert_eq!(config.output_map_size(), (8, 8));

        let decoder = config.init::<B>(&device);
        let feature = Tensor::random([3, 8], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(decoder.forward(feature).dims(), [3, 1, 8, 8]);
    }

    #[test]
    fn test_decoder_inverts_encoder_spatial_dims() {
        // Encoder 8x8 -> 3x3 with kernel 4 stride 2; the mirrored transposed
        // layer must map 3x3 back to 8x8.
        assert_eq!(conv_output_size(8, 4, 2), 3);
        let config = Conv2dDecoderConfig::new(8, 16, (4, 3, 3), vec![(4, 1, 4, 2)]);
        assert_eq!(config.output_map_size(), (8, 8));
    }

    #[test]
    #[should_panic(expected = "initial map channels")]
    fn test_decoder_rejects_channel_mismatch_with_map() {
        let device = Default::default();
        let config = Conv2dDecoderConfig::new(8, 16, (4, 2, 2), vec![(8, 1, 6, 2)]);
        let _ = config.init::<B>(&device);
    }
}
