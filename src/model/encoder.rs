//! Convolutional observation encoder.
//!
//! Maps an image observation batch to a fixed-width encoding vector through
//! a stack of strided convolutions, a flatten, and a linear head. From the
//! model core's perspective this is an opaque collaborator; only the
//! encoding width matters.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;

/// Spatial size after one valid (unpadded) strided convolution.
pub(crate) fn conv_output_size(input: usize, kernel: usize, stride: usize) -> usize {
    (input - kernel) / stride + 1
}

/// Configuration for [`Conv2dEncoder`].
///
/// Each layer entry is `(in_channels, out_channels, kernel_size, stride)`.
#[derive(Debug, Clone)]
pub struct Conv2dEncoderConfig {
    /// Convolution layer spec, applied in order.
    pub layers: Vec<(usize, usize, usize, usize)>,
    /// Input image size (height, width).
    pub image_size: (usize, usize),
    /// Output encoding width.
    pub encoding_size: usize,
}

impl Conv2dEncoderConfig {
    /// Create a new configuration.
    pub fn new(
        layers: Vec<(usize, usize, usize, usize)>,
        image_size: (usize, usize),
        encoding_size: usize,
    ) -> Self {
        Self {
            layers,
            image_size,
            encoding_size,
        }
    }

    /// Spatial size (height, width) after the full convolution stack.
    pub fn output_map_size(&self) -> (usize, usize) {
        let (mut height, mut width) = self.image_size;
        for &(_, _, kernel, stride) in &self.layers {
            height = conv_output_size(height, kernel, stride);
            width = conv_output_size(width, kernel, stride);
        }
        (height, width)
    }

    /// Initialize the encoder.
    ///
    /// # Panics
    ///
    /// Panics if the layer spec is empty or consecutive channel counts
    /// disagree.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Conv2dEncoder<B> {
        assert!(!self.layers.is_empty(), "encoder needs at least one layer");
        for pair in self.layers.windows(2) {
            assert_eq!(
                pair[0].1, pair[1].0,
                "encoder channel counts must chain between layers"
            );
        }

        let convs = self
            .layers
            .iter()
            .map(|&(c_in, c_out, kernel, stride)| {
                Conv2dConfig::new([c_in, c_out], [kernel, kernel])
                    .with_stride([stride, stride])
                    .init(device)
            })
            .collect();

        let (height, width) = self.output_map_size();
        let flat_size = self.layers.last().map(|l| l.1).unwrap_or(0) * height * width;
        let head = LinearConfig::new(flat_size, self.encoding_size).init(device);

        Conv2dEncoder {
            convs,
            head,
            encoding_size: self.encoding_size,
        }
    }
}

/// Strided convolution stack with a linear encoding head.
#[derive(Module, Debug)]
pub struct Conv2dEncoder<B: Backend> {
    convs: Vec<Conv2d<B>>,
    head: Linear<B>,
    #[module(skip)]
    encoding_size: usize,
}

impl<B: Backend> Conv2dEncoder<B> {
    /// Encode an observation batch [batch, C, H, W] into
    /// [batch, encoding_size].
    pub fn forward(&self, obs: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = obs;
        for conv in &self.convs {
            x = relu(conv.forward(x));
        }
        self.head.forward(x.flatten(1, 3))
    }

    /// Encoding width.
    pub fn encoding_size(&self) -> usize {
        self.encoding_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    #[test]
    fn test_conv_output_size() {
        assert_eq!(conv_output_size(64, 4, 2), 31);
        assert_eq!(conv_output_size(8, 3, 2), 3);
        assert_eq!(conv_output_size(5, 5, 1), 1);
    }

    #[test]
    fn test_encoder_output_shape() {
        let device = Default::default();
        let config = Conv2dEncoderConfig::new(vec![(1, 4, 3, 2)], (8, 8), 16);
        let encoder = config.init::<B>(&device);

        let obs = Tensor::random([2, 1, 8, 8], Distribution::Normal(0.0, 1.0), &device);
        let encoding = encoder.forward(obs);
        assert_eq!(encoding.dims(), [2, 16]);
    }

    #[test]
    fn test_encoder_two_layers() {
        let device = Default::default();
        let config = Conv2dEncoderConfig::new(vec![(3, 8, 4, 2), (8, 16, 3, 2)], (16, 16), 32);
        assert_eq!(config.output_map_size(), (3, 3));

        let encoder = config.init::<B>(&device);
        let obs = Tensor::random([1, 3, 16, 16], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(encoder.forward(obs).dims(), [1, 32]);
    }

    #[test]
    #[should_panic(expected = "channel counts")]
    fn test_encoder_rejects_broken_channel_chain() {
        let device = Default::default();
        let config = Conv2dEncoderConfig::new(vec![(3, 8, 4, 2), (4, 16, 3, 2)], (16, 16), 32);
        let _ = config.init::<B>(&device);
    }
}
