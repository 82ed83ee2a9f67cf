use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d, Sigmoid,
    },
    prelude::*,
};

use crate::{
    error::ModelError,
    model::layers::{UNetDown, UNetDownConfig, UNetUp, UNetUpConfig},
    shape::{check_image, check_same},
};

/// Eight stride-2 encoder stages: inputs must tile into 256x256 cells.
pub const GENERATOR_SPATIAL_MULTIPLE: usize = 1 << 8;

/// U-Net generator whose bottleneck is conditioned on a quality vector.
#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    down_1: UNetDown<B>,
    down_2: UNetDown<B>,
    down_3: UNetDown<B>,
    down_4: UNetDown<B>,
    down_5: UNetDown<B>,
    down_6: UNetDown<B>,
    down_7: UNetDown<B>,
    down_8: UNetDown<B>,
    up_1: UNetUp<B>,
    up_2: UNetUp<B>,
    up_3: UNetUp<B>,
    up_4: UNetUp<B>,
    up_5: UNetUp<B>,
    up_6: UNetUp<B>,
    up_7: UNetUp<B>,
    out_deconv: ConvTranspose2d<B>,
    out_conv: Conv2d<B>,
    sig: Sigmoid,
    in_channels: usize,
    quality_dim: usize,
}

impl<B: Backend> Generator<B> {
    /// `input`: [B, C_in, H, W], `quality`: [B, 1, Q]. Returns [B, C_out, H, W] in (0, 1).
    pub fn forward(&self, input: Tensor<B, 4>, quality: Tensor<B, 3>) -> Tensor<B, 4> {
        let d1 = self.down_1.forward(input);
        let d2 = self.down_2.forward(d1.clone());
        let d3 = self.down_3.forward(d2.clone());
        let d4 = self.down_4.forward(d3.clone());
        let d5 = self.down_5.forward(d4.clone());
        let d6 = self.down_6.forward(d5.clone());
        let d7 = self.down_7.forward(d6.clone());
        let d8 = self.down_8.forward(d7.clone());

        let bottleneck = self.condition(d8, quality);

        let u1 = self.up_1.forward(bottleneck, d7);
        let u2 = self.up_2.forward(u1, d6);
        let u3 = self.up_3.forward(u2, d5);
        let u4 = self.up_4.forward(u3, d4);
        let u5 = self.up_5.forward(u4, d3);
        let u6 = self.up_6.forward(u5, d2);
        let u7 = self.up_7.forward(u6, d1);

        let out = self.out_deconv.forward(u7);
        let out = self.out_conv.forward(out);
        self.sig.forward(out)
    }

    /// Same as [`Generator::forward`], but rejects malformed inputs instead of
    /// letting the backend panic on them.
    pub fn try_forward(
        &self,
        input: Tensor<B, 4>,
        quality: Tensor<B, 3>,
    ) -> Result<Tensor<B, 4>, ModelError> {
        let dims = input.dims();
        check_image("input", dims, self.in_channels, GENERATOR_SPATIAL_MULTIPLE)?;

        let quality_dims = quality.dims();
        if quality_dims[1..] != [1, self.quality_dim] {
            return Err(ModelError::QualityShape {
                expected: self.quality_dim,
                actual: quality_dims.to_vec(),
            });
        }
        check_same("quality batch", [dims[0]], [quality_dims[0]])?;

        Ok(self.forward(input, quality))
    }

    pub fn quality_dim(&self) -> usize {
        self.quality_dim
    }

    // [B, 1, Q] -> [B, Q, h, w], appended to the bottleneck channels
    fn condition(&self, bottleneck: Tensor<B, 4>, quality: Tensor<B, 3>) -> Tensor<B, 4> {
        let [_, _, height, width] = bottleneck.dims();

        let quality: Tensor<B, 4> = quality.swap_dims(1, 2).unsqueeze_dim(3);
        let quality = quality.repeat_dim(2, height).repeat_dim(3, width);

        Tensor::cat(vec![bottleneck, quality], 1)
    }
}

#[derive(Config, Debug)]
pub struct GeneratorConfig {
    #[config(default = 1)]
    pub in_channels: usize,
    #[config(default = 1)]
    pub out_channels: usize,
    /// Length of the per-sample quality vector.
    #[config(default = 3)]
    pub quality_dim: usize,
    /// Width of the first encoder stage; deeper stages use 2x, 4x and 8x.
    #[config(default = 64)]
    pub base_channels: usize,
    /// Dropout on the innermost stages (down 4-8, up 1-4). Zero disables it.
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [
            ("in_channels", self.in_channels),
            ("out_channels", self.out_channels),
            ("quality_dim", self.quality_dim),
            ("base_channels", self.base_channels),
        ] {
            if value == 0 {
                return Err(ModelError::ZeroSized { field });
            }
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::Dropout(self.dropout));
        }
        Ok(())
    }

    /// Builds the network without checking the config; call
    /// [`GeneratorConfig::validate`] first for untrusted configs.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Generator<B> {
        let c1 = self.base_channels;
        let c2 = c1 * 2;
        let c4 = c1 * 4;
        let c8 = c1 * 8;
        let p = self.dropout;

        let down_1 = UNetDownConfig::new([self.in_channels, c1]).init(device);
        let down_2 = UNetDownConfig::new([c1, c2]).init(device);
        let down_3 = UNetDownConfig::new([c2, c4]).init(device);
        let down_4 = UNetDownConfig::new([c4, c8]).with_dropout(p).init(device);
        let down_5 = UNetDownConfig::new([c8, c8]).with_dropout(p).init(device);
        let down_6 = UNetDownConfig::new([c8, c8]).with_dropout(p).init(device);
        let down_7 = UNetDownConfig::new([c8, c8]).with_dropout(p).init(device);
        let down_8 = UNetDownConfig::new([c8, c8]).with_dropout(p).init(device);

        // every decoder input is the previous stage's output plus its skip
        let up_1 = UNetUpConfig::new([c8 + self.quality_dim, c8])
            .with_dropout(p)
            .init(device);
        let up_2 = UNetUpConfig::new([c8 * 2, c8]).with_dropout(p).init(device);
        let up_3 = UNetUpConfig::new([c8 * 2, c8]).with_dropout(p).init(device);
        let up_4 = UNetUpConfig::new([c8 * 2, c8]).with_dropout(p).init(device);
        let up_5 = UNetUpConfig::new([c8 * 2, c4]).init(device);
        let up_6 = UNetUpConfig::new([c4 * 2, c2]).init(device);
        let up_7 = UNetUpConfig::new([c2 * 2, c1]).init(device);

        let out_deconv = ConvTranspose2dConfig::new([c1 * 2, self.out_channels], [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .init(device);
        let out_conv = Conv2dConfig::new([self.out_channels, self.out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let sig = Sigmoid::new();

        let generator = Generator {
            down_1,
            down_2,
            down_3,
            down_4,
            down_5,
            down_6,
            down_7,
            down_8,
            up_1,
            up_2,
            up_3,
            up_4,
            up_5,
            up_6,
            up_7,
            out_deconv,
            out_conv,
            sig,
            in_channels: self.in_channels,
            quality_dim: self.quality_dim,
        };

        tracing::debug!(
            params = generator.num_params(),
            base_channels = c1,
            quality_dim = self.quality_dim,
            "initialised U-Net generator"
        );

        generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestBackend;
    use burn::tensor::Distribution;

    fn small() -> GeneratorConfig {
        GeneratorConfig::new().with_base_channels(2)
    }

    fn quality(batch: usize, dim: usize) -> Tensor<TestBackend, 3> {
        Tensor::random([batch, 1, dim], Distribution::Uniform(0.0, 1.0), &Default::default())
    }

    #[test]
    fn default_config_matches_reference_architecture() {
        let config = GeneratorConfig::new();
        assert_eq!(config.in_channels, 1);
        assert_eq!(config.out_channels, 1);
        assert_eq!(config.quality_dim, 3);
        assert_eq!(config.base_channels, 64);
        assert_eq!(config.dropout, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn output_keeps_input_resolution() {
        let device = Default::default();
        let generator = small().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [2, 1, 256, 256],
            Distribution::Default,
            &device,
        );
        let output = generator.forward(input, quality(2, 3));

        assert_eq!(output.dims(), [2, 1, 256, 256]);
    }

    #[test]
    fn output_is_squashed_into_unit_interval() {
        let device = Default::default();
        let generator = small()
            .with_in_channels(3)
            .with_out_channels(2)
            .init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 3, 256, 256],
            Distribution::Normal(0.0, 2.0),
            &device,
        );
        let output = generator.forward(input, quality(1, 3));
        assert_eq!(output.dims(), [1, 2, 256, 256]);

        let values = output.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| *v >= 0.0 && *v <= 1.0));
    }

    #[test]
    fn quality_vector_changes_the_output() {
        let device = Default::default();
        let generator = small().init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 1, 256, 256],
            Distribution::Default,
            &device,
        );
        let low = Tensor::<TestBackend, 3>::from_data([[[0.0, 0.0, 0.0]]], &device);
        let high = Tensor::<TestBackend, 3>::from_data([[[50.0, -50.0, 50.0]]], &device);

        let a = generator.forward(input.clone(), low);
        let b = generator.forward(input, high);

        let diff = (a - b).abs().sum().into_scalar();
        assert!(diff > 0.0);
    }

    #[test]
    fn quality_broadcasts_over_larger_bottlenecks() {
        let device = Default::default();
        let generator = small().with_quality_dim(5).init::<TestBackend>(&device);

        let input = Tensor::<TestBackend, 4>::random(
            [1, 1, 256, 512],
            Distribution::Default,
            &device,
        );
        let output = generator.forward(input, quality(1, 5));

        assert_eq!(output.dims(), [1, 1, 256, 512]);
    }

    #[test]
    fn try_forward_rejects_bad_shapes() {
        let device = Default::default();
        let generator = small().init::<TestBackend>(&device);
        let image = |dims: [usize; 4]| {
            Tensor::<TestBackend, 4>::random(dims, Distribution::Default, &device)
        };

        assert!(matches!(
            generator.try_forward(image([1, 3, 256, 256]), quality(1, 3)),
            Err(ModelError::ChannelMismatch { expected: 1, actual: 3, .. })
        ));
        assert!(matches!(
            generator.try_forward(image([1, 1, 128, 128]), quality(1, 3)),
            Err(ModelError::SpatialSize { multiple: 256, .. })
        ));
        assert!(matches!(
            generator.try_forward(image([1, 1, 256, 256]), quality(1, 4)),
            Err(ModelError::QualityShape { expected: 3, .. })
        ));
        assert!(matches!(
            generator.try_forward(image([2, 1, 256, 256]), quality(1, 3)),
            Err(ModelError::ShapeMismatch { .. })
        ));
        let empty = Tensor::<TestBackend, 4>::zeros([0, 1, 256, 256], &device);
        let no_quality = Tensor::<TestBackend, 3>::zeros([0, 1, 3], &device);
        assert_eq!(
            generator.try_forward(empty, no_quality).unwrap_err(),
            ModelError::ZeroSized { field: "batch" }
        );
        assert!(generator
            .try_forward(image([1, 1, 256, 256]), quality(1, 3))
            .is_ok());
    }

    #[test]
    fn skips_mirror_encoder_stages() {
        let device = Default::default();
        let generator = small().init::<TestBackend>(&device);
        let g = &generator;

        let input = Tensor::<TestBackend, 4>::random(
            [1, 1, 256, 256],
            Distribution::Default,
            &device,
        );
        let q = quality(1, 3);

        let d1 = g.down_1.forward(input.clone());
        let d2 = g.down_2.forward(d1.clone());
        let d3 = g.down_3.forward(d2.clone());
        let d4 = g.down_4.forward(d3.clone());
        let d5 = g.down_5.forward(d4.clone());
        let d6 = g.down_6.forward(d5.clone());
        let d7 = g.down_7.forward(d6.clone());
        let d8 = g.down_8.forward(d7.clone());
        assert_eq!(d8.dims(), [1, 16, 1, 1]);

        // up stage k consumes down stage 8 - k
        let u = g.up_1.forward(g.condition(d8, q.clone()), d7);
        let u = g.up_2.forward(u, d6);
        let u = g.up_3.forward(u, d5);
        let u = g.up_4.forward(u, d4);
        let u = g.up_5.forward(u, d3);
        let u = g.up_6.forward(u, d2);
        let u = g.up_7.forward(u, d1);
        let expected = g.sig.forward(g.out_conv.forward(g.out_deconv.forward(u)));

        let actual = g.forward(input, q).into_data().to_vec::<f32>().unwrap();
        let expected = expected.into_data().to_vec::<f32>().unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn bottleneck_carries_the_quality_channels_last() {
        let device = Default::default();
        let generator = small().init::<TestBackend>(&device);

        let bottleneck = Tensor::<TestBackend, 4>::zeros([1, 16, 1, 2], &device);
        let q = Tensor::<TestBackend, 3>::from_data([[[1.0, 2.0, 3.0]]], &device);
        let joined = generator.condition(bottleneck, q);

        assert_eq!(joined.dims(), [1, 19, 1, 2]);
        let tail = joined.slice([0..1, 16..19, 0..1, 0..2]);
        assert_eq!(
            tail.into_data().to_vec::<f32>().unwrap(),
            vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]
        );
    }

    #[test]
    fn validate_rejects_degenerate_configs() {
        assert_eq!(
            small().with_quality_dim(0).validate(),
            Err(ModelError::ZeroSized { field: "quality_dim" })
        );
        assert_eq!(
            small().with_dropout(1.0).validate(),
            Err(ModelError::Dropout(1.0))
        );
    }

    #[test]
    fn parameter_count_scales_with_width() {
        let device = Default::default();
        let narrow = small().init::<TestBackend>(&device).num_params();
        let wide = small()
            .with_base_channels(4)
            .init::<TestBackend>(&device)
            .num_params();

        assert!(wide > narrow * 3);
    }
}
