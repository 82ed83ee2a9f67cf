use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
};

use crate::{
    error::ModelError,
    model::layers::{DiscriminatorBlock, ZeroPad2d},
    shape::{check_image, check_same},
};

/// Four stride-2 stages: each output cell scores a 16x16-strided patch.
pub const DISCRIMINATOR_SPATIAL_MULTIPLE: usize = 1 << 4;

/// PatchGAN discriminator over a (condition, target) image pair.
#[derive(Module, Debug)]
pub struct Discriminator<B: Backend> {
    disc_layer_1: DiscriminatorBlock<B>,
    disc_layer_2: DiscriminatorBlock<B>,
    disc_layer_3: DiscriminatorBlock<B>,
    disc_layer_4: DiscriminatorBlock<B>,
    pad: ZeroPad2d,
    out_layer: Conv2d<B>,
    condition_channels: usize,
    target_channels: usize,
}

impl<B: Backend> Discriminator<B> {
    /// `condition`: [B, C_cond, H, W], `target`: [B, C_target, H, W].
    /// Returns raw patch logits [B, 1, H/16, W/16].
    pub fn forward(&self, condition: Tensor<B, 4>, target: Tensor<B, 4>) -> Tensor<B, 4> {
        let input = Tensor::cat(vec![condition, target], 1);

        let output = self.disc_layer_1.forward(input);
        let output = self.disc_layer_2.forward(output);
        let output = self.disc_layer_3.forward(output);
        let output = self.disc_layer_4.forward(output);

        let output = self.pad.forward(output);
        self.out_layer.forward(output)
    }

    pub fn try_forward(
        &self,
        condition: Tensor<B, 4>,
        target: Tensor<B, 4>,
    ) -> Result<Tensor<B, 4>, ModelError> {
        let [batch, _, height, width] = condition.dims();
        check_image(
            "condition",
            condition.dims(),
            self.condition_channels,
            DISCRIMINATOR_SPATIAL_MULTIPLE,
        )?;
        check_same(
            "target",
            [batch, self.target_channels, height, width],
            target.dims(),
        )?;

        Ok(self.forward(condition, target))
    }

    /// Shape of the patch map produced for `[batch, _, height, width]` inputs.
    pub fn patch_shape(batch: usize, height: usize, width: usize) -> [usize; 4] {
        [
            batch,
            1,
            height / DISCRIMINATOR_SPATIAL_MULTIPLE,
            width / DISCRIMINATOR_SPATIAL_MULTIPLE,
        ]
    }
}

#[derive(Config, Debug)]
pub struct DiscriminatorConfig {
    /// Channels of the conditioning image (the generator's input).
    #[config(default = 1)]
    pub condition_channels: usize,
    /// Channels of the judged image (real or generated output).
    #[config(default = 1)]
    pub target_channels: usize,
    #[config(default = 64)]
    pub base_channels: usize,
}

impl DiscriminatorConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        for (field, value) in [
            ("condition_channels", self.condition_channels),
            ("target_channels", self.target_channels),
            ("base_channels", self.base_channels),
        ] {
            if value == 0 {
                return Err(ModelError::ZeroSized { field });
            }
        }
        Ok(())
    }

    /// Builds the network without checking the config; call
    /// [`DiscriminatorConfig::validate`] first for untrusted configs.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Discriminator<B> {
        let c = self.base_channels;
        let stacked = self.condition_channels + self.target_channels;

        let disc_layer_1 = DiscriminatorBlock::new([stacked, c], true, device);
        let disc_layer_2 = DiscriminatorBlock::new([c, c * 2], true, device);
        let disc_layer_3 = DiscriminatorBlock::new([c * 2, c * 4], true, device);
        let disc_layer_4 = DiscriminatorBlock::new([c * 4, c * 8], true, device);

        // top-left padding so the 4x4 head keeps H/16 x W/16 cells
        let pad = ZeroPad2d::new(1, 0, 1, 0);
        let out_layer = Conv2dConfig::new([c * 8, 1], [4, 4])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .with_bias(false)
            .init(device);

        let discriminator = Discriminator {
            disc_layer_1,
            disc_layer_2,
            disc_layer_3,
            disc_layer_4,
            pad,
            out_layer,
            condition_channels: self.condition_channels,
            target_channels: self.target_channels,
        };

        tracing::debug!(
            params = discriminator.num_params(),
            base_channels = c,
            "initialised PatchGAN discriminator"
        );

        discriminator
    }
}
