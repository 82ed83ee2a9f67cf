pub mod discriminator;
pub mod generator;
pub mod layers;

use burn::{module::Module, prelude::*};

use crate::{
    error::ModelError,
    model::{
        discriminator::{Discriminator, DiscriminatorConfig},
        generator::{Generator, GeneratorConfig},
    },
};

/// Generator and discriminator of one image-to-image translation pair.
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    pub generator: Generator<B>,
    pub discriminator: Discriminator<B>,
}

#[derive(Config, Debug)]
pub struct ModelConfig {
    #[config(default = "GeneratorConfig::new()")]
    pub generator_config: GeneratorConfig,
    #[config(default = "DiscriminatorConfig::new()")]
    pub discriminator_config: DiscriminatorConfig,
}

impl ModelConfig {
    /// A consistent pair translating `in_channels` images into `out_channels` images.
    pub fn pix2pix(in_channels: usize, out_channels: usize) -> Self {
        Self::new()
            .with_generator_config(
                GeneratorConfig::new()
                    .with_in_channels(in_channels)
                    .with_out_channels(out_channels),
            )
            .with_discriminator_config(
                DiscriminatorConfig::new()
                    .with_condition_channels(in_channels)
                    .with_target_channels(out_channels),
            )
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.generator_config.validate()?;
        self.discriminator_config.validate()?;

        // condition is the generator input, target is its output
        for (side, generator, discriminator) in [
            (
                "condition",
                self.generator_config.in_channels,
                self.discriminator_config.condition_channels,
            ),
            (
                "target",
                self.generator_config.out_channels,
                self.discriminator_config.target_channels,
            ),
        ] {
            if generator != discriminator {
                return Err(ModelError::IncompatiblePair {
                    side,
                    generator,
                    discriminator,
                });
            }
        }
        Ok(())
    }

    /// Validates the config, then builds the pair.
    pub fn try_init<B: Backend>(&self, device: &B::Device) -> Result<Model<B>, ModelError> {
        self.validate()?;
        Ok(self.init(device))
    }

    /// Builds the pair without checking the config; see [`ModelConfig::try_init`].
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let generator = self.generator_config.init(device);
        let discriminator = self.discriminator_config.init(device);

        Model {
            generator,
            discriminator,
        }
    }
}

impl<B: Backend> Model<B> {
    /// Translates `condition` under `quality` and scores the result against
    /// the same condition. Returns the generated image and its patch logits.
    pub fn translate_and_score(
        &self,
        condition: Tensor<B, 4>,
        quality: Tensor<B, 3>,
    ) -> Result<(Tensor<B, 4>, Tensor<B, 4>), ModelError> {
        let generated = self.generator.try_forward(condition.clone(), quality)?;
        let patches = self
            .discriminator
            .try_forward(condition, generated.clone())?;

        Ok((generated, patches))
    }
}
