//! Quality-conditioned U-Net generator and PatchGAN discriminator.
//!
//! Both networks are plain Burn modules, generic over the backend. Build them
//! from [`ModelConfig`] (or the per-network configs) and call `forward`, or
//! `try_forward` to get shape errors as [`ModelError`] values.

pub mod error;
pub mod model;
mod shape;

pub use error::ModelError;
pub use model::{
    discriminator::{Discriminator, DiscriminatorConfig, DISCRIMINATOR_SPATIAL_MULTIPLE},
    generator::{Generator, GeneratorConfig, GENERATOR_SPATIAL_MULTIPLE},
    Model, ModelConfig,
};

#[cfg(test)]
pub(crate) type TestBackend = burn::backend::NdArray<f32>;
