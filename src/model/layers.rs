use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, LeakyRelu, LeakyReluConfig,
        PaddingConfig2d,
    },
    prelude::*,
};

/// Encoder stage of the U-Net: a stride-2 convolution that halves the
/// spatial size, followed by batch norm and a leaky ReLU.
#[derive(Module, Debug)]
pub struct UNetDown<B: Backend> {
    conv: Conv2d<B>,
    bn: Option<BatchNorm<B, 2>>,
    lrelu: LeakyRelu,
    dropout: Option<Dropout>,
}

#[derive(Config, Debug)]
pub struct UNetDownConfig {
    pub channels: [usize; 2],
    #[config(default = true)]
    pub normalize: bool,
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl UNetDownConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNetDown<B> {
        let conv = Conv2dConfig::new(self.channels, [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn = self.normalize.then(|| {
            BatchNormConfig::new(self.channels[1])
                .with_momentum(0.8)
                .init(device)
        });
        let lrelu = LeakyReluConfig::new().with_negative_slope(0.2).init();
        let dropout = (self.dropout > 0.0).then(|| DropoutConfig::new(self.dropout).init());

        UNetDown {
            conv,
            bn,
            lrelu,
            dropout,
        }
    }
}

impl<B: Backend> UNetDown<B> {
    /// [B, C_in, H, W] -> [B, C_out, H/2, W/2]
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.conv.forward(input);
        let output = match &self.bn {
            Some(bn) => bn.forward(output),
            None => output,
        };
        let output = self.lrelu.forward(output);

        match &self.dropout {
            Some(dropout) => dropout.forward(output),
            None => output,
        }
    }
}

/// Decoder stage of the U-Net. Upsamples by two, refines with a 3x3
/// convolution and appends the mirrored encoder features.
#[derive(Module, Debug)]
pub struct UNetUp<B: Backend> {
    deconv: ConvTranspose2d<B>,
    conv: Conv2d<B>,
    bn: BatchNorm<B, 2>,
    lrelu: LeakyRelu,
    dropout: Option<Dropout>,
}

#[derive(Config, Debug)]
pub struct UNetUpConfig {
    pub channels: [usize; 2],
    #[config(default = 0.0)]
    pub dropout: f64,
}

impl UNetUpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNetUp<B> {
        let out_channels = self.channels[1];

        let deconv = ConvTranspose2dConfig::new(self.channels, [4, 4])
            .with_stride([2, 2])
            .with_padding([1, 1])
            .init(device);
        let conv = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn = BatchNormConfig::new(out_channels)
            .with_momentum(0.8)
            .init(device);
        let lrelu = LeakyReluConfig::new().init();
        let dropout = (self.dropout > 0.0).then(|| DropoutConfig::new(self.dropout).init());

        UNetUp {
            deconv,
            conv,
            bn,
            lrelu,
            dropout,
        }
    }
}

impl<B: Backend> UNetUp<B> {
    /// [B, C_in, H, W] + skip [B, C_skip, 2H, 2W] -> [B, C_out + C_skip, 2H, 2W]
    pub fn forward(&self, input: Tensor<B, 4>, skip: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.deconv.forward(input);
        let output = self.conv.forward(output);
        let output = self.bn.forward(output);
        let output = self.lrelu.forward(output);
        let output = match &self.dropout {
            Some(dropout) => dropout.forward(output),
            None => output,
        };

        Tensor::cat(vec![output, skip], 1)
    }
}

/// One PatchGAN stage: stride-2 convolution, optional batch norm, leaky ReLU.
#[derive(Module, Debug)]
pub struct DiscriminatorBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: Option<BatchNorm<B, 2>>,
    lrelu: LeakyRelu,
}

impl<B: Backend> DiscriminatorBlock<B> {
    pub fn new(channels: [usize; 2], normalize: bool, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new(channels, [4, 4])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let bn = normalize.then(|| BatchNormConfig::new(channels[1]).init(device));
        let lrelu = LeakyReluConfig::new().with_negative_slope(0.2).init();

        Self { conv, bn, lrelu }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let output = self.conv.forward(input);
        let output = match &self.bn {
            Some(bn) => bn.forward(output),
            None => output,
        };
        self.lrelu.forward(output)
    }
}

/// Zero padding of the two trailing axes, possibly asymmetric.
#[derive(Module, Debug, Clone)]
pub struct ZeroPad2d {
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
}

impl ZeroPad2d {
    pub fn new(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn forward<B: Backend>(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        input.pad((self.left, self.right, self.top, self.bottom), 0.0)
    }
}
