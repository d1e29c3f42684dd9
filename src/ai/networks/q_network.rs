use burn::nn::{Initializer, Linear, LinearConfig, Relu, Tanh};
use burn::prelude::*;

/// Action-value network for Othello.
///
/// ```text
/// Input:  [batch, 64]   encoded board, mover = +1
/// FC1:    64  -> 256, ReLU
/// FC2:    256 -> 256, ReLU
/// FC3:    256 -> 128, ReLU
/// FC4:    128 -> 64,  ReLU
/// Out:    64  -> 64,  Tanh  (one value per square)
/// ```
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
    fc4: Linear<B>,
    out: Linear<B>,
    relu: Relu,
    tanh: Tanh,
}

#[derive(Config, Debug)]
pub struct QNetworkConfig {
    #[config(default = 64)]
    pub input_size: usize,
    #[config(default = 64)]
    pub output_size: usize,
}

impl QNetworkConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        let layer = |d_in: usize, d_out: usize| {
            LinearConfig::new(d_in, d_out)
                .with_initializer(Initializer::XavierUniform { gain: 1.0 })
                .init(device)
        };
        QNetwork {
            fc1: layer(self.input_size, 256),
            fc2: layer(256, 256),
            fc3: layer(256, 128),
            fc4: layer(128, 64),
            out: layer(64, self.output_size),
            relu: Relu::new(),
            tanh: Tanh::new(),
        }
    }
}

impl<B: Backend> QNetwork<B> {
    /// Forward pass: input [batch, 64] -> output [batch, 64] values in (-1, 1).
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.relu.forward(self.fc1.forward(input));
        let x = self.relu.forward(self.fc2.forward(x));
        let x = self.relu.forward(self.fc3.forward(x));
        let x = self.relu.forward(self.fc4.forward(x));
        self.tanh.forward(self.out.forward(x))
    }
}
