// External imports
use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::prelude::Backend;
use burn::tensor::Tensor;
use serde::{Deserialize, Serialize};

// Internal imports
use super::step_2_lstm_cell::BiLstm;
use crate::constants::{
    DEFAULT_DROPOUT, DEFAULT_HIDDEN_SIZE, DEFAULT_NUM_LAYERS, HEAD_HIDDEN_1, HEAD_HIDDEN_2,
};

/// Hyperparameters of the bidirectional regressor
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BiLstmConfig {
    pub hidden_size: usize,
    pub num_layers: usize,
    pub dropout: f64,
}

impl Default for BiLstmConfig {
    fn default() -> Self {
        Self {
            hidden_size: DEFAULT_HIDDEN_SIZE,
            num_layers: DEFAULT_NUM_LAYERS,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

impl BiLstmConfig {
    /// Build a regressor for windows with `input_size` features per step
    pub fn init<B: Backend>(&self, input_size: usize, device: &B::Device) -> BiLstmRegressor<B> {
        BiLstmRegressor::new(
            input_size,
            self.hidden_size,
            self.num_layers,
            self.dropout,
            device,
        )
    }
}

/// Stacked BiLSTM followed by a three layer linear head.
///
/// Only the last time step of the LSTM output feeds the head. The head has
/// no activations between its layers.
#[derive(Module, Debug)]
pub struct BiLstmRegressor<B: Backend> {
    input_size: usize,
    lstm: BiLstm<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    fc3: Linear<B>,
}

impl<B: Backend> BiLstmRegressor<B> {
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let lstm = BiLstm::new(input_size, hidden_size, num_layers, dropout, device);
        let lstm_output_size = lstm.output_size();

        Self {
            input_size,
            lstm,
            fc1: LinearConfig::new(lstm_output_size, HEAD_HIDDEN_1).init(device),
            fc2: LinearConfig::new(HEAD_HIDDEN_1, HEAD_HIDDEN_2).init(device),
            fc3: LinearConfig::new(HEAD_HIDDEN_2, 1).init(device),
        }
    }

    /// Getter for input_size
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// `[batch, steps, features]` -> one prediction per sample
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 1> {
        let lstm_out = self.lstm.forward(x);
        let [batch_size, seq_len, lstm_output_size] = lstm_out.dims();

        let last_step = lstm_out
            .narrow(1, seq_len - 1, 1)
            .reshape([batch_size, lstm_output_size]);

        let out = self.fc1.forward(last_step);
        let out = self.fc2.forward(out);
        let out = self.fc3.forward(out);

        out.reshape([batch_size])
    }
}
