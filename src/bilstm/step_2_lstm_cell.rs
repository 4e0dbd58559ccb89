// External imports
use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::{activation, backend::Backend, Tensor};

/// One direction of an LSTM layer
#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    input_size: usize,
    hidden_size: usize,

    // Input, forget, cell and output gates combined
    input_weights: Linear<B>,
    hidden_weights: Linear<B>,
}

impl<B: Backend> LstmCell<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        let gate_size = 4 * hidden_size;

        Self {
            input_size,
            hidden_size,
            input_weights: LinearConfig::new(input_size, gate_size).init(device),
            hidden_weights: LinearConfig::new(hidden_size, gate_size).init(device),
        }
    }

    /// Runs the cell over `[batch, steps, input]` starting from zero states.
    ///
    /// With `reverse` the sequence is read back to front; each hidden state is
    /// still stored at the position of the step that produced it.
    pub fn forward(&self, x: Tensor<B, 3>, reverse: bool) -> Tensor<B, 3> {
        let device = x.device();
        let [batch_size, seq_len, _] = x.dims();

        // Initial hidden and cell states (zeros)
        let mut h: Tensor<B, 2> = Tensor::zeros([batch_size, self.hidden_size], &device);
        let mut c: Tensor<B, 2> = Tensor::zeros([batch_size, self.hidden_size], &device);
        let mut outputs: Tensor<B, 3> =
            Tensor::zeros([batch_size, seq_len, self.hidden_size], &device);

        // Process the sequence, back to front when reversed
        for step in 0..seq_len {
            let t = if reverse { seq_len - 1 - step } else { step };
            let x_t = x
                .clone()
                .narrow(1, t, 1)
                .reshape([batch_size, self.input_size]);

            // Calculate all four gates in one projection
            let gates = (self.input_weights.forward(x_t) + self.hidden_weights.forward(h))
                .reshape([batch_size, 4, self.hidden_size]);
            let gate = |index: usize| {
                gates
                    .clone()
                    .narrow(1, index, 1)
                    .reshape([batch_size, self.hidden_size])
            };

            let i = activation::sigmoid(gate(0));
            let f = activation::sigmoid(gate(1));
            let g = activation::tanh(gate(2));
            let o = activation::sigmoid(gate(3));

            // Update cell and hidden state
            c = f * c + i * g;
            h = o * activation::tanh(c.clone());

            // Store the hidden state at its time step
            outputs = outputs.slice_assign(
                [0..batch_size, t..t + 1, 0..self.hidden_size],
                h.clone().reshape([batch_size, 1, self.hidden_size]),
            );
        }

        outputs
    }
}

/// Forward and backward cells over the same input, outputs concatenated
#[derive(Module, Debug)]
pub struct BiLstmLayer<B: Backend> {
    forward_cell: LstmCell<B>,
    backward_cell: LstmCell<B>,
}

impl<B: Backend> BiLstmLayer<B> {
    pub fn new(input_size: usize, hidden_size: usize, device: &B::Device) -> Self {
        Self {
            forward_cell: LstmCell::new(input_size, hidden_size, device),
            backward_cell: LstmCell::new(input_size, hidden_size, device),
        }
    }

    /// `[batch, steps, input]` -> `[batch, steps, 2 * hidden]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        // Run both directions over the same input
        let forward_out = self.forward_cell.forward(x.clone(), false);
        let backward_out = self.backward_cell.forward(x, true);
        Tensor::cat(vec![forward_out, backward_out], 2)
    }
}

/// Stacked bidirectional LSTM with dropout between layers
#[derive(Module, Debug)]
pub struct BiLstm<B: Backend> {
    hidden_size: usize,
    layers: Vec<BiLstmLayer<B>>,
    dropout: Dropout,
}

impl<B: Backend> BiLstm<B> {
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        num_layers: usize,
        dropout: f64,
        device: &B::Device,
    ) -> Self {
        let layers = (0..num_layers.max(1))
            .map(|layer| {
                let layer_input = if layer == 0 { input_size } else { 2 * hidden_size };
                BiLstmLayer::new(layer_input, hidden_size, device)
            })
            .collect();

        Self {
            hidden_size,
            layers,
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn output_size(&self) -> usize {
        2 * self.hidden_size
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let last = self.layers.len() - 1;
        let mut out = x;
        for (index, layer) in self.layers.iter().enumerate() {
            out = layer.forward(out);
            if index < last {
                out = self.dropout.forward(out);
            }
        }
        out
    }
}
