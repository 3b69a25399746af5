// ============================================================
// Layer 5 — Model Adapter
// ============================================================
// The batch loss engine never looks inside a network; it only
// relies on these two call contracts (all tensors time-major):
//
//   encoder: input [seq, batch, in]
//            → outputs [seq, batch, hidden], hidden [1, batch, hidden]
//
//   decoder: input [1, batch, out], hidden [1, batch, hidden],
//            encoder outputs [seq, batch, hidden]
//            → output [1, batch, out], hidden [1, batch, hidden]
//
// A plain decoder ignores the encoder outputs; an attention
// decoder attends over them. Which one runs is decided by the
// decoder type chosen at start-up.
//
// Reference: Burn Book §3 (Building Blocks)
//            Cho et al. (2014) GRU encoder-decoder

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// ─── Call contracts ───────────────────────────────────────────────────────────

pub struct EncoderOutput<B: Backend> {
    /// Per-timestep encoder states: [seq, batch, hidden]
    pub outputs: Tensor<B, 3>,
    /// Final state, seeds the decoder: [1, batch, hidden]
    pub hidden:  Tensor<B, 3>,
}

pub struct DecoderStep<B: Backend> {
    /// Prediction for this timestep: [1, batch, out]
    pub output: Tensor<B, 3>,
    /// State carried to the next timestep: [1, batch, hidden]
    pub hidden: Tensor<B, 3>,
}

pub trait SequenceEncoder<B: Backend> {
    fn encode(&self, input: Tensor<B, 3>) -> EncoderOutput<B>;
}

pub trait SequenceDecoder<B: Backend> {
    fn decode_step(
        &self,
        input:           Tensor<B, 3>,
        hidden:          Tensor<B, 3>,
        encoder_outputs: &Tensor<B, 3>,
    ) -> DecoderStep<B>;
}

/// The encoder/decoder pair trained together.
#[derive(Debug, Clone)]
pub struct Seq2Seq<E, D> {
    pub encoder: E,
    pub decoder: D,
}

impl<E, D> Seq2Seq<E, D> {
    pub fn new(encoder: E, decoder: D) -> Self {
        Self { encoder, decoder }
    }
}

// ─── GRU encoder ──────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct GruEncoderConfig {
    pub input_dim:   usize,
    pub hidden_size: usize,
    #[config(default = 0.0)]
    pub dropout:     f64,
}

impl GruEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruEncoder<B> {
        GruEncoder {
            gru:     GruConfig::new(self.input_dim, self.hidden_size, true).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct GruEncoder<B: Backend> {
    pub gru:     Gru<B>,
    pub dropout: Dropout,
}

impl<B: Backend> SequenceEncoder<B> for GruEncoder<B> {
    fn encode(&self, input: Tensor<B, 3>) -> EncoderOutput<B> {
        let [seq_len, batch_size, _] = input.dims();
        let hidden_size = self.gru.d_hidden;

        let mut hidden = Tensor::zeros([1, batch_size, hidden_size], &input.device());
        let mut states = Vec::with_capacity(seq_len);
        for frame in input.iter_dim(0) {
            hidden = gru_step(&self.gru, frame, hidden);
            states.push(hidden.clone());
        }

        let outputs = self.dropout.forward(Tensor::cat(states, 0));
        EncoderOutput { outputs, hidden }
    }
}

/// One recurrent update: input [1, batch, in], hidden [1, batch, H]
/// → new hidden [1, batch, H].
///
/// Burn's `Gru::forward` reads the state of every timestep from the
/// initial state tensor, so sequences are fed one frame at a time.
pub fn gru_step<B: Backend>(gru: &Gru<B>, input: Tensor<B, 3>, hidden: Tensor<B, 3>) -> Tensor<B, 3> {
    gru.forward(input.swap_dims(0, 1), Some(hidden.swap_dims(0, 1)))
        .swap_dims(0, 1)
}

// ─── Plain GRU decoder ────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct GruDecoderConfig {
    pub output_dim:  usize,
    pub hidden_size: usize,
}

impl GruDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> GruDecoder<B> {
        GruDecoder {
            gru:        GruConfig::new(self.output_dim, self.hidden_size, true).init(device),
            projection: LinearConfig::new(self.hidden_size, self.output_dim).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct GruDecoder<B: Backend> {
    pub gru:        Gru<B>,
    pub projection: Linear<B>,
}

impl<B: Backend> SequenceDecoder<B> for GruDecoder<B> {
    fn decode_step(
        &self,
        input:            Tensor<B, 3>,
        hidden:           Tensor<B, 3>,
        _encoder_outputs: &Tensor<B, 3>,
    ) -> DecoderStep<B> {
        let hidden = gru_step(&self.gru, input, hidden);
        let output = self.projection.forward(hidden.clone());
        DecoderStep { output, hidden }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    #[test]
    fn test_encoder_contract_shapes() {
        let device  = Default::default();
        let encoder = GruEncoderConfig::new(5, 8).init::<B>(&device);
        let input   = Tensor::<B, 3>::ones([6, 2, 5], &device);

        let out = encoder.encode(input);
        assert_eq!(out.outputs.dims(), [6, 2, 8]);
        assert_eq!(out.hidden.dims(), [1, 2, 8]);
    }

    #[test]
    fn test_final_hidden_is_last_encoder_state() {
        let device  = Default::default();
        let encoder = GruEncoderConfig::new(3, 4).init::<B>(&device);
        let input   = Tensor::<B, 3>::random([5, 2, 3], burn::tensor::Distribution::Default, &device);

        let out  = encoder.encode(input);
        let last = out.outputs.slice([4..5, 0..2, 0..4]);
        out.hidden.into_data().assert_approx_eq(&last.into_data(), 5);
    }

    #[test]
    fn test_encoder_carries_state_across_frames() {
        let device  = Default::default();
        let encoder = GruEncoderConfig::new(1, 4).init::<B>(&device);
        let quiet   = Tensor::<B, 3>::from_floats([[[0.0]], [[0.0]], [[0.0]], [[1.0]]], &device);
        let busy    = Tensor::<B, 3>::from_floats([[[5.0]], [[-3.0]], [[9.0]], [[1.0]]], &device);

        let quiet = encoder.encode(quiet).hidden.into_data().to_vec::<f32>().unwrap();
        let busy  = encoder.encode(busy).hidden.into_data().to_vec::<f32>().unwrap();

        // same last frame, different history
        let diff: f32 = quiet.iter().zip(&busy).map(|(a, b)| (a - b).abs()).sum();
        assert!(diff > 1e-4, "final hidden ignores earlier frames: {quiet:?}");
    }

    #[test]
    fn test_encoder_matches_manual_unroll() {
        let device  = Default::default();
        let encoder = GruEncoderConfig::new(3, 4).init::<B>(&device);
        let input   = Tensor::<B, 3>::random([3, 2, 3], burn::tensor::Distribution::Default, &device);

        let mut hidden = Tensor::<B, 3>::zeros([1, 2, 4], &device);
        for t in 0..3 {
            let frame = input.clone().slice([t..t + 1, 0..2, 0..3]);
            hidden = gru_step(&encoder.gru, frame, hidden);
        }

        let out = encoder.encode(input);
        out.hidden.into_data().assert_approx_eq(&hidden.into_data(), 5);
    }

    #[test]
    fn test_decoder_uses_incoming_hidden() {
        let device  = Default::default();
        let decoder = GruDecoderConfig::new(3, 4).init::<B>(&device);
        let input   = Tensor::<B, 3>::ones([1, 2, 3], &device);
        let enc     = Tensor::<B, 3>::zeros([5, 2, 4], &device);

        let cold = decoder.decode_step(input.clone(), Tensor::zeros([1, 2, 4], &device), &enc);
        let warm = decoder.decode_step(input, Tensor::ones([1, 2, 4], &device), &enc);

        let diff = (cold.output - warm.output).abs().sum().into_scalar();
        assert!(diff > 1e-4);
    }

    #[test]
    fn test_decoder_contract_shapes() {
        let device  = Default::default();
        let decoder = GruDecoderConfig::new(3, 8).init::<B>(&device);
        let input   = Tensor::<B, 3>::ones([1, 2, 3], &device);
        let hidden  = Tensor::<B, 3>::zeros([1, 2, 8], &device);
        let enc     = Tensor::<B, 3>::zeros([6, 2, 8], &device);

        let step = decoder.decode_step(input, hidden, &enc);
        assert_eq!(step.output.dims(), [1, 2, 3]);
        assert_eq!(step.hidden.dims(), [1, 2, 8]);
    }
}
