// ============================================================
// Layer 5 — Attention Decoder
// ============================================================
// GRU decoder with Luong-style global attention over the
// encoder outputs.
//
// One decode step:
//   1. h_t   = GRU(x_t, h_{t-1})                    [b, 1, H]
//   2. score = s(h_t, h̄_s) for every encoder state   [b, 1, S]
//   3. a_t   = softmax(score) over S
//   4. c_t   = Σ a_t · h̄_s                           [b, 1, H]
//   5. h̃_t   = tanh(W_c [h_t ; c_t])                 [b, 1, H]
//   6. y_t   = W_o h̃_t                               [b, 1, out]
//
// Scoring functions:
//   dot     → h_tᵀ h̄_s
//   general → h_tᵀ W_a h̄_s
//   concat  → v_aᵀ tanh(W_a [h_t ; h̄_s])
//
// Reference: Luong, Pham & Manning (2015)

use std::{fmt, str::FromStr};

use burn::{
    nn::{
        gru::{Gru, GruConfig},
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::softmax,
};
use serde::{Deserialize, Serialize};

use crate::ml::model::{gru_step, DecoderStep, SequenceDecoder};

// ─── AttentionMethod ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionMethod {
    Dot,
    General,
    Concat,
}

impl FromStr for AttentionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot"     => Ok(Self::Dot),
            "general" => Ok(Self::General),
            "concat"  => Ok(Self::Concat),
            other     => Err(format!("unknown attention method '{other}' (dot|general|concat)")),
        }
    }
}

impl fmt::Display for AttentionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Dot     => "dot",
            Self::General => "general",
            Self::Concat  => "concat",
        };
        f.write_str(name)
    }
}

// ─── LuongAttention ───────────────────────────────────────────────────────────
/// Which optional layers are present encodes the scoring method:
/// none → dot, `general` → general, `concat` + `score` → concat.
#[derive(Module, Debug)]
pub struct LuongAttention<B: Backend> {
    pub general: Option<Linear<B>>,
    pub concat:  Option<Linear<B>>,
    pub score:   Option<Linear<B>>,
}

impl<B: Backend> LuongAttention<B> {
    pub fn new(method: AttentionMethod, hidden_size: usize, device: &B::Device) -> Self {
        let linear = |d_in, d_out| Some(LinearConfig::new(d_in, d_out).init(device));
        match method {
            AttentionMethod::Dot => Self { general: None, concat: None, score: None },
            AttentionMethod::General => Self {
                general: linear(hidden_size, hidden_size),
                concat:  None,
                score:   None,
            },
            AttentionMethod::Concat => Self {
                general: None,
                concat:  linear(2 * hidden_size, hidden_size),
                score:   LinearConfig::new(hidden_size, 1).with_bias(false).init(device).into(),
            },
        }
    }

    /// query: [b, 1, H], keys: [b, S, H]
    /// Returns (context [b, 1, H], weights [b, 1, S])
    pub fn forward(&self, query: Tensor<B, 3>, keys: Tensor<B, 3>) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let scores = match (&self.general, &self.concat, &self.score) {
            (Some(w), _, _) => query.matmul(w.forward(keys.clone()).swap_dims(1, 2)),
            (None, Some(w), Some(v)) => {
                let [batch_size, seq_len, hidden_size] = keys.dims();
                let query  = query.expand([batch_size, seq_len, hidden_size]);
                let energy = w.forward(Tensor::cat(vec![query, keys.clone()], 2)).tanh();
                v.forward(energy).swap_dims(1, 2)
            }
            _ => query.matmul(keys.clone().swap_dims(1, 2)),
        };

        let weights = softmax(scores, 2);
        let context = weights.clone().matmul(keys);
        (context, weights)
    }
}

// ─── AttnGruDecoder ───────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct AttnGruDecoderConfig {
    pub output_dim:  usize,
    pub hidden_size: usize,
    pub method:      AttentionMethod,
}

impl AttnGruDecoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AttnGruDecoder<B> {
        AttnGruDecoder {
            gru:        GruConfig::new(self.output_dim, self.hidden_size, true).init(device),
            attention:  LuongAttention::new(self.method, self.hidden_size, device),
            combine:    LinearConfig::new(2 * self.hidden_size, self.hidden_size).init(device),
            projection: LinearConfig::new(self.hidden_size, self.output_dim).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct AttnGruDecoder<B: Backend> {
    pub gru:        Gru<B>,
    pub attention:  LuongAttention<B>,
    pub combine:    Linear<B>,
    pub projection: Linear<B>,
}

impl<B: Backend> SequenceDecoder<B> for AttnGruDecoder<B> {
    fn decode_step(
        &self,
        input:           Tensor<B, 3>,
        hidden:          Tensor<B, 3>,
        encoder_outputs: &Tensor<B, 3>,
    ) -> DecoderStep<B> {
        let hidden  = gru_step(&self.gru, input, hidden);
        let rnn_out = hidden.clone().swap_dims(0, 1);                       // [b, 1, H]

        let keys         = encoder_outputs.clone().swap_dims(0, 1);         // [b, S, H]
        let (context, _) = self.attention.forward(rnn_out.clone(), keys);

        let combined = self
            .combine
            .forward(Tensor::cat(vec![rnn_out.clone(), context], 2))
            .tanh();
        let output = self.projection.forward(combined).swap_dims(0, 1);

        DecoderStep { output, hidden }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray;

    #[test]
    fn test_method_parsing() {
        assert_eq!("dot".parse::<AttentionMethod>(), Ok(AttentionMethod::Dot));
        assert_eq!("General".parse::<AttentionMethod>(), Ok(AttentionMethod::General));
        assert!("bahdanau".parse::<AttentionMethod>().is_err());
    }

    #[test]
    fn test_weights_sum_to_one() {
        let device = Default::default();
        let query  = Tensor::<B, 3>::random([2, 1, 4], Distribution::Default, &device);
        let keys   = Tensor::<B, 3>::random([2, 5, 4], Distribution::Default, &device);

        for method in [AttentionMethod::Dot, AttentionMethod::General, AttentionMethod::Concat] {
            let attn = LuongAttention::<B>::new(method, 4, &device);
            let (context, weights) = attn.forward(query.clone(), keys.clone());
            assert_eq!(context.dims(), [2, 1, 4]);
            assert_eq!(weights.dims(), [2, 1, 5]);

            let sums = weights.sum_dim(2).into_data().to_vec::<f32>().unwrap();
            for s in sums {
                assert!((s - 1.0).abs() < 1e-5, "{method}: weights sum to {s}");
            }
        }
    }

    #[test]
    fn test_decoder_hidden_feeds_next_step() {
        let device  = Default::default();
        let decoder = AttnGruDecoderConfig::new(3, 4, AttentionMethod::Dot).init::<B>(&device);
        let input   = Tensor::<B, 3>::ones([1, 2, 3], &device);
        let enc     = Tensor::<B, 3>::random([5, 2, 4], Distribution::Default, &device);

        let cold = decoder.decode_step(input.clone(), Tensor::zeros([1, 2, 4], &device), &enc);
        let warm = decoder.decode_step(input, Tensor::ones([1, 2, 4], &device), &enc);

        let diff = (cold.hidden - warm.hidden).abs().sum().into_scalar();
        assert!(diff > 1e-4);
    }

    #[test]
    fn test_decoder_contract_shapes() {
        let device  = Default::default();
        let decoder = AttnGruDecoderConfig::new(3, 8, AttentionMethod::General).init::<B>(&device);
        let input   = Tensor::<B, 3>::ones([1, 2, 3], &device);
        let hidden  = Tensor::<B, 3>::zeros([1, 2, 8], &device);
        let enc     = Tensor::<B, 3>::random([6, 2, 8], Distribution::Default, &device);

        let step = decoder.decode_step(input, hidden, &enc);
        assert_eq!(step.output.dims(), [1, 2, 3]);
        assert_eq!(step.hidden.dims(), [1, 2, 8]);
    }
}
