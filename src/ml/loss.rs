// ============================================================
// Layer 5 — Loss Criteria
// ============================================================
// Per-timestep regression losses used by the batch loss engine
// and the zero-velocity baseline. Both reduce with the mean over
// every element, so the batch dimension never shows up in the
// reported number.
//
//   L1  = mean |y - ŷ|
//   MSE = mean (y - ŷ)²

use std::{fmt, str::FromStr};

use burn::{
    nn::loss::{MseLoss, Reduction},
    prelude::*,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    #[default]
    L1,
    Mse,
}

impl Criterion {
    /// Mean-reduced loss, shape [1]
    pub fn forward<B: Backend, const D: usize>(
        &self,
        output: Tensor<B, D>,
        target: Tensor<B, D>,
    ) -> Tensor<B, 1> {
        match self {
            Self::L1  => (output - target).abs().mean(),
            Self::Mse => MseLoss::new().forward(output, target, Reduction::Mean),
        }
    }
}

impl FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l1"  => Ok(Self::L1),
            "mse" => Ok(Self::Mse),
            other => Err(format!("unknown loss '{other}' (l1|mse)")),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::L1  => "l1",
            Self::Mse => "mse",
        })
    }
}

// ─── Quaternion normalisation ─────────────────────────────────────────────────

const NORM_EPSILON: f32 = 1e-12;

/// L2-normalise every consecutive group of 4 scalars along the
/// last axis. The caller guarantees that the last axis is a
/// multiple of 4. All-zero groups stay zero.
pub fn normalize_quaternions<B: Backend>(tensor: Tensor<B, 3>) -> Tensor<B, 3> {
    let dims   = tensor.dims();
    let groups = tensor.shape().num_elements() / 4;

    let quats = tensor.reshape([groups, 4]);
    let norm  = quats
        .clone()
        .powf_scalar(2.0)
        .sum_dim(1)
        .sqrt()
        .clamp_min(NORM_EPSILON);

    (quats / norm).reshape(dims)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn tensor(values: Vec<f32>, shape: [usize; 3]) -> Tensor<B, 3> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn scalar(t: Tensor<B, 1>) -> f32 {
        t.into_scalar()
    }

    #[test]
    fn test_l1_is_mean_absolute_error() {
        let out = tensor(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]);
        let tgt = tensor(vec![0.0, 2.0, 5.0, 4.0], [1, 2, 2]);
        assert!((scalar(Criterion::L1.forward(out, tgt)) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_mse_is_mean_squared_error() {
        let out = tensor(vec![1.0, 2.0, 3.0, 4.0], [1, 2, 2]);
        let tgt = tensor(vec![0.0, 2.0, 5.0, 4.0], [1, 2, 2]);
        assert!((scalar(Criterion::Mse.forward(out, tgt)) - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_criterion_parsing() {
        assert_eq!("L1".parse::<Criterion>(), Ok(Criterion::L1));
        assert_eq!("mse".parse::<Criterion>(), Ok(Criterion::Mse));
        assert!("huber".parse::<Criterion>().is_err());
        assert_eq!(Criterion::default(), Criterion::L1);
    }

    #[test]
    fn test_quaternions_become_unit_length() {
        let t = tensor(vec![3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 2.0], [1, 1, 8]);
        let n = normalize_quaternions(t).into_data().to_vec::<f32>().unwrap();
        let expected = [0.6, 0.8, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        for (a, b) in n.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_quaternion_stays_zero() {
        let t = tensor(vec![0.0; 4], [1, 1, 4]);
        let n = normalize_quaternions(t).into_data().to_vec::<f32>().unwrap();
        assert_eq!(n, vec![0.0; 4]);
    }
}
