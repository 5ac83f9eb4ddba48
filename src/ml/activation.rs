use std::str::FromStr;

use anyhow::{bail, Result};
use burn::{prelude::*, tensor::activation};

/// Element-wise (or last-axis, for softmax) non-linearity selected by name.
#[derive(Config, Debug, PartialEq)]
pub enum Activation {
    Linear,
    Relu,
    Gelu,
    Tanh,
    Sigmoid,
    Swish,
    Softmax,
}

impl Activation {
    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Linear  => x,
            Activation::Relu    => activation::relu(x),
            Activation::Gelu    => activation::gelu(x),
            Activation::Tanh    => activation::tanh(x),
            Activation::Sigmoid => activation::sigmoid(x),
            Activation::Swish   => activation::silu(x),
            Activation::Softmax => activation::softmax(x, D - 1),
        }
    }
}

impl FromStr for Activation {
    type Err = anyhow::Error;

    /// Accepts the names used in bert_config.json files.
    fn from_str(name: &str) -> Result<Self> {
        let act = match name.to_ascii_lowercase().as_str() {
            "linear" | "identity" => Activation::Linear,
            "relu"                => Activation::Relu,
            "gelu" | "gelu_new"   => Activation::Gelu,
            "tanh"                => Activation::Tanh,
            "sigmoid"             => Activation::Sigmoid,
            "swish" | "silu"      => Activation::Swish,
            "softmax"             => Activation::Softmax,
            other => bail!("Unknown activation '{other}'"),
        };
        Ok(act)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_parse_names() {
        assert_eq!("gelu".parse::<Activation>().unwrap(), Activation::Gelu);
        assert_eq!("SiLU".parse::<Activation>().unwrap(), Activation::Swish);
        assert!("mish".parse::<Activation>().is_err());
    }

    #[test]
    fn test_softmax_uses_last_axis() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 2>::from_floats([[1.0, 2.0, 3.0], [0.0, 0.0, 0.0]], &device);
        let y: Vec<f32> = Activation::Softmax.apply(x).into_data().iter::<f32>().collect();

        assert_abs_diff_eq!(y[0] + y[1] + y[2], 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(y[3], 1.0 / 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_linear_is_identity() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats([-1.0, 0.5], &device);
        let y: Vec<f32> = Activation::Linear.apply(x).into_data().iter::<f32>().collect();
        assert_eq!(y, vec![-1.0, 0.5]);
    }
}
