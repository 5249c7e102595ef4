//! Evaluation metrics for node classification.

use crate::{Error, Result};
use candle_core::{Tensor, D};

/// Fraction of rows whose arg-max logit matches the target class.
pub fn accuracy(logits: &Tensor, targets: &[u32]) -> Result<f32> {
    let (rows, _) = logits.dims2()?;
    if rows != targets.len() {
        return Err(Error::BatchMismatch {
            nodes: rows,
            targets: targets.len(),
        });
    }
    if rows == 0 {
        return Err(Error::EmptyBatch("accuracy"));
    }

    let predicted = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;
    let correct = predicted
        .iter()
        .zip(targets)
        .filter(|(p, t)| p == t)
        .count();

    Ok(correct as f32 / rows as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_accuracy() {
        let logits = Tensor::from_vec(
            vec![0.9f32, 0.1, 0.2, 0.8, 0.7, 0.3],
            (3, 2),
            &Device::Cpu,
        )
        .unwrap();

        let acc = accuracy(&logits, &[0, 1, 1]).unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_accuracy_rejects_mismatch() {
        let logits = Tensor::zeros((2, 2), candle_core::DType::F32, &Device::Cpu).unwrap();
        assert!(accuracy(&logits, &[0]).is_err());
    }
}
