//! Objectives for unsupervised (edge-contrastive) training.
//!
//! True edge endpoints should embed close together; sampled non-edges
//! should not. Scores are dot products between L2-normalized
//! embeddings, pushed through a logistic loss:
//!
//! ```text
//! L = -mean(log sigma(src . dst)) - mean(log sigma(-src . neg))
//! ```
//!
//! The supervised objective (log-softmax + NLL) lives inside
//! [`SupervisedGraphSage::backward`](crate::SupervisedGraphSage::backward),
//! next to the gradient collection it feeds.

use crate::{Error, Result};
use candle_core::Tensor;
use candle_nn::ops;

/// Floor for probabilities before the log, so a fully-confident wrong
/// pair yields a large finite loss instead of infinity.
const LOG_EPS: f64 = 1e-15;

fn check_pairs(src: &Tensor, dst: &Tensor) -> Result<(usize, usize)> {
    let (n, dim) = src.dims2()?;
    let (dn, ddim) = dst.dims2()?;
    if n != dn || dim != ddim {
        return Err(Error::Shape(format!(
            "src is {n}x{dim} but dst is {dn}x{ddim}"
        )));
    }
    if n == 0 {
        return Err(Error::EmptyBatch("pairwise loss"));
    }
    Ok((n, dim))
}

/// Row-wise dot products between two aligned embedding matrices.
fn pair_scores(src: &Tensor, dst: &Tensor) -> Result<Tensor> {
    Ok((src * dst)?.sum(1)?)
}

/// Mean `-log sigma(scores)`.
fn logistic_loss(scores: &Tensor) -> Result<Tensor> {
    let probs = ops::sigmoid(scores)?.maximum(LOG_EPS)?;
    Ok(probs.log()?.neg()?.mean_all()?)
}

/// Pairwise similarity loss over true edge endpoint embeddings.
///
/// `src[i]` and `dst[i]` are the embeddings of the two endpoints of
/// edge `i`. Lower is better; identical unit vectors score
/// `-log sigma(1)`.
pub fn pairwise_loss(src: &Tensor, dst: &Tensor) -> Result<Tensor> {
    check_pairs(src, dst)?;
    logistic_loss(&pair_scores(src, dst)?)
}

/// Pairwise loss with sampled negatives.
///
/// `negatives` holds `num_negatives` consecutive rows per source (the
/// layout [`sagre_core::negative_sampling`] produces), so its row count
/// must be a multiple of `src`'s. True pairs are pulled together,
/// source/negative pairs pushed apart.
pub fn pairwise_loss_with_negatives(
    src: &Tensor,
    dst: &Tensor,
    negatives: &Tensor,
) -> Result<Tensor> {
    let (n, dim) = check_pairs(src, dst)?;
    let (total, ndim) = negatives.dims2()?;
    if ndim != dim || total == 0 || total % n != 0 {
        return Err(Error::Shape(format!(
            "negatives are {total}x{ndim}, expected a positive multiple of {n} rows of width {dim}"
        )));
    }
    let k = total / n;

    let positive = logistic_loss(&pair_scores(src, dst)?)?;

    // Repeat each source row k times to align with its negatives.
    let src_rep = src
        .unsqueeze(1)?
        .broadcast_as((n, k, dim))?
        .contiguous()?
        .reshape((n * k, dim))?;
    let negative = logistic_loss(&pair_scores(&src_rep, negatives)?.neg()?)?;

    Ok((positive + negative)?)
}
