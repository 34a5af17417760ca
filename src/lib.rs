//! Utilities supporting a sparse variational Gaussian process (SVGP) regression
//! workflow over football match scores.
//!
//! The statistical model itself is an external collaborator: anything exposing
//! trainable variables and a mini-batch training loss through the
//! [`VariationalModel`] trait can be driven by [`optimise_with_adam`], which
//! delegates batching, gradients and the Adam step to
//! [candle](https://github.com/huggingface/candle) and records the ELBO once
//! per iteration. Around that call the crate provides the glue a modelling
//! session needs: a columnar [`MatchData`] container with the expected
//! columns (two continuous features, two full-time score counts), and
//! [plotters](https://github.com/plotters-rs/plotters)-based helpers to chart
//! feature distributions, the score targets and the ELBO trace.
//!
//! No kernel, inference algorithm or optimiser is implemented here.

mod dataset;
mod errors;
mod plot;
mod train;
mod types;

pub use dataset::*;
pub use errors::*;
pub use plot::*;
pub use train::*;
pub use types::*;
