//! End-to-end workflow on synthetic match data: inspect the feature and
//! target distributions, run the Adam training loop on a stand-in model, and
//! chart the ELBO trace. Figures land in `target/demo/`.
//!
//! Run with `cargo run --example workflow`.

use candle_core::{DType, Device, Tensor, Var};
use ndarray::Array;
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;

use scoregp::{
    optimise_with_adam, plot_elbos, plot_feature_distributions, plot_target_scatter, MatchData,
    ScoreGpError, TrainingParams, VariationalModel, DEFAULT_BINS, DEFAULT_FIG_SIZE, PALETTE,
};

/// Stand-in for an externally-defined SVGP: a linear-Gaussian model trained
/// by mean squared error.
struct LinearModel {
    w: Var,
    b: Var,
}

impl LinearModel {
    fn new(device: &Device) -> candle_core::Result<Self> {
        Ok(LinearModel {
            w: Var::zeros((2, 2), DType::F64, device)?,
            b: Var::zeros((1, 2), DType::F64, device)?,
        })
    }
}

impl VariationalModel for LinearModel {
    fn trainable_variables(&self) -> Vec<Var> {
        vec![self.w.clone(), self.b.clone()]
    }

    fn training_loss(&self, x: &Tensor, y: &Tensor) -> candle_core::Result<Tensor> {
        let pred = x
            .matmul(self.w.as_tensor())?
            .broadcast_add(self.b.as_tensor())?;
        (pred - y)?.sqr()?.mean_all()
    }
}

fn synthetic_data(n: usize) -> Result<MatchData, ScoreGpError> {
    let mut rng = Xoshiro256Plus::seed_from_u64(0);
    let x = Array::random_using(n, Uniform::new(-1., 1.), &mut rng);
    let y = Array::random_using(n, Uniform::new(-1., 1.), &mut rng);
    // Scores loosely driven by the features so the charts have structure
    let ft_home = x.mapv(|v: f64| ((2.5 + 2. * v).round().clamp(0., 5.)) as u8);
    let ft_away = y.mapv(|v: f64| ((1.5 + 1.5 * v).round().clamp(0., 5.)) as u8);
    MatchData::from_columns(x, y, ft_home, ft_away)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let data = synthetic_data(500)?;
    let out_dir = "target/demo";
    std::fs::create_dir_all(out_dir)?;

    let features = plot_feature_distributions(&data, DEFAULT_BINS, DEFAULT_FIG_SIZE)?;
    std::fs::write(format!("{out_dir}/features.svg"), features)?;

    let scatter = plot_target_scatter(&data, DEFAULT_FIG_SIZE)?;
    std::fs::write(format!("{out_dir}/targets.svg"), scatter)?;

    let model = LinearModel::new(&Device::Cpu)?;
    let params = TrainingParams::new()
        .set_lr(0.05)
        .set_batch_size(100)
        .set_iters(500);
    let elbos = optimise_with_adam(&model, &data.regression_data(), &params)?;
    println!(
        "trained for {} iterations, final elbo = {:.4}",
        elbos.len(),
        elbos.last().copied().unwrap_or(f64::NAN)
    );

    let curve = plot_elbos(&elbos, &PALETTE[0], DEFAULT_FIG_SIZE)?;
    std::fs::write(format!("{out_dir}/elbos.svg"), curve)?;

    println!("figures written to {out_dir}/");
    Ok(())
}
