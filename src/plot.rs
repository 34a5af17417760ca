//! Plotting helpers rendering charts to in-memory SVG.
//!
//! Each helper draws through plotters' SVG backend and returns the rendered
//! document as a `String`, leaving it to the caller to write it wherever the
//! session keeps its figures.

use ndarray::Array1;
use ndarray_stats::QuantileExt;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::dataset::{MatchData, Side, MAX_SCORE};
use crate::errors::{Result, ScoreGpError};
use crate::types::FigSize;

/// First four entries of the matplotlib default colour cycle.
pub const PALETTE: [RGBColor; 4] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
];

/// Default number of histogram bins for continuous features.
pub const DEFAULT_BINS: usize = 100;

fn plot_err<E: std::fmt::Display>(e: E) -> ScoreGpError {
    ScoreGpError::PlotError(e.to_string())
}

/// Plot histograms of the continuous features and bar charts of the discrete
/// score targets on a 2x2 grid.
pub fn plot_feature_distributions(
    data: &MatchData,
    bins: usize,
    figsize: FigSize,
) -> Result<String> {
    if data.is_empty() {
        return Err(ScoreGpError::InvalidValue(
            "nothing to plot: dataset is empty".to_string(),
        ));
    }
    if bins == 0 {
        return Err(ScoreGpError::InvalidValue(
            "bins should be positive".to_string(),
        ));
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, figsize).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let panels = root.split_evenly((2, 2));

        draw_histogram(&panels[0], "x", data.x(), bins, &PALETTE[0])?;
        draw_histogram(&panels[1], "y", data.y(), bins, &PALETTE[1])?;
        draw_score_bars(&panels[2], "ft_home", &data.score_counts(Side::Home), &PALETTE[2])?;
        draw_score_bars(&panels[3], "ft_away", &data.score_counts(Side::Away), &PALETTE[3])?;

        root.present().map_err(plot_err)?;
    }
    Ok(svg)
}

/// Plot a 2D scatter of the `(ft_home, ft_away)` score pairs, point size
/// scaled by pair frequency.
pub fn plot_target_scatter(data: &MatchData, figsize: FigSize) -> Result<String> {
    if data.is_empty() {
        return Err(ScoreGpError::InvalidValue(
            "nothing to plot: dataset is empty".to_string(),
        ));
    }
    let pairs = data.score_pair_counts();
    let max_count = pairs.values().copied().max().unwrap_or(1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, figsize).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption("full-time scores", ("sans-serif", 16))
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(-0.5f64..MAX_SCORE as f64 + 0.5, -0.5f64..MAX_SCORE as f64 + 0.5)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("ft_home")
            .y_desc("ft_away")
            .disable_mesh()
            .draw()
            .map_err(plot_err)?;
        chart
            .draw_series(pairs.iter().map(|(&(h, a), &c)| {
                let radius = (3. + 12. * c as f64 / max_count as f64) as i32;
                Circle::new((h as f64, a as f64), radius, PALETTE[0].mix(0.6).filled())
            }))
            .map_err(plot_err)?;
        root.present().map_err(plot_err)?;
    }
    Ok(svg)
}

/// Plot ELBO vs. number of training iterations.
pub fn plot_elbos(elbos: &[f64], colour: &RGBColor, figsize: FigSize) -> Result<String> {
    if elbos.is_empty() {
        return Err(ScoreGpError::InvalidValue(
            "nothing to plot: no ELBO values".to_string(),
        ));
    }
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &e in elbos {
        lo = lo.min(e);
        hi = hi.max(e);
    }
    if !(hi > lo) {
        lo -= 0.5;
        hi += 0.5;
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, figsize).into_drawing_area();
        root.fill(&WHITE).map_err(plot_err)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0..elbos.len(), lo..hi)
            .map_err(plot_err)?;
        chart
            .configure_mesh()
            .x_desc("iteration")
            .y_desc("ELBO")
            .disable_mesh()
            .draw()
            .map_err(plot_err)?;
        chart
            .draw_series(LineSeries::new(
                elbos.iter().enumerate().map(|(i, &e)| (i, e)),
                colour,
            ))
            .map_err(plot_err)?;
        root.present().map_err(plot_err)?;
    }
    Ok(svg)
}

fn draw_histogram<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    values: &Array1<f64>,
    bins: usize,
    colour: &RGBColor,
) -> Result<()> {
    let lo = *values.min().map_err(plot_err)?;
    let hi = *values.max().map_err(plot_err)?;
    let span = if hi > lo { hi - lo } else { 1. };

    let mut counts = vec![0usize; bins];
    for &v in values.iter() {
        let b = (((v - lo) / span) * bins as f64) as usize;
        counts[b.min(bins - 1)] += 1;
    }
    let ymax = counts.iter().copied().max().unwrap_or(1).max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 16))
        .margin(5)
        .x_label_area_size(25)
        .y_label_area_size(35)
        .build_cartesian_2d(lo..lo + span, 0usize..ymax + 1)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .disable_mesh()
        .draw()
        .map_err(plot_err)?;

    let width = span / bins as f64;
    chart
        .draw_series(counts.iter().enumerate().map(|(i, &c)| {
            let x0 = lo + i as f64 * width;
            Rectangle::new([(x0, 0), (x0 + width, c)], colour.mix(0.8).filled())
        }))
        .map_err(plot_err)?;
    Ok(())
}

fn draw_score_bars<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
    counts: &[usize; MAX_SCORE as usize + 1],
    colour: &RGBColor,
) -> Result<()> {
    let ymax = counts.iter().copied().max().unwrap_or(1).max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 16))
        .margin(5)
        .x_label_area_size(25)
        .y_label_area_size(35)
        .build_cartesian_2d(-0.5f64..MAX_SCORE as f64 + 0.5, 0usize..ymax + 1)
        .map_err(plot_err)?;
    chart
        .configure_mesh()
        .x_labels(MAX_SCORE as usize + 1)
        .disable_mesh()
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(score, &c)| {
            let x = score as f64;
            Rectangle::new([(x - 0.4, 0), (x + 0.4, c)], colour.mix(0.8).filled())
        }))
        .map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::MatchData;
    use crate::types::DEFAULT_FIG_SIZE;
    use ndarray::array;

    fn sample_data() -> MatchData {
        MatchData::from_columns(
            array![0.1, 0.4, 0.9, 0.3],
            array![1.2, -0.5, 0.3, 0.0],
            array![0u8, 2, 5, 2],
            array![1u8, 1, 0, 3],
        )
        .expect("sample data")
    }

    #[test]
    fn test_feature_distributions_render() {
        let svg = plot_feature_distributions(&sample_data(), 10, DEFAULT_FIG_SIZE)
            .expect("plot error");
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_target_scatter_renders() {
        let svg = plot_target_scatter(&sample_data(), DEFAULT_FIG_SIZE).expect("plot error");
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_elbo_curve_renders() {
        let elbos: Vec<f64> = (0..50).map(|i| -1. / (i + 1) as f64).collect();
        let svg = plot_elbos(&elbos, &PALETTE[0], DEFAULT_FIG_SIZE).expect("plot error");
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_constant_elbos_render() {
        // degenerate y range should still produce a chart
        let svg = plot_elbos(&[1.0, 1.0, 1.0], &PALETTE[1], DEFAULT_FIG_SIZE).expect("plot error");
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_empty_elbos_rejected() {
        assert!(plot_elbos(&[], &PALETTE[0], DEFAULT_FIG_SIZE).is_err());
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let empty = MatchData::from_columns(
            ndarray::Array1::<f64>::zeros(0),
            ndarray::Array1::<f64>::zeros(0),
            ndarray::Array1::<u8>::zeros(0),
            ndarray::Array1::<u8>::zeros(0),
        )
        .expect("empty data");
        assert!(plot_feature_distributions(&empty, 10, DEFAULT_FIG_SIZE).is_err());
        assert!(plot_target_scatter(&empty, DEFAULT_FIG_SIZE).is_err());
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(plot_feature_distributions(&sample_data(), 0, DEFAULT_FIG_SIZE).is_err());
    }
}
