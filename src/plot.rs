use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};
use ndarray::{array, Array2, Axis};
use plotters::prelude::*;

use crate::config::AnalysisConfig;
use crate::csv_reader::TransactionTable;
use crate::kmeans::{self, nearest_centroid};

/// The two projection features rendered when present.
pub const PROJECTION_FEATURES: [&str; 2] = ["V10", "V14"];

// Absolute padding around the data's bounding box.
const BBOX_MARGIN: f64 = 0.1;

// Pastel2-style region palette, cycled over cluster ids.
const REGION_PALETTE: [RGBColor; 8] = [
    RGBColor(179, 226, 205),
    RGBColor(253, 205, 172),
    RGBColor(203, 213, 232),
    RGBColor(244, 202, 228),
    RGBColor(230, 245, 201),
    RGBColor(255, 242, 174),
    RGBColor(241, 226, 204),
    RGBColor(204, 204, 204),
];

/// Render the 2D decision-boundary plot as a base64 PNG. Requires both
/// projection features in the reduced table; a fresh 2D K-Means with the
/// same k and seed is fitted on just those columns so the drawn boundaries
/// match the plotted plane. Strictly best-effort: every failure path logs
/// and yields `None`, leaving the numeric result untouched.
pub fn render_decision_plot(
    table: &TransactionTable,
    k: usize,
    cfg: &AnalysisConfig,
) -> Option<String> {
    let (x, y) = match (
        table.column(PROJECTION_FEATURES[0]),
        table.column(PROJECTION_FEATURES[1]),
    ) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            log::info!(
                "projection features {:?} not present; skipping visualization",
                PROJECTION_FEATURES
            );
            return None;
        }
    };

    let mut points = Array2::zeros((table.n_records(), 2));
    points.column_mut(0).assign(&x);
    points.column_mut(1).assign(&y);

    let outcome = match kmeans::cluster(&points, k, cfg.seed) {
        Ok(outcome) => outcome,
        Err(err) => {
            log::warn!("2D re-fit failed; skipping visualization: {err}");
            return None;
        }
    };

    match render_png(&points, table.labels.as_ref(), &outcome.centroids, cfg) {
        Ok(png) => Some(BASE64.encode(png)),
        Err(err) => {
            log::warn!("rendering failed; skipping visualization: {err}");
            None
        }
    }
}

fn render_png(
    points: &Array2<f64>,
    labels: Option<&ndarray::Array1<usize>>,
    centroids: &Array2<f64>,
    cfg: &AnalysisConfig,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let (width, height) = (cfg.plot_width, cfg.plot_height);
    let res = cfg.grid_resolution.max(2);

    let x_min = fold_min(points.column(0).iter()) - BBOX_MARGIN;
    let x_max = fold_max(points.column(0).iter()) + BBOX_MARGIN;
    let y_min = fold_min(points.column(1).iter()) - BBOX_MARGIN;
    let y_max = fold_max(points.column(1).iter()) + BBOX_MARGIN;
    if !(x_min.is_finite() && x_max.is_finite() && y_min.is_finite() && y_max.is_finite()) {
        return Err("non-finite bounding box".into());
    }
    let x_step = (x_max - x_min) / res as f64;
    let y_step = (y_max - y_min) / res as f64;

    // Cluster id of every grid cell, evaluated at the cell center.
    let mut regions = vec![vec![0usize; res]; res];
    for (i, row) in regions.iter_mut().enumerate() {
        let cx = x_min + (i as f64 + 0.5) * x_step;
        for (j, cell) in row.iter_mut().enumerate() {
            let cy = y_min + (j as f64 + 0.5) * y_step;
            *cell = nearest_centroid(array![cx, cy].view(), centroids.view());
        }
    }

    let mut rgb = vec![0u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        // Filled decision regions.
        chart.draw_series((0..res).flat_map(|i| (0..res).map(move |j| (i, j))).map(
            |(i, j)| {
                let x0 = x_min + i as f64 * x_step;
                let y0 = y_min + j as f64 * y_step;
                Rectangle::new(
                    [(x0, y0), (x0 + x_step, y0 + y_step)],
                    REGION_PALETTE[regions[i][j] % REGION_PALETTE.len()].filled(),
                )
            },
        ))?;

        // Boundary strokes wherever neighboring cells disagree.
        let mut boundary = Vec::new();
        for i in 0..res {
            for j in 0..res {
                let x0 = x_min + i as f64 * x_step;
                let y0 = y_min + j as f64 * y_step;
                if i + 1 < res && regions[i][j] != regions[i + 1][j] {
                    boundary.push(PathElement::new(
                        vec![(x0 + x_step, y0), (x0 + x_step, y0 + y_step)],
                        BLACK,
                    ));
                }
                if j + 1 < res && regions[i][j] != regions[i][j + 1] {
                    boundary.push(PathElement::new(
                        vec![(x0, y0 + y_step), (x0 + x_step, y0 + y_step)],
                        BLACK,
                    ));
                }
            }
        }
        chart.draw_series(boundary)?;

        // Data points colored by true label, not by cluster: the plot is
        // for auditing how well clusters line up with the labels.
        chart.draw_series(points.axis_iter(Axis(0)).enumerate().map(|(row, point)| {
            let positive = labels.map(|l| l[row] == 1).unwrap_or(false);
            let (color, size) = if positive { (RED, 2) } else { (BLACK, 1) };
            Circle::new((point[0], point[1]), size, color.filled())
        }))?;

        // Centroid markers: white disc with a black cross on top.
        chart.draw_series(
            centroids
                .outer_iter()
                .map(|c| Circle::new((c[0], c[1]), 7, WHITE.filled())),
        )?;
        chart.draw_series(
            centroids
                .outer_iter()
                .map(|c| Cross::new((c[0], c[1]), 7, BLACK.stroke_width(2))),
        )?;

        root.present()?;
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(&rgb, width, height, ColorType::Rgb8)?;
    Ok(png)
}

fn fold_min<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.copied().fold(f64::INFINITY, f64::min)
}

fn fold_max<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    values.copied().fold(f64::NEG_INFINITY, f64::max)
}
