//! Summary plots. Each plot is a single line-and-marker series against the offered load in Mbps,
//! drawn as SVG and saved as PDF.

use std::ops::Range;
use std::path::{Path, PathBuf};

use giant_core::units::BitsPerSec;
use log::info;
use plotters::prelude::*;
use svg2pdf::usvg;

/// The plots a sweep can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plot {
    /// Mean end-to-end delay per load.
    AverageDelay,
    /// Lost packets per load.
    LostPackets,
    /// Wall-clock simulation time per load.
    ProcessingTimes,
}

impl Plot {
    /// The plot title.
    pub fn title(&self) -> &'static str {
        match self {
            Plot::AverageDelay => "Delay vs Offered Load for Giant Engine",
            Plot::LostPackets => "Number of Lost Packets vs Offered Load for Giant Engine",
            Plot::ProcessingTimes => "Processing Time vs Offered Load for Giant Engine",
        }
    }

    /// The y-axis label.
    pub fn y_label(&self) -> &'static str {
        match self {
            Plot::AverageDelay => "Delay (ms)",
            Plot::LostPackets => "Packets Lost",
            Plot::ProcessingTimes => "Processing Times (s)",
        }
    }

    /// The file the plot is saved to.
    pub fn file_name(&self) -> &'static str {
        match self {
            Plot::AverageDelay => "giant-average-delay.pdf",
            Plot::LostPackets => "giant-lost-packets.pdf",
            Plot::ProcessingTimes => "giant-processing-times.pdf",
        }
    }
}

/// Renders `plot` into `dir`, returning the path of the written file. Points without a value
/// are left out.
pub fn render(
    plot: Plot,
    dir: impl AsRef<Path>,
    points: &[(BitsPerSec, Option<f64>)],
) -> Result<PathBuf, PlotError> {
    let path = dir.as_ref().join(plot.file_name());
    let points = points
        .iter()
        .filter_map(|&(load, y)| y.filter(|y| y.is_finite()).map(|y| (load.into_mbps(), y)))
        .collect::<Vec<_>>();
    if points.is_empty() {
        return Err(PlotError::NoPoints(plot.file_name()));
    }
    let svg = draw(plot, &points).map_err(|e| PlotError::Draw(e.to_string()))?;
    let pdf = svg_to_pdf(&svg)?;
    std::fs::write(&path, pdf).map_err(|source| PlotError::Io {
        path: path.clone(),
        source,
    })?;
    info!("Saved {}", path.display());
    Ok(path)
}

fn draw(plot: Plot, points: &[(f64, f64)]) -> Result<String, Box<dyn std::error::Error>> {
    let mut svg = String::new();
    draw_into(plot, points, &mut svg)?;
    Ok(svg)
}

fn draw_into(
    plot: Plot,
    points: &[(f64, f64)],
    svg: &mut String,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(plot.title(), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range(points), y_range(points))?;
    chart
        .configure_mesh()
        .x_desc("Load (Mbps)")
        .y_desc(plot.y_label())
        .draw()?;
    chart.draw_series(LineSeries::new(points.iter().copied(), &BLUE))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 4, BLUE.filled())))?;
    root.present()?;
    Ok(())
}

fn svg_to_pdf(svg: &str) -> Result<Vec<u8>, PlotError> {
    let mut options = usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| PlotError::Convert(e.to_string()))?;
    svg2pdf::to_pdf(&tree, Default::default(), Default::default())
        .map_err(|e| PlotError::Convert(format!("{e:?}")))
}

fn x_range(points: &[(f64, f64)]) -> Range<f64> {
    let (min, max) = bounds(points.iter().map(|p| p.0));
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad)..(max + pad)
}

// Anchored at zero, with headroom above the largest value.
fn y_range(points: &[(f64, f64)]) -> Range<f64> {
    let (min, max) = bounds(points.iter().map(|p| p.1));
    let lo = min.min(0.0);
    let hi = if max > 0.0 { max * 1.1 } else { 1.0 };
    lo..hi
}

fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Error rendering a plot.
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    /// There is nothing to draw.
    #[error("no values to plot in {0}")]
    NoPoints(&'static str),

    /// The backend failed.
    #[error("failed to draw plot: {0}")]
    Draw(String),

    /// The drawing could not be converted to PDF.
    #[error("failed to convert plot to PDF: {0}")]
    Convert(String),

    /// The plot could not be saved.
    #[error("failed to write {}", path.display())]
    Io {
        /// The plot file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}
