//! Charts for the report.
//!
//! Every chart is drawn with plotters' SVG backend into an in-memory string,
//! so the report can embed it directly and no font files are needed at runtime.

mod boxplot;
mod histogram;
mod line;
mod pie;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};

pub use pie::{Color, Slice};

use crate::error::{Error, Result};

/// Width and height of every chart, in pixels.
pub const IMAGE_SIZE: (u32, u32) = (600, 400);

const CAPTION_SIZE: f64 = 20.0;
const LABEL_SIZE: f64 = 14.0;

/// A rendered chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// The SVG document.
    pub svg: String,
    /// Alternative text, also used as the chart title.
    pub alt: String,
}

/// A named series with axis descriptions, ready to be charted.
#[derive(Debug, Clone)]
pub struct Quantity<D> {
    /// Chart title.
    pub name: String,
    /// Description of the x axis.
    pub domain: String,
    /// Description of the y axis.
    pub range: String,
    /// The data points.
    pub data: D,
}

impl<D> Quantity<D> {
    /// Create a new quantity.
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        range: impl Into<String>,
        data: D,
    ) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            range: range.into(),
            data,
        }
    }

    fn empty_chart(&self) -> Error {
        Error::EmptyChart {
            name: self.name.clone(),
        }
    }
}

fn font(size: f64) -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, size, FontStyle::Normal)
}

/// Draw onto a blank white canvas and collect the SVG.
fn render<F>(alt: &str, draw: F) -> Result<Image>
where
    F: FnOnce(&DrawingArea<SVGBackend<'_>, Shift>) -> Result<()>,
{
    let mut svg = String::new();
    {
        let drawing_area = SVGBackend::with_string(&mut svg, IMAGE_SIZE).into_drawing_area();
        drawing_area.fill(&WHITE).map_err(Error::chart)?;
        draw(&drawing_area)?;
        drawing_area.present().map_err(Error::chart)?;
    }

    Ok(Image {
        svg,
        alt: alt.to_string(),
    })
}
