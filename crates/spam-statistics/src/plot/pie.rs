use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::full_palette::{INDIGO, ORANGE, PURPLE};

use super::{font, render, Image, Quantity, CAPTION_SIZE, IMAGE_SIZE, LABEL_SIZE};
use crate::error::{Error, Result};

const PIE_RADIUS: f64 = 120.0;

/// The palette available to pie slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Color {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Indigo,
    Violet,
}

impl From<Color> for RGBColor {
    fn from(value: Color) -> RGBColor {
        match value {
            Color::Red => RED,
            Color::Orange => ORANGE,
            Color::Yellow => YELLOW,
            Color::Green => GREEN,
            Color::Blue => BLUE,
            Color::Indigo => INDIGO,
            Color::Violet => PURPLE,
        }
    }
}

/// One labeled wedge of a pie chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    /// Legend text.
    pub label: String,
    /// Fill color.
    pub color: Color,
    /// Share of the whole, between 0 and 1.
    pub ratio: f64,
}

impl Quantity<&[Slice]> {
    /// Slices with a zero ratio are left out.
    ///
    /// # Errors
    ///
    /// Returns an error if no slice has a positive ratio or drawing fails.
    pub fn make_pie(self) -> Result<Image> {
        let slices = self
            .data
            .iter()
            .filter(|slice| slice.ratio > 0.0)
            .collect::<Vec<_>>();
        if slices.is_empty() {
            return Err(self.empty_chart());
        }

        let sizes = slices.iter().map(|slice| slice.ratio).collect::<Vec<_>>();
        let colors = slices
            .iter()
            .map(|slice| RGBColor::from(slice.color))
            .collect::<Vec<_>>();
        let labels = slices
            .iter()
            .map(|slice| format!("{} ({:.1}%)", slice.label, slice.ratio * 100.0))
            .collect::<Vec<_>>();

        let (width, height) = IMAGE_SIZE;
        let center = (
            i32::try_from(width / 2).map_err(Error::chart)?,
            i32::try_from(height / 2).map_err(Error::chart)?,
        );

        render(&self.name, |drawing_area| {
            let mut pie = Pie::new(&center, &PIE_RADIUS, &sizes, &colors, &labels);
            pie.label_style(font(LABEL_SIZE));
            drawing_area
                .titled(&self.name, font(CAPTION_SIZE))
                .map_err(Error::chart)?
                .draw(&pie)
                .map_err(Error::chart)?;

            Ok(())
        })
    }
}
