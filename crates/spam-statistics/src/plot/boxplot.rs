use chrono::NaiveDate;
use plotters::prelude::*;
use plotters::style::full_palette::PURPLE;

use super::{font, render, Image, Quantity, CAPTION_SIZE, LABEL_SIZE};
use crate::error::{Error, Result};
use crate::statistics::{is_plausible_score, DailySpamResults};

impl Quantity<&DailySpamResults> {
    /// One box per day summarizing the scores received that day.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no scores or drawing fails.
    pub fn make_boxplot(self) -> Result<Image> {
        let days = self
            .data
            .into_iter()
            .filter(|(_, results)| results.iter().copied().any(is_plausible_score))
            .collect::<Vec<_>>();
        if days.is_empty() {
            return Err(self.empty_chart());
        }

        let quartiles = days
            .iter()
            .map(|(_, results)| {
                let plausible = results
                    .iter()
                    .copied()
                    .filter(|result| is_plausible_score(*result))
                    .collect::<Vec<_>>();
                Quartiles::new(&plausible)
            })
            .collect::<Vec<_>>();
        let keys = days.iter().map(|(day, _)| *day).collect::<Vec<NaiveDate>>();

        let (low, high) = quartiles
            .iter()
            .flat_map(Quartiles::values)
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(low, high), value| {
                (low.min(value), high.max(value))
            });
        let padding = ((high - low) * 0.05).max(1.0);

        render(&self.name, |drawing_area| {
            let mut chart = ChartBuilder::on(drawing_area)
                .margin(5)
                .caption(&self.name, font(CAPTION_SIZE))
                .x_label_area_size(40)
                .y_label_area_size(40)
                .build_cartesian_2d(keys[..].into_segmented(), (low - padding)..(high + padding))
                .map_err(Error::chart)?;

            chart
                .configure_mesh()
                .x_desc(&self.domain)
                .y_desc(&self.range)
                .axis_desc_style(font(LABEL_SIZE))
                .draw()
                .map_err(Error::chart)?;

            chart
                .draw_series(keys.iter().zip(&quartiles).map(|(day, quartiles)| {
                    Boxplot::new_vertical(SegmentValue::CenterOf(day), quartiles)
                        .width(15)
                        .style(&PURPLE)
                }))
                .map_err(Error::chart)?;

            Ok(())
        })
    }
}
