use chrono::NaiveDate;
use plotters::prelude::*;
use plotters::style::full_palette::PURPLE;

use super::{font, render, Image, Quantity, CAPTION_SIZE, LABEL_SIZE};
use crate::error::{Error, Result};
use crate::statistics::Occurrences;

impl Quantity<&[(NaiveDate, Occurrences)]> {
    /// A line through the daily counts, with a marker on each day.
    ///
    /// # Errors
    ///
    /// Returns an error if the series is empty or drawing fails.
    pub fn make_linechart(self) -> Result<Image> {
        let data = self.data;
        let (Some(&(x_min, _)), Some(&(last, _))) = (data.first(), data.last()) else {
            return Err(self.empty_chart());
        };
        // A single day still needs a non-empty axis
        let x_max = if last > x_min {
            last
        } else {
            x_min.succ_opt().unwrap_or(x_min)
        };
        let y_max = data.iter().map(|(_, count)| *count).max().unwrap_or(0);

        render(&self.name, |drawing_area| {
            let mut chart = ChartBuilder::on(drawing_area)
                .margin(5)
                .caption(&self.name, font(CAPTION_SIZE))
                .set_left_and_bottom_label_area_size(40)
                .build_cartesian_2d(x_min..x_max, 0..y_max + 1)
                .map_err(Error::chart)?;

            chart
                .configure_mesh()
                .x_desc(&self.domain)
                .y_desc(&self.range)
                .axis_desc_style(font(LABEL_SIZE))
                .x_label_formatter(&|day: &NaiveDate| day.format("%b %d").to_string())
                .draw()
                .map_err(Error::chart)?;

            chart
                .draw_series(LineSeries::new(data.iter().copied(), &PURPLE))
                .map_err(Error::chart)?;
            chart
                .draw_series(
                    data.iter()
                        .map(|&(day, count)| Circle::new((day, count), 3, PURPLE.filled())),
                )
                .map_err(Error::chart)?;

            Ok(())
        })
    }
}
