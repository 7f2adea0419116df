use plotters::prelude::*;
use plotters::style::full_palette::PURPLE;

use super::{font, render, Image, Quantity, CAPTION_SIZE, LABEL_SIZE};
use crate::error::{Error, Result};
use crate::statistics::SpamResultsDistribution;

impl Quantity<&SpamResultsDistribution> {
    /// One bar per score bin, as wide as the bin.
    ///
    /// # Errors
    ///
    /// Returns an error if the distribution is empty or drawing fails.
    pub fn make_histogram(self) -> Result<Image> {
        let bins = self.data.as_slice();
        let bin_size = self.data.bin_size().max(1);
        let (Some(&(x_min, _)), Some(&(x_max, _))) = (bins.first(), bins.last()) else {
            return Err(self.empty_chart());
        };
        let y_max = bins.iter().map(|(_, count)| *count).max().unwrap_or(0);

        render(&self.name, |drawing_area| {
            let mut chart = ChartBuilder::on(drawing_area)
                .margin(5)
                .caption(&self.name, font(CAPTION_SIZE))
                .set_left_and_bottom_label_area_size(40)
                .build_cartesian_2d(x_min..x_max.saturating_add(bin_size), 0..y_max + 1)
                .map_err(Error::chart)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_desc(&self.domain)
                .y_desc(&self.range)
                .axis_desc_style(font(LABEL_SIZE))
                .draw()
                .map_err(Error::chart)?;

            chart
                .draw_series(bins.iter().map(|&(bin, count)| {
                    Rectangle::new(
                        [(bin, 0), (bin.saturating_add(bin_size), count)],
                        PURPLE.filled(),
                    )
                }))
                .map_err(Error::chart)?;

            Ok(())
        })
    }
}
