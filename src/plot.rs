use crate::distribution::ComplementaryHistogram;
use crate::error::Result;
use crate::model::Series;
use image::{Rgb, RgbImage};
use std::path::Path;

/// Lines of code reviewable in about an hour at a mid optimal inspection rate.
pub const REVIEW_HOUR_LINES: u64 = 400;

const Y_MAX: f64 = 1.05;
const MARGIN: u32 = 40;
const SWATCH_WIDTH: u32 = 24;
const SWATCH_ROW: u32 = 12;

#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    pub mark_hours: bool,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            mark_hours: false,
        }
    }
}

/// Positions of the review-hour markers strictly inside `0..x_max`.
pub fn hour_marks(x_max: f64) -> Vec<u64> {
    (1..)
        .map(|i| i * REVIEW_HOUR_LINES)
        .take_while(|&x| (x as f64) < x_max)
        .collect()
}

struct Canvas {
    image: RgbImage,
    range: (f64, f64),
}

impl Canvas {
    fn new(options: &PlotOptions, range: (f64, f64)) -> Self {
        let width = options.width.max(2 * MARGIN + 10);
        let height = options.height.max(2 * MARGIN + 10);
        Self {
            image: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
            range,
        }
    }

    fn plot_width(&self) -> f64 {
        (self.image.width() - 2 * MARGIN) as f64
    }

    fn plot_height(&self) -> f64 {
        (self.image.height() - 2 * MARGIN) as f64
    }

    fn px(&self, x: f64) -> u32 {
        let (lo, hi) = self.range;
        let t = ((x - lo) / (hi - lo)).clamp(0.0, 1.0);
        MARGIN + (t * self.plot_width()).round() as u32
    }

    fn py(&self, y: f64) -> u32 {
        let t = (y / Y_MAX).clamp(0.0, 1.0);
        self.image.height() - MARGIN - (t * self.plot_height()).round() as u32
    }

    fn hline(&mut self, x0: u32, x1: u32, y: u32, color: Rgb<u8>) {
        let (a, b) = (x0.min(x1), x0.max(x1));
        for x in a..=b {
            self.image.put_pixel(x, y, color);
        }
    }

    fn vline(&mut self, x: u32, y0: u32, y1: u32, color: Rgb<u8>) {
        let (a, b) = (y0.min(y1), y0.max(y1));
        for y in a..=b {
            self.image.put_pixel(x, y, color);
        }
    }

    fn frame(&mut self) {
        let grid = Rgb([229, 229, 229]);
        let axis = Rgb([90, 90, 90]);
        let (left, right) = (MARGIN, self.image.width() - MARGIN);
        for tenth in 0..=10 {
            let y = self.py(tenth as f64 / 10.0);
            self.hline(left, right, y, grid);
        }
        let (top, bottom) = (self.py(Y_MAX), self.py(0.0));
        self.hline(left, right, bottom, axis);
        self.vline(left, top, bottom, axis);
    }

    fn step_curve(&mut self, histogram: &ComplementaryHistogram) {
        let [r, g, b] = histogram.series.rgb();
        let color = Rgb([r, g, b]);
        let base = self.py(0.0);
        let mut prev_y = base;
        for bin in &histogram.bins {
            let (x0, x1) = (self.px(bin.start), self.px(bin.end));
            let y = self.py(bin.probability);
            self.vline(x0, prev_y, y, color);
            self.hline(x0, x1, y, color);
            prev_y = y;
        }
        if let Some(last) = histogram.bins.last() {
            let x = self.px(last.end);
            self.vline(x, prev_y, base, color);
        }
    }

    /// Boxed swatches in the top-right corner, one row per series in
    /// `Series::ALL` order (added, removed, changed).
    fn legend(&mut self) {
        let axis = Rgb([90, 90, 90]);
        let rows = Series::ALL.len() as u32;
        let right = self.image.width().saturating_sub(MARGIN + 8);
        let left = right.saturating_sub(SWATCH_WIDTH + 16);
        let top = MARGIN + 8;
        let bottom = top + rows * SWATCH_ROW + 8;
        for y in top..=bottom {
            self.hline(left, right, y, Rgb([255, 255, 255]));
        }
        self.hline(left, right, top, axis);
        self.hline(left, right, bottom, axis);
        self.vline(left, top, bottom, axis);
        self.vline(right, top, bottom, axis);
        for (row, series) in Series::ALL.iter().enumerate() {
            let y = top + 8 + row as u32 * SWATCH_ROW;
            for dy in 0..4 {
                self.hline(left + 8, left + 8 + SWATCH_WIDTH, y + dy, Rgb(series.rgb()));
            }
        }
    }

    fn hour_lines(&mut self) {
        let black = Rgb([0, 0, 0]);
        let (top, bottom) = (self.py(Y_MAX), self.py(0.0));
        for mark in hour_marks(self.range.1) {
            let x = self.px(mark as f64);
            self.vline(x, top, bottom, black);
        }
    }
}

/// Draws the complementary step curves of every series onto one canvas.
pub fn render(
    histograms: &[ComplementaryHistogram],
    range: (f64, f64),
    options: &PlotOptions,
) -> RgbImage {
    let mut canvas = Canvas::new(options, range);
    canvas.frame();
    for histogram in histograms {
        canvas.step_curve(histogram);
    }
    if options.mark_hours {
        canvas.hour_lines();
    }
    canvas.legend();
    canvas.image
}

pub fn render_png<P: AsRef<Path>>(
    histograms: &[ComplementaryHistogram],
    range: (f64, f64),
    options: &PlotOptions,
    path: P,
) -> Result<()> {
    let image = render(histograms, range, options);
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(path.as_ref(), image::ImageFormat::Png)?;
    log::info!("wrote plot to {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn histogram() -> ComplementaryHistogram {
        ComplementaryHistogram::compute(Series::Changed, &[0, 500, 1000], 3, (0.0, 1000.0)).unwrap()
    }

    #[test]
    fn hour_marks_stay_below_max() {
        assert_eq!(hour_marks(1000.0), vec![400, 800]);
        assert_eq!(hour_marks(800.0), vec![400]);
        assert!(hour_marks(399.0).is_empty());
    }

    #[test]
    fn curve_pixels_use_series_colour() {
        let options = PlotOptions::default();
        let image = render(&[histogram()], (0.0, 1000.0), &options);
        let blue = Rgb(Series::Changed.rgb());
        assert!(image.pixels().any(|p| *p == blue));
        assert!(!image.pixels().any(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn legend_keys_every_series_colour() {
        let image = render(&[], (0.0, 1000.0), &PlotOptions::default());
        for series in Series::ALL {
            let color = Rgb(series.rgb());
            let (x, y) = image
                .enumerate_pixels()
                .find(|(_, _, p)| **p == color)
                .map(|(x, y, _)| (x, y))
                .unwrap();
            // top-right quarter of the canvas
            assert!(x > image.width() / 2);
            assert!(y < image.height() / 2);
        }
    }

    #[test]
    fn hour_markers_are_black() {
        let options = PlotOptions {
            mark_hours: true,
            ..PlotOptions::default()
        };
        let image = render(&[histogram()], (0.0, 1000.0), &options);
        assert!(image.pixels().any(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn writes_png_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("plot.png");
        render_png(&[histogram()], (0.0, 1000.0), &PlotOptions::default(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[1..4], b"PNG");
    }
}
