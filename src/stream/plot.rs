//! PNG snapshots of the two render states. Both views live in `[-1, 1]`
//! on each axis, so the charts share one coordinate setup and draw no text.
use std::io::Cursor;
use image::{DynamicImage, ImageFormat, RgbImage};
use plotters::coord::types::RangedCoordf32;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use crate::stream::error::StreamError;
use crate::stream::spectrum_view::SpectrumRenderState;
use crate::stream::wavefront::{band_height, line_color, ChannelSelection, Rgb, WavefrontRenderState};
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub grid: RGBColor,
    pub cursor: RGBColor,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            grid: RGBColor(40, 40, 40),
            cursor: RGBColor(200, 200, 200),
        }
    }
}
fn rgb(color: Rgb) -> RGBColor {
    RGBColor(color.0, color.1, color.2)
}
pub fn render_waveform_png(
    state: &WavefrontRenderState,
    selection: &ChannelSelection,
    style: &PlotStyle,
) -> Result<Vec<u8>, StreamError> {
    if state.channels() == 0 || state.display_points() == 0 {
        return Err(StreamError::Plot("wavefront has no lines to draw".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(-1f32..1f32, -1f32..1f32)?;
        draw_band_edges(&mut chart, state.channels(), &style.grid)?;
        for ch in 0..state.channels() {
            let Some(points) = state.points(ch) else {
                continue;
            };
            let color = rgb(line_color(ch, selection));
            chart.draw_series(LineSeries::new(points.map(|[x, y]| (x, y)), &color))?;
        }
        let last = (state.display_points() - 1).max(1) as f32;
        let x = -1.0 + 2.0 * state.cursor() as f32 / last;
        chart.draw_series(LineSeries::new(vec![(x, -1.0), (x, 1.0)], &style.cursor))?;
        root.present()?;
    }
    encode_png(buffer, style.width, style.height)
}
pub fn render_spectrum_png(
    state: &SpectrumRenderState,
    selection: &ChannelSelection,
    style: &PlotStyle,
) -> Result<Vec<u8>, StreamError> {
    if state.channels() == 0 {
        return Err(StreamError::Plot("spectrum has no channels configured".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(-1f32..1f32, -1f32..1f32)?;
        draw_band_edges(&mut chart, state.channels(), &style.grid)?;
        for ch in 0..state.channels() {
            let Some(points) = state.points(ch) else {
                continue;
            };
            let color = rgb(line_color(ch, selection));
            chart.draw_series(LineSeries::new(points.map(|[x, y]| (x, y)), &color))?;
        }
        root.present()?;
    }
    encode_png(buffer, style.width, style.height)
}
fn draw_band_edges<DB: DrawingBackend>(
    chart: &mut ChartContext<'_, DB, Cartesian2d<RangedCoordf32, RangedCoordf32>>,
    channels: usize,
    color: &RGBColor,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let band = band_height(channels);
    for edge in 1..channels {
        let y = 1.0 - edge as f32 * band;
        chart.draw_series(LineSeries::new(vec![(-1.0, y), (1.0, y)], color))?;
    }
    Ok(())
}
fn encode_png(buffer: Vec<u8>, width: u32, height: u32) -> Result<Vec<u8>, StreamError> {
    let image = RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| StreamError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
