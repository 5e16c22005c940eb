use std::io::Cursor;

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

const WIDTH: u32 = 1000;
const HEIGHT: u32 = 500;
const MARGIN: u32 = 40;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([60, 60, 60]);
/// First colour is the Dynamo yellow; further series cycle through the rest.
const PALETTE: &[Rgb<u8>] = &[
    Rgb([0xEA, 0xB3, 0x08]),
    Rgb([0x25, 0x63, 0xEB]),
    Rgb([0x16, 0xA3, 0x4A]),
    Rgb([0xDC, 0x26, 0x26]),
    Rgb([0x93, 0x33, 0xEA]),
    Rgb([0x0D, 0x94, 0x88]),
];

pub fn data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Grouped bar chart: one group per row, one bar per series. Missing values
/// leave a gap.
pub fn bar_chart_png(series: &[(String, Vec<Option<f64>>)]) -> Result<Vec<u8>> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, BACKGROUND);

    let groups = series.iter().map(|(_, v)| v.len()).max().unwrap_or(0).max(1);
    let values = series.iter().flat_map(|(_, v)| v.iter().flatten().copied());
    let (lo, hi) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let hi = if hi - lo < f64::EPSILON { lo + 1.0 } else { hi };

    let left = MARGIN;
    let top = MARGIN;
    let plot_w = WIDTH - 2 * MARGIN;
    let plot_h = HEIGHT - 2 * MARGIN;

    let y_of = |v: f64| -> u32 {
        let frac = (hi - v) / (hi - lo);
        top + (frac * plot_h as f64).round().clamp(0.0, plot_h as f64) as u32
    };
    let baseline = y_of(0.0);

    let group_w = plot_w as f64 / groups as f64;
    let bar_w = (group_w * 0.8 / series.len().max(1) as f64).max(1.0);

    for (s, (_, column)) in series.iter().enumerate() {
        let colour = PALETTE[s % PALETTE.len()];
        for (g, value) in column.iter().enumerate() {
            let Some(value) = value else { continue };
            let x0 = left as f64 + g as f64 * group_w + group_w * 0.1 + s as f64 * bar_w;
            let x1 = x0 + bar_w - 1.0;
            let y = y_of(*value);
            let (y0, y1) = if y <= baseline { (y, baseline) } else { (baseline, y) };
            fill_rect(&mut img, x0 as u32, y0, x1.max(x0) as u32, y1, colour);
        }
    }

    fill_rect(&mut img, left, baseline, left + plot_w, baseline, AXIS);
    fill_rect(&mut img, left, top, left, top + plot_h, AXIS);

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn fill_rect(img: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, colour: Rgb<u8>) {
    let x1 = x1.min(img.width() - 1);
    let y1 = y1.min(img.height() - 1);
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x, y, colour);
        }
    }
}
