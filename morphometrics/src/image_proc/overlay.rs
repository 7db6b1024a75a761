//! Diameter map rendering.
//!
//! The map shows the microscopy image in grayscale with every axon tinted by
//! its diameter on a perceptual colormap, myelin shaded in a neutral tint,
//! the fitted circle or ellipse drawn
//! as an outline, and a colour bar along the right edge (top = largest
//! diameter). Outlines are rendered from an SVG overlay and alpha-blended
//! onto the tinted raster.

use image::{GrayImage, Rgb, RgbImage};
use ndarray::ArrayView2;
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

use super::mask::check_dim;
use crate::error::{MorphometricsError, Result};

/// Opacity of the diameter tint over the grayscale background
const TINT_ALPHA: f32 = 0.6;

/// Myelin shading and its opacity
const MYELIN_COLOR: [u8; 3] = [230, 230, 255];
const MYELIN_ALPHA: f32 = 0.35;

/// Outline colour of fitted shapes
const OUTLINE_COLOR: &str = "#ff3030";

/// Anchor colours of the diameter colormap, evenly spaced on [0, 1]
const COLORMAP: [[u8; 3]; 5] = [
    [68, 1, 84],
    [59, 82, 139],
    [33, 145, 140],
    [94, 201, 98],
    [253, 231, 37],
];

/// Shape drawn around an axon, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outline {
    Circle {
        radius: f64,
    },
    /// `orientation` is the angle between the row axis and the major axis
    Ellipse {
        semi_major: f64,
        semi_minor: f64,
        orientation: f64,
    },
}

/// One axon on the diameter map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiameterMapEntry {
    /// Label of the axon in the axon label image
    pub label: usize,
    /// Centroid as (row, col)
    pub centroid: (f64, f64),
    /// Diameter shown by the tint, in any consistent unit
    pub diameter: f64,
    pub outline: Outline,
}

/// Map `t` in [0, 1] to a colour; values outside are clamped.
pub fn colormap(t: f64) -> [u8; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (COLORMAP.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(COLORMAP.len() - 2);
    let frac = scaled - lower as f64;

    let a = COLORMAP[lower];
    let b = COLORMAP[lower + 1];
    let mut out = [0u8; 3];
    for i in 0..3 {
        out[i] = (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
    }
    out
}

/// Render the diameter map.
///
/// # Arguments
/// * `background` - Microscopy image, same dimensions as `labels`
/// * `labels` - Axon label image from connected component labeling
/// * `myelin` - Optional myelin mask shaded under the axon tint
/// * `entries` - One entry per axon to tint and outline
pub fn draw_diameter_map(
    background: &GrayImage,
    labels: &ArrayView2<usize>,
    myelin: Option<&ArrayView2<bool>>,
    entries: &[DiameterMapEntry],
) -> Result<RgbImage> {
    let (width, height) = background.dimensions();
    let expected = (height as usize, width as usize);
    check_dim("axon label image", expected, labels.dim())?;
    if let Some(myelin) = myelin {
        check_dim("myelin mask", expected, myelin.dim())?;
    }

    let finite = entries.iter().map(|e| e.diameter).filter(|d| d.is_finite());
    let min_diam = finite.clone().fold(f64::INFINITY, f64::min);
    let max_diam = finite.fold(f64::NEG_INFINITY, f64::max);
    let span = if max_diam > min_diam {
        max_diam - min_diam
    } else {
        1.0
    };

    let max_label = entries.iter().map(|e| e.label).max().unwrap_or(0);
    let mut label_colors: Vec<Option<[u8; 3]>> = vec![None; max_label + 1];
    for entry in entries {
        if entry.diameter.is_finite() {
            label_colors[entry.label] = Some(colormap((entry.diameter - min_diam) / span));
        }
    }

    let mut tinted = RgbImage::new(width, height);
    for (x, y, pixel) in tinted.enumerate_pixels_mut() {
        let gray = background.get_pixel(x, y).0[0];
        let label = labels[[y as usize, x as usize]];
        let in_myelin = myelin.is_some_and(|m| m[[y as usize, x as usize]]);
        let tint = match label_colors.get(label).copied().flatten() {
            Some(c) => Some((c, TINT_ALPHA)),
            None if in_myelin => Some((MYELIN_COLOR, MYELIN_ALPHA)),
            None => None,
        };
        *pixel = match tint {
            Some((c, alpha)) => Rgb([
                blend_channel(gray, c[0], alpha),
                blend_channel(gray, c[1], alpha),
                blend_channel(gray, c[2], alpha),
            ]),
            None => Rgb([gray, gray, gray]),
        };
    }

    draw_colorbar(&mut tinted);

    let svg = outlines_svg(width, height, entries);
    overlay_to_image(&tinted, &svg)
}

fn outlines_svg(width: u32, height: u32, entries: &[DiameterMapEntry]) -> String {
    let mut svg_data = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
        width, height
    );

    for entry in entries {
        // (row, col) -> (x, y)
        let cx = entry.centroid.1;
        let cy = entry.centroid.0;
        match entry.outline {
            Outline::Circle { radius } if radius > 0.0 => {
                svg_data.push_str(&format!(
                    r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{radius:.2}" fill="none" stroke="{OUTLINE_COLOR}" stroke-width="1"/>"#
                ));
            }
            Outline::Ellipse {
                semi_major,
                semi_minor,
                orientation,
            } if semi_major > 0.0 => {
                // Major axis direction is (sin θ, cos θ) in (x, y)
                let angle = (std::f64::consts::FRAC_PI_2 - orientation).to_degrees();
                svg_data.push_str(&format!(
                    r#"<ellipse cx="{cx:.2}" cy="{cy:.2}" rx="{semi_major:.2}" ry="{:.2}" transform="rotate({angle:.3} {cx:.2} {cy:.2})" fill="none" stroke="{OUTLINE_COLOR}" stroke-width="1"/>"#,
                    semi_minor.max(0.5)
                ));
            }
            _ => {}
        }
    }

    svg_data.push_str("</svg>");
    svg_data
}

/// Vertical colour bar on the right edge, largest value at the top.
fn draw_colorbar(image: &mut RgbImage) {
    let (width, height) = image.dimensions();
    if width < 16 || height < 2 {
        return;
    }

    let bar_width = (width / 40).max(4);
    let start_x = width - bar_width;
    for y in 0..height {
        let t = 1.0 - y as f64 / (height - 1) as f64;
        let color = Rgb(colormap(t));
        for x in start_x..width {
            image.put_pixel(x, y, color);
        }
    }
}

/// Render an SVG overlay on top of an image.
pub fn overlay_to_image(image: &RgbImage, svg_data: &str) -> Result<RgbImage> {
    let svg_tree = Tree::from_str(svg_data, &Options::default())
        .map_err(|e| MorphometricsError::Overlay(format!("invalid SVG: {e}")))?;

    let mut pixmap = Pixmap::new(image.width(), image.height())
        .ok_or_else(|| MorphometricsError::Overlay("empty overlay canvas".to_string()))?;

    resvg::render(&svg_tree, Transform::identity(), &mut pixmap.as_mut());

    let mut output_buffer = image.clone();
    for (x, y, pixel) in output_buffer.enumerate_pixels_mut() {
        if let Some(overlay_pixel) = pixmap.pixel(x, y) {
            if overlay_pixel.alpha() > 0 {
                let color = overlay_pixel.demultiply();
                let alpha = color.alpha() as f32 / 255.0;
                *pixel = Rgb([
                    blend_channel(pixel[0], color.red(), alpha),
                    blend_channel(pixel[1], color.green(), alpha),
                    blend_channel(pixel[2], color.blue(), alpha),
                ]);
            }
        }
    }

    Ok(output_buffer)
}

fn blend_channel(base: u8, overlay: u8, alpha: f32) -> u8 {
    (base as f32 * (1.0 - alpha) + overlay as f32 * alpha).round() as u8
}
