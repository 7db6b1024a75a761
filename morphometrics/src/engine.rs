//! Morphometrics engine.
//!
//! The pipeline consumes the engine through [`MorphometricsEngine`] so the
//! measurement backend can be swapped without touching I/O or export code.
//! [`RegionPropsEngine`] is the built-in backend:
//!
//! - axons are the 8-connected components of the axon mask
//! - fibers are the 8-connected components of `axon | myelin`; each axon is
//!   paired with the fiber containing its pixels
//! - in circle mode diameters are equivalent diameters, in ellipse mode they
//!   are minor axis lengths
//! - `gratio = axon_diam / fiber_diam`,
//!   `myelin_thickness = (fiber_diam - axon_diam) / 2`,
//!   `myelin_area = fiber_area - axon_area`
//!
//! Lengths are reported in micrometers and areas in square micrometers;
//! centroids stay in pixels.

use image::{GrayImage, RgbImage};
use log::{debug, info, warn};
use ndarray::Array2;

use crate::config::AxonShape;
use crate::error::Result;
use crate::image_proc::detection::{connected_components, label_count, Connectivity};
use crate::image_proc::mask::{check_dim, Mask};
use crate::image_proc::overlay::{draw_diameter_map, DiameterMapEntry, Outline};
use crate::image_proc::regionprops::{regionprops, RegionProps};
use crate::pixel_size::PixelSize;

/// Square micrometers per square millimeter
const UM2_PER_MM2: f64 = 1.0e6;

/// Measurements of one axon and its myelin sheath.
///
/// Field order is the spreadsheet column order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxonMorphometrics {
    /// Centroid column, pixels
    pub x0: f32,
    /// Centroid row, pixels
    pub y0: f32,
    pub gratio: f32,
    pub axon_area: f32,
    pub myelin_area: f32,
    pub axon_diam: f32,
    pub myelin_thickness: f32,
    pub axonmyelin_area: f32,
    pub solidity: f32,
    pub eccentricity: f32,
    pub orientation: f32,
}

impl AxonMorphometrics {
    pub const COLUMN_NAMES: [&'static str; 11] = [
        "x0",
        "y0",
        "gratio",
        "axon_area",
        "myelin_area",
        "axon_diam",
        "myelin_thickness",
        "axonmyelin_area",
        "solidity",
        "eccentricity",
        "orientation",
    ];

    /// Values in [`Self::COLUMN_NAMES`] order.
    pub fn values(&self) -> [f32; 11] {
        [
            self.x0,
            self.y0,
            self.gratio,
            self.axon_area,
            self.myelin_area,
            self.axon_diam,
            self.myelin_thickness,
            self.axonmyelin_area,
            self.solidity,
            self.eccentricity,
            self.orientation,
        ]
    }
}

/// Sample-level summary statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateMorphometrics {
    /// Axon area fraction of the image
    pub avf: f64,
    /// Myelin area fraction of the image
    pub mvf: f64,
    /// `1 / sqrt(1 + mvf / avf)`
    pub gratio_aggr: f64,
    pub mean_axon_diam: f64,
    /// Mean fiber (axon + myelin) diameter
    pub mean_myelin_diam: f64,
    pub mean_myelin_thickness: f64,
    /// Axons per square millimeter
    pub axon_density_mm2: f64,
    pub n_axons: usize,
}

impl AggregateMorphometrics {
    /// `(name, value)` pairs in output order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![
            ("avf", self.avf.to_string()),
            ("mvf", self.mvf.to_string()),
            ("gratio_aggr", self.gratio_aggr.to_string()),
            ("mean_axon_diam", self.mean_axon_diam.to_string()),
            ("mean_myelin_diam", self.mean_myelin_diam.to_string()),
            ("mean_myelin_thickness", self.mean_myelin_thickness.to_string()),
            ("axon_density_mm2", self.axon_density_mm2.to_string()),
            ("n_axons", self.n_axons.to_string()),
        ]
    }
}

/// Computes morphometrics from axon and myelin masks.
pub trait MorphometricsEngine {
    /// Per-axon measurements in label order.
    ///
    /// Without a myelin mask the myelin-derived fields are `NaN`.
    fn axon_morphometrics(
        &self,
        axon: &Mask,
        myelin: Option<&Mask>,
        pixel_size: PixelSize,
        shape: AxonShape,
    ) -> Result<Vec<AxonMorphometrics>>;

    fn aggregate_morphometrics(
        &self,
        axon: &Mask,
        myelin: &Mask,
        pixel_size: PixelSize,
        shape: AxonShape,
    ) -> Result<AggregateMorphometrics>;

    /// Render the axon diameter map over `image`.
    fn draw_axon_diameter(
        &self,
        image: &GrayImage,
        axon: &Mask,
        myelin: &Mask,
        pixel_size: PixelSize,
        shape: AxonShape,
    ) -> Result<RgbImage>;
}

/// Engine built on connected component labeling and region moments.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionPropsEngine {
    pub connectivity: Connectivity,
}

impl RegionPropsEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

/// One axon with the fiber it belongs to, in pixel units.
struct FittedAxon {
    axon: RegionProps,
    fiber: Option<RegionProps>,
}

struct Segmentation {
    axon_labels: Array2<usize>,
    axons: Vec<FittedAxon>,
}

impl RegionPropsEngine {
    fn segment(&self, axon: &Mask, myelin: Option<&Mask>) -> Result<Segmentation> {
        let axon_labels = connected_components(&axon.view(), self.connectivity);
        let axon_props = regionprops(&axon_labels.view());

        let Some(myelin) = myelin else {
            let axons = axon_props
                .into_iter()
                .map(|axon| FittedAxon { axon, fiber: None })
                .collect();
            return Ok(Segmentation { axon_labels, axons });
        };

        check_dim("myelin mask", axon.dim(), myelin.dim())?;
        let fiber_mask = axon.union(myelin)?;
        let fiber_labels = connected_components(&fiber_mask.view(), self.connectivity);
        let fiber_props = regionprops(&fiber_labels.view());

        let mut fiber_by_label: Vec<Option<&RegionProps>> =
            vec![None; fiber_props.iter().map(|p| p.label).max().unwrap_or(0) + 1];
        for props in &fiber_props {
            fiber_by_label[props.label] = Some(props);
        }

        // Fiber label under the first pixel of every axon
        let mut fiber_of_axon = vec![0usize; label_count(&axon_labels.view()) + 1];
        for ((row, col), &label) in axon_labels.indexed_iter() {
            if label > 0 && fiber_of_axon[label] == 0 {
                fiber_of_axon[label] = fiber_labels[[row, col]];
            }
        }

        let mut axons_per_fiber = vec![0usize; fiber_by_label.len()];
        for &fiber in fiber_of_axon.iter().skip(1) {
            axons_per_fiber[fiber] += 1;
        }
        let shared = axons_per_fiber.iter().filter(|&&n| n > 1).count();
        if shared > 0 {
            warn!("{shared} fibers contain more than one axon; their myelin is counted for each");
        }

        let axons = axon_props
            .into_iter()
            .map(|axon| {
                let fiber = fiber_by_label
                    .get(fiber_of_axon[axon.label])
                    .copied()
                    .flatten()
                    .cloned();
                FittedAxon { axon, fiber }
            })
            .collect();

        Ok(Segmentation { axon_labels, axons })
    }
}

fn diameter(props: &RegionProps, shape: AxonShape) -> f64 {
    match shape {
        AxonShape::Circle => props.equivalent_diameter(),
        AxonShape::Ellipse => props.minor_axis_length(),
    }
}

fn measure(fitted: &FittedAxon, pixel_size: PixelSize, shape: AxonShape) -> AxonMorphometrics {
    let axon = &fitted.axon;
    let axon_diam_px = diameter(axon, shape);
    let axon_area = pixel_size.area(axon.area as f64);

    let (gratio, myelin_area, myelin_thickness, axonmyelin_area) = match &fitted.fiber {
        Some(fiber) => {
            let fiber_diam_px = diameter(fiber, shape);
            let gratio = if fiber_diam_px > 0.0 {
                axon_diam_px / fiber_diam_px
            } else {
                f64::NAN
            };
            let fiber_area = pixel_size.area(fiber.area as f64);
            (
                gratio,
                fiber_area - axon_area,
                pixel_size.length((fiber_diam_px - axon_diam_px) / 2.0),
                fiber_area,
            )
        }
        None => (f64::NAN, f64::NAN, f64::NAN, f64::NAN),
    };

    AxonMorphometrics {
        x0: axon.centroid.1 as f32,
        y0: axon.centroid.0 as f32,
        gratio: gratio as f32,
        axon_area: axon_area as f32,
        myelin_area: myelin_area as f32,
        axon_diam: pixel_size.length(axon_diam_px) as f32,
        myelin_thickness: myelin_thickness as f32,
        axonmyelin_area: axonmyelin_area as f32,
        solidity: axon.solidity() as f32,
        eccentricity: axon.eccentricity() as f32,
        orientation: axon.orientation() as f32,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

impl MorphometricsEngine for RegionPropsEngine {
    fn axon_morphometrics(
        &self,
        axon: &Mask,
        myelin: Option<&Mask>,
        pixel_size: PixelSize,
        shape: AxonShape,
    ) -> Result<Vec<AxonMorphometrics>> {
        let segmentation = self.segment(axon, myelin)?;
        if segmentation.axons.is_empty() {
            warn!("Axon mask contains no objects");
        }

        let records: Vec<AxonMorphometrics> = segmentation
            .axons
            .iter()
            .map(|fitted| {
                let record = measure(fitted, pixel_size, shape);
                debug!(
                    "Axon {} at ({:.1}, {:.1}): diam={:.3} gratio={:.3}",
                    fitted.axon.label, record.x0, record.y0, record.axon_diam, record.gratio
                );
                record
            })
            .collect();

        info!("Measured {} axons ({shape} fit)", records.len());
        Ok(records)
    }

    fn aggregate_morphometrics(
        &self,
        axon: &Mask,
        myelin: &Mask,
        pixel_size: PixelSize,
        shape: AxonShape,
    ) -> Result<AggregateMorphometrics> {
        check_dim("myelin mask", axon.dim(), myelin.dim())?;
        let records = self.axon_morphometrics(axon, Some(myelin), pixel_size, shape)?;

        let (height, width) = axon.dim();
        let total_pixels = (height * width) as f64;
        let (avf, mvf) = if total_pixels > 0.0 {
            (
                axon.count() as f64 / total_pixels,
                myelin.count() as f64 / total_pixels,
            )
        } else {
            (0.0, 0.0)
        };
        let gratio_aggr = if avf > 0.0 {
            1.0 / (1.0 + mvf / avf).sqrt()
        } else {
            f64::NAN
        };

        let image_area_mm2 = pixel_size.area(total_pixels) / UM2_PER_MM2;
        let axon_density_mm2 = if image_area_mm2 > 0.0 {
            records.len() as f64 / image_area_mm2
        } else {
            0.0
        };

        Ok(AggregateMorphometrics {
            avf,
            mvf,
            gratio_aggr,
            mean_axon_diam: mean(records.iter().map(|r| r.axon_diam as f64)),
            mean_myelin_diam: mean(
                records
                    .iter()
                    .map(|r| r.axon_diam as f64 + 2.0 * r.myelin_thickness as f64),
            ),
            mean_myelin_thickness: mean(records.iter().map(|r| r.myelin_thickness as f64)),
            axon_density_mm2,
            n_axons: records.len(),
        })
    }

    fn draw_axon_diameter(
        &self,
        image: &GrayImage,
        axon: &Mask,
        myelin: &Mask,
        pixel_size: PixelSize,
        shape: AxonShape,
    ) -> Result<RgbImage> {
        let segmentation = self.segment(axon, Some(myelin))?;

        let entries: Vec<DiameterMapEntry> = segmentation
            .axons
            .iter()
            .map(|fitted| {
                let props = &fitted.axon;
                let outline = match shape {
                    AxonShape::Circle => Outline::Circle {
                        radius: props.equivalent_diameter() / 2.0,
                    },
                    AxonShape::Ellipse => Outline::Ellipse {
                        semi_major: props.major_axis_length() / 2.0,
                        semi_minor: props.minor_axis_length() / 2.0,
                        orientation: props.orientation(),
                    },
                };
                DiameterMapEntry {
                    label: props.label,
                    centroid: props.centroid,
                    diameter: pixel_size.length(diameter(props, shape)),
                    outline,
                }
            })
            .collect();

        draw_diameter_map(
            image,
            &segmentation.axon_labels.view(),
            Some(&myelin.view()),
            &entries,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ring_masks(size: usize, center: (f64, f64), r_in: f64, r_out: f64) -> (Mask, Mask) {
        let dist = |r: usize, c: usize| {
            let dr = r as f64 - center.0;
            let dc = c as f64 - center.1;
            (dr * dr + dc * dc).sqrt()
        };
        let axon = Array2::from_shape_fn((size, size), |(r, c)| dist(r, c) <= r_in);
        let myelin = Array2::from_shape_fn((size, size), |(r, c)| {
            let d = dist(r, c);
            d > r_in && d <= r_out
        });
        (Mask::from_array(axon), Mask::from_array(myelin))
    }

    fn px(value: f64) -> PixelSize {
        PixelSize::new(value).unwrap()
    }

    #[test]
    fn test_column_names_match_values() {
        assert_eq!(AxonMorphometrics::COLUMN_NAMES.len(), 11);
        assert_eq!(AxonMorphometrics::COLUMN_NAMES[0], "x0");
        assert_eq!(AxonMorphometrics::COLUMN_NAMES[10], "orientation");
    }

    #[test]
    fn test_annulus_gratio() {
        let (axon, myelin) = ring_masks(81, (40.0, 40.0), 12.0, 20.0);
        let records = RegionPropsEngine::new()
            .axon_morphometrics(&axon, Some(&myelin), px(1.0), AxonShape::Circle)
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = records[0];
        assert_relative_eq!(record.gratio, 0.6, epsilon = 0.02);
        assert_relative_eq!(record.x0, 40.0, epsilon = 1e-4);
        assert_relative_eq!(record.y0, 40.0, epsilon = 1e-4);
        assert_relative_eq!(record.myelin_thickness, 8.0, epsilon = 0.5);
        assert_relative_eq!(
            record.axonmyelin_area,
            record.axon_area + record.myelin_area,
            epsilon = 1e-2
        );
        assert!(record.eccentricity < 0.1);
        assert!(record.solidity > 0.9);
    }

    #[test]
    fn test_pixel_size_scales_lengths_and_areas() {
        let (axon, myelin) = ring_masks(61, (30.0, 30.0), 8.0, 14.0);
        let engine = RegionPropsEngine::new();
        let unit = engine
            .axon_morphometrics(&axon, Some(&myelin), px(1.0), AxonShape::Circle)
            .unwrap()[0];
        let scaled = engine
            .axon_morphometrics(&axon, Some(&myelin), px(0.5), AxonShape::Circle)
            .unwrap()[0];

        assert_relative_eq!(scaled.axon_diam, unit.axon_diam * 0.5, epsilon = 1e-4);
        assert_relative_eq!(scaled.myelin_thickness, unit.myelin_thickness * 0.5, epsilon = 1e-4);
        assert_relative_eq!(scaled.axon_area, unit.axon_area * 0.25, epsilon = 1e-3);
        assert_relative_eq!(scaled.gratio, unit.gratio);
        assert_relative_eq!(scaled.x0, unit.x0);
    }

    #[test]
    fn test_ellipse_mode_uses_minor_axis() {
        let axon = Array2::from_shape_fn((41, 61), |(r, c)| {
            let dr = (r as f64 - 20.0) / 6.0;
            let dc = (c as f64 - 30.0) / 15.0;
            dr * dr + dc * dc <= 1.0
        });
        let axon = Mask::from_array(axon);
        let engine = RegionPropsEngine::new();

        let ellipse = engine
            .axon_morphometrics(&axon, None, px(1.0), AxonShape::Ellipse)
            .unwrap()[0];
        let circle = engine
            .axon_morphometrics(&axon, None, px(1.0), AxonShape::Circle)
            .unwrap()[0];

        assert_relative_eq!(ellipse.axon_diam, 12.0, epsilon = 1.0);
        assert!(circle.axon_diam > ellipse.axon_diam);
        assert!(ellipse.eccentricity > 0.85);
    }

    #[test]
    fn test_without_myelin_fields_are_nan() {
        let (axon, _) = ring_masks(31, (15.0, 15.0), 5.0, 8.0);
        let record = RegionPropsEngine::new()
            .axon_morphometrics(&axon, None, px(1.0), AxonShape::Circle)
            .unwrap()[0];

        assert!(record.gratio.is_nan());
        assert!(record.myelin_area.is_nan());
        assert!(record.myelin_thickness.is_nan());
        assert!(record.axonmyelin_area.is_nan());
        assert!(record.axon_diam > 0.0);
    }

    #[test]
    fn test_objects_reported_in_label_order() {
        let mut axon = Array2::from_elem((20, 20), false);
        for r in 2..5 {
            for c in 12..15 {
                axon[[r, c]] = true;
            }
        }
        for r in 10..16 {
            for c in 2..8 {
                axon[[r, c]] = true;
            }
        }
        let records = RegionPropsEngine::new()
            .axon_morphometrics(&Mask::from_array(axon), None, px(1.0), AxonShape::Circle)
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_relative_eq!(records[0].y0, 3.0);
        assert_relative_eq!(records[1].y0, 12.5);
        assert_relative_eq!(records[0].axon_area, 9.0);
        assert_relative_eq!(records[1].axon_area, 36.0);
    }

    #[test]
    fn test_empty_masks_do_not_panic() {
        let axon = Mask::empty((10, 10));
        let myelin = Mask::empty((10, 10));
        let engine = RegionPropsEngine::new();

        let records = engine
            .axon_morphometrics(&axon, Some(&myelin), px(0.1), AxonShape::Circle)
            .unwrap();
        assert!(records.is_empty());

        let aggregate = engine
            .aggregate_morphometrics(&axon, &myelin, px(0.1), AxonShape::Circle)
            .unwrap();
        assert_eq!(aggregate.n_axons, 0);
        assert_eq!(aggregate.avf, 0.0);
        assert!(aggregate.gratio_aggr.is_nan());
        assert!(aggregate.mean_axon_diam.is_nan());
        assert_eq!(aggregate.axon_density_mm2, 0.0);
    }

    #[test]
    fn test_aggregate_fractions_and_density() {
        let (axon, myelin) = ring_masks(100, (50.0, 50.0), 10.0, 20.0);
        let aggregate = RegionPropsEngine::new()
            .aggregate_morphometrics(&axon, &myelin, px(1.0), AxonShape::Circle)
            .unwrap();

        assert_eq!(aggregate.n_axons, 1);
        assert_relative_eq!(aggregate.avf, axon.count() as f64 / 10_000.0);
        assert_relative_eq!(aggregate.mvf, myelin.count() as f64 / 10_000.0);
        assert_relative_eq!(
            aggregate.gratio_aggr,
            1.0 / (1.0 + aggregate.mvf / aggregate.avf).sqrt()
        );
        // 100 x 100 um = 0.01 mm^2
        assert_relative_eq!(aggregate.axon_density_mm2, 100.0, epsilon = 1e-9);
        assert_relative_eq!(aggregate.gratio_aggr, 0.5, epsilon = 0.02);
    }

    #[test]
    fn test_mismatched_myelin_rejected() {
        let axon = Mask::empty((10, 10));
        let myelin = Mask::empty((10, 12));
        let result = RegionPropsEngine::new().axon_morphometrics(
            &axon,
            Some(&myelin),
            px(1.0),
            AxonShape::Circle,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_diameter_map_matches_image_size() {
        let (axon, myelin) = ring_masks(64, (32.0, 32.0), 8.0, 14.0);
        let image = GrayImage::from_pixel(64, 64, image::Luma([90]));

        let map = RegionPropsEngine::new()
            .draw_axon_diameter(&image, &axon, &myelin, px(0.2), AxonShape::Ellipse)
            .unwrap();
        assert_eq!(map.dimensions(), (64, 64));
        assert_ne!(map.get_pixel(32, 32).0, [90, 90, 90]);
    }

    #[test]
    fn test_aggregate_entries_order() {
        let aggregate = AggregateMorphometrics {
            avf: 0.1,
            mvf: 0.2,
            gratio_aggr: 0.5,
            mean_axon_diam: 1.0,
            mean_myelin_diam: 2.0,
            mean_myelin_thickness: 0.5,
            axon_density_mm2: 10.0,
            n_axons: 3,
        };
        let names: Vec<&str> = aggregate.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(names.first(), Some(&"avf"));
        assert_eq!(names.last(), Some(&"n_axons"));
        assert_eq!(aggregate.entries()[7].1, "3");
    }
}
