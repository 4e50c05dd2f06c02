//! Elevation surface backing every cost computation.
//!
//! The surface is a dense row-major grid built once from a [`TerrainSource`]
//! (usually a grayscale heightmap) or from raw elevations, and is read-only
//! afterwards. Queries floor the continuous coordinate to a pixel and return
//! `None` outside the grid; callers must handle that before doing arithmetic.

use crate::error::TerrainError;
use crate::models::Point;
use serde::{Deserialize, Serialize};

/// Lowest representable elevation.
pub const MIN_ELEVATION: f64 = -10.0;
/// Highest representable elevation.
pub const MAX_ELEVATION: f64 = 10.0;

/// Anything that can answer point elevation queries.
pub trait ElevationField {
    /// Elevation at `point`, or `None` when there is no data there.
    fn elevation_at(&self, point: Point) -> Option<f64>;
}

/// Adapter turning a closure into an [`ElevationField`].
pub struct FnField<F>(pub F);

impl<F> ElevationField for FnField<F>
where
    F: Fn(Point) -> Option<f64>,
{
    fn elevation_at(&self, point: Point) -> Option<f64> {
        (self.0)(point)
    }
}

/// Pixel-indexed scalar channel used as the elevation input.
pub trait TerrainSource {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// Channel value at pixel `(x, y)`; only called for in-bounds pixels
    /// after [`TerrainSource::validate`] succeeded.
    fn channel(&self, x: usize, y: usize) -> u8;

    /// Check that every in-bounds pixel has backing data.
    fn validate(&self) -> Result<(), TerrainError> {
        Ok(())
    }
}

/// Single-channel raster, e.g. the red channel of a grayscale heightmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrayscaleRaster {
    pub width: usize,
    pub height: usize,
    /// Row-major pixel values, `width * height` long
    pub pixels: Vec<u8>,
}

impl TerrainSource for GrayscaleRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn channel(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.width + x]
    }

    fn validate(&self) -> Result<(), TerrainError> {
        let expected = self.width.saturating_mul(self.height);
        if self.pixels.len() != expected {
            return Err(TerrainError::SampleCountMismatch {
                expected,
                actual: self.pixels.len(),
            });
        }
        Ok(())
    }
}

/// Maps a channel value in `[0, 255]` to an integral elevation in
/// `[MIN_ELEVATION, MAX_ELEVATION]`.
pub fn channel_to_elevation(value: u8) -> f64 {
    let span = MAX_ELEVATION - MIN_ELEVATION;
    (f64::from(value) / 255.0 * span + MIN_ELEVATION).floor()
}

#[derive(Debug, Clone)]
pub struct ElevationSurface {
    width: usize,
    height: usize,
    elevations: Vec<f64>,
}

impl ElevationSurface {
    /// Build a surface from row-major elevations.
    pub fn from_elevations(
        width: usize,
        height: usize,
        elevations: Vec<f64>,
    ) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::EmptySurface { width, height });
        }
        let expected = width.saturating_mul(height);
        if elevations.len() != expected {
            return Err(TerrainError::SampleCountMismatch {
                expected,
                actual: elevations.len(),
            });
        }
        if let Some((idx, value)) = elevations
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < MIN_ELEVATION || **v > MAX_ELEVATION)
        {
            return Err(TerrainError::ElevationOutOfRange {
                x: idx % width,
                y: idx / width,
                value: *value,
                min: MIN_ELEVATION,
                max: MAX_ELEVATION,
            });
        }
        Ok(Self {
            width,
            height,
            elevations,
        })
    }

    /// Build a surface by sampling every pixel of `source` once.
    pub fn from_source<S: TerrainSource + ?Sized>(source: &S) -> Result<Self, TerrainError> {
        let width = source.width();
        let height = source.height();
        if width == 0 || height == 0 {
            return Err(TerrainError::EmptySurface { width, height });
        }
        source.validate()?;
        let mut elevations = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                elevations.push(channel_to_elevation(source.channel(x, y)));
            }
        }
        Self::from_elevations(width, height, elevations)
    }

    /// Constant-elevation surface.
    pub fn flat(width: usize, height: usize, elevation: f64) -> Result<Self, TerrainError> {
        Self::from_elevations(width, height, vec![elevation; width.saturating_mul(height)])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        self.pixel_of(point).is_some()
    }

    fn pixel_of(&self, point: Point) -> Option<(usize, usize)> {
        if !point.is_finite() {
            return None;
        }
        let x = point.x.floor();
        let y = point.y.floor();
        if x < 0.0 || y < 0.0 || x >= self.width as f64 || y >= self.height as f64 {
            return None;
        }
        Some((x as usize, y as usize))
    }

    fn value_at(&self, x: usize, y: usize) -> f64 {
        self.elevations[y * self.width + x]
    }

    /// The full grid as rows of elevations (row = y).
    pub fn elevation_rows(&self) -> Vec<Vec<f64>> {
        self.elevations
            .chunks(self.width)
            .map(|row| row.to_vec())
            .collect()
    }

    /// Per-chunk roughness: the population standard deviation of the
    /// elevations inside each `chunk_size` square. Indexed `[row][col]`.
    pub fn cost_summary(&self, chunk_size: usize) -> Result<Vec<Vec<f64>>, TerrainError> {
        if chunk_size == 0 {
            return Err(TerrainError::InvalidChunkSize);
        }
        let rows = self.height.div_ceil(chunk_size);
        let cols = self.width.div_ceil(chunk_size);
        let mut summary = vec![vec![0.0; cols]; rows];

        for (row, summary_row) in summary.iter_mut().enumerate() {
            let y0 = row * chunk_size;
            let y1 = (y0 + chunk_size).min(self.height);
            for (col, cell) in summary_row.iter_mut().enumerate() {
                let x0 = col * chunk_size;
                let x1 = (x0 + chunk_size).min(self.width);

                let mut count = 0usize;
                let mut sum = 0.0;
                let mut sum_sq = 0.0;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let value = self.value_at(x, y);
                        if !value.is_finite() {
                            continue;
                        }
                        count += 1;
                        sum += value;
                        sum_sq += value * value;
                    }
                }
                if count == 0 {
                    continue;
                }
                let mean = sum / count as f64;
                let variance = (sum_sq / count as f64 - mean * mean).max(0.0);
                *cell = variance.sqrt();
            }
        }

        Ok(summary)
    }
}

impl ElevationField for ElevationSurface {
    fn elevation_at(&self, point: Point) -> Option<f64> {
        let (x, y) = self.pixel_of(point)?;
        Some(self.value_at(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> ElevationSurface {
        let values = (0..width * height)
            .map(|idx| ((idx % width) as f64 - 5.0).clamp(MIN_ELEVATION, MAX_ELEVATION))
            .collect();
        ElevationSurface::from_elevations(width, height, values).unwrap()
    }

    #[test]
    fn out_of_bounds_queries_return_none() {
        let surface = ramp(20, 10);
        for point in [
            Point::new(-0.01, 0.0),
            Point::new(0.0, -3.0),
            Point::new(20.0, 5.0),
            Point::new(5.0, 10.0),
            Point::new(f64::NAN, 1.0),
            Point::new(1e9, 1e9),
        ] {
            assert_eq!(surface.elevation_at(point), None, "{point}");
        }
    }

    #[test]
    fn in_bounds_queries_floor_and_stay_in_range() {
        let surface = ramp(20, 10);
        for y in 0..10 {
            for x in 0..20 {
                let value = surface.elevation_at(Point::new(x as f64, y as f64)).unwrap();
                assert!((MIN_ELEVATION..=MAX_ELEVATION).contains(&value));
            }
        }
        assert_eq!(surface.elevation_at(Point::new(7.9, 3.2)), Some(2.0));
    }

    #[test]
    fn channel_mapping_covers_full_range() {
        assert_eq!(channel_to_elevation(0), MIN_ELEVATION);
        assert_eq!(channel_to_elevation(255), MAX_ELEVATION);
        assert_eq!(channel_to_elevation(128), 0.0);
    }

    #[test]
    fn from_source_reads_every_pixel() {
        let raster = GrayscaleRaster {
            width: 3,
            height: 2,
            pixels: vec![0, 128, 255, 255, 128, 0],
        };
        let surface = ElevationSurface::from_source(&raster).unwrap();
        assert_eq!(surface.elevation_at(Point::new(2.0, 0.0)), Some(10.0));
        assert_eq!(surface.elevation_at(Point::new(2.0, 1.0)), Some(-10.0));
    }

    #[test]
    fn short_raster_is_rejected() {
        let raster = GrayscaleRaster {
            width: 10,
            height: 10,
            pixels: vec![255; 3],
        };
        assert!(matches!(
            ElevationSurface::from_source(&raster),
            Err(TerrainError::SampleCountMismatch { expected: 100, actual: 3 })
        ));

        let long = GrayscaleRaster {
            width: 2,
            height: 1,
            pixels: vec![0; 5],
        };
        assert!(matches!(
            ElevationSurface::from_source(&long),
            Err(TerrainError::SampleCountMismatch { expected: 2, actual: 5 })
        ));
    }

    #[test]
    fn rejects_bad_construction() {
        assert!(matches!(
            ElevationSurface::from_elevations(0, 4, vec![]),
            Err(TerrainError::EmptySurface { .. })
        ));
        assert!(matches!(
            ElevationSurface::from_elevations(2, 2, vec![0.0; 3]),
            Err(TerrainError::SampleCountMismatch { expected: 4, actual: 3 })
        ));
        assert!(matches!(
            ElevationSurface::from_elevations(2, 1, vec![0.0, 11.0]),
            Err(TerrainError::ElevationOutOfRange { x: 1, y: 0, .. })
        ));
    }

    #[test]
    fn cost_summary_dimensions_round_up() {
        let surface = ramp(25, 12);
        for chunk in 1..=30 {
            let summary = surface.cost_summary(chunk).unwrap();
            assert_eq!(summary.len(), 12usize.div_ceil(chunk));
            assert!(summary.iter().all(|row| row.len() == 25usize.div_ceil(chunk)));
        }
        assert_eq!(surface.cost_summary(0), Err(TerrainError::InvalidChunkSize));
    }

    #[test]
    fn cost_summary_is_population_std_dev() {
        // Columns alternate -1 / 1 so every 2x2 chunk has std dev 1.
        let values = (0..16)
            .map(|idx| if idx % 2 == 0 { -1.0 } else { 1.0 })
            .collect();
        let surface = ElevationSurface::from_elevations(4, 4, values).unwrap();
        let summary = surface.cost_summary(2).unwrap();
        for row in &summary {
            for cell in row {
                assert!((cell - 1.0).abs() < 1e-12);
            }
        }

        let flat = ElevationSurface::flat(4, 4, 3.0).unwrap();
        assert!(flat.cost_summary(3).unwrap().iter().flatten().all(|v| *v == 0.0));
    }
}
