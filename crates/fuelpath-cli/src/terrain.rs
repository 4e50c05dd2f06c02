//! Terrain loading for the CLI: heightmap rasters from disk or built-in
//! synthetic maps.

use anyhow::{Context, Result};
use clap::ValueEnum;
use fuelpath_core::{ElevationSurface, GrayscaleRaster, TerrainError, MAX_ELEVATION, MIN_ELEVATION};
use std::path::Path;

/// Built-in maps for trying things out without a heightmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyntheticTerrain {
    /// Sea level everywhere
    Flat,
    /// Wall across the middle with a pass near the bottom edge
    Ridge,
    /// Rolling hills
    Hills,
}

/// Build a synthetic surface of the given size.
pub fn synthetic(kind: SyntheticTerrain, width: usize, height: usize) -> Result<ElevationSurface, TerrainError> {
    match kind {
        SyntheticTerrain::Flat => ElevationSurface::flat(width, height, 0.0),
        SyntheticTerrain::Ridge => {
            let wall = (width * 45 / 100)..(width * 55 / 100).max(width * 45 / 100 + 1);
            let pass_from = height * 8 / 10;
            let values = (0..width * height)
                .map(|idx| {
                    let (x, y) = (idx % width, idx / width);
                    if wall.contains(&x) && y < pass_from {
                        MAX_ELEVATION
                    } else {
                        0.0
                    }
                })
                .collect();
            ElevationSurface::from_elevations(width, height, values)
        }
        SyntheticTerrain::Hills => {
            let values = (0..width * height)
                .map(|idx| {
                    let (x, y) = ((idx % width) as f64, (idx / width) as f64);
                    let h = (x * 0.05).sin() * 6.0 + (y * 0.04).cos() * 4.0;
                    h.floor().clamp(MIN_ELEVATION, MAX_ELEVATION)
                })
                .collect();
            ElevationSurface::from_elevations(width, height, values)
        }
    }
}

/// Read a [`GrayscaleRaster`] JSON file and build a surface from it.
pub fn load_raster(path: &Path) -> Result<ElevationSurface> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("reading terrain {}", path.display()))?;
    let raster: GrayscaleRaster = serde_json::from_str(&body)
        .with_context(|| format!("parsing terrain {}", path.display()))?;
    let surface = ElevationSurface::from_source(&raster)
        .with_context(|| format!("building terrain {}", path.display()))?;
    tracing::info!(
        path = %path.display(),
        width = surface.width(),
        height = surface.height(),
        "loaded terrain"
    );
    Ok(surface)
}
