use geo::{
    BoundingRect, Closest, ClosestPoint, CoordsIter, EuclideanDistance, Geometry, Intersects, Point,
    Polygon,
};

use crate::core::projection::plausible_extent;
use crate::domain::model::{Buffer, BufferSet, Feature, Layer, ResultRow, ResultTable};
use crate::utils::error::{AccError, Result};

/// Tests every buffer against every feature and aggregates one row per buffer.
///
/// The layer must already be expressed in the buffer set's reference system;
/// nothing is reprojected here.
pub fn intersect_layer(layer: &Layer, buffers: &BufferSet) -> Result<ResultTable> {
    check_reference_system(layer, buffers)?;

    let rows: Vec<ResultRow> = buffers
        .iter()
        .map(|buffer| intersect_buffer(layer, buffer, &buffers.center))
        .collect();

    tracing::debug!(
        "Intersected {} features with {} buffers, {} buffers hit",
        layer.len(),
        rows.len(),
        rows.iter().filter(|r| r.intersects).count()
    );

    Ok(ResultTable::new(buffers.crs, rows))
}

fn check_reference_system(layer: &Layer, buffers: &BufferSet) -> Result<()> {
    let crs = match layer.crs {
        None => {
            return Err(AccError::ReferenceSystemMismatchError {
                expected: buffers.crs.to_string(),
                found: "undefined".to_string(),
            })
        }
        Some(crs) if crs != buffers.crs => {
            return Err(AccError::ReferenceSystemMismatchError {
                expected: buffers.crs.to_string(),
                found: crs.to_string(),
            })
        }
        Some(crs) => crs,
    };

    let extent = plausible_extent(crs);
    for (index, feature) in layer.features.iter().enumerate() {
        let Some(rect) = feature.geometry.as_ref().and_then(|g| g.bounding_rect()) else {
            continue;
        };
        let inside = rect.min().x >= extent.min().x
            && rect.min().y >= extent.min().y
            && rect.max().x <= extent.max().x
            && rect.max().y <= extent.max().y;
        if !inside {
            return Err(AccError::ReferenceSystemMismatchError {
                expected: crs.to_string(),
                found: format!(
                    "coordinates outside the {} extent in feature {}",
                    crs,
                    feature_label(feature, index)
                ),
            });
        }
    }
    Ok(())
}

fn intersect_buffer(layer: &Layer, buffer: &Buffer, center: &Point<f64>) -> ResultRow {
    let mut row = ResultRow::empty(buffer.name.clone(), buffer.radius_m);
    let inner_disk = inner_disk(buffer);

    for (index, feature) in layer.features.iter().enumerate() {
        let Some(geometry) = &feature.geometry else {
            continue;
        };
        if !geometry.intersects(&buffer.geometry) {
            continue;
        }
        // Already counted by an inner band.
        if inner_disk
            .as_ref()
            .is_some_and(|disk| covered_by(geometry, disk))
        {
            continue;
        }

        row.count += 1;
        row.feature_ids.push(feature_label(feature, index));
        let distance = distance_to(geometry, center);
        row.min_distance_m = Some(row.min_distance_m.map_or(distance, |d| d.min(distance)));
    }

    row.intersects = row.count > 0;
    row
}

/// The closed disk cut out of a ring buffer, if any.
fn inner_disk(buffer: &Buffer) -> Option<Polygon<f64>> {
    buffer.inner_radius_m?;
    buffer
        .geometry
        .interiors()
        .first()
        .map(|ring| Polygon::new(ring.clone(), vec![]))
}

/// Boundary included. The disk is convex, so checking every vertex suffices.
fn covered_by(geometry: &Geometry<f64>, disk: &Polygon<f64>) -> bool {
    geometry
        .coords_iter()
        .all(|c| disk.intersects(&Point::from(c)))
}

fn feature_label(feature: &Feature, index: usize) -> String {
    if feature.id.is_empty() {
        format!("#{}", index)
    } else {
        feature.id.clone()
    }
}

fn distance_to(geometry: &Geometry<f64>, center: &Point<f64>) -> f64 {
    if geometry.intersects(center) {
        return 0.0;
    }
    match geometry.closest_point(center) {
        Closest::Intersection(_) => 0.0,
        Closest::SinglePoint(p) => p.euclidean_distance(center),
        // Nearest vertex is a usable upper bound.
        Closest::Indeterminate => geometry
            .coords_iter()
            .map(|c| Point::from(c).euclidean_distance(center))
            .fold(f64::INFINITY, f64::min),
    }
}
