use std::collections::HashSet;

use log::{debug, info};

use super::types::{GeometryRecord, ReconstructedMesh};
use crate::error::{ConvertError, ConvertResult};

// ─── Mesh reconstruction ──────────────────────────────────────────────────────

/// Rebuild a polygon mesh from raw geometry records.
///
/// Every vertex is emitted in original order. Polygons with fewer than three
/// corners, an out-of-range index or a repeated vertex are skipped; the rest
/// are emitted in original order together with their original face index and
/// material slot.
///
/// Fails only when `material_indices` does not cover every polygon.
pub fn reconstruct(record: &GeometryRecord) -> ConvertResult<ReconstructedMesh> {
    if record.material_indices.len() < record.polygons.len() {
        return Err(ConvertError::MalformedGeometryRecord {
            id: record.id.clone(),
            reason: format!(
                "{} material indices for {} polygons",
                record.material_indices.len(),
                record.polygons.len()
            ),
        });
    }

    let vertex_count = record.vertices.len();
    let mut faces = Vec::with_capacity(record.polygons.len());
    let mut original_face_indices = Vec::with_capacity(record.polygons.len());
    let mut material_indices = Vec::with_capacity(record.polygons.len());
    let mut skipped_polygons = Vec::new();

    for (original_index, polygon) in record.polygons.iter().enumerate() {
        let Some(face) = resolve_polygon(polygon, vertex_count) else {
            debug!(
                "skipping invalid polygon {} of '{}' ({} corners)",
                original_index,
                record.id,
                polygon.len()
            );
            skipped_polygons.push(original_index);
            continue;
        };

        // Provenance is recorded at emission time so skipped faces never
        // shift the alignment.
        faces.push(face);
        original_face_indices.push(original_index);
        material_indices.push(record.material_indices[original_index]);
    }

    info!(
        "reconstructed '{}': {} vertices, {} faces ({} skipped)",
        record.id,
        vertex_count,
        faces.len(),
        skipped_polygons.len()
    );

    Ok(ReconstructedMesh {
        name: record.id.clone(),
        vertices: record.vertices.clone(),
        faces,
        original_face_indices,
        material_indices,
        material_names: record.material_names.clone(),
        skipped_polygons,
    })
}

/// Returns the polygon's corners when it forms a valid face.
fn resolve_polygon(polygon: &[usize], vertex_count: usize) -> Option<Vec<usize>> {
    if polygon.len() < 3 {
        return None;
    }

    let mut seen = HashSet::with_capacity(polygon.len());
    for &index in polygon {
        if index >= vertex_count || !seen.insert(index) {
            return None;
        }
    }

    Some(polygon.to_vec())
}
