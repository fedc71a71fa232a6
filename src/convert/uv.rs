use std::collections::{BTreeMap, HashMap};

use log::info;
use nalgebra::Point2;

use super::types::{ReconstructedMesh, UvAssignment, UvSet};
use crate::error::{ConvertError, ConvertResult};

// ─── UV set construction ──────────────────────────────────────────────────────

impl UvSet {
    /// Build a UV set and its hotswap table.
    ///
    /// The coordinate table is indexed by vertex index unless a
    /// `[polygon, vertex, uv]` triple overrides that corner. Fails when the
    /// table cannot hold one entry per vertex or an override points past it.
    pub fn new(
        id: impl Into<String>,
        expected_vertex_count: usize,
        uv_coordinates: Vec<Point2<f32>>,
        polygon_vertex_indices: &[[usize; 3]],
    ) -> ConvertResult<Self> {
        let id = id.into();

        if uv_coordinates.len() < expected_vertex_count {
            return Err(ConvertError::MalformedUvRecord {
                id,
                reason: format!(
                    "{} coordinates cannot cover {} vertices",
                    uv_coordinates.len(),
                    expected_vertex_count
                ),
            });
        }

        let mut hotswap: BTreeMap<usize, HashMap<usize, usize>> = BTreeMap::new();
        for &[polygon, vertex, uv] in polygon_vertex_indices {
            if uv >= uv_coordinates.len() {
                return Err(ConvertError::MalformedUvRecord {
                    id,
                    reason: format!(
                        "polygon {polygon} vertex {vertex} maps to uv {uv} (table has {})",
                        uv_coordinates.len()
                    ),
                });
            }
            hotswap.entry(polygon).or_default().insert(vertex, uv);
        }

        Ok(Self {
            id,
            expected_vertex_count,
            uv_coordinates,
            hotswap,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expected_vertex_count(&self) -> usize {
        self.expected_vertex_count
    }

    /// Reorder a face's vertex indices into indices of the UV table.
    ///
    /// # Arguments
    ///
    /// * `original_index` - Face index in the source geometry.
    /// * `vertex_indices` - The face's vertex indices in winding order.
    ///
    /// # Returns
    ///
    /// One UV index per corner, in the same corner order.
    pub fn hotswap_polygon(&self, original_index: usize, vertex_indices: &[usize]) -> Vec<usize> {
        match self.hotswap.get(&original_index) {
            Some(overrides) => vertex_indices
                .iter()
                .map(|vertex| overrides.get(vertex).copied().unwrap_or(*vertex))
                .collect(),
            None => vertex_indices.to_vec(),
        }
    }
}

// ─── Remapping ────────────────────────────────────────────────────────────────

/// Compute per-corner UV coordinates for a reconstructed mesh.
///
/// Fails with [`ConvertError::VertexCountMismatch`] before producing anything
/// when the UV set was authored for a different vertex count.
pub fn remap(mesh: &ReconstructedMesh, uv_set: &UvSet) -> ConvertResult<UvAssignment> {
    if uv_set.expected_vertex_count != mesh.vertex_count() {
        return Err(ConvertError::VertexCountMismatch {
            context: "uv set",
            expected: uv_set.expected_vertex_count,
            actual: mesh.vertex_count(),
        });
    }

    let mut per_corner = Vec::with_capacity(mesh.corner_count());
    for (face, original_index) in mesh.faces.iter().zip(&mesh.original_face_indices) {
        for uv_index in uv_set.hotswap_polygon(*original_index, face) {
            // Corner vertices are below the vertex count, which the table
            // covers, and overrides were range-checked on construction.
            per_corner.push(uv_set.uv_coordinates[uv_index]);
        }
    }

    info!(
        "mapped uv set '{}' onto '{}': {} corners",
        uv_set.id,
        mesh.name,
        per_corner.len()
    );

    Ok(UvAssignment {
        name: uv_set.id.clone(),
        per_corner,
        corner_starts: mesh.corner_starts(),
    })
}
