use anyhow::{Context, Result};
use log::info;
use serde::Serialize;

use crate::convert::{
    ConvertOptions, ValidationIssue, apply, build_with_options, collect_geometry_issues,
    collect_skeleton_issues, collect_skin_issues, reconstruct, remap,
};
use crate::error::ConvertResult;
use crate::library::RecordSource;
use crate::project::ConversionSettings;
use crate::scene::{RigOutput, SceneSink};

/// Asset references for one conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub figure_url: String,
    pub geometry_url: String,
    pub uv_set_url: Option<String>,
    pub skin_binding_url: Option<String>,
    pub options: ConvertOptions,
}

impl From<&ConversionSettings> for ConversionRequest {
    fn from(settings: &ConversionSettings) -> Self {
        Self {
            figure_url: settings.figure_url.clone(),
            geometry_url: settings.geometry_url.clone(),
            uv_set_url: settings.uv_set_url.clone(),
            skin_binding_url: settings.skin_binding_url.clone(),
            options: settings.options(),
        }
    }
}

/// Summary of a finished conversion run.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub figure: String,
    pub mesh: String,
    pub bone_count: usize,
    pub root_bone_count: usize,
    pub vertex_count: usize,
    pub face_count: usize,
    pub skipped_polygon_count: usize,
    pub uv_corner_count: Option<usize>,
    pub weight_group_count: Option<usize>,
    pub issues: Vec<ValidationIssue>,
}

/// Run all reconstruction components for one figure without touching any
/// scene.
///
/// Every record is looked up before any work starts. Skeleton and geometry
/// are built concurrently, then UV remapping and skin binding run
/// concurrently on the finished mesh. The first fatal error aborts the run.
pub fn assemble_rig<S>(
    source: &S,
    request: &ConversionRequest,
) -> ConvertResult<(RigOutput, Vec<ValidationIssue>)>
where
    S: RecordSource + Sync,
{
    let figure = source.node(&request.figure_url)?;
    let hierarchy = source.hierarchy(&request.figure_url)?;
    let geometry = source.geometry(&request.geometry_url)?;
    let uv_set = request
        .uv_set_url
        .as_deref()
        .map(|url| source.uv_set(url))
        .transpose()?;
    let binding = request
        .skin_binding_url
        .as_deref()
        .map(|url| source.skin_binding(url))
        .transpose()?;

    let (skeleton, mesh) = rayon::join(
        || build_with_options(figure, &hierarchy, &request.options),
        || reconstruct(geometry),
    );
    let (skeleton, mesh) = (skeleton?, mesh?);

    let (uv, skin) = rayon::join(
        || uv_set.map(|uv_set| remap(&mesh, uv_set)).transpose(),
        || {
            binding
                .map(|binding| apply(mesh.vertex_count(), binding))
                .transpose()
        },
    );
    let (uv, skin) = (uv?, skin?);

    let mut issues = collect_geometry_issues(&mesh);
    issues.extend(collect_skeleton_issues(&skeleton));
    if let Some(skin) = &skin {
        issues.extend(collect_skin_issues(skin, &skeleton));
    }

    Ok((
        RigOutput {
            mesh,
            skeleton,
            uv,
            skin,
        },
        issues,
    ))
}

/// Convert one figure and hand the result to `sink`.
///
/// The sink is called exactly once, and only after every component
/// succeeded.
pub fn convert_figure<S, K>(
    source: &S,
    request: &ConversionRequest,
    sink: &mut K,
) -> Result<ConversionReport>
where
    S: RecordSource + Sync,
    K: SceneSink,
{
    let (rig, issues) = assemble_rig(source, request)
        .with_context(|| format!("failed to convert figure {}", request.figure_url))?;

    let report = ConversionReport {
        figure: rig.skeleton.name.clone(),
        mesh: rig.mesh.name.clone(),
        bone_count: rig.skeleton.len(),
        root_bone_count: rig.skeleton.roots().count(),
        vertex_count: rig.mesh.vertex_count(),
        face_count: rig.mesh.face_count(),
        skipped_polygon_count: rig.mesh.skipped_polygons.len(),
        uv_corner_count: rig.uv.as_ref().map(|uv| uv.per_corner.len()),
        weight_group_count: rig.skin.as_ref().map(|skin| skin.groups.len()),
        issues,
    };

    sink.insert_rig(rig)
        .context("failed to insert converted rig into scene")?;

    info!(
        "converted '{}': {} bones, {} faces, {} issues",
        report.figure,
        report.bone_count,
        report.face_count,
        report.issues.len()
    );

    Ok(report)
}
