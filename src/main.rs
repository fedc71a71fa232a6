use std::{env, fs, path::PathBuf, process};

use anyhow::Context;
use dson2rig::{
    library::AssetLibrary,
    pipeline::{ConversionRequest, convert_figure},
    project::load_settings,
    scene::SceneAssembly,
};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: dson2rig <settings.json> <output.json>");
        process::exit(2);
    }

    let settings_path = PathBuf::from(&args[1]);
    let output_path = PathBuf::from(&args[2]);

    let settings = load_settings(&settings_path)?;
    let request = ConversionRequest::from(&settings);

    let mut library = AssetLibrary::new(settings.content_directories.clone());
    let urls = [
        Some(&request.figure_url),
        Some(&request.geometry_url),
        request.uv_set_url.as_ref(),
        request.skin_binding_url.as_ref(),
    ];
    for url in urls.into_iter().flatten() {
        library.load(url)?;
    }

    let mut scene = SceneAssembly::default();
    let report = convert_figure(&library, &request, &mut scene)?;

    let json = serde_json::to_vec_pretty(&scene).context("failed to serialize scene")?;
    fs::write(&output_path, json)
        .with_context(|| format!("failed to write output: {}", output_path.display()))?;

    println!(
        "Figure: {} ({} bones, {} roots)",
        report.figure, report.bone_count, report.root_bone_count
    );
    println!(
        "Mesh: {} ({} vertices, {} faces, {} skipped)",
        report.mesh, report.vertex_count, report.face_count, report.skipped_polygon_count
    );
    if let Some(corners) = report.uv_corner_count {
        println!("UV corners: {corners}");
    }
    if let Some(groups) = report.weight_group_count {
        println!("Weight groups: {groups}");
    }
    for issue in &report.issues {
        println!("[{:?}] {}: {}", issue.severity, issue.code, issue.message);
    }

    Ok(())
}
