use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Vector3};

use crate::convert::{Axis, RotationOrder};

/// Builds the joint orientation matrix from angles in degrees.
///
/// Orientation is always composed in XYZ order (X applied first), whatever
/// rotation order the bone declares.
///
/// # Arguments
///
/// * `orientation_deg` - Rotation about X, Y and Z in degrees.
///
/// # Returns
///
/// Homogeneous rotation matrix.
pub fn orientation_matrix(orientation_deg: &Vector3<f32>) -> Matrix4<f32> {
    Rotation3::from_euler_angles(
        orientation_deg.x.to_radians(),
        orientation_deg.y.to_radians(),
        orientation_deg.z.to_radians(),
    )
    .to_homogeneous()
}

/// Returns the fixed rotation that turns the target's +Y bone axis onto the
/// asset's primary axis.
///
/// * X primary: -90° about Z.
/// * Y primary: identity.
/// * Z primary: +90° about X.
pub fn direction_correction(order: RotationOrder) -> Matrix4<f32> {
    match order.primary_axis() {
        Axis::X => rotation_about(&Vector3::z_axis(), -90.0),
        Axis::Y => Matrix4::identity(),
        Axis::Z => rotation_about(&Vector3::x_axis(), 90.0),
    }
}

/// Returns a 180° turn when the bone's end point lies behind its center point
/// along the primary axis, otherwise identity.
///
/// X and Y primaries flip about X; Z primary flips about Z.
pub fn flip_correction(
    order: RotationOrder,
    center_point: &Point3<f32>,
    end_point: &Point3<f32>,
) -> Matrix4<f32> {
    match order.primary_axis() {
        Axis::X if end_point.x < center_point.x => rotation_about(&Vector3::x_axis(), 180.0),
        Axis::Y if end_point.y < center_point.y => rotation_about(&Vector3::x_axis(), 180.0),
        Axis::Z if end_point.z < center_point.z => rotation_about(&Vector3::z_axis(), 180.0),
        _ => Matrix4::identity(),
    }
}

/// Composes the bind-pose transform of a bone.
///
/// # Arguments
///
/// * `offset` - Root-relative joint position.
/// * `orientation` - Output of [`orientation_matrix`].
/// * `direction` - Output of [`direction_correction`].
/// * `flip` - Output of [`flip_correction`].
///
/// # Returns
///
/// `translation * orientation * direction * flip`.
pub fn compose_bone_matrix(
    offset: &Vector3<f32>,
    orientation: &Matrix4<f32>,
    direction: &Matrix4<f32>,
    flip: &Matrix4<f32>,
) -> Matrix4<f32> {
    Translation3::from(*offset).to_homogeneous() * orientation * direction * flip
}

/// Tail position of a bone whose length runs along its local +Y axis.
pub fn bone_tail(matrix: &Matrix4<f32>, length: f32) -> Point3<f32> {
    matrix.transform_point(&Point3::new(0.0, length, 0.0))
}

fn rotation_about(axis: &nalgebra::Unit<Vector3<f32>>, degrees: f32) -> Matrix4<f32> {
    Rotation3::from_axis_angle(axis, degrees.to_radians()).to_homogeneous()
}
