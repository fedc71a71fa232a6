//! Rebuilds rigged character meshes from structured DSON asset records.
//!
//! The four reconstruction components live in [`convert`]; [`pipeline`]
//! runs them for one figure and hands the result to a [`scene::SceneSink`].

pub mod asset_url;
pub mod convert;
pub mod correction;
pub mod error;
pub mod library;
pub mod pipeline;
pub mod project;
pub mod scene;

pub use error::{ConvertError, ConvertResult};
