//! Asset reference URLs.
//!
//! References in character assets look like
//! `Genesis8Female:/data/DAZ%203D/Genesis%208/Female/Genesis8Female.dsf#lShldrBend?rotation/x`:
//! an optional node scheme before the first `:/`, a percent-encoded file path,
//! the asset id after `#` and an optional property path after `?`.

use crate::error::{ConvertError, ConvertResult};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetUrl {
    pub node_name: Option<String>,
    pub file_path: Option<String>,
    pub asset_id: Option<String>,
    pub property_path: Option<String>,
}

impl AssetUrl {
    /// Parses a reference URL into its parts, percent-decoding each one.
    pub fn parse(url: &str) -> ConvertResult<Self> {
        let decode = |part: &str| -> ConvertResult<Option<String>> {
            percent_decode(part)
                .map(|value| non_empty(&value))
                .ok_or_else(|| ConvertError::InvalidUrl(url.to_string()))
        };

        let (rest, property_path) = match url.split_once('?') {
            Some((rest, property)) => (rest, decode(property)?),
            None => (url, None),
        };

        let (rest, asset_id) = match rest.split_once('#') {
            Some((rest, id)) => (rest, decode(id)?),
            None => (rest, None),
        };

        let (node_name, file_path) = match rest.split_once(":/") {
            Some((node, path)) => (decode(node)?, decode(&format!("/{path}"))?),
            None => (None, decode(rest)?),
        };

        Ok(Self {
            node_name,
            file_path,
            asset_id,
            property_path,
        })
    }
}

/// Strips reference-path decoration, returning the bare asset id.
///
/// Values without a `#` fragment are already bare ids. Returns `None` when
/// nothing is left.
pub fn strip_to_asset_id(reference: &str) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed.contains('#') {
        let bare = trimmed.split('?').next().unwrap_or_default();
        return percent_decode(bare).and_then(|id| non_empty(&id));
    }

    AssetUrl::parse(trimmed).ok().and_then(|url| url.asset_id)
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = bytes.get(index + 1..index + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            out.push(bytes[index]);
            index += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_full_url_when_parsing_then_all_parts_are_decoded() {
        let url = AssetUrl::parse(
            "Genesis8Female:/data/DAZ%203D/Genesis%208/Female/Genesis8Female.dsf#lShldrBend?rotation/x",
        )
        .expect("valid url");

        assert_eq!(url.node_name.as_deref(), Some("Genesis8Female"));
        assert_eq!(
            url.file_path.as_deref(),
            Some("/data/DAZ 3D/Genesis 8/Female/Genesis8Female.dsf")
        );
        assert_eq!(url.asset_id.as_deref(), Some("lShldrBend"));
        assert_eq!(url.property_path.as_deref(), Some("rotation/x"));
    }

    #[test]
    fn given_fragment_only_when_stripping_then_bare_id_is_returned() {
        assert_eq!(strip_to_asset_id("#hip").as_deref(), Some("hip"));
        assert_eq!(strip_to_asset_id("pelvis").as_deref(), Some("pelvis"));
        assert_eq!(strip_to_asset_id("l%20hand").as_deref(), Some("l hand"));
        assert_eq!(strip_to_asset_id(""), None);
        assert_eq!(strip_to_asset_id("/data/figure.dsf#"), None);
    }

    #[test]
    fn given_broken_escape_when_parsing_then_error_is_returned() {
        assert!(matches!(
            AssetUrl::parse("/data/bad%2.dsf#x"),
            Err(ConvertError::InvalidUrl(_))
        ));
    }

    #[test]
    fn given_signed_escape_when_parsing_then_error_is_returned() {
        assert!(matches!(
            AssetUrl::parse("/data/a%+1.dsf#x"),
            Err(ConvertError::InvalidUrl(_))
        ));
        assert_eq!(strip_to_asset_id("l%-1hand"), None);
    }
}
