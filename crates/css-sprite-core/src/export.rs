use std::path::PathBuf;

use tracing::info;

use crate::dispatch::{GroupKey, PackingResult};

/// An output file handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub contents: Vec<u8>,
}

/// Splice group labels into the file name of `name` just before its final
/// extension: `sprite.png` + `[@2x]` -> `sprite.@2x.png`. Without an extension
/// the labels are appended. Directory components are left alone.
pub fn sprite_sheet_path(name: &str, group: &GroupKey) -> String {
    if group.is_empty() {
        return name.to_owned();
    }
    let (dir, file) = match name.rfind(['/', '\\']) {
        Some(idx) => name.split_at(idx + 1),
        None => ("", name),
    };
    let mut segments: Vec<&str> = file.split('.').collect();
    let labels = group.labels().iter().map(String::as_str);
    if segments.len() > 1 {
        let ext = segments.len() - 1;
        segments.splice(ext..ext, labels);
    } else {
        segments.extend(labels);
    }
    format!("{dir}{}", segments.join("."))
}

/// Join the configured URL prefix and a sheet path with `/`.
pub fn sheet_url(prefix: Option<&str>, sheet_path: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{}/{}", prefix.trim_end_matches('/'), sheet_path)
        }
        _ => sheet_path.to_owned(),
    }
}

/// One artifact per packed partition.
pub fn sheet_artifacts(results: &[PackingResult]) -> Vec<Artifact> {
    results
        .iter()
        .map(|result| {
            info!(
                path = %result.output_path,
                bytes = result.sheet.image.len(),
                "spritesheet created"
            );
            Artifact {
                path: PathBuf::from(&result.output_path),
                contents: result.sheet.image.clone(),
            }
        })
        .collect()
}

pub fn stylesheet_artifact(name: &str, content: String) -> Artifact {
    info!(path = name, "stylesheet created");
    Artifact {
        path: PathBuf::from(name),
        contents: content.into_bytes(),
    }
}
