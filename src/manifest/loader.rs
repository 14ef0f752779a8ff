//! Manifest loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::manifest::model::Manifest;

/// Error type for manifest loading.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest file {} is missing", .0.display())]
    Missing(PathBuf),

    #[error("Cannot read manifest file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse manifest file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Load and parse a manifest file.
pub fn load_manifest(path: &Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::Missing(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let manifest = Manifest::from_yaml(&content).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        paths = manifest.paths.len(),
        location = %manifest.location,
        "Manifest loaded"
    );

    Ok(manifest)
}

/// Resolve where the handler artifact is expected on disk.
///
/// An explicit override wins; otherwise the file name of the manifest's
/// `location` is looked up in the working directory.
pub fn resolve_artifact(manifest: &Manifest, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    Path::new(&manifest.location)
        .file_name()
        .map(|name| Path::new(".").join(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file() {
        let err = load_manifest(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ManifestError::Missing(_)));
    }

    #[test]
    fn unparsable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "paths: [this is not a mapping").unwrap();

        let err = load_manifest(file.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }

    #[test]
    fn loads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "location: lib/fns.jar\npaths:\n  /a:\n    handler: x.A").unwrap();

        let manifest = load_manifest(file.path()).unwrap();
        assert_eq!(manifest.paths.len(), 1);
    }

    #[test]
    fn artifact_defaults_to_location_file_name() {
        let manifest = Manifest {
            location: "s3://bucket/dist/functions.jar".into(),
            ..Default::default()
        };
        assert_eq!(
            resolve_artifact(&manifest, None),
            Some(Path::new(".").join("functions.jar"))
        );
    }

    #[test]
    fn artifact_override_wins() {
        let manifest = Manifest {
            location: "dist/functions.jar".into(),
            ..Default::default()
        };
        let explicit = Path::new("/opt/fns.jar");
        assert_eq!(resolve_artifact(&manifest, Some(explicit)), Some(explicit.to_path_buf()));
    }

    #[test]
    fn artifact_unresolvable_without_location() {
        assert_eq!(resolve_artifact(&Manifest::default(), None), None);
    }
}
