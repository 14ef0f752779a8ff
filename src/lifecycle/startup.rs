//! Startup orchestration.
//!
//! # Responsibilities
//! - Load the manifest and check its artifact exists
//! - Compile the first configuration
//! - Map every fatal condition to a distinct process exit code
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Nothing is published unless compilation succeeds as a whole

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::net::TcpListener;

use crate::compiler::{compile, CompileError, CompiledConfig};
use crate::config::ConfigError;
use crate::manifest::{load_manifest, resolve_artifact, Manifest, ManifestError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Artifact {} referenced by the manifest is missing", .0.display())]
    ArtifactMissing(PathBuf),

    #[error("Manifest location '{0}' names no artifact file")]
    NoArtifact(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Manifest does not compile: {0}")]
    Compile(#[from] CompileError),

    #[error("Cannot bind {name} listener on {address}: {source}")]
    Bind {
        name: &'static str,
        address: String,
        #[source]
        source: io::Error,
    },
}

impl StartupError {
    /// Process exit code for this failure class.
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::Manifest(ManifestError::Missing(_)) => 1,
            StartupError::Manifest(_) => 2,
            StartupError::ArtifactMissing(_) | StartupError::NoArtifact(_) => 3,
            StartupError::Config(_) => 4,
            StartupError::Compile(_) => 5,
            StartupError::Bind { .. } => 6,
        }
    }
}

/// Bind a TCP listener, mapping failure to [`StartupError::Bind`].
pub async fn bind_listener(name: &'static str, address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            name,
            address: address.to_string(),
            source,
        })
}

/// Everything the servers need from the manifest at startup.
#[derive(Debug)]
pub struct Bootstrap {
    pub manifest: Manifest,
    pub artifact: PathBuf,
    pub config: CompiledConfig,
}

/// Load, check and compile the manifest.
pub fn bootstrap(manifest_path: &Path, artifact: Option<&Path>) -> Result<Bootstrap, StartupError> {
    let manifest = load_manifest(manifest_path)?;

    let artifact = resolve_artifact(&manifest, artifact)
        .ok_or_else(|| StartupError::NoArtifact(manifest.location.clone()))?;
    if !artifact.is_file() {
        return Err(StartupError::ArtifactMissing(artifact));
    }

    let config = compile(&manifest)?;

    tracing::info!(
        manifest = %manifest_path.display(),
        artifact = %artifact.display(),
        functions = manifest.paths.len(),
        routes = config.routes.len(),
        "Manifest compiled"
    );

    Ok(Bootstrap {
        manifest,
        artifact,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn manifest_file(yaml: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file
    }

    fn artifact() -> tempfile::NamedTempFile {
        tempfile::NamedTempFile::new().unwrap()
    }

    #[test]
    fn missing_manifest_exits_1() {
        let err = bootstrap(Path::new("/no/such/manifest.yaml"), None).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn unparsable_manifest_exits_2() {
        let file = manifest_file("paths: [not, a, map]\n");
        let err = bootstrap(file.path(), None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_artifact_exits_3() {
        let file = manifest_file("location: file:///opt/functions/missing-artifact-0.1.jar\npaths: {}\n");
        let err = bootstrap(file.path(), Some(Path::new("/no/such/functions.jar"))).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(matches!(err, StartupError::ArtifactMissing(_)));
    }

    #[test]
    fn empty_location_exits_3() {
        let file = manifest_file("paths: {}\n");
        let err = bootstrap(file.path(), None).unwrap_err();
        assert!(matches!(err, StartupError::NoArtifact(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn uncompilable_manifest_exits_5() {
        let file = manifest_file("paths:\n  /acl/:\n    handler: x.Acl\n");
        let artifact = artifact();
        let err = bootstrap(file.path(), Some(artifact.path())).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }

    #[tokio::test]
    async fn occupied_port_exits_6() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = taken.local_addr().unwrap().to_string();

        let err = bind_listener("invocation", &address).await.unwrap_err();
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("invocation"));
    }

    #[test]
    fn compiles_valid_manifest() {
        let file = manifest_file(
            "location: functions.jar\npaths:\n  /echo:\n    handler: com.example.Echo\n",
        );
        let artifact = artifact();
        let boot = bootstrap(file.path(), Some(artifact.path())).unwrap();
        assert_eq!(boot.config.routes.len(), 2);
        assert_eq!(boot.artifact, artifact.path());
    }
}
