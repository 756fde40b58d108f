//! Artifact locator resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a deployable compute artifact lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Local bundle: file:///abs/bootstrap.zip or ./relative/bootstrap.zip
    File { path: String },
    /// Object storage: s3://bucket/key/bootstrap.zip
    S3 { bucket: String, key: String },
    /// Container image: oci://registry.example.com/repo:tag
    Oci { registry: String, repository: String, tag: String },
    /// Remote bundle: https://releases.example.com/fn.zip
    Https { url: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum SourceError {
    #[error("unsupported artifact scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid artifact locator: {0}")]
    InvalidLocator(String),
}

impl ArtifactSource {
    pub fn parse(locator: &str) -> Result<Self, SourceError> {
        if locator.is_empty() {
            return Err(SourceError::InvalidLocator(locator.to_string()));
        }
        if let Some(rest) = locator.strip_prefix("oci://") {
            let (repo_path, tag) = rest.rsplit_once(':').unwrap_or((rest, "latest"));
            let (registry, repository) = repo_path
                .split_once('/')
                .ok_or_else(|| SourceError::InvalidLocator(locator.to_string()))?;
            Ok(Self::Oci {
                registry: registry.to_string(),
                repository: repository.to_string(),
                tag: tag.to_string(),
            })
        } else if locator.starts_with("https://") {
            Ok(Self::Https {
                url: locator.to_string(),
            })
        } else if let Some(rest) = locator.strip_prefix("s3://") {
            match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Self::S3 {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                }),
                _ => Err(SourceError::InvalidLocator(locator.to_string())),
            }
        } else if let Some(path) = locator.strip_prefix("file://") {
            Ok(Self::File {
                path: path.to_string(),
            })
        } else if locator.starts_with("./") || locator.starts_with('/') || locator.ends_with(".zip") {
            Ok(Self::File {
                path: locator.to_string(),
            })
        } else {
            Err(SourceError::UnsupportedScheme(locator.to_string()))
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::File { .. } => "file",
            Self::S3 { .. } => "s3",
            Self::Oci { .. } => "oci",
            Self::Https { .. } => "https",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_relative_bundle() {
        let src = ArtifactSource::parse("./src/get-user/target/lambda/get-user/bootstrap.zip").unwrap();
        assert_eq!(src.scheme(), "file");
    }

    #[test]
    fn parse_s3() {
        let src = ArtifactSource::parse("s3://artifacts/users/get-user.zip").unwrap();
        assert_eq!(
            src,
            ArtifactSource::S3 {
                bucket: "artifacts".to_string(),
                key: "users/get-user.zip".to_string()
            }
        );
    }

    #[test]
    fn parse_oci_defaults_tag() {
        let src = ArtifactSource::parse("oci://registry.example.com/users/get").unwrap();
        match src {
            ArtifactSource::Oci { tag, .. } => assert_eq!(tag, "latest"),
            other => panic!("expected oci, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_and_empty() {
        assert!(matches!(
            ArtifactSource::parse("git://github.com/org/repo.git"),
            Err(SourceError::UnsupportedScheme(_))
        ));
        assert!(matches!(ArtifactSource::parse("s3://bucket-only"), Err(SourceError::InvalidLocator(_))));
        assert!(ArtifactSource::parse("").is_err());
    }
}
