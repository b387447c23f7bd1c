//! Filesystem source acquisition

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::{AcquireError, AcquiredSource, ResourceAcquirer};

/// Reads module sources from a directory tree as UTF-8 text.
#[derive(Debug)]
pub struct FsAcquirer {
    root: PathBuf,
}

impl FsAcquirer {
    pub fn new(root: impl Into<PathBuf>) -> FsAcquirer {
        FsAcquirer { root: root.into() }
    }
}

#[async_trait]
impl ResourceAcquirer for FsAcquirer {
    async fn acquire(&self, resource: &str) -> Result<AcquiredSource, AcquireError> {
        let path = self.root.join(resource);
        debug!("reading module source from {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(AcquiredSource::Text(text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AcquireError::NotFound(path.display().to_string()))
            }
            Err(err) => Err(AcquireError::Io {
                resource: resource.to_string(),
                source: err,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reads_source_text_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("widgets")).unwrap();
        fs::write(dir.path().join("widgets/table.js"), "table source").unwrap();

        let acquirer = FsAcquirer::new(dir.path());
        let acquired = futures::executor::block_on(acquirer.acquire("widgets/table.js")).unwrap();
        match acquired {
            AcquiredSource::Text(text) => assert_eq!(text, "table source"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let acquirer = FsAcquirer::new(dir.path());
        let result = futures::executor::block_on(acquirer.acquire("absent.js"));
        assert!(matches!(result, Err(AcquireError::NotFound(_))));
    }
}
