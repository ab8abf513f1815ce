use crate::domain::reservation::ApplicantIdentity;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Remembers the last applicant between runs.
pub trait IdentityStore {
    fn load(&self) -> anyhow::Result<Option<ApplicantIdentity>>;
    fn save(&self, identity: &ApplicantIdentity) -> anyhow::Result<()>;
}

/// Two-line text file: name, then phone digits.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> anyhow::Result<Option<ApplicantIdentity>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };

        let mut lines = text.lines();
        let name = lines.next().unwrap_or_default();
        let phone = lines.next().unwrap_or_default();
        match ApplicantIdentity::parse(name, phone) {
            Ok(identity) => Ok(Some(identity)),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring invalid saved identity");
                Ok(None)
            }
        }
    }

    fn save(&self, identity: &ApplicantIdentity) -> anyhow::Result<()> {
        let body = format!("{}\n{}\n", identity.name(), identity.phone_digits());
        std::fs::write(&self.path, body)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("applicant.txt"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saves_two_line_record_and_reads_it_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileIdentityStore::new(dir.path().join("applicant.txt"));
        let identity = ApplicantIdentity::parse("Hong Gildong", "010 1234 5678").unwrap();

        store.save(&identity).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "Hong Gildong\n01012345678\n");
        assert_eq!(store.load().unwrap(), Some(identity));
    }

    #[test]
    fn invalid_record_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("applicant.txt");
        std::fs::write(&path, "Hong\n0101234\n").unwrap();
        assert!(FileIdentityStore::new(path).load().unwrap().is_none());
    }
}
