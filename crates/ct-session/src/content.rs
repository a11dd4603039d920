//! Content resolution
//!
//! A session needs exactly one content path before it is constructed. The
//! host either selected a game explicitly or was launched with a path (a
//! file association or launch intent); the explicit selection wins.

use ct_core::config::ContentConfig;
use ct_core::SessionError;
use std::path::{Path, PathBuf};

/// Picks and validates the content path for a new session
#[derive(Debug, Clone, Default)]
pub struct ContentResolver {
    config: ContentConfig,
}

impl ContentResolver {
    pub fn new(config: ContentConfig) -> Self {
        Self { config }
    }

    /// Resolve the content to run.
    ///
    /// The explicit selection is taken as is, apart from the existence check.
    /// A launch path must also carry an accepted extension.
    pub fn resolve(
        &self,
        selected: Option<&Path>,
        launch_path: Option<&Path>,
    ) -> Result<PathBuf, SessionError> {
        let path = match (selected, launch_path) {
            (Some(selected), _) => selected,
            (None, Some(launch_path)) => {
                if !self.config.accepts(launch_path) {
                    tracing::warn!("Rejecting launch path {}", launch_path.display());
                    return Err(SessionError::UnsupportedContent(launch_path.to_path_buf()));
                }
                launch_path
            }
            (None, None) => return Err(SessionError::NoContent),
        };

        if !path.is_file() {
            return Err(SessionError::ContentNotFound(path.to_path_buf()));
        }

        tracing::info!("Content: {}", path.display());
        Ok(path.to_path_buf())
    }

    pub fn accepts(&self, path: &Path) -> bool {
        self.config.accepts(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn game(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"NCSD").unwrap();
        path
    }

    #[test]
    fn test_nothing_selected() {
        let resolver = ContentResolver::default();
        let err = resolver.resolve(None, None).unwrap_err();
        assert!(matches!(err, SessionError::NoContent));
        assert_eq!(err.to_string(), "No game present to launch");
    }

    #[test]
    fn test_selection_wins_over_launch_path() {
        let dir = TempDir::new().unwrap();
        let selected = game(&dir, "selected.cia");
        let launched = game(&dir, "launched.3ds");

        let resolver = ContentResolver::default();
        let path = resolver.resolve(Some(&selected), Some(&launched)).unwrap();
        assert_eq!(path, selected);
    }

    #[test]
    fn test_launch_path_extension_checked() {
        let dir = TempDir::new().unwrap();
        let resolver = ContentResolver::default();

        let upper = game(&dir, "GAME.3DS");
        assert_eq!(resolver.resolve(None, Some(&upper)).unwrap(), upper);

        let text = game(&dir, "notes.txt");
        let err = resolver.resolve(None, Some(&text)).unwrap_err();
        assert!(matches!(err, SessionError::UnsupportedContent(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.3ds");
        let resolver = ContentResolver::default();
        let err = resolver.resolve(Some(&missing), None).unwrap_err();
        assert!(matches!(err, SessionError::ContentNotFound(_)));
    }
}
