//! Release matrix: one build-and-package entry per platform.

use kiln_core::{Error, MatrixEntry, PipelineConfig, Platform, Result};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMatrix {
    entries: Vec<MatrixEntry>,
}

impl ReleaseMatrix {
    /// Expand the configuration over every platform.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            entries: Platform::ALL
                .iter()
                .map(|&platform| MatrixEntry::for_platform(platform, config))
                .collect(),
        }
    }

    pub fn from_entries(entries: Vec<MatrixEntry>) -> Self {
        Self { entries }
    }

    /// Exactly one entry per platform, with archive names unique and
    /// binary names non-empty.
    pub fn validate(&self) -> Result<()> {
        let mut platforms = HashSet::new();
        let mut archives = HashSet::new();

        for entry in &self.entries {
            if !platforms.insert(entry.platform) {
                return Err(Error::InvalidMatrix(format!(
                    "duplicate entry for {}",
                    entry.platform
                )));
            }
            if !archives.insert(entry.archive_name.as_str()) {
                return Err(Error::InvalidMatrix(format!(
                    "archive name {} is used twice",
                    entry.archive_name
                )));
            }
            if entry.binary_file_name.is_empty() {
                return Err(Error::InvalidMatrix(format!(
                    "empty binary name for {}",
                    entry.platform
                )));
            }
        }

        if let Some(missing) = Platform::ALL.iter().find(|p| !platforms.contains(*p)) {
            return Err(Error::InvalidMatrix(format!("no entry for {}", missing)));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[MatrixEntry] {
        &self.entries
    }

    pub fn get(&self, platform: Platform) -> Option<&MatrixEntry> {
        self.entries.iter().find(|e| e.platform == platform)
    }

    pub fn archive_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.archive_name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matrix_is_valid() {
        let matrix = ReleaseMatrix::from_config(&PipelineConfig::default());
        matrix.validate().unwrap();
        assert_eq!(
            matrix.archive_names(),
            vec!["zr-linux.tar.gz", "zr-macos.tar.gz", "zr-windows.zip"]
        );
    }

    #[test]
    fn test_duplicate_archive_rejected() {
        let config = PipelineConfig::default();
        let mut macos = MatrixEntry::for_platform(Platform::Macos, &config);
        macos.archive_name = "zr-linux.tar.gz".to_string();
        let matrix = ReleaseMatrix::from_entries(vec![
            MatrixEntry::for_platform(Platform::Linux, &config),
            macos,
            MatrixEntry::for_platform(Platform::Windows, &config),
        ]);

        assert!(matches!(matrix.validate(), Err(Error::InvalidMatrix(_))));
    }

    #[test]
    fn test_missing_platform_rejected() {
        let config = PipelineConfig::default();
        let matrix = ReleaseMatrix::from_entries(vec![
            MatrixEntry::for_platform(Platform::Linux, &config),
            MatrixEntry::for_platform(Platform::Macos, &config),
        ]);

        let err = matrix.validate().unwrap_err();
        assert!(err.to_string().contains("windows"));
    }

    #[test]
    fn test_duplicate_platform_rejected() {
        let config = PipelineConfig::default();
        let matrix = ReleaseMatrix::from_entries(vec![
            MatrixEntry::for_platform(Platform::Linux, &config),
            MatrixEntry::for_platform(Platform::Linux, &config),
            MatrixEntry::for_platform(Platform::Windows, &config),
        ]);

        assert!(matrix.validate().is_err());
    }
}
