//! Target platforms and the release matrix entry derived from each one.
//!
//! The platform set is closed: every packaging and stripping rule is a
//! `match` over [`Platform`] here, so no per-platform procedure exists
//! anywhere else in the pipeline.

use crate::config::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A supported release platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

/// Operating-system family of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    Unix,
    Windows,
}

/// Archive container used to distribute a single binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveFormat {
    /// gzip-compressed tar.
    TarGz,
    /// zip with deflate entries.
    Zip,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

impl Platform {
    /// The fixed platform set every run checks and releases.
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::Macos, Platform::Windows];

    pub fn id(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }

    pub fn family(&self) -> PlatformFamily {
        match self {
            Platform::Linux | Platform::Macos => PlatformFamily::Unix,
            Platform::Windows => PlatformFamily::Windows,
        }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self.family() {
            PlatformFamily::Unix => ArchiveFormat::TarGz,
            PlatformFamily::Windows => ArchiveFormat::Zip,
        }
    }

    /// Windows binaries keep their symbols; Unix binaries are stripped.
    pub fn strips_symbols(&self) -> bool {
        self.family() == PlatformFamily::Unix
    }

    /// Executable compressor arguments for this platform.
    pub fn compression_args(&self) -> &'static str {
        match self {
            Platform::Linux => "--best --lzma",
            Platform::Macos => "--best",
            Platform::Windows => "-9",
        }
    }

    /// The platform this process runs on, if it is one of the release targets.
    pub fn host() -> Option<Platform> {
        Self::from_os(std::env::consts::OS)
    }

    fn from_os(os: &str) -> Option<Platform> {
        match os {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::Macos),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }

    pub fn executable_name(&self, binary_name: &str) -> String {
        match self.family() {
            PlatformFamily::Unix => binary_name.to_string(),
            PlatformFamily::Windows => format!("{}.exe", binary_name),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Platform {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" | "ubuntu" | "ubuntu-latest" => Ok(Platform::Linux),
            "macos" | "macos-latest" | "darwin" => Ok(Platform::Macos),
            "windows" | "windows-latest" => Ok(Platform::Windows),
            other => Err(crate::Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// Release configuration for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub platform: Platform,
    /// Executable name inside the archive.
    pub binary_file_name: String,
    /// Where the release build leaves the binary, relative to the workspace.
    pub source_binary_path: PathBuf,
    pub archive_name: String,
    pub compression_args: String,
    pub strip_symbols: bool,
    pub archive_format: ArchiveFormat,
    /// Cross/static target passed to the release build, if any.
    pub build_target: Option<String>,
}

impl MatrixEntry {
    pub fn for_platform(platform: Platform, config: &PipelineConfig) -> Self {
        let binary_file_name = platform.executable_name(&config.binary_name);
        let build_target = match platform {
            Platform::Linux => Some(config.static_target.clone()),
            Platform::Macos | Platform::Windows => None,
        };

        let mut source_binary_path = PathBuf::from("target");
        if let Some(target) = &build_target {
            source_binary_path.push(target);
        }
        source_binary_path.push("release");
        source_binary_path.push(&binary_file_name);

        let archive_format = platform.archive_format();
        let archive_name = format!(
            "{}-{}.{}",
            config.binary_name,
            platform.id(),
            archive_format.extension()
        );

        Self {
            platform,
            binary_file_name,
            source_binary_path,
            archive_name,
            compression_args: platform.compression_args().to_string(),
            strip_symbols: platform.strips_symbols(),
            archive_format,
            build_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_platform_parses_ci_runner_labels() {
        assert_eq!("ubuntu-latest".parse::<Platform>().unwrap(), Platform::Linux);
        assert_eq!("MacOS".parse::<Platform>().unwrap(), Platform::Macos);
        assert_eq!("windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert!("solaris".parse::<Platform>().is_err());
    }

    #[test]
    fn test_host_maps_rust_os_names() {
        assert_eq!(Platform::from_os("linux"), Some(Platform::Linux));
        assert_eq!(Platform::from_os("macos"), Some(Platform::Macos));
        assert_eq!(Platform::from_os("windows"), Some(Platform::Windows));
        assert_eq!(Platform::from_os("freebsd"), None);
        if cfg!(target_os = "linux") {
            assert_eq!(Platform::host(), Some(Platform::Linux));
        }
    }

    #[test]
    fn test_only_windows_uses_zip_and_keeps_symbols() {
        for platform in Platform::ALL {
            let is_windows = platform == Platform::Windows;
            assert_eq!(platform.archive_format() == ArchiveFormat::Zip, is_windows);
            assert_eq!(platform.strips_symbols(), !is_windows);
        }
    }

    #[test]
    fn test_linux_entry_uses_static_target() {
        let config = PipelineConfig::default();
        let entry = MatrixEntry::for_platform(Platform::Linux, &config);

        assert_eq!(entry.archive_name, "zr-linux.tar.gz");
        assert_eq!(entry.build_target.as_deref(), Some("x86_64-unknown-linux-musl"));
        assert_eq!(
            entry.source_binary_path,
            Path::new("target/x86_64-unknown-linux-musl/release/zr")
        );
    }

    #[test]
    fn test_windows_entry() {
        let config = PipelineConfig::default();
        let entry = MatrixEntry::for_platform(Platform::Windows, &config);

        assert_eq!(entry.binary_file_name, "zr.exe");
        assert_eq!(entry.archive_name, "zr-windows.zip");
        assert_eq!(entry.source_binary_path, Path::new("target/release/zr.exe"));
        assert!(!entry.strip_symbols);
        assert_eq!(entry.build_target, None);
    }
}
