//! Packaging rules per platform: stripping, compression and archive format.

use async_trait::async_trait;
use kiln_core::ports::{CommandOutput, CommandRunner, CommandSpec};
use kiln_core::{ArchiveFormat, Error, MatrixEntry, PipelineConfig, Platform, Result};
use kiln_package::{ArtifactPackager, Shrinker, list_entries, sha256_file};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Pretends to be `strip` and `upx`: records calls and halves the file on
/// every successful invocation.
struct FakeTools {
    calls: Mutex<Vec<CommandSpec>>,
    fail_program: Option<&'static str>,
}

impl FakeTools {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_program: None,
        }
    }

    fn failing(program: &'static str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_program: Some(program),
        }
    }

    fn programs(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.program.clone())
            .collect()
    }
}

#[async_trait]
impl CommandRunner for FakeTools {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(spec.clone());
        if self.fail_program == Some(spec.program.as_str()) {
            return Ok(CommandOutput {
                exit_code: 1,
                success: false,
                duration_ms: 0,
                stderr_tail: vec!["NotCompressibleException".to_string()],
            });
        }
        let target = PathBuf::from(spec.args.last().expect("binary path"));
        let data = std::fs::read(&target)?;
        std::fs::write(&target, &data[..data.len() / 2])?;
        Ok(CommandOutput {
            exit_code: 0,
            success: true,
            duration_ms: 0,
            stderr_tail: vec![],
        })
    }
}

fn setup(platform: Platform) -> (tempfile::TempDir, MatrixEntry, PipelineConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default();
    let entry = MatrixEntry::for_platform(platform, &config);
    let binary = dir.path().join(&entry.source_binary_path);
    std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
    std::fs::write(&binary, vec![0xAB; 8192]).unwrap();
    (dir, entry, config)
}

fn packager(tools: Arc<FakeTools>, workspace: &Path, config: &PipelineConfig) -> ArtifactPackager {
    ArtifactPackager::new(
        Shrinker::new(tools, config),
        workspace.to_path_buf(),
        config.output_dir_in(workspace),
    )
}

#[tokio::test]
async fn test_linux_is_stripped_then_compressed_into_tar_gz() {
    let (dir, entry, config) = setup(Platform::Linux);
    let tools = Arc::new(FakeTools::new());

    let asset = packager(tools.clone(), dir.path(), &config)
        .package(&entry)
        .await
        .unwrap();

    assert_eq!(tools.programs(), vec!["strip", "upx"]);
    let calls = tools.calls.lock().unwrap();
    assert_eq!(&calls[1].args[..2], ["--best", "--lzma"]);

    assert_eq!(asset.name, "zr-linux.tar.gz");
    assert_eq!(asset.path, dir.path().join(".").join("zr-linux.tar.gz"));
    let entries = list_entries(&asset.path, ArchiveFormat::TarGz).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "zr");
    // strip and upx each halved it
    assert_eq!(entries[0].size, 2048);
}

#[tokio::test]
async fn test_windows_is_never_stripped_and_zipped() {
    let (dir, entry, config) = setup(Platform::Windows);
    let tools = Arc::new(FakeTools::new());

    let asset = packager(tools.clone(), dir.path(), &config)
        .package(&entry)
        .await
        .unwrap();

    assert_eq!(tools.programs(), vec!["upx"]);
    assert_eq!(tools.calls.lock().unwrap()[0].args[0], "-9");

    assert_eq!(asset.name, "zr-windows.zip");
    let entries = list_entries(&asset.path, ArchiveFormat::Zip).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "zr.exe");
    assert_eq!(entries[0].size, 4096);
}

#[tokio::test]
async fn test_archive_is_relocated_out_of_build_dir() {
    let (dir, entry, config) = setup(Platform::Macos);
    let tools = Arc::new(FakeTools::new());

    let asset = packager(tools, dir.path(), &config)
        .package(&entry)
        .await
        .unwrap();

    let build_dir = dir.path().join("target/release");
    assert!(!build_dir.join("zr-macos.tar.gz").exists());
    assert!(dir.path().join("zr-macos.tar.gz").exists());
    assert_eq!(asset.sha256, sha256_file(&asset.path).unwrap());
    assert_eq!(asset.size, std::fs::metadata(&asset.path).unwrap().len());
}

#[tokio::test]
async fn test_macos_is_stripped_then_compressed_into_tar_gz() {
    let (dir, entry, config) = setup(Platform::Macos);
    let tools = Arc::new(FakeTools::new());

    let asset = packager(tools.clone(), dir.path(), &config)
        .package(&entry)
        .await
        .unwrap();

    assert_eq!(tools.programs(), vec!["strip", "upx"]);
    assert_eq!(tools.calls.lock().unwrap()[1].args[0], "--best");

    assert_eq!(asset.name, "zr-macos.tar.gz");
    let bytes = std::fs::read(&asset.path).unwrap();
    assert_eq!(&bytes[..2], [0x1f, 0x8b]);
    let entries = list_entries(&asset.path, ArchiveFormat::TarGz).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "zr");
    assert_eq!(entries[0].size, 2048);
}

#[tokio::test]
async fn test_compressor_failure_is_packaging_error() {
    let (dir, entry, config) = setup(Platform::Linux);
    let tools = Arc::new(FakeTools::failing("upx"));

    let err = packager(tools, dir.path(), &config)
        .package(&entry)
        .await
        .unwrap_err();

    match err {
        Error::Packaging { platform, message } => {
            assert_eq!(platform, Platform::Linux);
            assert!(message.contains("NotCompressibleException"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("zr-linux.tar.gz").exists());
}

#[tokio::test]
async fn test_missing_binary_is_packaging_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::default();
    let entry = MatrixEntry::for_platform(Platform::Macos, &config);
    let tools = Arc::new(FakeTools::new());

    let err = packager(tools.clone(), dir.path(), &config)
        .package(&entry)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Packaging { platform: Platform::Macos, .. }));
    assert!(tools.programs().is_empty());
}
