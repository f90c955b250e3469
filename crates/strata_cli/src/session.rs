//! Shared command plumbing: project discovery, configuration and the
//! cache objects every command is built from.

use std::error::Error;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_artifact::{
    ArtifactCacheClient, ArtifactEventTracker, ArtifactTransport, CancellationSignal,
    ClientSettings, DirArtifactCache, EventSink, InMemoryArtifactCache,
};
use strata_cache::{DefaultFileHashCache, DirectoryHashing};
use strata_config::{CacheMode, DirectoryMode, ProjectConfig, CONFIG_FILE_NAME};
use strata_fs::DiskFilesystem;

use crate::GlobalArgs;

/// A loaded project: its root, configuration and the directory the command
/// was invoked from.
pub struct Session {
    root: PathBuf,
    config: ProjectConfig,
    cwd: PathBuf,
}

impl Session {
    /// Locates and loads the project for the current invocation.
    pub fn open(global: &GlobalArgs) -> Result<Self, Box<dyn Error>> {
        let cwd = std::env::current_dir()?.canonicalize()?;
        let root = resolve_project_root(global, &cwd)?;
        let config = match explicit_config_file(global, &cwd) {
            Some(path) => strata_config::load_config_file(&path)?,
            None => strata_config::load_config(&root)?,
        };
        Ok(Self::new(root, config, cwd))
    }

    /// Creates a session from already-resolved parts.
    pub fn new(root: PathBuf, config: ProjectConfig, cwd: PathBuf) -> Self {
        Self { root, config, cwd }
    }

    /// The project configuration.
    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Interprets a command-line path relative to the invocation directory.
    pub fn project_path(&self, arg: &str) -> PathBuf {
        self.cwd.join(arg)
    }

    /// A fresh file hash cache over the project tree.
    pub fn file_hashes(&self, force_shallow: bool) -> io::Result<DefaultFileHashCache> {
        let fs = Arc::new(DiskFilesystem::new(&self.root)?);
        let mode = if force_shallow || self.config.hashing.directories == DirectoryMode::Shallow {
            DirectoryHashing::Shallow
        } else {
            DirectoryHashing::Recursive
        };
        Ok(DefaultFileHashCache::with_directory_hashing(fs, mode))
    }

    /// An artifact cache client for the configured backend, publishing to `sink`.
    pub fn artifact_client(&self, sink: Arc<dyn EventSink>) -> ArtifactCacheClient {
        let cache = strata_config::resolve_cache(&self.config, &self.root);
        let transport: Arc<dyn ArtifactTransport> = match cache.mode {
            CacheMode::Dir => Arc::new(DirArtifactCache::new(
                &cache.dir,
                env!("CARGO_PKG_VERSION"),
            )),
            CacheMode::Memory | CacheMode::None => Arc::new(InMemoryArtifactCache::new()),
        };
        let settings = ClientSettings {
            timeout: cache.timeout,
            compression_level: cache.compression_level,
            read_only: cache.read_only,
            enabled: cache.mode != CacheMode::None,
        };
        tracing::debug!(
            cache = transport.name(),
            enabled = settings.enabled,
            read_only = settings.read_only,
            "artifact cache configured"
        );
        let tracker = Arc::new(ArtifactEventTracker::new(sink));
        ArtifactCacheClient::new(transport, tracker, settings)
    }
}

/// Resolves the project root from `--config` or by walking up from `cwd`.
///
/// A relative `--config` is taken relative to `cwd`. When it names a file the
/// root is the file's directory, otherwise it names the root itself.
pub fn resolve_project_root(global: &GlobalArgs, cwd: &Path) -> Result<PathBuf, Box<dyn Error>> {
    if let Some(ref config_path) = global.config {
        let p = cwd.join(config_path);
        if p.is_file() {
            Ok(p.parent().map_or_else(|| cwd.to_path_buf(), Path::to_path_buf))
        } else {
            Ok(p)
        }
    } else {
        strata_config::find_project_root(cwd).ok_or_else(|| {
            format!(
                "no {CONFIG_FILE_NAME} found in {} or any parent directory",
                cwd.display()
            )
            .into()
        })
    }
}

/// The `--config` argument as a file path, if it names an existing file.
fn explicit_config_file(global: &GlobalArgs, cwd: &Path) -> Option<PathBuf> {
    let path = cwd.join(global.config.as_deref()?);
    path.is_file().then_some(path)
}

/// Runs an async command body on a single-threaded runtime.
///
/// The body receives a cancellation signal that fires on Ctrl-C.
pub fn block_on<F: Future>(body: impl FnOnce(CancellationSignal) -> F) -> io::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let cancel = CancellationSignal::new();
    let trigger = cancel.clone();
    Ok(runtime.block_on(async move {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, cancelling cache operations");
                trigger.cancel();
            }
        });
        body(cancel).await
    }))
}
