use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use kwbridge_runtime::{ClassProvider, ManagedRuntime, RuntimeError, RuntimeOptions};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use walkdir::WalkDir;

use crate::config::BridgeConfig;
use crate::error::StartupError;
use crate::streams::{CaptureWarning, HostStreams, StreamBridge};
use crate::support::{ARCHIVE_EXTENSION, ARCHIVE_PREFIX, SupportLibrary};

/// Tokens every runtime starts with, ahead of configured extras.
pub const BASELINE_OPTIONS: [&str; 2] = ["-ea", "-Dfile.encoding=UTF-8"];

/// How a runtime gets started.
pub trait RuntimeLauncher: Send + Sync {
    fn launch(&self, options: RuntimeOptions) -> Result<Arc<ManagedRuntime>, RuntimeError>;
}

/// Launches the one process-wide runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

impl RuntimeLauncher for ProcessLauncher {
    fn launch(&self, options: RuntimeOptions) -> Result<Arc<ManagedRuntime>, RuntimeError> {
        kwbridge_runtime::launch(options)
    }
}

/// Builds a fresh runtime on every launch, independent of the process-wide
/// one. Counts its launches.
#[derive(Debug, Default)]
pub struct IsolatedLauncher {
    launches: AtomicUsize,
}

impl IsolatedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::Acquire)
    }
}

impl RuntimeLauncher for IsolatedLauncher {
    fn launch(&self, options: RuntimeOptions) -> Result<Arc<ManagedRuntime>, RuntimeError> {
        self.launches.fetch_add(1, Ordering::AcqRel);
        Ok(Arc::new(ManagedRuntime::new(options)?))
    }
}

/// Finds the support library relative to the install directory.
#[derive(Debug, Clone)]
pub struct SupportLocator {
    install_dir: PathBuf,
    version: String,
    dev_classes_dir: PathBuf,
}

impl SupportLocator {
    pub fn new(
        install_dir: impl Into<PathBuf>,
        version: impl Into<String>,
        dev_classes_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            install_dir: install_dir.into(),
            version: version.into(),
            dev_classes_dir: dev_classes_dir.into(),
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(
            config.support.install_dir.clone(),
            config.support.version.clone(),
            config.dev_classes_path(),
        )
    }

    /// Packaged archives for this version, or else the local classes
    /// directory if it holds compiled support classes. Empty if neither.
    pub fn resolve(&self) -> Vec<PathBuf> {
        let archives = self.packaged_archives();
        if !archives.is_empty() {
            return archives;
        }
        if self.has_dev_classes() {
            return vec![self.dev_classes_dir.clone()];
        }
        tracing::debug!(
            install_dir = %self.install_dir.display(),
            version = %self.version,
            "No support library found"
        );
        Vec::new()
    }

    fn packaged_archives(&self) -> Vec<PathBuf> {
        let lib = self.install_dir.join("lib");
        let prefix = format!("{ARCHIVE_PREFIX}{}", self.version);
        let entries = match std::fs::read_dir(&lib) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %lib.display(), error = %e, "Support archive directory unreadable");
                return Vec::new();
            }
        };

        let mut archives: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_archive(path, &prefix))
            .collect();
        archives.sort();
        archives
    }

    fn has_dev_classes(&self) -> bool {
        let package_dir = self.dev_classes_dir.join("kwbridge");
        WalkDir::new(&package_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|entry| {
                entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "class")
            })
    }
}

fn is_archive(path: &Path, prefix: &str) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(prefix) && path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
}

enum Stage {
    NotStarted,
    Running(Arc<ManagedRuntime>),
    Failed(String),
}

enum CaptureStage {
    Pending,
    Enabled,
    Failed(CaptureWarning),
}

/// Process lifecycle of the embedded runtime: started at most once, console
/// captured at most once.
///
/// Both stages are guarded by a mutex held across check and initialization,
/// so concurrent first use starts exactly one runtime. Facades normally share
/// [`RuntimeState::global`]; tests and embedders can own their own state.
pub struct RuntimeState {
    config: BridgeConfig,
    launcher: Arc<dyn RuntimeLauncher>,
    streams: HostStreams,
    support: Arc<SupportLibrary>,
    stage: Mutex<Stage>,
    capture: Mutex<CaptureStage>,
    mounted: Mutex<Vec<PathBuf>>,
}

static GLOBAL: Lazy<Arc<RuntimeState>> = Lazy::new(|| {
    Arc::new(RuntimeState::new(
        BridgeConfig::from_env(),
        Arc::new(ProcessLauncher),
    ))
});

impl RuntimeState {
    pub fn new(config: BridgeConfig, launcher: Arc<dyn RuntimeLauncher>) -> Self {
        Self {
            config,
            launcher,
            streams: HostStreams::stdio(),
            support: Arc::new(SupportLibrary::new()),
            stage: Mutex::new(Stage::NotStarted),
            capture: Mutex::new(CaptureStage::Pending),
            mounted: Mutex::new(Vec::new()),
        }
    }

    /// Forward captured console output to `streams` instead of stdio.
    pub fn with_streams(mut self, streams: HostStreams) -> Self {
        self.streams = streams;
        self
    }

    /// The process-wide state, configured from the environment.
    pub fn global() -> Arc<RuntimeState> {
        GLOBAL.clone()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Startup tokens: the baseline, then configured extras, then the
    /// whitespace-separated tokens of the extra-args variable.
    pub fn startup_tokens(&self) -> Vec<String> {
        let mut tokens: Vec<String> = BASELINE_OPTIONS.iter().map(|t| t.to_string()).collect();
        tokens.extend(self.config.runtime.extra_args.iter().cloned());
        if let Ok(extra) = std::env::var(&self.config.runtime.extra_args_var) {
            tokens.extend(extra.split_whitespace().map(str::to_string));
        }
        tokens
    }

    /// Start the runtime on first call and return it; later calls return the
    /// same runtime. A failed start is reported again, never retried.
    pub fn ensure_started(&self) -> Result<Arc<ManagedRuntime>, StartupError> {
        let runtime = {
            let mut stage = self.stage.lock();
            match &*stage {
                Stage::Running(runtime) => return Ok(runtime.clone()),
                Stage::Failed(reason) => return Err(StartupError::PreviouslyFailed(reason.clone())),
                Stage::NotStarted => {}
            }
            match self.start() {
                Ok(runtime) => {
                    *stage = Stage::Running(runtime.clone());
                    runtime
                }
                Err(e) => {
                    tracing::error!(error = %e, "Managed runtime failed to start");
                    *stage = Stage::Failed(e.to_string());
                    return Err(e);
                }
            }
        };

        // Best effort; a failure is already logged and kept.
        let _ = self.ensure_capture_enabled();
        Ok(runtime)
    }

    fn start(&self) -> Result<Arc<ManagedRuntime>, StartupError> {
        let tokens = self.startup_tokens();
        let options = RuntimeOptions::parse(&tokens)?;
        let runtime = self.launcher.launch(options)?;
        tracing::info!(options = ?tokens, "Managed runtime started");

        let locator = SupportLocator::from_config(&self.config);
        let mut mounted = self.mounted.lock();
        for path in locator.resolve() {
            let provider: Arc<dyn ClassProvider> = self.support.clone();
            if runtime.mount(path.clone(), provider) {
                tracing::info!(path = %path.display(), "Support library mounted");
                mounted.push(path);
            }
        }
        Ok(runtime)
    }

    /// The running runtime, if started.
    pub fn runtime(&self) -> Option<Arc<ManagedRuntime>> {
        match &*self.stage.lock() {
            Stage::Running(runtime) => Some(runtime.clone()),
            _ => None,
        }
    }

    pub fn is_started(&self) -> bool {
        self.runtime().is_some()
    }

    /// Support library paths put on the search path at startup.
    pub fn support_paths(&self) -> Vec<PathBuf> {
        self.mounted.lock().clone()
    }

    /// Redirect the runtime's console to the host streams, once.
    ///
    /// Failure is logged as a warning and remembered; it is never retried
    /// and never fatal. Before the runtime is started this does nothing and
    /// reports [`CaptureWarning::RuntimeNotStarted`].
    pub fn ensure_capture_enabled(&self) -> Result<(), CaptureWarning> {
        let mut capture = self.capture.lock();
        match &*capture {
            CaptureStage::Enabled => return Ok(()),
            CaptureStage::Failed(warning) => return Err(warning.clone()),
            CaptureStage::Pending => {}
        }

        let runtime = self.runtime().ok_or(CaptureWarning::RuntimeNotStarted)?;
        match StreamBridge::new(self.streams.clone()).install(&runtime) {
            Ok(()) => {
                *capture = CaptureStage::Enabled;
                Ok(())
            }
            Err(warning) => {
                tracing::warn!(%warning, "Console capture disabled");
                *capture = CaptureStage::Failed(warning.clone());
                Err(warning)
            }
        }
    }

    /// Why capture is off, if it failed.
    pub fn capture_warning(&self) -> Option<CaptureWarning> {
        match &*self.capture.lock() {
            CaptureStage::Failed(warning) => Some(warning.clone()),
            _ => None,
        }
    }

    pub fn is_capture_enabled(&self) -> bool {
        matches!(*self.capture.lock(), CaptureStage::Enabled)
    }
}
