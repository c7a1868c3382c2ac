use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::ChirpError;
use crate::ChirpResult;
use crate::DuplicatePolicy;
use crate::LoadOptions;
use crate::NestedOpenPolicy;
use crate::ScanOptions;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] = [
	"birdchirp.toml",
	".birdchirp.toml",
	".config/birdchirp.toml",
];

/// Template read when no source is configured.
pub const DEFAULT_SRC: &str = "src/index.html";
/// Output written when no destination is configured.
pub const DEFAULT_DEST: &str = "dist/index.html";
/// Directory documents are served from when no data root is configured.
pub const DEFAULT_DATA_ROOT: &str = "data";
/// Default limit for fetching every reference, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration loaded from a `birdchirp.toml` file.
///
/// ```toml
/// src = "src/index.html"
/// dest = "dist/index.html"
///
/// [data]
/// root = "data"
/// timeout_secs = 30
/// duplicates = "last-wins"
///
/// [scan]
/// nested_open = "warn"
/// ```
///
/// Relative paths are resolved against the directory holding the project.
#[derive(Debug, Clone, Deserialize)]
pub struct ChirpConfig {
	/// The template to read.
	#[serde(default = "default_src")]
	pub src: PathBuf,
	/// Where the rendered document is written.
	#[serde(default = "default_dest")]
	pub dest: PathBuf,
	#[serde(default)]
	pub data: DataConfig,
	#[serde(default)]
	pub scan: ScanConfig,
}

impl Default for ChirpConfig {
	fn default() -> Self {
		Self {
			src: default_src(),
			dest: default_dest(),
			data: DataConfig::default(),
			scan: ScanConfig::default(),
		}
	}
}

/// Controls how referenced documents are fetched.
#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
	/// Directory the file data source reads documents from.
	#[serde(default = "default_data_root")]
	pub root: PathBuf,
	/// Limit for fetching every reference. `0` disables the limit.
	#[serde(default = "default_timeout_secs")]
	pub timeout_secs: u64,
	/// `"last-wins"` (default) lets a later binding replace an earlier one
	/// with the same name. `"reject"` fails the run instead.
	#[serde(default)]
	pub duplicates: DuplicatePolicy,
}

impl Default for DataConfig {
	fn default() -> Self {
		Self {
			root: default_data_root(),
			timeout_secs: DEFAULT_TIMEOUT_SECS,
			duplicates: DuplicatePolicy::default(),
		}
	}
}

/// Controls how documents are scanned.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanConfig {
	/// `"warn"` (default) skips a `<:` found inside an open tag and reports a
	/// warning. `"error"` fails the run.
	#[serde(default)]
	pub nested_open: NestedOpenPolicy,
}

fn default_src() -> PathBuf {
	PathBuf::from(DEFAULT_SRC)
}

fn default_dest() -> PathBuf {
	PathBuf::from(DEFAULT_DEST)
}

fn default_data_root() -> PathBuf {
	PathBuf::from(DEFAULT_DATA_ROOT)
}

fn default_timeout_secs() -> u64 {
	DEFAULT_TIMEOUT_SECS
}

impl ChirpConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> ChirpResult<Option<ChirpConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config: ChirpConfig =
			toml::from_str(&content).map_err(|e| ChirpError::ConfigParse(e.to_string()))?;

		Ok(Some(config))
	}

	/// Like [`ChirpConfig::load`], falling back to the defaults when no
	/// config file exists.
	pub fn load_or_default(root: &Path) -> ChirpResult<ChirpConfig> {
		Ok(Self::load(root)?.unwrap_or_default())
	}

	pub fn timeout(&self) -> Option<Duration> {
		(self.data.timeout_secs > 0).then(|| Duration::from_secs(self.data.timeout_secs))
	}

	pub fn load_options(&self) -> LoadOptions {
		LoadOptions {
			timeout: self.timeout(),
			duplicates: self.data.duplicates,
		}
	}

	pub fn scan_options(&self) -> ScanOptions {
		ScanOptions {
			nested_open: self.scan.nested_open,
		}
	}
}
