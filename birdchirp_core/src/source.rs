//! Data sources for the loader.
//!
//! [`FileSource`] serves documents from a directory tree and stands in for a
//! remote document store. [`MemorySource`] keeps documents in memory.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use futures::future::try_join_all;
use tracing::debug;

use crate::ChirpError;
use crate::ChirpResult;
use crate::DataSource;
use crate::Record;
use crate::Value;

/// File extensions [`FileSource`] reads, in lookup order.
pub const DATA_EXTENSIONS: [&str; 4] = ["json", "toml", "yaml", "yml"];

/// Normalize a document path so `/posts/hello`, `posts/hello` and
/// `posts/hello/` all name the same document.
fn normalize_path(path: &str) -> &str {
	path.trim_matches('/')
}

/// Documents held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
	documents: HashMap<String, Record>,
}

impl MemorySource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, path: &str, record: impl Into<Record>) {
		self.documents
			.insert(normalize_path(path).to_string(), record.into());
	}

	#[must_use]
	pub fn with(mut self, path: &str, record: impl Into<Record>) -> Self {
		self.insert(path, record);
		self
	}
}

impl DataSource for MemorySource {
	fn get(&self, path: &str) -> impl Future<Output = ChirpResult<Record>> + Send {
		let record = self
			.documents
			.get(normalize_path(path))
			.cloned()
			.ok_or_else(|| ChirpError::NotFound(path.to_string()));
		std::future::ready(record)
	}
}

/// Documents stored as data files under a root directory.
///
/// `get("/posts/hello")` reads the first of `posts/hello.json`,
/// `posts/hello.toml`, `posts/hello.yaml` and `posts/hello.yml` that exists.
/// A path naming a directory returns a collection of every data file inside
/// it, sorted by file name. Paths with an extension are read as is.
#[derive(Debug, Clone)]
pub struct FileSource {
	root: PathBuf,
}

impl FileSource {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Map a document path onto the file system. Paths that would leave the
	/// root are reported as missing.
	fn locate(&self, path: &str) -> ChirpResult<PathBuf> {
		let relative = Path::new(normalize_path(path));
		let escapes = relative
			.components()
			.any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

		if escapes {
			return Err(ChirpError::NotFound(path.to_string()));
		}

		Ok(self.root.join(relative))
	}

	async fn read_collection(&self, dir: &Path, path: &str) -> ChirpResult<Record> {
		let mut entries = tokio::fs::read_dir(dir)
			.await
			.map_err(|e| transport_error(dir, &e))?;
		let mut files = BTreeMap::new();

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| transport_error(dir, &e))?
		{
			let file = entry.path();
			if data_format(&file).is_none() {
				continue;
			}

			let file_type = entry
				.file_type()
				.await
				.map_err(|e| transport_error(&file, &e))?;
			if file_type.is_file() {
				files.insert(entry.file_name(), file);
			}
		}

		debug!(path, documents = files.len(), "reading collection");
		let documents = try_join_all(files.values().map(|file| read_document(file))).await?;

		Ok(Value::List(documents))
	}
}

impl DataSource for FileSource {
	async fn get(&self, path: &str) -> ChirpResult<Record> {
		let base = self.locate(path)?;

		if is_kind(&base, |metadata| metadata.is_dir()).await? {
			return self.read_collection(&base, path).await;
		}

		if data_format(&base).is_some() && is_kind(&base, |metadata| metadata.is_file()).await? {
			return read_document(&base).await;
		}

		for extension in DATA_EXTENSIONS {
			let candidate = with_added_extension(&base, extension);
			if is_kind(&candidate, |metadata| metadata.is_file()).await? {
				return read_document(&candidate).await;
			}
		}

		Err(ChirpError::NotFound(path.to_string()))
	}
}

/// Check a path's metadata. A missing path is `false` rather than an error.
async fn is_kind(path: &Path, check: impl Fn(&std::fs::Metadata) -> bool) -> ChirpResult<bool> {
	match tokio::fs::metadata(path).await {
		Ok(metadata) => Ok(check(&metadata)),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
		Err(e) => Err(transport_error(path, &e)),
	}
}

fn with_added_extension(path: &Path, extension: &str) -> PathBuf {
	let mut name = OsString::from(path.as_os_str());
	name.push(".");
	name.push(extension);
	PathBuf::from(name)
}

fn transport_error(path: &Path, error: &std::io::Error) -> ChirpError {
	ChirpError::Transport {
		path: path.display().to_string(),
		reason: error.to_string(),
	}
}

/// The lowercase extension of a supported data file.
fn data_format(path: &Path) -> Option<String> {
	let extension = path.extension()?.to_str()?.to_ascii_lowercase();
	DATA_EXTENSIONS
		.contains(&extension.as_str())
		.then_some(extension)
}

async fn read_document(file: &Path) -> ChirpResult<Record> {
	let content = tokio::fs::read_to_string(file)
		.await
		.map_err(|e| transport_error(file, &e))?;
	let format = data_format(file).unwrap_or_default();

	parse_data_file(&content, &format, &file.display().to_string())
}

/// Parse a data file's content into a [`Value`] based on its format.
pub fn parse_data_file(content: &str, format: &str, path_display: &str) -> ChirpResult<Value> {
	match format {
		"json" => {
			serde_json::from_str::<serde_json::Value>(content)
				.map(Value::from)
				.map_err(|e| {
					ChirpError::DataFile {
						path: path_display.to_string(),
						reason: e.to_string(),
					}
				})
		}
		"toml" => {
			let table: toml::Table = toml::from_str(content).map_err(|e| {
				ChirpError::DataFile {
					path: path_display.to_string(),
					reason: e.to_string(),
				}
			})?;
			Ok(toml_to_value(toml::Value::Table(table)))
		}
		"yaml" | "yml" => {
			serde_yaml_ng::from_str::<serde_json::Value>(content)
				.map(Value::from)
				.map_err(|e| {
					ChirpError::DataFile {
						path: path_display.to_string(),
						reason: e.to_string(),
					}
				})
		}
		other => Err(ChirpError::UnsupportedDataFormat(other.to_string())),
	}
}

/// Convert a `toml::Value` to a [`Value`]. Scalars keep their TOML spelling.
fn toml_to_value(value: toml::Value) -> Value {
	match value {
		toml::Value::String(s) => Value::Text(s),
		toml::Value::Integer(i) => Value::Text(i.to_string()),
		toml::Value::Float(f) => Value::Text(f.to_string()),
		toml::Value::Boolean(b) => Value::Text(b.to_string()),
		toml::Value::Datetime(dt) => Value::Text(dt.to_string()),
		toml::Value::Array(items) => Value::List(items.into_iter().map(toml_to_value).collect()),
		toml::Value::Table(table) => {
			Value::Map(
				table
					.into_iter()
					.map(|(k, v)| (k, toml_to_value(v)))
					.collect(),
			)
		}
	}
}
