use std::collections::HashMap;
use std::time::Duration;

use futures::future::try_join_all;
use serde::Deserialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::ChirpError;
use crate::ChirpResult;
use crate::DataTree;
use crate::Record;
use crate::ReferenceBinding;
use crate::find_bindings;

/// Default limit for the whole loading phase.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where referenced documents come from.
pub trait DataSource: Send + Sync {
	/// Fetch the record stored at `path`. Fails with
	/// [`ChirpError::NotFound`] when nothing is stored there and
	/// [`ChirpError::Transport`] when the store can't be reached.
	fn get(&self, path: &str) -> impl Future<Output = ChirpResult<Record>> + Send;
}

/// What to do when two bindings use the same reference name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
	/// The binding that comes last in the document wins.
	#[default]
	LastWins,
	/// Fail the load with [`ChirpError::DuplicateReference`].
	Reject,
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
	/// Limit for fetching every reference. `None` waits forever.
	pub timeout: Option<Duration>,
	pub duplicates: DuplicatePolicy,
}

impl Default for LoadOptions {
	fn default() -> Self {
		Self {
			timeout: Some(DEFAULT_FETCH_TIMEOUT),
			duplicates: DuplicatePolicy::default(),
		}
	}
}

/// Fetch every record bound in `document` and collect them into a
/// [`DataTree`].
///
/// All fetches run concurrently. The first failure, or the timeout, drops the
/// fetches still in flight and fails the whole load; a partial tree is never
/// returned.
pub async fn load<S: DataSource>(
	document: &str,
	source: &S,
	options: &LoadOptions,
) -> ChirpResult<DataTree> {
	let bindings = find_bindings(document);
	check_duplicates(&bindings, options.duplicates)?;

	let fetches = try_join_all(bindings.iter().map(|binding| fetch(source, binding)));
	let records = match options.timeout {
		Some(timeout) => {
			tokio::time::timeout(timeout, fetches).await.map_err(|_| {
				ChirpError::FetchTimeout {
					count: bindings.len(),
					timeout,
				}
			})??
		}
		None => fetches.await?,
	};

	// Records come back in binding order, so later bindings overwrite earlier
	// ones.
	let tree: DataTree = bindings
		.iter()
		.map(|binding| binding.name.clone())
		.zip(records)
		.collect();

	info!(
		bindings = bindings.len(),
		references = tree.len(),
		"loaded data tree"
	);

	Ok(tree)
}

async fn fetch<S: DataSource>(source: &S, binding: &ReferenceBinding) -> ChirpResult<Record> {
	debug!(
		name = binding.name.as_str(),
		path = binding.path.as_str(),
		"fetching reference"
	);

	source.get(&binding.path).await.map_err(|error| {
		ChirpError::DataFetch {
			name: binding.name.clone(),
			path: binding.path.clone(),
			source: Box::new(error),
		}
	})
}

fn check_duplicates(bindings: &[ReferenceBinding], policy: DuplicatePolicy) -> ChirpResult<()> {
	let mut seen: HashMap<&str, &ReferenceBinding> = HashMap::new();

	for binding in bindings {
		let Some(previous) = seen.insert(binding.name.as_str(), binding) else {
			continue;
		};

		match policy {
			DuplicatePolicy::Reject => {
				return Err(ChirpError::DuplicateReference {
					name: binding.name.clone(),
					first_line: previous.span.start.line,
					second_line: binding.span.start.line,
				});
			}
			DuplicatePolicy::LastWins => {
				warn!(
					name = binding.name.as_str(),
					line = binding.span.start.line,
					previous_line = previous.span.start.line,
					"reference is bound more than once, the last binding wins"
				);
			}
		}
	}

	Ok(())
}
