use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum ChirpError {
	#[error(transparent)]
	#[diagnostic(code(birdchirp::io_error))]
	Io(#[from] std::io::Error),

	#[error("{message} at line {line}, column {column}")]
	#[diagnostic(
		code(birdchirp::parse),
		help("tags look like `<: post.title :>` or `<: for post : posts: >...</: >`")
	)]
	Parse {
		line: usize,
		column: usize,
		message: String,
	},

	#[error("reference `{name}` is not bound (line {line}, column {column})")]
	#[diagnostic(
		code(birdchirp::reference_not_found),
		help("bind it first with `<: {name} = /path/to/document :>`")
	)]
	ReferenceNotFound {
		name: String,
		line: usize,
		column: usize,
	},

	#[error("field `{path}` does not exist (line {line}, column {column})")]
	#[diagnostic(
		code(birdchirp::field_not_found),
		help("check the spelling of the field against the fetched document")
	)]
	FieldNotFound {
		path: String,
		line: usize,
		column: usize,
	},

	#[error("`{path}` is {found}, expected {expected} (line {line}, column {column})")]
	#[diagnostic(code(birdchirp::type_mismatch))]
	TypeMismatch {
		path: String,
		expected: &'static str,
		found: &'static str,
		line: usize,
		column: usize,
	},

	#[error("reference `{name}` is not a collection (line {line}, column {column})")]
	#[diagnostic(
		code(birdchirp::not_a_collection),
		help("`for` loops iterate over references bound to a collection path")
	)]
	NotACollection {
		name: String,
		line: usize,
		column: usize,
	},

	#[error("failed to fetch `{name}` from `{path}`")]
	#[diagnostic(code(birdchirp::data_fetch))]
	DataFetch {
		name: String,
		path: String,
		#[source]
		source: Box<ChirpError>,
	},

	#[error("no document found at `{0}`")]
	#[diagnostic(code(birdchirp::not_found))]
	NotFound(String),

	#[error("failed to read `{path}`: {reason}")]
	#[diagnostic(code(birdchirp::transport))]
	Transport { path: String, reason: String },

	#[error("fetching {count} reference(s) timed out after {timeout:?}")]
	#[diagnostic(
		code(birdchirp::fetch_timeout),
		help("raise `timeout_secs` in the `[data]` section of birdchirp.toml")
	)]
	FetchTimeout { count: usize, timeout: Duration },

	#[error("reference `{name}` is bound twice (lines {first_line} and {second_line})")]
	#[diagnostic(
		code(birdchirp::duplicate_reference),
		help("rename one of the bindings or set `duplicates = \"last-wins\"`")
	)]
	DuplicateReference {
		name: String,
		first_line: usize,
		second_line: usize,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(birdchirp::config_parse),
		help("check that birdchirp.toml is valid TOML with [data] and/or [scan] sections")
	)]
	ConfigParse(String),

	#[error("failed to load data file `{path}`: {reason}")]
	#[diagnostic(code(birdchirp::data_file))]
	DataFile { path: String, reason: String },

	#[error("unsupported data file format: `{0}`")]
	#[diagnostic(
		code(birdchirp::unsupported_format),
		help("supported formats: json, toml, yaml, yml")
	)]
	UnsupportedDataFormat(String),
}

impl ChirpError {
	pub(crate) fn parse(point: crate::Point, message: impl Into<String>) -> Self {
		Self::Parse {
			line: point.line,
			column: point.column,
			message: message.into(),
		}
	}
}

pub type ChirpResult<T> = Result<T, ChirpError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
