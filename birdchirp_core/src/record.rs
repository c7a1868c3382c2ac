use std::collections::BTreeMap;
use std::collections::HashMap;

use derive_more::Deref;

use crate::ChirpError;
use crate::ChirpResult;
use crate::Point;

/// A structured value fetched from a data source.
///
/// Documents are mappings of field name to value. Collection paths produce a
/// list of documents. Every scalar is stored as text since that is the only
/// thing a tag can render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Text(String),
	Map(BTreeMap<String, Value>),
	List(Vec<Value>),
}

/// A record returned by [`DataSource::get`](crate::DataSource::get): a single
/// document or a collection of documents.
pub type Record = Value;

impl Value {
	/// Build a mapping from key/value pairs.
	pub fn map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
	where
		K: Into<String>,
		V: Into<Value>,
	{
		entries.into_iter().collect()
	}

	/// Human readable description of the value's shape, used in error
	/// messages.
	pub fn kind(&self) -> &'static str {
		match self {
			Self::Text(_) => "text",
			Self::Map(_) => "a document",
			Self::List(_) => "a collection",
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}

	/// Get a field of a document. Always `None` for text and collections.
	pub fn get(&self, field: &str) -> Option<&Value> {
		match self {
			Self::Map(fields) => fields.get(field),
			_ => None,
		}
	}

	/// Walk `fields` from this value and return the text found at the end.
	///
	/// `label` is the name the value is known by in the template and is used
	/// to build the dotted path reported in errors. `at` is the position of the
	/// tag being resolved.
	pub fn resolve_text(&self, label: &str, fields: &[String], at: Point) -> ChirpResult<&str> {
		let mut current = self;
		let mut path = label.to_string();

		for field in fields {
			if !matches!(current, Self::Map(_)) {
				return Err(ChirpError::TypeMismatch {
					path,
					expected: "a document",
					found: current.kind(),
					line: at.line,
					column: at.column,
				});
			}

			path.push('.');
			path.push_str(field);

			current = current.get(field).ok_or_else(|| {
				ChirpError::FieldNotFound {
					path: path.clone(),
					line: at.line,
					column: at.column,
				}
			})?;
		}

		current.as_text().ok_or_else(|| {
			ChirpError::TypeMismatch {
				path,
				expected: "text",
				found: current.kind(),
				line: at.line,
				column: at.column,
			}
		})
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<Vec<Value>> for Value {
	fn from(value: Vec<Value>) -> Self {
		Self::List(value)
	}
}

impl<K, V> FromIterator<(K, V)> for Value
where
	K: Into<String>,
	V: Into<Value>,
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self::Map(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}

/// Numbers and booleans are rendered with their JSON spelling and `null`
/// becomes empty text.
impl From<serde_json::Value> for Value {
	fn from(value: serde_json::Value) -> Self {
		match value {
			serde_json::Value::Null => Self::Text(String::new()),
			serde_json::Value::Bool(b) => Self::Text(b.to_string()),
			serde_json::Value::Number(n) => Self::Text(n.to_string()),
			serde_json::Value::String(s) => Self::Text(s),
			serde_json::Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
			serde_json::Value::Object(fields) => {
				Self::Map(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
			}
		}
	}
}

/// Every fetched record keyed by the reference name it was bound to.
///
/// Built once by the [loader](crate::load) and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref)]
pub struct DataTree(HashMap<String, Record>);

impl DataTree {
	pub fn new() -> Self {
		Self::default()
	}

	/// Look up a bound reference, failing with `ReferenceNotFound` at `at`.
	pub fn reference(&self, name: &str, at: Point) -> ChirpResult<&Record> {
		self.0.get(name).ok_or_else(|| {
			ChirpError::ReferenceNotFound {
				name: name.to_string(),
				line: at.line,
				column: at.column,
			}
		})
	}
}

impl<K> FromIterator<(K, Record)> for DataTree
where
	K: Into<String>,
{
	fn from_iter<T: IntoIterator<Item = (K, Record)>>(iter: T) -> Self {
		Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
	}
}
