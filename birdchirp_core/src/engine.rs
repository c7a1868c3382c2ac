use tracing::debug;

use crate::ChirpError;
use crate::ChirpResult;
use crate::DataSource;
use crate::DataTree;
use crate::LoadOptions;
use crate::ScanOptions;
use crate::ScanWarning;
use crate::Segment;
use crate::Tag;
use crate::TagKind;
use crate::body::LoopBody;
use crate::load;
use crate::scan;
use crate::strip_bindings;

/// Result of substituting a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
	/// The document with every bird tag replaced.
	pub output: String,
	/// Recoverable problems found while scanning.
	pub warnings: Vec<ScanWarning>,
}

impl Substitution {
	pub fn has_warnings(&self) -> bool {
		!self.warnings.is_empty()
	}
}

/// Replace every bird tag in `document` with data from `tree`, using the
/// default scan options. Warnings are logged and dropped.
pub fn substitute(document: &str, tree: &DataTree) -> ChirpResult<String> {
	substitute_with_options(document, tree, &ScanOptions::default())
		.map(|substitution| substitution.output)
}

/// Replace every bird tag in `document` with data from `tree`.
///
/// Reference bindings are removed first. The rest of the document is scanned
/// once, left to right, and each tag is replaced by its resolved text. The
/// inserted text is never scanned again.
pub fn substitute_with_options(
	document: &str,
	tree: &DataTree,
	options: &ScanOptions,
) -> ChirpResult<Substitution> {
	let stripped = strip_bindings(document);
	let scanned = scan(&stripped, options)?;
	let mut output = String::with_capacity(stripped.len());

	for segment in &scanned.segments {
		match segment {
			Segment::Literal(text) => output.push_str(text),
			Segment::Tag(tag) => resolve_tag(tag, tree, &mut output)?,
		}
	}

	Ok(Substitution {
		output,
		warnings: scanned.warnings,
	})
}

/// Fetch every reference bound in `document` from `source`, then substitute
/// the document. Nothing is scanned until every fetch has finished.
pub async fn chirp<S: DataSource>(
	document: &str,
	source: &S,
	load_options: &LoadOptions,
	scan_options: &ScanOptions,
) -> ChirpResult<Substitution> {
	let tree = load(document, source, load_options).await?;
	substitute_with_options(document, &tree, scan_options)
}

/// Resolve a single tag and append the result to `output`.
pub fn resolve_tag(tag: &Tag, tree: &DataTree, output: &mut String) -> ChirpResult<()> {
	let at = tag.span.start;

	match &tag.kind {
		TagKind::VarRef { reference, fields } => {
			let value = tree
				.reference(reference, at)?
				.resolve_text(reference, fields, at)?;
			debug!(
				reference = reference.as_str(),
				?fields,
				line = at.line,
				"resolved variable tag"
			);
			output.push_str(value);
		}
		TagKind::ForLoop {
			loop_var,
			collection,
			body,
			body_span,
		} => {
			let record = tree.reference(collection, at)?;
			let Some(items) = record.as_list() else {
				return Err(ChirpError::NotACollection {
					name: collection.clone(),
					line: at.line,
					column: at.column,
				});
			};

			let body = LoopBody::parse(body, body_span.start)?;
			for (index, item) in items.iter().enumerate() {
				if index > 0 {
					output.push('\n');
				}
				output.push_str(&body.render(loop_var, item, tree)?);
			}
			debug!(
				collection = collection.as_str(),
				items = items.len(),
				line = at.line,
				"rendered loop"
			);
		}
	}

	Ok(())
}
