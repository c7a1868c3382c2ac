use crate::Point;
use crate::Span;
use crate::tokens::RawToken;
use crate::tokens::Spanned;
use crate::tokens::is_inline_whitespace;
use crate::tokens::lex;

/// A `<: name = path :>` tag. It makes the document stored at `path` available
/// to the rest of the template under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBinding {
	/// The reference name used by later tags, e.g. `post`.
	pub name: String,
	/// The document path handed to the data source, e.g. `/posts/hello`.
	pub path: String,
	/// Where the binding tag sits in the document.
	pub span: Span,
}

/// Walks the token stream looking for `TagOpen Word Equals path TagClose`
/// sequences. Whitespace between the parts may not cross a line.
struct BindingWalker<'a> {
	source: &'a str,
	tokens: Vec<Spanned>,
	cursor: usize,
	/// Position of the last binding found, advanced lazily.
	position: Point,
	bindings: Vec<ReferenceBinding>,
}

impl<'a> BindingWalker<'a> {
	fn new(source: &'a str) -> Self {
		Self {
			source,
			tokens: lex(source),
			cursor: 0,
			position: Point::start(),
			bindings: vec![],
		}
	}

	fn kind(&self, index: usize) -> Option<RawToken> {
		self.tokens.get(index).and_then(|(token, _)| *token)
	}

	fn skip_inline_whitespace(&self, mut index: usize) -> usize {
		while self
			.tokens
			.get(index)
			.is_some_and(|token| is_inline_whitespace(self.source, token))
		{
			index += 1;
		}
		index
	}

	/// Try to read a binding starting at the `TagOpen` token at `open`.
	/// Returns the binding and the index of its closing token.
	fn read_binding(&self, open: usize) -> Option<(String, String, usize)> {
		let mut index = self.skip_inline_whitespace(open + 1);

		if self.kind(index) != Some(RawToken::Word) {
			return None;
		}
		let name = &self.source[self.tokens[index].1.clone()];

		index = self.skip_inline_whitespace(index + 1);
		if self.kind(index) != Some(RawToken::Equals) {
			return None;
		}

		index = self.skip_inline_whitespace(index + 1);
		let path_start = index;
		while matches!(
			self.kind(index),
			Some(RawToken::Word | RawToken::Dot | RawToken::Colon)
		) {
			index += 1;
		}
		if index == path_start {
			return None;
		}
		let path_range = self.tokens[path_start].1.start..self.tokens[index - 1].1.end;
		let path = &self.source[path_range];

		index = self.skip_inline_whitespace(index);
		if self.kind(index) != Some(RawToken::TagClose) {
			return None;
		}

		Some((name.to_string(), path.to_string(), index))
	}

	fn process(&mut self) {
		while self.cursor < self.tokens.len() {
			if self.kind(self.cursor) != Some(RawToken::TagOpen) {
				self.cursor += 1;
				continue;
			}

			let Some((name, path, close)) = self.read_binding(self.cursor) else {
				self.cursor += 1;
				continue;
			};

			let start_offset = self.tokens[self.cursor].1.start;
			let end_offset = self.tokens[close].1.end;
			let source = self.source;
			let gap = &source[self.position.offset..start_offset];
			self.position.advance_str(gap);
			let start = self.position;
			let end = start.after(&source[start_offset..end_offset]);

			self.bindings.push(ReferenceBinding {
				name,
				path,
				span: Span::new(start, end),
			});
			self.cursor = close + 1;
		}
	}
}

/// Find every reference binding in `document`, in document order.
pub fn find_bindings(document: &str) -> Vec<ReferenceBinding> {
	let mut walker = BindingWalker::new(document);
	walker.process();
	walker.bindings
}

/// Remove every reference binding from `document`. The text around the tags
/// is kept as is.
pub fn strip_bindings(document: &str) -> String {
	let bindings = find_bindings(document);
	if bindings.is_empty() {
		return document.to_string();
	}

	let mut result = String::with_capacity(document.len());
	let mut last = 0;
	for binding in &bindings {
		result.push_str(&document[last..binding.span.start.offset]);
		last = binding.span.end.offset;
	}
	result.push_str(&document[last..]);

	result
}
