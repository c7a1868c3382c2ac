use std::ops::Range;

/// A location in a document. `line` and `column` are 1-indexed, `offset` is
/// the byte offset from the start of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
	pub line: usize,
	pub column: usize,
	pub offset: usize,
}

impl Default for Point {
	fn default() -> Self {
		Self::start()
	}
}

impl Point {
	pub const fn new(line: usize, column: usize, offset: usize) -> Self {
		Self {
			line,
			column,
			offset,
		}
	}

	/// The point before the first character of a document.
	pub const fn start() -> Self {
		Self::new(1, 1, 0)
	}

	/// Move past a single character.
	pub fn advance(&mut self, ch: char) {
		self.offset += ch.len_utf8();
		if ch == '\n' {
			self.line += 1;
			self.column = 1;
		} else {
			self.column += 1;
		}
	}

	pub fn advance_str(&mut self, text: &str) {
		for ch in text.chars() {
			self.advance(ch);
		}
	}

	/// Returns the point reached after moving past `text`.
	#[must_use]
	pub fn after(mut self, text: &str) -> Self {
		self.advance_str(text);
		self
	}
}

/// The source span `[start, end)` of a tag together with the position of its
/// opening `<:`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
	pub start: Point,
	pub end: Point,
}

impl Span {
	pub const fn new(start: Point, end: Point) -> Self {
		Self { start, end }
	}

	/// The byte range covered by the span.
	pub fn range(&self) -> Range<usize> {
		self.start.offset..self.end.offset
	}
}
