use crate::ChirpError;
use crate::ChirpResult;
use crate::DataTree;
use crate::FOR_KEYWORD;
use crate::Point;
use crate::Value;
use crate::tokens::RawToken;
use crate::tokens::Spanned;
use crate::tokens::lex;

/// A loop body split into literal text and field tags. Parsed once per loop
/// and rendered once per collection item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LoopBody<'a> {
	parts: Vec<BodyPart<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyPart<'a> {
	Text(&'a str),
	Field {
		reference: &'a str,
		fields: Vec<String>,
		at: Point,
	},
}

/// Walks the token stream of a loop body, building `BodyPart`s.
struct BodyWalker<'a> {
	source: &'a str,
	tokens: Vec<Spanned>,
	cursor: usize,
	/// Position of the token under the cursor.
	position: Point,
	/// Start of the literal text not yet pushed.
	text_start: usize,
	parts: Vec<BodyPart<'a>>,
}

impl<'a> BodyWalker<'a> {
	fn new(source: &'a str, start: Point) -> Self {
		Self {
			source,
			tokens: lex(source),
			cursor: 0,
			position: start,
			text_start: 0,
			parts: vec![],
		}
	}

	fn kind(&self) -> Option<RawToken> {
		self.tokens.get(self.cursor).and_then(|(token, _)| *token)
	}

	fn current_slice(&self) -> &'a str {
		let (_, span) = &self.tokens[self.cursor];
		&self.source[span.clone()]
	}

	fn advance_cursor(&mut self) {
		let slice = self.current_slice();
		self.position.advance_str(slice);
		self.cursor += 1;
	}

	fn skip_whitespace(&mut self) {
		while self.kind() == Some(RawToken::Whitespace) {
			self.advance_cursor();
		}
	}

	/// Read a `Word` token or fail with `message` at the current position.
	fn expect_word(&mut self, message: &str) -> ChirpResult<&'a str> {
		if self.kind() != Some(RawToken::Word) {
			return Err(ChirpError::parse(self.position, message));
		}

		let word = self.current_slice();
		self.advance_cursor();
		Ok(word)
	}

	/// Read a field tag. The cursor sits on its `<:`.
	fn read_tag(&mut self) -> ChirpResult<BodyPart<'a>> {
		let at = self.position;
		self.advance_cursor();
		self.skip_whitespace();

		let reference = self.expect_word("expected a reference name in loop body tag")?;
		if reference == FOR_KEYWORD && self.kind() == Some(RawToken::Whitespace) {
			return Err(ChirpError::parse(at, "loops can't be nested"));
		}

		let mut fields = vec![];
		loop {
			self.skip_whitespace();
			match self.kind() {
				Some(RawToken::Dot) => {
					self.advance_cursor();
					self.skip_whitespace();
					let field = self.expect_word("expected a field name after `.`")?;
					fields.push(field.to_string());
				}
				Some(RawToken::TagClose) if !fields.is_empty() => {
					self.advance_cursor();
					break;
				}
				Some(RawToken::Colon) if !fields.is_empty() => {
					self.advance_cursor();
					self.skip_whitespace();
					if self.kind() != Some(RawToken::Gt) {
						return Err(ChirpError::parse(
							self.position,
							"expected `>` to close the tag",
						));
					}
					self.advance_cursor();
					break;
				}
				_ => {
					return Err(ChirpError::parse(
						self.position,
						format!("expected `.field` or `:>` in tag for `{reference}`"),
					));
				}
			}
		}

		Ok(BodyPart::Field {
			reference,
			fields,
			at,
		})
	}

	fn push_text(&mut self, end: usize) {
		if self.text_start < end {
			self.parts
				.push(BodyPart::Text(&self.source[self.text_start..end]));
		}
	}

	fn process(&mut self) -> ChirpResult<()> {
		while self.cursor < self.tokens.len() {
			if self.kind() != Some(RawToken::TagOpen) {
				self.advance_cursor();
				continue;
			}

			let tag_start = self.tokens[self.cursor].1.start;
			self.push_text(tag_start);
			let part = self.read_tag()?;
			self.parts.push(part);
			self.text_start = self
				.tokens
				.get(self.cursor)
				.map_or(self.source.len(), |(_, span)| span.start);
		}

		self.push_text(self.source.len());
		Ok(())
	}
}

impl<'a> LoopBody<'a> {
	/// Parse the body of a loop. `start` is the position of the body's first
	/// character in the scanned document.
	pub(crate) fn parse(body: &'a str, start: Point) -> ChirpResult<Self> {
		let mut walker = BodyWalker::new(body, start);
		walker.process()?;

		Ok(Self {
			parts: walker.parts,
		})
	}

	/// Render the body for one collection item. Tags naming `loop_var` read
	/// from `item`; other tags read from the data tree.
	pub(crate) fn render(&self, loop_var: &str, item: &Value, tree: &DataTree) -> ChirpResult<String> {
		let mut output = String::new();

		for part in &self.parts {
			match part {
				BodyPart::Text(text) => output.push_str(text),
				BodyPart::Field {
					reference,
					fields,
					at,
				} => {
					let root = if *reference == loop_var {
						item
					} else {
						tree.reference(reference, *at)?
					};
					output.push_str(root.resolve_text(reference, fields, *at)?);
				}
			}
		}

		Ok(output)
	}
}
