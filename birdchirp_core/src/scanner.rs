//! The bird tag scanner.
//!
//! A document is read one character at a time by a finite-state machine. The
//! transition function [`step`] is pure: it takes the current [`ScanState`],
//! the character and a single character of lookahead, and returns the next
//! state with an [`Action`] for the driver. The driver ([`scan`]) keeps the
//! cursor and position bookkeeping and splits the document into literal text
//! and [`Tag`]s. Resolution happens later, so resolved output is never
//! scanned again.

use serde::Deserialize;
use tracing::warn;

use crate::ChirpError;
use crate::ChirpResult;
use crate::Point;
use crate::Span;

/// The keyword that turns a tag into an iteration block.
pub const FOR_KEYWORD: &str = "for";

/// The marker that ends a loop body. Whitespace may sit between it and the
/// final `>`.
pub const LOOP_CLOSE: &str = "</:";

/// A tag recognized by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
	pub kind: TagKind,
	/// From the opening `<` to just past the closing `>`.
	pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKind {
	/// `<: reference.field :>`
	VarRef {
		reference: String,
		fields: Vec<String>,
	},
	/// `<: for loop_var : collection: > body </: >`
	ForLoop {
		loop_var: String,
		collection: String,
		/// The body text without the closing `</:`.
		body: String,
		body_span: Span,
	},
}

/// The mode of the scanner together with whatever it has accumulated for the
/// tag being read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanState {
	/// Outside of any tag.
	#[default]
	Out,
	/// Just read `<:`.
	TagOpen,
	/// Reading the first word of the tag: a reference name or `for`.
	ReadingName { token: String },
	/// Reading the dotted field path after a reference name.
	ReadingField {
		reference: String,
		fields: Vec<String>,
		segment: String,
	},
	/// The field path ended with `:`, waiting for `>`.
	AwaitingTagClose {
		reference: String,
		fields: Vec<String>,
	},
	ForReadingVar { var: String },
	/// Reading the word between the loop variable and the collection. It
	/// carries no meaning (`:` by convention).
	ForReadingSeparator { var: String, separator: String },
	ForReadingRef { var: String, collection: String },
	/// `opened` is false until the `>` that ends the loop header is read.
	/// Newlines are kept in the body.
	ForReadingBody {
		var: String,
		collection: String,
		body: String,
		opened: bool,
	},
}

impl ScanState {
	/// Whether a tag header is being read, where `<:` can't appear.
	fn in_header(&self) -> bool {
		match self {
			Self::Out => false,
			Self::ForReadingBody { opened, .. } => !opened,
			_ => true,
		}
	}
}

/// A tag completed by the last character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completed {
	Var {
		reference: String,
		fields: Vec<String>,
	},
	Loop {
		var: String,
		collection: String,
		body: String,
	},
}

/// What the driver should do with the character just read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
	/// Plain text, copy it to the output.
	Emit,
	/// Part of the open tag.
	Consume,
	/// `<:` starts a tag. The `:` is consumed too.
	OpenTag,
	/// `<:` inside a tag header. Both characters are skipped.
	NestedOpen,
	/// The loop header is closed; the body starts after this character.
	BeginBody,
	Complete(Completed),
	/// The character can't appear here.
	Invalid(String),
}

/// The scanner's transition function.
pub fn step(state: ScanState, ch: char, next: Option<char>) -> (ScanState, Action) {
	let opens_tag = ch == '<' && next == Some(':');

	if opens_tag && state.in_header() {
		return (state, Action::NestedOpen);
	}

	match state {
		ScanState::Out => {
			if opens_tag {
				(ScanState::TagOpen, Action::OpenTag)
			} else {
				(ScanState::Out, Action::Emit)
			}
		}
		ScanState::TagOpen => {
			match ch {
				c if c.is_whitespace() => (ScanState::TagOpen, Action::Consume),
				'.' => invalid("expected a reference name before `.`"),
				':' => invalid("empty tag"),
				c => {
					(
						ScanState::ReadingName {
							token: c.to_string(),
						},
						Action::Consume,
					)
				}
			}
		}
		ScanState::ReadingName { mut token } => {
			match ch {
				c if c.is_whitespace() && token == FOR_KEYWORD => {
					(ScanState::ForReadingVar { var: String::new() }, Action::Consume)
				}
				c if c.is_whitespace() => (ScanState::ReadingName { token }, Action::Consume),
				'.' => {
					(
						ScanState::ReadingField {
							reference: token,
							fields: vec![],
							segment: String::new(),
						},
						Action::Consume,
					)
				}
				':' => invalid(format!("expected `.field` after `{token}`")),
				c => {
					token.push(c);
					(ScanState::ReadingName { token }, Action::Consume)
				}
			}
		}
		ScanState::ReadingField {
			reference,
			mut fields,
			mut segment,
		} => {
			match ch {
				c if c.is_whitespace() => {
					(
						ScanState::ReadingField {
							reference,
							fields,
							segment,
						},
						Action::Consume,
					)
				}
				'.' | ':' if segment.is_empty() => {
					invalid(format!("expected a field name after `{reference}.`"))
				}
				'.' => {
					fields.push(segment);
					(
						ScanState::ReadingField {
							reference,
							fields,
							segment: String::new(),
						},
						Action::Consume,
					)
				}
				':' => {
					fields.push(segment);
					(
						ScanState::AwaitingTagClose { reference, fields },
						Action::Consume,
					)
				}
				c => {
					segment.push(c);
					(
						ScanState::ReadingField {
							reference,
							fields,
							segment,
						},
						Action::Consume,
					)
				}
			}
		}
		ScanState::AwaitingTagClose { reference, fields } => {
			match ch {
				'>' => {
					(
						ScanState::Out,
						Action::Complete(Completed::Var { reference, fields }),
					)
				}
				c if c.is_whitespace() => {
					(
						ScanState::AwaitingTagClose { reference, fields },
						Action::Consume,
					)
				}
				_ => invalid("expected `>` to close the tag"),
			}
		}
		ScanState::ForReadingVar { mut var } => {
			match ch {
				c if c.is_whitespace() && var.is_empty() => {
					(ScanState::ForReadingVar { var }, Action::Consume)
				}
				c if c.is_whitespace() => {
					(
						ScanState::ForReadingSeparator {
							var,
							separator: String::new(),
						},
						Action::Consume,
					)
				}
				':' | '.' => invalid("expected a loop variable name after `for`"),
				c => {
					var.push(c);
					(ScanState::ForReadingVar { var }, Action::Consume)
				}
			}
		}
		ScanState::ForReadingSeparator { var, mut separator } => {
			match ch {
				c if c.is_whitespace() && separator.is_empty() => {
					(ScanState::ForReadingSeparator { var, separator }, Action::Consume)
				}
				c if c.is_whitespace() => {
					(
						ScanState::ForReadingRef {
							var,
							collection: String::new(),
						},
						Action::Consume,
					)
				}
				c => {
					separator.push(c);
					(ScanState::ForReadingSeparator { var, separator }, Action::Consume)
				}
			}
		}
		ScanState::ForReadingRef {
			var,
			mut collection,
		} => {
			match ch {
				c if c.is_whitespace() => {
					(ScanState::ForReadingRef { var, collection }, Action::Consume)
				}
				':' if collection.is_empty() => {
					invalid(format!("expected a collection to loop over with `{var}`"))
				}
				':' => {
					(
						ScanState::ForReadingBody {
							var,
							collection,
							body: String::new(),
							opened: false,
						},
						Action::Consume,
					)
				}
				c => {
					collection.push(c);
					(ScanState::ForReadingRef { var, collection }, Action::Consume)
				}
			}
		}
		ScanState::ForReadingBody {
			var,
			collection,
			body,
			opened: false,
		} => {
			match ch {
				'>' => {
					(
						ScanState::ForReadingBody {
							var,
							collection,
							body,
							opened: true,
						},
						Action::BeginBody,
					)
				}
				c if c.is_whitespace() => {
					(
						ScanState::ForReadingBody {
							var,
							collection,
							body,
							opened: false,
						},
						Action::Consume,
					)
				}
				_ => invalid(format!("expected `>` after `{collection}:`")),
			}
		}
		ScanState::ForReadingBody {
			var,
			collection,
			mut body,
			opened: true,
		} => {
			if ch == '>' && body.trim_end().ends_with(LOOP_CLOSE) {
				let content_len = body.trim_end().len() - LOOP_CLOSE.len();
				body.truncate(content_len);
				return (
					ScanState::Out,
					Action::Complete(Completed::Loop {
						var,
						collection,
						body,
					}),
				);
			}

			body.push(ch);
			(
				ScanState::ForReadingBody {
					var,
					collection,
					body,
					opened: true,
				},
				Action::Consume,
			)
		}
	}
}

fn invalid(message: impl Into<String>) -> (ScanState, Action) {
	(ScanState::Out, Action::Invalid(message.into()))
}

/// What to do with a `<:` found while a tag header is still open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NestedOpenPolicy {
	/// Record a warning, skip the `<:` and keep reading the open tag.
	#[default]
	Warn,
	/// Fail with a parse error at the second `<:`.
	Error,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanOptions {
	pub nested_open: NestedOpenPolicy,
}

/// A recoverable problem found while scanning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanWarning {
	pub line: usize,
	pub column: usize,
	pub message: String,
}

/// A piece of a scanned document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
	Literal(&'a str),
	Tag(Tag),
}

/// A scanned document, in document order.
#[derive(Debug, Default)]
pub struct Scan<'a> {
	pub segments: Vec<Segment<'a>>,
	pub warnings: Vec<ScanWarning>,
}

impl Scan<'_> {
	pub fn tags(&self) -> impl Iterator<Item = &Tag> {
		self.segments.iter().filter_map(|segment| {
			match segment {
				Segment::Tag(tag) => Some(tag),
				Segment::Literal(_) => None,
			}
		})
	}
}

/// Split `document` into literal text and tags. Reference bindings are not
/// recognized here and must be stripped first.
pub fn scan<'a>(document: &'a str, options: &ScanOptions) -> ChirpResult<Scan<'a>> {
	let mut result = Scan::default();
	let mut chars = document.char_indices().peekable();
	let mut state = ScanState::Out;
	let mut point = Point::start();
	let mut literal_start = 0;
	let mut tag_start = point;
	let mut body_start = point;

	while let Some((offset, ch)) = chars.next() {
		let next = chars.peek().map(|&(_, c)| c);
		let at = point;
		point.advance(ch);

		let (next_state, action) = step(state, ch, next);
		state = next_state;

		match action {
			Action::Emit | Action::Consume => {}
			Action::OpenTag => {
				if literal_start < offset {
					result
						.segments
						.push(Segment::Literal(&document[literal_start..offset]));
				}
				tag_start = at;
				skip_colon(&mut chars, &mut point);
			}
			Action::NestedOpen => {
				if options.nested_open == NestedOpenPolicy::Error {
					return Err(ChirpError::parse(at, "found `<:` inside an open tag"));
				}

				warn!(
					line = at.line,
					column = at.column,
					"found an extra `<:` inside an open tag, skipping it"
				);
				result.warnings.push(ScanWarning {
					line: at.line,
					column: at.column,
					message: "found an extra `<:` inside an open tag".to_string(),
				});
				skip_colon(&mut chars, &mut point);
			}
			Action::BeginBody => body_start = point,
			Action::Complete(completed) => {
				let kind = match completed {
					Completed::Var { reference, fields } => TagKind::VarRef { reference, fields },
					Completed::Loop {
						var,
						collection,
						body,
					} => {
						let body_span = Span::new(body_start, body_start.after(&body));
						TagKind::ForLoop {
							loop_var: var,
							collection,
							body,
							body_span,
						}
					}
				};

				result.segments.push(Segment::Tag(Tag {
					kind,
					span: Span::new(tag_start, point),
				}));
				literal_start = point.offset;
			}
			Action::Invalid(message) => return Err(ChirpError::parse(at, message)),
		}
	}

	match state {
		ScanState::Out => {}
		ScanState::ForReadingBody { opened: true, .. } => {
			return Err(ChirpError::parse(
				tag_start,
				format!("loop is missing its closing `{LOOP_CLOSE} >`"),
			));
		}
		_ => return Err(ChirpError::parse(tag_start, "unterminated tag")),
	}

	if literal_start < document.len() {
		result
			.segments
			.push(Segment::Literal(&document[literal_start..]));
	}

	Ok(result)
}

/// Move past the `:` of a `<:` whose `<` was just read.
fn skip_colon(chars: &mut impl Iterator<Item = (usize, char)>, point: &mut Point) {
	if let Some((_, colon)) = chars.next() {
		point.advance(colon);
	}
}
