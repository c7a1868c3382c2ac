use std::ops::Range;

use logos::Logos;

/// Raw tokens for the inside of bird tags.
///
/// Used for the binding tags stripped before scanning and for the small
/// templates inside loop bodies. A `<` on its own can't start a token and comes
/// back from the lexer as an error, which the walkers treat as plain text.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
	/// `<:`
	#[token("<:")]
	TagOpen,
	/// `:>`
	#[token(":>")]
	TagClose,
	/// `=`
	#[token("=")]
	Equals,
	/// `.`
	#[token(".")]
	Dot,
	/// `:`
	#[token(":")]
	Colon,
	/// `>` that isn't part of `:>`
	#[token(">")]
	Gt,
	#[regex(r"[ \t\r\n]+")]
	Whitespace,
	/// Any run of characters that isn't whitespace or tag punctuation.
	#[regex(r"[^ \t\r\n<>:=.]+")]
	Word,
}

/// A lexed token with its byte range in the source text. `None` marks a
/// character the lexer didn't recognize.
pub(crate) type Spanned = (Option<RawToken>, Range<usize>);

pub(crate) fn lex(source: &str) -> Vec<Spanned> {
	RawToken::lexer(source)
		.spanned()
		.map(|(token, span)| (token.ok(), span))
		.collect()
}

/// Whitespace that stays on the current line.
pub(crate) fn is_inline_whitespace(source: &str, token: &Spanned) -> bool {
	matches!(token.0, Some(RawToken::Whitespace)) && !source[token.1.clone()].contains('\n')
}
