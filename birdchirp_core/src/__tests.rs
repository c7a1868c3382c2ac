use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::*;

fn text(value: &str) -> Value {
	Value::from(value)
}

fn post(title: &str) -> Value {
	Value::map([("title", title)])
}

fn blog_tree() -> DataTree {
	DataTree::from_iter([
		(
			"post",
			Value::map([
				("title", text("Hello")),
				("author", Value::map([("name", "Ann")])),
			]),
		),
		("posts", Value::List(vec![post("A"), post("B")])),
		("site", Value::map([("name", "Blog")])),
	])
}

fn var_ref(reference: &str, fields: &[&str]) -> Completed {
	Completed::Var {
		reference: reference.to_string(),
		fields: fields.iter().map(ToString::to_string).collect(),
	}
}

fn body_state(body: &str, opened: bool) -> ScanState {
	ScanState::ForReadingBody {
		var: "post".to_string(),
		collection: "posts".to_string(),
		body: body.to_string(),
		opened,
	}
}

#[rstest]
#[case::open_tag(ScanState::Out, '<', Some(':'), ScanState::TagOpen, Action::OpenTag)]
#[case::plain_text(ScanState::Out, 'a', None, ScanState::Out, Action::Emit)]
#[case::lone_angle(ScanState::Out, '<', Some('p'), ScanState::Out, Action::Emit)]
#[case::space_after_open(ScanState::TagOpen, ' ', None, ScanState::TagOpen, Action::Consume)]
#[case::first_name_char(
	ScanState::TagOpen,
	'p',
	Some('o'),
	ScanState::ReadingName { token: "p".to_string() },
	Action::Consume
)]
#[case::for_keyword(
	ScanState::ReadingName { token: "for".to_string() },
	' ',
	Some('p'),
	ScanState::ForReadingVar { var: String::new() },
	Action::Consume
)]
#[case::name_then_space(
	ScanState::ReadingName { token: "post".to_string() },
	' ',
	Some('.'),
	ScanState::ReadingName { token: "post".to_string() },
	Action::Consume
)]
#[case::reference_name(
	ScanState::ReadingName { token: "post".to_string() },
	'.',
	Some('t'),
	ScanState::ReadingField { reference: "post".to_string(), fields: vec![], segment: String::new() },
	Action::Consume
)]
#[case::nested_field(
	ScanState::ReadingField { reference: "post".to_string(), fields: vec![], segment: "author".to_string() },
	'.',
	Some('n'),
	ScanState::ReadingField { reference: "post".to_string(), fields: vec!["author".to_string()], segment: String::new() },
	Action::Consume
)]
#[case::field_path_end(
	ScanState::ReadingField { reference: "post".to_string(), fields: vec![], segment: "title".to_string() },
	':',
	Some('>'),
	ScanState::AwaitingTagClose { reference: "post".to_string(), fields: vec!["title".to_string()] },
	Action::Consume
)]
#[case::close_var(
	ScanState::AwaitingTagClose { reference: "post".to_string(), fields: vec!["title".to_string()] },
	'>',
	None,
	ScanState::Out,
	Action::Complete(var_ref("post", &["title"]))
)]
#[case::nested_open(
	ScanState::ReadingName { token: "post".to_string() },
	'<',
	Some(':'),
	ScanState::ReadingName { token: "post".to_string() },
	Action::NestedOpen
)]
#[case::loop_var_done(
	ScanState::ForReadingVar { var: "post".to_string() },
	' ',
	Some(':'),
	ScanState::ForReadingSeparator { var: "post".to_string(), separator: String::new() },
	Action::Consume
)]
#[case::separator_done(
	ScanState::ForReadingSeparator { var: "post".to_string(), separator: ":".to_string() },
	' ',
	Some('p'),
	ScanState::ForReadingRef { var: "post".to_string(), collection: String::new() },
	Action::Consume
)]
#[case::collection_done(
	ScanState::ForReadingRef { var: "post".to_string(), collection: "posts".to_string() },
	':',
	Some(' '),
	body_state("", false),
	Action::Consume
)]
#[case::header_closed(body_state("", false), '>', Some('<'), body_state("", true), Action::BeginBody)]
#[case::body_keeps_newlines(body_state("a", true), '\n', Some('b'), body_state("a\n", true), Action::Consume)]
#[case::body_keeps_tags(body_state("", true), '<', Some(':'), body_state("<", true), Action::Consume)]
#[case::body_done(
	body_state("<li></li></: ", true),
	'>',
	None,
	ScanState::Out,
	Action::Complete(Completed::Loop {
		var: "post".to_string(),
		collection: "posts".to_string(),
		body: "<li></li>".to_string(),
	})
)]
fn transitions(
	#[case] state: ScanState,
	#[case] ch: char,
	#[case] next: Option<char>,
	#[case] expected_state: ScanState,
	#[case] expected_action: Action,
) {
	let (state, action) = step(state, ch, next);
	assert_eq!(state, expected_state);
	assert_eq!(action, expected_action);
}

#[rstest]
#[case::dot_without_name(ScanState::TagOpen, '.')]
#[case::empty_tag(ScanState::TagOpen, ':')]
#[case::name_without_field(ScanState::ReadingName { token: "post".to_string() }, ':')]
#[case::empty_field(
	ScanState::ReadingField { reference: "post".to_string(), fields: vec![], segment: String::new() },
	'.'
)]
#[case::junk_before_close(
	ScanState::AwaitingTagClose { reference: "post".to_string(), fields: vec!["title".to_string()] },
	'x'
)]
#[case::empty_collection(
	ScanState::ForReadingRef { var: "post".to_string(), collection: String::new() },
	':'
)]
#[case::header_without_close(body_state("", false), 'x')]
fn invalid_transitions(#[case] state: ScanState, #[case] ch: char) {
	let (_, action) = step(state, ch, None);
	assert!(matches!(action, Action::Invalid(_)), "got {action:?}");
}

#[test]
fn scan_splits_literals_and_tags() -> ChirpResult<()> {
	let scanned = scan("a <: post.title :> b", &ScanOptions::default())?;

	assert_eq!(
		scanned.segments,
		vec![
			Segment::Literal("a "),
			Segment::Tag(Tag {
				kind: TagKind::VarRef {
					reference: "post".to_string(),
					fields: vec!["title".to_string()],
				},
				span: Span::new(Point::new(1, 3, 2), Point::new(1, 19, 18)),
			}),
			Segment::Literal(" b"),
		]
	);
	assert!(scanned.warnings.is_empty());

	Ok(())
}

#[test]
fn scan_records_loop_body_span() -> ChirpResult<()> {
	let input = "<ul>\n<: for post : posts: >\n<li><: post.title :></li>\n</: >\n</ul>";
	let scanned = scan(input, &ScanOptions::default())?;
	let tags: Vec<_> = scanned.tags().collect();
	assert_eq!(tags.len(), 1);

	let TagKind::ForLoop {
		loop_var,
		collection,
		body,
		body_span,
	} = &tags[0].kind
	else {
		panic!("expected a loop, got {:?}", tags[0].kind);
	};

	assert_eq!(loop_var, "post");
	assert_eq!(collection, "posts");
	assert_eq!(body, "\n<li><: post.title :></li>\n");
	assert_eq!(body_span.start, Point::new(2, 23, 27));
	assert_eq!(&input[body_span.range()], body.as_str());
	assert_eq!(tags[0].span.start, Point::new(2, 1, 5));
	assert_eq!(&input[tags[0].span.range()], &input[5..input.len() - 6]);

	Ok(())
}

#[test]
fn scan_reports_position_of_invalid_character() {
	let result = scan("line one\n  <: post :>", &ScanOptions::default());

	let Err(ChirpError::Parse {
		line,
		column,
		message,
	}) = result
	else {
		panic!("expected a parse error, got {result:?}");
	};
	assert_eq!((line, column), (2, 11));
	assert_eq!(message, "expected `.field` after `post`");
}

#[rstest]
#[case::unterminated_var("text <: post.title", 1, 6)]
#[case::unterminated_header("<p>\n<: for post : posts", 2, 1)]
#[case::unterminated_loop("<: for post : posts: > body", 1, 1)]
fn scan_rejects_unterminated_tags(#[case] input: &str, #[case] line: usize, #[case] column: usize) {
	let result = scan(input, &ScanOptions::default());
	let Err(ChirpError::Parse {
		line: error_line,
		column: error_column,
		..
	}) = result
	else {
		panic!("expected a parse error, got {result:?}");
	};
	assert_eq!((error_line, error_column), (line, column));
}

#[test]
fn nested_open_is_an_error_when_strict() {
	let options = ScanOptions {
		nested_open: NestedOpenPolicy::Error,
	};
	let result = scan("<: a <: b :>", &options);

	let Err(ChirpError::Parse {
		line,
		column,
		message,
	}) = result
	else {
		panic!("expected a parse error, got {result:?}");
	};
	assert_eq!((line, column), (1, 6));
	assert_eq!(message, "found `<:` inside an open tag");
}

#[test]
#[traced_test]
fn nested_open_is_skipped_with_a_warning_by_default() -> ChirpResult<()> {
	let substitution =
		substitute_with_options("<: post <: .title :>", &blog_tree(), &ScanOptions::default())?;

	assert_eq!(substitution.output, "Hello");
	assert_eq!(
		substitution.warnings,
		vec![ScanWarning {
			line: 1,
			column: 9,
			message: "found an extra `<:` inside an open tag".to_string(),
		}]
	);
	assert!(logs_contain("found an extra `<:` inside an open tag"));

	Ok(())
}

#[test]
fn nested_open_warning_keeps_the_open_tag() {
	let result = scan("<: a <: b :>", &ScanOptions::default());

	// The skipped `<:` leaves `ab` as the reference name with no field.
	let Err(ChirpError::Parse { column, message, .. }) = result else {
		panic!("expected a parse error, got {result:?}");
	};
	assert_eq!(column, 11);
	assert_eq!(message, "expected `.field` after `ab`");
}

#[rstest]
#[case::no_tags("plain text, <b>no</b> tags: here > there", "plain text, <b>no</b> tags: here > there")]
#[case::only_var("<: post.title :>", "Hello")]
#[case::inline_var("<h1><: post.title :></h1>", "<h1>Hello</h1>")]
#[case::tight_spacing("<:post.title:>", "Hello")]
#[case::loose_spacing("<:   post  .  title   :   >", "Hello")]
#[case::nested_field("by <: post.author.name :>", "by Ann")]
#[case::two_tags("<: site.name :>: <: post.title :>", "Blog: Hello")]
#[case::multiline_tag("<:\n  post.title\n:>", "Hello")]
#[case::loop_basic("<: for post : posts: ><: post.title :></: >", "A\nB")]
#[case::loop_spaced_close("<: for post : posts: ><: post.title : ></: >", "A\nB")]
#[case::loop_spaced_tag("<: for post : posts: >(<:post . title:  \n>)</: >", "(A)\n(B)")]
#[case::loop_tight_close("<: for post : posts: >[<: post.title :>]</:>", "[A]\n[B]")]
#[case::loop_any_separator("<: for post in posts: ><: post.title :></: >", "A\nB")]
#[case::loop_outer_reference(
	"<: for p : posts: ><: site.name :>/<: p.title :></: >",
	"Blog/A\nBlog/B"
)]
#[case::loop_shadows_reference("<: for post : posts: ><: post.title :></: >!", "A\nB!")]
#[case::loop_multiline(
	"<ul>\n<: for post : posts: >\n  <li><: post.title :></li>\n</: >\n</ul>",
	"<ul>\n\n  <li>A</li>\n\n\n  <li>B</li>\n\n</ul>"
)]
#[case::binding_only("<: x = /a/b :>", "")]
#[case::binding_kept_text("before <: x = /a/b :> after", "before  after")]
#[case::binding_and_var("<: post = /posts/hello :><h1><: post.title :></h1>", "<h1>Hello</h1>")]
fn substitute_documents(#[case] input: &str, #[case] expected: &str) -> ChirpResult<()> {
	let output = substitute(input, &blog_tree())?;
	assert_eq!(output, expected);

	Ok(())
}

#[test]
fn substituted_values_are_not_scanned_again() -> ChirpResult<()> {
	let tree = DataTree::from_iter([("post", Value::map([("title", "<: post.title :>")]))]);
	let output = substitute("[<: post.title :>]", &tree)?;
	assert_eq!(output, "[<: post.title :>]");

	Ok(())
}

#[test]
fn loop_renders_one_copy_per_item_in_order() -> ChirpResult<()> {
	let items: Vec<Value> = (1..=5).map(|n| post(&n.to_string())).collect();
	let tree = DataTree::from_iter([("posts", Value::List(items))]);

	let output = substitute("<: for p : posts: >#<: p.title :></: >", &tree)?;
	assert_eq!(output, "#1\n#2\n#3\n#4\n#5");

	let tree = DataTree::from_iter([("posts", Value::List(vec![]))]);
	let output = substitute("<ul><: for p : posts: ><li/></: ></ul>", &tree)?;
	assert_eq!(output, "<ul></ul>");

	Ok(())
}

#[test]
fn missing_field_is_reported() {
	let tree = DataTree::from_iter([("post", Value::Map(BTreeMap::new()))]);
	let result = substitute("<: post.title :>", &tree);

	let Err(ChirpError::FieldNotFound { path, line, column }) = result else {
		panic!("expected a missing field, got {result:?}");
	};
	assert_eq!(path, "post.title");
	assert_eq!((line, column), (1, 1));
}

#[test]
fn missing_reference_is_reported() {
	let result = substitute("\n <: page.title :>", &blog_tree());

	let Err(ChirpError::ReferenceNotFound { name, line, column }) = result else {
		panic!("expected a missing reference, got {result:?}");
	};
	assert_eq!(name, "page");
	assert_eq!((line, column), (2, 2));
}

#[rstest]
#[case::field_of_collection("<: posts.title :>", "posts", "a document", "a collection")]
#[case::document_as_text("<: post.author :>", "post.author", "text", "a document")]
#[case::field_of_text("<: post.title.size :>", "post.title", "a document", "text")]
fn type_mismatches_are_reported(
	#[case] input: &str,
	#[case] expected_path: &str,
	#[case] expected_kind: &str,
	#[case] found_kind: &str,
) {
	let result = substitute(input, &blog_tree());

	let Err(ChirpError::TypeMismatch {
		path,
		expected,
		found,
		..
	}) = result
	else {
		panic!("expected a type mismatch, got {result:?}");
	};
	assert_eq!(path, expected_path);
	assert_eq!(expected, expected_kind);
	assert_eq!(found, found_kind);
}

#[test]
fn loop_over_document_is_rejected() {
	let result = substitute("x <: for p : post: >y</: >", &blog_tree());

	let Err(ChirpError::NotACollection { name, line, column }) = result else {
		panic!("expected a collection error, got {result:?}");
	};
	assert_eq!(name, "post");
	assert_eq!((line, column), (1, 3));
}

#[test]
fn loop_body_errors_point_into_the_body() {
	let tree = DataTree::from_iter([(
		"posts",
		Value::List(vec![post("A"), Value::Map(BTreeMap::new())]),
	)]);
	let result = substitute("<: for p : posts: ><: p.title :></: >", &tree);

	let Err(ChirpError::FieldNotFound { path, line, column }) = result else {
		panic!("expected a missing field, got {result:?}");
	};
	assert_eq!(path, "p.title");
	assert_eq!((line, column), (1, 20));
}

#[rstest]
#[case::nested_loop("<: for p : posts: ><: for q : posts: >x</: ></: >", "loops can't be nested")]
#[case::body_tag_junk_before_close("<: for p : posts: ><: p.title : x></: >", "expected `>` to close the tag")]
#[case::body_tag_without_field("<: for p : posts: ><: p :></: >", "expected `.field` or `:>` in tag for `p`")]
fn loop_body_syntax_errors(#[case] input: &str, #[case] expected: &str) {
	let result = substitute(input, &blog_tree());

	let Err(ChirpError::Parse { message, .. }) = result else {
		panic!("expected a parse error, got {result:?}");
	};
	assert_eq!(message, expected);
}

#[test]
fn find_bindings_in_document_order() {
	let input = "<: post = /posts/hello :>\n<p><: post.title :></p>\n  <: posts   =   /posts :>";
	let bindings = find_bindings(input);

	assert_eq!(bindings.len(), 2);
	assert_eq!(bindings[0].name, "post");
	assert_eq!(bindings[0].path, "/posts/hello");
	assert_eq!(bindings[0].span.start, Point::new(1, 1, 0));
	assert_eq!(bindings[0].span.end, Point::new(1, 26, 25));
	assert_eq!(bindings[1].name, "posts");
	assert_eq!(bindings[1].path, "/posts");
	assert_eq!(bindings[1].span.start.line, 3);
	assert_eq!(bindings[1].span.start.column, 3);
	assert_eq!(&input[bindings[1].span.range()], "<: posts   =   /posts :>");
}

#[rstest]
#[case::dotted_path("<: cfg = /settings/site.json :>", "cfg", "/settings/site.json")]
#[case::tight("<:cfg=/settings:>", "cfg", "/settings")]
#[case::relative("<: cfg = settings/site :>", "cfg", "settings/site")]
fn binding_paths(#[case] input: &str, #[case] name: &str, #[case] path: &str) {
	let bindings = find_bindings(input);
	assert_eq!(bindings.len(), 1);
	assert_eq!(bindings[0].name, name);
	assert_eq!(bindings[0].path, path);
}

#[rstest]
#[case::variable("<: post.title :>")]
#[case::missing_path("<: post = :>")]
#[case::missing_name("<: = /posts :>")]
#[case::across_lines("<: post =\n /posts :>")]
#[case::loop_header("<: for post : posts: >x</: >")]
fn not_bindings(#[case] input: &str) {
	assert!(find_bindings(input).is_empty());
	assert_eq!(strip_bindings(input), input);
}

#[test]
fn strip_bindings_keeps_surrounding_text() {
	let input = "<html>\n<: a = /a :><: b = /b :>\n<p><: a.x :></p>\n</html>";
	assert_eq!(strip_bindings(input), "<html>\n\n<p><: a.x :></p>\n</html>");
}

#[test]
fn json_values_become_text() {
	let json = serde_json::json!({
		"title": "Hello",
		"views": 3,
		"draft": false,
		"summary": null,
		"tags": ["a", "b"],
	});

	let value = Value::from(json);
	assert_eq!(value.get("title"), Some(&text("Hello")));
	assert_eq!(value.get("views"), Some(&text("3")));
	assert_eq!(value.get("draft"), Some(&text("false")));
	assert_eq!(value.get("summary"), Some(&text("")));
	assert_eq!(
		value.get("tags").and_then(Value::as_list),
		Some([text("a"), text("b")].as_slice())
	);
}

/// A data source that fails for `/bad`, waits a minute for `/slow` and counts
/// how many fetches finished.
#[derive(Default)]
struct ScriptedSource {
	finished: Arc<AtomicUsize>,
}

impl DataSource for ScriptedSource {
	async fn get(&self, path: &str) -> ChirpResult<Record> {
		match path {
			"/bad" => Err(ChirpError::Transport {
				path: path.to_string(),
				reason: "connection reset".to_string(),
			}),
			"/slow" => {
				tokio::time::sleep(Duration::from_secs(60)).await;
				self.finished.fetch_add(1, Ordering::SeqCst);
				Ok(post("slow"))
			}
			_ => {
				self.finished.fetch_add(1, Ordering::SeqCst);
				Ok(post(path))
			}
		}
	}
}

fn memory_source() -> MemorySource {
	MemorySource::new()
		.with("/posts/hello", post("Hello"))
		.with("/posts/other", post("Other"))
		.with("/posts", Value::List(vec![post("A"), post("B")]))
}

#[tokio::test]
async fn load_fetches_every_binding() -> ChirpResult<()> {
	let document = "<: post = /posts/hello :>\n<: posts = /posts :>\n<: post.title :>";
	let tree = load(document, &memory_source(), &LoadOptions::default()).await?;

	assert_eq!(tree.len(), 2);
	assert_eq!(tree.get("post"), Some(&post("Hello")));
	assert_eq!(tree.get("posts").and_then(Value::as_list).map(<[Value]>::len), Some(2));

	Ok(())
}

#[tokio::test]
async fn load_without_bindings_is_empty() -> ChirpResult<()> {
	let tree = load("<p>nothing here</p>", &memory_source(), &LoadOptions::default()).await?;
	assert!(tree.is_empty());

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn duplicate_bindings_last_wins() -> ChirpResult<()> {
	let document = "<: post = /posts/hello :>\n<: post = /posts/other :>";
	let tree = load(document, &memory_source(), &LoadOptions::default()).await?;

	assert_eq!(tree.get("post"), Some(&post("Other")));
	assert!(logs_contain("bound more than once"));

	Ok(())
}

#[tokio::test]
#[traced_test]
async fn repeated_bindings_warn_against_the_previous_one() -> ChirpResult<()> {
	let document = "<: post = /posts/hello :>\n<: post = /posts/other :>\n<: post = /posts/hello :>";
	let tree = load(document, &memory_source(), &LoadOptions::default()).await?;

	assert_eq!(tree.get("post"), Some(&post("Hello")));
	assert!(logs_contain("line=2 previous_line=1"));
	assert!(logs_contain("line=3 previous_line=2"));

	Ok(())
}

#[tokio::test]
async fn duplicate_bindings_can_be_rejected() {
	let options = LoadOptions {
		duplicates: DuplicatePolicy::Reject,
		..LoadOptions::default()
	};
	let document = "<: post = /posts/hello :>\n\n<: post = /posts/other :>";
	let result = load(document, &memory_source(), &options).await;

	let Err(ChirpError::DuplicateReference {
		name,
		first_line,
		second_line,
	}) = result
	else {
		panic!("expected a duplicate reference, got {result:?}");
	};
	assert_eq!(name, "post");
	assert_eq!((first_line, second_line), (1, 3));
}

#[tokio::test]
async fn missing_document_fails_the_load() {
	let document = "<: post = /posts/hello :><: gone = /posts/gone :>";
	let result = load(document, &memory_source(), &LoadOptions::default()).await;

	let Err(ChirpError::DataFetch { name, path, source }) = result else {
		panic!("expected a fetch error, got {result:?}");
	};
	assert_eq!(name, "gone");
	assert_eq!(path, "/posts/gone");
	assert!(matches!(*source, ChirpError::NotFound(ref missing) if missing == "/posts/gone"));
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_cancels_the_others() {
	let source = ScriptedSource::default();
	let finished = Arc::clone(&source.finished);
	let options = LoadOptions {
		timeout: None,
		..LoadOptions::default()
	};

	let result = load("<: a = /slow :><: b = /bad :>", &source, &options).await;
	assert!(matches!(result, Err(ChirpError::DataFetch { ref name, .. }) if name == "b"));

	tokio::time::sleep(Duration::from_secs(120)).await;
	assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_time_out() {
	let source = ScriptedSource::default();
	let options = LoadOptions {
		timeout: Some(Duration::from_secs(1)),
		..LoadOptions::default()
	};

	let result = load("<: a = /slow :><: b = /fast :>", &source, &options).await;

	let Err(ChirpError::FetchTimeout { count, timeout }) = result else {
		panic!("expected a timeout, got {result:?}");
	};
	assert_eq!(count, 2);
	assert_eq!(timeout, Duration::from_secs(1));
}

#[tokio::test]
async fn chirp_loads_then_substitutes() -> ChirpResult<()> {
	let document = "<: post = /posts/hello :>\n<: posts = /posts :>\n<h1><: post.title \
	                :></h1>\n<: for p : posts: ><p><: p.title :></p></: >";
	let substitution = chirp(
		document,
		&memory_source(),
		&LoadOptions::default(),
		&ScanOptions::default(),
	)
	.await?;

	assert_eq!(substitution.output, "\n\n<h1>Hello</h1>\n<p>A</p>\n<p>B</p>");
	assert!(!substitution.has_warnings());

	Ok(())
}

fn write_file(root: &std::path::Path, relative: &str, content: &str) -> std::io::Result<()> {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)
}

#[tokio::test]
async fn file_source_reads_each_format() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "posts/hello.json", r#"{"title": "Hello", "views": 3}"#)?;
	write_file(tmp.path(), "site.toml", "name = \"Blog\"\nyear = 2018\n")?;
	write_file(tmp.path(), "authors/ann.yaml", "name: Ann\nposts: 2\n")?;

	let source = FileSource::new(tmp.path());

	let hello = source.get("/posts/hello").await?;
	assert_eq!(hello.get("title"), Some(&text("Hello")));
	assert_eq!(hello.get("views"), Some(&text("3")));

	let site = source.get("site").await?;
	assert_eq!(site.get("name"), Some(&text("Blog")));
	assert_eq!(site.get("year"), Some(&text("2018")));

	let ann = source.get("/authors/ann/").await?;
	assert_eq!(ann.get("name"), Some(&text("Ann")));

	let explicit = source.get("/posts/hello.json").await?;
	assert_eq!(explicit, hello);

	Ok(())
}

#[tokio::test]
async fn file_source_reads_directories_as_collections() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "posts/b.json", r#"{"title": "B"}"#)?;
	write_file(tmp.path(), "posts/a.yml", "title: A\n")?;
	write_file(tmp.path(), "posts/notes.txt", "not a document")?;
	write_file(tmp.path(), "posts/drafts/c.json", r#"{"title": "C"}"#)?;

	let source = FileSource::new(tmp.path());
	let posts = source.get("/posts").await?;

	assert_eq!(posts, Value::List(vec![post("A"), post("B")]));

	Ok(())
}

#[rstest]
#[case::missing("/posts/missing")]
#[case::escapes_root("/../secret")]
#[tokio::test]
async fn file_source_missing_documents(#[case] path: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "posts/hello.json", "{}")?;
	let source = FileSource::new(tmp.path().join("posts"));

	let result = source.get(path).await;
	assert!(matches!(result, Err(ChirpError::NotFound(_))), "got {result:?}");

	Ok(())
}

#[tokio::test]
async fn file_source_reports_invalid_documents() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "broken.json", "{ not json")?;
	let source = FileSource::new(tmp.path());

	let result = source.get("/broken").await;
	assert!(matches!(result, Err(ChirpError::DataFile { .. })), "got {result:?}");

	Ok(())
}

#[test]
fn unsupported_data_format() {
	let result = parse_data_file("a,b", "csv", "data.csv");
	assert!(matches!(result, Err(ChirpError::UnsupportedDataFormat(ref format)) if format == "csv"));
}

#[test]
fn config_defaults_without_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	assert!(ChirpConfig::load(tmp.path())?.is_none());

	let config = ChirpConfig::load_or_default(tmp.path())?;
	assert_eq!(config.src, std::path::PathBuf::from(DEFAULT_SRC));
	assert_eq!(config.dest, std::path::PathBuf::from(DEFAULT_DEST));
	assert_eq!(config.data.root, std::path::PathBuf::from(DEFAULT_DATA_ROOT));
	assert_eq!(config.timeout(), Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)));
	assert_eq!(config.load_options().duplicates, DuplicatePolicy::LastWins);
	assert_eq!(config.scan_options().nested_open, NestedOpenPolicy::Warn);

	Ok(())
}

#[test]
fn config_is_loaded_from_candidates() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(
		tmp.path(),
		".config/birdchirp.toml",
		"src = \"pages/home.html\"\n\n[data]\nroot = \"fixtures\"\ntimeout_secs = \
		 0\nduplicates = \"reject\"\n\n[scan]\nnested_open = \"error\"\n",
	)?;

	let config = ChirpConfig::load(tmp.path())?.ok_or("config should be found")?;
	assert_eq!(config.src, std::path::PathBuf::from("pages/home.html"));
	assert_eq!(config.dest, std::path::PathBuf::from(DEFAULT_DEST));
	assert_eq!(config.data.root, std::path::PathBuf::from("fixtures"));
	assert_eq!(config.timeout(), None);
	assert_eq!(config.load_options().duplicates, DuplicatePolicy::Reject);
	assert_eq!(config.scan_options().nested_open, NestedOpenPolicy::Error);

	Ok(())
}

#[test]
fn config_parse_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write_file(tmp.path(), "birdchirp.toml", "[scan]\nnested_open = \"sometimes\"\n")?;

	let result = ChirpConfig::load(tmp.path());
	assert!(matches!(result, Err(ChirpError::ConfigParse(_))), "got {result:?}");

	Ok(())
}
