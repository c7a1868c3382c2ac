use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use birdchirp_cli::ChirpCli;
use birdchirp_cli::Commands;
use birdchirp_cli::PathArgs;
use birdchirp_core::ChirpConfig;
use birdchirp_core::ChirpError;
use birdchirp_core::FileSource;
use birdchirp_core::ScanWarning;
use birdchirp_core::Substitution;
use birdchirp_core::TagKind;
use birdchirp_core::chirp;
use birdchirp_core::find_bindings;
use birdchirp_core::scan;
use birdchirp_core::strip_bindings;
use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `BIRDCHIRP_LOG=debug`.
const LOG_ENV: &str = "BIRDCHIRP_LOG";

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = ChirpCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Build { paths, dry_run }) => run_build(&args, paths, *dry_run),
		Some(Commands::Check { paths, diff }) => run_check(&args, paths, *diff),
		Some(Commands::Refs { src }) => run_refs(&args, src.as_deref()),
		None => run_build(&args, &PathArgs::default(), false),
	};

	if let Err(e) = result {
		match e.downcast::<ChirpError>() {
			Ok(chirp_err) => {
				let report: miette::Report = (*chirp_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Log to stderr. `BIRDCHIRP_LOG` takes precedence over `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_filter = if verbose { "birdchirp_core=debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.init();
}

fn resolve_root(args: &ChirpCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// The files a run reads and writes, resolved against the project root.
struct Project {
	root: PathBuf,
	config: ChirpConfig,
	src: PathBuf,
	dest: PathBuf,
	data: PathBuf,
}

impl Project {
	fn load(args: &ChirpCli, paths: &PathArgs) -> Result<Self, Box<dyn std::error::Error>> {
		let root = resolve_root(args);
		let config = ChirpConfig::load_or_default(&root)?;
		let resolve =
			|arg: &Option<PathBuf>, configured: &Path| root.join(arg.as_deref().unwrap_or(configured));

		let src = resolve(&paths.src, &config.src);
		let dest = resolve(&paths.dest, &config.dest);
		let data = resolve(&paths.data, &config.data.root);

		Ok(Self {
			root,
			config,
			src,
			dest,
			data,
		})
	}

	fn relative(&self, path: &Path) -> String {
		make_relative(path, &self.root)
	}

	fn read_template(&self) -> Result<String, Box<dyn std::error::Error>> {
		std::fs::read_to_string(&self.src)
			.map_err(|e| format!("failed to read template {}: {e}", self.relative(&self.src)).into())
	}

	/// Fetch the template's references and substitute it.
	fn render(&self) -> Result<Substitution, Box<dyn std::error::Error>> {
		let template = self.read_template()?;
		let source = FileSource::new(&self.data);
		debug!(src = %self.src.display(), data = %self.data.display(), "rendering template");

		let rt = tokio::runtime::Runtime::new()?;
		let substitution = rt.block_on(chirp(
			&template,
			&source,
			&self.config.load_options(),
			&self.config.scan_options(),
		))?;

		print_warnings(&substitution.warnings, &self.relative(&self.src));
		Ok(substitution)
	}
}

fn run_build(
	args: &ChirpCli,
	paths: &PathArgs,
	dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let started = Instant::now();
	let project = Project::load(args, paths)?;
	let substitution = project.render()?;

	if dry_run {
		print!("{}", substitution.output);
		return Ok(());
	}

	if let Some(parent) = project.dest.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(&project.dest, &substitution.output)?;

	println!(
		"{} {} from {} in {:.2}s",
		colored!("Built", green),
		project.relative(&project.dest),
		project.relative(&project.src),
		started.elapsed().as_secs_f64()
	);

	Ok(())
}

fn run_check(
	args: &ChirpCli,
	paths: &PathArgs,
	show_diff: bool,
) -> Result<(), Box<dyn std::error::Error>> {
	let project = Project::load(args, paths)?;
	let substitution = project.render()?;
	let dest = project.relative(&project.dest);

	let Ok(current) = std::fs::read_to_string(&project.dest) else {
		eprintln!(
			"{} {dest} is missing. Run `birdchirp build` to create it.",
			colored!("Check failed:", red)
		);
		process::exit(1);
	};

	if current == substitution.output {
		println!("Check passed: {dest} is up to date.");
		return Ok(());
	}

	eprintln!(
		"{} {dest} is out of date. Run `birdchirp build` to update it.",
		colored!("Check failed:", red)
	);
	if show_diff {
		print_diff(&current, &substitution.output);
	}
	process::exit(1);
}

fn run_refs(args: &ChirpCli, src: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
	let paths = PathArgs {
		src: src.map(Path::to_path_buf),
		..PathArgs::default()
	};
	let project = Project::load(args, &paths)?;
	let template = project.read_template()?;

	let bindings = find_bindings(&template);
	let stripped = strip_bindings(&template);
	let scanned = scan(&stripped, &project.config.scan_options())?;
	let tags: Vec<_> = scanned.tags().collect();

	print_warnings(&scanned.warnings, &project.relative(&project.src));

	if bindings.is_empty() && tags.is_empty() {
		println!("No bird tags found.");
		return Ok(());
	}

	if !bindings.is_empty() {
		println!("{}", colored!("Bindings:", bold));
		for binding in &bindings {
			println!(
				"  {} = {} (line {})",
				binding.name, binding.path, binding.span.start.line
			);
		}
	}

	if !tags.is_empty() {
		if !bindings.is_empty() {
			println!();
		}
		println!("{}", colored!("Tags:", bold));
		for tag in tags {
			let line = tag.span.start.line;
			match &tag.kind {
				TagKind::VarRef { reference, fields } => {
					println!("  {reference}.{} (line {line})", fields.join("."));
				}
				TagKind::ForLoop {
					loop_var,
					collection,
					..
				} => {
					println!("  for {loop_var} in {collection} (line {line})");
				}
			}
		}
	}

	Ok(())
}

/// Print scanner warnings. They never change the exit code.
fn print_warnings(warnings: &[ScanWarning], file: &str) {
	for warning in warnings {
		eprintln!(
			"{} {file}:{}:{}: {}",
			colored!("warning:", yellow),
			warning.line,
			warning.column,
			warning.message
		);
	}
}

/// Print a unified diff between two strings, colorized.
fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
