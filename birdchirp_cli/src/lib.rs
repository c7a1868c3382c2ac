use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Fill the bird tags in a page with data from your document store.",
	long_about = "birdchirp reads a template, fetches every document it binds with `<: name = \
	              /path :>` tags and replaces the `<: name.field :>` and `<: for item : list: \
	              > ... </: >` tags with the fetched values.\n\nQuick start:\n  birdchirp build  \
	              Render the template into its destination\n  birdchirp check  Verify the \
	              destination is up to date\n  birdchirp refs   List the bindings and tags of the \
	              template"
)]
pub struct ChirpCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

/// Overrides for the paths in `birdchirp.toml`. Relative paths are resolved
/// against the project root.
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
	/// The template to render.
	#[arg(long)]
	pub src: Option<PathBuf>,

	/// Where the rendered document is written.
	#[arg(long)]
	pub dest: Option<PathBuf>,

	/// Directory the referenced documents are read from.
	#[arg(long)]
	pub data: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render the template and write the result to its destination.
	///
	/// Fetches every document bound in the template, then replaces each bird
	/// tag with the referenced value. Nothing is written when a reference
	/// can't be fetched or a tag can't be resolved. This is the default
	/// command.
	Build {
		#[command(flatten)]
		paths: PathArgs,

		/// Print the rendered document instead of writing it.
		#[arg(long, default_value_t = false)]
		dry_run: bool,
	},
	/// Check that the destination matches a fresh render of the template.
	///
	/// Exits with a non-zero status code when the destination is missing or
	/// out of date. Use `--diff` to see what changed.
	Check {
		#[command(flatten)]
		paths: PathArgs,

		/// Show a diff between the destination and the fresh render.
		#[arg(long, default_value_t = false)]
		diff: bool,
	},
	/// List the reference bindings and tags found in the template.
	///
	/// Nothing is fetched, so this works without access to the data.
	Refs {
		/// The template to inspect.
		#[arg(long)]
		src: Option<PathBuf>,
	},
}
