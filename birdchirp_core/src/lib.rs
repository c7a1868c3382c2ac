//! `birdchirp_core` is the engine behind the `birdchirp` template tool. It
//! finds the bird tags in a document, fetches the documents they reference
//! from a data source and writes the referenced values back into the
//! document.
//!
//! ## Tags
//!
//! ```text
//! <: post = /posts/hello :>            bind the document at /posts/hello to `post`
//! <: post.title :>                     replaced with the `title` field of `post`
//! <: for item : posts: >               repeat the body once per document in `posts`,
//!   <li><: item.title :></li>          joined with newlines
//! </: >
//! ```
//!
//! ## Processing Pipeline
//!
//! ```text
//! Template
//!   → Binding finder (collects `<: name = path :>` tags)
//!   → Loader (fetches every binding concurrently into a DataTree)
//!   → Scanner (state machine splitting the document into text and tags)
//!   → Engine (resolves each tag against the DataTree, renders loop bodies)
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `birdchirp.toml`.
//! - [`scanner`]: The tag scanner and its transition function.
//! - [`source`]: File and in-memory data sources.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use birdchirp_core::FileSource;
//! use birdchirp_core::LoadOptions;
//! use birdchirp_core::load;
//! use birdchirp_core::substitute;
//!
//! # async fn run() -> birdchirp_core::ChirpResult<()> {
//! let template = std::fs::read_to_string("src/index.html")?;
//! let source = FileSource::new("data");
//! let tree = load(&template, &source, &LoadOptions::default()).await?;
//! let html = substitute(&template, &tree)?;
//! std::fs::write("dist/index.html", html)?;
//! # Ok(())
//! # }
//! ```

pub use binding::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use loader::*;
pub use position::*;
pub use record::*;
pub use scanner::*;
pub use source::*;

mod binding;
mod body;
pub mod config;
mod engine;
#[allow(unused_assignments)]
mod error;
mod loader;
mod position;
mod record;
pub mod scanner;
pub mod source;
pub(crate) mod tokens;

#[cfg(test)]
mod __tests;
