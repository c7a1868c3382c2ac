#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use birdchirp_core::AnyEmptyResult;
use insta_cmd::get_cargo_bin;

pub const BLOG_TEMPLATE: &str = "<: site = /site :>
<: posts = /posts :>
<h1><: site.name :></h1>
<ul>
<: for post : posts: ><li><: post.title :></li></: >
</ul>
";

pub const BLOG_OUTPUT: &str = "

<h1>Bird Blog</h1>
<ul>
<li>First</li>
<li>Second</li>
</ul>
";

pub fn chirp_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("birdchirp"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("BIRDCHIRP_LOG");
	cmd
}

pub fn write_file(root: &Path, relative: &str, content: &str) -> AnyEmptyResult {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(path, content)?;

	Ok(())
}

/// A project using the default layout: `src/index.html`, `data/` and
/// `dist/index.html`.
pub fn blog_project(root: &Path) -> AnyEmptyResult {
	write_file(root, "src/index.html", BLOG_TEMPLATE)?;
	write_file(root, "data/site.toml", "name = \"Bird Blog\"\n")?;
	write_file(
		root,
		"data/posts/first.json",
		r#"{"title": "First", "slug": "first"}"#,
	)?;
	write_file(root, "data/posts/second.yaml", "title: Second\nslug: second\n")?;

	Ok(())
}
