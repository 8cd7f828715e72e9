//! Build reference construction.
//!
//! The reference is a flake URL of the form
//! `git+<link>?ref=<ref>&rev=<commit>#<attr>`, single-quoted so the shell
//! hands it to the build tool as one argument.

/// Build the shell-quoted flake reference for a revision.
pub fn build_reference(link: &str, git_ref: &str, commit: &str, output_attr: &str) -> String {
    shell_quote(&flake_url(link, git_ref, commit, output_attr))
}

/// The unquoted flake URL.
pub fn flake_url(link: &str, git_ref: &str, commit: &str, output_attr: &str) -> String {
    format!("git+{link}?ref={git_ref}&rev={commit}#{output_attr}")
}

/// Wrap `value` in single quotes, escaping embedded single quotes.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
