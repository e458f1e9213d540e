//! Output helpers for consistent CLI output.
//!
//! Log lines go through `tracing`; these helpers cover the few messages
//! meant for a human watching the build, in the same cargo-like style:
//!
//! ```rust,ignore
//! use uos_app::output::Output;
//!
//! Output::running("docker buildx build ...");
//! Output::success("Successful");
//! ```

use owo_colors::OwoColorize;

/// Standard output helper for consistent CLI formatting.
pub struct Output;

impl Output {
    /// Print a success message with a green checkmark.
    ///
    /// Example: `✓ Successful`
    pub fn success(msg: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// Print the running command (for transparency).
    ///
    /// Example: `Running: docker run --rm ...`
    pub fn running(cmd: impl AsRef<str>) {
        println!("{} {}", "Running:".dimmed(), cmd.as_ref().dimmed());
    }

    /// Quote a program and its arguments the way a shell would need them.
    pub fn command_line(program: &str, args: &[&str]) -> String {
        let words = std::iter::once(program).chain(args.iter().copied());
        shlex::try_join(words).unwrap_or_else(|_| {
            // Only fails on NUL bytes, which can't reach a real exec anyway.
            std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}
