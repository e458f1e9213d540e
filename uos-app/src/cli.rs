//! CLI argument definitions for uos-app.
//!
//! The command line is just a list of step names. Help and version flags are
//! disabled so that every token, hyphenated or not, lands in `steps`.
//! Tokens are kept as `OsString` so that arguments which aren't valid UTF-8
//! reach the dispatcher too; unknown names are skipped there.

use clap::Parser;
use std::ffi::OsString;

#[derive(Debug, Parser)]
#[command(name = "uos-app")]
#[command(about = "Build, pack and export a u-OS application")]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// Steps to run, in order: build, pack, export
    #[arg(
        value_name = "STEP",
        value_parser = clap::value_parser!(OsString),
        num_args = 0..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub steps: Vec<OsString>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_steps() {
        let cli = Cli::try_parse_from(["uos-app"]).unwrap();
        assert!(cli.steps.is_empty());
    }

    #[test]
    fn test_steps_keep_order() {
        let cli = Cli::try_parse_from(["uos-app", "export", "build", "pack"]).unwrap();
        assert_eq!(cli.steps, ["export", "build", "pack"]);
    }

    #[test]
    fn test_flag_like_tokens_are_steps() {
        let cli = Cli::try_parse_from(["uos-app", "--help", "build", "-V"]).unwrap();
        assert_eq!(cli.steps, ["--help", "build", "-V"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_token_is_kept() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"bu\xffild".to_vec());
        let cli = Cli::try_parse_from([OsString::from("uos-app"), raw.clone()]).unwrap();
        assert_eq!(cli.steps, vec![raw]);
    }
}
