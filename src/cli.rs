// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `monowatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "monowatch",
    version,
    about = "Incrementally rebuild the projects of a monorepo and watch for changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Monowatch.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Monowatch.toml")]
    pub config: String,

    /// Build the dirty projects once and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Repository-relative paths that changed (e.g. from `git diff --name-only`).
    ///
    /// If omitted, every project is considered dirty and the fingerprint
    /// cache decides what actually runs.
    #[arg(long, value_name = "PATH", num_args = 1..)]
    pub changed: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MONOWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the project graph and dirty set, build nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changed_paths_and_flags_parse() {
        let args = CliArgs::try_parse_from([
            "monowatch",
            "--once",
            "--changed",
            "libs/core/src/a.rs",
            "apps/web/index.ts",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert!(args.once);
        assert!(!args.dry_run);
        assert_eq!(args.config, "Monowatch.toml");
        assert_eq!(args.changed, vec!["libs/core/src/a.rs", "apps/web/index.ts"]);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
