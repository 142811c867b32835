use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

mod commands;
mod config;
mod testing;

/// Discover and run test files, exiting non-zero if any test fails.
///
/// Walks a directory for files matching a glob, runs each one in its own
/// process, and aggregates the results. Test files report cases with TAP
/// ("ok 1 - name" / "not ok 2 - name"); files that print no TAP count as a
/// single case that passes when the process exits 0.
///
/// EXAMPLES:
///     unitrun                                  Run tests/ matching *tests.*
///     unitrun test queue                       Only files whose path contains "queue"
///     unitrun test --dir spec --pattern '*_spec.rb'
///     unitrun list                             Show which files would run
///
/// ENVIRONMENT VARIABLES:
///     UNITRUN_DIR       Discovery root, relative to the project root (default: tests)
///     UNITRUN_PATTERN   File-name glob (default: *tests.*)
///     UNITRUN_TIMEOUT   Per-file timeout in seconds
///     UNITRUN_FAIL_FAST Set to '1' to stop after the first failing file
///     UNITRUN_JSON      Set to '1' for JSON output by default
///     UNITRUN_LOG       Log filter for diagnostics on stderr (default: warn)
///     NO_COLOR          Set to disable colored output
#[derive(Parser)]
#[command(name = "unitrun")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags shared by commands that perform discovery
#[derive(Args, Debug, Clone, Default)]
struct DiscoveryArgs {
    /// Directory to search for test files
    #[arg(long, short = 'd')]
    dir: Option<PathBuf>,
    /// Glob matched against file names
    #[arg(long, short = 'p')]
    pattern: Option<String>,
    /// Project config file (default: nearest unitrun.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and run test files
    ///
    /// Files run one at a time in sorted order. The command exits 0 only if
    /// every discovered test passed.
    ///
    /// EXAMPLES:
    ///     unitrun test                     Run all tests
    ///     unitrun test scheduler           Files whose path contains "scheduler"
    ///     unitrun test --timeout 30        Kill any file running over 30s
    ///     unitrun test --fail-fast         Stop after the first failing file
    ///     unitrun test --json              Output results as JSON
    #[command(visible_alias = "t")]
    Test {
        /// Only run files whose relative path contains this text
        filter: Option<String>,
        #[command(flatten)]
        discovery: DiscoveryArgs,
        /// Working directory for test processes (default: project root)
        #[arg(long)]
        top_level: Option<PathBuf>,
        /// Per-file timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Stop after the first failing file
        #[arg(long, short = 'x')]
        fail_fast: bool,
        /// Exit non-zero when no test files are found
        #[arg(long)]
        fail_if_empty: bool,
        /// Show one line per test case
        #[arg(long, short = 'v')]
        verbose: bool,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
        /// Output results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// List test files without running them
    ///
    /// EXAMPLES:
    ///     unitrun list                     Files under tests/ matching *tests.*
    ///     unitrun list --pattern '*.sh'    Shell scripts only
    ///     unitrun list --json              Output as JSON
    #[command(visible_alias = "ls")]
    List {
        /// Only list files whose relative path contains this text
        filter: Option<String>,
        #[command(flatten)]
        discovery: DiscoveryArgs,
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    ///
    /// EXAMPLES:
    ///     unitrun completions bash > ~/.bash_completions/unitrun.bash
    ///     unitrun completions zsh > ~/.zfunc/_unitrun
    ///     unitrun completions fish > ~/.config/fish/completions/unitrun.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl DiscoveryArgs {
    fn into_overrides(self) -> config::Overrides {
        config::Overrides {
            config: self.config,
            dir: self.dir,
            pattern: self.pattern,
            ..Default::default()
        }
    }
}

fn main() -> Result<()> {
    // Diagnostics go to stderr so they never mix with test output or JSON
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("UNITRUN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();

    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    let passed = match cli.command {
        None => commands::test::run(commands::test::TestArgs {
            no_color: cli_config.no_color,
            json: cli_config.default_json,
            ..Default::default()
        })?,
        Some(Commands::Test {
            filter,
            discovery,
            top_level,
            timeout,
            fail_fast,
            fail_if_empty,
            verbose,
            no_color,
            json,
        }) => {
            let overrides = config::Overrides {
                top_level,
                timeout,
                fail_fast,
                fail_if_empty,
                ..discovery.into_overrides()
            };
            commands::test::run(commands::test::TestArgs {
                filter,
                overrides,
                verbose,
                no_color: no_color || cli_config.no_color,
                json: json || cli_config.default_json,
                cwd: None,
            })?
        }
        Some(Commands::List {
            filter,
            discovery,
            json,
        }) => {
            commands::list::run(commands::list::ListArgs {
                filter,
                overrides: discovery.into_overrides(),
                json: json || cli_config.default_json,
                cwd: None,
            })?;
            true
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            true
        }
    };

    if !passed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_runs_tests() {
        let cli = Cli::parse_from(["unitrun"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_test_flags() {
        let cli = Cli::parse_from([
            "unitrun",
            "test",
            "scheduler",
            "--dir",
            "event_scheduler_tests/unit_tests",
            "--pattern",
            "*tests.py",
            "--timeout",
            "30",
            "-x",
            "-v",
        ]);
        match cli.command {
            Some(Commands::Test {
                filter,
                discovery,
                timeout,
                fail_fast,
                verbose,
                ..
            }) => {
                assert_eq!(filter.as_deref(), Some("scheduler"));
                assert_eq!(
                    discovery.dir,
                    Some(PathBuf::from("event_scheduler_tests/unit_tests"))
                );
                assert_eq!(discovery.pattern.as_deref(), Some("*tests.py"));
                assert_eq!(timeout, Some(30));
                assert!(fail_fast);
                assert!(verbose);
            }
            _ => panic!("Expected Test command"),
        }
    }

    #[test]
    fn test_timeout_must_be_number() {
        assert!(Cli::try_parse_from(["unitrun", "test", "--timeout", "soon"]).is_err());
    }

    // Command alias tests
    #[test]
    fn test_alias_t_for_test() {
        let cli = Cli::parse_from(["unitrun", "t"]);
        assert!(matches!(cli.command, Some(Commands::Test { .. })));
    }

    #[test]
    fn test_alias_ls_for_list() {
        let cli = Cli::parse_from(["unitrun", "ls", "--json"]);
        match cli.command {
            Some(Commands::List { json, .. }) => assert!(json),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_completions_bash() {
        let cli = Cli::parse_from(["unitrun", "completions", "bash"]);
        match cli.command {
            Some(Commands::Completions { shell }) => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_completions_invalid_shell() {
        assert!(Cli::try_parse_from(["unitrun", "completions", "tcsh"]).is_err());
    }

    #[test]
    fn test_discovery_args_into_overrides() {
        let overrides = DiscoveryArgs {
            dir: Some(PathBuf::from("spec")),
            pattern: Some("*_spec.rb".to_string()),
            config: None,
        }
        .into_overrides();
        assert_eq!(overrides.dir, Some(PathBuf::from("spec")));
        assert_eq!(overrides.pattern.as_deref(), Some("*_spec.rb"));
        assert!(!overrides.fail_fast);
    }
}
