use crate::core::{config_loader::ConfigOverrides, resolver::InputSource};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

pub mod handlers;

/// fanrun: run a command template over every combination of its inputs, in parallel.
///
/// Each `-a` list (and each `-f` file) becomes one input list; the command is
/// run once per combination, taking one value from every list. Lines piped on
/// stdin form the first list when no `-a`/`-f` is given; otherwise each stdin
/// line is run on its own before the combinations.
///
/// In the template, `{}` takes the next value and `{N}` the N-th one; values
/// not used by a placeholder are appended as extra arguments.
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
#[command(
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
pub struct Cli {
    /// The command template, e.g. "gzip -k {}". May be empty.
    pub command: Option<String>,

    /// A list of arguments; ranges like {1..10} and globs like *.log are expanded.
    #[arg(short = 'a', long = "arguments", value_name = "LIST")]
    pub arguments: Vec<String>,

    /// A file whose non-blank lines form one list of arguments.
    #[arg(short = 'f', long = "arg-file", value_name = "PATH")]
    pub arg_files: Vec<PathBuf>,

    /// Number of parallel slots (0 = number of CPUs).
    #[arg(short = 's', long)]
    pub slots: Option<usize>,

    /// Show the commands that would run, but don't run them.
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Shuffle every list once before running.
    #[arg(short = 'S', long)]
    pub shuffle: bool,

    /// Start commands strictly in their incoming order.
    #[arg(short = 'o', long)]
    pub ordered: bool,

    /// Print output in incoming order, regardless of completion order.
    #[arg(short = 'k', long)]
    pub keep_order: bool,

    /// Split commands into words and run them without a shell.
    #[arg(long)]
    pub no_shell: bool,
}

/// A parsed command line plus its input sources in command-line order.
#[derive(Debug)]
pub struct ParsedCommandLine {
    pub cli: Cli,
    pub sources: Vec<InputSource>,
}

impl Cli {
    /// Parses the process arguments, exiting with clap's usage error on failure.
    pub fn parse_with_sources() -> ParsedCommandLine {
        let matches = Self::command().get_matches();
        match Self::from_arg_matches(&matches) {
            Ok(cli) => ParsedCommandLine {
                sources: input_sources(&matches),
                cli,
            },
            Err(e) => e.exit(),
        }
    }

    /// Same as [`Self::parse_with_sources`] but from an explicit argument list.
    pub fn try_parse_with_sources<I, T>(args: I) -> Result<ParsedCommandLine, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let cli = Self::from_arg_matches(&matches)?;
        Ok(ParsedCommandLine {
            sources: input_sources(&matches),
            cli,
        })
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            slots: self.slots,
            dry_run: self.dry_run,
            ordered: self.ordered,
            keep_order: self.keep_order,
            shuffle: self.shuffle,
            no_shell: self.no_shell,
        }
    }
}

/// Collects `-a` and `-f` values, interleaved the way the user wrote them.
fn input_sources(matches: &ArgMatches) -> Vec<InputSource> {
    let mut indexed: Vec<(usize, InputSource)> = Vec::new();

    if let (Some(values), Some(indices)) = (
        matches.get_many::<String>("arguments"),
        matches.indices_of("arguments"),
    ) {
        indexed.extend(
            indices.zip(values.map(|v| InputSource::Arguments(v.clone()))),
        );
    }
    if let (Some(values), Some(indices)) = (
        matches.get_many::<PathBuf>("arg_files"),
        matches.indices_of("arg_files"),
    ) {
        indexed.extend(indices.zip(values.map(|p| InputSource::File(p.clone()))));
    }

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, source)| source).collect()
}
