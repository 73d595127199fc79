//! Command-line interface definitions for newsfetch.
//!
//! Flags override the engine configuration file; the proxy can also come
//! from the environment.

use clap::Parser;
use std::path::PathBuf;

/// Fetch news from every configured source, remembering which extraction
/// strategy works for each one.
///
/// # Examples
///
/// ```sh
/// # Full run with defaults
/// newsfetch -s config/sources.yaml
///
/// # Try a single source without translation
/// newsfetch -s config/sources.yaml --source sina_finance --no-translate
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Source catalogue (YAML)
    #[arg(short, long)]
    pub sources: PathBuf,

    /// Optional engine configuration (YAML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the run snapshot is written to
    #[arg(short, long, default_value = "data")]
    pub output_dir: String,

    /// Articles per source
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Strategy memory file
    #[arg(long)]
    pub memory: Option<PathBuf>,

    /// Outbound proxy for every request
    #[arg(long, env = "NEWSFETCH_PROXY")]
    pub proxy: Option<String>,

    /// Keep foreign-language articles untranslated
    #[arg(long)]
    pub no_translate: bool,

    /// Fetch only this source and print its first article
    #[arg(long = "source", value_name = "ID")]
    pub source_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "newsfetch",
            "--sources",
            "config/sources.yaml",
            "--output-dir",
            "./out",
            "--limit",
            "3",
            "--no-translate",
        ]);

        assert_eq!(cli.sources, PathBuf::from("config/sources.yaml"));
        assert_eq!(cli.output_dir, "./out");
        assert_eq!(cli.limit, Some(3));
        assert!(cli.no_translate);
        assert!(cli.source_id.is_none());
    }

    #[test]
    fn test_cli_short_flags_and_defaults() {
        let cli = Cli::parse_from(["newsfetch", "-s", "/tmp/sources.yaml", "-c", "/tmp/newsfetch.yaml"]);

        assert_eq!(cli.sources, PathBuf::from("/tmp/sources.yaml"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/newsfetch.yaml")));
        assert_eq!(cli.output_dir, "data");
        assert!(!cli.no_translate);
    }

    #[test]
    fn test_cli_single_source() {
        let cli = Cli::parse_from(["newsfetch", "-s", "s.yaml", "--source", "bbc", "--memory", "m.json"]);
        assert_eq!(cli.source_id.as_deref(), Some("bbc"));
        assert_eq!(cli.memory, Some(PathBuf::from("m.json")));
    }
}
