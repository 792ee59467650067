use clap::{ArgAction, Parser};
use raw2dng_batch::{Options, Selection};
use raw2dng_config::Config;
use std::num::NonZeroUsize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "raw2dng", version, about = "Batch-convert camera RAW files into DNG")]
pub struct Cli {
    /// RAW files to convert, or a single folder to scan for them.
    #[arg(required = true, value_name = "INPUTS")]
    pub inputs: Vec<PathBuf>,

    /// Folder to write DNG files into (created if missing).
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of files to convert at the same time.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<NonZeroUsize>,

    /// External converter program (default: search PATH).
    #[arg(long, value_name = "PROGRAM")]
    pub converter: Option<PathBuf>,

    /// Only scan the top level of a folder.
    #[arg(long)]
    pub no_recursive: bool,

    /// Skip reading each file before conversion.
    #[arg(long)]
    pub no_preflight: bool,

    /// Verbose output level (use multiple times for more verbosity).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Command-line flags win over every configuration layer.
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.output = Some(output.clone());
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs.get();
        }
        if let Some(program) = &self.converter {
            config.converter.program = Some(program.clone());
        }
        if self.no_recursive {
            config.recursive = false;
        }
        if self.no_preflight {
            config.preflight = false;
        }
    }

    /// A single folder is scanned; anything else is an explicit file list.
    pub fn selection(&self) -> Selection {
        match self.inputs.as_slice() {
            [folder] if folder.is_dir() => Selection::folder(folder),
            files => Selection::files(files.iter().cloned()),
        }
    }
}

pub fn options(config: &Config) -> Options {
    Options { jobs: config.jobs, recursive: config.recursive, preflight: config.preflight }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("raw2dng").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_inputs_required() {
        assert!(Cli::try_parse_from(["raw2dng"]).is_err());
        assert!(Cli::try_parse_from(["raw2dng", "-o", "/out"]).is_err());
    }

    #[rstest]
    #[case(&["a.cr2"], 0)]
    #[case(&["-v", "a.cr2"], 1)]
    #[case(&["-vvv", "a.cr2"], 3)]
    #[case(&["-v", "--verbose", "a.cr2"], 2)]
    fn test_verbosity(#[case] args: &[&str], #[case] expected: u8) {
        assert_eq!(parse(args).verbose, expected);
    }

    #[rstest]
    #[case("0", false)]
    #[case("-1", false)]
    #[case("four", false)]
    #[case("4", true)]
    fn test_jobs(#[case] jobs: &str, #[case] valid: bool) {
        assert_eq!(Cli::try_parse_from(["raw2dng", "-j", jobs, "a.cr2"]).is_ok(), valid);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = parse(&["-o", "/out", "-j", "3", "--converter", "/opt/dnglab", "--no-recursive", "--no-preflight", "a.cr2", "b.nef"]);
        assert_eq!(cli.inputs, [PathBuf::from("a.cr2"), PathBuf::from("b.nef")]);

        let mut config = Config { output: Some("/configured".into()), ..Config::default() };
        cli.apply(&mut config);
        assert_eq!(config.output, Some(PathBuf::from("/out")));
        assert_eq!(config.jobs, 3);
        assert_eq!(config.converter.program, Some(PathBuf::from("/opt/dnglab")));
        assert!(!config.recursive);
        assert!(!config.preflight);
        assert_eq!(options(&config), Options { jobs: 3, recursive: false, preflight: false });
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let cli = parse(&["a.cr2"]);
        let mut config = Config { output: Some("/configured".into()), jobs: 2, ..Config::default() };
        cli.apply(&mut config);
        assert_eq!(config.output, Some(PathBuf::from("/configured")));
        assert_eq!(config.jobs, 2);
        assert!(config.recursive);
        assert!(config.preflight);
    }

    #[test]
    fn test_selection() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().to_str().unwrap();
        assert!(matches!(parse(&[folder]).selection(), Selection::Folder(_)));
        assert!(matches!(parse(&["a.cr2"]).selection(), Selection::Files(files) if files.len() == 1));
        // Two folders are not a folder scan.
        assert!(matches!(parse(&[folder, folder]).selection(), Selection::Files(files) if files.len() == 2));
    }
}
