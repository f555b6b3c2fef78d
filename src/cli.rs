use clap::Parser;
use std::path::PathBuf;

/// Build an aggregate DocBook index page from manual-page sources
#[derive(Parser, Debug, Clone)]
#[command(name = "man-index")]
#[command(about = "Assemble an alphabetical index page from DocBook refentry sources")]
#[command(version)]
pub struct Cli {
    /// Destination file for the generated index document
    pub output: PathBuf,

    /// DocBook refentry sources, processed in the order given
    pub inputs: Vec<PathBuf>,

    /// Local file substituted for any external entity reference that names
    /// custom-entities.ent
    #[arg(long = "entities-file", default_value = "man/custom-entities.ent")]
    pub entities_file: PathBuf,

    /// Report each source as it is indexed, and the final counts
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cli_parsing() {
        let cli = Cli::try_parse_from([
            "man-index",
            "out/elogind.index.xml",
            "man/loginctl.xml",
            "man/elogind.xml",
        ])
        .unwrap();
        assert_eq!(cli.output, PathBuf::from("out/elogind.index.xml"));
        assert_eq!(cli.inputs.len(), 2);
        assert_eq!(cli.entities_file, PathBuf::from("man/custom-entities.ent"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_zero_inputs_is_valid() {
        let cli = Cli::try_parse_from(["man-index", "index.xml"]).unwrap();
        assert!(cli.inputs.is_empty());
    }

    #[test]
    fn test_output_is_required() {
        assert!(Cli::try_parse_from(["man-index"]).is_err());
    }

    #[test]
    fn test_entities_file_override() {
        let cli = Cli::try_parse_from([
            "man-index",
            "index.xml",
            "--entities-file",
            "build/custom-entities.ent",
        ])
        .unwrap();
        assert_eq!(
            cli.entities_file,
            PathBuf::from("build/custom-entities.ent")
        );
    }
}
