use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "armsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge Azure Resource Manager resources to a desired state", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Settings file (default: <config dir>/settings.toml)
    #[arg(long, global = true, value_name = "FILE", env = "ARMSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Keep the service's camelCase keys instead of snake_case
    #[arg(long, global = true)]
    pub preserve_keys: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Reconcile one resource to its desired state
    Apply(ApplyArgs),

    /// Query resources without changing them
    Info(InfoArgs),

    /// List supported resource types
    Types,

    /// Show the arguments of a resource type
    Describe {
        /// Resource type, e.g. resource_group
        resource_type: String,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ArgSource {
    /// JSON or TOML file with module arguments
    #[arg(long = "args", value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Module argument; the value is parsed as JSON, else taken as a string
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
    pub pairs: Vec<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Resource type, e.g. resource_group
    pub resource_type: String,

    #[command(flatten)]
    pub source: ArgSource,

    /// Report what would change without changing it
    #[arg(long)]
    pub check: bool,

    /// Print property differences to stderr
    #[arg(long)]
    pub diff: bool,
}

#[derive(Args)]
pub struct InfoArgs {
    /// Resource type, e.g. virtual_network
    pub resource_type: String,

    #[command(flatten)]
    pub source: ArgSource,

    /// Follow nextLink cursors and return every page
    #[arg(long)]
    pub all_pages: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON document on stdout
    Json,
    /// Human-readable summary
    Text,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from([
            "armsync",
            "-vv",
            "apply",
            "resource_group",
            "-a",
            "name=rg1",
            "--arg",
            "location=westus",
            "--check",
            "--output",
            "text",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Command::Apply(args) => {
                assert_eq!(args.resource_type, "resource_group");
                assert_eq!(args.source.pairs, vec!["name=rg1", "location=westus"]);
                assert!(args.check);
                assert!(!args.diff);
            }
            _ => panic!("Expected apply"),
        }
    }

    #[test]
    fn test_parse_info_with_file() {
        let cli =
            Cli::try_parse_from(["armsync", "info", "subnet", "--args", "net.json", "--all-pages"])
                .unwrap();
        match cli.command {
            Command::Info(args) => {
                assert_eq!(args.source.file, Some(PathBuf::from("net.json")));
                assert!(args.all_pages);
            }
            _ => panic!("Expected info"),
        }
    }
}
