use clap::{Parser, Subcommand, ValueEnum};
use cro_lib::PromptContext;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cro")]
#[command(
    version,
    about = "CRO vision analysis - validated above-the-fold insights from landing page screenshots",
    long_about = "CRO vision analysis\n\nModes:\n- analyze: send a desktop + mobile screenshot pair to a vision model and print the validated result.\n- validate: run the extraction and schema checks over a saved model reply (no network).\n\nUse --help on any subcommand for details."
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Optional config file (TOML) for model, retry, pricing and image defaults"
    )]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a desktop + mobile above-the-fold screenshot pair
    Analyze {
        #[arg(long, help = "Desktop viewport screenshot (png, jpg, jpeg, webp, gif)")]
        desktop: PathBuf,

        #[arg(long, help = "Mobile viewport screenshot (png, jpg, jpeg, webp, gif)")]
        mobile: PathBuf,

        #[arg(
            long,
            value_enum,
            default_value = "comparison",
            help = "Prompt framing for the analysis"
        )]
        context: ContextArg,

        #[arg(
            long,
            help = "Downscale screenshots so the longest side is at most this many pixels (overrides config)"
        )]
        max_dimension: Option<u32>,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
    /// Validate a saved model reply (raw provider JSON or the analysis JSON itself)
    Validate {
        #[arg(long, help = "Path to the saved reply, or '-' to read stdin")]
        input: String,

        #[arg(long, value_enum, default_value = "json", help = "Output format")]
        format: OutputFormat,

        #[arg(long, short, help = "Output file path (stdout if omitted)")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ContextArg {
    Desktop,
    Mobile,
    Comparison,
}

impl From<ContextArg> for PromptContext {
    fn from(arg: ContextArg) -> Self {
        match arg {
            ContextArg::Desktop => PromptContext::Desktop,
            ContextArg::Mobile => PromptContext::Mobile,
            ContextArg::Comparison => PromptContext::Comparison,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Pretty,
}

pub fn parse() -> Cli {
    Cli::parse()
}
