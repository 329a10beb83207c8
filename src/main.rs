mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_analyze, run_validate};

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let args = cli::parse();
    settings::init_logging(args.verbose);

    match args.command {
        Commands::Analyze {
            desktop,
            mobile,
            context,
            max_dimension,
            format,
            output,
        } => {
            run_analyze(
                args.config,
                args.verbose,
                desktop,
                mobile,
                context.into(),
                max_dimension,
                format,
                output,
            )
            .await
        }
        Commands::Validate {
            input,
            format,
            output,
        } => run_validate(args.config, args.verbose, input, format, output).await,
    }
}
