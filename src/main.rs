use clap::Parser;
use miette::{IntoDiagnostic, Result};
use cmma::cli::{Cli, Commands};
use cmma::core::{logging, AnalyzerConfig};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior so piping into `head` exits quietly
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;

    let (config, config_warnings) = AnalyzerConfig::load();
    logging::init(global.verbose, config.log_file.as_deref()).into_diagnostic()?;
    for warning in &config_warnings {
        tracing::warn!("{warning}");
    }
    tracing::debug!(?config, "effective configuration");

    match cli.command {
        Commands::Records(args) => cmma::cli::commands::records::run(args, &config, &global),
        Commands::Stats(args) => cmma::cli::commands::stats::run(args, &config, &global),
        Commands::Tolerance(args) => cmma::cli::commands::tolerance::run(args, &config, &global),
        Commands::Report(args) => cmma::cli::commands::report::run(args, &config, &global),
        Commands::Config(cmd) => cmma::cli::commands::config::run(cmd, &config, &global),
        Commands::Completions(args) => cmma::cli::commands::completions::run(args),
    }
}
