use clap::Parser;
use miette::Result;
use survey_pivot::cli::commands::run::RunArgs;
use survey_pivot::cli::{Cli, Commands};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    // Piping into `head` must not panic on a closed stdout
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
    setup_logging(global.verbose, global.quiet);

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => survey_pivot::cli::commands::run::run(args, &global),
        Commands::Sql(args) => survey_pivot::cli::commands::sql::run(args, &global),
        Commands::Structure(args) => survey_pivot::cli::commands::structure::run(args, &global),
        Commands::Status => survey_pivot::cli::commands::status::run(&global),
        Commands::Export(args) => survey_pivot::cli::commands::export::run(args, &global),
        Commands::Completions(args) => survey_pivot::cli::commands::completions::run(args),
    }
}
