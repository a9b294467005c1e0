use clap::Parser;
use tracing_subscriber::EnvFilter;
use webpilot::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match (cli.quiet, cli.verbose) {
        (true, 0) => "warn",
        (_, 0) => "info",
        (_, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.with_ansi(!cli.no_color).init();
    }
    if cli.no_color {
        console::set_colors_enabled(false);
    }

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => cli::run::handle_run(args, config, cli.quiet).await,
        Commands::Generate(args) => cli::generate::handle_generate(args, cli.quiet).await,
        Commands::Review(args) => cli::review::handle_review(args, config, cli.quiet).await,
        Commands::Validate(args) => cli::validate::handle_validate(args, config, cli.quiet).await,
        Commands::Models(args) => cli::models::handle_models(args, config, cli.quiet).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
