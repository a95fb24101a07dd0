use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_logging(args: &epcscrape::cli::Args) {
    let default_filter = if args.verbose {
        "epcscrape=debug"
    } else if args.quiet {
        "warn"
    } else {
        "epcscrape=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = epcscrape::cli::Args::parse();
    init_logging(&args);
    if let Err(e) = epcscrape::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
