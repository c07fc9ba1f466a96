#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

use clap::{Parser, Subcommand};

use imageextract::cli;

fn main() -> anyhow::Result<()> {
    #[derive(Parser)]
    #[clap(version)]
    struct Args {
        /// The tracing filter used for logs
        #[clap(long, env = "IMAGEEXTRACT_LOG", default_value = "imageextract=info,warn")]
        log_level: kubert::LogFilter,

        /// The logging format
        #[clap(long, default_value = "plain")]
        log_format: kubert::LogFormat,

        #[command(subcommand)]
        command: Commands,
    }

    #[derive(Subcommand)]
    enum Commands {
        ExtractImages(cli::ExtractImages),
    }

    let Args {
        log_level,
        log_format,
        command,
    } = Args::parse();

    init_logging(log_level, log_format)?;

    match command {
        Commands::ExtractImages(args) => {
            args.run(&mut std::io::stdout().lock(), &mut std::io::stderr().lock())?
        }
    }

    Ok(())
}

// Results go to stdout, so logs are kept on stderr.
fn init_logging(filter: kubert::LogFilter, format: kubert::LogFormat) -> anyhow::Result<()> {
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter.to_string())
        .with_writer(std::io::stderr);
    match format {
        kubert::LogFormat::Plain => logs.try_init(),
        kubert::LogFormat::Json => logs.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!(e))
}
