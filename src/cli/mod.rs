/// CLI entry point: argument parsing, logging setup, and command dispatch.
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

pub mod args;
pub mod commands;

use args::{AccountCommands, CertCommands, Cli, Commands};

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence over
/// `log_level` when set. When `otlp_endpoint` is set, spans are additionally
/// exported over OTLP/gRPC via `tracing-opentelemetry`.
pub fn init_logging(log_level: &str, otlp_endpoint: Option<&str>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let registry = tracing_subscriber::registry().with(filter).with(fmt_layer);

    if let Some(endpoint) = otlp_endpoint {
        match build_otlp_tracer(endpoint) {
            Ok(tracer) => {
                registry.with(tracing_opentelemetry::layer().with_tracer(tracer)).init();
                return;
            }
            Err(e) => eprintln!("failed to initialize OTLP exporter, continuing without it: {}", e),
        }
    }

    registry.init();
}

fn build_otlp_tracer(endpoint: &str) -> std::result::Result<opentelemetry_sdk::trace::Tracer, String> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| e.to_string())?;

    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_batch_exporter(exporter).build();

    Ok(provider.tracer("acmex"))
}

pub async fn run() -> crate::error::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;
    init_logging(&cli.log_level, config.logging.otlp_endpoint.as_deref());

    match cli.command {
        Commands::Obtain(args) => commands::handle_obtain(&config, &args.domain).await?,
        Commands::Renew => commands::handle_renew(&config).await?,
        Commands::Serve => commands::handle_serve(&config).await?,
        Commands::Account(args) => match args.command {
            AccountCommands::Show => commands::handle_account_show(&config).await?,
        },
        Commands::Cert(args) => match args.command {
            CertCommands::Show { domain } => commands::handle_cert_show(&config, &domain).await?,
        },
    }

    Ok(())
}
