/// CLI argument parsing.
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "acmex")]
#[command(about = "ACME v2 client for obtaining TLS certificates via DNS-01", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the TOML configuration file.
    #[arg(global = true, short, long, default_value = "acmex.toml")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(global = true, long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Obtain or renew a certificate for a single domain.
    Obtain(ObtainArgs),

    /// Run one renewal pass over every domain configured under `[renewal]`.
    Renew,

    /// Start the certificate-serving HTTP server and background scheduler.
    Serve,

    /// Account management.
    Account(AccountArgs),

    /// Certificate inspection.
    Cert(CertArgs),
}

#[derive(Parser)]
pub struct ObtainArgs {
    /// Domain to obtain a certificate for, e.g. example.com or *.example.com.
    pub domain: String,
}

#[derive(Parser)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommands,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Show the stored account for each configured CA provider.
    Show,
}

#[derive(Parser)]
pub struct CertArgs {
    #[command(subcommand)]
    pub command: CertCommands,
}

#[derive(Subcommand)]
pub enum CertCommands {
    /// Show the cached certificate for a domain.
    Show {
        /// Domain whose cached certificate should be printed.
        domain: String,
    },
}
