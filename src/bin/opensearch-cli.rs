//! # opensearch-cli - command line access to OpenSearch clusters
//!
//! Keeps named connection profiles (endpoint, credentials, TLS material,
//! retry and timeout settings) in `~/.opensearch-cli/config.yaml` and sends
//! REST calls through them.
//!
//! ## Usage
//!
//! ```bash
//! opensearch-cli profile create --name default --endpoint https://localhost:9200 \
//!     --user admin --password admin
//! opensearch-cli profile list -l
//!
//! opensearch-cli curl get --path _cat/indices --query-params v=true
//! opensearch-cli curl put --path my-index --data @mapping.json --pretty
//! opensearch-cli curl post -P my-index/_search -d '{"query":{"match_all":{}}}' -p dev
//!
//! opensearch-cli completion zsh > ~/.zfunc/_opensearch-cli
//! ```

use clap::Parser;
use opensearch_cli::{error::AppError, printer::print_failure, run, Cli};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise warnings only, or debug output for this crate
/// with `--verbose`.
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,opensearch_cli=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let command = cli.command.name();

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => Err(AppError::Interrupted),
    };

    if let Err(e) = result {
        let _ = print_failure(&mut std::io::stderr(), command, &e, e.suggestion());
        std::process::exit(1);
    }
}
