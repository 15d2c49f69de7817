//! agentvm - disposable Linode build environments for coding sessions

use clap::Parser;

use agentvm::cli::Cli;
use agentvm::domain::ProviderError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.run().await {
        // `:#` prints the whole context chain, which carries the remediation
        // hints attached at each layer.
        eprintln!("Error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

/// 1 for local failures, 2 when the provider API is involved. Argument
/// misuse exits 2 through clap before reaching here.
fn exit_code(err: &anyhow::Error) -> i32 {
    if err
        .chain()
        .any(|cause| cause.downcast_ref::<ProviderError>().is_some())
    {
        2
    } else {
        1
    }
}
