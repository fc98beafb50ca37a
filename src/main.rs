//! deployscan - contract deployment scanner
//!
//! Lists the contracts deployed by one sender from a starting transaction on
//! and reports each one's proxy role, implementation, admin, owner and
//! readable parameters.

use deployscan::cli;

#[tokio::main]
async fn main() {
    cli::init_logging();

    if let Err(e) = cli::run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
