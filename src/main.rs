//! perimeter CLI binary.
//!
//! Minimal entrypoint; all logic is in the library and `cli::run` handles
//! its own output.

#[tokio::main]
async fn main() {
    if let Err(error) = perimeter::cli::run().await {
        eprintln!("error: {error:#}");
        std::process::exit(1);
    }
}
