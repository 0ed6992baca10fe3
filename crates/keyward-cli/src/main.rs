//! Keyward CLI binary

#[tokio::main]
async fn main() {
    if let Err(e) = keyward_cli::run().await {
        eprintln!("Error: {e:#}");
        for hint in keyward_cli::suggestions(&e) {
            eprintln!("  hint: {hint}");
        }
        std::process::exit(keyward_cli::exit_code(&e));
    }
}
