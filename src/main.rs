#[tokio::main]
async fn main() -> acmex::Result<()> {
    if let Err(e) = acmex::cli::run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
