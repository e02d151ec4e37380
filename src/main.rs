#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = deseva_rust::run().await {
        eprintln!("deseva-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
