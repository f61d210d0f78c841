#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = markdesk_rust::run().await {
        eprintln!("markdesk-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
