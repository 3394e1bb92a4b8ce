use forge_provider::{init_logging, serve, ForgeProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(ForgeProvider::new()).await
}
