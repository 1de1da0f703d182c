use osmetrics_server::core::ServerApp;

#[tokio::main]
async fn main() {
    if let Err(e) = ServerApp::run().await {
        eprintln!("\nError: {}\n", e);
        std::process::exit(1);
    }
}
