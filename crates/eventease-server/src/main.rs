#[tokio::main]
async fn main() {
    eventease_server::start_server().await;
}
