#[tokio::main]
async fn main() {
    unreel::cli::run().await;
}
