#[tokio::main]
async fn main() {
    lottery_backend::run().await;
}
