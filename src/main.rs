#[tokio::main]
async fn main() -> std::io::Result<()> {
    museum_booking::run_with_config().await
}
