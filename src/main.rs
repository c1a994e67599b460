#[tokio::main]
async fn main() {
    bracket_tool::run().await;
}
