#[tokio::main]
async fn main() {
    if let Err(error) = condei_lib::run().await {
        eprintln!("fatal: {error}");
        std::process::exit(1);
    }
}
