use mock_server::Envelope;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let envelope = match std::env::var("MOCK_LEGACY_RESPONSES") {
        Ok(v) if v == "1" || v.eq_ignore_ascii_case("true") => Envelope::Legacy,
        _ => Envelope::Wrapped,
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    mock_server::run_with(listener, envelope).await
}
