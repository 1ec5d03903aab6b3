use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");

    let db = mock_server::seeded(&[]);
    if let (Ok(user), Ok(password)) = (std::env::var("PASTY_USER"), std::env::var("PASTY_PASSWORD")) {
        let id = db.write().await.add_user(&user, &password);
        tracing::info!(user = %user, id = %id, "seeded account");
    }

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on {addr}");
    mock_server::run(listener, db).await
}
