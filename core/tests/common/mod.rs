use tokio::net::TcpListener;

/// Start the mock server on an ephemeral port and return its base URL.
pub async fn start_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        if let Err(err) = mock_server::run(listener).await {
            eprintln!("mock server stopped: {err}");
        }
    });
    format!("http://{addr}")
}
