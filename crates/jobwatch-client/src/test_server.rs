//! Local axum server for client tests.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::http::{Method, StatusCode};
use tokio::net::TcpListener;

/// Method and body of the last request the server answered.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub body: String,
}

/// Answer every request with `status` and `body`.
///
/// Returns the base URL and the last captured request.
pub async fn serve(status: u16, body: &'static str) -> (String, Arc<Mutex<Option<Captured>>>) {
    let captured = Arc::new(Mutex::new(None));
    let sink = captured.clone();
    let status = StatusCode::from_u16(status).unwrap();

    let app = Router::new().fallback(move |method: Method, payload: String| {
        let sink = sink.clone();
        async move {
            *sink.lock().unwrap() = Some(Captured {
                method,
                body: payload,
            });
            (status, body)
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (format!("http://{addr}/"), captured)
}
