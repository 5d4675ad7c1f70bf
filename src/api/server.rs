//! HTTP server lifecycle: bind, serve the router, shut down on a signal.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, ctx: ApiContext) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, ctx, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for shutdown signal: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    })
    .await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_on(
    listener: TcpListener,
    ctx: ApiContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "API server started");

    axum::serve(listener, api_router(ctx))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::endpoints::test_support::test_context;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn start_and_stop_server() {
        let (ctx, _handles) = test_context();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_on(listener, ctx, async move {
            let _ = shutdown_rx.await;
        }));

        let resp = reqwest::get(format!("http://127.0.0.1:{port}/")).await.unwrap();
        assert!(resp.status().is_success());
        drop(resp);

        shutdown_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
