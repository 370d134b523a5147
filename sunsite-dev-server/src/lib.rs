use anyhow::Result;
use axum::Router;
use std::{net::SocketAddr, path::PathBuf};
use tower_http::services::ServeDir;
use tracing::info;

/// Configuration for the development server
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to serve on
    pub port: u16,
    /// Built site directory to serve
    pub root: PathBuf,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            root: PathBuf::from("_site"),
        }
    }
}

/// Static file server for a built site. Serves until Ctrl-C.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Router serving the output directory. Directory URLs resolve to `index.html`.
    pub fn router(&self) -> Router {
        Router::new().fallback_service(ServeDir::new(&self.config.root))
    }

    pub fn address(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.config.host, self.config.port).parse()?)
    }

    /// Run the server
    pub async fn run(self) -> Result<()> {
        // Ensure root directory exists
        if !self.config.root.is_dir() {
            return Err(anyhow::anyhow!(
                "Root directory does not exist: {}",
                self.config.root.display()
            ));
        }

        let addr = self.address()?;
        let app = self.router();

        println!("Serving at http://{}", addr);
        println!("Press Ctrl+C to stop");
        info!(root = %self.config.root.display(), "dev server started");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        println!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server(root: PathBuf) -> DevServer {
        DevServer::new(DevServerConfig {
            root,
            ..DevServerConfig::default()
        })
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    #[tokio::test]
    async fn test_serves_built_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/guide.html"), "guide").unwrap();

        let router = server(dir.path().to_path_buf()).router();

        let (status, body) = get(router.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>home</h1>");

        let (status, body) = get(router, "/docs/guide.html").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "guide");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (status, _) = get(server(dir.path().to_path_buf()).router(), "/nope.html").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_run_requires_root() {
        let dir = tempfile::tempdir().unwrap();
        let err = server(dir.path().join("missing")).run().await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_address() {
        let server = DevServer::new(DevServerConfig {
            port: 9000,
            ..DevServerConfig::default()
        });
        assert_eq!(server.address().unwrap().to_string(), "127.0.0.1:9000");
    }
}
