//! Reference content store service for PoD.
//!
//! Serves the content store HTTP boundary over any
//! [`pod_store::ContentStore`] backend:
//!
//! - `PUT /objects` -- store the request body, respond `{"digest", "size"}`
//! - `GET /objects/{digest}` -- raw bytes, or 404 (`HEAD` for existence)
//! - `POST /pins/{digest}` / `DELETE /pins/{digest}` -- retention hints
//! - `GET /v1/health`
//!
//! [`pod_store::HttpContentStore`] is the matching client.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use router::{build_router, AppState};
pub use server::PodStoreServer;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use pod_store::{
        ContentStore, ContentStoreExt, HttpContentStore, InMemoryContentStore, MessageContent,
        StoreConfig, StoreError,
    };
    use pod_types::Digest;
    use tokio::net::TcpListener;

    async fn spawn_server(
        backend: Arc<InMemoryContentStore>,
        max_object_size: usize,
        max_retries: u32,
    ) -> HttpContentStore {
        let config = ServerConfig {
            max_object_size,
            ..ServerConfig::default()
        };
        let server = PodStoreServer::new(config, backend);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve_on(listener));

        HttpContentStore::new(StoreConfig {
            max_retries,
            backoff_ms: 1,
            ..StoreConfig::default().with_base_url(format!("http://{addr}"))
        })
        .unwrap()
    }

    async fn spawn_default(max_object_size: usize) -> (Arc<InMemoryContentStore>, HttpContentStore) {
        let backend = Arc::new(InMemoryContentStore::new());
        let client = spawn_server(backend.clone(), max_object_size, 3).await;
        (backend, client)
    }

    #[tokio::test]
    async fn client_round_trip_over_http() {
        let (backend, client) = spawn_default(1024).await;

        let digest = client.put(b"over the wire").await.unwrap();
        assert_eq!(digest, pod_crypto::ContentHasher::CONTENT.hash(b"over the wire"));
        assert_eq!(client.put(b"over the wire").await.unwrap(), digest);
        assert_eq!(backend.len(), 1);

        assert_eq!(client.get(&digest).await.unwrap(), b"over the wire");
        assert!(client.exists(&digest).await.unwrap());

        client.pin(&digest).await.unwrap();
        client.unpin(&digest).await.unwrap();
        assert_eq!(backend.collect_garbage(), 1);
    }

    #[tokio::test]
    async fn client_sees_missing_content_as_not_found() {
        let (_backend, client) = spawn_default(1024).await;
        let digest = Digest::from_hash([6; 32]);
        assert_eq!(client.get(&digest).await, Err(StoreError::NotFound(digest)));
        assert!(!client.exists(&digest).await.unwrap());
        assert_eq!(client.pin(&digest).await, Err(StoreError::NotFound(digest)));
    }

    #[tokio::test]
    async fn client_reports_size_limit() {
        let (_backend, client) = spawn_default(8).await;
        assert_eq!(
            client.put(b"nine bytes").await,
            Err(StoreError::PayloadTooLarge { size: 10, max: 8 })
        );
    }

    #[tokio::test]
    async fn structured_content_over_http() {
        let (_backend, client) = spawn_default(4096).await;
        let message = MessageContent::new("typed over http").with_timestamp(1);
        let digest = client.put_json(&message).await.unwrap();
        let back: MessageContent = client.get_json(&digest).await.unwrap();
        assert_eq!(back, message);
    }

    #[tokio::test]
    async fn disabled_backend_is_unavailable_to_clients() {
        let backend = Arc::new(InMemoryContentStore::new());
        backend.set_disabled(true);
        let client = spawn_server(backend, 1024, 0).await;
        assert!(matches!(
            client.put(b"x").await,
            Err(StoreError::Unavailable(_))
        ));
    }
}
