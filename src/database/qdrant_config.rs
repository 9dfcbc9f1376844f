use qdrant_client::{Qdrant, config::QdrantConfig};
use std::time::Duration;
use tracing::{error, info};

use super::vector_db::VectorDBError;

/// Qdrant's REST port is 6333; the client speaks gRPC on 6334.
pub fn grpc_url(url: &str) -> String {
    // Clean the URL
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url).to_string()
    } else {
        url.to_string()
    };
    let clean_url = clean_url.trim_end_matches('/').to_string();

    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url
    };

    format!("http://{}", grpc_url)
}

pub async fn create_qdrant_client(url: &str) -> Result<Qdrant, VectorDBError> {
    let url_with_scheme = grpc_url(url);
    info!("Attempting to connect to Qdrant with URL: {}", url_with_scheme);

    let mut config = QdrantConfig::from_url(&url_with_scheme);
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);

    let client = Qdrant::new(config).map_err(|e| VectorDBError::Connection(e.to_string()))?;

    // Test the connection
    match client.list_collections().await {
        Ok(_) => {
            info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            error!("Connection test failed: {}", e);
            Err(VectorDBError::Connection(format!("Failed to connect to Qdrant: {}", e)))
        }
    }
}
