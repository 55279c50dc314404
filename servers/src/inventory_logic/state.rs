use bms_common::imaging::{self, NormalizeOptions};
use bms_common::notify::{Broadcaster, Notification};
use bms_common::store::MemoryStore;
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Connected WebSocket clients
    pub broadcaster: Arc<Broadcaster>,
    // Document collections
    pub store: Arc<MemoryStore>,
    // Bounding box and quality for uploaded images
    pub images: NormalizeOptions,
}

impl AppState {
    pub fn new(images: NormalizeOptions) -> Self {
        Self {
            broadcaster: Arc::new(Broadcaster::new()),
            store: Arc::new(MemoryStore::new()),
            images,
        }
    }

    /// Pushes a change event to every connected client.
    pub fn notify(&self, kind: &str, data: Value) {
        let report = self.broadcaster.broadcast(&Notification::new(kind, data));
        log::debug!(
            "'{}' sent to {} client(s), {} dropped",
            kind,
            report.delivered,
            report.dropped.len()
        );
    }

    /// Normalizes one embedded image off the async workers. Fail-open.
    pub async fn normalize_image(&self, image: String) -> String {
        self.normalize_images(vec![image])
            .await
            .pop()
            .unwrap_or_default()
    }

    /// Normalizes a batch of embedded images in one blocking task. Fail-open:
    /// if the task itself dies the inputs are returned as submitted.
    pub async fn normalize_images(&self, images: Vec<String>) -> Vec<String> {
        if images.is_empty() {
            return images;
        }
        let options = self.images;
        let originals = images.clone();
        let task = tokio::task::spawn_blocking(move || {
            images
                .iter()
                .map(|image| imaging::normalize(image, &options))
                .collect::<Vec<_>>()
        });
        match task.await {
            Ok(normalized) => normalized,
            Err(e) => {
                log::error!("Image normalization task failed: {}", e);
                originals
            }
        }
    }
}
