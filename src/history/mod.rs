mod sqlite;

pub use sqlite::ConversationStore;

use crate::error::RelayError;
use log::info;
use std::path::Path;
use std::sync::Arc;

/// Runs a blocking store operation on tokio's blocking pool.
pub async fn call_blocking<T, F>(store: Arc<ConversationStore>, f: F) -> Result<T, RelayError>
where
    T: Send + 'static,
    F: FnOnce(&ConversationStore) -> Result<T, RelayError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(store.as_ref())).await?
}

pub fn initialize_history_store(
    path: &Path
) -> Result<Arc<ConversationStore>, RelayError> {
    info!("Chat history will be stored in: {}", path.display());
    let store = ConversationStore::new(path);
    store.initialize()?;
    Ok(Arc::new(store))
}
