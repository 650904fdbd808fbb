use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use super::SimilarityModel;
use super::error::SimilarityError;

type Loader = Arc<dyn Fn() -> Result<Arc<dyn SimilarityModel>, SimilarityError> + Send + Sync>;

/// Shared model handle initialised at most once, on first use.
///
/// Concurrent first callers wait on the same initialisation. A failed load
/// leaves the cell empty so a later call can try again.
#[derive(Clone)]
pub struct LazyModel {
    cell: Arc<OnceCell<Arc<dyn SimilarityModel>>>,
    loader: Loader,
}

impl LazyModel {
    /// Defers `loader` until the first [`LazyModel::get`]. It runs on the blocking pool.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn SimilarityModel>, SimilarityError> + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Arc::new(loader),
        }
    }

    /// Wraps an already-constructed model.
    pub fn ready(model: Arc<dyn SimilarityModel>) -> Self {
        let loaded = Arc::clone(&model);
        Self {
            cell: Arc::new(OnceCell::new_with(Some(model))),
            loader: Arc::new(move || Ok(Arc::clone(&loaded))),
        }
    }

    /// Returns the shared model, loading it if needed.
    pub async fn get(&self) -> Result<Arc<dyn SimilarityModel>, SimilarityError> {
        let loader = Arc::clone(&self.loader);
        let model = self
            .cell
            .get_or_try_init(|| async move {
                info!("Loading similarity model");
                tokio::task::spawn_blocking(move || loader())
                    .await
                    .map_err(|e| SimilarityError::ModelLoadFailed {
                        reason: format!("loader task failed: {e}"),
                    })?
            })
            .await?;

        Ok(Arc::clone(model))
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Loaded model, without triggering a load.
    pub fn peek(&self) -> Option<Arc<dyn SimilarityModel>> {
        self.cell.get().cloned()
    }
}

impl std::fmt::Debug for LazyModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyModel")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
