// Model backend boundary
use crate::error::ModelError;
use crate::models::ImageReference;
use crate::retraining::TrainingDataset;
use std::path::Path;
use std::sync::Arc;

/// An opaque caption model. Implementations must be safe for concurrent
/// read-only inference: `infer` takes `&self` and may be called from many
/// threads at once.
pub trait ModelAdapter: Send + Sync {
    /// Caption one image. With `noise` the backend samples stochastically.
    fn infer(&self, image: &ImageReference, noise: bool) -> Result<String, ModelError>;

    /// Train on `dataset` and write the resulting artifact to `output_path`
    fn fit(&self, dataset: &TrainingDataset, output_path: &Path) -> Result<(), ModelError>;

    /// Load a serialized artifact as a model that can itself be queried
    fn load(&self, path: &Path) -> Result<Arc<dyn ModelAdapter>, ModelError>;
}
