pub mod model_registry;

pub use model_registry::ModelRegistry;
