pub mod evaluator;

pub use evaluator::ModelPromotionEvaluator;
