// Caption generation module
pub mod adapter;
pub mod diversity;

pub use adapter::ModelAdapter;
pub use diversity::CaptionDiversityEngine;
