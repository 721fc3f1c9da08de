pub mod builder;
pub mod io;

pub use builder::{BuildStats, GeneModelBuilder, ModelOptions};
