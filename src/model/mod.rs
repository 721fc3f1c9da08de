pub mod gene;

pub use gene::{GeneModel, ModelSet};
