//! blast_genome_gff
//!
//! Projects pairwise-alignment hits from transcript or protein
//! coordinate space onto genome coordinates using spliced gene models,
//! and emits the result as parent/child GFF annotation records.
//!
//! The flow is one way: a GFF/GTF feature stream builds per-transcript
//! gene models, a tabular alignment stream is filtered hit by hit, and
//! each surviving hit is split across its model's exon boundaries.

pub mod annotation;
pub mod blast;
pub mod diag;
pub mod model;
pub mod pipeline;
pub mod project;
pub mod seqdb;
pub mod types;

pub use annotation::{BuildStats, GeneModelBuilder, ModelOptions};

pub use blast::{HitReader, HitRecord};

pub use model::{GeneModel, ModelSet};

pub use pipeline::{AnnotateConfig, Annotator, RunStats};

pub use project::{project, Projection};

pub use seqdb::SubjectDb;

pub use types::{Span, Strand};
