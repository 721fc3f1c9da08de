use std::collections::HashMap;

use crate::project::{self, Projection};
use crate::types::{Span, Strand};

/// Where one transcript lives on the genome: its scaffold, strand, and
/// the exon spans its linear sequence is spliced from.
///
/// `scaffold` and `strand` stay `None` until a location-bearing feature
/// is seen, so a model built from orphan exon lines is distinguishable
/// from one whose transcript feature carried an undefined `.` strand.
/// Exons are stored in input order, unsorted, and may repeat when both
/// exon and CDS features were counted; the projector sorts per call and
/// the annotator reports the repeats.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneModel {
    scaffold: Option<String>,
    strand: Option<Strand>,
    exons: Vec<Span>,
}

impl GeneModel {
    pub fn scaffold(&self) -> Option<&str> {
        self.scaffold.as_deref()
    }

    pub fn strand(&self) -> Option<Strand> {
        self.strand
    }

    pub fn exons(&self) -> &[Span] {
        &self.exons
    }

    /// Set or overwrite the scaffold and strand.
    pub fn set_location(&mut self, scaffold: &str, strand: Strand) {
        self.scaffold = Some(scaffold.to_string());
        self.strand = Some(strand);
    }

    pub fn add_exon(&mut self, span: Span) {
        self.exons.push(span);
    }

    /// Project a transcript-space span onto this model's exons.
    pub fn project(&self, offset: u32, length: u32, reverse: bool) -> Projection {
        project::project(&self.exons, offset, length, reverse)
    }
}

/// All gene models of a run, keyed by transcript identifier.
/// Built once by the annotation builder, read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    models: HashMap<String, GeneModel>,
}

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&GeneModel> {
        self.models.get(id)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Models that received a scaffold, i.e. were named by a transcript
    /// feature (or by an exon in no-gene mode).
    pub fn located_count(&self) -> usize {
        self.models.values().filter(|m| m.scaffold.is_some()).count()
    }

    pub fn set_location(&mut self, id: &str, scaffold: &str, strand: Strand) {
        self.models
            .entry(id.to_string())
            .or_default()
            .set_location(scaffold, strand);
    }

    pub fn add_exon(&mut self, id: &str, span: Span) {
        self.models.entry(id.to_string()).or_default().add_exon(span);
    }
}
