use std::collections::HashMap;
use std::fmt;
use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use log::{info, warn};

use crate::blast::{HitReader, HitRecord};
use crate::diag::{Admission, WarnGate};
use crate::model::ModelSet;
use crate::seqdb::{self, SubjectDb};
use crate::types::{Span, Strand};

/// Feature type of the per-exon child records.
const CHILD_FEATURE: &str = "match_part";

/// Everything that shapes filtering and output.
#[derive(Debug, Clone)]
pub struct AnnotateConfig {
    /// Program label for output column 2; also selects the coordinate
    /// multiplier.
    pub program: String,
    /// Feature type for the parent records in output column 3.
    pub feature_type: String,
    /// Minimum alignment length as a fraction of the subject length.
    pub coverage_cutoff: f64,
    /// Hits at or above this e-value are dropped.
    pub evalue_cutoff: f64,
    /// Minimum bitscore per aligned position.
    pub score_cutoff: f64,
    /// Most hits to keep per query.
    pub max_targets: u32,
    /// Truncate query identifiers at the last occurrence of this
    /// delimiter before any counting or lookup.
    pub query_delimiter: Option<String>,
    /// Report the Target tag as percent of the subject length instead
    /// of subject coordinates.
    pub percent_target: bool,
    /// Subject identifiers are swissprot `db|accession|entry` headers.
    pub swissprot: bool,
    /// Add an Accession attribute from the swissprot identifier.
    pub add_accession: bool,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            program: "BLASTX".to_string(),
            feature_type: "protein_match".to_string(),
            coverage_cutoff: 0.1,
            evalue_cutoff: 1e-3,
            score_cutoff: 0.1,
            max_targets: 10,
            query_delimiter: None,
            percent_target: false,
            swissprot: false,
            add_accession: false,
        }
    }
}

/// All cross-hit state of one annotation run: the per-query and
/// per-subject counters and every diagnostic tally. `Display` renders
/// the end-of-run report.
#[derive(Debug, Default)]
pub struct RunStats {
    pub lines: u64,
    pub kept: u64,
    pub subject_not_found: u64,
    pub coverage_removals: u64,
    pub score_removals: u64,
    pub evalue_removals: u64,
    pub max_removals: u64,
    pub backframe_hits: u64,
    pub intervals_written: u64,
    pub empty_projections: u64,
    missing_scaffold: WarnGate,
    duplicate_intervals: WarnGate,
    query_hits: HashMap<String, u32>,
    subject_hits: HashMap<String, u32>,
}

impl RunStats {
    /// Distinct queries that survived the filtering cascade.
    pub fn queries(&self) -> usize {
        self.query_hits.len()
    }

    /// Total accepted subject occurrences.
    pub fn subject_occurrences(&self) -> u64 {
        self.subject_hits.values().map(|&c| u64::from(c)).sum()
    }

    pub fn missing_scaffolds(&self) -> u64 {
        self.missing_scaffold.seen()
    }

    pub fn duplicate_interval_hits(&self) -> u64 {
        self.duplicate_intervals.seen()
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "hits: {} alignment lines, kept {}", self.lines, self.kept)?;
        if self.subject_not_found > 0 {
            writeln!(
                f,
                "hits: {} subjects not found in the sequence table",
                self.subject_not_found
            )?;
        }
        writeln!(
            f,
            "hits: removed {} below the coverage cutoff",
            self.coverage_removals
        )?;
        writeln!(f, "hits: removed {} below the score cutoff", self.score_removals)?;
        writeln!(f, "hits: removed {} by e-value", self.evalue_removals)?;
        writeln!(
            f,
            "hits: removed {} over the per-query maximum",
            self.max_removals
        )?;
        writeln!(
            f,
            "hits: {} subject occurrences for {} queries",
            self.subject_occurrences(),
            self.queries()
        )?;
        if self.backframe_hits > 0 {
            writeln!(f, "hits: {} antisense matches", self.backframe_hits)?;
        }
        if self.intervals_written > 0 {
            writeln!(f, "hits: wrote {} match intervals", self.intervals_written)?;
        } else {
            writeln!(
                f,
                "hits: no intervals written; check for identifier mismatches between the annotation and the alignment table"
            )?;
        }
        if self.missing_scaffolds() > 0 {
            writeln!(
                f,
                "hits: no scaffold found for {} hits",
                self.missing_scaffolds()
            )?;
        }
        if self.empty_projections > 0 {
            writeln!(
                f,
                "hits: {} hits produced no genomic intervals",
                self.empty_projections
            )?;
        }
        if self.duplicate_interval_hits() > 0 {
            writeln!(
                f,
                "hits: {} hits contained duplicate intervals",
                self.duplicate_interval_hits()
            )?;
        }
        Ok(())
    }
}

/// Streams alignment records through the filtering cascade and writes
/// parent and child annotation lines for the survivors.
///
/// The gene models and the subject table are read-only; all mutable
/// cross-hit state lives in [`RunStats`].
pub struct Annotator<'a> {
    config: AnnotateConfig,
    multiplier: u32,
    subjects: &'a SubjectDb,
    models: &'a ModelSet,
    stats: RunStats,
}

impl<'a> Annotator<'a> {
    pub fn new(config: AnnotateConfig, subjects: &'a SubjectDb, models: &'a ModelSet) -> Self {
        let multiplier = coordinate_multiplier(&config.program);
        if multiplier == 1 {
            info!("program is {}, coordinates are nucleotides", config.program);
        } else {
            info!(
                "program is {}, coordinates multiplied by {}",
                config.program, multiplier
            );
        }
        Self {
            config,
            multiplier,
            subjects,
            models,
            stats: RunStats::default(),
        }
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Run the whole stream, writing annotation lines to `out`.
    pub fn annotate<R: BufRead, W: Write>(
        &mut self,
        mut hits: HitReader<R>,
        out: &mut W,
    ) -> Result<()> {
        while let Some(hit) = hits.next_record()? {
            self.stats.lines += 1;
            self.annotate_hit(&hit, out)?;
        }
        Ok(())
    }

    /// Process one alignment record: filter, project, emit.
    pub fn annotate_hit<W: Write>(&mut self, hit: &HitRecord, out: &mut W) -> Result<()> {
        // subject length is looked up by the raw identifier
        let Some(subject_length) = self.subjects.length(&hit.subject_id) else {
            self.stats.subject_not_found += 1;
            return Ok(());
        };
        let subject_length = subject_length as f64;

        let coverage = hit.align_length / subject_length;
        let score_density = hit.bitscore / hit.align_length;
        if coverage < self.config.coverage_cutoff {
            self.stats.coverage_removals += 1;
            return Ok(());
        }
        if score_density < self.config.score_cutoff {
            self.stats.score_removals += 1;
            return Ok(());
        }
        if hit.evalue >= self.config.evalue_cutoff {
            self.stats.evalue_removals += 1;
            return Ok(());
        }
        self.stats.kept += 1;

        // per-query cap, counted before the comparison: a rejected hit
        // still consumes its slot
        let query_id = chop(&hit.query_id, self.config.query_delimiter.as_deref());
        let seen = {
            let count = self.stats.query_hits.entry(query_id.clone()).or_insert(0);
            *count += 1;
            *count
        };
        if seen > self.config.max_targets {
            self.stats.max_removals += 1;
            return Ok(());
        }

        // subject naming and the occurrence number that makes record
        // identifiers unique
        let (subject_id, accession) = if self.config.swissprot {
            let Some((acc, entry)) = seqdb::swissprot_fields(&hit.subject_id) else {
                bail!(
                    "subject id '{}' is not a swissprot db|accession|entry header",
                    hit.subject_id
                );
            };
            let accession = self.config.add_accession.then(|| acc.to_string());
            (entry.to_string(), accession)
        } else {
            (hit.subject_id.replace('|', ""), None)
        };
        let occurrence = {
            let count = self.stats.subject_hits.entry(subject_id.clone()).or_insert(0);
            *count += 1;
            *count
        };

        // an alignment running backwards along the query is antisense
        // relative to the gene strand
        let (mut query_start, mut query_end) = (hit.query_start, hit.query_end);
        let mut backframe = false;
        if query_start > query_end {
            std::mem::swap(&mut query_start, &mut query_end);
            backframe = true;
            self.stats.backframe_hits += 1;
        }

        // protein position 1 becomes nucleotide 1, position 2 becomes
        // nucleotide 4; the end is always the end of a codon
        let nt_start = (query_start - 1) * self.multiplier + 1;
        let nt_end = query_end * self.multiplier;
        let nt_length = nt_end - nt_start + 1;

        let Some(model) = self.models.get(&query_id) else {
            self.warn_missing_scaffold(&query_id);
            return Ok(());
        };
        let Some(scaffold) = model.scaffold() else {
            self.warn_missing_scaffold(&query_id);
            return Ok(());
        };
        let strand = match model.strand() {
            Some(Strand::Plus) => Strand::Plus,
            Some(Strand::Minus) => Strand::Minus,
            Some(Strand::Unknown) => {
                warn!("strand is undefined for {} on {}", query_id, scaffold);
                return Ok(());
            }
            None => {
                warn!("possible mismatch in ID for {} on {}", query_id, scaffold);
                return Ok(());
            }
        };

        let projection = model.project(nt_start, nt_length, strand == Strand::Minus);
        self.stats.intervals_written += projection.parts.len() as u64;
        if projection.truncated && !projection.parts.is_empty() {
            warn!(
                "hit of {} extends beyond the gene model of {}",
                subject_id, query_id
            );
        }
        if projection.parts.is_empty() {
            warn!("no intervals for {} in {}", subject_id, query_id);
            self.stats.empty_projections += 1;
            return Ok(());
        }

        // usually a sign that both exon and CDS features were counted
        if max_span_frequency(&projection.parts) > 1 {
            match self.stats.duplicate_intervals.admit() {
                Admission::Open => {
                    warn!("duplicate intervals found for {}, check the exon/CDS options", query_id)
                }
                Admission::Closing => warn!(
                    "duplicate intervals found for {}, will not print further warnings",
                    query_id
                ),
                Admission::Closed => {}
            }
        }

        let Some((parent_start, parent_end)) = projection.bounds() else {
            return Ok(());
        };
        let out_strand = if backframe { strand.flipped() } else { strand };

        let record_id = format!("{}.{}.{}", subject_id, query_id, occurrence);
        let sense = if backframe { '-' } else { '+' };
        let same_sense = if backframe { '0' } else { '1' };

        let mut attrs = if self.config.percent_target {
            let target_start: f64 = hit
                .subject_start
                .parse()
                .with_context(|| format!("bad subject start '{}'", hit.subject_start))?;
            let target_end: f64 = hit
                .subject_end
                .parse()
                .with_context(|| format!("bad subject end '{}'", hit.subject_end))?;
            format!(
                "ID={};Target={} {:.1} {:.1} {};same_sense={}",
                record_id,
                subject_id,
                target_start * 100.0 / subject_length,
                target_end * 100.0 / subject_length,
                sense,
                same_sense
            )
        } else {
            format!(
                "ID={};Target={} {} {} {};same_sense={}",
                record_id, subject_id, hit.subject_start, hit.subject_end, sense, same_sense
            )
        };
        attrs.push_str(&format!(
            ";Gaps={};Mismatch={};Evalue={}",
            hit.gap_opens, hit.mismatches, hit.evalue_raw
        ));
        if self.subjects.has_descriptions() {
            attrs.push_str(";Description=");
            attrs.push_str(self.subjects.description(&subject_id).unwrap_or("None"));
        }
        if let Some(acc) = &accession {
            attrs.push_str(";Accession=");
            attrs.push_str(acc);
        }

        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t.\t{}",
            scaffold,
            self.config.program,
            self.config.feature_type,
            parent_start,
            parent_end,
            hit.bitscore_raw,
            out_strand,
            attrs
        )?;
        for part in &projection.parts {
            writeln!(
                out,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t.\tParent={}",
                scaffold,
                self.config.program,
                CHILD_FEATURE,
                part.start,
                part.end,
                hit.bitscore_raw,
                out_strand,
                record_id
            )?;
        }
        Ok(())
    }

    fn warn_missing_scaffold(&mut self, query_id: &str) {
        match self.stats.missing_scaffold.admit() {
            Admission::Open => warn!("cannot get scaffold for {}", query_id),
            Admission::Closing => warn!(
                "cannot get scaffold for {}, will not print further warnings",
                query_id
            ),
            Admission::Closed => {}
        }
    }
}

/// Nucleotide-space programs report nucleotide coordinates already;
/// protein-space programs need each position expanded to its codon.
fn coordinate_multiplier(program: &str) -> u32 {
    match program.to_ascii_lowercase().as_str() {
        "blastn" | "blastx" | "tblastx" => 1,
        _ => 3,
    }
}

fn chop(id: &str, delimiter: Option<&str>) -> String {
    match delimiter {
        Some(d) if !d.is_empty() => match id.rfind(d) {
            Some(pos) => id[..pos].to_string(),
            None => id.to_string(),
        },
        _ => id.to_string(),
    }
}

/// Highest repetition count of any single interval value.
fn max_span_frequency(parts: &[Span]) -> usize {
    let mut counts: HashMap<Span, usize> = HashMap::new();
    for &part in parts {
        *counts.entry(part).or_insert(0) += 1;
    }
    counts.values().copied().max().unwrap_or(0)
}
