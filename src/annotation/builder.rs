use std::fmt;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::{info, warn};

use crate::annotation::io::{extract_feature_ids, AnnotationReader, ParseError};
use crate::model::ModelSet;
use crate::types::Span;

/// Feature types the builder understands; anything else is counted and
/// skipped without touching its attribute block.
const ALLOWED_FEATURES: [&str; 5] = ["gene", "mRNA", "transcript", "exon", "CDS"];

/// How the feature stream is turned into gene models.
#[derive(Debug, Clone, Default)]
pub struct ModelOptions {
    /// Use CDS features as exons.
    pub cds_as_exons: bool,
    /// Ignore exon features (when exon and CDS share a file).
    pub skip_exons: bool,
    /// Strip the `cds.` / `.cds` decorations TransDecoder and AUGUSTUS
    /// put on coding-region identifiers.
    pub transdecoder: bool,
    /// No transcript features in the input; read each exon's identifier
    /// and strand as the transcript's own.
    pub no_gene_mode: bool,
    /// Truncate identifiers at the last occurrence of this delimiter.
    pub id_delimiter: Option<String>,
}

/// Scalar counts from one build, for the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub data_lines: usize,
    pub comment_lines: usize,
    pub transcripts: usize,
    pub exons: usize,
    pub ignored_features: usize,
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "gene models: {} data lines, {} comment lines",
            self.data_lines, self.comment_lines
        )?;
        if self.ignored_features > 0 {
            writeln!(
                f,
                "gene models: ignored {} other feature types",
                self.ignored_features
            )?;
        }
        writeln!(
            f,
            "gene models: {} exons for {} inferred transcripts",
            self.exons, self.transcripts
        )
    }
}

/// High-level builder turning a GFF3/GTF feature stream into a
/// [`ModelSet`].
///
/// # Example
/// ```
/// use std::io::Cursor;
/// use blast_genome_gff::annotation::builder::GeneModelBuilder;
///
/// let gff = "\
/// chr1\tsrc\tmRNA\t50\t300\t.\t+\t.\tID=tx1;Parent=g1\n\
/// chr1\tsrc\texon\t50\t101\t.\t+\t.\tID=e1;Parent=tx1\n";
///
/// let (models, stats) = GeneModelBuilder::new()
///     .build_from_reader(Cursor::new(gff.as_bytes()))
///     .unwrap();
/// assert_eq!(models.len(), 1);
/// assert_eq!(stats.exons, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GeneModelBuilder {
    pub opts: ModelOptions,
}

impl GeneModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cds_as_exons(mut self, yes: bool) -> Self {
        self.opts.cds_as_exons = yes;
        self
    }

    pub fn skip_exons(mut self, yes: bool) -> Self {
        self.opts.skip_exons = yes;
        self
    }

    pub fn transdecoder(mut self, yes: bool) -> Self {
        self.opts.transdecoder = yes;
        self
    }

    pub fn no_gene_mode(mut self, yes: bool) -> Self {
        self.opts.no_gene_mode = yes;
        self
    }

    pub fn id_delimiter(mut self, delimiter: Option<String>) -> Self {
        self.opts.id_delimiter = delimiter;
        self
    }

    /// Build models from anything implementing `BufRead`.
    pub fn build_from_reader<R: BufRead>(
        &self,
        reader: R,
    ) -> Result<(ModelSet, BuildStats), ParseError> {
        if self.opts.skip_exons {
            info!("exon features will be ignored");
        }
        if self.opts.cds_as_exons {
            info!("CDS features will be used as exons");
        }
        if self.opts.no_gene_mode {
            info!("transcript identifier and strand will be read from each exon");
        }

        let mut models = ModelSet::new();
        let mut stats = BuildStats::default();
        let mut rdr = AnnotationReader::new(reader);

        while let Some(rec) = rdr.next_record()? {
            if !ALLOWED_FEATURES.contains(&rec.feature_type.as_str()) {
                stats.ignored_features += 1;
                continue;
            }

            let ids = extract_feature_ids(&rec)?;
            // the parent keeps its raw form; normalisation applies to
            // the record's own identifier only
            let parent = ids.parent;
            let mut id = ids.id;

            if self.opts.transdecoder {
                id = id.replace("cds.", "").replace(".cds", "");
            }
            if let Some(delim) = &self.opts.id_delimiter {
                if let Some(pos) = id.rfind(delim.as_str()) {
                    id.truncate(pos);
                }
            }

            match rec.feature_type.as_str() {
                "transcript" | "mRNA" => {
                    stats.transcripts += 1;
                    models.set_location(&id, &rec.scaffold, rec.strand);
                }
                "exon" if !self.opts.skip_exons => {
                    stats.exons += 1;
                    if self.opts.no_gene_mode {
                        models.set_location(&parent, &rec.scaffold, rec.strand);
                    }
                    models.add_exon(&parent, Span::new(rec.start, rec.end));
                }
                "CDS" if self.opts.cds_as_exons => {
                    stats.exons += 1;
                    if self.opts.no_gene_mode {
                        models.set_location(&parent, &rec.scaffold, rec.strand);
                    }
                    models.add_exon(&parent, Span::new(rec.start, rec.end));
                }
                // gene records and disabled exon/CDS variants carry no intervals
                _ => {}
            }
        }

        stats.data_lines = rdr.data_lines();
        stats.comment_lines = rdr.comment_lines();
        if stats.transcripts == 0 {
            stats.transcripts = models.located_count();
        }
        if stats.exons == 0 {
            warn!("no suitable exons counted; check the exon and CDS options");
        }

        Ok((models, stats))
    }

    /// Build models from a file path.
    ///
    /// A `.gz` extension selects gzip decoding; anything else is read as
    /// plain text.
    pub fn build_from_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(ModelSet, BuildStats), ParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ParseError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let is_gz = path.extension().map(|e| e == "gz").unwrap_or(false);

        if is_gz {
            let decoder = flate2::read::GzDecoder::new(file);
            self.build_from_reader(BufReader::new(decoder))
        } else {
            self.build_from_reader(BufReader::new(file))
        }
    }
}

// -------------------- tests --------------------
