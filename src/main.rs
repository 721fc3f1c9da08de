use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use blast_genome_gff::{AnnotateConfig, Annotator, GeneModelBuilder, HitReader, SubjectDb};

/// Convert tabular alignment output to genome-anchored GFF annotation.
///
/// Each accepted hit becomes one parent record plus one match_part
/// child per exon segment, written to stdout; all diagnostics go to
/// stderr.
#[derive(Parser, Debug)]
#[command(name = "blast2gff")]
#[command(author, version, about)]
struct Cli {
    /// Tabular alignment results (12 columns), can be .gz
    #[arg(long, short = 'b')]
    blast: PathBuf,

    /// Subject (database) sequences in FASTA format
    #[arg(long, short = 'd')]
    database: PathBuf,

    /// Query gene models in GFF/GTF format, can be .gz
    #[arg(long, short = 'g')]
    genes: PathBuf,

    /// Program label for output column 2
    #[arg(long, short = 'p', default_value = "BLASTX")]
    program: String,

    /// Feature type for output column 3, a sequence ontology term such
    /// as protein_match, nucleotide_match or EST_match
    #[arg(long = "type", short = 't', default_value = "protein_match")]
    feature_type: String,

    /// Optional delimiter for query names in the alignment table, cuts
    /// at the last occurrence
    #[arg(long = "blast-delimiter", short = 'D')]
    blast_delimiter: Option<String>,

    /// Optional delimiter for gene model identifiers, cuts at the last
    /// occurrence
    #[arg(long = "gff-delimiter", short = 'F')]
    gff_delimiter: Option<String>,

    /// Subject coverage cutoff for filtering
    #[arg(long = "coverage-cutoff", short = 'c', default_value_t = 0.1)]
    coverage_cutoff: f64,

    /// E-value cutoff
    #[arg(long = "evalue-cutoff", short = 'e', default_value_t = 1e-3)]
    evalue_cutoff: f64,

    /// Bitscore-per-length cutoff for filtering
    #[arg(long = "score-cutoff", short = 's', default_value_t = 0.1)]
    score_cutoff: f64,

    /// Most hits to keep per query
    #[arg(long = "max-targets", short = 'M', default_value_t = 10)]
    max_targets: u32,

    /// Gene models carry no transcript features; read identifier and
    /// strand from each exon
    #[arg(long = "no-genes", short = 'G')]
    no_genes: bool,

    /// Report the Target tag as percent of the subject length instead
    /// of subject coordinates
    #[arg(long = "percent-target", short = 'P')]
    percent_target: bool,

    /// Subject sequences carry swissprot db|accession|entry headers
    #[arg(long, short = 'S')]
    swissprot: bool,

    /// Add a Description attribute parsed from the subject headers
    #[arg(long = "add-description")]
    add_description: bool,

    /// Add an Accession attribute from the swissprot headers
    #[arg(long = "add-accession")]
    add_accession: bool,

    /// Normalise TransDecoder/AUGUSTUS cds identifiers
    #[arg(long, short = 'T')]
    transdecoder: bool,

    /// Use CDS features as exons
    #[arg(long = "cds-exons", short = 'x')]
    cds_exons: bool,

    /// Skip exon features when exon and CDS share a file
    #[arg(long = "skip-exons", short = 'K')]
    skip_exons: bool,

    /// Extra diagnostic output
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let subjects = SubjectDb::from_fasta(&cli.database, cli.swissprot, cli.add_description)
        .with_context(|| format!("reading subject sequences from {}", cli.database.display()))?;

    let (models, build_stats) = GeneModelBuilder::new()
        .cds_as_exons(cli.cds_exons)
        .skip_exons(cli.skip_exons)
        .transdecoder(cli.transdecoder)
        .no_gene_mode(cli.no_genes)
        .id_delimiter(cli.gff_delimiter)
        .build_from_path(&cli.genes)
        .with_context(|| format!("building gene models from {}", cli.genes.display()))?;
    eprint!("{build_stats}");

    let config = AnnotateConfig {
        program: cli.program,
        feature_type: cli.feature_type,
        coverage_cutoff: cli.coverage_cutoff,
        evalue_cutoff: cli.evalue_cutoff,
        score_cutoff: cli.score_cutoff,
        max_targets: cli.max_targets,
        query_delimiter: cli.blast_delimiter,
        percent_target: cli.percent_target,
        swissprot: cli.swissprot,
        add_accession: cli.add_accession,
    };
    let mut annotator = Annotator::new(config, &subjects, &models);

    let hits = HitReader::from_path(&cli.blast)?;
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    annotator
        .annotate(hits, &mut out)
        .with_context(|| format!("annotating hits from {}", cli.blast.display()))?;
    out.flush().context("flushing annotation output")?;

    eprint!("{}", annotator.stats());
    Ok(())
}
