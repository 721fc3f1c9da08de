use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use bio::io::fasta;
use log::{info, warn};

/// Subject sequence lengths and, optionally, display descriptions,
/// looked up by sequence identifier during hit filtering.
///
/// Lengths are keyed by the raw FASTA identifier as it appears in the
/// alignment table; descriptions are keyed by the swissprot entry name
/// when swissprot headers are in use.
#[derive(Debug, Clone, Default)]
pub struct SubjectDb {
    lengths: HashMap<String, usize>,
    descriptions: HashMap<String, String>,
}

impl SubjectDb {
    /// Scan a FASTA file into the lookup tables.
    pub fn from_fasta<P: AsRef<Path>>(
        path: P,
        swissprot: bool,
        with_descriptions: bool,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("open subject sequences {}", path.display()))?;
        let db = Self::from_reader(file, swissprot, with_descriptions)
            .with_context(|| format!("read subject sequences from {}", path.display()))?;
        info!("found {} subject sequences in {}", db.len(), path.display());
        Ok(db)
    }

    /// Scan FASTA records from any reader.
    pub fn from_reader<R: Read>(
        reader: R,
        swissprot: bool,
        with_descriptions: bool,
    ) -> Result<Self> {
        let mut db = SubjectDb::default();
        let mut unparsed_headers = 0usize;

        for rec in fasta::Reader::new(reader).records() {
            let rec = rec.context("read FASTA record")?;
            db.lengths.insert(rec.id().to_string(), rec.seq().len());

            if with_descriptions {
                let key = if swissprot {
                    let Some((_, entry)) = swissprot_fields(rec.id()) else {
                        anyhow::bail!(
                            "sequence id '{}' is not a swissprot db|accession|entry header",
                            rec.id()
                        );
                    };
                    entry.to_string()
                } else {
                    rec.id().to_string()
                };

                match rec.desc().and_then(swissprot_description) {
                    Some(desc) => {
                        db.descriptions.insert(key, desc);
                    }
                    None => unparsed_headers += 1,
                }
            }
        }

        if unparsed_headers > 0 {
            warn!(
                "{} headers had no ' OS=' organism marker and contribute no description",
                unparsed_headers
            );
        }
        Ok(db)
    }

    pub fn length(&self, id: &str) -> Option<usize> {
        self.lengths.get(id).copied()
    }

    pub fn description(&self, id: &str) -> Option<&str> {
        self.descriptions.get(id).map(|s| s.as_str())
    }

    /// Whether any descriptions were collected; the annotator only
    /// writes Description tags when this holds.
    pub fn has_descriptions(&self) -> bool {
        !self.descriptions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}

/// Split a swissprot-style `db|accession|entry` identifier into its
/// accession and entry name.
pub fn swissprot_fields(id: &str) -> Option<(&str, &str)> {
    let mut parts = id.split('|');
    parts.next()?;
    let accession = parts.next()?;
    let entry = parts.next()?;
    Some((accession, entry))
}

/// Pull the protein description out of a UniProt header tail (the text
/// after the identifier), i.e. everything before the ` OS=` organism
/// marker, cleaned of characters that clash with GFF attribute syntax.
///
/// `None` when the organism marker is absent.
pub fn swissprot_description(desc: &str) -> Option<String> {
    let head = &desc[..desc.rfind(" OS=")?];

    let mut out = head.replace("(Fragment)", "");
    out = out.replace("3'", "3-prime").replace("5'", "5-prime");
    out = out
        .replace("G(s)", "G_s")
        .replace("G(q)", "G_q")
        .replace("G(k)", "G_k");
    for tag in [" [GTP]", " [ubiquinone]", " [glutamine-hydrolyzing]"] {
        out = out.replace(tag, "");
    }
    for sym in ['(', ')', ','] {
        out = out.replace(sym, "_");
    }
    Some(out.replace('/', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn lengths_are_keyed_by_raw_id() {
        let fasta = ">sp|P12345|TPC2B_HUMAN Two pore channel protein 2B OS=Homo sapiens GN=TPC2B PE=1 SV=1\n\
                     MKTAYIAKQR\nQISFVKSHFS\n\
                     >plain_id some free text\nACGT\n";
        let db = SubjectDb::from_reader(Cursor::new(fasta.as_bytes()), false, false).unwrap();

        assert_eq!(db.len(), 2);
        assert_eq!(db.length("sp|P12345|TPC2B_HUMAN"), Some(20));
        assert_eq!(db.length("plain_id"), Some(4));
        assert_eq!(db.length("missing"), None);
        assert!(!db.has_descriptions());
    }

    #[test]
    fn swissprot_descriptions_are_keyed_by_entry_name() {
        let fasta = ">sp|P12345|TPC2B_HUMAN Two pore channel protein 2B OS=Homo sapiens GN=TPC2B PE=1 SV=1\n\
                     MKTAYIAKQR\n";
        let db = SubjectDb::from_reader(Cursor::new(fasta.as_bytes()), true, true).unwrap();

        assert_eq!(
            db.description("TPC2B_HUMAN"),
            Some("Two pore channel protein 2B")
        );
        assert!(db.has_descriptions());
    }

    #[test]
    fn header_without_organism_marker_contributes_no_description() {
        let fasta = ">sp|Q00001|NOOS_YEAST Mystery protein without a marker\nMKT\n";
        let db = SubjectDb::from_reader(Cursor::new(fasta.as_bytes()), true, true).unwrap();
        assert_eq!(db.description("NOOS_YEAST"), None);
        assert_eq!(db.length("sp|Q00001|NOOS_YEAST"), Some(3));
    }

    #[test]
    fn swissprot_field_split() {
        assert_eq!(
            swissprot_fields("sp|P0DI82|TPC2B_HUMAN"),
            Some(("P0DI82", "TPC2B_HUMAN"))
        );
        assert_eq!(swissprot_fields("no_pipes_here"), None);
    }

    #[test]
    fn description_cleanup_rules() {
        assert_eq!(
            swissprot_description("Acanthoscurrin-2 (Fragment) OS=Acanthoscurria gomesiana GN=acantho2 PE=1 SV=1"),
            Some("Acanthoscurrin-2 ".to_string())
        );
        assert_eq!(
            swissprot_description("Guanine nucleotide-binding protein G(s) subunit alpha OS=Homo sapiens"),
            Some("Guanine nucleotide-binding protein G_s subunit alpha".to_string())
        );
        assert_eq!(
            swissprot_description("NADH dehydrogenase [ubiquinone] flavoprotein 1, mitochondrial OS=Homo sapiens"),
            Some("NADH dehydrogenase flavoprotein 1_ mitochondrial".to_string())
        );
        assert_eq!(
            swissprot_description("5'-3' exoribonuclease 1 OS=Homo sapiens"),
            Some("5-prime-3-prime exoribonuclease 1".to_string())
        );
        assert_eq!(swissprot_description("no marker at all"), None);
    }
}
