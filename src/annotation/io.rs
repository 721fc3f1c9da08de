use std::io::BufRead;

use crate::types::Strand;

/// A single parsed feature line from a GFF3/GTF annotation.
///
/// Coordinates are kept 1-based inclusive as written in columns 4 and 5;
/// the downstream projection arithmetic works in the same system.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub scaffold: String,     // column 1
    pub source: String,       // column 2
    pub feature_type: String, // column 3
    pub start: u32,           // column 4
    pub end: u32,             // column 5
    pub strand: Strand,       // column 7; '.' or '?' => Unknown
    pub attributes: String,   // column 9, unparsed
    /// 1-based count of non-comment lines, for error reporting.
    pub line_no: usize,
}

/// Identifiers pulled out of an attribute block.
///
/// When only one of the two could be extracted it stands in for the
/// other, so both fields are always populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureIds {
    pub id: String,
    pub parent: String,
}

/// Parsing errors for the annotation stream.
#[derive(Debug)]
pub enum ParseError {
    Io { path: String, source: std::io::Error },
    MalformedLine { line_no: usize, line: String },
    BadCoordinates { line_no: usize, line: String },
    MissingIdentifier { line_no: usize, line: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io { path, source } => {
                write!(f, "I/O error while reading '{}': {}", path, source)
            }
            ParseError::MalformedLine { line_no, line } => {
                write!(f, "malformed GFF/GTF line {}: {}", line_no, line)
            }
            ParseError::BadCoordinates { line_no, line } => {
                write!(f, "bad coordinates in line {}: {}", line_no, line)
            }
            ParseError::MissingIdentifier { line_no, line } => {
                write!(f, "cannot extract ID or Parent from line {}: {}", line_no, line)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Streaming reader for GFF3/GTF files.
///
/// - Skips blank lines.
/// - Counts comment lines starting with '#' without parsing them.
/// - Numbers data lines from 1, so errors can name the offending line.
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
    comment_lines: usize,
    data_lines: usize,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            comment_lines: 0,
            data_lines: 0,
        }
    }

    /// Comment lines seen so far.
    pub fn comment_lines(&self) -> usize {
        self.comment_lines
    }

    /// Data (non-comment, non-blank) lines seen so far.
    pub fn data_lines(&self) -> usize {
        self.data_lines
    }

    /// Read the next feature record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<FeatureRecord>, ParseError> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(e) => {
                    return Err(ParseError::Io {
                        path: "<reader>".to_string(),
                        source: e,
                    })
                }
            }

            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                self.comment_lines += 1;
                continue;
            }

            self.data_lines += 1;
            return parse_record_line(line, self.data_lines).map(Some);
        }
    }

    /// Iterator adapter over [`Self::next_record`].
    pub fn records(mut self) -> impl Iterator<Item = Result<FeatureRecord, ParseError>> {
        std::iter::from_fn(move || self.next_record().transpose())
    }
}

/// Parse a single non-comment line into a `FeatureRecord`.
///
/// Requires the nine standard columns; extra columns are tolerated.
pub fn parse_record_line(line: &str, line_no: usize) -> Result<FeatureRecord, ParseError> {
    // scaffold source feature start end score strand frame attributes
    let cols: Vec<&str> = line.split('\t').collect();
    if cols.len() < 9 {
        return Err(ParseError::MalformedLine {
            line_no,
            line: line.to_string(),
        });
    }

    let start: u32 = cols[3].parse().map_err(|_| ParseError::BadCoordinates {
        line_no,
        line: line.to_string(),
    })?;
    let end: u32 = cols[4].parse().map_err(|_| ParseError::BadCoordinates {
        line_no,
        line: line.to_string(),
    })?;
    if start == 0 || end == 0 || end < start {
        return Err(ParseError::BadCoordinates {
            line_no,
            line: line.to_string(),
        });
    }

    let strand = Strand::from_symbol(cols[6]).ok_or_else(|| ParseError::MalformedLine {
        line_no,
        line: line.to_string(),
    })?;

    Ok(FeatureRecord {
        scaffold: cols[0].to_string(),
        source: cols[1].to_string(),
        feature_type: cols[2].to_string(),
        start,
        end,
        strand,
        attributes: cols[8].to_string(),
        line_no,
    })
}

/// Extract the record identifier and parent identifier from an attribute
/// block, tolerating both attribute syntaxes:
///
/// - GFF3: `ID=value;Parent=value`
/// - GTF:  `transcript_id "value"; gene_id "value";`
///
/// The syntax is chosen per key by marker presence, so mixed blocks
/// resolve the same way the legacy converters did. A marker that is
/// present but yields no identifier, or a block with neither identifier,
/// is a fatal parse error naming the line.
pub fn extract_feature_ids(rec: &FeatureRecord) -> Result<FeatureIds, ParseError> {
    let attrs = rec.attributes.as_str();
    let missing = || ParseError::MissingIdentifier {
        line_no: rec.line_no,
        line: rec.attributes.clone(),
    };

    let id = if attrs.contains("ID") {
        Some(capture_after(attrs, "ID=").ok_or_else(missing)?)
    } else if attrs.contains("gene_id") {
        Some(capture_quoted(attrs, "transcript_id", true).ok_or_else(missing)?)
    } else {
        None
    };

    let parent = if attrs.contains("Parent") {
        Some(capture_after(attrs, "Parent=").ok_or_else(missing)?)
    } else if attrs.contains("gene_id") {
        Some(capture_quoted(attrs, "gene_id", false).ok_or_else(missing)?)
    } else {
        None
    };

    match (id, parent) {
        (Some(id), Some(parent)) => Ok(FeatureIds { id, parent }),
        (Some(id), None) => Ok(FeatureIds {
            parent: id.clone(),
            id,
        }),
        (None, Some(parent)) => Ok(FeatureIds {
            id: parent.clone(),
            parent,
        }),
        (None, None) => Err(missing()),
    }
}

/// Identifier charset: word characters plus '.', '|' and '-'.
fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '|' | '-')
}

fn take_id(s: &str) -> Option<&str> {
    let end = s.find(|c| !is_id_char(c)).unwrap_or(s.len());
    if end == 0 {
        None
    } else {
        Some(&s[..end])
    }
}

/// First `marker` occurrence followed by at least one identifier char.
fn capture_after(attrs: &str, marker: &str) -> Option<String> {
    for (pos, _) in attrs.match_indices(marker) {
        if let Some(id) = take_id(&attrs[pos + marker.len()..]) {
            return Some(id.to_string());
        }
    }
    None
}

/// First `key "value"` occurrence; `closed` additionally requires the
/// trailing `";` the GTF transcript_id form carries.
fn capture_quoted(attrs: &str, key: &str, closed: bool) -> Option<String> {
    let marker = format!("{key} \"");
    for (pos, _) in attrs.match_indices(&marker) {
        let rest = &attrs[pos + marker.len()..];
        let Some(id) = take_id(rest) else { continue };
        let after = &rest[id.len()..];
        let terminator = if closed { "\";" } else { "\"" };
        if after.starts_with(terminator) {
            return Some(id.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(attrs: &str) -> FeatureRecord {
        FeatureRecord {
            scaffold: "chr1".to_string(),
            source: "src".to_string(),
            feature_type: "exon".to_string(),
            start: 1,
            end: 10,
            strand: Strand::Plus,
            attributes: attrs.to_string(),
            line_no: 1,
        }
    }

    #[test]
    fn parse_gff3_line() {
        let line = "chr2\tsrc\texon\t5\t20\t.\t-\t.\tID=ex1;Parent=tx1";
        let rec = parse_record_line(line, 3).unwrap();

        assert_eq!(rec.scaffold, "chr2");
        assert_eq!(rec.feature_type, "exon");
        assert_eq!(rec.start, 5);
        assert_eq!(rec.end, 20);
        assert_eq!(rec.strand, Strand::Minus);
        assert_eq!(rec.line_no, 3);

        let ids = extract_feature_ids(&rec).unwrap();
        assert_eq!(ids.id, "ex1");
        assert_eq!(ids.parent, "tx1");
    }

    #[test]
    fn parse_gtf_line() {
        let line =
            "chr1\tsrc\texon\t101\t150\t.\t+\t.\tgene_id \"G1\"; transcript_id \"T1.2\"; exon_number \"1\";";
        let rec = parse_record_line(line, 1).unwrap();
        let ids = extract_feature_ids(&rec).unwrap();

        // GTF records key intervals by gene and locations by transcript.
        assert_eq!(ids.id, "T1.2");
        assert_eq!(ids.parent, "G1");
    }

    #[test]
    fn lone_identifier_stands_in_for_both() {
        let ids = extract_feature_ids(&record("ID=tx1")).unwrap();
        assert_eq!(ids.id, "tx1");
        assert_eq!(ids.parent, "tx1");

        let ids = extract_feature_ids(&record("Parent=tx1;Note=hello")).unwrap();
        assert_eq!(ids.id, "tx1");
        assert_eq!(ids.parent, "tx1");
    }

    #[test]
    fn identifier_can_contain_pipes_and_dots() {
        let ids = extract_feature_ids(&record("ID=cds.gene.123|m.1;Parent=gene.123|m.1")).unwrap();
        assert_eq!(ids.id, "cds.gene.123|m.1");
        assert_eq!(ids.parent, "gene.123|m.1");
    }

    #[test]
    fn missing_identifiers_are_fatal() {
        let err = extract_feature_ids(&record("Note=nothing useful")).unwrap_err();
        assert!(matches!(err, ParseError::MissingIdentifier { line_no: 1, .. }));

        // marker present but no extractable value
        let err = extract_feature_ids(&record("ID=;Parent=tx1")).unwrap_err();
        assert!(matches!(err, ParseError::MissingIdentifier { .. }));
    }

    #[test]
    fn later_marker_occurrence_can_satisfy_capture() {
        // the first "ID=" carries no value but a later occurrence does
        let ids = extract_feature_ids(&record("ID=;geneID=abc")).unwrap();
        assert_eq!(ids.id, "abc");
    }

    #[test]
    fn malformed_lines_are_rejected() {
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t1\t10", 1),
            Err(ParseError::MalformedLine { .. })
        ));
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t0\t10\t.\t+\t.\tID=a", 1),
            Err(ParseError::BadCoordinates { .. })
        ));
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t20\t10\t.\t+\t.\tID=a", 1),
            Err(ParseError::BadCoordinates { .. })
        ));
        assert!(matches!(
            parse_record_line("chr1\tsrc\texon\t1\t10\t.\tz\t.\tID=a", 1),
            Err(ParseError::MalformedLine { .. })
        ));
    }

    #[test]
    fn reader_skips_comments_and_blank_lines() {
        let data = "\
##gff-version 3
chr1\tsrc\texon\t1\t2\t.\t+\t.\tID=e1;Parent=t1

chr1\tsrc\texon\t3\t4\t.\t+\t.\tID=e2;Parent=t1
";
        let mut rdr = AnnotationReader::new(Cursor::new(data.as_bytes()));

        let first = rdr.next_record().unwrap().unwrap();
        assert_eq!(first.line_no, 1);
        assert_eq!(first.start, 1);

        let second = rdr.next_record().unwrap().unwrap();
        assert_eq!(second.line_no, 2);
        assert_eq!(second.start, 3);

        assert!(rdr.next_record().unwrap().is_none());
        assert_eq!(rdr.comment_lines(), 1);
        assert_eq!(rdr.data_lines(), 2);
    }
}
