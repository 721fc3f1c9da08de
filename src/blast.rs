use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;

/// One tabular alignment record (the standard 12-column layout).
///
/// Fields that only get echoed into the output are kept as the raw
/// input text, so emitted records reproduce the table exactly instead
/// of reformatting parsed numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    pub query_id: String,
    pub subject_id: String,
    pub percent_identity: f64,
    pub align_length: f64,
    pub mismatches: String,
    pub gap_opens: String,
    pub query_start: u32,
    pub query_end: u32,
    pub subject_start: String,
    pub subject_end: String,
    pub evalue: f64,
    pub evalue_raw: String,
    pub bitscore: f64,
    pub bitscore_raw: String,
}

/// Parsing errors for the alignment table.
#[derive(Debug)]
pub enum ParseError {
    Io { source: std::io::Error },
    MalformedLine { line_no: usize, line: String },
    BadNumber { line_no: usize, column: &'static str, value: String },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Io { source } => {
                write!(f, "I/O error while reading alignment table: {}", source)
            }
            ParseError::MalformedLine { line_no, line } => {
                write!(f, "alignment line {} has fewer than 12 columns: {}", line_no, line)
            }
            ParseError::BadNumber { line_no, column, value } => {
                write!(f, "alignment line {}: bad {} value '{}'", line_no, column, value)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io { source } => Some(source),
            _ => None,
        }
    }
}

impl HitRecord {
    /// Parse one data line. Extra trailing columns are tolerated.
    pub fn parse(line: &str, line_no: usize) -> Result<HitRecord, ParseError> {
        // qseqid sseqid pident length mismatch gapopen
        // qstart qend sstart send evalue bitscore
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            return Err(ParseError::MalformedLine {
                line_no,
                line: line.to_string(),
            });
        }

        let float = |column: &'static str, value: &str| -> Result<f64, ParseError> {
            value.parse().map_err(|_| ParseError::BadNumber {
                line_no,
                column,
                value: value.to_string(),
            })
        };
        let coord = |column: &'static str, value: &str| -> Result<u32, ParseError> {
            let n: u32 = value.parse().map_err(|_| ParseError::BadNumber {
                line_no,
                column,
                value: value.to_string(),
            })?;
            if n == 0 {
                return Err(ParseError::BadNumber {
                    line_no,
                    column,
                    value: value.to_string(),
                });
            }
            Ok(n)
        };

        Ok(HitRecord {
            query_id: cols[0].to_string(),
            subject_id: cols[1].to_string(),
            percent_identity: float("percent identity", cols[2])?,
            align_length: float("alignment length", cols[3])?,
            mismatches: cols[4].to_string(),
            gap_opens: cols[5].to_string(),
            query_start: coord("query start", cols[6])?,
            query_end: coord("query end", cols[7])?,
            subject_start: cols[8].to_string(),
            subject_end: cols[9].to_string(),
            evalue: float("e-value", cols[10])?,
            evalue_raw: cols[10].to_string(),
            bitscore: float("bitscore", cols[11])?,
            bitscore_raw: cols[11].to_string(),
        })
    }
}

/// Streaming reader over a tabular alignment file, skipping blank and
/// `#` comment lines and numbering data lines from 1.
pub struct HitReader<R: BufRead> {
    reader: R,
    buf: String,
    data_lines: usize,
}

impl HitReader<Box<dyn BufRead>> {
    /// Open a path, decoding gzip when the extension says so.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("open alignment table {}", path.display()))?;

        let is_gz = path.extension().map(|e| e == "gz").unwrap_or(false);

        let reader: Box<dyn BufRead> = if is_gz {
            Box::new(BufReader::new(flate2::read::GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };
        Ok(HitReader::new(reader))
    }
}

impl<R: BufRead> HitReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
            data_lines: 0,
        }
    }

    /// Data lines seen so far.
    pub fn data_lines(&self) -> usize {
        self.data_lines
    }

    /// Read the next alignment record, or `None` at end of input.
    pub fn next_record(&mut self) -> Result<Option<HitRecord>, ParseError> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(e) => return Err(ParseError::Io { source: e }),
            }

            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            self.data_lines += 1;
            return HitRecord::parse(line, self.data_lines).map(Some);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LINE: &str = "tx1\tsp|P12345|TPC2B_HUMAN\t95.1\t135\t3\t1\t22\t156\t1\t135\t1e-50\t200";

    #[test]
    fn parses_the_twelve_columns() {
        let hit = HitRecord::parse(LINE, 1).unwrap();

        assert_eq!(hit.query_id, "tx1");
        assert_eq!(hit.subject_id, "sp|P12345|TPC2B_HUMAN");
        assert_eq!(hit.percent_identity, 95.1);
        assert_eq!(hit.align_length, 135.0);
        assert_eq!(hit.mismatches, "3");
        assert_eq!(hit.gap_opens, "1");
        assert_eq!(hit.query_start, 22);
        assert_eq!(hit.query_end, 156);
        assert_eq!(hit.subject_start, "1");
        assert_eq!(hit.subject_end, "135");
        assert_eq!(hit.evalue, 1e-50);
        assert_eq!(hit.evalue_raw, "1e-50");
        assert_eq!(hit.bitscore, 200.0);
        assert_eq!(hit.bitscore_raw, "200");
    }

    #[test]
    fn short_and_unparsable_lines_are_fatal() {
        assert!(matches!(
            HitRecord::parse("q\ts\t90.0\t100", 7),
            Err(ParseError::MalformedLine { line_no: 7, .. })
        ));
        assert!(matches!(
            HitRecord::parse("q\ts\t90.0\tabc\t0\t0\t1\t50\t1\t50\t1e-9\t80", 1),
            Err(ParseError::BadNumber { column: "alignment length", .. })
        ));
        assert!(matches!(
            HitRecord::parse("q\ts\t90.0\t50\t0\t0\t0\t50\t1\t50\t1e-9\t80", 1),
            Err(ParseError::BadNumber { column: "query start", .. })
        ));
    }

    #[test]
    fn reader_skips_comments_and_counts_data_lines() {
        let data = format!("# fields: qseqid sseqid ...\n\n{LINE}\n{LINE}\n");
        let mut rdr = HitReader::new(Cursor::new(data.into_bytes()));

        assert!(rdr.next_record().unwrap().is_some());
        assert!(rdr.next_record().unwrap().is_some());
        assert!(rdr.next_record().unwrap().is_none());
        assert_eq!(rdr.data_lines(), 2);
    }
}
