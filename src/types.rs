use std::fmt;

/// Genomic strand as written in GFF column 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
}

impl Strand {
    /// Parse the strand column. `.` and `?` both mean "not given".
    pub fn from_symbol(s: &str) -> Option<Strand> {
        match s {
            "+" => Some(Strand::Plus),
            "-" => Some(Strand::Minus),
            "." | "?" => Some(Strand::Unknown),
            _ => None,
        }
    }

    /// The opposite strand, for reporting antisense matches.
    #[inline]
    pub fn flipped(self) -> Strand {
        match self {
            Strand::Plus => Strand::Minus,
            Strand::Minus => Strand::Plus,
            Strand::Unknown => Strand::Unknown,
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
            Strand::Unknown => '.',
        };
        write!(f, "{c}")
    }
}

/// A contiguous genomic interval.
/// Coordinates are 1-based inclusive, as in GFF columns 4 and 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a new span. Panics if start > end.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "Span requires start <= end");
        Self { start, end }
    }

    /// Number of bases covered, inclusive of both ends.
    #[inline]
    pub fn len(self) -> u32 {
        self.end - self.start + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strand_symbols_round_trip() {
        assert_eq!(Strand::from_symbol("+"), Some(Strand::Plus));
        assert_eq!(Strand::from_symbol("-"), Some(Strand::Minus));
        assert_eq!(Strand::from_symbol("."), Some(Strand::Unknown));
        assert_eq!(Strand::from_symbol("?"), Some(Strand::Unknown));
        assert_eq!(Strand::from_symbol("x"), None);

        assert_eq!(Strand::Plus.to_string(), "+");
        assert_eq!(Strand::Minus.to_string(), "-");
        assert_eq!(Strand::Unknown.to_string(), ".");
    }

    #[test]
    fn strand_flip() {
        assert_eq!(Strand::Plus.flipped(), Strand::Minus);
        assert_eq!(Strand::Minus.flipped(), Strand::Plus);
        assert_eq!(Strand::Unknown.flipped(), Strand::Unknown);
    }

    #[test]
    fn span_length_is_inclusive() {
        // bases 1 to 6 have length 6
        assert_eq!(Span::new(1, 6).len(), 6);
        assert_eq!(Span::new(50, 101).len(), 52);
        assert_eq!(Span::new(7, 7).len(), 1);
    }
}
