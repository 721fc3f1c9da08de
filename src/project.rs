use crate::types::Span;

/// Genomic sub-intervals covering one transcript-space span.
///
/// `parts` are in consumption order: ascending genomic position for a
/// forward walk, descending for a reverse walk. `truncated` is set when
/// the exon list ran out before the requested length was covered; the
/// accumulated partial parts are still returned.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub parts: Vec<Span>,
    pub truncated: bool,
}

impl Projection {
    /// Min start and max end over all parts.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        let start = self.parts.iter().map(|s| s.start).min()?;
        let end = self.parts.iter().map(|s| s.end).max()?;
        Some((start, end))
    }

    /// Total bases covered by the parts.
    pub fn covered(&self) -> u64 {
        self.parts.iter().map(|s| u64::from(s.len())).sum()
    }
}

/// Split a flat transcript-space span across the exons of a gene model.
///
/// `offset` is the 1-based position of the span's first base counted
/// from the transcript 5' end, `length` its size in bases; both must be
/// at least 1. A reverse walk consumes each exon from its genomic-end
/// side, matching minus-strand transcription order.
///
/// Example: exons (50,101) (127,185) (212,300), offset 22, length 135,
/// forward gives (71,101) (127,185) (212,256); the first exon holds
/// bases 1..52, so base 22 lands at 50+22-1=71.
pub fn project(exons: &[Span], offset: u32, length: u32, reverse: bool) -> Projection {
    let mut parts = Vec::new();
    if exons.is_empty() {
        return Projection {
            parts,
            truncated: false,
        };
    }

    let mut ordered = exons.to_vec();
    if reverse {
        ordered.sort_by(|a, b| b.start.cmp(&a.start));
    } else {
        ordered.sort_by_key(|s| s.start);
    }

    // bases still to skip before the span's first base
    let mut to_start = offset;
    let mut remaining = length;

    for exon in &ordered {
        let exon_len = exon.len();

        // span starts in a later exon
        if to_start >= exon_len {
            to_start -= exon_len;
            continue;
        }

        if reverse {
            let start = exon.end + 1 - to_start;
            if start - exon.start + 1 >= remaining {
                // the rest of the span ends before the exon start
                parts.push(Span::new(start + 1 - remaining, start));
                return Projection {
                    parts,
                    truncated: false,
                };
            }
            parts.push(Span::new(exon.start, start));
            remaining -= start - exon.start + 1;
        } else {
            let start = exon.start - 1 + to_start;
            if exon.end - start + 1 >= remaining {
                // the rest of the span ends before the exon end
                parts.push(Span::new(start, start + remaining - 1));
                return Projection {
                    parts,
                    truncated: false,
                };
            }
            parts.push(Span::new(start, exon.end));
            remaining -= exon.end - start + 1;
        }

        // later exons are consumed from their first base
        to_start = 1;
    }

    Projection {
        parts,
        truncated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(pairs: &[(u32, u32)]) -> Vec<Span> {
        pairs.iter().map(|&(s, e)| Span::new(s, e)).collect()
    }

    #[test]
    fn forward_walk_splits_across_three_exons() {
        let exons = spans(&[(50, 101), (127, 185), (212, 300)]);
        let p = project(&exons, 22, 135, false);

        assert_eq!(p.parts, spans(&[(71, 101), (127, 185), (212, 256)]));
        assert!(!p.truncated);
        assert_eq!(p.covered(), 135);
        assert_eq!(p.bounds(), Some((71, 256)));
    }

    #[test]
    fn exon_order_in_input_does_not_matter() {
        let exons = spans(&[(212, 300), (50, 101), (127, 185)]);
        let p = project(&exons, 22, 135, false);
        assert_eq!(p.parts, spans(&[(71, 101), (127, 185), (212, 256)]));
    }

    #[test]
    fn single_exon_forward_and_reverse_are_mirrored() {
        let exon = spans(&[(100, 160)]);
        for len in [1u32, 7, 30, 61] {
            let fwd = project(&exon, 1, len, false);
            assert_eq!(fwd.parts, spans(&[(100, 100 + len - 1)]));
            assert!(!fwd.truncated);

            let rev = project(&exon, 1, len, true);
            assert_eq!(rev.parts, spans(&[(160 - len + 1, 160)]));
            assert!(!rev.truncated);
        }
    }

    #[test]
    fn reverse_walk_emits_descending_parts() {
        let exons = spans(&[(100, 150), (200, 250)]);
        let p = project(&exons, 1, 60, true);

        // second exon is consumed first, from its genomic-end side
        assert_eq!(p.parts, spans(&[(200, 250), (142, 150)]));
        assert!(!p.truncated);
        assert_eq!(p.covered(), 60);
        assert_eq!(p.bounds(), Some((142, 250)));
    }

    #[test]
    fn offset_skips_leading_exons() {
        let exons = spans(&[(10, 19), (30, 49)]);
        // exon one holds bases 1..10, so offset 15 lands 5 bases into exon two
        let p = project(&exons, 15, 4, false);
        assert_eq!(p.parts, spans(&[(34, 37)]));
    }

    #[test]
    fn reverse_offset_counts_from_the_far_end() {
        let exons = spans(&[(10, 19), (30, 49)]);
        // reverse base 3 is position 47 of the last exon
        let p = project(&exons, 3, 4, true);
        assert_eq!(p.parts, spans(&[(44, 47)]));
    }

    #[test]
    fn span_past_model_end_is_truncated_not_extended() {
        let exons = spans(&[(10, 19)]);
        let p = project(&exons, 5, 20, false);

        assert_eq!(p.parts, spans(&[(14, 19)]));
        assert!(p.truncated);
        assert_eq!(p.covered(), 6);
    }

    #[test]
    fn offset_past_model_end_yields_nothing() {
        let exons = spans(&[(10, 19), (30, 39)]);
        let p = project(&exons, 50, 5, false);

        assert!(p.parts.is_empty());
        assert!(p.truncated);
        assert_eq!(p.bounds(), None);
    }

    #[test]
    fn empty_exon_list_returns_immediately() {
        let p = project(&[], 1, 10, false);
        assert!(p.parts.is_empty());
        assert!(!p.truncated);
    }

    #[test]
    fn repeated_exons_are_consumed_twice() {
        // both exon and CDS counted: same interval listed twice
        let exons = spans(&[(10, 19), (10, 19)]);
        let p = project(&exons, 1, 20, false);
        assert_eq!(p.parts, spans(&[(10, 19), (10, 19)]));
        assert!(!p.truncated);
    }
}
