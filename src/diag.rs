/// Counter-gated admission for one warning category.
///
/// Streams with a systematic problem (an identifier mismatch between
/// inputs, doubled exon/CDS features) would otherwise repeat the same
/// warning for every hit. The gate lets the first nine through, has the
/// tenth announce that further warnings are suppressed, and afterwards
/// only counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarnGate {
    seen: u64,
}

/// What to do with the warning that just occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Emit it.
    Open,
    /// Emit it, noting that later ones stay silent.
    Closing,
    /// Count it silently.
    Closed,
}

impl WarnGate {
    const LIMIT: u64 = 10;

    /// Record one occurrence and decide whether to emit it.
    pub fn admit(&mut self) -> Admission {
        self.seen += 1;
        if self.seen < Self::LIMIT {
            Admission::Open
        } else if self.seen == Self::LIMIT {
            Admission::Closing
        } else {
            Admission::Closed
        }
    }

    /// Total occurrences, emitted or not.
    pub fn seen(&self) -> u64 {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_nine_pass_then_the_gate_closes() {
        let mut gate = WarnGate::default();
        for _ in 0..9 {
            assert_eq!(gate.admit(), Admission::Open);
        }
        assert_eq!(gate.admit(), Admission::Closing);
        assert_eq!(gate.admit(), Admission::Closed);
        assert_eq!(gate.admit(), Admission::Closed);
        assert_eq!(gate.seen(), 12);
    }
}
