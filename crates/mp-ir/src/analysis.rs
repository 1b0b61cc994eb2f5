//! Song feature analysis: scans a Song to report which features are used.

use alloc::collections::BTreeSet;
use core::fmt;

use crate::pattern::Division;
use crate::period::note_name;
use crate::song::Song;

/// Summary of features used in a song.
pub struct SongFeatures {
    pub effects: BTreeSet<&'static str>,
    pub period_range: Option<(u16, u16)>,
    pub samples_used: BTreeSet<u8>,
    pub samples_with_data: usize,
    pub samples_with_loops: usize,
    pub total_notes: usize,
}

/// Analyze a song and return a summary of which features it uses.
///
/// Only patterns reachable from the sequence are scanned.
pub fn analyze(song: &Song) -> SongFeatures {
    let mut features = SongFeatures {
        effects: BTreeSet::new(),
        period_range: None,
        samples_used: BTreeSet::new(),
        samples_with_data: song.samples.iter().filter(|s| !s.is_empty()).count(),
        samples_with_loops: song.samples.iter().filter(|s| s.has_loop()).count(),
        total_notes: 0,
    };

    let played: BTreeSet<u8> = song.sequence.iter().copied().collect();
    for idx in played {
        if let Some(pattern) = song.patterns.get(idx as usize) {
            for division in &pattern.data {
                analyze_division(division, &mut features);
            }
        }
    }

    features
}

fn analyze_division(division: &Division, features: &mut SongFeatures) {
    if let Some(s) = division.sample {
        features.total_notes += 1;
        features.samples_used.insert(s);
    }

    if division.period > 0 {
        let p = division.period;
        features.period_range = Some(match features.period_range {
            Some((lo, hi)) => (lo.min(p), hi.max(p)),
            None => (p, p),
        });
    }

    let eff_name = division.effect.name();
    if eff_name != "None" {
        features.effects.insert(eff_name);
    }
}

impl fmt::Display for SongFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Notes:    {} triggered", self.total_notes)?;
        if let Some((lo, hi)) = self.period_range {
            // Low period is the high note.
            writeln!(
                f,
                "Range:    {} - {}",
                note_name(hi).unwrap_or("---"),
                note_name(lo).unwrap_or("---"),
            )?;
        }
        writeln!(
            f,
            "Samples:  {} used, {} with data, {} with loops",
            self.samples_used.len(),
            self.samples_with_data,
            self.samples_with_loops,
        )?;

        if self.effects.is_empty() {
            writeln!(f, "Effects:  (none)")?;
        } else {
            let effects: alloc::vec::Vec<&str> = self.effects.iter().copied().collect();
            writeln!(f, "Effects:  {}", effects.join(", "))?;
        }

        Ok(())
    }
}
