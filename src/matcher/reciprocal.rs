use crate::core::domain::Catalog;
use crate::core::spatial;
use crate::matcher::{Candidate, MatchTable, ResolvedMatch};

/// A pair confirmed from both sides.
#[derive(Debug, Clone, Copy)]
struct MutualPair {
    secondary: usize,
    goodness: f64,
}

/// Result of the reciprocal pass.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub table: MatchTable,
    /// Number of primary halos whose match needed the distance tie-break.
    pub tie_broken: usize,
}

/// Accepts `i -> j` only when `j` is among `i`'s tied-best candidates and
/// `i` is among `j`'s.
///
/// - no mutual pair: `i` stays unmatched;
/// - one mutual pair: matched with the mean of both goodness scores;
/// - several: the candidate nearest to `i` under the periodic metric wins,
///   equal distances fall back to the lowest halo id, then lowest index.
///
/// `primary_best[i]` indexes into `secondary`, `secondary_best[j]` into
/// `primary`.
pub fn resolve(
    primary_best: &[Vec<Candidate>],
    secondary_best: &[Vec<Candidate>],
    primary: &Catalog,
    secondary: &Catalog,
) -> Resolution {
    let mut table = MatchTable::unmatched_of_len(primary_best.len());
    let mut tie_broken = 0;
    let mut mutual: Vec<MutualPair> = Vec::new();

    for (i, candidates) in primary_best.iter().enumerate() {
        mutual.clear();

        for fwd in candidates {
            let back = secondary_best
                .get(fwd.target)
                .and_then(|list| list.iter().find(|c| c.target == i));

            if let Some(back) = back {
                mutual.push(MutualPair {
                    secondary: fwd.target,
                    goodness: (fwd.goodness + back.goodness) / 2.0,
                });
            }
        }

        let chosen = match mutual.len() {
            0 => continue,
            1 => mutual[0],
            _ => {
                tie_broken += 1;
                match nearest(i, &mutual, primary, secondary) {
                    Some(pair) => pair,
                    None => continue,
                }
            }
        };

        table.set(
            i,
            ResolvedMatch {
                secondary: chosen.secondary,
                goodness: chosen.goodness,
            },
        );
    }

    Resolution { table, tie_broken }
}

fn nearest(
    i: usize,
    pairs: &[MutualPair],
    primary: &Catalog,
    secondary: &Catalog,
) -> Option<MutualPair> {
    let origin = primary.halos.get(i)?;
    let box_size = primary.box_size();

    let key = |p: &MutualPair| {
        let h = secondary.halos.get(p.secondary)?;
        let d = spatial::periodic_distance_sq(&origin.position, &h.position, box_size);
        Some((d, h.id.unwrap_or(i64::MAX), p.secondary))
    };

    pairs
        .iter()
        .filter_map(|p| key(p).map(|k| (k, *p)))
        .min_by(|(a, _), (b, _)| {
            a.0.total_cmp(&b.0)
                .then(a.1.cmp(&b.1))
                .then(a.2.cmp(&b.2))
        })
        .map(|(_, p)| p)
}
