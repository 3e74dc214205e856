use serde::{Deserialize, Serialize};

pub mod halo_matcher;
pub mod reciprocal;
pub mod single;

// --- Parameters ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// Match A against B, then B against A. Each pass is parallel and
    /// write-free across halos.
    #[default]
    TwoPass,
    /// One scan over A that scores both directions per overlap, updating
    /// B's best-sets under per-halo locks.
    SinglePass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Candidates must lie in `[m / mass_offset, m * mass_offset]`.
    pub mass_offset: f64,
    /// Maximum MIC distance between halo centers.
    pub max_displacement: f64,
    /// A candidate must score strictly above this to be considered (percent).
    pub min_goodness: f64,
    /// Goodness values within this absolute distance of the best are tied.
    pub tie_tolerance: f64,
    pub strategy: MatchStrategy,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            mass_offset: 5.0,
            max_displacement: f64::INFINITY,
            min_goodness: 0.0,
            tie_tolerance: 0.1,
            strategy: MatchStrategy::TwoPass,
        }
    }
}

// --- Candidates ---

/// One tied-best match seen from a single halo's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Index into the opposite (mass-sorted) catalog.
    pub target: usize,
    /// Percentage of the reference halo's particles shared with the target.
    pub goodness: f64,
}

/// Running set of tied-best candidates.
///
/// After any sequence of offers the set holds exactly the candidates whose
/// goodness is above the floor and within `tolerance` of the maximum seen,
/// independent of offer order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BestSet {
    best: Option<f64>,
    candidates: Vec<Candidate>,
}

impl BestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, candidate: Candidate, floor: f64, tolerance: f64) {
        if candidate.goodness <= floor {
            return;
        }

        match self.best {
            None => {
                self.best = Some(candidate.goodness);
                self.candidates.push(candidate);
            }
            Some(best) if candidate.goodness > best + tolerance => {
                self.best = Some(candidate.goodness);
                self.candidates.clear();
                self.candidates.push(candidate);
            }
            Some(best) if candidate.goodness >= best - tolerance => {
                self.candidates.push(candidate);
                if candidate.goodness > best {
                    let g = candidate.goodness;
                    self.best = Some(g);
                    self.candidates.retain(|c| c.goodness >= g - tolerance);
                }
            }
            Some(_) => {}
        }
    }

    #[inline]
    pub fn best_goodness(&self) -> Option<f64> {
        self.best
    }

    /// Candidates ordered by target index.
    pub fn into_sorted(mut self) -> Vec<Candidate> {
        self.candidates.sort_by_key(|c| c.target);
        self.candidates
    }
}

// --- Results ---

/// Resolved match of one primary halo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedMatch {
    /// Index into the secondary catalog.
    pub secondary: usize,
    /// Mean of the two one-directional goodness scores.
    pub goodness: f64,
}

/// Final outcome: one optional match per primary halo, indexed like the
/// mass-sorted primary catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MatchTable {
    entries: Vec<Option<ResolvedMatch>>,
}

impl MatchTable {
    pub fn unmatched_of_len(len: usize) -> Self {
        Self {
            entries: vec![None; len],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, primary: usize) -> Option<&ResolvedMatch> {
        self.entries.get(primary).and_then(|e| e.as_ref())
    }

    pub(crate) fn set(&mut self, primary: usize, m: ResolvedMatch) {
        self.entries[primary] = Some(m);
    }

    pub fn matched_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    /// Primary indices without a match.
    pub fn unmatched(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.is_none().then_some(i))
            .collect()
    }

    /// `(primary index, match)` pairs in primary order.
    pub fn iter_matches(&self) -> impl Iterator<Item = (usize, &ResolvedMatch)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_ref().map(|m| (i, m)))
    }
}

// --- Events ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PrimaryToSecondary,
    SecondaryToPrimary,
    /// Both directions scored in one scan.
    Combined,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default)]
pub struct MatchStats {
    pub num_primary: usize,
    pub num_secondary: usize,
    pub primary_with_candidates: usize,
    pub secondary_with_candidates: usize,
    pub matched: usize,
    /// Matches that needed the distance tie-break.
    pub tie_broken: usize,
    pub elapsed_secs: f64,
}

/// Events emitted by the matcher for progress reporting.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    PassStarted { direction: Direction, total: usize },

    /// Halos processed so far in the current pass.
    Progress { direction: Direction, done: usize, total: usize },

    PassFinished { direction: Direction },

    /// Candidate tables were taken from a cache instead of a scan.
    CacheLoaded,

    /// Matcher has finished its run.
    Finished(MatchStats),
}
