use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::core::domain::Catalog;
use crate::error::CacheError;
use crate::io::cache::{self, CandidateTables};
use crate::matcher::reciprocal;
use crate::matcher::single::{self, goodness};
use crate::matcher::{
    BestSet, Candidate, Direction, MatchEvent, MatchParams, MatchStats, MatchStrategy, MatchTable,
};

/// Everything a run produces. Only `table` is meant to outlive the engine;
/// the candidate tables are kept for caching and diagnostics.
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub primary_best: Vec<Vec<Candidate>>,
    pub secondary_best: Vec<Vec<Candidate>>,
    pub table: MatchTable,
    pub stats: MatchStats,
}

pub struct HaloMatcher {
    params: MatchParams,
}

impl HaloMatcher {
    pub fn new(params: MatchParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Full run: candidate scan in both directions, then reciprocal resolution.
    ///
    /// Both catalogs must be mass-sorted with footprints built. Identical
    /// inputs always give identical outcomes.
    pub fn run(
        &self,
        primary: &Catalog,
        secondary: &Catalog,
        tx: Option<Sender<MatchEvent>>,
    ) -> MatchOutcome {
        let start = Instant::now();
        let tables = self.find_candidates(primary, secondary, tx.as_ref());
        self.finish(primary, secondary, tables, start, tx.as_ref())
    }

    /// Runs only the candidate scan.
    pub fn find_candidates(
        &self,
        primary: &Catalog,
        secondary: &Catalog,
        tx: Option<&Sender<MatchEvent>>,
    ) -> CandidateTables {
        debug_assert!(primary.is_mass_sorted(), "primary catalog not mass-sorted");
        debug_assert!(secondary.is_mass_sorted(), "secondary catalog not mass-sorted");

        match self.params.strategy {
            MatchStrategy::TwoPass => {
                let primary_best =
                    self.scan(primary, secondary, Direction::PrimaryToSecondary, tx);
                let secondary_best =
                    self.scan(secondary, primary, Direction::SecondaryToPrimary, tx);
                CandidateTables {
                    primary_best,
                    secondary_best,
                }
            }
            MatchStrategy::SinglePass => self.scan_combined(primary, secondary, tx),
        }
    }

    /// Skips the scan: loads both candidate tables from a match cache and
    /// resolves them against the given catalogs.
    pub fn resolve_cached(
        &self,
        path: &Path,
        primary: &Catalog,
        secondary: &Catalog,
        tx: Option<Sender<MatchEvent>>,
    ) -> Result<MatchOutcome, CacheError> {
        let start = Instant::now();
        let tables = cache::load_matches(path)?;

        if tables.primary_best.len() != primary.len()
            || tables.secondary_best.len() != secondary.len()
        {
            return Err(CacheError::CatalogMismatch {
                expected_primary: primary.len(),
                expected_secondary: secondary.len(),
                found_primary: tables.primary_best.len(),
                found_secondary: tables.secondary_best.len(),
            });
        }

        log::info!("Loaded candidate tables from {}", path.display());
        send(tx.as_ref(), MatchEvent::CacheLoaded);
        Ok(self.finish(primary, secondary, tables, start, tx.as_ref()))
    }

    fn finish(
        &self,
        primary: &Catalog,
        secondary: &Catalog,
        tables: CandidateTables,
        start: Instant,
        tx: Option<&Sender<MatchEvent>>,
    ) -> MatchOutcome {
        let resolution = reciprocal::resolve(
            &tables.primary_best,
            &tables.secondary_best,
            primary,
            secondary,
        );

        let stats = MatchStats {
            num_primary: primary.len(),
            num_secondary: secondary.len(),
            primary_with_candidates: tables.primary_best.iter().filter(|c| !c.is_empty()).count(),
            secondary_with_candidates: tables.secondary_best.iter().filter(|c| !c.is_empty()).count(),
            matched: resolution.table.matched_count(),
            tie_broken: resolution.tie_broken,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        log::info!(
            "Matched {}/{} primary halos ({} by distance tie-break) in {:.2}s",
            stats.matched,
            stats.num_primary,
            stats.tie_broken,
            stats.elapsed_secs
        );
        send(tx, MatchEvent::Finished(stats.clone()));

        MatchOutcome {
            primary_best: tables.primary_best,
            secondary_best: tables.secondary_best,
            table: resolution.table,
            stats,
        }
    }

    /// One direction: tied-best candidates in `opposite` for every halo of
    /// `reference`.
    fn scan(
        &self,
        reference: &Catalog,
        opposite: &Catalog,
        direction: Direction,
        tx: Option<&Sender<MatchEvent>>,
    ) -> Vec<Vec<Candidate>> {
        let total = reference.len();
        log::info!("Scanning {} halos ({:?})", total, direction);
        send(tx, MatchEvent::PassStarted { direction, total });

        let progress = Progress::new(direction, total, tx);
        let best: Vec<Vec<Candidate>> = reference
            .halos
            .par_iter()
            .map(|h| {
                let found = single::match_single(h, opposite, &self.params);
                progress.tick();
                found
            })
            .collect();

        send(tx, MatchEvent::PassFinished { direction });
        best
    }

    /// Both directions from one merge per pair. The opposite side's best-sets
    /// are shared between workers, so each sits behind its own lock.
    ///
    /// Each direction admits a pair under that direction's own mass window
    /// and box, so the result equals the two-pass scan.
    fn scan_combined(
        &self,
        primary: &Catalog,
        secondary: &Catalog,
        tx: Option<&Sender<MatchEvent>>,
    ) -> CandidateTables {
        let direction = Direction::Combined;
        let total = primary.len();
        log::info!("Scanning {} halos in a single combined pass", total);
        send(tx, MatchEvent::PassStarted { direction, total });

        let p = &self.params;
        let own_box = primary.box_size();
        let opposite_sets: Vec<Mutex<BestSet>> =
            (0..secondary.len()).map(|_| Mutex::new(BestSet::new())).collect();
        let progress = Progress::new(direction, total, tx);

        let primary_best: Vec<Vec<Candidate>> = primary
            .halos
            .par_iter()
            .enumerate()
            .map(|(i, h)| {
                let mut best = BestSet::new();
                single::for_each_two_way_overlap(h, own_box, secondary, p, |k, ov, admission| {
                    if admission.forward {
                        let fwd = goodness(ov.common_a, h.num_particles);
                        best.offer(Candidate { target: k, goodness: fwd }, p.min_goodness, p.tie_tolerance);
                    }
                    if admission.backward {
                        let back = goodness(ov.common_b, secondary.halos[k].num_particles);
                        opposite_sets[k]
                            .lock()
                            .offer(Candidate { target: i, goodness: back }, p.min_goodness, p.tie_tolerance);
                    }
                });
                progress.tick();
                best.into_sorted()
            })
            .collect();

        // Offer order across workers is arbitrary; sorting restores determinism.
        let secondary_best = opposite_sets
            .into_iter()
            .map(|m| m.into_inner().into_sorted())
            .collect();

        send(tx, MatchEvent::PassFinished { direction });
        CandidateTables {
            primary_best,
            secondary_best,
        }
    }
}

#[inline]
fn send(tx: Option<&Sender<MatchEvent>>, event: MatchEvent) {
    if let Some(tx) = tx {
        let _ = tx.send(event);
    }
}

/// Percent-step progress reporting shared across rayon workers.
struct Progress<'a> {
    direction: Direction,
    total: usize,
    step: usize,
    done: AtomicUsize,
    tx: Option<&'a Sender<MatchEvent>>,
}

impl<'a> Progress<'a> {
    fn new(direction: Direction, total: usize, tx: Option<&'a Sender<MatchEvent>>) -> Self {
        Self {
            direction,
            total,
            step: (total / 100).max(1),
            done: AtomicUsize::new(0),
            tx,
        }
    }

    fn tick(&self) {
        if self.tx.is_none() {
            return;
        }
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.step == 0 || done == self.total {
            send(
                self.tx,
                MatchEvent::Progress {
                    direction: self.direction,
                    done,
                    total: self.total,
                },
            );
        }
    }
}
