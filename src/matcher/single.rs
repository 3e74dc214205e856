use std::cmp::Ordering;

use nalgebra::Vector3;

use crate::collections::find_first_ge;
use crate::core::domain::{Catalog, Halo};
use crate::core::spatial;
use crate::engine::footprint::{self, Overlap};
use crate::matcher::{BestSet, Candidate, MatchParams};

/// Percentage of `common` out of `num_particles`. A halo without particles
/// scores zero against everything.
#[inline]
pub fn goodness(common: u64, num_particles: usize) -> f64 {
    if num_particles == 0 {
        return 0.0;
    }
    (common as f64 / num_particles as f64 * 100.0).min(100.0)
}

fn compare_mass(halos: &[Halo], index: usize, target: &f64) -> Ordering {
    halos[index].mass.total_cmp(target)
}

/// Mass-window test exactly as the sorted scan applies it: inclusive on
/// both ends, bounds computed from the reference mass.
#[inline]
pub fn in_mass_window(reference_mass: f64, candidate_mass: f64, mass_offset: f64) -> bool {
    candidate_mass >= reference_mass / mass_offset && candidate_mass <= reference_mass * mass_offset
}

/// MIC displacement cut, measured in the box of the catalog being searched.
#[inline]
fn within_displacement(
    reference: &Halo,
    candidate: &Halo,
    box_size: &Vector3<f64>,
    params: &MatchParams,
) -> bool {
    let max_dist_sq = params.max_displacement * params.max_displacement;
    spatial::periodic_distance_sq(&reference.position, &candidate.position, box_size) <= max_dist_sq
}

/// Visits every non-placeholder halo of `opposite` with mass in
/// `[min_mass, max_mass]`. `opposite` must be mass-sorted.
fn for_each_in_mass_range<F>(opposite: &Catalog, min_mass: f64, max_mass: f64, mut visit: F)
where
    F: FnMut(usize, &Halo),
{
    let start = match find_first_ge(&min_mass, &opposite.halos, compare_mass) {
        Some(i) => i,
        None => return,
    };

    for (k, candidate) in opposite.halos.iter().enumerate().skip(start) {
        if candidate.mass > max_mass {
            break;
        }
        if !candidate.is_placeholder() {
            visit(k, candidate);
        }
    }
}

/// Walks every admissible candidate for `h` in `opposite` and hands its
/// footprint overlap to `visit`.
///
/// Admissible means: not a placeholder, mass inside
/// `[h.mass / mass_offset, h.mass * mass_offset]`, and MIC distance to `h`
/// no larger than `max_displacement`. `opposite` must be mass-sorted.
pub fn for_each_overlap<F>(h: &Halo, opposite: &Catalog, params: &MatchParams, mut visit: F)
where
    F: FnMut(usize, Overlap),
{
    if h.is_placeholder() {
        return;
    }

    let box_size = opposite.box_size();
    let (min_mass, max_mass) = (h.mass / params.mass_offset, h.mass * params.mass_offset);

    for_each_in_mass_range(opposite, min_mass, max_mass, |k, candidate| {
        if within_displacement(h, candidate, box_size, params) {
            visit(k, footprint::overlap(&h.footprint, &candidate.footprint));
        }
    });
}

/// Which directions admit a pair visited by [`for_each_two_way_overlap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// `h` as reference, the candidate as target.
    pub forward: bool,
    /// The candidate as reference, `h` as target.
    pub backward: bool,
}

/// Both-direction variant of [`for_each_overlap`] for a single scan.
///
/// Each pair is admitted per direction with the same tests the reference
/// side of that direction would apply on its own: the mass window is
/// computed from the reference mass and the displacement is measured in the
/// searched catalog's box (`own_box` for the backward direction). Pairs
/// admitted in neither direction are skipped.
pub fn for_each_two_way_overlap<F>(
    h: &Halo,
    own_box: &Vector3<f64>,
    opposite: &Catalog,
    params: &MatchParams,
    mut visit: F,
) where
    F: FnMut(usize, Overlap, Admission),
{
    if h.is_placeholder() {
        return;
    }

    // The backward window differs from the forward one only by rounding;
    // widen the scan so both are covered, then test each side exactly.
    let slack = 1.0e-9;
    let min_mass = h.mass / params.mass_offset * (1.0 - slack);
    let max_mass = h.mass * params.mass_offset * (1.0 + slack);
    let opposite_box = opposite.box_size();

    for_each_in_mass_range(opposite, min_mass, max_mass, |k, candidate| {
        let admission = Admission {
            forward: in_mass_window(h.mass, candidate.mass, params.mass_offset)
                && within_displacement(h, candidate, opposite_box, params),
            backward: in_mass_window(candidate.mass, h.mass, params.mass_offset)
                && within_displacement(candidate, h, own_box, params),
        };
        if admission.forward || admission.backward {
            visit(k, footprint::overlap(&h.footprint, &candidate.footprint), admission);
        }
    });
}

/// Tied-best candidates for one reference halo, ordered by target index.
///
/// An empty result means no candidate scored above `min_goodness` (or no
/// candidate fell inside the mass window at all).
pub fn match_single(h: &Halo, opposite: &Catalog, params: &MatchParams) -> Vec<Candidate> {
    let mut best = BestSet::new();
    for_each_overlap(h, opposite, params, |target, ov| {
        let g = goodness(ov.common_a, h.num_particles);
        best.offer(Candidate { target, goodness: g }, params.min_goodness, params.tie_tolerance);
    });
    best.into_sorted()
}
