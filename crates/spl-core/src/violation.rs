//! Violation energy of a candidate position and its finite-difference descent direction.
//!
//! The energy only depends on the partner entities' mean positions, so callers build a
//! [`PartnerMeans`] snapshot once and evaluate many positions against it.

use crate::agent::PreyAgent;
use crate::config::DisplacementFrame;
use crate::constants::GRADIENT_EPSILON;
use crate::geometry;
use crate::index::{EntityId, RelationIndex, Side};

/// Negated relations are satisfied once the projection magnitude reaches this.
pub const NEGATION_MARGIN: f64 = 2.0;
/// Preferred projection for a non-negated relation.
pub const TARGET_PROJECTION: f64 = 0.5;
/// Projections past this are penalized as overshoot.
pub const MAX_PROJECTION: f64 = 2.0;
const WRONG_DIRECTION_PENALTY: f64 = 0.5;
const OVERSHOOT_SLOPE: f64 = 0.5;
const TARGET_SLOPE: f64 = 0.3;

/// Per-entity mean positions at one point of a step.
#[derive(Clone, Debug, Default)]
pub struct PartnerMeans {
    means: Vec<Option<Vec<f64>>>,
}

impl PartnerMeans {
    pub fn from_populations(populations: &[Vec<PreyAgent>], dims: usize) -> Self {
        let means = populations
            .iter()
            .map(|members| geometry::mean(members.iter().map(|p| p.position.as_slice()), dims))
            .collect();
        Self { means }
    }

    /// `None` when the entity has no live members.
    pub fn get(&self, entity: EntityId) -> Option<&[f64]> {
        self.means.get(entity).and_then(|m| m.as_deref())
    }

    pub fn len(&self) -> usize {
        self.means.len()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }
}

/// Cost of one relation given the scalar projection of the displacement.
pub fn relation_cost(projection: f64, negated: bool) -> f64 {
    if negated {
        return (NEGATION_MARGIN - projection.abs()).max(0.0);
    }
    if projection < 0.0 {
        projection.abs() + WRONG_DIRECTION_PENALTY
    } else if projection > MAX_PROJECTION {
        (projection - MAX_PROJECTION) * OVERSHOOT_SLOPE
    } else {
        (projection - TARGET_PROJECTION).abs() * TARGET_SLOPE
    }
}

/// Weighted average relation cost for `entity` placed at `position`.
///
/// Relations whose partner has no live members are skipped; an entity with no usable
/// relation has zero violation.
pub fn violation(
    entity: EntityId,
    position: &[f64],
    means: &PartnerMeans,
    index: &RelationIndex,
    frame: DisplacementFrame,
) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for inc in index.incident(entity) {
        let rel = index.relation(inc.relation);
        let partner = match inc.side {
            Side::Left => rel.right,
            Side::Right => rel.left,
        };
        let Some(partner_mean) = means.get(partner) else {
            continue;
        };

        // partner_mean - position, flipped for the right side in the oriented frame
        let sign = match (frame, inc.side) {
            (DisplacementFrame::Oriented, Side::Right) => -1.0,
            _ => 1.0,
        };
        let projection: f64 = sign
            * partner_mean
                .iter()
                .zip(position)
                .zip(rel.direction.iter())
                .map(|((m, p), d)| (m - p) * d)
                .sum::<f64>();

        total += relation_cost(projection, rel.negated) * rel.weight;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Unit direction of steepest estimated descent, via forward differences.
///
/// Returns the zero vector when the estimate vanishes (e.g. no relations).
pub fn improvement_direction(
    entity: EntityId,
    position: &[f64],
    means: &PartnerMeans,
    index: &RelationIndex,
    frame: DisplacementFrame,
) -> Vec<f64> {
    let base = violation(entity, position, means, index, frame);
    improvement_direction_from(base, entity, position, means, index, frame)
}

/// Same as [`improvement_direction`] when the violation at `position` is already known.
pub fn improvement_direction_from(
    base: f64,
    entity: EntityId,
    position: &[f64],
    means: &PartnerMeans,
    index: &RelationIndex,
    frame: DisplacementFrame,
) -> Vec<f64> {
    let mut probe = position.to_vec();
    let mut grad = vec![0.0; position.len()];
    for d in 0..position.len() {
        probe[d] = position[d] + GRADIENT_EPSILON;
        let shifted = violation(entity, &probe, means, index, frame);
        probe[d] = position[d];
        grad[d] = -(shifted - base) / GRADIENT_EPSILON;
    }
    geometry::normalize_in_place(&mut grad);
    grad
}
