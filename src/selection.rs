//! # Template Selection
//!
//! Weighted sampling over the templates eligible for a node: zone-local
//! templates compose additively with the global pool, difficulty bands
//! filter, and zero-weight templates are never drawn.

use crate::rooms::RoomKind;
use crate::template::RoomTemplate;
use crate::zones::Zone;
use crate::{WarrenError, WarrenResult};
use rand::rngs::StdRng;
use rand::Rng;
use std::sync::Arc;

/// Selects one template for `(room_type, zone, difficulty)` by weighted
/// sampling from the template-selection stream.
pub(crate) fn select_template<T: RoomKind>(
    room_type: &T,
    zone: Option<&Zone<T>>,
    difficulty: f64,
    globals: &[Arc<RoomTemplate<T>>],
    rng: &mut StdRng,
) -> WarrenResult<Arc<RoomTemplate<T>>> {
    let zone_templates = zone.map(|z| z.templates()).unwrap_or(&[]);
    let mut candidates: Vec<&Arc<RoomTemplate<T>>> = zone_templates
        .iter()
        .chain(globals.iter())
        .filter(|t| t.allows_room_type(room_type))
        .filter(|t| t.allows_difficulty(difficulty))
        .collect();
    candidates.sort_by(|a, b| a.id().cmp(b.id()));

    if candidates.is_empty() {
        return Err(WarrenError::InvalidConfiguration(format!(
            "template selector: no template accepts room type {room_type:?} \
             at difficulty {difficulty}"
        )));
    }
    if candidates.iter().all(|t| t.weight() == 0.0) {
        return Err(WarrenError::InvalidConfiguration(format!(
            "template selector: every candidate template for room type {room_type:?} \
             has weight 0"
        )));
    }
    candidates.retain(|t| t.weight() > 0.0);

    let total: f64 = candidates.iter().map(|t| t.weight()).sum();
    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for template in &candidates {
        cumulative += template.weight();
        if draw < cumulative {
            return Ok(Arc::clone(template));
        }
    }
    // Floating-point accumulation can leave the draw a hair past the last
    // cumulative bound.
    Ok(Arc::clone(
        candidates.last().expect("candidate list is non-empty"),
    ))
}
