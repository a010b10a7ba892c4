use glam::Vec3;

use crate::occluder::Occluder;

/// Squared distance used as the front-to-back sort key. NaN (a degenerate
/// occluder) sorts last so the order stays total.
#[inline]
pub fn sort_key(camera_pos: Vec3, center: Vec3) -> f32 {
    let d = (center - camera_pos).length_squared();
    if d.is_nan() {
        f32::INFINITY
    } else {
        d
    }
}

/// Fill `order` with occluder indices sorted by increasing squared distance
/// from `camera_pos` to each occluder's center. Ties are in no particular
/// order. Nothing is filtered; frustum rejection is the query's job.
pub fn sort_front_to_back(camera_pos: Vec3, occluders: &[Occluder], order: &mut Vec<usize>) {
    order.clear();
    order.extend(0..occluders.len());
    order.sort_unstable_by(|&a, &b| {
        sort_key(camera_pos, occluders[a].center())
            .total_cmp(&sort_key(camera_pos, occluders[b].center()))
    });
}
