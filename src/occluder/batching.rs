/// Surface-area-heuristic batch assignment
/// Quads are split top-down into spatially coherent groups, each baked into
/// one occluder with a tight bounding box
use super::Aabb;
use crate::error::{OcclusionError, Result};

/// Partition quad indices into at most `max_batches` groups of at most
/// `max_quads_per_batch` quads. `boxes[i]` is the bounding box of quad `i`.
pub fn generate_batches(
    boxes: &[Aabb],
    max_quads_per_batch: usize,
    max_batches: usize,
) -> Result<Vec<Vec<usize>>> {
    if boxes.is_empty() {
        return Ok(Vec::new());
    }

    let capacity_error = || OcclusionError::BatchCapacity {
        quads: boxes.len(),
        max_quads_per_batch,
        max_batches,
    };

    let max_quads_per_batch = max_quads_per_batch.max(1);
    if boxes.len() > max_quads_per_batch.saturating_mul(max_batches) {
        return Err(capacity_error());
    }

    let needed = |len: usize| len.div_ceil(max_quads_per_batch);
    let mut batches: Vec<Vec<usize>> = vec![(0..boxes.len()).collect()];
    // Fewest batches the current groups can still be split into
    let mut required = needed(boxes.len());

    // Split the largest group until every group fits.
    loop {
        let Some((largest, _)) = batches
            .iter()
            .enumerate()
            .filter(|(_, b)| b.len() > max_quads_per_batch)
            .max_by_key(|(_, b)| b.len())
        else {
            break;
        };

        if batches.len() >= max_batches {
            return Err(capacity_error());
        }

        let group = std::mem::take(&mut batches[largest]);
        let n = group.len();
        let (mut left, mut right) = split_sah(boxes, group);
        let after = required - needed(n) + needed(left.len()) + needed(right.len());
        if after > max_batches {
            // The cheapest split wastes batch slots; fall back to one that
            // fills whole batches on the left.
            left.append(&mut right);
            (left, right) = split_balanced(boxes, left, max_quads_per_batch);
        } else {
            required = after;
        }
        batches[largest] = left;
        batches.push(right);
    }

    log::debug!(
        "assigned {} quads to {} batches (largest {})",
        boxes.len(),
        batches.len(),
        batches.iter().map(Vec::len).max().unwrap_or(0)
    );

    Ok(batches)
}

/// Split one group in two, choosing the axis and position that minimise
/// `area(left) * |left| + area(right) * |right|`. Both halves are non-empty.
fn split_sah(boxes: &[Aabb], mut group: Vec<usize>) -> (Vec<usize>, Vec<usize>) {
    debug_assert!(group.len() >= 2);

    let n = group.len();
    let mut best: Option<(f32, usize, usize)> = None; // (cost, axis, split)
    let mut suffix_area = vec![0.0f32; n + 1];

    for axis in 0..3 {
        sort_by_centroid(boxes, &mut group, axis);

        let mut acc = Aabb::EMPTY;
        for i in (0..n).rev() {
            acc = acc.union(&boxes[group[i]]);
            suffix_area[i] = acc.surface_area();
        }

        let mut prefix = Aabb::EMPTY;
        for split in 1..n {
            prefix = prefix.union(&boxes[group[split - 1]]);
            let cost = prefix.surface_area() * split as f32
                + suffix_area[split] * (n - split) as f32;
            let better = match best {
                None => true,
                Some((c, _, s)) => {
                    let tolerance = c.abs() * 1e-5;
                    cost < c - tolerance
                        // Near-ties go to the more balanced split.
                        || (cost <= c + tolerance && split.abs_diff(n / 2) < s.abs_diff(n / 2))
                }
            };
            if better {
                best = Some((cost, axis, split));
            }
        }
    }

    let (_, axis, split) = best.unwrap_or((0.0, 0, n / 2));
    sort_by_centroid(boxes, &mut group, axis);
    let right = group.split_off(split);
    (group, right)
}

/// Split along the group's longest axis so the left half holds a whole
/// number of full batches. Keeps the minimum batch count of the group.
fn split_balanced(
    boxes: &[Aabb],
    mut group: Vec<usize>,
    max_quads_per_batch: usize,
) -> (Vec<usize>, Vec<usize>) {
    let n = group.len();
    debug_assert!(n > max_quads_per_batch);

    let extent = group
        .iter()
        .fold(Aabb::EMPTY, |acc, &q| acc.union(&boxes[q]))
        .extent();
    let axis = if extent.x >= extent.y && extent.x >= extent.z {
        0
    } else if extent.y >= extent.z {
        1
    } else {
        2
    };

    sort_by_centroid(boxes, &mut group, axis);
    let split = max_quads_per_batch * (n.div_ceil(max_quads_per_batch) / 2);
    let right = group.split_off(split);
    (group, right)
}

fn sort_by_centroid(boxes: &[Aabb], group: &mut [usize], axis: usize) {
    // Index as tie-break keeps the split deterministic.
    group.sort_unstable_by(|&a, &b| {
        boxes[a].center()[axis]
            .total_cmp(&boxes[b].center()[axis])
            .then(a.cmp(&b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn unit_box_at(x: f32, y: f32, z: f32) -> Aabb {
        let min = Vec3::new(x, y, z);
        Aabb::from_points([min, min + Vec3::ONE])
    }

    fn assert_partition(batches: &[Vec<usize>], count: usize) {
        let mut all: Vec<usize> = batches.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn small_input_stays_in_one_batch() {
        let boxes: Vec<Aabb> = (0..10).map(|i| unit_box_at(i as f32, 0.0, 0.0)).collect();
        let batches = generate_batches(&boxes, 512, 8).unwrap();
        assert_eq!(batches.len(), 1);
        assert_partition(&batches, 10);
    }

    #[test]
    fn two_distant_clusters_are_separated() {
        let mut boxes = Vec::new();
        for i in 0..8 {
            boxes.push(unit_box_at(i as f32 * 0.1, 0.0, 0.0));
            boxes.push(unit_box_at(1000.0 + i as f32 * 0.1, 0.0, 0.0));
        }

        let batches = generate_batches(&boxes, 8, 4).unwrap();
        assert_eq!(batches.len(), 2);
        assert_partition(&batches, boxes.len());

        for batch in &batches {
            let near_origin = batch[0] % 2 == 0;
            assert!(batch.iter().all(|&q| (q % 2 == 0) == near_origin));
        }
    }

    #[test]
    fn respects_batch_size_limit() {
        let boxes: Vec<Aabb> = (0..100)
            .map(|i| unit_box_at((i % 10) as f32 * 3.0, (i / 10) as f32 * 3.0, 0.0))
            .collect();
        let batches = generate_batches(&boxes, 16, 16).unwrap();

        assert!(batches.len() <= 16);
        assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= 16));
        assert_partition(&batches, 100);
    }

    #[test]
    fn reports_insufficient_capacity() {
        let boxes: Vec<Aabb> = (0..100).map(|i| unit_box_at(i as f32, 0.0, 0.0)).collect();
        assert!(matches!(
            generate_batches(&boxes, 10, 5),
            Err(OcclusionError::BatchCapacity { quads: 100, .. })
        ));
    }

    #[test]
    fn uses_every_batch_when_capacity_is_tight() {
        // Even SAH halving would need 4 batches of 3 here.
        let boxes: Vec<Aabb> = (0..12).map(|i| unit_box_at(i as f32, 0.0, 0.0)).collect();
        let batches = generate_batches(&boxes, 4, 3).unwrap();

        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 4));
        assert_partition(&batches, 12);
        for batch in &batches {
            let mut sorted = batch.clone();
            sorted.sort_unstable();
            assert_eq!(sorted[3] - sorted[0], 3, "batch {:?} is not contiguous", batch);
        }
    }

    #[test]
    fn identical_boxes_still_split() {
        let boxes = vec![unit_box_at(0.0, 0.0, 0.0); 20];
        let batches = generate_batches(&boxes, 8, 8).unwrap();
        assert!(batches.iter().all(|b| b.len() <= 8));
        assert_partition(&batches, 20);
    }

    #[test]
    fn empty_input_has_no_batches() {
        assert!(generate_batches(&[], 512, 8).unwrap().is_empty());
    }
}
