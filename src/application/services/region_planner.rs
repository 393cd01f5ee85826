//! Region Planner
//!
//! Clusters motion boxes and non-stationary track estimates into
//! detector-sized crops, per spec.md §4.4. Grounded on
//! `original_source/frigate/video.py`'s `get_cluster_boundary`/
//! `get_cluster_candidates`/`get_cluster_region`, reimplemented directly on
//! `BoundingBox`/`Region` rather than raw tuples.

use crate::domain::value_objects::{BoundingBox, Region};

/// The axis-aligned rectangle (centered on `b`) within which another box
/// could sit and still fit into a legal region with `b` (spec.md §4.4).
fn cluster_boundary(b: &BoundingBox, min_region: i32) -> BoundingBox {
    let box_width = b.width() as f32;
    let box_height = b.height() as f32;
    let max_region_area = (box_width * box_height).abs() / 0.1;
    let max_region_size = (min_region as f32).max(max_region_area.sqrt());

    let (cx, cy) = b.center();
    let max_x_dist = (max_region_size - box_width / 2.0 * 1.1) as i32;
    let max_y_dist = (max_region_size - box_height / 2.0 * 1.1) as i32;

    BoundingBox::from_corners(cx - max_x_dist, cy - max_y_dist, cx + max_x_dist, cy + max_y_dist)
}

/// The union-bounding Region of a cluster of box indices, sized per
/// spec.md §4.4's "Region sizing" (1.2× multiplier, clipped to frame).
fn cluster_region(frame_width: i32, frame_height: i32, min_region: i32, cluster: &[usize], boxes: &[BoundingBox]) -> Region {
    let members: Vec<BoundingBox> = cluster.iter().map(|&i| boxes[i].clone()).collect();
    let union = BoundingBox::union_all(&members).expect("cluster must have at least one member");
    Region::from_box(&union, frame_width, frame_height, 1.2, min_region)
}

/// Greedily clusters `boxes` per spec.md §4.4, returning the set of unique
/// member-index clusters (deduplicated by sorted membership).
pub fn cluster_candidates(frame_width: i32, frame_height: i32, min_region: i32, boxes: &[BoundingBox]) -> Vec<Vec<usize>> {
    let mut used = vec![false; boxes.len()];
    let mut candidates: Vec<Vec<usize>> = Vec::new();

    for current_index in 0..boxes.len() {
        if used[current_index] {
            continue;
        }
        let mut cluster = vec![current_index];
        used[current_index] = true;
        let boundary = cluster_boundary(&boxes[current_index], min_region);

        for compare_index in 0..boxes.len() {
            if used[compare_index] {
                continue;
            }
            if !boxes[compare_index].is_inside(&boundary) {
                continue;
            }

            let mut potential = cluster.clone();
            potential.push(compare_index);
            let region = cluster_region(frame_width, frame_height, min_region, &potential, boxes);

            let mut should_cluster = true;
            if region.size() > min_region {
                for &member in &potential {
                    let member_area = boxes[member].area() as f32;
                    let region_area = (region.size() * region.size()) as f32;
                    if member_area / region_area < 0.05 {
                        should_cluster = false;
                        break;
                    }
                }
            }

            if should_cluster {
                cluster.push(compare_index);
                used[compare_index] = true;
            }
        }
        candidates.push(cluster);
    }

    let mut unique: Vec<Vec<usize>> = Vec::new();
    for mut c in candidates {
        c.sort_unstable();
        if !unique.contains(&c) {
            unique.push(c);
        }
    }
    unique
}

/// Plans the Region set for one frame: clusters `boxes` (motion boxes
/// union non-stationary track estimates) into square, detector-sized crops
/// (spec.md §4.4).
pub fn plan_regions(frame_width: i32, frame_height: i32, min_region: i32, boxes: &[BoundingBox]) -> Vec<Region> {
    cluster_candidates(frame_width, frame_height, min_region, boxes)
        .into_iter()
        .map(|cluster| cluster_region(frame_width, frame_height, min_region, &cluster, boxes))
        .collect()
}

/// The startup scan's 3×3 grid cell for `counter` in `0..9`, tiling the
/// frame left-to-right, top-to-bottom (spec.md §4.4/§8).
pub fn startup_scan_region(frame_width: i32, frame_height: i32, min_region: i32, counter: u32) -> Region {
    let col = (counter % 3) as i32;
    let row = (counter / 3) as i32;

    let y_min = (frame_height / 3) * col;
    let y_max = (frame_height / 3) + y_min;
    let x_min = (frame_width / 3) * row;
    let x_max = (frame_width / 3) + x_min;

    let source = BoundingBox::from_corners(x_min, y_min, x_max, y_max);
    Region::from_box(&source, frame_width, frame_height, 1.2, min_region)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_region() -> i32 {
        Region::min_side(320, 320)
    }

    #[test]
    fn single_box_yields_one_cluster_containing_it() {
        let boxes = vec![BoundingBox::new(100, 100, 100, 200)];
        let regions = plan_regions(1920, 1080, min_region(), &boxes);
        assert_eq!(regions.len(), 1);
        assert!(boxes[0].is_inside(regions[0].bbox()));
    }

    #[test]
    fn two_close_boxes_cluster_into_one_region() {
        // spec.md §8 scenario 3.
        let boxes = vec![
            BoundingBox::new(100, 100, 50, 50),
            BoundingBox::new(160, 160, 50, 50),
        ];
        let regions = plan_regions(1920, 1080, min_region(), &boxes);
        assert_eq!(regions.len(), 1);
        assert!(boxes[0].is_inside(regions[0].bbox()));
        assert!(boxes[1].is_inside(regions[0].bbox()));
    }

    #[test]
    fn far_apart_boxes_yield_separate_regions() {
        let boxes = vec![
            BoundingBox::new(10, 10, 40, 40),
            BoundingBox::new(1800, 1000, 40, 40),
        ];
        let regions = plan_regions(1920, 1080, min_region(), &boxes);
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn every_region_side_is_multiple_of_4_and_at_least_min_region() {
        let boxes = vec![
            BoundingBox::new(0, 0, 10, 10),
            BoundingBox::new(500, 500, 300, 300),
        ];
        let min = min_region();
        for region in plan_regions(1920, 1080, min, &boxes) {
            assert_eq!(region.size() % 4, 0);
            assert!(region.size() >= min);
        }
    }

    #[test]
    fn empty_boxes_plan_no_regions() {
        let regions = plan_regions(1920, 1080, min_region(), &[]);
        assert!(regions.is_empty());
    }

    #[test]
    fn startup_scan_covers_a_3x3_partition_over_nine_frames() {
        let min = min_region();
        let mut seen_cells = std::collections::HashSet::new();
        for counter in 0..9u32 {
            let region = startup_scan_region(1920, 1080, min, counter);
            assert_eq!(region.size() % 4, 0);
            assert!(region.size() >= min);
            seen_cells.insert((counter % 3, counter / 3));
        }
        assert_eq!(seen_cells.len(), 9);
    }
}
