//! Extra priority for edges whose endpoints carry many attribute values.
//!
//! A vertex on a seam has one quadric bucket per side of the seam. Merging
//! two such vertices keeps every distinct value alive, so edges touching
//! more distinct values are made more expensive.

use decimator_config::{AttributeSetting, GroupingPolicy};
use topology::VertexPair;

use super::SharedData;
use crate::quadric::Bucket;

/// Sum over used attribute channels of `extra_weight * (distinct - 2)`,
/// where `distinct` counts the values found in each endpoint's buckets.
pub(crate) fn extra_weight(shared: &SharedData, pair: VertexPair) -> f32 {
    let params = shared.params();
    let mut weight = 0.0;
    let mut offset = 0;
    for attribute in params.used_attributes.iter() {
        let components = attribute.components();
        if let Some(setting) = params.setting(attribute) {
            if setting.extra_weight != 0.0 {
                let distinct: usize = [pair.v0, pair.v1]
                    .into_iter()
                    .map(|v| distinct_values(shared.quadrics().buckets(v), offset, components, setting))
                    .sum();
                weight += setting.extra_weight * (distinct as f32 - 2.0);
            }
        }
        offset += components;
    }
    weight
}

/// Number of distinct values of the channel at `offset..offset + components`.
fn distinct_values(buckets: &[Bucket], offset: usize, components: usize, setting: &AttributeSetting) -> usize {
    let values = buckets
        .iter()
        .filter_map(|b| b.attributes.get(offset..offset + components));

    match setting.grouping {
        GroupingPolicy::Exact => {
            let mut seen: Vec<&[f32]> = Vec::new();
            for value in values {
                if !seen.contains(&value) {
                    seen.push(value);
                }
            }
            seen.len()
        }
        GroupingPolicy::Sampled { cell_size } => {
            let mut cells: Vec<(Vec<i64>, Vec<&[f32]>)> = Vec::new();
            let mut count = 0;
            for value in values {
                let key: Vec<i64> = value.iter().map(|v| (v / cell_size).floor() as i64).collect();
                let index = match cells.iter().position(|(k, _)| *k == key) {
                    Some(index) => index,
                    None => {
                        cells.push((key, Vec::new()));
                        cells.len() - 1
                    }
                };
                let members = &mut cells[index].1;
                let close = members
                    .iter()
                    .any(|m| sqr_distance(m, value) < setting.sqr_distance_threshold);
                if !close {
                    members.push(value);
                    count += 1;
                }
            }
            count
        }
    }
}

fn sqr_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadric::Quadric;

    fn buckets(values: &[[f32; 2]]) -> Vec<Bucket> {
        values
            .iter()
            .map(|v| Bucket {
                attributes: v.to_vec(),
                quadric: Quadric::zero(5),
            })
            .collect()
    }

    #[test]
    fn test_exact_grouping_counts_equal_values_once() {
        let setting = AttributeSetting::default();
        let b = buckets(&[[0.0, 0.0], [0.0, 0.0], [0.5, 0.0], [0.5, 0.0001]]);
        assert_eq!(distinct_values(&b, 0, 2, &setting), 3);
    }

    #[test]
    fn test_sampled_grouping_merges_close_values() {
        let setting = AttributeSetting {
            grouping: GroupingPolicy::Sampled { cell_size: 0.25 },
            sqr_distance_threshold: 0.003,
            ..Default::default()
        };
        let b = buckets(&[[0.1, 0.1], [0.11, 0.1], [0.9, 0.9], [0.1, 0.2]]);
        // [0.1, 0.2] shares the cell but lies 0.01 away in squared distance.
        assert_eq!(distinct_values(&b, 0, 2, &setting), 3);
    }

    #[test]
    fn test_channel_offset_selects_components() {
        let setting = AttributeSetting::default();
        let b = buckets(&[[1.0, 0.0], [2.0, 0.0]]);
        assert_eq!(distinct_values(&b, 1, 1, &setting), 1);
        assert_eq!(distinct_values(&b, 0, 1, &setting), 2);
        // Out of range channels count nothing.
        assert_eq!(distinct_values(&b, 2, 2, &setting), 0);
    }
}
