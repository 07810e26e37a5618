//! Grouping of judged items into aggregation units

use super::classify::{classify_label, Axis, MeasurementType, Role, SummaryTag};
use super::record::MeasurementItem;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Members of one group, shaped by its type
#[derive(Debug, Clone)]
pub enum GroupMembers<'a> {
    Scalar(Vec<&'a MeasurementItem>),
    Pair {
        x: Vec<&'a MeasurementItem>,
        y: Vec<&'a MeasurementItem>,
    },
    Array {
        points: BTreeMap<u64, Vec<&'a MeasurementItem>>,
        summaries: Vec<(SummaryTag, &'a MeasurementItem)>,
    },
}

/// One aggregation unit: a scalar item, a coordinate pair or an array
#[derive(Debug, Clone)]
pub struct MeasurementGroup<'a> {
    /// Item number of the first member
    pub no: String,
    /// Scalar label, or the stripped identifier for pairs and arrays
    pub group_id: String,
    pub members: GroupMembers<'a>,
}

/// An X and a Y measurement of the same coordinate taken from one file
#[derive(Debug, Clone, Copy)]
pub struct MatchedPair<'a> {
    pub source: &'a str,
    pub x: &'a MeasurementItem,
    pub y: &'a MeasurementItem,
}

impl<'a> MeasurementGroup<'a> {
    pub fn kind(&self) -> MeasurementType {
        match self.members {
            GroupMembers::Scalar(_) => MeasurementType::Scalar,
            GroupMembers::Pair { .. } => MeasurementType::CoordinatePair,
            GroupMembers::Array { .. } => MeasurementType::ArrayPoint,
        }
    }

    /// All member items in insertion order
    pub fn items(&self) -> Vec<&'a MeasurementItem> {
        match &self.members {
            GroupMembers::Scalar(items) => items.clone(),
            GroupMembers::Pair { x, y } => x.iter().chain(y.iter()).copied().collect(),
            GroupMembers::Array { points, summaries } => points
                .values()
                .flatten()
                .copied()
                .chain(summaries.iter().map(|(_, item)| *item))
                .collect(),
        }
    }

    /// X/Y members paired by source file. A file contributes a pair only when it
    /// has both axes; the first member per axis and file is used.
    pub fn matched_pairs(&self) -> Vec<MatchedPair<'a>> {
        let GroupMembers::Pair { x, y } = &self.members else {
            return Vec::new();
        };

        let mut y_by_source: HashMap<&str, &'a MeasurementItem> = HashMap::new();
        for item in y {
            y_by_source.entry(item.source()).or_insert(*item);
        }

        let mut seen = HashSet::new();
        x.iter()
            .copied()
            .filter(|item| seen.insert(item.source()))
            .filter_map(|item| {
                y_by_source.get(item.source()).map(|&y_item| MatchedPair {
                    source: item.source(),
                    x: item,
                    y: y_item,
                })
            })
            .collect()
    }
}

/// A member whose label classifies its identifier differently from the
/// group's established type
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationConflict {
    pub group_id: String,
    pub established: MeasurementType,
    pub conflicting: MeasurementType,
    pub label: String,
    pub source: String,
}

impl std::fmt::Display for ClassificationConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' in {} classifies '{}' as {} but the group is {}",
            self.label, self.source, self.group_id, self.conflicting, self.established
        )
    }
}

/// Groups of a record set plus the members that could not be placed
#[derive(Debug, Clone, Default)]
pub struct GroupSet<'a> {
    pub groups: Vec<MeasurementGroup<'a>>,
    pub conflicts: Vec<ClassificationConflict>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Scalar { no: String, label: String },
    Named(String),
}

/// Classify every item and collect groups in first-seen order
pub fn build_groups(items: &[MeasurementItem]) -> GroupSet<'_> {
    let mut set = GroupSet::default();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    // The first classified member of an identifier fixes its type
    let mut established: HashMap<String, MeasurementType> = HashMap::new();

    for item in items {
        let class = classify_label(item.project());
        let first_type = *established
            .entry(class.group_id.clone())
            .or_insert(class.kind);
        if first_type != class.kind {
            let conflict = ClassificationConflict {
                group_id: class.group_id.clone(),
                established: first_type,
                conflicting: class.kind,
                label: item.project().to_string(),
                source: item.source().to_string(),
            };
            tracing::warn!(%conflict, "classification conflict");
            set.conflicts.push(conflict);
            continue;
        }

        let key = match class.kind {
            MeasurementType::Scalar => GroupKey::Scalar {
                no: item.no().to_string(),
                label: class.group_id.clone(),
            },
            _ => GroupKey::Named(class.group_id.clone()),
        };

        let slot = *index.entry(key).or_insert_with(|| {
            let members = match class.kind {
                MeasurementType::Scalar => GroupMembers::Scalar(Vec::new()),
                MeasurementType::CoordinatePair => GroupMembers::Pair {
                    x: Vec::new(),
                    y: Vec::new(),
                },
                MeasurementType::ArrayPoint => GroupMembers::Array {
                    points: BTreeMap::new(),
                    summaries: Vec::new(),
                },
            };
            set.groups.push(MeasurementGroup {
                no: item.no().to_string(),
                group_id: class.group_id.clone(),
                members,
            });
            set.groups.len() - 1
        });

        match (&mut set.groups[slot].members, class.role) {
            (GroupMembers::Scalar(list), _) => list.push(item),
            (GroupMembers::Pair { x, .. }, Role::Axis(Axis::X)) => x.push(item),
            (GroupMembers::Pair { y, .. }, Role::Axis(Axis::Y)) => y.push(item),
            (GroupMembers::Array { points, .. }, Role::Index { index, .. }) => {
                points.entry(index).or_default().push(item)
            }
            (GroupMembers::Array { summaries, .. }, Role::Summary { tag, .. }) => {
                summaries.push((tag, item))
            }
            // Types are checked above, so roles always match their group shape
            _ => {}
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::record::RawRecord;

    fn item(no: &str, label: &str, measured: f64, source: &str) -> MeasurementItem {
        MeasurementItem::from_raw(
            RawRecord {
                no: no.to_string(),
                project: label.to_string(),
                measured: Some(measured),
                design: Some(10.0),
                upper: Some(0.1),
                lower: Some(-0.1),
                ..Default::default()
            },
            source,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_scalars_keyed_by_number_and_label() {
        let items = vec![
            item("1", "Length", 10.0, "a.csv"),
            item("1", "Length", 10.1, "b.csv"),
            item("2", "Length", 10.0, "a.csv"),
        ];
        let set = build_groups(&items);
        assert_eq!(set.groups.len(), 2);
        assert_eq!(set.groups[0].items().len(), 2);
        assert!(set.conflicts.is_empty());
    }

    #[test]
    fn test_pairs_grouped_across_item_numbers() {
        let items = vec![
            item("5", "Hole[X座標]", 10.0, "a.csv"),
            item("6", "Hole[Y座標]", 10.0, "a.csv"),
            item("5", "Hole[X座標]", 10.0, "b.csv"),
        ];
        let set = build_groups(&items);
        assert_eq!(set.groups.len(), 1);
        let group = &set.groups[0];
        assert_eq!(group.kind(), MeasurementType::CoordinatePair);
        assert_eq!(group.no, "5");

        // b.csv has no Y member, so only a.csv forms a pair
        let pairs = group.matched_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].source, "a.csv");
    }

    #[test]
    fn test_array_points_ordered_by_index() {
        let items = vec![
            item("9", "Flat[2]", 10.0, "a.csv"),
            item("8", "Flat[1]", 10.0, "a.csv"),
            item("10", "Flat[平均]", 10.0, "a.csv"),
        ];
        let set = build_groups(&items);
        assert_eq!(set.groups.len(), 1);
        let GroupMembers::Array { points, summaries } = &set.groups[0].members else {
            panic!("expected array group");
        };
        assert_eq!(points.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(summaries.len(), 1);
    }

    #[test]
    fn test_zero_padded_index_joins_its_point() {
        let items = vec![item("8", "Flat[01]", 10.0, "a.csv"), item("8", "Flat[1]", 10.1, "b.csv")];
        let set = build_groups(&items);
        assert_eq!(set.groups.len(), 1);
        let GroupMembers::Array { points, .. } = &set.groups[0].members else {
            panic!("expected array group");
        };
        assert_eq!(points.get(&1).map(Vec::len), Some(2));
    }

    #[test]
    fn test_conflicting_member_is_excluded_and_reported() {
        let items = vec![
            item("1", "Hole[X座標]", 10.0, "a.csv"),
            item("2", "Hole[3]", 10.0, "b.csv"),
            item("3", "Hole", 10.0, "c.csv"),
        ];
        let set = build_groups(&items);
        assert_eq!(set.groups.len(), 1);
        assert_eq!(set.conflicts.len(), 2);
        assert_eq!(set.conflicts[0].established, MeasurementType::CoordinatePair);
        assert_eq!(set.conflicts[0].conflicting, MeasurementType::ArrayPoint);
        assert_eq!(set.conflicts[1].conflicting, MeasurementType::Scalar);
        assert_eq!(set.conflicts[1].source, "c.csv");
    }
}
