//! Resource groups (spec §3): typed resources each vehicle may draw from a
//! shared pool, partitioned into classes that share identical per-dimension
//! attribute windows.

use crate::dimension::Interval;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceGroupId(pub usize);

/// Per-dimension attribute window a resource imposes on the vehicle start
/// and end cumuls.
#[derive(Debug, Clone, Copy)]
pub struct ResourceAttribute {
    pub start_domain: Interval,
    pub end_domain: Interval,
}

#[derive(Debug, Clone)]
pub struct Resource {
    pub id: ResourceId,
    /// dimension name -> attribute window.
    pub attributes: HashMap<String, ResourceAttribute>,
}

#[derive(Debug, Clone)]
pub struct ResourceGroup {
    pub id: ResourceGroupId,
    pub resources: Vec<Resource>,
}

impl ResourceGroup {
    /// Two resources share a class iff they have identical attributes
    /// across all dimensions (spec §3). Returns resource indices grouped by
    /// class, in first-seen order.
    pub fn classes(&self) -> Vec<Vec<usize>> {
        let mut classes: Vec<(Vec<(String, (i64, i64, i64, i64))>, Vec<usize>)> = Vec::new();
        for (idx, r) in self.resources.iter().enumerate() {
            let mut key: Vec<(String, (i64, i64, i64, i64))> = r
                .attributes
                .iter()
                .map(|(name, a)| {
                    (
                        name.clone(),
                        (a.start_domain.lo, a.start_domain.hi, a.end_domain.lo, a.end_domain.hi),
                    )
                })
                .collect();
            key.sort();
            if let Some((_, members)) = classes.iter_mut().find(|(k, _)| *k == key) {
                members.push(idx);
            } else {
                classes.push((key, vec![idx]));
            }
        }
        classes.into_iter().map(|(_, members)| members).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(id: usize, lo: i64, hi: i64) -> Resource {
        let mut attributes = HashMap::new();
        attributes.insert(
            "time".to_string(),
            ResourceAttribute { start_domain: Interval::new(lo, hi), end_domain: Interval::new(lo, hi) },
        );
        Resource { id: ResourceId(id), attributes }
    }

    #[test]
    fn identical_attribute_resources_share_a_class() {
        let group = ResourceGroup {
            id: ResourceGroupId(0),
            resources: vec![resource(0, 0, 5), resource(1, 0, 5), resource(2, 5, 10)],
        };
        let classes = group.classes();
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0], vec![0, 1]);
        assert_eq!(classes[1], vec![2]);
    }
}
