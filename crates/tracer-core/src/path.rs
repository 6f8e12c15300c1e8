//! Ordered network path between a fixed source and destination.
//!
//! The path is an index-addressable sequence of [`NetworkElement`]s.
//! Positions are 1-based and computed on demand from the sequence order;
//! they are never stored on an element, so inserting a hop never requires
//! renumbering anything that was persisted.
//!
//! For `N` elements there are `N + 1` insertion points: point `k` is the gap
//! immediately before element `k`, and point `N + 1` is the gap just before
//! the destination.

use std::iter::{Enumerate, FusedIterator};
use std::slice;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{InfoSide, NetworkElement};

/// The ordered sequence of hops between two endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPath {
    #[serde(rename = "source_ip")]
    source: String,
    #[serde(rename = "destination_ip")]
    destination: String,
    #[serde(rename = "network_elements", default)]
    elements: Vec<NetworkElement>,
}

/// An addressable gap in the path where a new element may be inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertionPoint {
    /// 1-based position the new element would occupy.
    pub position: usize,
    /// Label of the hop on the source side of the gap.
    pub after: String,
    /// Label of the hop on the destination side of the gap.
    pub before: String,
}

impl NetworkPath {
    /// Create an empty path between two endpoints.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Result<Self> {
        let source = source.into().trim().to_string();
        let destination = destination.into().trim().to_string();

        if source.is_empty() {
            return Err(CoreError::InvalidEndpoint { which: "source" });
        }
        if destination.is_empty() {
            return Err(CoreError::InvalidEndpoint {
                which: "destination",
            });
        }

        Ok(Self {
            source,
            destination,
            elements: Vec::new(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All `N + 1` insertion points, ordered source to destination.
    pub fn insertion_points(&self) -> Vec<InsertionPoint> {
        (1..=self.elements.len() + 1)
            .map(|position| InsertionPoint {
                position,
                after: if position == 1 {
                    self.source.clone()
                } else {
                    self.elements[position - 2].name.clone()
                },
                before: match self.elements.get(position - 1) {
                    Some(element) => element.name.clone(),
                    None => self.destination.clone(),
                },
            })
            .collect()
    }

    /// Insert `element` immediately before `position`.
    ///
    /// Position `N + 1` appends just before the destination. Elements at or
    /// after `position` shift one place towards the destination.
    pub fn insert(&mut self, position: usize, element: NetworkElement) -> Result<()> {
        let max = self.elements.len() + 1;
        if !(1..=max).contains(&position) {
            return Err(CoreError::PositionOutOfRange {
                position,
                min: 1,
                max,
            });
        }
        self.elements.insert(position - 1, element);
        Ok(())
    }

    /// Append an element just before the destination.
    pub fn push(&mut self, element: NetworkElement) {
        self.elements.push(element);
    }

    /// Remove the element at `position`, closing the gap it leaves.
    pub fn remove(&mut self, position: usize) -> Result<NetworkElement> {
        let index = self.element_index(position)?;
        Ok(self.elements.remove(index))
    }

    pub fn element(&self, position: usize) -> Option<&NetworkElement> {
        position
            .checked_sub(1)
            .and_then(|index| self.elements.get(index))
    }

    pub fn element_mut(&mut self, position: usize) -> Option<&mut NetworkElement> {
        position
            .checked_sub(1)
            .and_then(|index| self.elements.get_mut(index))
    }

    /// Append an information entry to the element at `position`.
    pub fn add_entry(
        &mut self,
        position: usize,
        side: InfoSide,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let index = self.element_index(position)?;
        self.elements[index].add_entry(side, key, value)
    }

    /// Read-only traversal yielding `(position, element)` from source to
    /// destination. The iterator is `Clone`, so it can be restarted freely.
    pub fn sequence(&self) -> Sequence<'_> {
        Sequence {
            inner: self.elements.iter().enumerate(),
        }
    }

    fn element_index(&self, position: usize) -> Result<usize> {
        if position == 0 || position > self.elements.len() {
            return Err(CoreError::PositionOutOfRange {
                position,
                min: 1,
                max: self.elements.len(),
            });
        }
        Ok(position - 1)
    }
}

/// Iterator over `(position, element)` pairs of a [`NetworkPath`].
#[derive(Debug, Clone)]
pub struct Sequence<'a> {
    inner: Enumerate<slice::Iter<'a, NetworkElement>>,
}

impl<'a> Iterator for Sequence<'a> {
    type Item = (usize, &'a NetworkElement);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(index, element)| (index + 1, element))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Sequence<'_> {}

impl FusedIterator for Sequence<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ElementType, MovementType};

    fn hop(name: &str) -> NetworkElement {
        NetworkElement::new(ElementType::Router, name, MovementType::Direct).unwrap()
    }

    fn path_with(names: &[&str]) -> NetworkPath {
        let mut path = NetworkPath::new("192.168.1.100", "10.0.0.50").unwrap();
        for name in names {
            path.push(hop(name));
        }
        path
    }

    fn names(path: &NetworkPath) -> Vec<String> {
        path.sequence().map(|(_, e)| e.name.clone()).collect()
    }

    #[test]
    fn new_rejects_empty_endpoints() {
        assert!(matches!(
            NetworkPath::new("", "10.0.0.50"),
            Err(CoreError::InvalidEndpoint { which: "source" })
        ));
        assert!(matches!(
            NetworkPath::new("192.168.1.100", "  "),
            Err(CoreError::InvalidEndpoint {
                which: "destination"
            })
        ));
    }

    #[test]
    fn empty_path_has_single_insertion_point() {
        let path = path_with(&[]);
        let points = path.insertion_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, 1);
        assert_eq!(points[0].after, "192.168.1.100");
        assert_eq!(points[0].before, "10.0.0.50");
    }

    #[test]
    fn insertion_points_are_dense_and_labelled() {
        let path = path_with(&["fw", "sw"]);
        let points = path.insertion_points();
        let positions: Vec<usize> = points.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(points[1].after, "fw");
        assert_eq!(points[1].before, "sw");
        assert_eq!(points[2].after, "sw");
        assert_eq!(points[2].before, "10.0.0.50");
    }

    #[test]
    fn insert_at_every_position_shifts_later_elements() {
        let base = ["a", "b", "c"];
        for k in 1..=base.len() + 1 {
            let mut path = path_with(&base);
            path.insert(k, hop("new")).unwrap();

            let mut expected: Vec<String> = base.iter().map(|s| s.to_string()).collect();
            expected.insert(k - 1, "new".to_string());
            assert_eq!(names(&path), expected, "insert at {k}");
            assert_eq!(path.element(k).unwrap().name, "new");
        }
    }

    #[test]
    fn insert_between_known_hops() {
        let mut path = path_with(&["ASA-5525", "Catalyst-3850"]);
        path.insert(2, hop("squid-proxy")).unwrap();
        assert_eq!(names(&path), vec!["ASA-5525", "squid-proxy", "Catalyst-3850"]);
    }

    #[test]
    fn insert_out_of_range_is_rejected() {
        let mut path = path_with(&["a"]);
        assert!(matches!(
            path.insert(0, hop("x")),
            Err(CoreError::PositionOutOfRange { position: 0, max: 2, .. })
        ));
        assert!(matches!(
            path.insert(3, hop("x")),
            Err(CoreError::PositionOutOfRange { position: 3, max: 2, .. })
        ));
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn remove_keeps_positions_contiguous() {
        let mut path = path_with(&["a", "b", "c"]);
        let removed = path.remove(2).unwrap();
        assert_eq!(removed.name, "b");
        let positions: Vec<usize> = path.sequence().map(|(p, _)| p).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(names(&path), vec!["a", "c"]);
        assert!(path.remove(3).is_err());
    }

    #[test]
    fn sequence_is_restartable() {
        let path = path_with(&["a", "b"]);
        let seq = path.sequence();
        let first: Vec<usize> = seq.clone().map(|(p, _)| p).collect();
        let second: Vec<usize> = seq.map(|(p, _)| p).collect();
        assert_eq!(first, second);
        assert_eq!(path.sequence().len(), 2);
    }

    #[test]
    fn add_entry_targets_position() {
        let mut path = path_with(&["a", "b"]);
        path.add_entry(2, InfoSide::Destination, "VLAN", "100").unwrap();
        assert_eq!(path.element(2).unwrap().destination_info.get("VLAN"), Some("100"));
        assert!(path.add_entry(5, InfoSide::Source, "k", "v").is_err());
    }

    #[test]
    fn serializes_with_document_field_names() {
        let path = path_with(&["a"]);
        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json["source_ip"], "192.168.1.100");
        assert_eq!(json["destination_ip"], "10.0.0.50");
        assert_eq!(json["network_elements"][0]["name"], "a");
    }
}
