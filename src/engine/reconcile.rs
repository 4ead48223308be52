//! Keyed enter/update/exit diffing, independent of what an element is.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Element lifecycle hooks for one keyed collection.
pub trait Lifecycle<K, D> {
    type Element;

    fn enter(&mut self, key: &K, datum: &D) -> Self::Element;
    fn update(&mut self, key: &K, element: &mut Self::Element, datum: &D);
    /// Must release everything the element holds; it is dropped afterwards.
    fn exit(&mut self, key: &K, element: Self::Element);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diff<K> {
    pub entered: Vec<K>,
    pub updated: Vec<K>,
    pub exited: Vec<K>,
}

impl<K> Default for Diff<K> {
    fn default() -> Self {
        Self {
            entered: Vec::new(),
            updated: Vec::new(),
            exited: Vec::new(),
        }
    }
}

impl<K> Diff<K> {
    pub fn is_unchanged(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty()
    }
}

/// Brings `elements` in line with `data`. Elements whose key survives are
/// updated in place, never rebuilt. Repeated keys in `data` after the first
/// are ignored. `exited` is sorted.
pub fn reconcile<K, D, L>(
    elements: &mut HashMap<K, L::Element>,
    data: impl IntoIterator<Item = (K, D)>,
    lifecycle: &mut L,
) -> Diff<K>
where
    K: Clone + Eq + Hash + Ord,
    L: Lifecycle<K, D>,
{
    let mut diff = Diff::default();
    let mut live = HashSet::new();

    for (key, datum) in data {
        if !live.insert(key.clone()) {
            continue;
        }

        match elements.get_mut(&key) {
            Some(element) => {
                lifecycle.update(&key, element, &datum);
                diff.updated.push(key);
            }
            None => {
                let element = lifecycle.enter(&key, &datum);
                elements.insert(key.clone(), element);
                diff.entered.push(key);
            }
        }
    }

    let mut stale = elements
        .keys()
        .filter(|key| !live.contains(*key))
        .cloned()
        .collect::<Vec<_>>();
    stale.sort();

    for key in stale {
        if let Some(element) = elements.remove(&key) {
            lifecycle.exit(&key, element);
        }
        diff.exited.push(key);
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Element {
        serial: u32,
        value: &'static str,
    }

    #[derive(Default)]
    struct Recorder {
        next_serial: u32,
        released: Vec<u32>,
    }

    impl Lifecycle<u32, &'static str> for Recorder {
        type Element = Element;

        fn enter(&mut self, _key: &u32, datum: &&'static str) -> Element {
            self.next_serial += 1;
            Element {
                serial: self.next_serial,
                value: *datum,
            }
        }

        fn update(&mut self, _key: &u32, element: &mut Element, datum: &&'static str) {
            element.value = *datum;
        }

        fn exit(&mut self, _key: &u32, element: Element) {
            self.released.push(element.serial);
        }
    }

    #[test]
    fn test_enter_update_exit() {
        let mut elements = HashMap::new();
        let mut recorder = Recorder::default();

        let first = reconcile(&mut elements, [(1, "a"), (2, "b"), (3, "c")], &mut recorder);
        assert_eq!(first.entered, vec![1, 2, 3]);
        assert!(first.updated.is_empty());

        let second = reconcile(&mut elements, [(2, "B"), (4, "d"), (3, "C")], &mut recorder);
        assert_eq!(second.entered, vec![4]);
        assert_eq!(second.updated, vec![2, 3]);
        assert_eq!(second.exited, vec![1]);
        assert_eq!(recorder.released, vec![1]);

        assert_eq!(elements[&2], Element { serial: 2, value: "B" });
        assert_eq!(elements[&4].serial, 4);
        assert!(!elements.contains_key(&1));
    }

    #[test]
    fn test_surviving_keys_are_never_recreated() {
        let mut elements = HashMap::new();
        let mut recorder = Recorder::default();
        reconcile(&mut elements, [(7, "x")], &mut recorder);

        for _ in 0..5 {
            let diff = reconcile(&mut elements, [(7, "x")], &mut recorder);
            assert!(diff.is_unchanged());
        }
        assert_eq!(elements[&7].serial, 1);
        assert_eq!(recorder.next_serial, 1);
    }

    #[test]
    fn test_duplicate_keys_keep_first_datum() {
        let mut elements = HashMap::new();
        let mut recorder = Recorder::default();
        let diff = reconcile(&mut elements, [(1, "first"), (1, "second")], &mut recorder);

        assert_eq!(diff.entered, vec![1]);
        assert_eq!(elements[&1].value, "first");
    }

    #[test]
    fn test_empty_data_exits_everything() {
        let mut elements = HashMap::new();
        let mut recorder = Recorder::default();
        reconcile(&mut elements, [(2, "b"), (1, "a")], &mut recorder);

        let diff = reconcile(&mut elements, std::iter::empty(), &mut recorder);

        assert_eq!(diff.exited, vec![1, 2]);
        assert!(elements.is_empty());
        assert_eq!(recorder.released.len(), 2);
    }
}
