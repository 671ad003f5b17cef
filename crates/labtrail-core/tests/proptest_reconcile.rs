use std::collections::{BTreeSet, HashSet};

use labtrail_core::assignees::AssigneeSetReconciler;
use labtrail_core::labels::{LabelCatalog, own_selection, resolve_labels};
use labtrail_core::model::LabelId;
use proptest::prelude::*;

use generators::*;

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(2000))]

    #[test]
    fn own_labels_appear_once_and_are_not_inherited(
        own in arb_assignments(),
        order in arb_assignments(),
    ) {
        let resolved = resolve_labels(&own, &order, &LabelCatalog::default());
        for assignment in &own {
            let hits: Vec<_> = resolved
                .iter()
                .filter(|entry| entry.label.id == assignment.label_id)
                .collect();
            prop_assert_eq!(hits.len(), 1);
            prop_assert!(!hits[0].inherited);
        }
    }

    #[test]
    fn order_only_labels_are_inherited(
        own in arb_assignments(),
        order in arb_assignments(),
    ) {
        let own_ids: HashSet<&LabelId> = own.iter().map(|a| &a.label_id).collect();
        let resolved = resolve_labels(&own, &order, &LabelCatalog::default());
        for assignment in order.iter().filter(|a| !own_ids.contains(&a.label_id)) {
            let hits: Vec<_> = resolved
                .iter()
                .filter(|entry| entry.label.id == assignment.label_id)
                .collect();
            prop_assert_eq!(hits.len(), 1);
            prop_assert!(hits[0].inherited);
        }
    }

    #[test]
    fn resolution_has_no_extra_ids_and_inherited_come_first(
        own in arb_assignments(),
        order in arb_assignments(),
    ) {
        let resolved = resolve_labels(&own, &order, &LabelCatalog::default());
        let sources: HashSet<&LabelId> =
            own.iter().chain(order.iter()).map(|a| &a.label_id).collect();
        let ids: HashSet<&LabelId> = resolved.iter().map(|entry| &entry.label.id).collect();
        prop_assert_eq!(ids.len(), resolved.len());
        prop_assert_eq!(ids, sources);

        let first_own = resolved.iter().position(|entry| !entry.inherited);
        if let Some(first_own) = first_own {
            prop_assert!(resolved[first_own..].iter().all(|entry| !entry.inherited));
        }
    }

    #[test]
    fn submitted_selection_never_contains_inherited_ids(
        own in arb_assignments(),
        order in arb_assignments(),
        selected in prop::collection::vec(arb_label_id(), 0..10),
    ) {
        let resolved = resolve_labels(&own, &order, &LabelCatalog::default());
        let submitted = own_selection(&resolved, &selected);
        let unique: HashSet<&LabelId> = submitted.iter().collect();
        prop_assert_eq!(unique.len(), submitted.len());
        for id in &submitted {
            prop_assert!(resolved
                .iter()
                .filter(|entry| entry.inherited)
                .all(|entry| &entry.label.id != id));
            prop_assert!(selected.contains(id));
        }
    }

    #[test]
    fn delta_transforms_persisted_into_selection(
        persisted in prop::collection::vec(arb_user_id(), 0..8),
        selection in prop::collection::vec(arb_user_id(), 0..8),
    ) {
        let reconciler = AssigneeSetReconciler::new(persisted.clone());
        let delta = reconciler.delta(&selection);

        let mut result: BTreeSet<_> = persisted.into_iter().collect();
        for id in &delta.added {
            prop_assert!(result.insert(id.clone()));
        }
        for id in &delta.removed {
            prop_assert!(result.remove(id));
        }
        let expected: BTreeSet<_> = selection.into_iter().collect();
        prop_assert_eq!(result, expected);

        let mut sorted = delta.added.clone();
        sorted.sort();
        prop_assert_eq!(sorted, delta.added);
    }
}
