use std::collections::BTreeMap;

use engine::{minimal_diff, serialize_mutations, Property, SchedulerConfig};

fn props(pairs: &[(&str, &str)]) -> Vec<Property> {
    pairs.iter().map(|(k, v)| Property::new(*k, *v)).collect()
}

fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn two_queue_config() -> SchedulerConfig {
    let input = props(&[
        ("yarn.scheduler.capacity.root.queues", "a,b"),
        ("yarn.scheduler.capacity.root.a.capacity", "60"),
        ("yarn.scheduler.capacity.root.b.capacity", "40"),
    ]);
    SchedulerConfig::from_properties(&input, Default::default()).0
}

#[test]
fn deleting_one_queue_serializes_to_a_single_removal() {
    let mut config = two_queue_config();
    config.stage_delete_queue("root.b").unwrap();

    let batch = serialize_mutations(&config);
    assert_eq!(batch.remove_queues, vec!["root.b".to_string()]);
    assert!(batch.add_queues.is_empty());
    assert!(batch.update_queues.is_empty());
    assert!(batch.global_updates.is_empty());
}

#[test]
fn percentage_suffixes_are_stripped_on_the_way_out() {
    let mut config = two_queue_config();
    config
        .stage_update_queue("root.a", map(&[("capacity", "25%")]))
        .unwrap();
    config
        .stage_add_queue(
            "root.c",
            map(&[
                ("capacity", "2w"),
                ("maximum-capacity", "[memory=1024,vcores=1]"),
            ]),
        )
        .unwrap();

    let batch = serialize_mutations(&config);
    assert_eq!(
        batch.update_queues[0].params.get("capacity"),
        Some(&"25".to_string())
    );
    let added = &batch.add_queues[0].params;
    assert_eq!(added.get("capacity"), Some(&"2w".to_string()));
    assert_eq!(
        added.get("maximum-capacity"),
        Some(&"[memory=1024,vcores=1]".to_string())
    );
}

#[test]
fn updates_carry_only_the_staged_delta() {
    let mut config = two_queue_config();
    config
        .stage_update_queue("root.a", map(&[("state", "STOPPED")]))
        .unwrap();

    let batch = serialize_mutations(&config);
    assert_eq!(batch.update_queues.len(), 1);
    // `capacity` stays untouched even though the base holds one; the remote
    // system applies deltas onto its own stored base.
    assert_eq!(batch.update_queues[0].params, map(&[("state", "STOPPED")]));
}

#[test]
fn deleted_subtrees_are_emitted_once_at_the_top() {
    let input = props(&[
        ("yarn.scheduler.capacity.root.queues", "a"),
        ("yarn.scheduler.capacity.root.a.capacity", "100"),
        ("yarn.scheduler.capacity.root.a.queues", "x,y"),
        ("yarn.scheduler.capacity.root.a.x.capacity", "50"),
        ("yarn.scheduler.capacity.root.a.y.capacity", "50"),
    ]);
    let (mut config, _) = SchedulerConfig::from_properties(&input, Default::default());
    // A pending change under the doomed subtree must not leak out either.
    config
        .stage_update_queue("root.a.x", map(&[("capacity", "60")]))
        .unwrap();
    config.stage_delete_queue("root.a").unwrap();

    let batch = serialize_mutations(&config);
    assert_eq!(batch.remove_queues, vec!["root.a".to_string()]);
    assert!(batch.update_queues.is_empty());
}

#[test]
fn global_changes_land_in_their_own_bucket() {
    let mut config = two_queue_config();
    config
        .stage_global_update(map(&[(
            "yarn.scheduler.capacity.maximum-applications",
            "5000",
        )]))
        .unwrap();

    let batch = serialize_mutations(&config);
    assert_eq!(
        batch.global_updates,
        map(&[("yarn.scheduler.capacity.maximum-applications", "5000")])
    );
    assert!(batch.remove_queues.is_empty());
}

#[test]
fn a_clean_tree_serializes_to_an_empty_batch() {
    let config = two_queue_config();
    let batch = serialize_mutations(&config);
    assert!(batch.is_empty());
}

#[test]
fn form_edits_stage_as_a_minimal_diff() {
    let mut config = two_queue_config();

    // A form is populated from the effective view, edited, and the delta
    // staged; untouched keys never enter the overlay.
    let populated = config.effective_properties("root.a");
    let mut edited = populated.clone();
    edited.insert("capacity".to_string(), "65%".to_string());
    edited.insert("state".to_string(), "RUNNING".to_string());

    let delta = minimal_diff(&populated, &edited);
    assert_eq!(delta, map(&[("capacity", "65%"), ("state", "RUNNING")]));
    config.stage_update_queue("root.a", delta).unwrap();

    let batch = serialize_mutations(&config);
    assert_eq!(
        batch.update_queues[0].params,
        map(&[("capacity", "65"), ("state", "RUNNING")])
    );
}

#[test]
fn end_to_end_delete_scenario() {
    let input = props(&[
        ("yarn.scheduler.capacity.root.queues", "a,b"),
        ("yarn.scheduler.capacity.root.a.capacity", "60"),
        ("yarn.scheduler.capacity.root.b.capacity", "40"),
    ]);
    let (mut config, warnings) = SchedulerConfig::from_properties(&input, Default::default());
    assert!(warnings.is_empty());
    assert_eq!(config.live_paths(), vec!["root", "root.a", "root.b"]);

    config.stage_delete_queue("root.b").unwrap();
    assert_eq!(config.live_paths(), vec!["root", "root.a"]);
    assert!(config.effective_properties("root.b").is_empty());

    let batch = serialize_mutations(&config);
    let json = serde_json::to_value(&batch).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "removeQueues": ["root.b"],
            "addQueues": [],
            "updateQueues": [],
            "globalUpdates": {}
        })
    );
}
