use pathway_flow::{DefinitionOptions, Graph, GraphAnalyzer, GraphDefinition, Position, StackEntry};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

fn mock_definition() -> Value {
    json!({
        "sections": {
            "simple": {
                "_control": { "initialNode": "first" },
                "first": { "name": "first", "_control": { "next": "second" } },
                "second": { "name": "second", "_control": { "next": "hasControlBlock" } },
                "hasControlBlock": { "name": "hasControlBlock", "_control": { "next": "noControlBlock" } },
                "noControlBlock": { "name": "noControlBlock" }
            },
            "branching": {
                "_control": { "initialNode": "truthyEntryCondition" },
                "truthyEntryCondition": {
                    "name": "truthy",
                    "_control": { "condition": "alwaysTrue", "next": "falsyEntryCondition" }
                },
                "falsyEntryCondition": {
                    "name": "falsy",
                    "_control": { "condition": "alwaysFalse", "next": "exitsToFirst" }
                },
                "exitsToFirst": {
                    "name": "branches-1",
                    "_control": {
                        "next": [
                            { "key": "first", "condition": "alwaysTrue" },
                            { "key": "second", "condition": "alwaysTrue" },
                            "default"
                        ]
                    }
                },
                "exitsToSecond": {
                    "name": "branches-2",
                    "_control": {
                        "next": [
                            { "key": "first", "condition": "alwaysFalse" },
                            { "key": "second", "condition": "alwaysTrue" },
                            "default"
                        ]
                    }
                },
                "exitsToDefault": {
                    "name": "branches-3",
                    "_control": {
                        "next": [
                            { "key": "first", "condition": "alwaysFalse" },
                            { "key": "second", "condition": "alwaysFalse" },
                            "default"
                        ]
                    }
                },
                "first": { "name": "first-but-last" }
            },
            "collections": {
                "_control": { "initialNode": "array" },
                "array": {
                    "name": "array",
                    "_control": { "collectionPath": "nestedIterables.array", "next": "object" }
                },
                "object": {
                    "name": "object",
                    "_control": { "collectionPath": "nestedIterables.object", "next": "arrayWithFilter" }
                },
                "arrayWithFilter": {
                    "name": "filtered array",
                    "_control": {
                        "collectionPath": "nestedIterables.array",
                        "collectionFilter": "notTwo",
                        "next": "objectWithFilter"
                    }
                },
                "objectWithFilter": {
                    "name": "filtered object",
                    "_control": {
                        "collectionPath": "nestedIterables.object",
                        "collectionFilter": "notTwo",
                        "next": "looper"
                    }
                },
                "looper": {
                    "name": "looper",
                    "_control": {
                        "initialNode": "loopStart",
                        "collectionPath": "nestedIterables.object",
                        "collectionFilter": "notTwo",
                        "next": "final"
                    },
                    "loopStart": { "name": "loop a", "_control": { "next": "loopMiddle" } },
                    "loopMiddle": { "name": "loop b", "_control": { "next": "loopEnd" } },
                    "loopEnd": { "name": "loop c" }
                },
                "final": { "name": "fin" }
            }
        },
        "sectionOrdering": ["simple", "branching", "collections"]
    })
}

fn application_data() -> Value {
    json!({
        "nestedIterables": {
            "array": ["one", "two", "three"],
            "object": { "one": 1, "two": 22, "three": 333 }
        }
    })
}

fn mock_graph() -> Graph {
    let definition =
        GraphDefinition::from_value(&mock_definition(), &DefinitionOptions::default()).unwrap();
    Graph::builder(definition)
        .filter("alwaysTrue", |_, _| true)
        .filter("alwaysFalse", |_, _| false)
        .collection_filter("notTwo", |_, entry| {
            *entry != json!(22) && *entry != json!("two")
        })
        .build()
}

fn name<'g>(position: &Position<'g>) -> &'g str {
    position
        .active_node()
        .and_then(|node| node.field("name"))
        .and_then(Value::as_str)
        .unwrap()
}

fn strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|key| key.to_string()).collect()
}

#[test]
fn test_collection_keys_for_unknown_nodes() {
    let graph = mock_graph();
    let state = application_data();
    assert_eq!(graph.collection_keys(&state, &[""]), None);
    assert_eq!(graph.collection_keys(&state, &["collections", "none"]), None);
}

#[test]
fn test_collection_keys_list_array_indices_and_object_keys() {
    let graph = mock_graph();
    let state = application_data();
    assert_eq!(
        graph.collection_keys(&state, &["collections", "array"]),
        Some(strings(&["0", "1", "2"]))
    );
    assert_eq!(
        graph.collection_keys(&state, &["collections", "object"]),
        Some(strings(&["one", "two", "three"]))
    );
}

#[test]
fn test_collection_filter_sees_every_entry() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let definition =
        GraphDefinition::from_value(&mock_definition(), &DefinitionOptions::default()).unwrap();
    let graph = Graph::builder(definition)
        .collection_filter("notTwo", move |_, entry| {
            recorder.lock().unwrap().push(entry.clone());
            *entry != json!(22) && *entry != json!("two")
        })
        .build();
    let state = application_data();

    assert_eq!(
        graph.collection_keys(&state, &["collections", "arrayWithFilter"]),
        Some(strings(&["0", "2"]))
    );
    assert_eq!(
        graph.collection_keys(&state, &["collections", "objectWithFilter"]),
        Some(strings(&["one", "three"]))
    );
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            json!("one"),
            json!("two"),
            json!("three"),
            json!(1),
            json!(22),
            json!(333)
        ]
    );
}

#[test]
fn test_create_position_assigns_collection_keys() {
    let graph = mock_graph();
    let state = application_data();
    let position = graph.create_position(
        &state,
        vec![StackEntry::new("collections"), StackEntry::new("array")],
    );
    let top = position.stack().last().unwrap();
    assert_eq!(top.active_key(), Some("0"));
    assert_eq!(top.collection_keys(), Some(&strings(&["0", "1", "2"])[..]));
}

#[test]
fn test_create_position_descends_to_leaf() {
    let graph = mock_graph();
    let state = application_data();
    let position = graph.create_position(&state, vec![StackEntry::new("simple")]);
    assert!(std::ptr::eq(
        position.active_node().unwrap(),
        graph.definition().node_at("simple.first").unwrap()
    ));
    assert_eq!(name(&position), "first");
}

#[test]
fn test_create_position_defaults_loop_keys_at_every_level() {
    let graph = mock_graph();
    let state = application_data();
    let position = graph.create_position(
        &state,
        vec![StackEntry::new("collections"), StackEntry::new("looper")],
    );
    assert_eq!(
        position.stack()[1].collection_keys(),
        Some(&strings(&["one", "three"])[..])
    );
    assert_eq!(position.stack()[1].active_key(), Some("one"));
    assert_eq!(name(&position), "loop a");
}

#[test]
fn test_create_position_keeps_supplied_active_key() {
    let graph = mock_graph();
    let state = application_data();
    let position = graph.create_position(
        &state,
        vec![
            StackEntry::new("collections"),
            StackEntry::new("looper")
                .with_collection_keys(strings(&["5", "3"]))
                .with_active_key("three"),
        ],
    );
    assert_eq!(
        position.stack()[1].collection_keys(),
        Some(&strings(&["one", "three"])[..])
    );
    assert_eq!(position.stack()[1].active_key(), Some("three"));
}

#[test]
fn test_create_position_keeps_unknown_active_key_and_restarts_loop() {
    let graph = mock_graph();
    let state = application_data();
    let position = graph.create_position(
        &state,
        vec![
            StackEntry::new("collections"),
            StackEntry::new("looper").with_active_key("5"),
            StackEntry::new("loopEnd"),
        ],
    );
    assert_eq!(
        position.stack()[1].collection_keys(),
        Some(&strings(&["one", "three"])[..])
    );
    assert_eq!(position.stack()[1].active_key(), Some("5"));
    assert_eq!(name(&position), "loop c");

    let next = graph.next_position(&state, &position);
    assert_eq!(next.stack()[1].active_key(), Some("one"));
    assert_eq!(name(&next), "loop a");
}

#[test]
fn test_create_position_from_url() {
    let graph = mock_graph();
    let state = application_data();
    let position = graph.create_position_from_url(&state, "simple/first");
    assert_eq!(name(&position), "first");

    let missing = graph.create_position_from_segments(&state, &["simple", "missing"]);
    assert_eq!(missing, Position::empty(&graph));
}

#[test]
fn test_next_node_name() {
    let graph = mock_graph();
    let state = application_data();
    let cases = [
        ("simple/first", Some("second")),
        ("branching/exitsToFirst", Some("first")),
        ("branching/exitsToSecond", Some("second")),
        ("branching/exitsToDefault", Some("default")),
        ("simple/noControlBlock", None),
    ];
    for (url, expected) in cases {
        let position = graph.create_position_from_url(&state, url);
        assert_eq!(graph.next_node_name(&state, &position), expected, "from {url}");
    }
}

#[test]
fn test_initial_position_is_first_node_of_first_section() {
    let graph = mock_graph();
    let position = graph.initial_position(&application_data());
    assert_eq!(
        position.stack(),
        &[StackEntry::new("simple"), StackEntry::new("first")]
    );
}

#[test]
fn test_next_position_skips_failing_entry_conditions() {
    let graph = mock_graph();
    let state = application_data();
    let start = graph.create_position_from_url(&state, "branching/truthyEntryCondition");
    assert_eq!(
        graph.next_node_name(&state, &start),
        Some("falsyEntryCondition")
    );
    let next = graph.next_position(&state, &start);
    assert_eq!(name(&next), "branches-1");
}

#[test]
fn test_next_position_ends_on_dangling_route() {
    let graph = mock_graph();
    let state = application_data();
    let start = graph.create_position_from_url(&state, "branching/exitsToDefault");
    assert_eq!(graph.next_node_name(&state, &start), Some("default"));
    assert!(graph.next_position(&state, &start).is_end());
}

#[test]
fn test_visit_sequence_steps_through_every_node() {
    let graph = mock_graph();
    let mut sequence = Vec::new();
    graph.visit_sequence(
        &application_data(),
        |position| {
            sequence.push(name(position).to_string());
            if let Some(key) = position.active_collection_key() {
                sequence.push(key.to_string());
            }
            false
        },
        None,
    );

    assert_eq!(
        sequence,
        vec![
            "first",
            "second",
            "hasControlBlock",
            "noControlBlock",
            "truthy",
            "branches-1",
            "first-but-last",
            "array",
            "0",
            "object",
            "one",
            "filtered array",
            "0",
            "filtered object",
            "one",
            // first pass through the loop
            "loop a",
            "one",
            "loop b",
            "one",
            "loop c",
            "one",
            // second pass
            "loop a",
            "three",
            "loop b",
            "three",
            "loop c",
            "three",
            "fin",
        ]
    );
}

#[test]
fn test_visit_sequence_stops_when_visitor_is_done() {
    let graph = mock_graph();
    let mut names = Vec::new();
    let visited = graph.visit_sequence(
        &application_data(),
        |position| {
            names.push(name(position).to_string());
            true
        },
        None,
    );
    assert_eq!(visited, 1);
    assert_eq!(names, vec!["first"]);
}

#[test]
fn test_visit_sequence_respects_control_key() {
    let definition = GraphDefinition::from_value(
        &json!({
            "sections": {
                "thing": {
                    "info": { "initialNode": "a" },
                    "a": { "name": "a", "info": { "next": "b" } },
                    "b": { "name": "b", "info": { "next": "missing" } },
                    "unreachable": {}
                }
            },
            "sectionOrdering": ["thing"],
            "controlKey": "info"
        }),
        &DefinitionOptions::default(),
    )
    .unwrap();
    let graph = Graph::new(definition);
    let names: Vec<&str> = graph
        .sequence(&application_data())
        .map(|position| name(&position))
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_sequence_is_deterministic_and_restartable() {
    let graph = mock_graph();
    let state = application_data();
    let first: Vec<String> = graph.sequence(&state).map(|p| p.to_url()).collect();
    let second: Vec<String> = graph.sequence(&state).map(|p| p.to_url()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 18);
    assert_eq!(graph.initial_position(&state), graph.initial_position(&state));
}

#[test]
fn test_skips_loops_over_empty_collections() {
    let graph = mock_graph();
    let empty = json!({ "nestedIterables": { "array": [], "object": { "two": 22 } } });
    let urls: Vec<String> = graph.sequence(&empty).map(|p| p.to_url()).collect();
    assert!(!urls.iter().any(|url| url.starts_with("collections/array")));
    assert!(!urls.iter().any(|url| url.contains("looper")));
    assert_eq!(urls.last().map(String::as_str), Some("collections/final"));
}

#[test]
fn test_absent_collection_is_visited_once_without_key() {
    let graph = mock_graph();
    let state = json!({});
    let looper: Vec<(String, Option<String>)> = graph
        .sequence(&state)
        .filter(|position| position.to_url().starts_with("collections/looper"))
        .map(|position| {
            let key = position.active_collection_key().map(str::to_owned);
            (position.to_url(), key)
        })
        .collect();
    assert_eq!(
        looper,
        vec![
            ("collections/looper//loopStart".to_string(), None),
            ("collections/looper//loopMiddle".to_string(), None),
            ("collections/looper//loopEnd".to_string(), None),
        ]
    );

    let last = graph.sequence(&state).last().unwrap();
    assert_eq!(last.to_url(), "collections/final");
}

fn nested_loops() -> Graph {
    let definition = GraphDefinition::from_value(
        &json!({
            "sections": {
                "s": {
                    "_control": { "initialNode": "outer" },
                    "outer": {
                        "_control": { "initialNode": "inner", "collectionPath": "groups", "next": "done" },
                        "inner": {
                            "_control": { "initialNode": "page", "collectionPath": "items" },
                            "page": {}
                        }
                    },
                    "done": {}
                }
            },
            "sectionOrdering": ["s"]
        }),
        &DefinitionOptions::default(),
    )
    .unwrap();
    Graph::new(definition)
}

#[test]
fn test_nested_loop_exhaustion_cascades_outward() {
    let graph = nested_loops();
    let state = json!({ "groups": ["g1", "g2"], "items": { "x": 1, "y": 2 } });
    let urls: Vec<String> = graph.sequence(&state).map(|p| p.to_url()).collect();
    assert_eq!(
        urls,
        vec![
            "s/outer/0/inner/x/page",
            "s/outer/0/inner/y/page",
            "s/outer/1/inner/x/page",
            "s/outer/1/inner/y/page",
            "s/done",
        ]
    );
}

#[test]
fn test_url_round_trip() {
    let graph = nested_loops();
    let state = json!({ "groups": ["g1", "g2"], "items": { "x": 1, "y": 2 } });
    for url in ["s/outer/1/inner/y/page", "s/done"] {
        let position = graph.create_position_from_url(&state, url);
        assert_eq!(position.to_url(), url);
        assert_eq!(position.to_string(), url);
    }
    let located = graph.create_position_from_url(&state, "/s/outer/1/inner/y/page?step=2#form");
    assert_eq!(located.all_collection_keys(), vec!["1", "y"]);
    assert_eq!(located.active_collection_key(), Some("y"));
    assert_eq!(located.section_key(), Some("s"));
}

fn household() -> Graph {
    let definition = GraphDefinition::from_json_str(
        include_str!("fixtures/household.json"),
        &DefinitionOptions::default(),
    )
    .unwrap();
    Graph::builder(definition)
        .filter("notResident", |state, _| state["isResident"] != json!("yes"))
        .filter("hasIncome", |state, position| {
            position
                .active_collection_key()
                .and_then(|key| state["householdMembers"].get(key))
                .and_then(|member| member.get("income"))
                .is_some()
        })
        .collection_filter("isApplying", |_, member| member["applying"] == json!(true))
        .build()
}

#[test]
fn test_household_loop_visits_filtered_members() {
    let graph = household();
    let state = json!({
        "isResident": "yes",
        "householdMembers": {
            "a": { "applying": true, "income": 100 },
            "b": { "applying": true },
            "c": { "applying": false, "income": 5 }
        }
    });
    let urls: Vec<String> = graph.sequence(&state).map(|p| p.to_url()).collect();
    assert_eq!(
        urls,
        vec![
            "screener/welcome",
            "screener/stateResidency",
            "user/profile",
            "household/householdMembers",
            "household/memberDetails/a/memberProfile",
            "household/memberDetails/a/memberIncome",
            "household/memberDetails/b/memberProfile",
            "expenses/expenses",
        ]
    );
}

#[test]
fn test_household_routes_non_residents() {
    let graph = household();
    let state = json!({ "isResident": "no" });
    let start = graph.create_position_from_url(&state, "screener/stateResidency");
    let next = graph.next_position(&state, &start);
    assert_eq!(next.to_url(), "screener/nonResident");
    assert_eq!(
        next.active_node().and_then(|node| node.field("component")),
        Some(&json!("NonResidentRedirect"))
    );
}

#[test]
fn test_household_definition_is_clean() {
    let graph = household();
    let report = GraphAnalyzer::new(graph.definition()).report(None, Some(graph.filters()));
    assert!(report.is_clean(), "{report:?}");
    assert!(report.unregistered_filters.is_empty());
}
