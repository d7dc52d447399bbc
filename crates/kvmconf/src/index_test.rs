// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn build(source: &str) -> Result<SymbolIndex> {
    let doc = ParsedDocument::from_hcl(source).expect("Should parse document");
    SymbolIndex::build(&doc)
}

#[rstest]
fn test_build_index() {
    let index = build(
        r#"
network "default" {}
network "isolated" {}
store "pool1" {}
vm "web1" {}
cluster "web" {}
variable "bridge" {}
"#,
    )
    .expect("Should build index");

    assert!(index.has_network("default"));
    assert!(index.has_network("isolated"));
    assert!(index.has_store("pool1"));
    assert!(!index.has_store("default"));
    assert!(index.has_vm("web1"));
    assert!(index.clusters.contains("web"));
    assert!(index.variables.contains("bridge"));
}

#[rstest]
fn test_empty_document_has_empty_index() {
    let index = build("").expect("Should build index");
    assert_eq!(index, SymbolIndex::default());
}

#[rstest]
#[case::network("network \"net0\" {}\nnetwork \"net0\" {}\n", ResourceKind::Network, "net0")]
#[case::store("store \"pool1\" {}\nstore \"pool1\" {}\n", ResourceKind::Store, "pool1")]
#[case::vm("vm \"web1\" {}\nvm \"web1\" {}\n", ResourceKind::Vm, "web1")]
#[case::cluster("cluster \"c\" {}\ncluster \"c\" {}\n", ResourceKind::Cluster, "c")]
#[case::variable("variable \"v\" {}\nvariable \"v\" {}\n", ResourceKind::Variable, "v")]
fn test_duplicate_names(
    #[case] source: &str,
    #[case] expected_kind: ResourceKind,
    #[case] expected_name: &str,
) {
    match build(source) {
        Err(Error::DuplicateName { kind, name }) => {
            assert_eq!(kind, expected_kind);
            assert_eq!(name, expected_name);
        }
        other => panic!("expected DuplicateName, got {other:?}"),
    }
}

#[rstest]
fn test_duplicate_detection_is_order_independent() {
    let forward = build("store \"a\" {}\nstore \"b\" {}\nstore \"a\" {}\n");
    let reverse = build("store \"a\" {}\nstore \"a\" {}\nstore \"b\" {}\n");

    for result in [forward, reverse] {
        assert!(matches!(
            result,
            Err(Error::DuplicateName { kind: ResourceKind::Store, ref name }) if name == "a"
        ));
    }
}

#[rstest]
fn test_same_name_across_kinds_is_allowed() {
    let index = build("network \"shared\" {}\nstore \"shared\" {}\n").expect("Should build index");
    assert!(index.has_network("shared"));
    assert!(index.has_store("shared"));
}

#[rstest]
#[case::network("network \"\" {}\n", ResourceKind::Network)]
#[case::store("store \"\" {}\n", ResourceKind::Store)]
fn test_empty_names(#[case] source: &str, #[case] expected_kind: ResourceKind) {
    match build(source) {
        Err(Error::EmptyName { kind }) => assert_eq!(kind, expected_kind),
        other => panic!("expected EmptyName, got {other:?}"),
    }
}

#[rstest]
fn test_networks_checked_before_stores() {
    let result = build("store \"s\" {}\nstore \"s\" {}\nnetwork \"n\" {}\nnetwork \"n\" {}\n");
    assert!(matches!(
        result,
        Err(Error::DuplicateName { kind: ResourceKind::Network, .. })
    ));
}
