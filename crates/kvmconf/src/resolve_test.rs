// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::catalog::MemoryCatalog;
use crate::namespace::build_namespace;

async fn resolve_with(source: &str, catalog: &MemoryCatalog) -> Result<ResolvedDocument> {
    let doc = ParsedDocument::from_hcl(source).expect("Should parse document");
    let index = SymbolIndex::build(&doc).expect("Should build index");
    let namespace = build_namespace(&doc, &index, catalog, &CancellationToken::new())
        .await
        .expect("Should build namespace");
    resolve(&doc, &index, &namespace)
}

async fn resolve_source(source: &str) -> Result<ResolvedDocument> {
    resolve_with(source, &MemoryCatalog::new()).await
}

fn assert_unknown_reference(
    result: Result<ResolvedDocument>,
    expected_owner: Owner,
    expected_field: Field,
    expected_value: &str,
) {
    match result {
        Err(Error::UnknownReference {
            owner,
            field,
            value,
        }) => {
            assert_eq!(owner, expected_owner);
            assert_eq!(field, expected_field);
            assert_eq!(value, expected_value);
        }
        other => panic!("expected UnknownReference, got {other:?}"),
    }
}

const BASE: &str = r#"
network "default" {}
store "pool1" {}
"#;

#[rstest]
#[tokio::test]
async fn test_resolve_literal_references() {
    let source = format!(
        "{BASE}\nvm \"web1\" {{\n  network = \"default\"\n  store   = \"pool1\"\n}}\n"
    );
    let resolved = resolve_source(&source).await.expect("Should resolve");

    let vm = resolved.vm("web1").expect("web1 should be resolved");
    assert_eq!(vm.network, "default");
    assert_eq!(vm.store, "pool1");
    assert_eq!(resolved.networks.len(), 1);
    assert_eq!(resolved.stores.len(), 1);
}

#[rstest]
#[tokio::test]
async fn test_unknown_network() {
    let source = format!(
        "{BASE}\nvm \"web2\" {{\n  network = \"ghost\"\n  store   = \"pool1\"\n}}\n"
    );
    let result = resolve_source(&source).await;

    if let Err(err) = &result {
        assert_eq!(err.to_string(), "vm.web2.network: unknown network \"ghost\"");
    }
    assert_unknown_reference(result, Owner::Vm("web2".into()), Field::Network, "ghost");
}

#[rstest]
#[tokio::test]
async fn test_unknown_store() {
    let source = format!(
        "{BASE}\nvm \"web1\" {{\n  network = \"default\"\n  store   = \"pool9\"\n}}\n"
    );
    let result = resolve_source(&source).await;
    assert_unknown_reference(result, Owner::Vm("web1".into()), Field::Store, "pool9");
}

#[rstest]
#[case::namespace_tables("network.default", "store.pool1")]
#[case::locals("local.net", "local.pool")]
#[case::template("\"${local.net}\"", "\"pool${local.index}\"")]
#[tokio::test]
async fn test_resolve_expressions(#[case] network: &str, #[case] store: &str) {
    let source = format!(
        r#"{BASE}
variable "bridge" {{
  default = "default"
}}

locals {{
  net   = var.bridge
  pool  = "pool1"
  index = 1
}}

vm "web1" {{
  network = {network}
  store   = {store}
}}
"#
    );
    let resolved = resolve_source(&source).await.expect("Should resolve");

    let vm = resolved.vm("web1").unwrap();
    assert_eq!(vm.network.as_str(), "default");
    assert_eq!(vm.store.as_str(), "pool1");
}

#[rstest]
#[tokio::test]
async fn test_resolve_data_references() {
    let catalog = MemoryCatalog::new()
        .with_network("ext0")
        .with_store("images");
    let source = r#"
data "network" "ext0" {}
data "store" "images" {}

vm "web1" {
  network = data.network.ext0
  store   = data.store.images
}

vm "web2" {
  network = "ext0"
  store   = "images"
}
"#;
    let resolved = resolve_with(source, &catalog).await.expect("Should resolve");

    for name in ["web1", "web2"] {
        let vm = resolved.vm(name).unwrap();
        assert_eq!(vm.network, "ext0");
        assert_eq!(vm.store, "images");
    }
    assert!(resolved.networks.is_empty());
    assert!(resolved.stores.is_empty());
}

#[rstest]
#[tokio::test]
async fn test_data_reference_kind_is_respected() {
    let catalog = MemoryCatalog::new().with_network("ext0");
    let source = r#"
data "network" "ext0" {}
network "default" {}

vm "web1" {
  network = "default"
  store   = "ext0"
}
"#;
    let result = resolve_with(source, &catalog).await;
    assert_unknown_reference(result, Owner::Vm("web1".into()), Field::Store, "ext0");
}

#[rstest]
#[tokio::test]
async fn test_store_name_is_not_a_network() {
    let source = format!(
        "{BASE}\nvm \"web1\" {{\n  network = store.pool1\n  store   = store.pool1\n}}\n"
    );
    let result = resolve_source(&source).await;
    assert_unknown_reference(result, Owner::Vm("web1".into()), Field::Network, "pool1");
}

#[rstest]
#[case::missing_network("store = \"pool1\"", Field::Network)]
#[case::missing_store("network = \"default\"", Field::Store)]
#[tokio::test]
async fn test_missing_attribute(#[case] body: &str, #[case] expected: Field) {
    let source = format!("{BASE}\nvm \"web1\" {{\n  {body}\n}}\n");
    match resolve_source(&source).await {
        Err(Error::MissingAttribute { owner, field }) => {
            assert_eq!(owner, Owner::Vm("web1".into()));
            assert_eq!(field, expected);
        }
        other => panic!("expected MissingAttribute, got {other:?}"),
    }
}

#[rstest]
#[case::number("42")]
#[case::list("[\"default\"]")]
#[case::object("{ name = \"default\" }")]
#[case::boolean("true")]
#[tokio::test]
async fn test_reference_must_be_string(#[case] network: &str) {
    let source = format!(
        "{BASE}\nvm \"web1\" {{\n  network = {network}\n  store   = \"pool1\"\n}}\n"
    );
    match resolve_source(&source).await {
        Err(Error::TypeMismatch {
            owner,
            field,
            expected,
        }) => {
            assert_eq!(owner, Owner::Vm("web1".into()));
            assert_eq!(field, Field::Network);
            assert_eq!(expected, "string");
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[rstest]
#[case::undeclared_network("network.ghost")]
#[case::undeclared_variable("var.missing")]
#[case::undeclared_table("vm.web2")]
#[case::missing_data("data.network.ext0")]
#[tokio::test]
async fn test_expression_errors(#[case] network: &str) {
    let source = format!(
        "{BASE}\nvm \"web1\" {{\n  network = {network}\n  store   = \"pool1\"\n}}\n"
    );
    match resolve_source(&source).await {
        Err(Error::ExpressionEval { owner, field, .. }) => {
            assert_eq!(owner, Owner::Vm("web1".into()));
            assert_eq!(field, Field::Network);
        }
        other => panic!("expected ExpressionEval, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn test_network_checked_before_store() {
    let source = r#"
vm "web1" {
  network = "ghost"
  store   = "phantom"
}
"#;
    let result = resolve_source(source).await;
    assert_unknown_reference(result, Owner::Vm("web1".into()), Field::Network, "ghost");
}

#[rstest]
#[tokio::test]
async fn test_first_failing_vm_aborts() {
    let source = format!(
        r#"{BASE}
vm "good" {{
  network = "default"
  store   = "pool1"
}}

vm "bad1" {{
  network = "ghost"
  store   = "pool1"
}}

vm "bad2" {{
  network = "default"
  store   = "phantom"
}}
"#
    );
    let result = resolve_source(&source).await;
    assert_unknown_reference(result, Owner::Vm("bad1".into()), Field::Network, "ghost");
}

#[rstest]
#[tokio::test]
async fn test_resolution_is_deterministic() {
    let source = format!(
        r#"{BASE}
locals {{
  net = "default"
}}

vm "web1" {{
  network = local.net
  store   = store.pool1
  cpu     = 2
}}

cluster "web" {{
  vms = ["web1"]
}}
"#
    );
    let doc = ParsedDocument::from_hcl(&source).unwrap();
    let index = SymbolIndex::build(&doc).unwrap();
    let namespace = build_namespace(&doc, &index, &MemoryCatalog::new(), &CancellationToken::new())
        .await
        .unwrap();

    let first = resolve(&doc, &index, &namespace).expect("Should resolve");
    let second = resolve(&doc, &index, &namespace).expect("Should resolve again");
    assert_eq!(first, second);
}

#[rstest]
#[tokio::test]
async fn test_vm_attributes_are_carried_through() {
    let source = format!(
        r#"{BASE}
vm "web1" {{
  network = "default"
  store   = "pool1"
  cpu     = 4
  memory  = "4GiB"

  disk {{
    size = "40GiB"
  }}
}}
"#
    );
    let resolved = resolve_source(&source).await.unwrap();
    let vm = resolved.vm("web1").unwrap();

    assert!(vm.attributes.get("cpu").is_some());
    assert!(vm.attributes.get("memory").is_some());
    assert!(vm.attributes.get("network").is_none());
    assert_eq!(vm.attributes.blocks.len(), 1);
}

const CLUSTER_BASE: &str = r#"
network "default" {}
store "pool1" {}

vm "web1" {
  network = "default"
  store   = "pool1"
}

vm "web2" {
  network = "default"
  store   = "pool1"
}
"#;

#[rstest]
#[tokio::test]
async fn test_resolve_cluster() {
    let source = format!(
        r#"{CLUSTER_BASE}
locals {{
  second = "web2"
}}

cluster "web" {{
  vms    = ["web1", local.second]
  labels = {{ tier = "frontend" }}

  lifecycle {{
    start_order = ["web1", "web2"]
    stop_order  = ["web2"]
  }}
}}
"#
    );
    let resolved = resolve_source(&source).await.expect("Should resolve");

    let cluster = resolved.cluster("web").expect("cluster should be resolved");
    assert_eq!(cluster.members, vec!["web1", "web2"]);
    assert_eq!(cluster.labels.get("tier").map(String::as_str), Some("frontend"));
    let lifecycle = cluster.lifecycle.as_ref().unwrap();
    assert_eq!(lifecycle.start_order, vec!["web1", "web2"]);
    assert_eq!(lifecycle.stop_order, vec!["web2"]);
}

#[rstest]
#[tokio::test]
async fn test_cluster_unknown_member() {
    let source = format!("{CLUSTER_BASE}\ncluster \"web\" {{\n  vms = [\"web1\", \"web3\"]\n}}\n");
    let result = resolve_source(&source).await;

    if let Err(err) = &result {
        assert_eq!(err.to_string(), "cluster.web.vms: unknown vm \"web3\"");
    }
    assert_unknown_reference(result, Owner::Cluster("web".into()), Field::Members, "web3");
}

#[rstest]
#[case::start_order("start_order", Field::StartOrder)]
#[case::stop_order("stop_order", Field::StopOrder)]
#[tokio::test]
async fn test_cluster_lifecycle_must_name_members(#[case] key: &str, #[case] expected: Field) {
    let source = format!(
        r#"{CLUSTER_BASE}
cluster "web" {{
  vms = ["web1"]

  lifecycle {{
    {key} = ["web1", "web2"]
  }}
}}
"#
    );
    let result = resolve_source(&source).await;
    assert_unknown_reference(result, Owner::Cluster("web".into()), expected, "web2");
}

#[rstest]
#[case::string("\"web1\"")]
#[case::numbers("[1, 2]")]
#[tokio::test]
async fn test_cluster_members_must_be_string_list(#[case] members: &str) {
    let source = format!("{CLUSTER_BASE}\ncluster \"web\" {{\n  vms = {members}\n}}\n");
    match resolve_source(&source).await {
        Err(Error::TypeMismatch { owner, field, .. }) => {
            assert_eq!(owner, Owner::Cluster("web".into()));
            assert_eq!(field, Field::Members);
        }
        other => panic!("expected TypeMismatch, got {other:?}"),
    }
}

#[rstest]
#[tokio::test]
async fn test_cluster_without_members() {
    let source = format!("{CLUSTER_BASE}\ncluster \"web\" {{}}\n");
    match resolve_source(&source).await {
        Err(Error::MissingAttribute { owner, field }) => {
            assert_eq!(owner, Owner::Cluster("web".into()));
            assert_eq!(field, Field::Members);
        }
        other => panic!("expected MissingAttribute, got {other:?}"),
    }
}
