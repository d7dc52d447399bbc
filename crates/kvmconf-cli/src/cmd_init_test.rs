// Copyright (c) Contributors to the kvmconf project.
// SPDX-License-Identifier: Apache-2.0

use kvmconf::MemoryCatalog;
use rstest::rstest;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use super::*;

fn cmd(path: PathBuf, existing: bool) -> CmdInit {
    CmdInit {
        path,
        vm: "web1".to_string(),
        network: "lan".to_string(),
        store: "images".to_string(),
        existing,
    }
}

#[rstest]
#[case::declared(false, MemoryCatalog::new())]
#[case::existing(true, MemoryCatalog::new().with_network("lan").with_store("images"))]
#[tokio::test]
async fn test_template_resolves(#[case] existing: bool, #[case] catalog: MemoryCatalog) {
    let tmp = TempDir::new().unwrap();
    let mut init = cmd(tmp.path().to_path_buf(), existing);
    assert_eq!(init.run().await.unwrap(), 0);

    let path = tmp.path().join(kvmconf::DOCUMENT_FILENAME);
    let resolved = kvmconf::load(&path, &catalog, &CancellationToken::new())
        .await
        .expect("Generated document should resolve");

    let vm = resolved.vm("web1").expect("vm should be declared");
    assert_eq!(vm.network, "lan");
    assert_eq!(vm.store, "images");
}

#[rstest]
#[tokio::test]
async fn test_refuses_to_overwrite() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(kvmconf::DOCUMENT_FILENAME);
    std::fs::write(&path, "# keep me\n").unwrap();

    let result = cmd(tmp.path().to_path_buf(), false).run().await;
    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "# keep me\n");
}
