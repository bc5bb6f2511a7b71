//! Tests for the hosts mapping file

use crate::services::hosts::HostsFile;

#[test]
fn test_entry_maps_short_and_qualified_names() {
    assert_eq!(
        HostsFile::entry("Dock2", "172.17.0.4"),
        "172.17.0.4 Dock2\n172.17.0.4 Dock2.ci.percona.com\n"
    );
}

#[tokio::test]
async fn test_append_accumulates_entries() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let hosts = HostsFile::new(file.path());

    hosts.append("Dock1", "172.17.0.3").await.unwrap();
    hosts.append("Dock2", "172.17.0.4").await.unwrap();

    let content = std::fs::read_to_string(hosts.path()).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.starts_with("172.17.0.3 Dock1\n"));
    assert!(content.ends_with("172.17.0.4 Dock2.ci.percona.com\n"));
}

#[tokio::test]
async fn test_append_requires_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let hosts = HostsFile::new(dir.path().join("missing"));
    assert!(hosts.append("Dock1", "172.17.0.3").await.is_err());
}
