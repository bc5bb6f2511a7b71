//! Tests for the docker inspect templates and image preparation

use crate::services::docker::{inspect_template, DockerCli};
use crate::traits::{ImageBuilder, InspectField};

#[test]
fn test_inspect_templates() {
    assert_eq!(inspect_template(InspectField::IpAddress), "{{.NetworkSettings.IPAddress}}");
    assert_eq!(inspect_template(InspectField::Pid), "{{.State.Pid}}");
    assert_eq!(
        inspect_template(InspectField::HostPort),
        "{{(index (index .NetworkSettings.Ports \"3306/tcp\") 0).HostPort}}"
    );
    assert_eq!(
        inspect_template(InspectField::HostIp),
        "{{(index (index .NetworkSettings.Ports \"3306/tcp\") 0).HostIp}}"
    );
}

/// An artifact already on disk is never downloaded again
#[tokio::test]
async fn test_existing_artifact_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let tarball = dir.path().join("Percona-XtraDB-Cluster.tar.gz");
    std::fs::write(&tarball, b"cached").unwrap();

    let docker = DockerCli::new(dir.path());
    docker
        .ensure_artifact("http://invalid.example/never-fetched.tar.gz", &tarball)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&tarball).unwrap(), b"cached");
}
