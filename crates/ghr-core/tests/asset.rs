use std::{fs, path::Path, sync::Arc, time::Duration};

use flate2::{Compression, write::GzEncoder};
use ghr_api::{
    ApiClient, Method,
    mock::{Reply, ScriptedTransport},
};
use ghr_core::{AssetCache, CoreError, FINGERPRINT_MARKER};
use ghr_model::{Credential, RetryPolicy};
use serde_json::json;

const RELEASE_URL: &str = "http://cp.test/repos/actions/runner/releases/latest";

fn archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::fast()));
    for (path, body) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, body.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

fn runner_archive(version: &str) -> Vec<u8> {
    archive(&[
        ("config.sh", "#!/bin/sh\nexit 0\n"),
        ("run.sh", "#!/bin/sh\nexit 0\n"),
        ("bin/Runner.Listener", version),
    ])
}

fn release(tag: &str) -> (Reply, String) {
    let url = format!("https://objects.test/{tag}/actions-runner-linux-x64-{tag}.tar.gz");
    let body = json!({
        "tag_name": tag,
        "assets": [
            {"name": format!("actions-runner-osx-x64-{tag}.tar.gz"), "browser_download_url": "https://objects.test/osx"},
            {"name": format!("actions-runner-linux-x64-{tag}.tar.gz"), "browser_download_url": url},
        ]
    });
    (Reply::json(200, body), url)
}

fn cache(transport: &Arc<ScriptedTransport>, dir: &Path) -> AssetCache {
    let api = ApiClient::new(
        transport.clone(),
        RetryPolicy::new(2, Duration::from_millis(1), 1.0).unwrap(),
    );
    AssetCache::new(api, RELEASE_URL, dir)
}

#[tokio::test]
async fn unchanged_release_is_fetched_once() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let (listing, url) = release("2.320.0");
    transport.on(Method::Get, RELEASE_URL, [listing]);
    transport.on(Method::Get, &url, [Reply::bytes(200, runner_archive("2.320.0"))]);

    let cache = cache(&transport, dir.path());
    let cred = Credential::new("ghp_operator");
    let first = cache.ensure(Some(&cred)).await.unwrap();
    let second = cache.ensure(Some(&cred)).await.unwrap();

    assert_eq!(first, dir.path());
    assert_eq!(first, second);
    assert_eq!(transport.count(Method::Get, &url), 1);
    assert_eq!(transport.count(Method::Get, RELEASE_URL), 2);
    assert!(dir.path().join("run.sh").is_file());

    let marker = fs::read_to_string(dir.path().join(FINGERPRINT_MARKER)).unwrap();
    assert_eq!(marker.trim().len(), 64);
}

#[tokio::test]
async fn new_release_replaces_previous_install() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let cache = cache(&transport, dir.path());

    let (old_listing, old_url) = release("2.319.0");
    transport.on(Method::Get, RELEASE_URL, [old_listing]);
    transport.on(Method::Get, &old_url, [Reply::bytes(200, runner_archive("2.319.0"))]);
    cache.ensure(None).await.unwrap();
    let old_marker = fs::read_to_string(dir.path().join(FINGERPRINT_MARKER)).unwrap();

    fs::write(dir.path().join("stale.sh"), "#!/bin/sh\n").unwrap();
    fs::write(dir.path().join("bin/leftover"), "x").unwrap();
    fs::write(dir.path().join(".runner"), "{}").unwrap();

    let (new_listing, new_url) = release("2.320.0");
    transport.on(Method::Get, RELEASE_URL, [new_listing]);
    transport.on(Method::Get, &new_url, [Reply::bytes(200, runner_archive("2.320.0"))]);
    cache.ensure(None).await.unwrap();

    let new_marker = fs::read_to_string(dir.path().join(FINGERPRINT_MARKER)).unwrap();
    assert_ne!(old_marker, new_marker);
    assert!(!dir.path().join("stale.sh").exists());
    assert!(!dir.path().join("bin/leftover").exists());
    // Worker state outside the release layout survives.
    assert!(dir.path().join(".runner").exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("bin/Runner.Listener")).unwrap(),
        "2.320.0"
    );
}

#[tokio::test]
async fn missing_entry_points_trigger_reinstall() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let (listing, url) = release("2.320.0");
    transport.on(Method::Get, RELEASE_URL, [listing]);
    transport.on(Method::Get, &url, [Reply::bytes(200, runner_archive("2.320.0"))]);

    let cache = cache(&transport, dir.path());
    cache.ensure(None).await.unwrap();
    fs::remove_file(dir.path().join("run.sh")).unwrap();
    cache.ensure(None).await.unwrap();

    assert_eq!(transport.count(Method::Get, &url), 2);
    assert!(dir.path().join("run.sh").is_file());
}

#[tokio::test]
async fn release_without_linux_asset_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    transport.on(
        Method::Get,
        RELEASE_URL,
        [Reply::json(200, json!({"tag_name": "v9", "assets": [
            {"name": "actions-runner-win-x64-9.zip", "browser_download_url": "https://objects.test/win"}
        ]}))],
    );

    let err = cache(&transport, dir.path()).ensure(None).await.unwrap_err();
    assert!(matches!(err, CoreError::Asset(_)));
    assert_eq!(err.exit_code(), 5);
    assert!(!dir.path().join(FINGERPRINT_MARKER).exists());
}

#[tokio::test]
async fn archive_without_run_script_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let (listing, url) = release("2.320.0");
    transport.on(Method::Get, RELEASE_URL, [listing]);
    transport.on(
        Method::Get,
        &url,
        [Reply::bytes(200, archive(&[("config.sh", "#!/bin/sh\n")]))],
    );

    let err = cache(&transport, dir.path()).ensure(None).await.unwrap_err();
    assert!(err.to_string().contains("run.sh"));
    assert!(!dir.path().join(FINGERPRINT_MARKER).exists());
}

#[tokio::test]
async fn rejected_credential_falls_back_to_anonymous_listing() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let (listing, url) = release("2.320.0");
    transport.on(
        Method::Get,
        RELEASE_URL,
        [Reply::json(401, json!({"message": "Bad credentials"})), listing],
    );
    transport.on(Method::Get, &url, [Reply::bytes(200, runner_archive("2.320.0"))]);

    let cred = Credential::new("ghp_revoked");
    cache(&transport, dir.path()).ensure(Some(&cred)).await.unwrap();

    let listings: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.url == RELEASE_URL)
        .collect();
    assert_eq!(listings.len(), 2);
    assert!(listings[0].bearer.is_some());
    assert!(listings[1].bearer.is_none());
}
