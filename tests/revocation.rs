mod common;

use std::time::{Duration, Instant};

use common::{TestCa, closed_port_url, spawn_crl_server};
use pki_revocation::config::{Config, DownloadConfig, FetchStrategy, RevocationConfig};
use pki_revocation::pki::crl::{AttemptError, DownloadError, TransportError};
use pki_revocation::pki::{Certificate, MemoryCrlStore, Revocation, RevocationError};
use tempfile::TempDir;

fn config(dir: &TempDir, timeout_secs: u64) -> Config {
    Config {
        download: DownloadConfig {
            timeout_secs,
            directory: dir.path().join("downloads"),
            ..DownloadConfig::default()
        },
        revocation: RevocationConfig::default(),
    }
}

#[tokio::test]
async fn test_falls_back_from_server_error_to_working_point() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("Fallback Integration CA");
    let base = spawn_crl_server(&ca, &[]).await;
    let cdps = vec![format!("{base}/status/500"), format!("{base}/crl/fresh")];
    let cert = Certificate::from_der(ca.leaf(10, &cdps)).unwrap();
    let revocation = Revocation::new(&config(&dir, 5)).unwrap();

    let crl = revocation
        .get_crl(&cert, &MemoryCrlStore::new())
        .await
        .unwrap();

    assert!(revocation.check_time(&crl));
    assert_eq!(crl.issuer(), cert.issuer_identity());
    assert!(!dir.path().join("downloads").join("crl0").exists());
    assert!(dir.path().join("downloads").join("crl1").exists());
}

#[tokio::test]
async fn test_pem_encoded_crl_is_accepted() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("PEM Integration CA");
    let base = spawn_crl_server(&ca, &[3]).await;
    let revocation = Revocation::new(&config(&dir, 5)).unwrap();

    let crl = revocation
        .download_crl(
            &[format!("{base}/crl/fresh.pem")],
            &dir.path().join("pem"),
        )
        .await
        .unwrap();

    assert_eq!(crl.revoked().len(), 1);
}

#[tokio::test]
async fn test_every_failure_is_reported_in_order() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("Failing Integration CA");
    let base = spawn_crl_server(&ca, &[]).await;
    let refused = closed_port_url().await;
    let points = vec![
        format!("{base}/status/404"),
        refused.clone(),
        format!("{base}/garbage"),
    ];
    let revocation = Revocation::new(&config(&dir, 5)).unwrap();

    let err = revocation
        .download_crl(&points, &dir.path().join("crl"))
        .await
        .unwrap_err();

    let RevocationError::AllAttemptsFailed { attempts } = &err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(attempts.len(), 3);
    assert!(matches!(
        attempts[0].error,
        AttemptError::Download(DownloadError::BadStatus(404))
    ));
    assert_eq!(attempts[1].url, refused);
    assert!(matches!(
        attempts[1].error,
        AttemptError::Download(DownloadError::Transport(TransportError::Connect(_)))
    ));
    assert!(matches!(attempts[2].error, AttemptError::ParseFailure(_)));
    for attempt in attempts {
        assert!(!attempt.path.exists());
    }
}

#[tokio::test]
async fn test_unresponsive_point_times_out() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("Timeout Integration CA");
    let base = spawn_crl_server(&ca, &[]).await;
    let revocation = Revocation::new(&config(&dir, 1)).unwrap();

    let started = Instant::now();
    let crl = revocation
        .download_crl(
            &[format!("{base}/slow"), format!("{base}/crl/fresh")],
            &dir.path().join("crl"),
        )
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(revocation.check_time(&crl));

    let err = revocation
        .download_crl(&[format!("{base}/slow")], &dir.path().join("only-slow"))
        .await
        .unwrap_err();
    match err.last().map(|failure| &failure.error) {
        Some(AttemptError::Download(DownloadError::Transport(e))) => assert!(e.is_timeout()),
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_strategy_abandons_slow_point() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("Concurrent Integration CA");
    let base = spawn_crl_server(&ca, &[]).await;
    let mut config = config(&dir, 20);
    config.download.strategy = FetchStrategy::Concurrent;
    let revocation = Revocation::new(&config).unwrap();

    let started = Instant::now();
    let crl = revocation
        .download_crl(
            &[format!("{base}/crl/fresh"), format!("{base}/slow")],
            &dir.path().join("crl"),
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(revocation.check_time(&crl));
    assert!(!dir.path().join("crl1").exists());
}

#[tokio::test]
async fn test_expired_download_is_skipped_by_get_crl() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("Expiry Integration CA");
    let base = spawn_crl_server(&ca, &[]).await;
    let cdps = vec![format!("{base}/crl/expired"), format!("{base}/crl/fresh")];
    let cert = Certificate::from_der(ca.leaf(11, &cdps)).unwrap();
    let revocation = Revocation::new(&config(&dir, 5)).unwrap();

    let crl = revocation
        .get_crl(&cert, &MemoryCrlStore::new())
        .await
        .unwrap();

    assert!(revocation.check_time(&crl));
    assert!(!dir.path().join("downloads").join("crl0").exists());
}

#[tokio::test]
async fn test_store_loaded_from_disk_avoids_download() {
    let dir = TempDir::new().unwrap();
    let ca = TestCa::new("Cached Integration CA");
    let store_dir = dir.path().join("store");
    tokio::fs::create_dir_all(&store_dir).await.unwrap();
    tokio::fs::write(store_dir.join("issuer.crl"), ca.fresh_crl(&[12]))
        .await
        .unwrap();
    let store = MemoryCrlStore::from_dir(&store_dir).await.unwrap();

    // Nothing listens here, so only the store can satisfy the request
    let cert = Certificate::from_der(ca.leaf(12, &[closed_port_url().await])).unwrap();
    let revocation = Revocation::new(&config(&dir, 5)).unwrap();

    let status = revocation.check_certificate(&cert, &store).await.unwrap();

    assert!(status.is_some_and(|info| info.revoked));
    assert!(!dir.path().join("downloads").exists());
}
