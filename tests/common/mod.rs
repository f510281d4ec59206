use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use pki_revocation::telemetry;
use rcgen::{
    BasicConstraints, CertificateParams, CertificateRevocationListParams, CrlDistributionPoint,
    DistinguishedName, DnType, IsCa, Issuer, KeyIdMethod, KeyPair, KeyUsagePurpose,
    RevokedCertParams, SerialNumber,
};
use time::OffsetDateTime;
use tokio::net::TcpListener;

pub struct TestCa {
    issuer: Issuer<'static, KeyPair>,
}

impl TestCa {
    pub fn new(cn: &str) -> Self {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, cn);
        dn.push(DnType::OrganizationName, "Integration Test CA");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        Self {
            issuer: Issuer::new(params, KeyPair::generate().unwrap()),
        }
    }

    pub fn leaf(&self, serial: u64, cdps: &[String]) -> Vec<u8> {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "client.example.org");
        params.distinguished_name = dn;
        params.serial_number = Some(SerialNumber::from(serial));
        params.crl_distribution_points = vec![CrlDistributionPoint {
            uris: cdps.to_vec(),
        }];

        let key_pair = KeyPair::generate().unwrap();
        params
            .signed_by(&key_pair, &self.issuer)
            .unwrap()
            .der()
            .to_vec()
    }

    pub fn crl(
        &self,
        this_update: time::Duration,
        next_update: time::Duration,
        revoked: &[u64],
    ) -> Vec<u8> {
        let now = OffsetDateTime::now_utc();
        CertificateRevocationListParams {
            this_update: now + this_update,
            next_update: now + next_update,
            crl_number: SerialNumber::from(7u64),
            issuing_distribution_point: None,
            revoked_certs: revoked
                .iter()
                .map(|serial| RevokedCertParams {
                    serial_number: SerialNumber::from(*serial),
                    revocation_time: now - time::Duration::days(1),
                    reason_code: Some(rcgen::RevocationReason::Superseded),
                    invalidity_date: None,
                })
                .collect(),
            key_identifier_method: KeyIdMethod::Sha256,
        }
        .signed_by(&self.issuer)
        .unwrap()
        .der()
        .to_vec()
    }

    pub fn fresh_crl(&self, revoked: &[u64]) -> Vec<u8> {
        self.crl(-time::Duration::hours(1), time::Duration::days(7), revoked)
    }

    pub fn expired_crl(&self) -> Vec<u8> {
        self.crl(-time::Duration::days(30), -time::Duration::days(1), &[])
    }
}

#[derive(Clone)]
struct Bodies {
    fresh: Arc<Vec<u8>>,
    expired: Arc<Vec<u8>>,
}

async fn fresh(State(bodies): State<Bodies>) -> Vec<u8> {
    bodies.fresh.to_vec()
}

async fn fresh_pem(State(bodies): State<Bodies>) -> String {
    pem::encode(&pem::Pem::new("X509 CRL", bodies.fresh.to_vec()))
}

async fn expired(State(bodies): State<Bodies>) -> Vec<u8> {
    bodies.expired.to_vec()
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(30)).await;
    "too late"
}

/// Serves CRLs signed by `ca` and a few failure modes:
///
/// - `/crl/fresh`, `/crl/fresh.pem`, `/crl/expired`
/// - `/status/{code}` answers with an empty body and that status
/// - `/slow` never answers in time
/// - `/garbage` returns a 200 that is not a CRL
pub async fn spawn_crl_server(ca: &TestCa, revoked: &[u64]) -> String {
    telemetry::init_tracing();

    let bodies = Bodies {
        fresh: Arc::new(ca.fresh_crl(revoked)),
        expired: Arc::new(ca.expired_crl()),
    };

    let app = Router::new()
        .route("/crl/fresh", get(fresh))
        .route("/crl/fresh.pem", get(fresh_pem))
        .route("/crl/expired", get(expired))
        .route("/status/{code}", get(status))
        .route("/slow", get(slow))
        .route("/garbage", get(|| async { "<html>Service Unavailable</html>" }))
        .with_state(bodies);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("failed to run server");
    });

    format!("http://{addr}")
}

/// A local URL nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/crl")
}
