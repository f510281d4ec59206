use tracing::{debug, warn};
use x509_parser::extensions::{DistributionPointName, GeneralName, ParsedExtension};

use crate::pki::certificate::Certificate;

/// Pulls CRL distribution point URLs out of a certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionPointResolver;

impl DistributionPointResolver {
    /// URIs of the CRL Distribution Points extension (OID 2.5.29.31), in
    /// certificate order. An absent extension yields an empty list.
    ///
    /// No reachability or scheme checks happen here; the downloader
    /// rejects what it cannot fetch.
    pub fn resolve(cert: &Certificate) -> Vec<String> {
        let parsed = match cert.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Cannot re-parse certificate for CRL distribution points: {e}");
                return Vec::new();
            }
        };

        let mut distribution_points = Vec::new();

        for ext in parsed.tbs_certificate.extensions() {
            let ParsedExtension::CRLDistributionPoints(points) = ext.parsed_extension() else {
                continue;
            };

            for point in points.points.iter() {
                match &point.distribution_point {
                    Some(DistributionPointName::FullName(names)) => {
                        for name in names {
                            if let GeneralName::URI(uri) = name {
                                if distribution_points.iter().any(|known| known == uri) {
                                    continue;
                                }
                                debug!("Found CRL distribution point: {}", uri);
                                distribution_points.push(uri.to_string());
                            }
                        }
                    }
                    Some(DistributionPointName::NameRelativeToCRLIssuer(_)) => {
                        debug!("Skipping distribution point relative to CRL issuer");
                    }
                    None => {}
                }
            }
        }

        if distribution_points.is_empty() {
            debug!("No CRL distribution points found in certificate extensions");
        } else {
            debug!(
                "Found {} CRL distribution points",
                distribution_points.len()
            );
        }

        distribution_points
    }
}
