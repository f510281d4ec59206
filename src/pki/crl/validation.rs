use ::time::OffsetDateTime;
use tracing::{debug, info};

use super::types::{Crl, RevocationInfo, normalize_serial};

/// Temporal validity of a CRL against a point in time.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrlTimeValidator;

impl CrlTimeValidator {
    /// True iff `thisUpdate <= now <= nextUpdate`, both bounds inclusive.
    ///
    /// A CRL without `nextUpdate` never expires.
    pub fn is_time_valid(crl: &Crl, now: OffsetDateTime) -> bool {
        if now < crl.this_update() {
            debug!(
                "CRL thisUpdate is in the future: {} (current time: {})",
                crl.this_update(),
                now
            );
            return false;
        }

        if let Some(next_update) = crl.next_update()
            && now > next_update
        {
            debug!("CRL is expired (next_update: {})", next_update);
            return false;
        }

        true
    }

    /// [`Self::is_time_valid`] against the wall clock.
    pub fn check(crl: &Crl) -> bool {
        Self::is_time_valid(crl, OffsetDateTime::now_utc())
    }
}

impl Crl {
    /// Look a certificate serial number up in the revoked list.
    pub fn is_revoked(&self, serial_number: &[u8]) -> Option<RevocationInfo> {
        let serial_number = normalize_serial(serial_number);
        let entry = self
            .revoked()
            .iter()
            .find(|entry| entry.serial == serial_number)?;

        info!(
            "Certificate with serial {} is revoked (reason: {:?})",
            hex::encode(serial_number),
            entry.reason
        );
        Some(RevocationInfo {
            revoked: true,
            revocation_date: entry.revocation_date,
            reason: entry.reason,
        })
    }
}
