use crate::certificate::{Certificate, CertificateType, GroupKey};
use crate::error::Result;
use crate::ledger::LedgerClient;
use crate::shuffle::{Shuffler, shuffle_in_place};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MatchReport {
    pub groups: usize,
    pub claims: usize,
    pub quantity_claimed: u64,
}

impl MatchReport {
    pub fn absorb(&mut self, other: MatchReport) {
        self.groups += other.groups;
        self.claims += other.claims;
        self.quantity_claimed += other.quantity_claimed;
    }
}

/// Pairs production against consumption certificates of the same grid area
/// and period and claims the overlap on the ledger.
pub struct ClaimMatchingEngine {
    shuffler: Arc<dyn Shuffler>,
}

impl ClaimMatchingEngine {
    pub fn new(shuffler: Arc<dyn Shuffler>) -> Self {
        Self { shuffler }
    }

    /// Claims everything that can be claimed for one subject.
    ///
    /// Stops at the first failed claim. Claims already issued stay on the
    /// ledger; leftovers are picked up by the next pass.
    #[tracing::instrument(skip_all, fields(subject = %subject_id))]
    pub async fn match_subject(
        &self,
        ledger: &dyn LedgerClient,
        subject_id: &str,
        certificates: Vec<Certificate>,
    ) -> Result<MatchReport> {
        let groups: BTreeMap<GroupKey, Vec<Certificate>> = certificates
            .into_iter()
            .filter(Certificate::is_available)
            .into_group_map_by(Certificate::group_key)
            .into_iter()
            .collect();

        let mut report = MatchReport::default();
        for (key, certificates) in groups {
            let group_report = self.match_group(ledger, subject_id, &key, certificates).await?;
            report.absorb(group_report);
        }
        Ok(report)
    }

    async fn match_group(
        &self,
        ledger: &dyn LedgerClient,
        subject_id: &str,
        key: &GroupKey,
        certificates: Vec<Certificate>,
    ) -> Result<MatchReport> {
        let (mut production, mut consumption): (Vec<Certificate>, Vec<Certificate>) = certificates
            .into_iter()
            .filter(|c| c.certificate_type != CertificateType::Other)
            .partition(|c| c.certificate_type == CertificateType::Production);
        shuffle_in_place(self.shuffler.as_ref(), &mut production);
        shuffle_in_place(self.shuffler.as_ref(), &mut consumption);

        let mut report = MatchReport {
            groups: 1,
            ..MatchReport::default()
        };
        loop {
            let Some(p) = production.iter().position(Certificate::is_available) else {
                break;
            };
            let Some(c) = consumption.iter().position(Certificate::is_available) else {
                break;
            };
            let quantity = production[p].quantity.min(consumption[c].quantity);

            if let Err(e) = ledger
                .claim(subject_id, &consumption[c], &production[p], quantity)
                .await
            {
                error!(
                    subject = %subject_id,
                    group = %key,
                    consumption = %consumption[c].federated_id,
                    production = %production[p].federated_id,
                    quantity,
                    error = %e,
                    "claim failed"
                );
                return Err(e);
            }
            debug!(
                subject = %subject_id,
                group = %key,
                consumption = %consumption[c].federated_id,
                production = %production[p].federated_id,
                quantity,
                "claimed"
            );

            production[p].quantity -= quantity;
            consumption[c].quantity -= quantity;
            report.claims += 1;
            report.quantity_claimed += quantity;
        }
        Ok(report)
    }
}
