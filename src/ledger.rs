use crate::certificate::{Certificate, CertificateType, FederatedStreamId};
use crate::error::{ClaimError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// The wallet ledger as seen by the claiming engine.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// All currently unclaimed certificates owned by `subject_id`.
    async fn query_certificates(&self, subject_id: &str) -> Result<Vec<Certificate>>;

    /// Retire `quantity` units, pairing `consumption` with `production`.
    async fn claim(
        &self,
        subject_id: &str,
        consumption: &Certificate,
        production: &Certificate,
        quantity: u64,
    ) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClaimRecord {
    pub subject_id: String,
    pub consumption: FederatedStreamId,
    pub production: FederatedStreamId,
    pub quantity: u64,
}

#[derive(Default)]
struct LedgerState {
    certificates: HashMap<String, Vec<Certificate>>,
    claims: Vec<ClaimRecord>,
    queried: Vec<String>,
    failing_queries: HashSet<String>,
    claims_before_failure: Option<usize>,
}

/// In-process ledger. Behaves like the wallet for the operations the engine
/// uses, and records every call so tests can assert on them.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    inner: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn add_certificates(&self, subject_id: &str, certificates: Vec<Certificate>) {
        self.state()
            .certificates
            .entry(subject_id.to_string())
            .or_default()
            .extend(certificates);
    }

    /// Every query for this subject fails until cleared.
    pub fn fail_queries_for(&self, subject_id: &str) {
        self.state().failing_queries.insert(subject_id.to_string());
    }

    /// Accept `n` more claims, then reject every claim after that.
    pub fn fail_claims_after(&self, n: usize) {
        self.state().claims_before_failure = Some(n);
    }

    pub fn clear_faults(&self) {
        let mut state = self.state();
        state.failing_queries.clear();
        state.claims_before_failure = None;
    }

    pub fn claims(&self) -> Vec<ClaimRecord> {
        self.state().claims.clone()
    }

    pub fn queried_subjects(&self) -> Vec<String> {
        self.state().queried.clone()
    }

    pub fn remaining(&self, subject_id: &str, id: &FederatedStreamId) -> Option<u64> {
        self.state()
            .certificates
            .get(subject_id)
            .and_then(|certs| certs.iter().find(|c| &c.federated_id == id))
            .map(|c| c.quantity)
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn query_certificates(&self, subject_id: &str) -> Result<Vec<Certificate>> {
        let mut state = self.state();
        state.queried.push(subject_id.to_string());
        if state.failing_queries.contains(subject_id) {
            return Err(ClaimError::Ledger(format!(
                "query unavailable for subject {}",
                subject_id
            )));
        }
        Ok(state
            .certificates
            .get(subject_id)
            .map(|certs| certs.iter().filter(|c| c.is_available()).cloned().collect())
            .unwrap_or_default())
    }

    async fn claim(
        &self,
        subject_id: &str,
        consumption: &Certificate,
        production: &Certificate,
        quantity: u64,
    ) -> Result<()> {
        let mut state = self.state();
        if consumption.certificate_type != CertificateType::Consumption
            || production.certificate_type != CertificateType::Production
        {
            return Err(ClaimError::Ledger("claim requires consumption and production certificates".to_string()));
        }
        if consumption.group_key() != production.group_key() {
            return Err(ClaimError::Ledger(format!(
                "certificates {} and {} do not share grid area and period",
                consumption.federated_id, production.federated_id
            )));
        }

        let certs = state
            .certificates
            .get(subject_id)
            .ok_or_else(|| ClaimError::Ledger(format!("unknown subject {}", subject_id)))?;
        let available = |id: &FederatedStreamId| {
            certs
                .iter()
                .find(|c| &c.federated_id == id)
                .map(|c| c.quantity)
                .ok_or_else(|| ClaimError::Ledger(format!("unknown certificate {}", id)))
        };
        let consumption_left = available(&consumption.federated_id)?;
        let production_left = available(&production.federated_id)?;
        if quantity == 0 || quantity > consumption_left || quantity > production_left {
            return Err(ClaimError::Ledger(format!(
                "cannot claim {} between {} ({} left) and {} ({} left)",
                quantity,
                consumption.federated_id,
                consumption_left,
                production.federated_id,
                production_left
            )));
        }
        if let Some(budget) = state.claims_before_failure {
            if budget == 0 {
                return Err(ClaimError::Ledger(format!(
                    "claim rejected for subject {}",
                    subject_id
                )));
            }
            state.claims_before_failure = Some(budget - 1);
        }
        let certs = state
            .certificates
            .get_mut(subject_id)
            .ok_or_else(|| ClaimError::Ledger(format!("unknown subject {}", subject_id)))?;
        for cert in certs.iter_mut() {
            if cert.federated_id == consumption.federated_id
                || cert.federated_id == production.federated_id
            {
                cert.quantity -= quantity;
            }
        }

        state.claims.push(ClaimRecord {
            subject_id: subject_id.to_string(),
            consumption: consumption.federated_id.clone(),
            production: production.federated_id.clone(),
            quantity,
        });
        Ok(())
    }
}

#[cfg(feature = "distributed")]
pub use http::HttpLedgerClient;

#[cfg(feature = "distributed")]
mod http {
    use super::LedgerClient;
    use crate::certificate::{Certificate, FederatedStreamId};
    use crate::error::{ClaimError, Result};
    use async_trait::async_trait;
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ClaimRequest<'a> {
        consumption_certificate_id: &'a FederatedStreamId,
        production_certificate_id: &'a FederatedStreamId,
        quantity: u64,
    }

    /// JSON-over-HTTP client for the wallet service.
    pub struct HttpLedgerClient {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpLedgerClient {
        pub fn new(base_url: &str) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?;
            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }

        fn subject_url(&self, subject_id: &str, tail: &str) -> String {
            format!("{}/v1/subjects/{}/{}", self.base_url, subject_id, tail)
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClaimError::Ledger(format!("{} failed with {}: {}", what, status, body)))
    }

    #[async_trait]
    impl LedgerClient for HttpLedgerClient {
        async fn query_certificates(&self, subject_id: &str) -> Result<Vec<Certificate>> {
            let response = self
                .client
                .get(self.subject_url(subject_id, "certificates"))
                .query(&[("unclaimed", "true")])
                .send()
                .await?;
            let response = check(response, "certificate query").await?;
            let body = response.text().await?;
            Ok(serde_json::from_str::<Vec<Certificate>>(&body)?)
        }

        async fn claim(
            &self,
            subject_id: &str,
            consumption: &Certificate,
            production: &Certificate,
            quantity: u64,
        ) -> Result<()> {
            let body = ClaimRequest {
                consumption_certificate_id: &consumption.federated_id,
                production_certificate_id: &production.federated_id,
                quantity,
            };
            let response = self
                .client
                .post(self.subject_url(subject_id, "claims"))
                .json(&body)
                .send()
                .await?;
            check(response, "claim").await?;
            Ok(())
        }
    }

}
