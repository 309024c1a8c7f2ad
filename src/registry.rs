use crate::certificate::Subject;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// Source of the organizations enrolled for automated claiming.
#[async_trait]
pub trait SubjectRegistry: Send + Sync {
    async fn list_enrolled_subjects(&self) -> Result<Vec<Subject>>;
}

#[derive(Clone, Default)]
pub struct InMemorySubjectRegistry {
    subjects: Arc<Mutex<Vec<Subject>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl InMemorySubjectRegistry {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self {
            subjects: Arc::new(Mutex::new(subjects)),
            failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn enroll(&self, subject: Subject) {
        lock(&self.subjects).push(subject);
    }

    /// Make subsequent listings fail with `message`; `None` clears it.
    pub fn set_failure(&self, message: Option<&str>) {
        *lock(&self.failure) = message.map(str::to_string);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl SubjectRegistry for InMemorySubjectRegistry {
    async fn list_enrolled_subjects(&self) -> Result<Vec<Subject>> {
        if let Some(message) = lock(&self.failure).as_ref() {
            return Err(crate::ClaimError::Registry(message.clone()));
        }
        Ok(lock(&self.subjects).clone())
    }
}

#[cfg(feature = "distributed")]
pub use remote::{HttpSubjectRegistry, PostgresSubjectRegistry};

#[cfg(feature = "distributed")]
mod remote {
    use super::SubjectRegistry;
    use crate::certificate::Subject;
    use crate::error::{ClaimError, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use postgres::{Client, NoTls};

    /// Enrollment API served by the subject service.
    pub struct HttpSubjectRegistry {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpSubjectRegistry {
        pub fn new(base_url: &str) -> Result<Self> {
            let client = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()?;
            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }
    }

    #[async_trait]
    impl SubjectRegistry for HttpSubjectRegistry {
        async fn list_enrolled_subjects(&self) -> Result<Vec<Subject>> {
            let response = self
                .client
                .get(format!("{}/v1/subjects", self.base_url))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClaimError::Registry(format!(
                    "subject listing failed with {}",
                    status
                )));
            }
            let body = response.text().await?;
            Ok(serde_json::from_str::<Vec<Subject>>(&body)?)
        }
    }

    /// Reads the persisted enrollment table directly.
    pub struct PostgresSubjectRegistry {
        url: String,
    }

    impl PostgresSubjectRegistry {
        pub fn new(url: &str) -> Self {
            Self { url: url.to_string() }
        }

        fn fetch(url: &str) -> Result<Vec<Subject>> {
            let mut client = Client::connect(url, NoTls)?;
            let rows = client.query(
                "SELECT DISTINCT subject_id::text, enrolled_at FROM claim_subjects",
                &[],
            )?;
            Ok(rows
                .iter()
                .map(|row| {
                    let subject_id: String = row.get(0);
                    let enrolled_at: DateTime<Utc> = row.get(1);
                    Subject {
                        subject_id,
                        enrolled_at,
                    }
                })
                .collect())
        }
    }

    #[async_trait]
    impl SubjectRegistry for PostgresSubjectRegistry {
        async fn list_enrolled_subjects(&self) -> Result<Vec<Subject>> {
            let url = self.url.clone();
            // postgres::Client drives its own runtime and must stay off the async workers.
            tokio::task::spawn_blocking(move || Self::fetch(&url))
                .await
                .map_err(|e| ClaimError::Registry(format!("enrollment query task failed: {}", e)))?
        }
    }
}
