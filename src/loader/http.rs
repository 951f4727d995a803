//! Remote artifact service over HTTP
//!
//! Definitions are served as JSON in the same shape the workspace stores as
//! YAML. Requests use basic authentication with the configured account.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ArtifactLoader, RemoteService};
use crate::common::config::{normalize_url, RemoteConfig};
use crate::common::{ArtifactKind, Error, Result};
use crate::model::{CaseLog, CaseStatus, Module, Product, StepLog, TestCase, TestTask};

/// Entry of a case listing
#[derive(Debug, Deserialize)]
struct CaseRef {
    id: String,
}

/// Body of a result submission
#[derive(Debug, Serialize)]
struct ResultPayload<'a> {
    case: &'a str,
    run: &'a str,
    version: &'a str,
    status: CaseStatus,
    steps: &'a [StepLog],
}

#[derive(Debug, Deserialize)]
struct Created {
    id: u32,
}

/// Client for the remote project-management service
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: reqwest::Client,
    base_url: String,
    account: String,
    password: String,
}

impl HttpLoader {
    pub fn new(remote: &RemoteConfig) -> Result<Self> {
        if !remote.is_configured() {
            return Err(Error::Config(
                "Remote site not configured. Use 'atf set --url <url> --account <name> --password <secret>'"
                    .to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("atf/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: normalize_url(&remote.url),
            account: remote.account.clone(),
            password: remote.password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON document; 404 maps to the supplied not-found error
    async fn get_json<T: DeserializeOwned>(&self, path: &str, not_found: Error) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.account, Some(&self.password))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(not_found),
            status if !status.is_success() => Err(Error::Transport(format!(
                "GET {} returned {}",
                url, status
            ))),
            _ => Ok(response.json::<T>().await?),
        }
    }

    /// POST a JSON body and decode the JSON answer
    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        not_found: Error,
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.account, Some(&self.password))
            .json(body)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(not_found),
            status if !status.is_success() => Err(Error::Transport(format!(
                "POST {} returned {}",
                url, status
            ))),
            _ => Ok(response.json::<T>().await?),
        }
    }

    /// Products visible to the configured account
    pub async fn products(&self) -> Result<Vec<Product>> {
        self.get_json("products", Error::Transport("product list unavailable".to_string()))
            .await
    }

    /// Modules of a product
    pub async fn modules(&self, product_id: &str) -> Result<Vec<Module>> {
        self.get_json(
            &format!("products/{}/modules", product_id),
            Error::NotFound {
                kind: ArtifactKind::Product,
                id: product_id.to_string(),
            },
        )
        .await
    }
}

#[async_trait]
impl ArtifactLoader for HttpLoader {
    async fn load_task(&self, task_id: u32) -> Result<TestTask> {
        self.get_json(&format!("tasks/{}", task_id), Error::task_not_found(task_id))
            .await
    }

    async fn load_case(&self, case_id: &str) -> Result<TestCase> {
        self.get_json(&format!("cases/{}", case_id), Error::case_not_found(case_id))
            .await
    }
}

/// Path of a product's case listing, optionally filtered by module
fn product_cases_path(product: &str, module: Option<&str>) -> String {
    match module {
        Some(module) => format!("products/{}/cases?module={}", product, module),
        None => format!("products/{}/cases", product),
    }
}

#[async_trait]
impl RemoteService for HttpLoader {
    async fn product_cases(&self, product: &str, module: Option<&str>) -> Result<Vec<String>> {
        let cases: Vec<CaseRef> = self
            .get_json(
                &product_cases_path(product, module),
                Error::NotFound {
                    kind: ArtifactKind::Product,
                    id: product.to_string(),
                },
            )
            .await?;
        Ok(cases.into_iter().map(|c| c.id).collect())
    }

    async fn suite_cases(&self, suite: &str) -> Result<Vec<String>> {
        let cases: Vec<CaseRef> = self
            .get_json(
                &format!("suites/{}/cases", suite),
                Error::NotFound {
                    kind: ArtifactKind::Suite,
                    id: suite.to_string(),
                },
            )
            .await?;
        Ok(cases.into_iter().map(|c| c.id).collect())
    }

    async fn submit_result(&self, log: &CaseLog) -> Result<u32> {
        let payload = ResultPayload {
            case: log.id(),
            run: log.id_in_task(),
            version: log.version(),
            status: log.status(),
            steps: log.steps(),
        };
        let created: Created = self
            .post_json(
                &format!("tasks/{}/results", log.task_id()),
                &payload,
                Error::task_not_found(log.task_id()),
            )
            .await?;
        Ok(created.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(url: &str) -> RemoteConfig {
        RemoteConfig {
            url: url.to_string(),
            account: "admin".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_requires_configuration() {
        assert!(HttpLoader::new(&RemoteConfig::default()).is_err());
    }

    #[test]
    fn test_url_joining() {
        let loader = HttpLoader::new(&remote("http://zentao.local/api")).unwrap();
        assert_eq!(loader.url("tasks/3"), "http://zentao.local/api/tasks/3");
        assert_eq!(loader.url("/cases/9"), "http://zentao.local/api/cases/9");
    }

    #[test]
    fn test_product_cases_path() {
        assert_eq!(product_cases_path("4", None), "products/4/cases");
        assert_eq!(product_cases_path("4", Some("12")), "products/4/cases?module=12");
    }

    #[test]
    fn test_result_payload_shape() {
        let log = CaseLog::executed(
            crate::model::CaseIdentity {
                id: "501".to_string(),
                id_in_task: "11".to_string(),
                task_id: 3,
                version: "2".to_string(),
                ..Default::default()
            },
            vec![StepLog::new("1", "echo", vec![])],
        );
        let payload = ResultPayload {
            case: log.id(),
            run: log.id_in_task(),
            version: log.version(),
            status: log.status(),
            steps: log.steps(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["case"], "501");
        assert_eq!(json["run"], "11");
        assert_eq!(json["status"], "pass");
        assert_eq!(json["steps"][0]["id"], "1");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let loader = HttpLoader::new(&remote("http://127.0.0.1:9")).unwrap();
        let err = loader.load_case("1").await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
