//! Service-center registry client.
//!
//! Queries the REST API of a ServiceComb-style service center:
//!
//! ```text
//! GET {address}/v4/{project}/registry/instances?appId=..&serviceName=..&version=..
//! → {"instances": [{"instanceId": "..", "endpoints": ["rest://.."], "status": "UP"}]}
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::ServiceCenterConfig;
use crate::discovery::registry::{Registry, RegistryError, RegistryQuery, ServiceInstance};

#[derive(Debug, Deserialize)]
struct InstancesResponse {
    #[serde(default)]
    instances: Vec<InstanceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceRecord {
    instance_id: String,
    #[serde(default)]
    endpoints: Vec<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Registry client for a remote service center.
#[derive(Debug, Clone)]
pub struct ServiceCenterRegistry {
    client: reqwest::Client,
    base_url: String,
    project: String,
}

impl ServiceCenterRegistry {
    pub fn new(config: &ServiceCenterConfig) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.address.trim_end_matches('/').to_string(),
            project: config.project.clone(),
        })
    }

    fn instances_url(&self) -> String {
        format!("{}/v4/{}/registry/instances", self.base_url, self.project)
    }
}

#[async_trait]
impl Registry for ServiceCenterRegistry {
    async fn find_instances(&self, query: &RegistryQuery) -> Result<Vec<ServiceInstance>, RegistryError> {
        let response = self
            .client
            .get(self.instances_url())
            .query(&[
                ("appId", query.app_id.as_str()),
                ("serviceName", query.service_name.as_str()),
                ("version", query.version_rule.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Ok(Vec::new()),
            other => return Err(RegistryError::Status(other.as_u16())),
        }

        let body: InstancesResponse = response.json().await?;

        let instances = body
            .instances
            .into_iter()
            .filter(|record| match record.status.as_deref() {
                None | Some("UP") => true,
                Some(status) => {
                    tracing::debug!(
                        service = %query.service_name,
                        instance_id = %record.instance_id,
                        status,
                        "Skipping instance not reported UP"
                    );
                    false
                }
            })
            .map(|record| ServiceInstance::new(record.instance_id, record.endpoints))
            .collect();

        Ok(instances)
    }
}
