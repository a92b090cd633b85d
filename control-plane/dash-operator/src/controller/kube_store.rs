use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::store::{ChildKind, ChildResource, ResourceStore, StoreError};
use crate::crd::dash_application::{DashApplication, DashApplicationStatus};

const FIELD_MANAGER: &str = "dash-operator";

/// [`ResourceStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, ns: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), ns)
    }
}

/// Map API status codes onto the store's error taxonomy.
fn classify(kind: &str, name: &str, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(ae) if ae.code == 404 => StoreError::NotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(ae) if ae.code == 409 && ae.reason == "AlreadyExists" => {
            StoreError::AlreadyExists {
                kind: kind.to_string(),
                name: name.to_string(),
            }
        }
        kube::Error::Api(ae) if ae.code == 409 => StoreError::Conflict(ae.message),
        other => StoreError::Kube(other),
    }
}

async fn create_in<K>(api: Api<K>, kind: ChildKind, obj: &K) -> Result<(), StoreError>
where
    K: kube::Resource + Clone + Serialize + DeserializeOwned + std::fmt::Debug,
{
    let name = obj.name_any();
    let pp = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    api.create(&pp, obj)
        .await
        .map(|_| ())
        .map_err(|e| classify(kind.k8s_kind(), &name, e))
}

async fn replace_in<K>(api: Api<K>, kind: ChildKind, obj: &K) -> Result<(), StoreError>
where
    K: kube::Resource + Clone + Serialize + DeserializeOwned + std::fmt::Debug,
{
    let name = obj.name_any();
    let pp = PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    };
    api.replace(&name, &pp, obj)
        .await
        .map(|_| ())
        .map_err(|e| classify(kind.k8s_kind(), &name, e))
}

#[async_trait]
impl ResourceStore for KubeStore {
    #[instrument(skip(self))]
    async fn get_owner(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<DashApplication>, StoreError> {
        Ok(self.api::<DashApplication>(ns).get_opt(name).await?)
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn get(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<Option<ChildResource>, StoreError> {
        let found = match kind {
            ChildKind::Workload => self
                .api::<Deployment>(ns)
                .get_opt(name)
                .await?
                .map(ChildResource::Workload),
            ChildKind::Endpoint => self
                .api::<Service>(ns)
                .get_opt(name)
                .await?
                .map(ChildResource::Endpoint),
            ChildKind::Route => self
                .api::<Ingress>(ns)
                .get_opt(name)
                .await?
                .map(ChildResource::Route),
        };
        debug!(found = found.is_some(), "get child");
        Ok(found)
    }

    async fn create(&self, obj: &ChildResource) -> Result<(), StoreError> {
        let ns = obj.namespace();
        match obj {
            ChildResource::Workload(d) => create_in(self.api(ns), obj.kind(), d).await,
            ChildResource::Endpoint(s) => create_in(self.api(ns), obj.kind(), s).await,
            ChildResource::Route(i) => create_in(self.api(ns), obj.kind(), i).await,
        }
    }

    async fn update(&self, obj: &ChildResource) -> Result<(), StoreError> {
        let ns = obj.namespace();
        match obj {
            ChildResource::Workload(d) => replace_in(self.api(ns), obj.kind(), d).await,
            ChildResource::Endpoint(s) => replace_in(self.api(ns), obj.kind(), s).await,
            ChildResource::Route(i) => replace_in(self.api(ns), obj.kind(), i).await,
        }
    }

    #[instrument(skip(self), fields(kind = %kind))]
    async fn delete(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        let dp = DeleteParams::default();
        let res = match kind {
            ChildKind::Workload => self.api::<Deployment>(ns).delete(name, &dp).await.map(|_| ()),
            ChildKind::Endpoint => self.api::<Service>(ns).delete(name, &dp).await.map(|_| ()),
            ChildKind::Route => self.api::<Ingress>(ns).delete(name, &dp).await.map(|_| ()),
        };
        res.map_err(|e| classify(kind.k8s_kind(), name, e))
    }

    async fn update_finalizers(
        &self,
        owner: &DashApplication,
        finalizers: Vec<String>,
    ) -> Result<DashApplication, StoreError> {
        let ns = owner.namespace().unwrap_or_else(|| "default".to_string());
        let name = owner.name_any();
        // resourceVersion turns the merge patch into a conditional write
        let patch = json!({
            "metadata": {
                "finalizers": finalizers,
                "resourceVersion": owner.resource_version(),
            }
        });
        self.api::<DashApplication>(&ns)
            .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| classify("DashApplication", &name, e))
    }

    async fn update_status(
        &self,
        owner: &DashApplication,
        status: &DashApplicationStatus,
    ) -> Result<(), StoreError> {
        let ns = owner.namespace().unwrap_or_else(|| "default".to_string());
        let name = owner.name_any();
        let patch = json!({ "status": status });
        self.api::<DashApplication>(&ns)
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map(|_| ())
            .map_err(|e| classify("DashApplication", &name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_err(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: format!("{} error", reason),
            reason: reason.into(),
            code,
        })
    }

    #[test]
    fn classifies_api_errors() {
        assert!(classify("Service", "demo", api_err(404, "NotFound")).is_not_found());
        assert!(matches!(
            classify("Service", "demo", api_err(409, "AlreadyExists")),
            StoreError::AlreadyExists { .. }
        ));
        assert!(matches!(
            classify("Service", "demo", api_err(409, "Conflict")),
            StoreError::Conflict(_)
        ));
        assert!(matches!(
            classify("Service", "demo", api_err(500, "InternalError")),
            StoreError::Kube(_)
        ));
    }
}
