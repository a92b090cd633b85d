//! The seam between the convergence core and the Kubernetes API.
//!
//! The orchestrator only ever talks to a [`ResourceStore`]; the production
//! implementation lives in [`super::kube_store`], tests plug in fakes.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

#[cfg(test)]
use mockall::automock;

use crate::crd::dash_application::{DashApplication, DashApplicationStatus};

/// The three kinds of child resource managed per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKind {
    Workload,
    Endpoint,
    Route,
}

impl ChildKind {
    /// Kubernetes kind backing this child.
    pub fn k8s_kind(&self) -> &'static str {
        match self {
            ChildKind::Workload => "Deployment",
            ChildKind::Endpoint => "Service",
            ChildKind::Route => "Ingress",
        }
    }
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.k8s_kind())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChildResource {
    Workload(Deployment),
    Endpoint(Service),
    Route(Ingress),
}

impl ChildResource {
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildResource::Workload(_) => ChildKind::Workload,
            ChildResource::Endpoint(_) => ChildKind::Endpoint,
            ChildResource::Route(_) => ChildKind::Route,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ChildResource::Workload(d) => &d.metadata,
            ChildResource::Endpoint(s) => &s.metadata,
            ChildResource::Route(i) => &i.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.metadata().namespace.as_deref().unwrap_or("default")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: String, name: String },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("kube api error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Single-object reads and writes against the shared resource store.
///
/// Reads report absence as `Ok(None)`. Writes never retry; conflicts come
/// back as [`StoreError::Conflict`] and are resolved by reconciling again.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get_owner(
        &self,
        ns: &str,
        name: &str,
    ) -> Result<Option<DashApplication>, StoreError>;

    async fn get(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<Option<ChildResource>, StoreError>;

    async fn create(&self, obj: &ChildResource) -> Result<(), StoreError>;

    async fn update(&self, obj: &ChildResource) -> Result<(), StoreError>;

    /// Fails with [`StoreError::NotFound`] when the object is already gone.
    async fn delete(
        &self,
        kind: ChildKind,
        ns: &str,
        name: &str,
    ) -> Result<(), StoreError>;

    /// Replace the owner's finalizer list, guarded by the owner's
    /// resourceVersion. Returns the owner as persisted.
    async fn update_finalizers(
        &self,
        owner: &DashApplication,
        finalizers: Vec<String>,
    ) -> Result<DashApplication, StoreError>;

    async fn update_status(
        &self,
        owner: &DashApplication,
        status: &DashApplicationStatus,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_resource_reports_identity() {
        let svc = Service {
            metadata: ObjectMeta {
                name: Some("demo".into()),
                namespace: Some("apps".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let child = ChildResource::Endpoint(svc);
        assert_eq!(child.kind(), ChildKind::Endpoint);
        assert_eq!(child.name(), "demo");
        assert_eq!(child.namespace(), "apps");
        assert_eq!(child.kind().to_string(), "Service");
    }

    #[test]
    fn only_not_found_is_not_found() {
        let nf = StoreError::NotFound { kind: "Service".into(), name: "demo".into() };
        assert!(nf.is_not_found());
        assert!(!StoreError::Conflict("rv".into()).is_not_found());
    }
}
