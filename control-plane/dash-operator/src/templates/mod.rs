//! Desired-state rendering for a `DashApplication`.
//!
//! Everything here is a pure function of the owner: no I/O, no clock, no
//! randomness. The same owner always renders the same children, which is what
//! lets the drift detector compare observed state against a fresh render on
//! every reconcile.

pub mod endpoint;
pub mod labels;
pub mod route;
pub mod workload;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;

use crate::crd::dash_application::{DashApplication, DashApplicationSpec};

pub use endpoint::render_endpoint;
pub use labels::{IDENTITY_LABEL, app_labels, selector_labels};
pub use route::render_route;
pub use workload::{ROUTE_PREFIX_ENV, render_workload};

/// Port the Service exposes and the Ingress backend targets.
pub const ENDPOINT_PORT: i32 = 80;

const OWNER_API_VERSION: &str = "dash.plural.sh/v1alpha1";
const OWNER_KIND: &str = "DashApplication";

#[derive(Clone, Debug)]
pub struct RenderContext<'a> {
    pub name: &'a str,
    pub namespace: &'a str,
    pub owner_uid: Option<&'a str>,
    pub spec: &'a DashApplicationSpec,
}

impl<'a> RenderContext<'a> {
    pub fn from_owner(app: &'a DashApplication, namespace: &'a str) -> Self {
        Self {
            name: app.metadata.name.as_deref().unwrap_or_default(),
            namespace,
            owner_uid: app.metadata.uid.as_deref(),
            spec: &app.spec,
        }
    }

    /// Metadata shared by every child: owner name and namespace, plus a
    /// controller reference when the owner has been persisted.
    pub(crate) fn child_meta(
        &self,
        labels: std::collections::BTreeMap<String, String>,
        annotations: Option<std::collections::BTreeMap<String, String>>,
    ) -> ObjectMeta {
        ObjectMeta {
            name: Some(self.name.to_string()),
            namespace: Some(self.namespace.to_string()),
            labels: Some(labels),
            annotations: non_empty_map(annotations),
            owner_references: self.owner_reference().map(|r| vec![r]),
            ..Default::default()
        }
    }

    fn owner_reference(&self) -> Option<OwnerReference> {
        self.owner_uid.map(|uid| OwnerReference {
            api_version: OWNER_API_VERSION.to_string(),
            kind: OWNER_KIND.to_string(),
            name: self.name.to_string(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        })
    }
}

#[derive(Clone, Debug)]
pub struct RenderedResources {
    pub workload: Deployment,
    pub endpoint: Service,
    pub route: Option<Ingress>,
}

pub fn render(ctx: &RenderContext<'_>) -> RenderedResources {
    RenderedResources {
        workload: render_workload(ctx),
        endpoint: render_endpoint(ctx),
        route: render_route(ctx),
    }
}

/// Render all children of `app`. Children live in the owner's namespace,
/// falling back to "default" for objects that have not been persisted yet.
pub fn render_application(app: &DashApplication) -> RenderedResources {
    let ns = app.namespace().unwrap_or_else(|| "default".to_string());
    render(&RenderContext::from_owner(app, &ns))
}

// The API server drops empty collections, so rendering them as `None` keeps
// a round-tripped object equal to its render.
pub(crate) fn non_empty_vec<T>(v: Option<Vec<T>>) -> Option<Vec<T>> {
    v.filter(|v| !v.is_empty())
}

pub(crate) fn non_empty_map<K, V>(
    m: Option<std::collections::BTreeMap<K, V>>,
) -> Option<std::collections::BTreeMap<K, V>> {
    m.filter(|m| !m.is_empty())
}


#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn children_share_owner_identity() {
        let app = app("demo", with_route(spec("app:v1", 8080), None));
        let out = render_application(&app);
        for meta in [
            &out.workload.metadata,
            &out.endpoint.metadata,
            &out.route.as_ref().unwrap().metadata,
        ] {
            assert_eq!(meta.name.as_deref(), Some("demo"));
            assert_eq!(meta.namespace.as_deref(), Some("apps"));
        }
    }

    #[test]
    fn owner_reference_only_when_uid_known() {
        let mut app = app("demo", spec("app:v1", 8080));
        assert!(render_application(&app).workload.metadata.owner_references.is_none());

        app.metadata.uid = Some("1234".into());
        let refs = render_application(&app).endpoint.metadata.owner_references.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "1234");
        assert_eq!(refs[0].kind, "DashApplication");
        assert_eq!(refs[0].controller, Some(true));
    }

    #[test]
    fn render_is_deterministic() {
        let app = app("demo", with_route(spec("app:v1", 8080), Some("/v2")));
        let a = serde_json::to_value(render_application(&app).workload).unwrap();
        let b = serde_json::to_value(render_application(&app).workload).unwrap();
        assert_eq!(a, b);
    }
}
