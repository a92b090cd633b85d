use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};

use super::labels::selector_labels;
use super::{ENDPOINT_PORT, RenderContext};

pub const PATH_TYPE_PREFIX: &str = "Prefix";

/// The single path the route owns, pointing at the owner's Service.
pub fn owned_path(ctx: &RenderContext<'_>, path: &str) -> HTTPIngressPath {
    HTTPIngressPath {
        path: Some(path.to_string()),
        path_type: PATH_TYPE_PREFIX.to_string(),
        backend: IngressBackend {
            service: Some(IngressServiceBackend {
                name: ctx.name.to_string(),
                port: Some(ServiceBackendPort {
                    number: Some(ENDPOINT_PORT),
                    name: None,
                }),
            }),
            resource: None,
        },
    }
}

pub fn render_route(ctx: &RenderContext<'_>) -> Option<Ingress> {
    let spec = ctx.spec.ingress.as_ref()?;
    let tls = spec.tls.as_ref().map(|t| {
        vec![IngressTLS {
            hosts: t
                .hosts
                .as_ref()
                .filter(|h| !h.is_empty())
                .map(|h| vec![h.clone()]),
            secret_name: t.secret_name.clone().filter(|s| !s.is_empty()),
        }]
    });

    Some(Ingress {
        metadata: ctx.child_meta(selector_labels(ctx.name), spec.annotations.clone()),
        spec: Some(IngressSpec {
            ingress_class_name: spec.ingress_class_name.clone(),
            rules: Some(vec![IngressRule {
                host: spec.host.clone().filter(|h| !h.is_empty()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![owned_path(ctx, spec.effective_path())],
                }),
            }]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    })
}
