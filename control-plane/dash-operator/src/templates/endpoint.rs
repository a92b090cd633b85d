use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::labels::selector_labels;
use super::{ENDPOINT_PORT, RenderContext};

pub const EXPOSURE_LOAD_BALANCER: &str = "LoadBalancer";
pub const EXPOSURE_CLUSTER_IP: &str = "ClusterIP";

/// Exposure mode: load balanced only when no route fronts the application.
/// Adding a route switches the Service to cluster-internal.
pub fn exposure_mode(ctx: &RenderContext<'_>) -> &'static str {
    if ctx.spec.ingress.is_some() {
        EXPOSURE_CLUSTER_IP
    } else {
        EXPOSURE_LOAD_BALANCER
    }
}

pub fn render_endpoint(ctx: &RenderContext<'_>) -> Service {
    Service {
        metadata: ctx.child_meta(
            selector_labels(ctx.name),
            ctx.spec.service_annotations.clone(),
        ),
        spec: Some(ServiceSpec {
            type_: Some(exposure_mode(ctx).to_string()),
            selector: Some(selector_labels(ctx.name)),
            ports: Some(vec![ServicePort {
                protocol: Some("TCP".to_string()),
                port: ENDPOINT_PORT,
                target_port: Some(IntOrString::String(ctx.name.to_string())),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
