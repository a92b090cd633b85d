use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

use super::labels::{app_labels, selector_labels};
use super::{RenderContext, non_empty_vec};

/// Env var advertising a non-root route prefix to the application.
pub const ROUTE_PREFIX_ENV: &str = "DASH_ROUTES_PATHNAME_PREFIX";

const DEFAULT_REPLICAS: i32 = 1;

/// Value of [`ROUTE_PREFIX_ENV`] for the owner, if the route has a non-root
/// path. Ties the workload to the route config: a path change must roll the
/// pods.
pub fn route_prefix(ctx: &RenderContext<'_>) -> Option<String> {
    ctx.spec
        .ingress
        .as_ref()
        .and_then(|i| i.configured_path())
        .filter(|p| *p != "/")
        .map(|p| format!("{}/", p))
}

pub fn render_workload(ctx: &RenderContext<'_>) -> Deployment {
    let spec = ctx.spec;
    let labels = app_labels(ctx.name, spec.labels.as_ref());
    let env = route_prefix(ctx).map(|value| {
        vec![EnvVar {
            name: ROUTE_PREFIX_ENV.to_string(),
            value: Some(value),
            value_from: None,
        }]
    });

    let container = Container {
        name: ctx.name.to_string(),
        image: Some(spec.container.image.clone()),
        image_pull_policy: Some("Always".to_string()),
        command: non_empty_vec(spec.container.command.clone()),
        args: non_empty_vec(spec.container.args.clone()),
        ports: Some(vec![ContainerPort {
            name: Some(ctx.name.to_string()),
            container_port: spec.container.container_port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        env,
        ..Default::default()
    };

    Deployment {
        metadata: ctx.child_meta(labels.clone(), None),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas.unwrap_or(DEFAULT_REPLICAS)),
            selector: LabelSelector {
                match_labels: Some(selector_labels(ctx.name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
