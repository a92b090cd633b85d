pub mod drift;
pub mod events;
pub mod finalizers;
pub mod kube_store;
pub mod reconcile;
pub mod store;

use std::sync::Arc;

use futures_util::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::events::{Recorder, Reporter};
use kube::{
    Client, ResourceExt,
    api::Api,
    runtime::{Controller, controller::Action, watcher::Config},
};
use tokio::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::dash_application::DashApplication;
use kube_store::KubeStore;
use reconcile::reconcile_application;
use store::StoreError;

const CONTROLLER_NAME: &str = "dash-operator";

#[derive(thiserror::Error, Debug)]
pub enum ReconcileErr {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone)]
pub struct ControllerContext {
    pub store: Arc<KubeStore>,
    pub cfg: OperatorConfig,
    pub recorder: Option<Recorder>,
}

impl ControllerContext {
    pub fn new(client: Client, cfg: OperatorConfig) -> Self {
        let recorder = cfg.events.then(|| {
            Recorder::new(
                client.clone(),
                Reporter {
                    controller: CONTROLLER_NAME.into(),
                    instance: std::env::var("POD_NAME").ok(),
                },
            )
        });
        Self {
            store: Arc::new(KubeStore::new(client)),
            cfg,
            recorder,
        }
    }
}

fn scoped_api<K>(client: &Client, ns: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    <K as kube::Resource>::DynamicType: Default,
{
    match ns {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Watch DashApplications (and the children they own) and reconcile each
/// one as it changes. Runs until the watch stream ends.
pub async fn run_controller(client: Client, cfg: OperatorConfig) -> anyhow::Result<()> {
    let ns = cfg.watch_namespace();
    info!(namespace = ns.as_deref().unwrap_or("*"), "starting DashApplication controller");
    let apps: Api<DashApplication> = scoped_api(&client, ns.as_deref());
    let ctx = Arc::new(ControllerContext::new(client.clone(), cfg.clone()));

    Controller::new(apps, Config::default())
        .owns(scoped_api::<Deployment>(&client, ns.as_deref()), Config::default())
        .owns(scoped_api::<Service>(&client, ns.as_deref()), Config::default())
        .owns(scoped_api::<Ingress>(&client, ns.as_deref()), Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj_ref, action)) => {
                    info!(object = %obj_ref, "reconciled: requeue={:?}", action)
                }
                Err(e) => error!(error = ?e, "reconcile error"),
            }
        })
        .await;

    Ok(())
}

/// Framework callback. The cached object only supplies the identity; the
/// core re-reads the owner from the API server.
#[instrument(skip_all, fields(ns = %obj.namespace().unwrap_or_else(|| "default".into()), name = %obj.name_any()))]
pub async fn reconcile(
    obj: Arc<DashApplication>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileErr> {
    let ns = obj.namespace().unwrap_or_else(|| "default".to_string());
    let name = obj.name_any();

    let outcome = reconcile_application(ctx.store.as_ref(), &ns, &name).await?;
    if let Some(recorder) = ctx.recorder.as_ref() {
        events::publish_outcome(recorder, obj.as_ref(), &outcome).await;
    }

    if outcome.deleting {
        return Ok(Action::await_change());
    }
    Ok(Action::requeue(Duration::from_secs(ctx.cfg.requeue_secs)))
}

pub fn error_policy(
    obj: Arc<DashApplication>,
    error: &ReconcileErr,
    ctx: Arc<ControllerContext>,
) -> Action {
    warn!(name = %obj.name_any(), error = %error, "reconcile failed; requeueing");
    Action::requeue(Duration::from_secs(ctx.cfg.error_requeue_secs))
}
