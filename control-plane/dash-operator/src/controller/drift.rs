//! Field-level comparison between a rendered child and its observed state.
//!
//! Each `diff_*` function walks a fixed allow-list of fields, copies the
//! desired value onto `observed` for every mismatch and reports the field
//! names it touched. Anything outside the allow-list (server defaults,
//! status, annotations added by other controllers) is left as observed, so
//! the patched object can be written back as-is.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, EnvVar, Service};
use k8s_openapi::api::networking::v1::{HTTPIngressPath, Ingress, IngressRule};

use super::store::ChildResource;
use crate::templates::ROUTE_PREFIX_ENV;

/// Fields that were copied from desired onto observed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    pub fields: Vec<&'static str>,
}

impl Drift {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn record(&mut self, field: &'static str, changed: bool) {
        if changed {
            self.fields.push(field);
        }
    }
}

/// Overwrite `observed` with `desired` when they differ.
fn sync<T: PartialEq + Clone>(desired: &T, observed: &mut T) -> bool {
    if desired != observed {
        *observed = desired.clone();
        true
    } else {
        false
    }
}

/// Ensure every desired annotation is present with its desired value.
/// Keys set by other actors are preserved.
fn sync_annotations(
    desired: Option<&BTreeMap<String, String>>,
    observed: &mut Option<BTreeMap<String, String>>,
) -> bool {
    let Some(desired) = desired else {
        return false;
    };
    let mut changed = false;
    let current = observed.get_or_insert_with(BTreeMap::new);
    for (k, v) in desired {
        if current.get(k) != Some(v) {
            current.insert(k.clone(), v.clone());
            changed = true;
        }
    }
    if current.is_empty() {
        *observed = None;
    }
    changed
}

fn find_container<'a>(containers: &'a [Container], name: &str) -> Option<&'a Container> {
    containers.iter().find(|c| c.name == name)
}

fn prefix_env(container: &Container) -> Option<&EnvVar> {
    container
        .env
        .as_ref()
        .and_then(|env| env.iter().find(|e| e.name == ROUTE_PREFIX_ENV))
}

/// Bring the route prefix variable in line with `desired`, leaving other
/// env entries alone.
fn sync_prefix_env(desired: Option<&EnvVar>, observed: &mut Container) -> bool {
    if prefix_env(observed) == desired {
        return false;
    }
    let env = observed.env.get_or_insert_with(Vec::new);
    env.retain(|e| e.name != ROUTE_PREFIX_ENV);
    if let Some(var) = desired {
        env.push(var.clone());
    }
    if env.is_empty() {
        observed.env = None;
    }
    true
}

/// Workload allow-list: replicas, and for the container named `container`:
/// image, command, args, ports and the route prefix env var.
pub fn diff_workload(desired: &Deployment, observed: &mut Deployment, container: &str) -> Drift {
    let mut drift = Drift::default();
    let Some(want) = desired.spec.as_ref() else {
        return drift;
    };
    let Some(have) = observed.spec.as_mut() else {
        observed.spec = Some(want.clone());
        drift.record("spec", true);
        return drift;
    };

    drift.record("replicas", sync(&want.replicas, &mut have.replicas));

    let Some(want_c) = want
        .template
        .spec
        .as_ref()
        .and_then(|p| find_container(&p.containers, container))
    else {
        return drift;
    };
    let pod = have.template.spec.get_or_insert_with(Default::default);
    match pod.containers.iter_mut().find(|c| c.name == container) {
        Some(have_c) => {
            drift.record("image", sync(&want_c.image, &mut have_c.image));
            drift.record("command", sync(&want_c.command, &mut have_c.command));
            drift.record("args", sync(&want_c.args, &mut have_c.args));
            drift.record("ports", sync(&want_c.ports, &mut have_c.ports));
            drift.record("env", sync_prefix_env(prefix_env(want_c), have_c));
        }
        None => {
            pod.containers.push(want_c.clone());
            drift.record("containers", true);
        }
    }
    drift
}

/// Endpoint allow-list: annotations and exposure mode.
pub fn diff_endpoint(desired: &Service, observed: &mut Service) -> Drift {
    let mut drift = Drift::default();
    drift.record(
        "annotations",
        sync_annotations(desired.metadata.annotations.as_ref(), &mut observed.metadata.annotations),
    );
    let want_type = desired.spec.as_ref().and_then(|s| s.type_.clone());
    if want_type.is_some() {
        let have = observed.spec.get_or_insert_with(Default::default);
        drift.record("type", sync(&want_type, &mut have.type_));
    }
    drift
}

fn backend_name(path: &HTTPIngressPath) -> Option<&str> {
    path.backend.service.as_ref().map(|s| s.name.as_str())
}

/// A rule is ours when one of its paths targets the owner's Service.
fn is_owned_rule(rule: &IngressRule, owner: &str) -> bool {
    rule.http
        .as_ref()
        .is_some_and(|h| h.paths.iter().any(|p| backend_name(p) == Some(owner)))
}

/// Route allow-list: annotations, class name, and host plus owned paths of
/// the owned rule.
///
/// The owned rule is found by its backend, not by position, so rules and
/// paths added by other actors are neither compared nor overwritten. When no
/// rule targets the owner's Service the rule on the desired host is taken
/// over and its path rewritten in place.
pub fn diff_route(desired: &Ingress, observed: &mut Ingress, owner: &str) -> Drift {
    let mut drift = Drift::default();
    drift.record(
        "annotations",
        sync_annotations(desired.metadata.annotations.as_ref(), &mut observed.metadata.annotations),
    );
    let Some(want) = desired.spec.as_ref() else {
        return drift;
    };
    let have = observed.spec.get_or_insert_with(Default::default);

    // An unset class may have been defaulted by admission.
    if want.ingress_class_name.is_some() {
        drift.record(
            "ingressClassName",
            sync(&want.ingress_class_name, &mut have.ingress_class_name),
        );
    }

    let Some(want_rule) = want
        .rules
        .as_ref()
        .and_then(|r| r.iter().find(|r| is_owned_rule(r, owner)))
    else {
        return drift;
    };
    let rules = have.rules.get_or_insert_with(Vec::new);
    // A retargeted backend hides the marker; fall back to the desired host.
    let idx = rules
        .iter()
        .position(|r| is_owned_rule(r, owner))
        .or_else(|| rules.iter().position(|r| r.host == want_rule.host));
    let Some(idx) = idx else {
        rules.push(want_rule.clone());
        drift.record("rules", true);
        return drift;
    };
    let have_rule = &mut rules[idx];

    drift.record("host", sync(&want_rule.host, &mut have_rule.host));

    let want_paths = want_rule.http.as_ref().map(|h| h.paths.as_slice()).unwrap_or_default();
    // Ours: paths on our backend, plus any path sitting on one of our path values.
    let claimed = |p: &HTTPIngressPath| {
        backend_name(p) == Some(owner) || want_paths.iter().any(|w| w.path == p.path)
    };
    match have_rule.http.as_mut() {
        Some(http) => {
            let owned: Vec<&HTTPIngressPath> = http.paths.iter().filter(|p| claimed(*p)).collect();
            let matches = owned.len() == want_paths.len()
                && owned.iter().zip(want_paths).all(|(a, b)| *a == b);
            if !matches {
                let foreign = http.paths.drain(..).filter(|p| !claimed(p));
                let mut paths = want_paths.to_vec();
                paths.extend(foreign);
                http.paths = paths;
                drift.record("paths", true);
            }
        }
        None => {
            have_rule.http = want_rule.http.clone();
            drift.record("paths", true);
        }
    }
    drift
}

/// Dispatch on kind. `None` when desired and observed are different kinds.
pub fn detect(desired: &ChildResource, observed: &mut ChildResource, owner: &str) -> Option<Drift> {
    match (desired, observed) {
        (ChildResource::Workload(want), ChildResource::Workload(have)) => {
            Some(diff_workload(want, have, owner))
        }
        (ChildResource::Endpoint(want), ChildResource::Endpoint(have)) => {
            Some(diff_endpoint(want, have))
        }
        (ChildResource::Route(want), ChildResource::Route(have)) => {
            Some(diff_route(want, have, owner))
        }
        _ => None,
    }
}
