use kube::ResourceExt;
use tracing::{debug, info, instrument};

use super::ReconcileErr;
use super::drift::{Drift, detect};
use super::finalizers::FinalizerLedger;
use super::store::{ChildKind, ChildResource, ResourceStore};
use crate::crd::dash_application::{DashApplication, DashApplicationStatus};
use crate::templates::{RenderedResources, render_application};

/// What a child looked like before this pass touched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildState {
    Absent,
    Matching,
    Drifted,
}

/// A mutating call made against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    Created(ChildKind),
    Updated {
        kind: ChildKind,
        fields: Vec<&'static str>,
    },
    Deleted(ChildKind),
    FinalizerAdded(ChildKind),
    FinalizerRemoved(ChildKind),
    StatusUpdated {
        ready: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Owner was marked for deletion and this pass ran teardown.
    pub deleting: bool,
    /// Per-kind state observed during a converge pass.
    pub states: Vec<(ChildKind, ChildState)>,
    pub actions: Vec<ReconcileAction>,
}

impl ReconcileOutcome {
    /// True when the pass made no writes at all.
    pub fn is_noop(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Converge one owner identity.
///
/// Loads the owner, then either tears its children down (deletion marker
/// set) or creates/patches each child and asserts readiness. Safe to call any
/// number of times; the first failing store call aborts the pass and its
/// error is returned untouched for the caller to requeue.
#[instrument(skip(store), fields(ns = %ns, name = %name))]
pub async fn reconcile_application<S>(
    store: &S,
    ns: &str,
    name: &str,
) -> Result<ReconcileOutcome, ReconcileErr>
where
    S: ResourceStore + ?Sized,
{
    let Some(owner) = store.get_owner(ns, name).await? else {
        debug!("reconcile: owner gone; nothing to do");
        return Ok(ReconcileOutcome::default());
    };

    let mut pass = Pass {
        store,
        ns: ns.to_string(),
        name: name.to_string(),
        owner,
        outcome: ReconcileOutcome::default(),
    };
    if pass.owner.metadata.deletion_timestamp.is_some() {
        info!("reconcile: deletion timestamp detected; starting teardown");
        pass.teardown().await?;
    } else {
        pass.converge().await?;
    }
    Ok(pass.outcome)
}

struct Pass<'a, S: ?Sized> {
    store: &'a S,
    ns: String,
    name: String,
    /// Latest persisted owner; replaced after every finalizer write so the
    /// next conditional write carries a fresh resourceVersion.
    owner: DashApplication,
    outcome: ReconcileOutcome,
}

impl<S> Pass<'_, S>
where
    S: ResourceStore + ?Sized,
{
    fn ledger(&self) -> FinalizerLedger<'_> {
        FinalizerLedger::new(self.owner.metadata.finalizers.as_ref())
    }

    async fn acquire(&mut self, kind: ChildKind) -> Result<(), ReconcileErr> {
        if let Some(next) = self.ledger().acquire(kind) {
            info!(%kind, "finalizer: acquire");
            self.owner = self.store.update_finalizers(&self.owner, next).await?;
            self.outcome.actions.push(ReconcileAction::FinalizerAdded(kind));
        }
        Ok(())
    }

    async fn release(&mut self, kind: ChildKind) -> Result<(), ReconcileErr> {
        if let Some(next) = self.ledger().release(kind) {
            info!(%kind, "finalizer: release");
            self.owner = self.store.update_finalizers(&self.owner, next).await?;
            self.outcome.actions.push(ReconcileAction::FinalizerRemoved(kind));
        }
        Ok(())
    }

    async fn converge(&mut self) -> Result<(), ReconcileErr> {
        let RenderedResources {
            workload,
            endpoint,
            route,
        } = render_application(&self.owner);

        self.converge_child(ChildResource::Workload(workload)).await?;
        self.converge_child(ChildResource::Endpoint(endpoint)).await?;
        match route {
            Some(route) => self.converge_child(ChildResource::Route(route)).await?,
            None => self.prune_route().await?,
        }

        let ready = DashApplicationStatus { ready: true };
        if self.owner.status.as_ref() != Some(&ready) {
            info!(ready = ready.ready, "status: update");
            self.store.update_status(&self.owner, &ready).await?;
            self.outcome
                .actions
                .push(ReconcileAction::StatusUpdated { ready: ready.ready });
        } else {
            debug!("status: unchanged");
        }
        Ok(())
    }

    async fn converge_child(&mut self, desired: ChildResource) -> Result<(), ReconcileErr> {
        let kind = desired.kind();
        let state = match self.store.get(kind, &self.ns, &self.name).await? {
            None => {
                info!(%kind, "child: absent; creating");
                self.store.create(&desired).await?;
                self.outcome.actions.push(ReconcileAction::Created(kind));
                ChildState::Absent
            }
            Some(mut observed) => {
                let drift: Drift = detect(&desired, &mut observed, &self.name).ok_or_else(|| {
                    ReconcileErr::Internal(format!("store returned {} for {}", observed.kind(), kind))
                })?;
                if drift.is_empty() {
                    debug!(%kind, "child: matching");
                    ChildState::Matching
                } else {
                    info!(%kind, fields = ?drift.fields, "child: drifted; updating");
                    self.store.update(&observed).await?;
                    self.outcome.actions.push(ReconcileAction::Updated {
                        kind,
                        fields: drift.fields,
                    });
                    ChildState::Drifted
                }
            }
        };
        // Also covers a child that exists without its finalizer, e.g. after
        // a crash between create and acquire.
        self.acquire(kind).await?;
        self.outcome.states.push((kind, state));
        Ok(())
    }

    /// The route is no longer configured: remove it if we still own one.
    async fn prune_route(&mut self) -> Result<(), ReconcileErr> {
        if self.ledger().holds(ChildKind::Route) {
            info!("child: route no longer configured; deleting");
            self.delete_child(ChildKind::Route).await?;
            return self.release(ChildKind::Route).await;
        }
        // A route created by a pass that failed before its finalizer write is
        // only recognisable by its owner reference.
        let Some(observed) = self.store.get(ChildKind::Route, &self.ns, &self.name).await? else {
            return Ok(());
        };
        if self.owns(&observed) {
            info!("child: unledgered route no longer configured; deleting");
            self.delete_child(ChildKind::Route).await?;
        }
        Ok(())
    }

    fn owns(&self, child: &ChildResource) -> bool {
        let Some(uid) = self.owner.metadata.uid.as_deref() else {
            return false;
        };
        child
            .metadata()
            .owner_references
            .as_ref()
            .is_some_and(|refs| refs.iter().any(|r| r.uid == uid))
    }

    async fn delete_child(&mut self, kind: ChildKind) -> Result<(), ReconcileErr> {
        match self.store.delete(kind, &self.ns, &self.name).await {
            Ok(()) => {
                self.outcome.actions.push(ReconcileAction::Deleted(kind));
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(%kind, "child: already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete children in ledger order, releasing each finalizer only after
    /// its delete is confirmed. Kinds without a finalizer are skipped.
    async fn teardown(&mut self) -> Result<(), ReconcileErr> {
        self.outcome.deleting = true;
        let pending = self.ledger().pending_teardown();
        debug!(owner = %self.owner.name_any(), ?pending, "teardown: pending kinds");
        for kind in pending {
            info!(%kind, "teardown: deleting child");
            self.delete_child(kind).await?;
            self.release(kind).await?;
        }
        Ok(())
    }
}
