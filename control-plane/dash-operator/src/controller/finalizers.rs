//! Per-kind cleanup protection held on the owner.
//!
//! A finalizer for kind K is present iff K was created by us and has not been
//! confirmed deleted. Teardown consults only this ledger, never live state.

use super::store::ChildKind;

pub const ROUTE_FINALIZER: &str = "pluralsh.dash-controller/ingress-protection";
pub const ENDPOINT_FINALIZER: &str = "pluralsh.dash-controller/service-protection";
pub const WORKLOAD_FINALIZER: &str = "pluralsh.dash-controller/deployment-protection";

/// Routing goes first so traffic stops before its backend disappears.
pub const TEARDOWN_ORDER: [ChildKind; 3] =
    [ChildKind::Route, ChildKind::Endpoint, ChildKind::Workload];

pub fn finalizer_for(kind: ChildKind) -> &'static str {
    match kind {
        ChildKind::Workload => WORKLOAD_FINALIZER,
        ChildKind::Endpoint => ENDPOINT_FINALIZER,
        ChildKind::Route => ROUTE_FINALIZER,
    }
}

/// Read-only view over an owner's finalizer list.
#[derive(Debug, Clone, Copy)]
pub struct FinalizerLedger<'a> {
    finalizers: &'a [String],
}

impl<'a> FinalizerLedger<'a> {
    pub fn new(finalizers: Option<&'a Vec<String>>) -> Self {
        Self {
            finalizers: finalizers.map(Vec::as_slice).unwrap_or_default(),
        }
    }

    pub fn holds(&self, kind: ChildKind) -> bool {
        let token = finalizer_for(kind);
        self.finalizers.iter().any(|f| f == token)
    }

    /// Kinds still awaiting cleanup, in teardown order.
    pub fn pending_teardown(&self) -> Vec<ChildKind> {
        TEARDOWN_ORDER.into_iter().filter(|k| self.holds(*k)).collect()
    }

    /// List with `kind` added, or `None` if it is already held.
    pub fn acquire(&self, kind: ChildKind) -> Option<Vec<String>> {
        if self.holds(kind) {
            return None;
        }
        let mut next = self.finalizers.to_vec();
        next.push(finalizer_for(kind).to_string());
        Some(next)
    }

    /// List with `kind` removed, or `None` if it is not held. Finalizers
    /// owned by other controllers are kept.
    pub fn release(&self, kind: ChildKind) -> Option<Vec<String>> {
        if !self.holds(kind) {
            return None;
        }
        let token = finalizer_for(kind);
        Some(
            self.finalizers
                .iter()
                .filter(|f| f.as_str() != token)
                .cloned()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_is_idempotent() {
        let empty = FinalizerLedger::new(None);
        let next = empty.acquire(ChildKind::Workload).unwrap();
        assert_eq!(next, vec![WORKLOAD_FINALIZER.to_string()]);

        let held = FinalizerLedger::new(Some(&next));
        assert!(held.holds(ChildKind::Workload));
        assert!(held.acquire(ChildKind::Workload).is_none());
    }

    #[test]
    fn release_keeps_foreign_finalizers() {
        let list = vec![
            "example.com/other".to_string(),
            ENDPOINT_FINALIZER.to_string(),
        ];
        let ledger = FinalizerLedger::new(Some(&list));
        assert_eq!(
            ledger.release(ChildKind::Endpoint).unwrap(),
            vec!["example.com/other".to_string()]
        );
        assert!(ledger.release(ChildKind::Route).is_none());
    }

    #[test]
    fn pending_teardown_follows_fixed_order() {
        let list = vec![
            WORKLOAD_FINALIZER.to_string(),
            ENDPOINT_FINALIZER.to_string(),
            ROUTE_FINALIZER.to_string(),
        ];
        let ledger = FinalizerLedger::new(Some(&list));
        assert_eq!(
            ledger.pending_teardown(),
            vec![ChildKind::Route, ChildKind::Endpoint, ChildKind::Workload]
        );

        let partial = vec![WORKLOAD_FINALIZER.to_string()];
        assert_eq!(
            FinalizerLedger::new(Some(&partial)).pending_teardown(),
            vec![ChildKind::Workload]
        );
    }
}
