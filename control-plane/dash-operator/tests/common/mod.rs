#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dash_operator::controller::store::{ChildKind, ChildResource, ResourceStore, StoreError};
use dash_operator::crd::dash_application::{
    ContainerSpec, DashApplication, DashApplicationSpec, DashApplicationStatus, IngressSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

pub const NS: &str = "apps";
pub const NAME: &str = "demo";

/// Mutating calls as seen by the store, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(ChildKind),
    Update(ChildKind),
    Delete(ChildKind),
    Finalizers(Vec<String>),
    Status(bool),
}

#[derive(Default)]
struct State {
    owner: Option<DashApplication>,
    children: BTreeMap<ChildKind, ChildResource>,
    calls: Vec<Call>,
    delete_failures: BTreeMap<ChildKind, usize>,
    resource_version: u64,
}

impl State {
    fn bump(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// In-memory stand-in for the API server: optimistic concurrency on owner
/// writes, owner removal once a deleting owner has no finalizers left, and
/// injectable delete failures.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

impl FakeStore {
    pub fn with_owner(spec: DashApplicationSpec) -> Self {
        let store = FakeStore::default();
        {
            let mut st = store.state.lock().unwrap();
            let mut owner = DashApplication::new(NAME, spec);
            owner.metadata.namespace = Some(NS.into());
            owner.metadata.uid = Some("0b7c-uid".into());
            owner.metadata.resource_version = Some(st.bump());
            st.owner = Some(owner);
        }
        store
    }

    pub fn owner(&self) -> Option<DashApplication> {
        self.state.lock().unwrap().owner.clone()
    }

    pub fn finalizers(&self) -> Vec<String> {
        self.owner()
            .and_then(|o| o.metadata.finalizers)
            .unwrap_or_default()
    }

    pub fn set_spec(&self, spec: DashApplicationSpec) {
        let mut st = self.state.lock().unwrap();
        let rv = st.bump();
        let owner = st.owner.as_mut().expect("owner present");
        owner.spec = spec;
        owner.metadata.resource_version = Some(rv);
    }

    pub fn mark_deleting(&self) {
        let mut st = self.state.lock().unwrap();
        let rv = st.bump();
        let owner = st.owner.as_mut().expect("owner present");
        owner.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
        owner.metadata.resource_version = Some(rv);
    }

    pub fn child(&self, kind: ChildKind) -> Option<ChildResource> {
        self.state.lock().unwrap().children.get(&kind).cloned()
    }

    /// Write a child directly, bypassing the call log (an external actor).
    pub fn put_child(&self, obj: ChildResource) {
        self.state.lock().unwrap().children.insert(obj.kind(), obj);
    }

    pub fn remove_child(&self, kind: ChildKind) {
        self.state.lock().unwrap().children.remove(&kind);
    }

    pub fn fail_deletes(&self, kind: ChildKind, times: usize) {
        self.state.lock().unwrap().delete_failures.insert(kind, times);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn deletes(&self) -> Vec<ChildKind> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(k) => Some(k),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl ResourceStore for FakeStore {
    async fn get_owner(&self, _ns: &str, _name: &str) -> Result<Option<DashApplication>, StoreError> {
        Ok(self.owner())
    }

    async fn get(&self, kind: ChildKind, _ns: &str, _name: &str) -> Result<Option<ChildResource>, StoreError> {
        Ok(self.child(kind))
    }

    async fn create(&self, obj: &ChildResource) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Create(obj.kind()));
        if st.children.contains_key(&obj.kind()) {
            return Err(StoreError::AlreadyExists {
                kind: obj.kind().to_string(),
                name: obj.name().to_string(),
            });
        }
        st.children.insert(obj.kind(), obj.clone());
        Ok(())
    }

    async fn update(&self, obj: &ChildResource) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Update(obj.kind()));
        if !st.children.contains_key(&obj.kind()) {
            return Err(StoreError::NotFound {
                kind: obj.kind().to_string(),
                name: obj.name().to_string(),
            });
        }
        st.children.insert(obj.kind(), obj.clone());
        Ok(())
    }

    async fn delete(&self, kind: ChildKind, _ns: &str, name: &str) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Delete(kind));
        if let Some(left) = st.delete_failures.get_mut(&kind) {
            if *left > 0 {
                *left -= 1;
                return Err(StoreError::Conflict(format!("injected failure deleting {}", kind)));
            }
        }
        match st.children.remove(&kind) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            }),
        }
    }

    async fn update_finalizers(
        &self,
        owner: &DashApplication,
        finalizers: Vec<String>,
    ) -> Result<DashApplication, StoreError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Finalizers(finalizers.clone()));
        let current_rv = st.owner.as_ref().and_then(|o| o.metadata.resource_version.clone());
        if current_rv != owner.metadata.resource_version {
            return Err(StoreError::Conflict("resourceVersion mismatch".into()));
        }
        let rv = st.bump();
        let stored = st.owner.as_mut().expect("owner present");
        stored.metadata.finalizers = Some(finalizers);
        stored.metadata.resource_version = Some(rv);
        let persisted = stored.clone();
        let gone = stored.metadata.deletion_timestamp.is_some()
            && stored.metadata.finalizers.as_ref().is_none_or(|f| f.is_empty());
        if gone {
            st.owner = None;
        }
        Ok(persisted)
    }

    async fn update_status(
        &self,
        _owner: &DashApplication,
        status: &DashApplicationStatus,
    ) -> Result<(), StoreError> {
        let mut st = self.state.lock().unwrap();
        st.calls.push(Call::Status(status.ready));
        let stored = st.owner.as_mut().expect("owner present");
        stored.status = Some(status.clone());
        Ok(())
    }
}

pub fn app_spec(image: &str, port: i32) -> DashApplicationSpec {
    DashApplicationSpec {
        container: ContainerSpec {
            image: image.into(),
            container_port: port,
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn with_route(mut spec: DashApplicationSpec, path: Option<&str>) -> DashApplicationSpec {
    spec.ingress = Some(IngressSpec {
        host: Some("dash.example.com".into()),
        path: path.map(str::to_string),
        ..Default::default()
    });
    spec
}
