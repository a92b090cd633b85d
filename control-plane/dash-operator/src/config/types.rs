use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct OperatorConfig {
    /// Port for the /health endpoints.
    #[envconfig(from = "DASH_OPERATOR_HTTP_PORT", default = "8081")]
    pub http_port: u16,

    /// Restrict the controller to one namespace. Unset or empty watches all.
    #[envconfig(from = "DASH_OPERATOR_WATCH_NAMESPACE")]
    pub watch_namespace: Option<String>,

    /// Resync interval after a successful reconcile, in seconds.
    #[envconfig(from = "DASH_OPERATOR_REQUEUE_SECS", default = "300")]
    pub requeue_secs: u64,

    /// Delay before retrying a failed reconcile, in seconds.
    #[envconfig(from = "DASH_OPERATOR_ERROR_REQUEUE_SECS", default = "15")]
    pub error_requeue_secs: u64,

    /// Publish Kubernetes Events for child create/update/delete.
    #[envconfig(from = "DASH_OPERATOR_EVENTS", default = "true")]
    pub events: bool,
}

impl OperatorConfig {
    pub fn watch_namespace(&self) -> Option<String> {
        self.watch_namespace
            .as_deref()
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string)
    }
}
