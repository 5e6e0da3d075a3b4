use polbind_authz::store::{
    BindingStore, IdentityStore, InMemoryBindingStore, InMemoryIdentityStore, InMemoryPolicyStore,
    PolicyStore,
};
use polbind_authz::{
    BindingReconciler, CasbinEvaluator, EngineConfig, EvaluatorPolicyBinder, IdentityService,
    PolicySyncEngine,
};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    pub policies: Arc<dyn PolicyStore>,

    /// Project binding workflow
    pub reconciler: Arc<BindingReconciler>,

    /// Identity hooks running the policy sync
    pub identities: Arc<IdentityService>,

    /// Engine settings the reconciler and sync engine were built with
    pub config: EngineConfig,

    /// Backend holding binding records, for startup logs
    pub binding_store: &'static str,

    /// Server start time for uptime calculation
    pub start_time: Instant,

    /// Application version
    pub version: String,
}

impl AppState {
    pub fn new(
        config: EngineConfig,
        policies: Arc<dyn PolicyStore>,
        bindings: Arc<dyn BindingStore>,
        identities: Arc<dyn IdentityStore>,
        evaluator: Arc<CasbinEvaluator>,
    ) -> Self {
        let reconciler = BindingReconciler::new(policies.clone(), bindings, &config);
        let binder = EvaluatorPolicyBinder::new(policies.clone(), evaluator.clone(), &config);
        let sync = PolicySyncEngine::new(evaluator, Arc::new(binder), policies.clone(), config.clone());

        Self {
            policies,
            reconciler: Arc::new(reconciler),
            identities: Arc::new(IdentityService::new(identities, Arc::new(sync))),
            config,
            binding_store: "memory",
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// State backed by in-memory stores and an empty casbin evaluator
    pub async fn in_memory(config: EngineConfig) -> polbind_authz::Result<Self> {
        let evaluator = Arc::new(CasbinEvaluator::new().await?);
        Ok(Self::new(
            config,
            Arc::new(InMemoryPolicyStore::new()),
            Arc::new(InMemoryBindingStore::new()),
            Arc::new(InMemoryIdentityStore::new()),
            evaluator,
        ))
    }

    /// State whose binding records live in PostgreSQL
    ///
    /// Policies and identities stay in memory. Migrations run on connect.
    #[cfg(feature = "postgres")]
    pub async fn with_postgres(config: EngineConfig, database_url: &str) -> polbind_authz::Result<Self> {
        use polbind_authz::store::PostgresBindingStore;

        let bindings = PostgresBindingStore::connect(database_url).await?;
        bindings.run_migrations().await?;
        tracing::info!("binding store migrations applied");

        let evaluator = Arc::new(CasbinEvaluator::new().await?);
        let mut state = Self::new(
            config,
            Arc::new(InMemoryPolicyStore::new()),
            Arc::new(bindings),
            Arc::new(InMemoryIdentityStore::new()),
            evaluator,
        );
        state.binding_store = "postgres";
        Ok(state)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
