//! Persistence seam for the intake wizard

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::api::client::ApiClient;
use crate::api::error::ApiError;
use crate::api::resources::{Cliente, CrudResource, Plan};

/// Customer writes and plan lookup used by the wizard
#[async_trait]
pub trait ClienteGateway: Send + Sync {
    async fn create_cliente(&self, payload: &Map<String, Value>) -> Result<Cliente, ApiError>;

    async fn update_cliente(
        &self,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Cliente, ApiError>;

    /// Plans that can be offered to a new customer
    async fn active_plans(&self) -> Result<Vec<Plan>, ApiError>;
}

/// HTTP implementation over the customer and plan collections
#[derive(Clone)]
pub struct HttpClienteGateway {
    clientes: CrudResource<Cliente>,
    planes: CrudResource<Plan>,
}

impl HttpClienteGateway {
    pub fn new(client: ApiClient) -> Self {
        Self {
            clientes: CrudResource::new(client.clone()),
            planes: CrudResource::new(client),
        }
    }
}

#[async_trait]
impl ClienteGateway for HttpClienteGateway {
    async fn create_cliente(&self, payload: &Map<String, Value>) -> Result<Cliente, ApiError> {
        self.clientes.create(payload).await
    }

    async fn update_cliente(
        &self,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Cliente, ApiError> {
        self.clientes.update(id, payload).await
    }

    async fn active_plans(&self) -> Result<Vec<Plan>, ApiError> {
        let plans = self.planes.list().await?;
        Ok(plans.into_iter().filter(Plan::is_active).collect())
    }
}

/// Request recorded by [`MockClienteGateway`]
#[derive(Debug, Clone, PartialEq)]
pub struct SavedPayload {
    pub id: Option<i64>,
    pub payload: Map<String, Value>,
}

/// In-memory gateway for tests
///
/// Saved records echo the payload back with an assigned id.
#[derive(Default, Clone)]
pub struct MockClienteGateway {
    plans: Arc<Mutex<Vec<Plan>>>,
    failure: Arc<Mutex<Option<ApiError>>>,
    /// Payloads received, in order
    pub saved: Arc<Mutex<Vec<SavedPayload>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockClienteGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans returned by the listing, active or not
    pub fn with_plans(self, plans: Vec<Plan>) -> Self {
        *lock(&self.plans) = plans;
        self
    }

    /// Make every subsequent save fail with `error`
    pub fn fail_with(&self, error: ApiError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn saved_payloads(&self) -> Vec<SavedPayload> {
        lock(&self.saved).clone()
    }

    fn save(&self, id: Option<i64>, payload: &Map<String, Value>) -> Result<Cliente, ApiError> {
        let mut saved = lock(&self.saved);
        saved.push(SavedPayload {
            id,
            payload: payload.clone(),
        });
        if let Some(err) = lock(&self.failure).clone() {
            return Err(err);
        }

        let assigned = id.unwrap_or(saved.len() as i64);
        let mut record = payload.clone();
        record.insert("id".into(), assigned.into());
        if let Some(plan_id) = payload.get("plan_id").and_then(Value::as_i64) {
            if let Some(plan) = lock(&self.plans).iter().find(|p| p.id == Some(plan_id)) {
                let plan = serde_json::to_value(plan)
                    .map_err(|e| ApiError::decode("/planes/clientes/", e.to_string()))?;
                record.insert("plan".into(), plan);
            }
        }
        serde_json::from_value(Value::Object(record))
            .map_err(|e| ApiError::decode("/planes/clientes/", e.to_string()))
    }
}

#[async_trait]
impl ClienteGateway for MockClienteGateway {
    async fn create_cliente(&self, payload: &Map<String, Value>) -> Result<Cliente, ApiError> {
        self.save(None, payload)
    }

    async fn update_cliente(
        &self,
        id: i64,
        payload: &Map<String, Value>,
    ) -> Result<Cliente, ApiError> {
        self.save(Some(id), payload)
    }

    async fn active_plans(&self) -> Result<Vec<Plan>, ApiError> {
        Ok(lock(&self.plans)
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect())
    }
}
