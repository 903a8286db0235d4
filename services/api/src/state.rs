use std::sync::Arc;

use common::store::DocumentStore;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::crud::{CrudService, Resource};
use crate::email::Mailer;
use crate::jwt::JwtService;
use crate::orders::OrderService;
use crate::payment::PaymentGateway;
use crate::repositories::UserRepository;

/// Everything the routers need, cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn DocumentStore>,
    pub users: UserRepository,
    pub auth_service: AuthService,
    pub orders: OrderService,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        jwt: JwtService,
        mailer: Arc<dyn Mailer>,
        gateway: Arc<dyn PaymentGateway>,
        config: AppConfig,
    ) -> Self {
        crate::error::set_production_mode(config.is_production());

        let users = UserRepository::new(store.as_ref());
        let auth_service = AuthService::new(
            users.clone(),
            jwt,
            mailer,
            config.frontend_url.clone(),
        );
        let orders = OrderService::new(
            store.as_ref(),
            users.clone(),
            gateway.clone(),
            config.frontend_url.clone(),
        );

        Self {
            users,
            auth_service,
            orders,
            gateway,
            store,
            config,
        }
    }

    /// CRUD façade over one resource collection. Collections are cheap
    /// handles, so services are built per call.
    pub fn crud<R: Resource>(&self) -> CrudService<R> {
        CrudService::new(self.store.as_ref())
    }
}
