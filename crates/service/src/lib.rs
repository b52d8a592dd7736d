//! Service layer providing the CRM's business operations on top of `models`.
//! - One constructor-injected service per entity kind, each holding the connection pool.
//! - Every mutating call takes the caller's user id explicitly.
//! - Errors are `ServiceError`; the HTTP layer maps them to status codes.

use sea_orm::DatabaseConnection;

pub mod errors;
pub mod pagination;
pub mod query;
pub mod bulk;
pub mod lead_scoring;
pub mod user_service;
pub mod company_service;
pub mod contact_service;
pub mod deal_service;
pub mod lead_service;
pub mod task_service;
pub mod activity_service;
#[cfg(test)]
pub mod test_support;

pub use errors::ServiceError;
pub use pagination::{Page, PageMeta, Pagination};

/// All services, built once at startup and shared by reference.
#[derive(Clone)]
pub struct Services {
    pub users: user_service::UserService,
    pub companies: company_service::CompanyService,
    pub contacts: contact_service::ContactService,
    pub deals: deal_service::DealService,
    pub leads: lead_service::LeadService,
    pub tasks: task_service::TaskService,
    pub activities: activity_service::ActivityService,
}

impl Services {
    pub fn new(db: DatabaseConnection, limits: configs::PaginationConfig) -> Self {
        Self {
            users: user_service::UserService::new(db.clone()),
            companies: company_service::CompanyService::new(db.clone(), limits),
            contacts: contact_service::ContactService::new(db.clone(), limits),
            deals: deal_service::DealService::new(db.clone(), limits),
            leads: lead_service::LeadService::new(db.clone(), limits),
            tasks: task_service::TaskService::new(db.clone(), limits),
            activities: activity_service::ActivityService::new(db, limits),
        }
    }
}
