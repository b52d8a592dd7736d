//! OpenAPI description of the CRM API. The `*Doc` types mirror the service inputs
//! for schema generation only; handlers deserialize the service types directly.

use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// `page` is 1-based; `limit` is capped by the `[pagination]` config.
#[derive(IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct ContactFilterDoc {
    /// Matches name, email, phone and company name.
    pub search: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub source: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct CompanyFilterDoc {
    pub search: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub include_inactive: Option<bool>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct DealFilterDoc {
    pub search: Option<String>,
    /// PROSPECTING, QUALIFICATION, PROPOSAL, NEGOTIATION, CLOSED_WON or CLOSED_LOST.
    pub stage: Option<String>,
    pub owner_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub close_from: Option<String>,
    pub close_to: Option<String>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct LeadFilterDoc {
    pub search: Option<String>,
    /// NEW, CONTACTED, QUALIFIED, UNQUALIFIED or CONVERTED.
    pub status: Option<String>,
    pub source: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub min_score: Option<i32>,
    pub created_from: Option<String>,
    pub created_to: Option<String>,
    pub include_converted: Option<bool>,
}

#[derive(IntoParams)]
#[into_params(parameter_in = Query, rename_all = "camelCase")]
pub struct TaskFilterDoc {
    pub search: Option<String>,
    /// PENDING, IN_PROGRESS, COMPLETED or CANCELLED.
    pub status: Option<String>,
    /// LOW, MEDIUM, HIGH or URGENT.
    pub priority: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub due_from: Option<String>,
    pub due_to: Option<String>,
    pub overdue: Option<bool>,
    pub include_completed: Option<bool>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateContactDoc {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct UpdateContactDoc {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub source: Option<String>,
    pub notes: Option<String>,
    pub company_id: Option<Uuid>,
    pub assigned_to_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateCompanyDoc {
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub size: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub description: Option<String>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateDealDoc {
    pub title: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub stage: Option<String>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<String>,
    pub description: Option<String>,
    pub lost_reason: Option<String>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateLeadDoc {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub website: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub assigned_to_id: Option<Uuid>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ConvertLeadDoc {
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub company_name: Option<String>,
    /// A deal is created only when present.
    pub conversion_value: Option<f64>,
    pub deal_title: Option<String>,
    pub deal_stage: Option<String>,
    pub notes: Option<String>,
}

/// Same patch applied to every id; `data` is accepted as an alias of `patch`.
#[derive(ToSchema)]
pub struct BulkUpdateDoc {
    pub ids: Vec<Uuid>,
    #[schema(value_type = Object)]
    pub patch: serde_json::Value,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CreateTaskDoc {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub assigned_to_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct LogCallDoc {
    /// INBOUND or OUTBOUND.
    pub direction: String,
    pub duration_seconds: Option<i32>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub called_at: Option<String>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct AddNoteDoc {
    pub content: String,
    pub deal_id: Option<Uuid>,
}

#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct LogMessageDoc {
    /// EMAIL, SMS or WHATSAPP.
    pub channel: String,
    pub direction: String,
    pub subject: Option<String>,
    pub body: String,
    pub sent_at: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::users::list,
        crate::routes::users::me,
        crate::routes::contacts::list,
        crate::routes::contacts::get,
        crate::routes::contacts::create,
        crate::routes::contacts::update,
        crate::routes::contacts::delete,
        crate::routes::contacts::deactivate,
        crate::routes::contacts::stats,
        crate::routes::contacts::list_calls,
        crate::routes::contacts::log_call,
        crate::routes::contacts::list_notes,
        crate::routes::contacts::add_note,
        crate::routes::contacts::list_messages,
        crate::routes::contacts::log_message,
        crate::routes::companies::list,
        crate::routes::companies::get,
        crate::routes::companies::create,
        crate::routes::companies::update,
        crate::routes::companies::delete,
        crate::routes::deals::list,
        crate::routes::deals::get,
        crate::routes::deals::create,
        crate::routes::deals::update,
        crate::routes::deals::delete,
        crate::routes::deals::bulk_update,
        crate::routes::deals::pipeline,
        crate::routes::leads::list,
        crate::routes::leads::get,
        crate::routes::leads::create,
        crate::routes::leads::update,
        crate::routes::leads::delete,
        crate::routes::leads::bulk_update,
        crate::routes::leads::convert,
        crate::routes::leads::stats,
        crate::routes::tasks::list,
        crate::routes::tasks::get,
        crate::routes::tasks::create,
        crate::routes::tasks::update,
        crate::routes::tasks::complete,
        crate::routes::tasks::delete,
    ),
    components(
        schemas(
            HealthResponse,
            CreateContactDoc,
            UpdateContactDoc,
            CreateCompanyDoc,
            CreateDealDoc,
            CreateLeadDoc,
            ConvertLeadDoc,
            BulkUpdateDoc,
            CreateTaskDoc,
            LogCallDoc,
            AddNoteDoc,
            LogMessageDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "users"),
        (name = "contacts"),
        (name = "activities"),
        (name = "companies"),
        (name = "deals"),
        (name = "leads"),
        (name = "tasks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_crm_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        for p in ["/health", "/contacts", "/contacts/{id}/calls", "/deals/pipeline", "/leads/{id}/convert", "/tasks/{id}/complete"] {
            assert!(paths.contains_key(p), "missing {p}");
        }
    }
}
