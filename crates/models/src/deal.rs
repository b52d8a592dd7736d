use sea_orm::{entity::prelude::*, Set};
use uuid::Uuid;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{company, contact, errors, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deal")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub value: Option<f64>,
    pub currency: String,
    pub stage: DealStage,
    pub probability: i32,
    pub expected_close_date: Option<DateTimeWithTimeZone>,
    pub actual_close_date: Option<DateTimeWithTimeZone>,
    pub description: Option<String>,
    pub lost_reason: Option<String>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub owner_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Pipeline stage. Any stage may follow any other.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DealStage {
    #[sea_orm(string_value = "PROSPECTING")]
    Prospecting,
    #[sea_orm(string_value = "QUALIFICATION")]
    Qualification,
    #[sea_orm(string_value = "PROPOSAL")]
    Proposal,
    #[sea_orm(string_value = "NEGOTIATION")]
    Negotiation,
    #[sea_orm(string_value = "CLOSED_WON")]
    ClosedWon,
    #[sea_orm(string_value = "CLOSED_LOST")]
    ClosedLost,
}

impl DealStage {
    /// First stage of the pipeline; new deals start here.
    pub const FIRST: DealStage = DealStage::Prospecting;

    pub fn is_closed(self) -> bool {
        matches!(self, DealStage::ClosedWon | DealStage::ClosedLost)
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation { Company, Contact, Owner }

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Company => Entity::belongs_to(company::Entity).from(Column::CompanyId).to(company::Column::Id).into(),
            Relation::Contact => Entity::belongs_to(contact::Entity).from(Column::ContactId).to(contact::Column::Id).into(),
            Relation::Owner => Entity::belongs_to(user::Entity).from(Column::OwnerId).to(user::Column::Id).into(),
        }
    }
}

impl Related<company::Entity> for Entity {
    fn to() -> RelationDef { Relation::Company.def() }
}

impl Related<contact::Entity> for Entity {
    fn to() -> RelationDef { Relation::Contact.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub const DEFAULT_CURRENCY: &str = "USD";

#[derive(Clone, Debug)]
pub struct NewDeal {
    pub title: String,
    pub value: Option<f64>,
    pub currency: Option<String>,
    pub stage: Option<DealStage>,
    pub probability: Option<i32>,
    pub expected_close_date: Option<DateTimeWithTimeZone>,
    pub description: Option<String>,
    pub company_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub owner_id: Uuid,
}

pub fn validate_title(title: &str) -> Result<(), errors::ModelError> {
    if title.trim().is_empty() {
        return Err(errors::ModelError::Validation("Deal title is required".into()));
    }
    Ok(())
}

pub fn validate_value(value: f64) -> Result<(), errors::ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(errors::ModelError::Validation("Deal value must be a non-negative number".into()));
    }
    Ok(())
}

pub fn validate_probability(p: i32) -> Result<(), errors::ModelError> {
    if !(0..=100).contains(&p) {
        return Err(errors::ModelError::Validation("probability must be between 0 and 100".into()));
    }
    Ok(())
}

/// ISO-4217 style: three ASCII letters, stored upper-case.
pub fn validate_currency(c: &str) -> Result<String, errors::ModelError> {
    let up = c.trim().to_ascii_uppercase();
    if up.len() != 3 || !up.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(errors::ModelError::Validation("currency must be a 3-letter code".into()));
    }
    Ok(up)
}

/// Probability implied by entering a closed stage, if any.
pub fn closing_probability(stage: DealStage) -> Option<i32> {
    match stage {
        DealStage::ClosedWon => Some(100),
        DealStage::ClosedLost => Some(0),
        _ => None,
    }
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewDeal) -> Result<Model, errors::ModelError> {
    validate_title(&new.title)?;
    if let Some(v) = new.value { validate_value(v)?; }
    let currency = match new.currency.as_deref() {
        Some(c) => validate_currency(c)?,
        None => DEFAULT_CURRENCY.to_string(),
    };
    let stage = new.stage.unwrap_or(DealStage::FIRST);
    let probability = closing_probability(stage).unwrap_or(new.probability.unwrap_or(0));
    validate_probability(probability)?;
    let now = Utc::now();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(new.title.trim().to_string()),
        value: Set(new.value),
        currency: Set(currency),
        stage: Set(stage),
        probability: Set(probability),
        expected_close_date: Set(new.expected_close_date),
        actual_close_date: Set(stage.is_closed().then(|| now.into())),
        description: Set(new.description),
        lost_reason: Set(None),
        company_id: Set(new.company_id),
        contact_id: Set(new.contact_id),
        owner_id: Set(new.owner_id),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    Ok(am.insert(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_is_normalized() {
        assert_eq!(validate_currency("eur").unwrap(), "EUR");
        assert!(validate_currency("EURO").is_err());
        assert!(validate_currency("U$D").is_err());
    }

    #[test]
    fn closed_stages_pin_probability() {
        assert_eq!(closing_probability(DealStage::ClosedWon), Some(100));
        assert_eq!(closing_probability(DealStage::ClosedLost), Some(0));
        assert_eq!(closing_probability(DealStage::Proposal), None);
    }

    #[test]
    fn negative_or_nan_values_are_rejected() {
        assert!(validate_value(0.0).is_ok());
        assert!(validate_value(-1.0).is_err());
        assert!(validate_value(f64::NAN).is_err());
    }

    #[test]
    fn stage_serializes_screaming_snake() {
        let json = serde_json::to_string(&DealStage::ClosedWon).unwrap();
        assert_eq!(json, "\"CLOSED_WON\"");
    }
}
