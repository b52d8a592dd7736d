pub mod errors;
pub mod db;
pub mod user;
pub mod company;
pub mod contact;
pub mod deal;
pub mod lead;
pub mod task;
pub mod call;
pub mod note;
pub mod message;

#[cfg(test)]
mod tests {
    use crate::{company, contact, db, deal, user};
    use uuid::Uuid;

    #[tokio::test]
    async fn contact_links_to_company_and_owner() {
        let db = db::connect_in_memory().await.expect("in-memory db");
        let u = user::create(&db, Uuid::new_v4(), "rep@example.com", "Rep").await.expect("user");
        let co = company::create(&db, company::NewCompany { name: "Acme".into(), created_by_id: u.id, ..Default::default() })
            .await
            .expect("company");
        let c = contact::create(
            &db,
            contact::NewContact { first_name: "Ada".into(), company_id: Some(co.id), created_by_id: u.id, ..Default::default() },
        )
        .await
        .expect("contact");
        assert_eq!(c.company_id, Some(co.id));
        assert_eq!(c.full_name(), "Ada");

        let d = deal::create(
            &db,
            deal::NewDeal {
                title: "Pilot".into(),
                value: Some(1200.0),
                currency: None,
                stage: Some(deal::DealStage::ClosedWon),
                probability: Some(20),
                expected_close_date: None,
                description: None,
                company_id: Some(co.id),
                contact_id: Some(c.id),
                owner_id: u.id,
            },
        )
        .await
        .expect("deal");
        assert_eq!(d.probability, 100);
        assert!(d.actual_close_date.is_some());
        assert_eq!(d.currency, "USD");
    }
}
