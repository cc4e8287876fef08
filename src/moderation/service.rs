//! Moderation service: partner onboarding, reviews and disputes

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{authorize, ensure_owner, Action, Actor, Resource};
use crate::booking::{Booking, BookingStatus};
use crate::error::ServiceError;
use crate::inventory::{ApprovalStatus, RejectRequest};
use crate::models::{PageRequest, PaginatedResponse, UserRole};
use crate::store::{BookingStore, ModerationStore, SharedStore, UserStore};

use super::model::{
    CreateDisputeRequest, CreateReviewRequest, Dispute, DisputeFilter, DisputeStatus,
    PartnerApplication, PartnerApplicationRequest, Review, UpdateDisputeRequest,
};

/// Booking states a dispute can be raised against
const DISPUTABLE: [BookingStatus; 3] = [
    BookingStatus::Confirmed,
    BookingStatus::Active,
    BookingStatus::Completed,
];

#[derive(Clone)]
pub struct ModerationService {
    store: SharedStore,
}

impl ModerationService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub async fn submit_application(
        &self,
        actor: &Actor,
        request: PartnerApplicationRequest,
    ) -> Result<PartnerApplication, ServiceError> {
        authorize(actor, Resource::PartnerApplication, Action::Create)?;
        request.validate()?;

        let user = self
            .store
            .find_user(actor.user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        if user.role.at_least(UserRole::Partner) {
            return Err(ServiceError::Conflict("user is already a partner".to_string()));
        }

        if let Some(existing) = self.store.latest_application_for_user(actor.user_id).await? {
            if existing.status != ApprovalStatus::Rejected {
                return Err(ServiceError::Conflict(
                    "user already has a partner application".to_string(),
                ));
            }
        }

        let application = PartnerApplication {
            id: Uuid::new_v4(),
            user_id: actor.user_id,
            business_name: request.business_name.trim().to_string(),
            business_address: request.business_address.trim().to_string(),
            phone: request.phone,
            description: request.description,
            status: ApprovalStatus::Pending,
            rejection_reason: None,
            submitted_at: Utc::now(),
            decided_at: None,
            decided_by: None,
        };
        self.store.insert_application(&application).await?;

        tracing::info!(
            application_id = %application.id,
            user_id = %actor.user_id,
            "Partner application submitted"
        );
        Ok(application)
    }

    pub async fn my_application(&self, actor: &Actor) -> Result<PartnerApplication, ServiceError> {
        authorize(actor, Resource::PartnerApplication, Action::Read)?;
        self.store
            .latest_application_for_user(actor.user_id)
            .await?
            .ok_or(ServiceError::NotFound("partner application"))
    }

    pub async fn list_applications(
        &self,
        actor: &Actor,
        status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<PartnerApplication>, ServiceError> {
        authorize(actor, Resource::PartnerApplication, Action::Manage)?;
        let (rows, total) = self.store.list_applications(status, page).await?;
        Ok(PaginatedResponse::new(rows, total, page))
    }

    /// Approve and promote the applicant to partner.
    pub async fn approve_application(
        &self,
        actor: &Actor,
        application_id: Uuid,
    ) -> Result<PartnerApplication, ServiceError> {
        authorize(actor, Resource::PartnerApplication, Action::Approve)?;
        let application = self
            .decide_application(actor, application_id, ApprovalStatus::Approved, None)
            .await?;

        if let Some(mut user) = self.store.find_user(application.user_id).await? {
            if !user.role.at_least(UserRole::Partner) {
                user.role = UserRole::Partner;
                user.updated_at = Utc::now();
                self.store.update_user(&user).await?;
            }
        }

        tracing::info!(
            application_id = %application_id,
            user_id = %application.user_id,
            admin_id = %actor.user_id,
            "Partner application approved"
        );
        Ok(application)
    }

    pub async fn reject_application(
        &self,
        actor: &Actor,
        application_id: Uuid,
        request: RejectRequest,
    ) -> Result<PartnerApplication, ServiceError> {
        authorize(actor, Resource::PartnerApplication, Action::Approve)?;
        request.validate()?;
        let application = self
            .decide_application(
                actor,
                application_id,
                ApprovalStatus::Rejected,
                Some(request.reason),
            )
            .await?;
        tracing::info!(
            application_id = %application_id,
            admin_id = %actor.user_id,
            "Partner application rejected"
        );
        Ok(application)
    }

    async fn decide_application(
        &self,
        actor: &Actor,
        application_id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> Result<PartnerApplication, ServiceError> {
        let mut application = self
            .store
            .find_application(application_id)
            .await?
            .ok_or(ServiceError::NotFound("partner application"))?;
        if application.status != ApprovalStatus::Pending {
            return Err(ServiceError::Conflict("application already decided".to_string()));
        }

        application.status = status;
        application.rejection_reason = reason;
        application.decided_at = Some(Utc::now());
        application.decided_by = Some(actor.user_id);

        if !self.store.decide_application(&application).await? {
            return Err(ServiceError::Conflict("application already decided".to_string()));
        }
        Ok(application)
    }

    /// One review per completed booking, by its renter.
    pub async fn create_review(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<Review, ServiceError> {
        authorize(actor, Resource::Review, Action::Create)?;
        request.validate()?;

        let booking = self.find_booking(booking_id).await?;
        ensure_owner(actor, booking.renter_id, "booking")?;
        if booking.status != BookingStatus::Completed {
            return Err(ServiceError::Conflict(
                "only completed bookings can be reviewed".to_string(),
            ));
        }
        if self.store.find_review_for_booking(booking_id).await?.is_some() {
            return Err(ServiceError::Conflict(
                "booking has already been reviewed".to_string(),
            ));
        }

        let review = Review {
            id: Uuid::new_v4(),
            booking_id,
            user_id: actor.user_id,
            item_id: booking.item_id,
            rating: request.rating,
            comment: request.comment,
            created_at: Utc::now(),
        };
        self.store.insert_review(&review).await?;

        tracing::info!(
            review_id = %review.id,
            item_id = %review.item_id,
            rating = review.rating,
            "Review created"
        );
        Ok(review)
    }

    pub async fn item_reviews(
        &self,
        item_id: Uuid,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Review>, ServiceError> {
        let (rows, total) = self.store.list_reviews_for_item(item_id, page).await?;
        Ok(PaginatedResponse::new(rows, total, page))
    }

    /// Renter or owner raises a dispute. The booking status is left alone.
    pub async fn open_dispute(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: CreateDisputeRequest,
    ) -> Result<Dispute, ServiceError> {
        authorize(actor, Resource::Dispute, Action::Create)?;
        request.validate()?;

        let booking = self.find_booking(booking_id).await?;
        if actor.user_id != booking.owner_id {
            ensure_owner(actor, booking.renter_id, "booking")?;
        }
        if !DISPUTABLE.contains(&booking.status) {
            return Err(ServiceError::Conflict(format!(
                "cannot open a dispute on a {} booking",
                booking.status
            )));
        }

        let dispute = Dispute {
            id: Uuid::new_v4(),
            booking_id,
            reporter_id: actor.user_id,
            kind: request.kind,
            title: request.title.trim().to_string(),
            description: request.description,
            status: DisputeStatus::Open,
            resolution: None,
            resolved_by: None,
            created_at: Utc::now(),
            resolved_at: None,
        };
        self.store.insert_dispute(&dispute).await?;

        tracing::info!(dispute_id = %dispute.id, booking_id = %booking_id, "Dispute opened");
        Ok(dispute)
    }

    pub async fn my_disputes(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Dispute>, ServiceError> {
        authorize(actor, Resource::Dispute, Action::Read)?;
        let filter = DisputeFilter {
            reporter_id: Some(actor.user_id),
            ..Default::default()
        };
        let (rows, total) = self.store.list_disputes(&filter, page).await?;
        Ok(PaginatedResponse::new(rows, total, page))
    }

    pub async fn list_disputes(
        &self,
        actor: &Actor,
        status: Option<DisputeStatus>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Dispute>, ServiceError> {
        authorize(actor, Resource::Dispute, Action::Manage)?;
        let filter = DisputeFilter {
            status,
            ..Default::default()
        };
        let (rows, total) = self.store.list_disputes(&filter, page).await?;
        Ok(PaginatedResponse::new(rows, total, page))
    }

    pub async fn update_dispute(
        &self,
        actor: &Actor,
        dispute_id: Uuid,
        request: UpdateDisputeRequest,
    ) -> Result<Dispute, ServiceError> {
        authorize(actor, Resource::Dispute, Action::Manage)?;
        request.validate()?;

        let mut dispute = self
            .store
            .find_dispute(dispute_id)
            .await?
            .ok_or(ServiceError::NotFound("dispute"))?;
        if !dispute.status.can_move_to(request.status) {
            return Err(ServiceError::Conflict(format!(
                "dispute cannot move from {:?} to {:?}",
                dispute.status, request.status
            )));
        }

        dispute.status = request.status;
        if request.resolution.is_some() {
            dispute.resolution = request.resolution;
        }
        if matches!(request.status, DisputeStatus::Resolved | DisputeStatus::Closed) {
            dispute.resolved_by = Some(actor.user_id);
            dispute.resolved_at = Some(Utc::now());
        }
        self.store.update_dispute(&dispute).await?;

        tracing::info!(
            dispute_id = %dispute_id,
            status = ?dispute.status,
            admin_id = %actor.user_id,
            "Dispute updated"
        );
        Ok(dispute)
    }

    async fn find_booking(&self, booking_id: Uuid) -> Result<Booking, ServiceError> {
        self.store
            .find_booking(booking_id)
            .await?
            .ok_or(ServiceError::NotFound("booking"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::Pricing;
    use crate::models::User;
    use crate::moderation::DisputeKind;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use std::sync::Arc;

    async fn seed_booking(store: &SharedStore, status: BookingStatus) -> (Actor, Actor, Booking) {
        let renter = Actor::new(Uuid::new_v4(), UserRole::Customer);
        let owner = Actor::new(Uuid::new_v4(), UserRole::Partner);
        let start = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let pricing = Pricing::compute(start, start, 10_000, 0).unwrap();
        let mut booking = Booking::new(
            renter.user_id,
            Uuid::new_v4(),
            owner.user_id,
            start,
            start,
            pricing,
            None,
        );
        booking.status = status;
        store.insert_booking(&booking).await.unwrap();
        (renter, owner, booking)
    }

    fn review() -> CreateReviewRequest {
        CreateReviewRequest {
            rating: 5,
            comment: Some("Smooth handover".into()),
        }
    }

    #[tokio::test]
    async fn test_review_only_once_and_only_completed() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let service = ModerationService::new(store.clone());

        let (renter, _, active) = seed_booking(&store, BookingStatus::Active).await;
        let err = service.create_review(&renter, active.id, review()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let (renter, _, done) = seed_booking(&store, BookingStatus::Completed).await;
        service.create_review(&renter, done.id, review()).await.unwrap();
        let err = service.create_review(&renter, done.id, review()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));

        let listed = service.item_reviews(done.item_id, PageRequest::default()).await.unwrap();
        assert_eq!(listed.total, 1);
    }

    #[tokio::test]
    async fn test_dispute_leaves_booking_status() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let service = ModerationService::new(store.clone());
        let (_, owner, booking) = seed_booking(&store, BookingStatus::Active).await;

        let dispute = service
            .open_dispute(
                &owner,
                booking.id,
                CreateDisputeRequest {
                    kind: DisputeKind::LateReturn,
                    title: "Late".into(),
                    description: "Not returned on time".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(dispute.status, DisputeStatus::Open);

        let stored = store.find_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Active);

        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);
        let resolved = service
            .update_dispute(
                &admin,
                dispute.id,
                UpdateDisputeRequest {
                    status: DisputeStatus::Resolved,
                    resolution: Some("Late fee waived".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(resolved.resolved_by, Some(admin.user_id));

        let err = service
            .update_dispute(
                &admin,
                dispute.id,
                UpdateDisputeRequest {
                    status: DisputeStatus::Open,
                    resolution: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_approval_promotes_customer() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let service = ModerationService::new(store.clone());
        let user = User::new(
            "shop@example.com".into(),
            "x".into(),
            "Shop".into(),
            UserRole::Customer,
        );
        store.insert_user(&user).await.unwrap();
        let applicant = Actor::new(user.id, user.role);
        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);

        let application = service
            .submit_application(
                &applicant,
                PartnerApplicationRequest {
                    business_name: "Retro Rentals".into(),
                    business_address: "Jl. Sudirman 1".into(),
                    phone: None,
                    description: None,
                },
            )
            .await
            .unwrap();

        service.approve_application(&admin, application.id).await.unwrap();
        let promoted = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(promoted.role, UserRole::Partner);

        let err = service
            .reject_application(&admin, application.id, RejectRequest { reason: "late".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }
}
