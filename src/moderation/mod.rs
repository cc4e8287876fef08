//! Moderation: partner applications, reviews and disputes.

mod model;
mod service;

pub use model::{
    ApplicationListQuery, CreateDisputeRequest, CreateReviewRequest, Dispute, DisputeFilter,
    DisputeKind, DisputeListQuery, DisputeStatus, PartnerApplication, PartnerApplicationRequest,
    Review, UpdateDisputeRequest,
};
pub use service::ModerationService;
