//! Catalog service - listings, moderation and categories

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{authorize, ensure_owner, Action, Actor, Resource};
use crate::error::ServiceError;
use crate::models::{PageRequest, PaginatedResponse};
use crate::store::{CategoryStore, ItemStore, SharedStore};

use super::model::{
    ApprovalStatus, Category, CreateCategoryRequest, CreateItemRequest, Item, ItemCondition,
    ItemFilter, ItemQuery, RejectRequest, UpdateCategoryRequest, UpdateItemRequest,
    UpdateStockRequest,
};

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    store: SharedStore,
}

impl CatalogService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Approved, active listings
    pub async fn list_public(
        &self,
        query: &ItemQuery,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Item>, ServiceError> {
        let filter = ItemFilter {
            category_id: query.category_id,
            bookable_only: true,
            in_stock_only: query.available.unwrap_or(false),
            search: query
                .q
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            ..Default::default()
        };
        let (items, total) = self.store.list_items(&filter, page).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    /// Unlisted items look the same as missing ones.
    pub async fn get_public(&self, item_id: Uuid) -> Result<Item, ServiceError> {
        self.store
            .find_item(item_id)
            .await?
            .filter(Item::is_bookable)
            .ok_or(ServiceError::NotFound("item"))
    }

    pub async fn create_listing(
        &self,
        actor: &Actor,
        request: CreateItemRequest,
    ) -> Result<Item, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Create)?;
        request.validate()?;
        self.require_category(request.category_id).await?;

        let now = Utc::now();
        let item = Item {
            id: Uuid::new_v4(),
            owner_id: actor.user_id,
            category_id: request.category_id,
            name: request.name.trim().to_string(),
            description: request.description,
            platform: request.platform,
            condition: request.condition.unwrap_or(ItemCondition::Good),
            stock: request.stock,
            available_stock: request.stock,
            price_per_day: request.price_per_day,
            deposit: request.deposit.unwrap_or(0),
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
            is_active: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_item(&item).await?;

        tracing::info!(
            item_id = %item.id,
            owner_id = %actor.user_id,
            "Listing submitted for review"
        );
        Ok(item)
    }

    /// Edit a listing that has not been approved yet. Editing a rejected
    /// listing sends it back for review.
    pub async fn update_listing(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: UpdateItemRequest,
    ) -> Result<Item, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Update)?;
        request.validate()?;

        let mut item = self.find(item_id).await?;
        ensure_owner(actor, item.owner_id, "item")?;
        if item.approval_status == ApprovalStatus::Approved {
            return Err(ServiceError::Conflict(
                "approved listings cannot be edited".to_string(),
            ));
        }

        if let Some(category_id) = request.category_id {
            if category_id != item.category_id {
                self.require_category(category_id).await?;
            }
            item.category_id = category_id;
        }
        if let Some(name) = request.name {
            item.name = name.trim().to_string();
        }
        item.description = request.description.apply(item.description);
        item.platform = request.platform.apply(item.platform);
        if let Some(condition) = request.condition {
            item.condition = condition;
        }
        if let Some(price) = request.price_per_day {
            item.price_per_day = price;
        }
        if let Some(deposit) = request.deposit {
            item.deposit = deposit;
        }

        if item.approval_status == ApprovalStatus::Rejected {
            item.approval_status = ApprovalStatus::Pending;
            item.rejection_reason = None;
        }
        item.updated_at = Utc::now();

        self.store.update_item(&item).await?;
        tracing::info!(item_id = %item.id, "Listing updated");
        Ok(item)
    }

    /// Change total stock; units out on rent stay reserved.
    pub async fn restock(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: UpdateStockRequest,
    ) -> Result<Item, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Update)?;
        request.validate()?;

        let item = self.find(item_id).await?;
        ensure_owner(actor, item.owner_id, "item")?;

        let updated = self
            .store
            .set_stock(item_id, request.stock)
            .await?
            .ok_or(ServiceError::NotFound("item"))?;

        tracing::info!(
            item_id = %item_id,
            stock = updated.stock,
            available_stock = updated.available_stock,
            "Stock updated"
        );
        Ok(updated)
    }

    pub async fn list_owned(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Item>, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Create)?;
        let filter = ItemFilter {
            owner_id: Some(actor.user_id),
            ..Default::default()
        };
        let (items, total) = self.store.list_items(&filter, page).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn list_all(
        &self,
        actor: &Actor,
        approval_status: Option<ApprovalStatus>,
        page: PageRequest,
    ) -> Result<PaginatedResponse<Item>, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Manage)?;
        let filter = ItemFilter {
            approval_status,
            ..Default::default()
        };
        let (items, total) = self.store.list_items(&filter, page).await?;
        Ok(PaginatedResponse::new(items, total, page))
    }

    pub async fn approve(&self, actor: &Actor, item_id: Uuid) -> Result<Item, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Approve)?;
        let item = self.decide(item_id, ApprovalStatus::Approved, None).await?;
        tracing::info!(item_id = %item_id, admin_id = %actor.user_id, "Listing approved");
        Ok(item)
    }

    pub async fn reject(
        &self,
        actor: &Actor,
        item_id: Uuid,
        request: RejectRequest,
    ) -> Result<Item, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Approve)?;
        request.validate()?;
        let item = self
            .decide(item_id, ApprovalStatus::Rejected, Some(request.reason))
            .await?;
        tracing::info!(item_id = %item_id, admin_id = %actor.user_id, "Listing rejected");
        Ok(item)
    }

    /// Take a listing off the catalog. The row and its booking history stay.
    pub async fn deactivate(&self, actor: &Actor, item_id: Uuid) -> Result<Item, ServiceError> {
        authorize(actor, Resource::Catalog, Action::Delete)?;

        let mut item = self.find(item_id).await?;
        if !item.is_active {
            return Ok(item);
        }
        item.is_active = false;
        item.updated_at = Utc::now();
        self.store.update_item(&item).await?;

        tracing::warn!(item_id = %item_id, admin_id = %actor.user_id, "Listing deactivated");
        Ok(item)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        self.store.list_categories().await
    }

    pub async fn create_category(
        &self,
        actor: &Actor,
        request: CreateCategoryRequest,
    ) -> Result<Category, ServiceError> {
        authorize(actor, Resource::Category, Action::Create)?;
        request.validate()?;

        let category = Category {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            description: request.description,
            is_active: true,
            created_at: Utc::now(),
        };
        self.store.insert_category(&category).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    /// Inactive categories are hidden from the public.
    pub async fn get_category(&self, category_id: Uuid) -> Result<Category, ServiceError> {
        self.store
            .find_category(category_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(ServiceError::NotFound("category"))
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        category_id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<Category, ServiceError> {
        authorize(actor, Resource::Category, Action::Update)?;
        request.validate()?;

        let mut category = self
            .store
            .find_category(category_id)
            .await?
            .ok_or(ServiceError::NotFound("category"))?;
        if let Some(name) = request.name {
            category.name = name.trim().to_string();
        }
        category.description = request.description.apply(category.description);
        if let Some(is_active) = request.is_active {
            category.is_active = is_active;
        }

        if !self.store.update_category(&category).await? {
            return Err(ServiceError::NotFound("category"));
        }
        tracing::info!(category_id = %category_id, name = %category.name, "Category updated");
        Ok(category)
    }

    pub async fn delete_category(
        &self,
        actor: &Actor,
        category_id: Uuid,
    ) -> Result<(), ServiceError> {
        authorize(actor, Resource::Category, Action::Delete)?;

        if self.store.count_items_in_category(category_id).await? > 0 {
            return Err(ServiceError::Conflict(
                "cannot delete a category that still has items".to_string(),
            ));
        }
        if !self.store.delete_category(category_id).await? {
            return Err(ServiceError::NotFound("category"));
        }

        tracing::info!(category_id = %category_id, "Category deleted");
        Ok(())
    }

    async fn find(&self, item_id: Uuid) -> Result<Item, ServiceError> {
        self.store
            .find_item(item_id)
            .await?
            .ok_or(ServiceError::NotFound("item"))
    }

    async fn require_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        match self.store.find_category(category_id).await? {
            Some(category) if category.is_active => Ok(()),
            _ => Err(ServiceError::NotFound("category")),
        }
    }

    async fn decide(
        &self,
        item_id: Uuid,
        status: ApprovalStatus,
        reason: Option<String>,
    ) -> Result<Item, ServiceError> {
        match self.store.decide_item(item_id, status, reason).await? {
            Some(item) => Ok(item),
            None => {
                self.find(item_id).await?;
                Err(ServiceError::Conflict("item is not awaiting review".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryLedger;
    use crate::models::{Patch, UserRole};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    async fn setup() -> (CatalogService, Actor, Actor, Category) {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let service = CatalogService::new(store);
        let admin = Actor::new(Uuid::new_v4(), UserRole::Admin);
        let partner = Actor::new(Uuid::new_v4(), UserRole::Partner);
        let category = service
            .create_category(
                &admin,
                CreateCategoryRequest {
                    name: "Action".into(),
                    description: None,
                },
            )
            .await
            .unwrap();
        (service, admin, partner, category)
    }

    fn listing(category_id: Uuid) -> CreateItemRequest {
        CreateItemRequest {
            category_id,
            name: "Hades".into(),
            description: Some("Roguelike".into()),
            platform: Some("Switch".into()),
            condition: None,
            stock: 2,
            price_per_day: 8_000,
            deposit: Some(20_000),
        }
    }

    #[tokio::test]
    async fn test_new_listing_hidden_until_approved() {
        let (service, admin, partner, category) = setup().await;
        let item = service.create_listing(&partner, listing(category.id)).await.unwrap();

        assert_eq!(item.approval_status, ApprovalStatus::Pending);
        assert!(matches!(
            service.get_public(item.id).await,
            Err(ServiceError::NotFound("item"))
        ));

        service.approve(&admin, item.id).await.unwrap();
        let public = service.get_public(item.id).await.unwrap();
        assert!(public.is_active);

        let err = service.approve(&admin, item.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_customer_cannot_list() {
        let (service, _, _, category) = setup().await;
        let customer = Actor::new(Uuid::new_v4(), UserRole::Customer);
        let err = service
            .create_listing(&customer, listing(category.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientPermission));
    }

    #[tokio::test]
    async fn test_edit_rejected_listing_resubmits() {
        let (service, admin, partner, category) = setup().await;
        let item = service.create_listing(&partner, listing(category.id)).await.unwrap();
        service
            .reject(&admin, item.id, RejectRequest { reason: "blurry photos".into() })
            .await
            .unwrap();

        let update = UpdateItemRequest {
            description: Patch::Null,
            price_per_day: Some(9_000),
            ..Default::default()
        };
        let edited = service.update_listing(&partner, item.id, update).await.unwrap();
        assert_eq!(edited.approval_status, ApprovalStatus::Pending);
        assert!(edited.rejection_reason.is_none());
        assert!(edited.description.is_none());
        assert_eq!(edited.price_per_day, 9_000);
        assert_eq!(edited.platform.as_deref(), Some("Switch"));
    }

    #[tokio::test]
    async fn test_edit_by_other_partner_not_owned() {
        let (service, _, partner, category) = setup().await;
        let other = Actor::new(Uuid::new_v4(), UserRole::Partner);
        let item = service.create_listing(&partner, listing(category.id)).await.unwrap();

        let err = service
            .update_listing(&other, item.id, UpdateItemRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotOwned(_)));
    }

    #[tokio::test]
    async fn test_category_with_items_cannot_be_deleted() {
        let (service, admin, partner, category) = setup().await;
        service.create_listing(&partner, listing(category.id)).await.unwrap();

        let err = service.delete_category(&admin, category.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_restock_keeps_reserved_units() {
        let (service, admin, partner, category) = setup().await;
        let item = service.create_listing(&partner, listing(category.id)).await.unwrap();
        service.approve(&admin, item.id).await.unwrap();

        service.store.reserve(item.id).await.unwrap();
        let updated = service
            .restock(&partner, item.id, UpdateStockRequest { stock: 5 })
            .await
            .unwrap();
        assert_eq!(updated.stock, 5);
        assert_eq!(updated.available_stock, 4);
    }

    #[tokio::test]
    async fn test_deactivated_listing_leaves_catalog() {
        let (service, admin, partner, category) = setup().await;
        let item = service.create_listing(&partner, listing(category.id)).await.unwrap();
        service.approve(&admin, item.id).await.unwrap();

        assert!(matches!(
            service.deactivate(&partner, item.id).await,
            Err(ServiceError::InsufficientPermission)
        ));

        let retired = service.deactivate(&admin, item.id).await.unwrap();
        assert!(!retired.is_active);
        assert_eq!(retired.approval_status, ApprovalStatus::Approved);
        assert!(matches!(
            service.get_public(item.id).await,
            Err(ServiceError::NotFound("item"))
        ));
        let listed = service
            .list_public(&ItemQuery::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 0);

        // Owner still sees it.
        let owned = service.list_owned(&partner, PageRequest::default()).await.unwrap();
        assert_eq!(owned.total, 1);
    }

    #[tokio::test]
    async fn test_update_and_hide_category() {
        let (service, admin, partner, category) = setup().await;

        assert!(matches!(
            service
                .update_category(&partner, category.id, UpdateCategoryRequest::default())
                .await,
            Err(ServiceError::InsufficientPermission)
        ));

        let renamed = service
            .update_category(
                &admin,
                category.id,
                UpdateCategoryRequest {
                    name: Some(" Adventure ".into()),
                    description: Patch::Value("Open worlds".into()),
                    is_active: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Adventure");
        assert_eq!(
            service.get_category(category.id).await.unwrap().description.as_deref(),
            Some("Open worlds")
        );

        service
            .update_category(
                &admin,
                category.id,
                UpdateCategoryRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matches!(
            service.get_category(category.id).await,
            Err(ServiceError::NotFound("category"))
        ));
        assert!(service.list_categories().await.unwrap().is_empty());

        let missing = service
            .update_category(&admin, Uuid::new_v4(), UpdateCategoryRequest::default())
            .await;
        assert!(matches!(missing, Err(ServiceError::NotFound("category"))));
    }
}
