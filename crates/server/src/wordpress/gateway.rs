//! Seams between the workflows and the vendor clients.

use async_trait::async_trait;

use deskops_core::{CourseId, OrderStatus, WcOrderId, WpUserId};

use super::{
    MetaData, NewOrder, Order, TutorClient, WooCommerceClient, WordPressClient, WordPressError,
    WpUser,
};

/// Order operations used by reconciliation and batch enrollment.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn get_order(&self, id: WcOrderId) -> Result<Order, WordPressError>;

    async fn update_status(
        &self,
        id: WcOrderId,
        status: &OrderStatus,
    ) -> Result<Order, WordPressError>;

    async fn update_meta(&self, id: WcOrderId, meta: &[MetaData]) -> Result<Order, WordPressError>;

    async fn create_order(&self, order: &NewOrder) -> Result<Order, WordPressError>;
}

/// Course enrollment.
#[async_trait]
pub trait EnrollmentGateway: Send + Sync {
    async fn enroll(&self, user: WpUserId, course: CourseId) -> Result<(), WordPressError>;
}

/// User role operations used by suspension.
#[async_trait]
pub trait UserGateway: Send + Sync {
    async fn get_user(&self, id: WpUserId) -> Result<WpUser, WordPressError>;

    async fn set_roles(&self, id: WpUserId, roles: &[String]) -> Result<WpUser, WordPressError>;
}

#[async_trait]
impl OrderGateway for WooCommerceClient {
    async fn get_order(&self, id: WcOrderId) -> Result<Order, WordPressError> {
        Self::get_order(self, id).await
    }

    async fn update_status(
        &self,
        id: WcOrderId,
        status: &OrderStatus,
    ) -> Result<Order, WordPressError> {
        Self::update_status(self, id, status).await
    }

    async fn update_meta(&self, id: WcOrderId, meta: &[MetaData]) -> Result<Order, WordPressError> {
        Self::update_meta(self, id, meta).await
    }

    async fn create_order(&self, order: &NewOrder) -> Result<Order, WordPressError> {
        Self::create_order(self, order).await
    }
}

#[async_trait]
impl EnrollmentGateway for TutorClient {
    async fn enroll(&self, user: WpUserId, course: CourseId) -> Result<(), WordPressError> {
        match Self::enroll(self, user, course).await {
            Err(e) if e.is_already_enrolled() => {
                tracing::debug!(%user, %course, "user already enrolled");
                Ok(())
            }
            other => other,
        }
    }
}

#[async_trait]
impl UserGateway for WordPressClient {
    async fn get_user(&self, id: WpUserId) -> Result<WpUser, WordPressError> {
        Self::get_user(self, id).await
    }

    async fn set_roles(&self, id: WpUserId, roles: &[String]) -> Result<WpUser, WordPressError> {
        self.update_roles(id, roles).await
    }
}
