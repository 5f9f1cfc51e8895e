//! WooCommerce orders (`wc/v3/orders`).

use serde_json::json;
use tracing::instrument;

use deskops_core::{OrderStatus, WcOrderId};

use super::{MetaData, NewOrder, Order, OrderQuery, RestClient, WordPressError};
use crate::config::WooCommerceConfig;

/// WooCommerce REST client.
#[derive(Clone, Debug)]
pub struct WooCommerceClient {
    rest: RestClient,
}

impl WooCommerceClient {
    /// Create a new WooCommerce client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &WooCommerceConfig) -> Result<Self, WordPressError> {
        let rest = RestClient::new(
            &config.url,
            "wc/v3",
            &config.consumer_key,
            &config.consumer_secret,
        )?;
        Ok(Self { rest })
    }

    /// List orders, newest first. Returns the page and the total page count.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, query: &OrderQuery) -> Result<(Vec<Order>, u32), WordPressError> {
        self.rest.get_paged("orders", query).await
    }

    /// Get a single order.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError::NotFound` if the order doesn't exist.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: WcOrderId) -> Result<Order, WordPressError> {
        self.rest
            .get(&format!("orders/{id}"), &[("context", "view")])
            .await
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if WooCommerce rejects the transition.
    #[instrument(skip(self), fields(status = %status))]
    pub async fn update_status(
        &self,
        id: WcOrderId,
        status: &OrderStatus,
    ) -> Result<Order, WordPressError> {
        self.rest
            .put(&format!("orders/{id}"), &json!({ "status": status }))
            .await
    }

    /// Add or overwrite metadata entries (matched by key).
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if the request fails.
    #[instrument(skip(self, meta), fields(keys = meta.len()))]
    pub async fn update_meta(
        &self,
        id: WcOrderId,
        meta: &[MetaData],
    ) -> Result<Order, WordPressError> {
        self.rest
            .put(&format!("orders/{id}"), &json!({ "meta_data": meta }))
            .await
    }

    /// Create an order.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError` if WooCommerce rejects the order.
    #[instrument(skip(self, order), fields(customer_id = order.customer_id))]
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, WordPressError> {
        self.rest.post("orders", order).await
    }
}
