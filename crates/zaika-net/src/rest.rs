//! Typed REST client for the storefront backend.
//!
//! Thin wrapper over `reqwest`: one method per endpoint, JSON in and out.
//! Non-success responses carrying a JSON `{ "message": ... }` body surface
//! as [`NetError::Api`] so callers can show the backend's own wording for
//! domain rejections (area not in service, minimum order not met, ...).

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use zaika_shared::{
    AreaId, CartEntryId, DeliveryTerms, LatLng, MenuItemId, MenuItemSnapshot, Order, OrderId,
    PaymentMethod, UserProfile,
};

use crate::error::{NetError, Result};

/// HTTP client for the storefront REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    /// Bearer token of the current session. Updated on login/logout.
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Build a client against the given base URL (e.g.
    /// `http://localhost:5000/api`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    /// Attach a bearer token to all subsequent requests.
    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    /// Drop the bearer token.
    pub fn clear_token(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let token = self.token.read().ok().and_then(|guard| guard.clone());
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: reqwest::RequestBuilder) -> Result<T> {
        let response = self.authorize(builder).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|body| body.message)
                .unwrap_or_else(|_| status.to_string());
            Err(NetError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    // ------------------------------------------------------------------
    // Areas
    // ------------------------------------------------------------------

    /// Geofence check: is this coordinate inside a service area?
    pub async fn check_area(&self, location: LatLng) -> Result<CheckAreaResponse> {
        let builder = self
            .http
            .get(self.url("/areas/check"))
            .query(&[("lat", location.lat), ("lng", location.lng)]);
        self.send(builder).await
    }

    /// All active areas, with delivery-zone terms where defined.
    pub async fn list_areas(&self) -> Result<Vec<AreaWithZone>> {
        self.send(self.http.get(self.url("/areas"))).await
    }

    // ------------------------------------------------------------------
    // Server cart
    // ------------------------------------------------------------------

    /// Current server-side cart snapshot.
    pub async fn get_cart(&self) -> Result<CartSnapshot> {
        let response: CartResponse = self.send(self.http.get(self.url("/cart"))).await?;
        Ok(response.cart)
    }

    /// Add (or merge) an item into the server cart.
    pub async fn add_cart_item(
        &self,
        menu_item_id: &MenuItemId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let builder = self.http.post(self.url("/cart")).json(&serde_json::json!({
            "menuItemId": menu_item_id,
            "quantity": quantity,
        }));
        let response: CartResponse = self.send(builder).await?;
        Ok(response.cart)
    }

    /// Replace the quantity of one cart entry.
    pub async fn set_cart_item_quantity(
        &self,
        entry_id: &CartEntryId,
        quantity: u32,
    ) -> Result<CartSnapshot> {
        let builder = self
            .http
            .patch(self.url(&format!("/cart/item/{}", entry_id.as_str())))
            .json(&serde_json::json!({ "quantity": quantity }));
        let response: CartResponse = self.send(builder).await?;
        Ok(response.cart)
    }

    /// Remove one entry from the server cart.
    pub async fn remove_cart_item(&self, entry_id: &CartEntryId) -> Result<CartSnapshot> {
        let builder = self
            .http
            .delete(self.url(&format!("/cart/item/{}", entry_id.as_str())));
        let response: CartResponse = self.send(builder).await?;
        Ok(response.cart)
    }

    /// Drop the entire server cart.
    pub async fn clear_cart(&self) -> Result<CartSnapshot> {
        let response: CartResponse = self.send(self.http.delete(self.url("/cart/clear"))).await?;
        Ok(response.cart)
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Submit a checkout. The response may carry a card-payment client
    /// secret or bank-transfer details depending on the payment method.
    pub async fn create_order(&self, payload: &CreateOrderPayload) -> Result<OrderResponse> {
        self.send(self.http.post(self.url("/orders")).json(payload))
            .await
    }

    /// Fetch a single order record.
    pub async fn get_order(&self, id: &OrderId) -> Result<Order> {
        let response: OrderResponse = self
            .send(self.http.get(self.url(&format!("/orders/{}", id.as_str()))))
            .await?;
        Ok(response.order)
    }

    /// Fetch all of the signed-in user's orders, newest first.
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        let response: OrdersResponse = self.send(self.http.get(self.url("/orders/my"))).await?;
        Ok(response.orders)
    }

    /// Cancel an order. The backend decides whether the status allows it.
    pub async fn cancel_order(&self, id: &OrderId) -> Result<Order> {
        let response: OrderResponse = self
            .send(
                self.http
                    .patch(self.url(&format!("/orders/{}/cancel", id.as_str()))),
            )
            .await?;
        Ok(response.order)
    }

    /// Submit the bank-transfer reference code for a pending-payment order.
    pub async fn confirm_bank_transfer(&self, id: &OrderId, reference: &str) -> Result<Order> {
        let builder = self
            .http
            .post(self.url(&format!("/orders/{}/confirm-bank", id.as_str())))
            .json(&serde_json::json!({ "reference": reference }));
        let response: OrderResponse = self.send(builder).await?;
        Ok(response.order)
    }

    // ------------------------------------------------------------------
    // Auth
    // ------------------------------------------------------------------

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let builder = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }));
        self.send(builder).await
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        password: &str,
    ) -> Result<AuthResponse> {
        let builder = self.http.post(self.url("/auth/register")).json(
            &serde_json::json!({ "name": name, "email": email, "phone": phone, "password": password }),
        );
        self.send(builder).await
    }

    pub async fn logout(&self) -> Result<SuccessResponse> {
        self.send(self.http.post(self.url("/auth/logout"))).await
    }

    /// Validate the current token and fetch the profile behind it.
    pub async fn me(&self) -> Result<UserProfile> {
        let response: MeResponse = self.send(self.http.get(self.url("/auth/me"))).await?;
        Ok(response.user)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<SuccessResponse> {
        let builder = self
            .http
            .post(self.url("/auth/forgot-password"))
            .json(&serde_json::json!({ "email": email }));
        self.send(builder).await
    }

    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<VerifyOtpResponse> {
        let builder = self
            .http
            .post(self.url("/auth/verify-otp"))
            .json(&serde_json::json!({ "email": email, "otp": otp }));
        self.send(builder).await
    }

    pub async fn reset_password(&self, reset_token: &str, password: &str) -> Result<SuccessResponse> {
        let builder = self
            .http
            .post(self.url("/auth/reset-password"))
            .json(&serde_json::json!({ "resetToken": reset_token, "password": password }));
        self.send(builder).await
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Response of `GET /areas/check`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAreaResponse {
    pub success: bool,
    pub in_service: bool,
    #[serde(default)]
    pub has_delivery_zone: bool,
    #[serde(default)]
    pub area: Option<AreaSummary>,
    #[serde(default)]
    pub delivery: Option<DeliveryTerms>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaSummary {
    #[serde(rename = "_id")]
    pub id: AreaId,
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub center: Option<LatLng>,
}

/// One row of `GET /areas`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaWithZone {
    #[serde(rename = "_id")]
    pub id: AreaId,
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub delivery_zone: Option<DeliveryZone>,
    #[serde(default)]
    pub has_delivery_zone: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryZone {
    pub delivery_fee: u32,
    pub min_order_amount: u32,
    pub estimated_time: String,
    #[serde(default)]
    pub is_active: bool,
}

/// Envelope around every `/cart` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartResponse {
    #[allow(dead_code)]
    success: bool,
    cart: CartSnapshot,
}

/// Server cart snapshot: the items plus the server-computed total.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub items: Vec<ServerCartEntry>,
    pub total: u32,
}

/// One server cart line; keyed by a server-issued subdocument id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCartEntry {
    #[serde(rename = "_id")]
    pub id: CartEntryId,
    pub menu_item: MenuItemSnapshot,
    pub quantity: u32,
    pub price_at_add: u32,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub items: Vec<OrderLinePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    pub menu_item: MenuItemId,
    pub quantity: u32,
}

/// Envelope around single-order responses.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub order: Order,
    /// Payment-provider client secret for card payments.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Transfer instructions for bank payments.
    #[serde(default)]
    pub bank_details: Option<BankDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: String,
    pub account_title: String,
    pub account_number: String,
    pub iban: String,
    #[serde(default)]
    pub branch: Option<String>,
    pub amount: u32,
    pub reference: String,
}

#[derive(Debug, Clone, Deserialize)]
struct OrdersResponse {
    orders: Vec<Order>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub reset_token: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MeResponse {
    user: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joining_strips_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/api/");
        assert_eq!(client.url("/areas"), "http://localhost:5000/api/areas");
    }

    #[test]
    fn check_area_response_decodes_in_service() {
        let json = r#"{
            "success": true,
            "inService": true,
            "hasDeliveryZone": true,
            "area": { "_id": "a1", "name": "DHA Phase 5", "city": "Karachi",
                      "center": { "lat": 24.80, "lng": 67.06 } },
            "delivery": { "fee": 199, "minOrder": 0, "estimatedTime": "35-50 min" }
        }"#;

        let response: CheckAreaResponse = serde_json::from_str(json).unwrap();
        assert!(response.in_service);
        let delivery = response.delivery.unwrap();
        assert_eq!(delivery.fee, 199);
        assert_eq!(delivery.min_order, 0);
    }

    #[test]
    fn check_area_response_decodes_out_of_service() {
        let json = r#"{
            "success": true,
            "inService": false,
            "hasDeliveryZone": false,
            "message": "We do not deliver to this location yet"
        }"#;

        let response: CheckAreaResponse = serde_json::from_str(json).unwrap();
        assert!(!response.in_service);
        assert!(response.area.is_none());
        assert_eq!(
            response.message.as_deref(),
            Some("We do not deliver to this location yet")
        );
    }

    #[test]
    fn cart_response_decodes() {
        let json = r#"{
            "success": true,
            "message": "Item added",
            "cart": {
                "items": [{
                    "_id": "sub1",
                    "menuItem": { "_id": "m1", "name": "Seekh Kebab", "price": 450 },
                    "quantity": 2,
                    "priceAtAdd": 450
                }],
                "total": 900
            },
            "isGuest": false
        }"#;

        let response: CartResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.cart.total, 900);
        assert_eq!(response.cart.items[0].price_at_add, 450);
        assert!(response.cart.items[0].menu_item.is_available);
    }

    #[test]
    fn create_order_payload_serializes_camel_case() {
        let payload = CreateOrderPayload {
            items: vec![OrderLinePayload {
                menu_item: MenuItemId("m1".into()),
                quantity: 2,
            }],
            address_id: Some("addr1".into()),
            payment_method: PaymentMethod::Bank,
            promo_code: None,
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["items"][0]["menuItem"], "m1");
        assert_eq!(json["paymentMethod"], "bank");
        assert_eq!(json["addressId"], "addr1");
        assert!(json.get("promoCode").is_none());
    }
}
