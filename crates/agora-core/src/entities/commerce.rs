//! Carts, orders and deals.
//!
//! Cart and order line items are plain value objects: they round-trip as
//! nested data and have no endpoint of their own. Monetary and quantity
//! fields keep the JSON number as sent, so integers stay integers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;
use serde_with::skip_serializing_none;

use crate::entity::{Entity, EntityKind, SerializeOptions, iso8601};

// ─── Value objects ───────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Amount {
  pub net:   Option<Number>,
  pub gross: Option<Number>,
}

/// A discount applied to a single line item.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartItemDiscount {
  pub id:     Option<String>,
  pub name:   Option<String>,
  /// `percentage` or `value`.
  #[serde(rename = "type")]
  pub kind:   Option<String>,
  pub value:  Option<Number>,
  pub amount: Option<Amount>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartItem {
  pub qty:                          Option<Number>,
  pub sku:                          Option<String>,
  pub name:                         Option<String>,
  pub external_reference_id:        Option<String>,
  pub external_reference_custom_id: Option<String>,
  pub currency:                     Option<String>,
  pub vat_rate:                     Option<Number>,
  /// Unit price.
  pub amount:                       Option<Amount>,
  pub discounts:                    Option<Vec<CartItemDiscount>>,
  pub custom_properties:            Option<serde_json::Value>,
}

// ─── Cart ────────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPayload {
  pub id:                    Option<String>,
  pub person:                Option<String>,
  pub name:                  Option<String>,
  pub custom_id:             Option<String>,
  pub external_reference_id: Option<String>,
  pub status:                Option<String>,
  pub currency:              Option<String>,
  pub amount_total_gross:    Option<Number>,
  pub amount_total_net:      Option<Number>,
  pub shipping_address:      Option<serde_json::Value>,
  pub billing_address:       Option<serde_json::Value>,
  pub items:                 Option<Vec<CartItem>>,
  pub custom_properties:     Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:            Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:            Option<DateTime<Utc>>,
  pub deleted:               Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
  pub id:                    Option<String>,
  pub person:                Option<String>,
  pub name:                  Option<String>,
  pub custom_id:             Option<String>,
  pub external_reference_id: Option<String>,
  /// `open`, `completed`, `cancelled`, …
  pub status:                Option<String>,
  pub currency:              Option<String>,
  pub amount_total_gross:    Option<Number>,
  pub amount_total_net:      Option<Number>,
  pub shipping_address:      Option<serde_json::Value>,
  pub billing_address:       Option<serde_json::Value>,
  pub items:                 Option<Vec<CartItem>>,
  pub custom_properties:     Option<serde_json::Value>,
  pub created_at:            Option<DateTime<Utc>>,
  pub updated_at:            Option<DateTime<Utc>>,
  pub deleted:               bool,
  initialized:               bool,
}

impl Cart {
  /// Sum of `qty` over all items.
  pub fn item_count(&self) -> f64 {
    self
      .items
      .iter()
      .flatten()
      .filter_map(|item| item.qty.as_ref()?.as_f64())
      .sum()
  }
}

impl Entity for Cart {
  type Payload = CartPayload;

  const KIND: EntityKind = EntityKind::Cart;
  const ENDPOINT: &'static str = "api/v0/carts";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: CartPayload) {
    self.id = p.id;
    self.person = p.person;
    self.name = p.name;
    self.custom_id = p.custom_id;
    self.external_reference_id = p.external_reference_id;
    self.status = p.status;
    self.currency = p.currency;
    self.amount_total_gross = p.amount_total_gross;
    self.amount_total_net = p.amount_total_net;
    self.shipping_address = p.shipping_address;
    self.billing_address = p.billing_address;
    self.items = p.items;
    self.custom_properties = p.custom_properties;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
  }

  fn serialize_with(&self, _options: &SerializeOptions) -> CartPayload {
    CartPayload {
      id:                    self.id.clone(),
      person:                self.person.clone(),
      name:                  self.name.clone(),
      custom_id:             self.custom_id.clone(),
      external_reference_id: self.external_reference_id.clone(),
      status:                self.status.clone(),
      currency:              self.currency.clone(),
      amount_total_gross:    self.amount_total_gross.clone(),
      amount_total_net:      self.amount_total_net.clone(),
      shipping_address:      self.shipping_address.clone(),
      billing_address:       self.billing_address.clone(),
      items:                 self.items.clone(),
      custom_properties:     self.custom_properties.clone(),
      created_at:            self.created_at,
      updated_at:            self.updated_at,
      deleted:               SerializeOptions::deleted(self.deleted),
    }
  }
}

// ─── Order ───────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderPayload {
  pub id:                    Option<String>,
  pub person:                Option<String>,
  pub cart:                  Option<String>,
  pub custom_id:             Option<String>,
  pub external_reference_id: Option<String>,
  pub status:                Option<String>,
  pub currency:              Option<String>,
  pub amount_total_gross:    Option<Number>,
  pub amount_total_net:      Option<Number>,
  pub shipping_address:      Option<serde_json::Value>,
  pub billing_address:       Option<serde_json::Value>,
  pub items:                 Option<Vec<CartItem>>,
  pub custom_properties:     Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:            Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:            Option<DateTime<Utc>>,
  pub deleted:               Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Order {
  pub id:                    Option<String>,
  pub person:                Option<String>,
  /// The cart this order was placed from, if any.
  pub cart:                  Option<String>,
  pub custom_id:             Option<String>,
  pub external_reference_id: Option<String>,
  pub status:                Option<String>,
  pub currency:              Option<String>,
  pub amount_total_gross:    Option<Number>,
  pub amount_total_net:      Option<Number>,
  pub shipping_address:      Option<serde_json::Value>,
  pub billing_address:       Option<serde_json::Value>,
  pub items:                 Option<Vec<CartItem>>,
  pub custom_properties:     Option<serde_json::Value>,
  pub created_at:            Option<DateTime<Utc>>,
  pub updated_at:            Option<DateTime<Utc>>,
  pub deleted:               bool,
  initialized:               bool,
}

impl Entity for Order {
  type Payload = OrderPayload;

  const KIND: EntityKind = EntityKind::Order;
  const ENDPOINT: &'static str = "api/v0/orders";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: OrderPayload) {
    self.id = p.id;
    self.person = p.person;
    self.cart = p.cart;
    self.custom_id = p.custom_id;
    self.external_reference_id = p.external_reference_id;
    self.status = p.status;
    self.currency = p.currency;
    self.amount_total_gross = p.amount_total_gross;
    self.amount_total_net = p.amount_total_net;
    self.shipping_address = p.shipping_address;
    self.billing_address = p.billing_address;
    self.items = p.items;
    self.custom_properties = p.custom_properties;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
  }

  fn serialize_with(&self, _options: &SerializeOptions) -> OrderPayload {
    OrderPayload {
      id:                    self.id.clone(),
      person:                self.person.clone(),
      cart:                  self.cart.clone(),
      custom_id:             self.custom_id.clone(),
      external_reference_id: self.external_reference_id.clone(),
      status:                self.status.clone(),
      currency:              self.currency.clone(),
      amount_total_gross:    self.amount_total_gross.clone(),
      amount_total_net:      self.amount_total_net.clone(),
      shipping_address:      self.shipping_address.clone(),
      billing_address:       self.billing_address.clone(),
      items:                 self.items.clone(),
      custom_properties:     self.custom_properties.clone(),
      created_at:            self.created_at,
      updated_at:            self.updated_at,
      deleted:               SerializeOptions::deleted(self.deleted),
    }
  }
}

// ─── Deal ────────────────────────────────────────────────────────────────────

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealPayload {
  pub id:                Option<String>,
  pub person:            Option<String>,
  pub name:              Option<String>,
  pub pipeline:          Option<String>,
  pub pipeline_stage:    Option<String>,
  pub status:            Option<String>,
  pub value:             Option<Number>,
  pub currency:          Option<String>,
  pub custom_properties: Option<serde_json::Value>,
  #[serde(with = "iso8601")]
  pub created_at:        Option<DateTime<Utc>>,
  #[serde(with = "iso8601")]
  pub updated_at:        Option<DateTime<Utc>>,
  pub deleted:           Option<bool>,
}

/// A sales opportunity tracked through a pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deal {
  pub id:                Option<String>,
  pub person:            Option<String>,
  pub name:              Option<String>,
  pub pipeline:          Option<String>,
  pub pipeline_stage:    Option<String>,
  pub status:            Option<String>,
  pub value:             Option<Number>,
  pub currency:          Option<String>,
  pub custom_properties: Option<serde_json::Value>,
  pub created_at:        Option<DateTime<Utc>>,
  pub updated_at:        Option<DateTime<Utc>>,
  pub deleted:           bool,
  initialized:           bool,
}

impl Entity for Deal {
  type Payload = DealPayload;

  const KIND: EntityKind = EntityKind::Deal;
  const ENDPOINT: &'static str = "api/v0/deals";

  fn id(&self) -> Option<&str> { self.id.as_deref() }

  fn is_initialized(&self) -> bool { self.initialized }

  fn set_initialized(&mut self, initialized: bool) {
    self.initialized = initialized;
  }

  fn deserialize(&mut self, p: DealPayload) {
    self.id = p.id;
    self.person = p.person;
    self.name = p.name;
    self.pipeline = p.pipeline;
    self.pipeline_stage = p.pipeline_stage;
    self.status = p.status;
    self.value = p.value;
    self.currency = p.currency;
    self.custom_properties = p.custom_properties;
    self.created_at = p.created_at;
    self.updated_at = p.updated_at;
    self.deleted = p.deleted.unwrap_or(false);
  }

  fn serialize_with(&self, _options: &SerializeOptions) -> DealPayload {
    DealPayload {
      id:                self.id.clone(),
      person:            self.person.clone(),
      name:              self.name.clone(),
      pipeline:          self.pipeline.clone(),
      pipeline_stage:    self.pipeline_stage.clone(),
      status:            self.status.clone(),
      value:             self.value.clone(),
      currency:          self.currency.clone(),
      custom_properties: self.custom_properties.clone(),
      created_at:        self.created_at,
      updated_at:        self.updated_at,
      deleted:           SerializeOptions::deleted(self.deleted),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cart_items_round_trip_as_plain_data() {
    let payload: CartPayload = serde_json::from_value(serde_json::json!({
      "id": "c1",
      "person": "p1",
      "currency": "EUR",
      "items": [
        {
          "qty": 2,
          "sku": "SKU-1",
          "amount": { "net": 8.4, "gross": 10.0 },
          "discounts": [{ "type": "percentage", "value": 10.0 }],
          "custom_properties": { "gift_wrap": true }
        },
        { "qty": 1.5, "sku": "SKU-2" }
      ],
      "deleted": false
    }))
    .unwrap();

    let cart = Cart::create(payload.clone());
    assert_eq!(cart.item_count(), 3.5);
    let items = cart.items.as_ref().unwrap();
    assert_eq!(items[0].discounts.as_ref().unwrap()[0].kind.as_deref(), Some("percentage"));
    assert_eq!(cart.serialize(), payload);
  }

  #[test]
  fn absent_deleted_flag_serializes_as_false() {
    let deal = Deal::create(DealPayload {
      id: Some("d1".into()),
      ..Default::default()
    });
    assert_eq!(deal.serialize().deleted, Some(false));
  }
}
