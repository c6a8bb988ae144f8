//! Concrete entity models.

pub mod commerce;
pub mod contact;
pub mod feed;
pub mod message;
pub mod person;

pub use commerce::{
  Amount, Cart, CartItem, CartItemDiscount, CartPayload, Deal, DealPayload,
  Order, OrderPayload,
};
pub use contact::{
  Address, AddressPayload, ChannelUser, ChannelUserPayload, Email,
  EmailPayload, Phonenumber, PhonenumberPayload,
};
pub use feed::{Event, EventPayload, EventType, Feed, FeedPayload};
pub use message::{
  Message, MessageAuthor, MessageContent, MessagePayload, MessageTemplate,
  MessageTemplatePayload,
};
pub use person::{Person, PersonPayload};
