//! Messaging-channel boundary: webhook envelope normalization, the
//! outbound trait, and the WhatsApp gateway HTTP client.

pub mod error;
pub mod outbound;
pub mod webhook;
pub mod whatsapp;

pub use {
    error::{Error, Result},
    outbound::{ChannelOutbound, InstanceRef},
    webhook::{AudioRef, IgnoreReason, Inbound, WebhookEvent, normalize},
    whatsapp::WhatsAppGateway,
};
