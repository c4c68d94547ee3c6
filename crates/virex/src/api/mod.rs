//! Service API: wire types, sign-in links and typed endpoint calls.

pub mod client;
pub mod deeplink;
pub mod schemas;

pub use client::{HealthStatus, VirexApi};
pub use deeplink::{DeepLink, DeepLinkError};
pub use schemas::{
    AuthResponse, CategoryItem, SubscriptionDetails, SubscriptionInfo, TemplateItem,
    TemplatesResponse, UserInfo,
};
