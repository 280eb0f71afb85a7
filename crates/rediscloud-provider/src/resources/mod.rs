//! Resource controllers, one module per Redis Cloud object family

mod acl;
mod active_active_database;
mod active_active_regions;
mod active_active_subscription;
mod cloud_account;
mod common;
mod database;
mod essentials_database;
mod essentials_subscription;
mod private_service_connect;
mod subscription;
mod transit_gateway;

use std::sync::Arc;

use crate::host::Resource;

pub use acl::{AclRoleResource, AclRuleResource, AclUserResource};
pub use active_active_database::ActiveActiveDatabaseResource;
pub use active_active_regions::ActiveActiveRegionsResource;
pub use active_active_subscription::ActiveActiveSubscriptionResource;
pub use cloud_account::CloudAccountResource;
pub use database::DatabaseResource;
pub use essentials_database::EssentialsDatabaseResource;
pub use essentials_subscription::EssentialsSubscriptionResource;
pub use private_service_connect::{
    PrivateServiceConnectAccepterResource, PrivateServiceConnectEndpointResource,
};
pub use subscription::SubscriptionResource;
pub use transit_gateway::{TransitGatewayAttachmentResource, TransitGatewayRouteResource};

pub(crate) use acl::role_state;

/// Every resource the provider registers
pub fn all() -> Vec<Arc<dyn Resource>> {
    vec![
        Arc::new(SubscriptionResource),
        Arc::new(DatabaseResource),
        Arc::new(ActiveActiveSubscriptionResource),
        Arc::new(ActiveActiveRegionsResource),
        Arc::new(ActiveActiveDatabaseResource),
        Arc::new(EssentialsSubscriptionResource),
        Arc::new(EssentialsDatabaseResource),
        Arc::new(CloudAccountResource),
        Arc::new(TransitGatewayAttachmentResource::PRO),
        Arc::new(TransitGatewayAttachmentResource::ACTIVE_ACTIVE),
        Arc::new(TransitGatewayRouteResource::PRO),
        Arc::new(TransitGatewayRouteResource::ACTIVE_ACTIVE),
        Arc::new(PrivateServiceConnectEndpointResource::PRO),
        Arc::new(PrivateServiceConnectEndpointResource::ACTIVE_ACTIVE),
        Arc::new(PrivateServiceConnectAccepterResource::PRO),
        Arc::new(PrivateServiceConnectAccepterResource::ACTIVE_ACTIVE),
        Arc::new(AclRuleResource),
        Arc::new(AclRoleResource),
        Arc::new(AclUserResource),
    ]
}
