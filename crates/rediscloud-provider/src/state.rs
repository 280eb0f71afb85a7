//! Configured provider state shared by every controller

use std::sync::Arc;

use rediscloud_core::api::{
    AclHandler, BackupStatusHandler, CloudAccountHandler, DatabaseHandler, FixedDatabaseHandler,
    FixedSubscriptionHandler, MaintenanceHandler, PaymentMethodHandler, PricingHandler, PscHandler,
    RegionHandler, SubscriptionHandler, TagHandler, TransitGatewayHandler,
};
use rediscloud_core::{CloudClient, OperationContext, SubscriptionGuard, SubscriptionLocks};

use crate::error::Result;

/// API client plus the per-subscription mutation locks
#[derive(Debug, Clone)]
pub struct ProviderState {
    client: CloudClient,
    locks: Arc<SubscriptionLocks>,
}

impl ProviderState {
    /// State using the process-wide lock table
    pub fn new(client: CloudClient) -> Self {
        Self::with_locks(client, SubscriptionLocks::global())
    }

    pub fn with_locks(client: CloudClient, locks: Arc<SubscriptionLocks>) -> Self {
        Self { client, locks }
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }

    pub fn locks(&self) -> &SubscriptionLocks {
        &self.locks
    }

    /// Serialize mutations against one subscription until the guard drops
    pub async fn lock_subscription(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
    ) -> Result<SubscriptionGuard> {
        Ok(self.locks.lock(ctx, subscription_id).await?)
    }

    pub fn subscriptions(&self) -> SubscriptionHandler {
        SubscriptionHandler::new(self.client.clone())
    }

    pub fn databases(&self) -> DatabaseHandler {
        DatabaseHandler::new(self.client.clone())
    }

    pub fn fixed_subscriptions(&self) -> FixedSubscriptionHandler {
        FixedSubscriptionHandler::new(self.client.clone())
    }

    pub fn fixed_databases(&self) -> FixedDatabaseHandler {
        FixedDatabaseHandler::new(self.client.clone())
    }

    pub fn cloud_accounts(&self) -> CloudAccountHandler {
        CloudAccountHandler::new(self.client.clone())
    }

    pub fn regions(&self) -> RegionHandler {
        RegionHandler::new(self.client.clone())
    }

    pub fn psc(&self) -> PscHandler {
        PscHandler::new(self.client.clone())
    }

    pub fn transit_gateways(&self) -> TransitGatewayHandler {
        TransitGatewayHandler::new(self.client.clone())
    }

    pub fn acl(&self) -> AclHandler {
        AclHandler::new(self.client.clone())
    }

    pub fn tags(&self) -> TagHandler {
        TagHandler::new(self.client.clone())
    }

    pub fn maintenance(&self) -> MaintenanceHandler {
        MaintenanceHandler::new(self.client.clone())
    }

    pub fn pricing(&self) -> PricingHandler {
        PricingHandler::new(self.client.clone())
    }

    pub fn payment_methods(&self) -> PaymentMethodHandler {
        PaymentMethodHandler::new(self.client.clone())
    }

    pub fn backups(&self) -> BackupStatusHandler {
        BackupStatusHandler::new(self.client.clone())
    }
}
