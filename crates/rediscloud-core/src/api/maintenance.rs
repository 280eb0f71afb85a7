//! Subscription maintenance windows

use redis_cloud::subscriptions::{MaintenanceWindowSpec, SubscriptionMaintenanceWindowsSpec};
use serde::{Deserialize, Serialize};

use super::api_id;
use super::tasks::TaskStateUpdate;
use crate::client::CloudClient;
use crate::error::{CoreError, InFamily, ResourceFamily, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindows {
    /// `automatic` or `manual`
    pub mode: String,
    #[serde(default)]
    pub windows: Vec<MaintenanceWindow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceWindow {
    pub start_hour: i64,
    pub duration_in_hours: i64,
    #[serde(default)]
    pub days: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MaintenanceHandler {
    client: CloudClient,
}

impl MaintenanceHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, subscription_id: i64) -> Result<MaintenanceWindows> {
        self.client
            .get(
                ResourceFamily::MaintenanceWindow,
                &format!("/subscriptions/{}/maintenance-windows", subscription_id),
            )
            .await
    }

    pub async fn update(
        &self,
        subscription_id: i64,
        windows: &MaintenanceWindows,
    ) -> Result<TaskStateUpdate> {
        // automatic mode must not carry windows
        let spec_windows = if windows.mode == "automatic" {
            None
        } else {
            Some(
                windows
                    .windows
                    .iter()
                    .map(window_spec)
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        let request = SubscriptionMaintenanceWindowsSpec {
            mode: windows.mode.clone(),
            windows: spec_windows,
        };
        let task = self
            .client
            .cloud()
            .subscriptions()
            .update_subscription_maintenance_windows(api_id(subscription_id)?, &request)
            .await
            .in_family(ResourceFamily::MaintenanceWindow)?;
        TaskStateUpdate::from_task(&task)
    }
}

fn window_spec(window: &MaintenanceWindow) -> Result<MaintenanceWindowSpec> {
    let hours = |value: i64| {
        i32::try_from(value).map_err(|_| {
            CoreError::Validation(format!("maintenance window hour {} is out of range", value))
        })
    };
    Ok(MaintenanceWindowSpec {
        start_hour: hours(window.start_hour)?,
        duration_in_hours: hours(window.duration_in_hours)?,
        days: window.days.clone(),
    })
}
