//! Status tags reported by the Cloud API, grouped into the pending/target
//! sets the waiters use.

pub const ACTIVE: &str = "active";
pub const PENDING: &str = "pending";
pub const DELETING: &str = "deleting";
pub const ERROR: &str = "error";

/// Subscription (Pro, Active-Active and Essentials)
pub mod subscription {
    pub const PENDING: &[&str] = &[super::PENDING];
    pub const DELETE_PENDING: &[&str] = &[super::ACTIVE, super::PENDING, super::DELETING];
}

/// Database (Pro, Active-Active and Essentials)
pub mod database {
    pub const DRAFT: &str = "draft";
    pub const ACTIVE_CHANGE_DRAFT: &str = "active-change-draft";
    pub const ACTIVE_CHANGE_PENDING: &str = "active-change-pending";
    pub const RCP_DRAFT: &str = "rcp-draft";
    pub const RCP_CHANGE_PENDING: &str = "rcp-change-pending";
    pub const RCP_ACTIVE_CHANGE_DRAFT: &str = "rcp-active-change-draft";
    pub const PROXY_POLICY_CHANGE_PENDING: &str = "proxy-policy-change-pending";
    pub const PROXY_POLICY_CHANGE_DRAFT: &str = "proxy-policy-change-draft";
    pub const DYNAMIC_ENDPOINTS_CREATION_PENDING: &str = "dynamic-endpoints-creation-pending";

    /// Every state a database passes through on its way to `active`
    pub const PENDING: &[&str] = &[
        DRAFT,
        super::PENDING,
        ACTIVE_CHANGE_DRAFT,
        ACTIVE_CHANGE_PENDING,
        RCP_DRAFT,
        RCP_CHANGE_PENDING,
        RCP_ACTIVE_CHANGE_DRAFT,
        PROXY_POLICY_CHANGE_PENDING,
        PROXY_POLICY_CHANGE_DRAFT,
        DYNAMIC_ENDPOINTS_CREATION_PENDING,
    ];

    pub const DELETE_PENDING: &[&str] = &[
        super::ACTIVE,
        super::DELETING,
        super::PENDING,
        ACTIVE_CHANGE_PENDING,
    ];
}

/// Cloud accounts
pub mod cloud_account {
    pub const DRAFT: &str = "draft";
    pub const CHANGE_DRAFT: &str = "change-draft";
    pub const PENDING: &[&str] = &[DRAFT, CHANGE_DRAFT];
    pub const DELETE_PENDING: &[&str] = &[super::ACTIVE, DRAFT, CHANGE_DRAFT, super::DELETING];
}

/// ACL rules, roles and users
pub mod acl {
    pub const PENDING: &[&str] = &[super::PENDING];
    pub const DELETE_PENDING: &[&str] = &[super::ACTIVE, super::PENDING, super::DELETING];
}

/// Private Service Connect endpoints
pub mod psc {
    pub const INITIALIZED: &str = "initialized";
    pub const PROCESSING: &str = "processing";
    pub const PENDING: &str = "pending";
    pub const ACCEPT_PENDING: &str = "accept-pending";
    pub const ACTIVE: &str = "active";
    pub const REJECT_PENDING: &str = "reject-pending";
    pub const REJECTED: &str = "rejected";
    pub const DELETED: &str = "deleted";
    pub const FAILED: &str = "failed";

    /// States before the endpoint is ready for an accept/reject decision
    pub const CREATE_PENDING: &[&str] = &[INITIALIZED, PROCESSING];
    /// States an endpoint may be in while waiting for the consumer side
    pub const CREATE_TARGET: &[&str] = &[PENDING, ACTIVE, REJECTED];
    pub const ACCEPT_PENDING_STATES: &[&str] = &[PENDING, ACCEPT_PENDING];
    pub const REJECT_PENDING_STATES: &[&str] = &[PENDING, REJECT_PENDING];
    pub const DELETE_PENDING: &[&str] = &[
        INITIALIZED,
        PROCESSING,
        PENDING,
        ACCEPT_PENDING,
        ACTIVE,
        REJECT_PENDING,
        REJECTED,
        FAILED,
    ];
}

/// Transit gateway attachment status values
pub mod transit_gateway {
    pub const AVAILABLE: &str = "available";
    pub const PENDING_ACCEPTANCE: &str = "pending-acceptance";
}
