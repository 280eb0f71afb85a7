//! Composite resource identifiers
//!
//! Nested resources are addressed by slash-separated integer tuples. These
//! strings are what the host stores as the resource ID and what users pass to
//! the import command, so `parse(encode(id)) == id` must always hold.
//!
//! | Kind                 | Encoding                                  |
//! |----------------------|-------------------------------------------|
//! | Database             | `<subId>/<dbId>`                          |
//! | Transit gateway      | `<subId>/<tgwId>`                         |
//! | Transit gateway (AA) | `<subId>/<regionId>/<tgwId>`              |
//! | PSC endpoint         | `<subId>/<pscSvcId>/<epId>`               |
//! | PSC endpoint (AA)    | `<subId>/<regionId>/<pscSvcId>/<epId>`    |

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// Split `raw` into exactly `expected` integer parts
fn parse_parts<const N: usize>(kind: &str, layout: &str, raw: &str) -> Result<[i64; N]> {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != N {
        return Err(CoreError::Id(format!(
            "{} ID '{}' must have {} parts ({}), found {}",
            kind,
            raw,
            N,
            layout,
            parts.len()
        )));
    }

    let mut out = [0i64; N];
    for (slot, part) in out.iter_mut().zip(&parts) {
        *slot = part.trim().parse::<i64>().map_err(|_| {
            CoreError::Id(format!(
                "{} ID '{}' has non-integer part '{}' (expected {})",
                kind, raw, part, layout
            ))
        })?;
    }
    Ok(out)
}

/// Parse a bare integer ID (subscriptions, cloud accounts, ACL entities)
pub fn parse_int_id(kind: &str, raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| CoreError::Id(format!("{} ID '{}' is not an integer", kind, raw)))
}

/// `<subId>/<dbId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DatabaseId {
    pub subscription_id: i64,
    pub database_id: i64,
}

impl DatabaseId {
    pub fn new(subscription_id: i64, database_id: i64) -> Self {
        Self {
            subscription_id,
            database_id,
        }
    }

    /// Parse, accepting the legacy single-part form where the subscription
    /// comes from the resource's own `subscription_id` attribute
    pub fn parse_with_fallback(raw: &str, subscription_id: Option<i64>) -> Result<Self> {
        if !raw.contains('/') {
            let database_id = parse_int_id("Database", raw)?;
            let subscription_id = subscription_id.ok_or_else(|| {
                CoreError::Id(format!(
                    "Database ID '{}' has no subscription part and no subscription_id is set",
                    raw
                ))
            })?;
            return Ok(Self::new(subscription_id, database_id));
        }
        raw.parse()
    }
}

impl FromStr for DatabaseId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let [subscription_id, database_id] = parse_parts::<2>("Database", "<subId>/<dbId>", s)?;
        Ok(Self::new(subscription_id, database_id))
    }
}

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subscription_id, self.database_id)
    }
}

/// `<subId>/<tgwId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransitGatewayId {
    pub subscription_id: i64,
    pub tgw_id: i64,
}

impl FromStr for TransitGatewayId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let [subscription_id, tgw_id] = parse_parts::<2>("Transit gateway", "<subId>/<tgwId>", s)?;
        Ok(Self {
            subscription_id,
            tgw_id,
        })
    }
}

impl fmt::Display for TransitGatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subscription_id, self.tgw_id)
    }
}

/// `<subId>/<regionId>/<tgwId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveActiveTransitGatewayId {
    pub subscription_id: i64,
    pub region_id: i64,
    pub tgw_id: i64,
}

impl FromStr for ActiveActiveTransitGatewayId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let [subscription_id, region_id, tgw_id] = parse_parts::<3>(
            "Active-Active transit gateway",
            "<subId>/<regionId>/<tgwId>",
            s,
        )?;
        Ok(Self {
            subscription_id,
            region_id,
            tgw_id,
        })
    }
}

impl fmt::Display for ActiveActiveTransitGatewayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.subscription_id, self.region_id, self.tgw_id)
    }
}

/// `<subId>/<pscSvcId>/<epId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PscEndpointId {
    pub subscription_id: i64,
    pub psc_service_id: i64,
    pub endpoint_id: i64,
}

impl FromStr for PscEndpointId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let [subscription_id, psc_service_id, endpoint_id] =
            parse_parts::<3>("PSC endpoint", "<subId>/<pscSvcId>/<epId>", s)?;
        Ok(Self {
            subscription_id,
            psc_service_id,
            endpoint_id,
        })
    }
}

impl fmt::Display for PscEndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.subscription_id, self.psc_service_id, self.endpoint_id
        )
    }
}

/// `<subId>/<regionId>/<pscSvcId>/<epId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActiveActivePscEndpointId {
    pub subscription_id: i64,
    pub region_id: i64,
    pub psc_service_id: i64,
    pub endpoint_id: i64,
}

impl FromStr for ActiveActivePscEndpointId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let [subscription_id, region_id, psc_service_id, endpoint_id] = parse_parts::<4>(
            "Active-Active PSC endpoint",
            "<subId>/<regionId>/<pscSvcId>/<epId>",
            s,
        )?;
        Ok(Self {
            subscription_id,
            region_id,
            psc_service_id,
            endpoint_id,
        })
    }
}

impl fmt::Display for ActiveActivePscEndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.subscription_id, self.region_id, self.psc_service_id, self.endpoint_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_id_round_trip() {
        let id = DatabaseId::new(1234, 5678);
        assert_eq!(id.to_string(), "1234/5678");
        assert_eq!("1234/5678".parse::<DatabaseId>().unwrap(), id);
    }

    #[test]
    fn test_database_id_single_part_uses_subscription_fallback() {
        let id = DatabaseId::parse_with_fallback("5678", Some(1234)).unwrap();
        assert_eq!(id, DatabaseId::new(1234, 5678));

        let err = DatabaseId::parse_with_fallback("5678", None).unwrap_err();
        assert!(matches!(err, CoreError::Id(_)));
    }

    #[test]
    fn test_wrong_part_count_is_rejected() {
        let err = "1/2/3".parse::<DatabaseId>().unwrap_err();
        assert!(err.to_string().contains("must have 2 parts"));

        assert!("1/2".parse::<ActiveActiveTransitGatewayId>().is_err());
        assert!("1/2/3".parse::<ActiveActivePscEndpointId>().is_err());
        assert!("1/2/3/4".parse::<PscEndpointId>().is_err());
    }

    #[test]
    fn test_non_integer_part_is_rejected() {
        let err = "12/abc".parse::<TransitGatewayId>().unwrap_err();
        assert!(err.to_string().contains("non-integer part 'abc'"));

        assert!("a/b/c".parse::<PscEndpointId>().is_err());
        assert!("".parse::<DatabaseId>().is_err());
    }

    #[test]
    fn test_multi_part_ids_round_trip() {
        let tgw: ActiveActiveTransitGatewayId = "10/2/99".parse().unwrap();
        assert_eq!((tgw.subscription_id, tgw.region_id, tgw.tgw_id), (10, 2, 99));
        assert_eq!(tgw.to_string(), "10/2/99");

        let ep: ActiveActivePscEndpointId = "10/2/3/4".parse().unwrap();
        assert_eq!(ep.endpoint_id, 4);
        assert_eq!(ep.to_string(), "10/2/3/4");

        let ep: PscEndpointId = "10/3/4".parse().unwrap();
        assert_eq!(ep.to_string(), "10/3/4");
    }
}
