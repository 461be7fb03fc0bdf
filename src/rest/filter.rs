//! Object filter and mask construction for catalog queries.
//!
//! The provider's list endpoints accept a nested JSON object filter. Only
//! the description clause is built server-side; capacity predicates differ
//! between order kinds (exact match for storage, at-least for snapshot
//! space) and are applied client-side by the order builder.

use serde_json::{Value, json};

/// Object mask applied to price catalog queries.
pub(crate) const PRICE_MASK: &str = "mask[id,recurringFee,item[capacity,description]]";

/// Builds the object filter matching catalog item descriptions.
///
/// The `*=` operation is the provider's case-insensitive substring match.
pub(crate) fn description_filter(pattern: &str) -> Value {
    json!({
        "itemPrices": {
            "item": {
                "description": {
                    "operation": format!("*= {pattern}")
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_filter_nests_the_substring_operation() {
        let filter = description_filter("GB iSCSI SAN Storage");

        assert_eq!(
            filter,
            json!({
                "itemPrices": {
                    "item": {
                        "description": { "operation": "*= GB iSCSI SAN Storage" }
                    }
                }
            })
        );
    }

    #[test]
    fn price_mask_requests_capacity_and_fee() {
        assert!(PRICE_MASK.contains("recurringFee"));
        assert!(PRICE_MASK.contains("capacity"));
    }
}
