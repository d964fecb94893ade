use crate::config::LateFeeConfig;
use crate::state::Order;
use crate::types::FeeType;

/// select the applicable policy for a fee type and order, or None
///
/// Candidates must be enabled, match the fee type, cover the order's
/// category (an empty category list covers everything) and contain the
/// order's total amount in their band (a zero maximum is unbounded).
/// Survivors are ranked by priority, defaults winning ties.
pub fn resolve_config<'a>(
    configs: &'a [LateFeeConfig],
    fee_type: FeeType,
    order: &Order,
) -> Option<&'a LateFeeConfig> {
    configs
        .iter()
        .filter(|c| c.enabled && c.fee_type == fee_type)
        .filter(|c| {
            c.applicable_categories.is_empty()
                || c.applicable_categories.contains(&order.category)
        })
        .filter(|c| order.total_amount >= c.minimum_order_amount)
        .filter(|c| c.maximum_order_amount.is_zero() || order.total_amount <= c.maximum_order_amount)
        .max_by_key(|c| (c.priority, c.is_default))
}
