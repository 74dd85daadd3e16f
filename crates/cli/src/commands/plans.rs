//! Plan catalog listing.

use bizshop_core::entitlements::capabilities_for;
use bizshop_core::plans::{self, Billing, PlanDefinition};
use rust_decimal::Decimal;

/// Print every plan with its price, caps, commission and features.
#[allow(clippy::print_stdout)]
pub fn print() {
    for plan in plans::all() {
        println!("{}", describe(plan));
    }
}

fn describe(plan: &PlanDefinition) -> String {
    let price = match plan.billing {
        Billing::Free => "free".to_owned(),
        Billing::Recurring => format!("Rs. {}/month", plan.price_inr),
        Billing::OneTime => format!("Rs. {} once", plan.price_inr),
    };
    let capabilities = capabilities_for(plan.id);
    format!(
        "{:<9} {:<16} products: {:<9} stores: {:<9} fee: {}%  managers: {}\n          {}",
        plan.id.as_str(),
        price,
        plan.max_products.to_string(),
        plan.max_stores.to_string(),
        (plan.fee_rate() * Decimal::ONE_HUNDRED).normalize(),
        capabilities.max_managers,
        plan.features.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizshop_core::PlanTier;

    #[test]
    fn test_describe_free_plan() {
        let line = describe(PlanTier::Free.definition());
        assert!(line.starts_with("free"));
        assert!(line.contains("products: 10"));
        assert!(line.contains("fee: 5%"));
    }

    #[test]
    fn test_describe_lifetime_is_one_time() {
        let line = describe(PlanTier::Lifetime.definition());
        assert!(line.contains("once"));
    }
}
