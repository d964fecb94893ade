use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{MarketError, Result};
use crate::types::{CalculationMethod, CompoundFrequency, FeeType, PercentageBase};

/// marketplace-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// platform commission taken from every order subtotal
    pub commission: Rate,
    /// permit reservations starting in the past (administrative seeding)
    pub allow_past_start: bool,
    /// how often the accrual scheduler fires
    #[serde(with = "duration_secs")]
    pub accrual_interval: Duration,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            commission: Rate::from_percentage(10),
            allow_past_start: false,
            accrual_interval: Duration::hours(6),
        }
    }
}

impl MarketConfig {
    /// configuration for back-dated administrative seeding
    pub fn seeding() -> Self {
        Self {
            allow_past_start: true,
            ..Self::default()
        }
    }
}

/// late fee policy template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateFeeConfig {
    pub id: Uuid,
    pub name: String,
    pub fee_type: FeeType,
    pub enabled: bool,
    pub grace_period_days: u32,
    pub base_amount: Money,
    /// flat amount per day (fixed) or percent per day (percentage/compound)
    pub daily_rate: Decimal,
    pub max_amount: Money,
    pub calculation_method: CalculationMethod,
    pub percentage_base: PercentageBase,
    pub compound_frequency: CompoundFrequency,
    /// whether the accrual engine creates fees from this policy unprompted
    pub auto_apply: bool,
    /// empty means all categories
    pub applicable_categories: Vec<String>,
    pub minimum_order_amount: Money,
    /// zero means unbounded
    pub maximum_order_amount: Money,
    pub priority: i32,
    pub is_default: bool,
}

impl LateFeeConfig {
    /// standard overdue-payment policy: flat daily penalty after one grace day
    pub fn payment_overdue_default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "standard payment overdue".to_string(),
            fee_type: FeeType::PaymentOverdue,
            enabled: true,
            grace_period_days: 1,
            base_amount: Money::from_major(50),
            daily_rate: dec!(25),
            max_amount: Money::from_major(500),
            calculation_method: CalculationMethod::Fixed,
            percentage_base: PercentageBase::OrderTotal,
            compound_frequency: CompoundFrequency::Daily,
            auto_apply: true,
            applicable_categories: Vec::new(),
            minimum_order_amount: Money::ZERO,
            maximum_order_amount: Money::ZERO,
            priority: 0,
            is_default: true,
        }
    }

    /// standard overdue-return policy: daily percentage of the order total
    pub fn return_overdue_default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "standard return overdue".to_string(),
            fee_type: FeeType::ReturnOverdue,
            enabled: true,
            grace_period_days: 0,
            base_amount: Money::from_major(25),
            daily_rate: dec!(5),
            max_amount: Money::from_major(1_000),
            calculation_method: CalculationMethod::Percentage,
            percentage_base: PercentageBase::OrderTotal,
            compound_frequency: CompoundFrequency::Daily,
            auto_apply: true,
            applicable_categories: Vec::new(),
            minimum_order_amount: Money::ZERO,
            maximum_order_amount: Money::ZERO,
            priority: 0,
            is_default: true,
        }
    }

    /// compounding variant for high-value categories
    pub fn compound_return_overdue(categories: Vec<String>, priority: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "compounding return overdue".to_string(),
            fee_type: FeeType::ReturnOverdue,
            enabled: true,
            grace_period_days: 0,
            base_amount: Money::from_major(100),
            daily_rate: dec!(2),
            max_amount: Money::from_major(5_000),
            calculation_method: CalculationMethod::Compound,
            percentage_base: PercentageBase::OrderTotal,
            compound_frequency: CompoundFrequency::Daily,
            auto_apply: true,
            applicable_categories: categories,
            minimum_order_amount: Money::ZERO,
            maximum_order_amount: Money::ZERO,
            priority,
            is_default: false,
        }
    }

    /// reject templates that could never produce a sane fee
    pub fn validate(&self) -> Result<()> {
        if self.max_amount.is_negative() || self.base_amount.is_negative() {
            return Err(MarketError::InvalidConfiguration {
                message: format!("negative amounts in policy '{}'", self.name),
            });
        }
        if self.daily_rate.is_sign_negative() {
            return Err(MarketError::InvalidConfiguration {
                message: format!("negative daily rate in policy '{}'", self.name),
            });
        }
        if !self.maximum_order_amount.is_zero()
            && self.maximum_order_amount < self.minimum_order_amount
        {
            return Err(MarketError::InvalidConfiguration {
                message: format!("inverted order amount band in policy '{}'", self.name),
            });
        }
        Ok(())
    }
}

mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.num_seconds().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::seconds(i64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarketConfig::default();
        assert_eq!(config.commission, Rate::from_percentage(10));
        assert!(!config.allow_past_start);
        assert_eq!(config.accrual_interval, Duration::hours(6));

        assert!(MarketConfig::seeding().allow_past_start);
    }

    #[test]
    fn test_preset_policies_validate() {
        assert!(LateFeeConfig::payment_overdue_default().validate().is_ok());
        assert!(LateFeeConfig::return_overdue_default().validate().is_ok());
        assert!(LateFeeConfig::compound_return_overdue(vec!["cameras".into()], 10)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut config = LateFeeConfig::payment_overdue_default();
        config.minimum_order_amount = Money::from_major(500);
        config.maximum_order_amount = Money::from_major(100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = MarketConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: MarketConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.accrual_interval, config.accrual_interval);
        assert_eq!(back.commission, config.commission);
    }
}
