//! Domain models for subscription-service.

mod calculation;
mod currency;
mod currency_rate;
mod payment_log;
mod profit;
mod settings;
mod subscription;
mod user;
mod user_subscription;

pub use calculation::PaymentAmount;
pub use currency::{
    from_minor_units, round_money, to_minor_units, Currency, RateSource, MAX_MONEY, MAX_PERCENT,
    MAX_RATE, SETTLEMENT_CURRENCY,
};
pub use currency_rate::{CreateCurrencyRate, CurrencyRate, UpdateCurrencyRate};
pub use payment_log::{NewPaymentLog, PaymentLog};
pub use profit::{ProfitStats, SubscriptionProfitStats, UserProfitStats};
pub use settings::GlobalSettings;
pub use subscription::{CreateSubscription, Subscription, UpdateSubscription};
pub use user::{CreateUser, UpdateUser, User};
pub use user_subscription::{
    CreateUserSubscription, PricingMode, PricingOverride, UserSubscription,
};
