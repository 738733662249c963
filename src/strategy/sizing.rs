//! Order sizing from available balance, net of fee and tax.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::exchange::types::{BalanceSnapshot, Side};

use super::price::{round_to, AMOUNT_DECIMALS, PRICE_DECIMALS};

/// Tax rate applied on top of the maker fee.
pub const TAX_RATE: Decimal = dec!(0.18);

/// Quote balance below which a buy is treated as insufficient.
pub const MIN_QUOTE_BALANCE: Decimal = Decimal::ONE;

/// Quote balance left after deducting the maker fee and the tax on that
/// fee, rounded to currency precision.
pub fn spendable_quote(balance: &BalanceSnapshot) -> Decimal {
    let money = balance.money_available;
    let fee = round_to(money * balance.maker_fee_rate, PRICE_DECIMALS);
    let tax = round_to(fee * TAX_RATE, PRICE_DECIMALS);
    round_to(money - (fee + tax), PRICE_DECIMALS)
}

/// Executable order amount for one side at the target price.
///
/// Buy: the post-fee-and-tax quote balance converted at `price`, eight
/// decimals; zero when that balance is below one currency unit
/// ("insufficient", not an error). Sell: the available base-asset
/// balance unmodified; fees are charged on the quote side at fill time.
pub fn order_amount(side: Side, balance: &BalanceSnapshot, price: Decimal) -> Decimal {
    match side {
        Side::Buy => {
            let money = spendable_quote(balance);
            if money < MIN_QUOTE_BALANCE || price <= Decimal::ZERO {
                return Decimal::ZERO;
            }
            round_to(money / price, AMOUNT_DECIMALS)
        }
        Side::Sell => balance.bitcoin_available,
    }
}
