//! 金额计算模块
//!
//! 所有金额运算使用 `rust_decimal` 在内部进行, 只在 serde 边界转回 f64,
//! 消除二进制浮点累加误差 (0.1 + 0.2 != 0.3 的问题).
//!
//! # 舍入规则
//!
//! 统一保留 2 位小数, 中点远离零舍入 (12.345 -> 12.35, -12.345 -> -12.35).
//!
//! # 计算口径
//!
//! - 创建: subtotal = Σ round2(单价) × 数量, tax = round2(subtotal × 10%),
//!   total = round2(subtotal + tax), discount 恒为 0
//! - 结算: total = subtotal + tax - discount, 其中 subtotal/tax 取存储值,
//!   绝不根据 items 重算

use rust_decimal::prelude::*;
use shared::OrderItem;

use crate::utils::{AppError, AppResult};

/// 金额保留小数位数
const DECIMAL_PLACES: u32 = 2;

/// 统一税率 10%
const TAX_RATE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// 金额比较容差 (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// 单价绝对值上限 (负单价合法, 表示折让行)
const MAX_PRICE: f64 = 1_000_000.0;

/// 单项数量上限
const MAX_QUANTITY: i32 = 9999;

/// 折扣上限
const MAX_DISCOUNT: f64 = 1_000_000.0;

/// 订单金额三元组, 全部已舍入到 2 位小数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for precise internal calculations
///
/// 调用前应已通过 [`require_finite`] 校验; 这里的回退只是兜底.
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_else(|| {
        tracing::error!(
            "Failed to convert f64 {} to Decimal, using zero as fallback",
            value
        );
        Decimal::ZERO
    })
}

/// Convert Decimal back to f64 at the serde boundary, rounded to 2 dp
fn to_f64(value: Decimal) -> f64 {
    let rounded =
        value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    // SAFETY: 已舍入到 2 位小数的金额必然在 f64 可表示范围内
    rounded
        .to_f64()
        .expect("rounded Decimal should convert to f64")
}

#[inline]
fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// 校验订单行
///
/// - items 非空
/// - name 去空白后非空
/// - price 有限且 |price| ≤ 1,000,000 (零价赠品和负价折让都合法)
/// - quantity 为 1..=9999 的整数
pub fn validate_items(items: &[OrderItem]) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::validation("items must be a non-empty array"));
    }
    for item in items {
        if item.name.trim().is_empty() {
            return Err(AppError::validation("item name must be a non-empty string"));
        }
        require_finite(item.price, "price")?;
        if item.price.abs() > MAX_PRICE {
            return Err(AppError::validation(format!(
                "price exceeds maximum allowed ({}), got {}",
                MAX_PRICE, item.price
            )));
        }
        if item.quantity < 1 {
            return Err(AppError::validation(format!(
                "quantity must be a positive integer, got {}",
                item.quantity
            )));
        }
        if item.quantity > MAX_QUANTITY {
            return Err(AppError::validation(format!(
                "quantity exceeds maximum allowed ({}), got {}",
                MAX_QUANTITY, item.quantity
            )));
        }
    }
    Ok(())
}

/// 校验结算折扣: 有限, 非负, 不超上限
pub fn validate_discount(discount: f64) -> AppResult<()> {
    require_finite(discount, "discount")?;
    if discount < 0.0 {
        return Err(AppError::validation(format!(
            "discount must be a non-negative number, got {}",
            discount
        )));
    }
    if discount > MAX_DISCOUNT {
        return Err(AppError::validation(format!(
            "discount exceeds maximum allowed ({}), got {}",
            MAX_DISCOUNT, discount
        )));
    }
    Ok(())
}

/// 创建时的金额推导 (折扣为 0)
pub fn calculate_totals(items: &[OrderItem]) -> OrderTotals {
    let subtotal: Decimal = items
        .iter()
        .map(|item| round2(to_decimal(item.price)) * Decimal::from(item.quantity))
        .sum();
    let subtotal = round2(subtotal);
    let tax = round2(subtotal * TAX_RATE);
    let total = round2(subtotal + tax);

    OrderTotals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        total: to_f64(total),
    }
}

/// 结算时的总额重算: 存储的 subtotal + 存储的 tax - 本次 discount
pub fn settlement_total(subtotal: f64, tax: f64, discount: f64) -> f64 {
    to_f64(to_decimal(subtotal) + to_decimal(tax) - to_decimal(discount))
}

/// 金额相等判断 (容差 0.01)
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < MONEY_TOLERANCE
}
