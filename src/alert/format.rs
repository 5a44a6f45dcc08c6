//! Alert text rendering

use crate::price::{AlertEvent, Direction};
use chrono::{FixedOffset, Offset, Utc};
use rust_decimal::Decimal;

/// Renders price alerts as human-readable text
#[derive(Debug, Clone)]
pub struct AlertFormatter {
    offset: FixedOffset,
    currency: String,
}

impl AlertFormatter {
    /// `utc_offset_minutes` sets the wall-clock time shown in the alert
    pub fn new(utc_offset_minutes: i32, currency: impl Into<String>) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self {
            offset,
            currency: currency.into(),
        }
    }

    pub fn render(&self, event: &AlertEvent) -> String {
        let marker = match event.direction() {
            Direction::Up => "🟢",
            Direction::Down => "🔴",
        };
        let local_time = event.triggered_at.with_timezone(&self.offset);

        format!(
            "{marker} Live Market Update ({time})\n\n{key}\nPrice: {cur}{price}\nChange: {sign}{cur}{change} ({sign}{pct:.2}%)",
            time = local_time.format("%I:%M %p"),
            key = event.instrument_key,
            cur = self.currency,
            price = group_thousands(event.new_price),
            sign = if event.change_abs.is_sign_negative() { "-" } else { "+" },
            change = group_thousands(event.change_abs.abs()),
            pct = event.change_pct.abs(),
        )
    }
}

impl Default for AlertFormatter {
    fn default() -> Self {
        // IST
        Self::new(330, "₹")
    }
}

/// `1234567.891` -> `1,234,567.89`
fn group_thousands(value: Decimal) -> String {
    let rendered = format!("{:.2}", value.round_dp(2));
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((&rendered, "00"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}{grouped}.{frac_part}")
}
