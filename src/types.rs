//! Shared value types: currencies, money, percentages and dates
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

use crate::error::ValidationError;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, Default, Eq, Hash, PartialEq)]
pub enum Currency {
    #[n(0)]
    #[default]
    USD,
    #[n(1)]
    EUR,
    #[n(2)]
    TRY,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::TRY => "TRY",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "TRY" => Ok(Currency::TRY),
            other => Err(ValidationError::UnknownVariant {
                kind: "currency",
                value: other.to_string(),
            }),
        }
    }
}

/// Money in minor units (cents). Amounts carry no currency of their own: the
/// ledger sums them as raw numbers whatever the record's currency field says.
#[derive(Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Amount(u64);

/// Percentage stored in basis points, so 12.5% is `Percent(1250)`.
#[derive(Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Percent(u32);

/// Signed money in minor units, for balances and profit.
#[derive(Debug, Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SignedAmount(i64);

const BASIS: u128 = 10_000;

// (value * num + den/2) / den, saturating at u64::MAX
fn mul_div_round(value: u64, num: u128, den: u128) -> u64 {
    let scaled = (value as u128 * num + den / 2) / den;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor(cents: u64) -> Self {
        Self(cents)
    }
    pub fn from_major(units: u64) -> Self {
        Self(units.saturating_mul(100))
    }
    pub fn minor(&self) -> u64 {
        self.0
    }
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
    /// `self × (1 + pct/100)`, rounded half-up to the cent.
    pub fn with_markup(&self, pct: Percent) -> Self {
        Self(mul_div_round(self.0, BASIS + pct.0 as u128, BASIS))
    }
    /// `self × pct/100`, rounded half-up to the cent.
    pub fn percent(&self, pct: Percent) -> Self {
        Self(mul_div_round(self.0, pct.0 as u128, BASIS))
    }
    pub fn times(&self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
    pub fn saturating_sub(&self, other: Amount) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
    pub fn signed(&self) -> SignedAmount {
        SignedAmount(i64::try_from(self.0).unwrap_or(i64::MAX))
    }
    /// Whole units, rounded half-up. Documents never print cents.
    pub fn whole_units(&self) -> u64 {
        self.0 / 100 + u64::from(self.0 % 100 >= 50)
    }
    /// Thousands-grouped major units with cents only when non-zero: `12,500` or `12,500.75`.
    pub fn grouped(&self) -> String {
        grouped_minor(self.0 as u128)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.whole_units())
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        *self = *self + rhs;
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl SignedAmount {
    pub const ZERO: SignedAmount = SignedAmount(0);

    pub fn from_minor(cents: i64) -> Self {
        Self(cents)
    }
    pub fn minor(&self) -> i64 {
        self.0
    }
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
    pub fn abs(&self) -> Amount {
        Amount(self.0.unsigned_abs())
    }
    pub fn credit(&mut self, amount: Amount) {
        self.0 = self.0.saturating_add(amount.signed().0);
    }
    pub fn debit(&mut self, amount: Amount) {
        self.0 = self.0.saturating_sub(amount.signed().0);
    }
    /// Grouped like [`Amount::grouped`], with a leading `-` when negative.
    pub fn grouped(&self) -> String {
        let body = grouped_minor(self.0.unsigned_abs() as u128);
        if self.is_negative() {
            format!("-{body}")
        } else {
            body
        }
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.grouped())
    }
}

fn grouped_minor(cents: u128) -> String {
    let units = (cents / 100).to_string();
    let mut out = String::with_capacity(units.len() + units.len() / 3 + 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    match cents % 100 {
        0 => out,
        frac if frac % 10 == 0 => format!("{out}.{}", frac / 10),
        frac => format!("{out}.{frac:02}"),
    }
}

impl Percent {
    pub const ZERO: Percent = Percent(0);

    pub fn whole(pct: u32) -> Self {
        Self(pct.saturating_mul(100))
    }
    pub fn from_basis_points(bp: u32) -> Self {
        Self(bp)
    }
    pub fn basis_points(&self) -> u32 {
        self.0
    }
    /// `part / whole` as a percentage, `None` when `whole` is zero.
    pub fn ratio(part: SignedAmount, whole: Amount) -> Option<f64> {
        if whole.is_zero() {
            return None;
        }
        Some(part.minor() as f64 / whole.minor() as f64 * 100.0)
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 % 100 {
            0 => write!(f, "{}%", self.0 / 100),
            frac => write!(f, "{}.{:02}%", self.0 / 100, frac),
        }
    }
}

impl<C> minicbor::Encode<C> for Amount {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.u64(self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Amount {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(Amount(d.u64()?))
    }
}

impl<C> minicbor::Encode<C> for Percent {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.u32(self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for Percent {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(Percent(d.u32()?))
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
    pub fn date(&self) -> BusinessDate {
        BusinessDate(self.0.date_naive())
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Calendar date of a business event (issue, payment, loading, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusinessDate(NaiveDate);

impl BusinessDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }
    pub fn naive(&self) -> NaiveDate {
        self.0
    }
    pub fn year(&self) -> i32 {
        self.0.year()
    }
    pub fn month(&self) -> u32 {
        self.0.month()
    }
    /// `YYYY-MM`, the grouping key of monthly reports.
    pub fn month_key(&self) -> String {
        format!("{:04}-{:02}", self.0.year(), self.0.month())
    }
    /// `dd/mm/yyyy`, used on proforma invoices.
    pub fn format_en_gb(&self) -> String {
        self.0.format("%d/%m/%Y").to_string()
    }
    /// `dd.mm.yyyy`, used on Turkish statements.
    pub fn format_tr(&self) -> String {
        self.0.format("%d.%m.%Y").to_string()
    }
}

impl From<NaiveDate> for BusinessDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

impl FromStr for BusinessDate {
    type Err = chrono::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Self)
    }
}

impl fmt::Display for BusinessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl<C> minicbor::Encode<C> for BusinessDate {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.i32(self.0.num_days_from_ce())?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for BusinessDate {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let days = d.i32()?;

        NaiveDate::from_num_days_from_ce_opt(days)
            .map(BusinessDate)
            .ok_or(minicbor::decode::Error::message(
                "failed to convert day count to a calendar date",
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_encoding() {
        let original = TimeStamp::new();

        let encoding = minicbor::to_vec(original.clone()).unwrap();
        let decode: TimeStamp<Utc> = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn business_date_encoding() {
        let original = BusinessDate::from_ymd(2025, 3, 14).unwrap();

        let encoding = minicbor::to_vec(original).unwrap();
        let decode: BusinessDate = minicbor::decode(&encoding).unwrap();

        assert_eq!(original, decode);
    }

    #[test]
    fn markup_and_percent_round_half_up() {
        let price = Amount::from_major(1_000);
        assert_eq!(price.with_markup(Percent::whole(30)), Amount::from_major(1_300));
        assert_eq!(Amount::from_major(7_800).percent(Percent::whole(20)), Amount::from_major(1_560));
        // 0.05 * 10% = 0.005 -> rounds to one cent
        assert_eq!(Amount::from_minor(5).percent(Percent::whole(10)), Amount::from_minor(1));
    }

    #[test]
    fn grouping() {
        assert_eq!(Amount::from_major(1_234_567).grouped(), "1,234,567");
        assert_eq!(Amount::from_minor(50).grouped(), "0.5");
        assert_eq!(Amount::from_minor(123_456).grouped(), "1,234.56");
        assert_eq!(SignedAmount::from_minor(-200_000).grouped(), "-2,000");
    }

    #[test]
    fn whole_units_rounding() {
        assert_eq!(Amount::from_minor(149).whole_units(), 1);
        assert_eq!(Amount::from_minor(150).whole_units(), 2);
        assert_eq!(Amount::from_minor(150).to_string(), "2");
    }

    #[test]
    fn percent_display() {
        assert_eq!(Percent::whole(30).to_string(), "30%");
        assert_eq!(Percent::from_basis_points(1250).to_string(), "12.50%");
    }
}
