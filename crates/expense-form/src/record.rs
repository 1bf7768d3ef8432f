//! Reimbursement record model
//!
//! Money is kept in integer cents so column sums are exact. The record's
//! consistency (leg subtotals, column totals, amount in words) is the
//! caller's responsibility; `audit` reports discrepancies on request.

use crate::numerals::amount_in_words;
use crate::types::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Money amount in cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Amount(cents)
    }

    /// Whole yuan. Saturates at the ends of the cent range.
    pub const fn from_yuan(yuan: i64) -> Self {
        Amount(yuan.saturating_mul(100))
    }

    pub fn checked_from_yuan(yuan: i64) -> Option<Self> {
        yuan.checked_mul(100).map(Amount)
    }

    /// Nearest cent of a decimal yuan value; `None` if it is not finite or
    /// does not fit
    pub fn checked_from_f64(yuan: f64) -> Option<Self> {
        let cents = (yuan * 100.0).round();
        // i64::MAX as f64 rounds up to 2^63, which itself does not fit
        if cents.is_finite() && cents >= i64::MIN as f64 && cents < i64::MAX as f64 {
            Some(Amount(cents as i64))
        } else {
            None
        }
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    /// Sum of `amounts`, or `None` on overflow
    pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, Amount::checked_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Amount {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FormError::Amount(s.to_string());
        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() || frac.len() > 2 {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let yuan: i64 = whole.parse().map_err(|_| invalid())?;
        let cents: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };
        let total = yuan
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(invalid)?;

        Ok(Amount(if negative { -total } else { total }))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Int(yuan) => Amount::checked_from_yuan(yuan).ok_or_else(|| {
                serde::de::Error::custom(FormError::Amount(yuan.to_string()))
            }),
            Raw::Float(value) => Amount::checked_from_f64(value).ok_or_else(|| {
                serde::de::Error::custom(FormError::Amount(value.to_string()))
            }),
        }
    }
}

/// Form header fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Reimbursement number, encoded in the QR code
    pub code: String,
    pub date: String,
    pub department: String,
    /// e.g. "第 1 页/ 共 1 页"
    pub page_label: String,
    pub traveler: String,
    pub reason: String,
    #[serde(default)]
    pub project_name: Option<String>,
    /// Shown in the binding-line caption
    pub company_name: String,
}

/// One trip segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    pub departure_date: String,
    pub departure_place: String,
    pub arrival_date: String,
    pub arrival_place: String,
    /// Transport mode, e.g. "高铁"
    pub transport: String,
    pub transport_fee: Amount,
    #[serde(default)]
    pub days: f64,
    #[serde(default)]
    pub per_diem_rate: Amount,
    #[serde(default)]
    pub per_diem_amount: Amount,
    #[serde(default)]
    pub accommodation: Amount,
    #[serde(default)]
    pub local_transport: Amount,
    #[serde(default)]
    pub other_fee: Amount,
    pub subtotal: Amount,
    /// Number of attached receipts, free text
    #[serde(default)]
    pub receipts: Option<String>,
}

impl TripLeg {
    /// Sum of the fee columns of this leg, `None` on overflow
    pub fn fee_sum(&self) -> Option<Amount> {
        Amount::checked_sum([
            self.transport_fee,
            self.per_diem_amount,
            self.accommodation,
            self.local_transport,
            self.other_fee,
        ])
    }
}

/// Column totals and the grand total in words
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub transport: Amount,
    pub days: f64,
    pub per_diem: Amount,
    pub accommodation: Amount,
    pub local_transport: Amount,
    pub other: Amount,
    pub grand_total: Amount,
    pub amount_in_words: String,
    #[serde(default)]
    pub advance_amount: Option<Amount>,
    #[serde(default)]
    pub refund_amount: Option<Amount>,
}

impl Totals {
    /// Column-wise sums over `legs`. Fails with `FormError::Overflow` when a
    /// column does not fit in the cent range.
    pub fn from_legs(legs: &[TripLeg]) -> Result<Self> {
        let column = |name: &'static str, field: fn(&TripLeg) -> Amount| {
            Amount::checked_sum(legs.iter().map(field)).ok_or(FormError::Overflow(name))
        };

        let grand_total = column("grand", |leg| leg.subtotal)?;
        Ok(Self {
            transport: column("transport", |leg| leg.transport_fee)?,
            days: legs.iter().map(|leg| leg.days).sum(),
            per_diem: column("per diem", |leg| leg.per_diem_amount)?,
            accommodation: column("accommodation", |leg| leg.accommodation)?,
            local_transport: column("local transport", |leg| leg.local_transport)?,
            other: column("other", |leg| leg.other_fee)?,
            grand_total,
            amount_in_words: amount_in_words(grand_total),
            advance_amount: None,
            refund_amount: None,
        })
    }
}

/// An inconsistency found by `ReimbursementRecord::audit`
#[derive(Debug, Clone, PartialEq)]
pub enum Discrepancy {
    LegSubtotal {
        /// 0-based leg index
        leg: usize,
        expected: Amount,
        actual: Amount,
    },
    ColumnTotal {
        column: &'static str,
        expected: String,
        actual: String,
    },
    AmountInWords {
        expected: String,
        actual: String,
    },
    /// A sum that does not fit in the cent range
    Overflow { what: String },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::LegSubtotal {
                leg,
                expected,
                actual,
            } => write!(
                f,
                "leg {} subtotal is {}, fees add up to {}",
                leg + 1,
                actual,
                expected
            ),
            Discrepancy::ColumnTotal {
                column,
                expected,
                actual,
            } => write!(f, "{} total is {}, legs add up to {}", column, actual, expected),
            Discrepancy::AmountInWords { expected, actual } => {
                write!(f, "amount in words is '{}', expected '{}'", actual, expected)
            }
            Discrepancy::Overflow { what } => f.write_str(what),
        }
    }
}

/// A complete reimbursement form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReimbursementRecord {
    pub header: RecordHeader,
    pub legs: Vec<TripLeg>,
    pub totals: Totals,
}

impl ReimbursementRecord {
    /// Load a record from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Save the record as pretty-printed JSON
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Built-in example record with two train legs totalling 99.00
    pub fn sample() -> Self {
        let leg = |place: &str, fee: i64| TripLeg {
            departure_date: "2025-07-29 00".to_string(),
            departure_place: place.to_string(),
            arrival_date: "2025-07-29".to_string(),
            arrival_place: String::new(),
            transport: "高铁".to_string(),
            transport_fee: Amount::from_yuan(fee),
            days: 0.0,
            per_diem_rate: Amount::from_yuan(50),
            per_diem_amount: Amount::ZERO,
            accommodation: Amount::ZERO,
            local_transport: Amount::ZERO,
            other_fee: Amount::ZERO,
            subtotal: Amount::from_yuan(fee),
            receipts: None,
        };
        let legs = vec![leg("444", 44), leg("55", 55)];
        let grand_total = Amount::from_yuan(99);

        Self {
            header: RecordHeader {
                code: "CLBX202507280001".to_string(),
                date: "2025年07月28日".to_string(),
                department: "经营计划室".to_string(),
                page_label: "第 1 页/ 共 1 页".to_string(),
                traveler: "谢松".to_string(),
                reason: "999".to_string(),
                project_name: None,
                company_name: "淮安新业电力建设有限公司".to_string(),
            },
            totals: Totals {
                transport: grand_total,
                days: 0.0,
                per_diem: Amount::ZERO,
                accommodation: Amount::ZERO,
                local_transport: Amount::ZERO,
                other: Amount::ZERO,
                grand_total,
                amount_in_words: amount_in_words(grand_total),
                advance_amount: None,
                refund_amount: None,
            },
            legs,
        }
    }

    /// Check the record's arithmetic without changing anything
    pub fn audit(&self) -> Vec<Discrepancy> {
        let mut found = Vec::new();

        for (leg, trip) in self.legs.iter().enumerate() {
            match trip.fee_sum() {
                Some(expected) if expected != trip.subtotal => {
                    found.push(Discrepancy::LegSubtotal {
                        leg,
                        expected,
                        actual: trip.subtotal,
                    });
                }
                Some(_) => {}
                None => found.push(Discrepancy::Overflow {
                    what: format!("leg {} fees overflow", leg + 1),
                }),
            }
        }

        let actual = &self.totals;
        match Totals::from_legs(&self.legs) {
            Ok(expected) => {
                let columns = [
                    ("transport", expected.transport, actual.transport),
                    ("per diem", expected.per_diem, actual.per_diem),
                    ("accommodation", expected.accommodation, actual.accommodation),
                    ("local transport", expected.local_transport, actual.local_transport),
                    ("other", expected.other, actual.other),
                    ("grand", expected.grand_total, actual.grand_total),
                ];
                for (column, expected, actual) in columns {
                    if expected != actual {
                        found.push(Discrepancy::ColumnTotal {
                            column,
                            expected: expected.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                }
                if (expected.days - actual.days).abs() > 1e-6 {
                    found.push(Discrepancy::ColumnTotal {
                        column: "days",
                        expected: format!("{:.1}", expected.days),
                        actual: format!("{:.1}", actual.days),
                    });
                }
            }
            Err(err) => found.push(Discrepancy::Overflow {
                what: err.to_string(),
            }),
        }

        let words = amount_in_words(actual.grand_total);
        if words != actual.amount_in_words {
            found.push(Discrepancy::AmountInWords {
                expected: words,
                actual: actual.amount_in_words.clone(),
            });
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_parse_and_display() {
        assert_eq!("44.00".parse::<Amount>().unwrap(), Amount::from_cents(4400));
        assert_eq!("0.5".parse::<Amount>().unwrap(), Amount::from_cents(50));
        assert_eq!("12".parse::<Amount>().unwrap(), Amount::from_yuan(12));
        assert_eq!(Amount::from_cents(-150).to_string(), "-1.50");
        assert_eq!(Amount::from_cents(9900).to_string(), "99.00");
    }

    #[test]
    fn test_amount_rejects_bad_input() {
        assert!("1.234".parse::<Amount>().is_err());
        assert!("abc".parse::<Amount>().is_err());
        assert!(".50".parse::<Amount>().is_err());
        assert!("".parse::<Amount>().is_err());
    }

    #[test]
    fn test_amount_deserializes_strings_and_numbers() {
        let amounts: Vec<Amount> = serde_json::from_str(r#"["44.00", 55, 1.5]"#).unwrap();
        assert_eq!(
            amounts,
            vec![
                Amount::from_cents(4400),
                Amount::from_cents(5500),
                Amount::from_cents(150)
            ]
        );
        assert_eq!(serde_json::to_string(&amounts[0]).unwrap(), r#""44.00""#);
    }

    #[test]
    fn test_amount_out_of_range_is_rejected() {
        assert!("99999999999999999".parse::<Amount>().is_err());
        assert!(serde_json::from_str::<Amount>("99999999999999999").is_err());
        assert!(serde_json::from_str::<Amount>("1e300").is_err());
        assert!(serde_json::from_str::<Amount>("-1e300").is_err());
        assert!(serde_json::from_str::<Amount>("92233720368547759").is_err());
        assert_eq!(
            serde_json::from_str::<Amount>("92233720368547758").unwrap(),
            Amount::from_cents(9_223_372_036_854_775_800)
        );
        assert_eq!(Amount::checked_from_f64(f64::NAN), None);
        assert_eq!(Amount::checked_from_f64(f64::INFINITY), None);
        assert_eq!(Amount::from_yuan(i64::MAX).cents(), i64::MAX);
    }

    #[test]
    fn test_sums_report_overflow() {
        let big = Amount::from_cents(i64::MAX - 10);
        assert_eq!(
            big.checked_add(Amount::from_cents(10)),
            Some(Amount::from_cents(i64::MAX))
        );
        assert_eq!(big.checked_add(Amount::from_cents(11)), None);
        assert_eq!(Amount::checked_sum([big, big]), None);

        let mut record = ReimbursementRecord::sample();
        record.legs[0].subtotal = big;
        record.legs[1].subtotal = big;

        assert!(matches!(
            Totals::from_legs(&record.legs),
            Err(FormError::Overflow("grand"))
        ));
        assert!(
            record
                .audit()
                .iter()
                .any(|d| matches!(d, Discrepancy::Overflow { .. }))
        );
    }

    #[test]
    fn test_sample_is_consistent() {
        let record = ReimbursementRecord::sample();
        assert_eq!(record.totals.grand_total.to_string(), "99.00");
        assert_eq!(record.totals.amount_in_words, "玖拾玖元整");
        assert_eq!(Totals::from_legs(&record.legs).unwrap(), record.totals);
        assert!(record.audit().is_empty());
    }

    #[test]
    fn test_audit_reports_mismatches() {
        let mut record = ReimbursementRecord::sample();
        record.legs[0].subtotal = Amount::from_yuan(40);
        record.totals.amount_in_words = "壹元整".to_string();

        let found = record.audit();

        assert!(found.contains(&Discrepancy::LegSubtotal {
            leg: 0,
            expected: Amount::from_yuan(44),
            actual: Amount::from_yuan(40),
        }));
        assert!(found
            .iter()
            .any(|d| matches!(d, Discrepancy::ColumnTotal { column: "grand", .. })));
        assert!(found
            .iter()
            .any(|d| matches!(d, Discrepancy::AmountInWords { .. })));
    }
}
