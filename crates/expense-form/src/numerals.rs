//! Formal Chinese numerals for amounts written out on financial documents

use crate::record::Amount;

const DIGITS: [char; 10] = ['零', '壹', '贰', '叁', '肆', '伍', '陆', '柒', '捌', '玖'];
const SECTION_UNITS: [&str; 4] = ["仟", "佰", "拾", ""];
/// Enough groups for every `i64` cent value
const GROUP_UNITS: [&str; 5] = ["", "万", "亿", "万亿", "亿亿"];

/// Write an amount in formal Chinese financial numerals.
///
/// Whole amounts end in `整`; zero yuan is written `零元`, and a missing
/// jiao between yuan and fen is written as `零`.
pub fn amount_in_words(amount: Amount) -> String {
    let cents = amount.cents().unsigned_abs();
    let yuan = cents / 100;
    let jiao = (cents / 10 % 10) as usize;
    let fen = (cents % 10) as usize;

    let mut out = String::new();
    if amount.cents() < 0 {
        out.push('负');
    }
    out.push_str(&integer_words(yuan));
    out.push('元');

    if jiao == 0 && fen == 0 {
        out.push('整');
        return out;
    }

    if jiao > 0 {
        out.push(DIGITS[jiao]);
        out.push('角');
    } else if yuan > 0 {
        out.push('零');
    }
    if fen > 0 {
        out.push(DIGITS[fen]);
        out.push('分');
    }
    out
}

fn integer_words(n: u64) -> String {
    if n == 0 {
        return DIGITS[0].to_string();
    }

    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push((rest % 10_000) as usize);
        rest /= 10_000;
    }

    let mut out = String::new();
    let mut pending_zero = false;
    for (index, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            pending_zero = !out.is_empty();
            continue;
        }
        if !out.is_empty() && (pending_zero || group < 1000) {
            out.push('零');
        }
        out.push_str(&section_words(group));
        out.push_str(GROUP_UNITS[index]);
        pending_zero = false;
    }
    out
}

/// Words for 1..=9999 without leading zeros
fn section_words(section: usize) -> String {
    let digits = [section / 1000, section / 100 % 10, section / 10 % 10, section % 10];
    let mut out = String::new();
    let mut zero = false;

    for (digit, unit) in digits.into_iter().zip(SECTION_UNITS) {
        if digit == 0 {
            zero = !out.is_empty();
            continue;
        }
        if zero {
            out.push('零');
            zero = false;
        }
        out.push(DIGITS[digit]);
        out.push_str(unit);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> String {
        amount_in_words(s.parse().unwrap())
    }

    #[test]
    fn test_whole_amounts() {
        assert_eq!(words("99.00"), "玖拾玖元整");
        assert_eq!(words("15.00"), "壹拾伍元整");
        assert_eq!(words("0.00"), "零元整");
        assert_eq!(words("100000"), "壹拾万元整");
    }

    #[test]
    fn test_internal_zeros() {
        assert_eq!(words("1005.30"), "壹仟零伍元叁角");
        assert_eq!(words("1000010.00"), "壹佰万零壹拾元整");
        assert_eq!(words("100000001"), "壹亿零壹元整");
        assert_eq!(words("20300"), "贰万零叁佰元整");
    }

    #[test]
    fn test_fractional_units() {
        assert_eq!(words("0.05"), "零元伍分");
        assert_eq!(words("1005.05"), "壹仟零伍元零伍分");
        assert_eq!(words("12.34"), "壹拾贰元叁角肆分");
    }

    #[test]
    fn test_large_group_units() {
        assert_eq!(words("1000000000000"), "壹万亿元整");
        assert_eq!(words("10000000000000"), "壹拾万亿元整");
        assert_eq!(words("10000000000000000"), "壹亿亿元整");
        assert_eq!(
            amount_in_words(Amount::from_cents(i64::MAX)),
            "玖亿亿贰仟贰佰叁拾叁万亿柒仟贰佰零叁亿陆仟捌佰伍拾肆万柒仟柒佰伍拾捌元零柒分"
        );
        assert!(amount_in_words(Amount::from_cents(i64::MIN)).starts_with("负玖亿亿"));
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(words("-99.00"), "负玖拾玖元整");
    }
}
