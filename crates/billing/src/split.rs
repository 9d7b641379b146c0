/// The platform's share of every customer payment.
pub const PLATFORM_FEE_RATE: f64 = 0.30;

const MINOR_UNITS_PER_UNIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueSplit {
    pub platform_fee: i64,
    pub creator_earnings: i64,
}

/// Splits a charge amount (minor units) between the platform and the
/// creator. The platform fee is 30% rounded to the nearest whole currency
/// unit; the creator earnings absorb the rounding remainder, so the two
/// parts always sum back to the charged amount.
pub fn split_amount(amount_total: i64) -> RevenueSplit {
    let amount_units = amount_total as f64 / MINOR_UNITS_PER_UNIT as f64;
    let platform_fee = (amount_units * PLATFORM_FEE_RATE).round() as i64 * MINOR_UNITS_PER_UNIT;
    RevenueSplit {
        platform_fee,
        creator_earnings: amount_total - platform_fee,
    }
}

/// Renders a minor-unit amount for notification copy: whole amounts drop
/// the cents ("$100"), fractional amounts keep them ("$99.99").
pub fn format_amount(minor: i64) -> String {
    if minor % MINOR_UNITS_PER_UNIT == 0 {
        format!("${}", minor / MINOR_UNITS_PER_UNIT)
    } else {
        format!("${}.{:02}", minor / MINOR_UNITS_PER_UNIT, (minor % MINOR_UNITS_PER_UNIT).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_thirty_percent_rounded_to_whole_units() {
        let split = split_amount(10_000);
        assert_eq!(split.platform_fee, 3_000);
        assert_eq!(split.creator_earnings, 7_000);
    }

    #[test]
    fn creator_absorbs_the_rounding_remainder() {
        let split = split_amount(9_999);
        assert_eq!(split.platform_fee, 3_000);
        assert_eq!(split.creator_earnings, 6_999);
        assert_eq!(split.platform_fee + split.creator_earnings, 9_999);
    }

    #[test]
    fn half_units_round_away_from_zero() {
        // 30% of $5.00 is $1.50, which rounds up to $2.
        let split = split_amount(500);
        assert_eq!(split.platform_fee, 200);
        assert_eq!(split.creator_earnings, 300);
    }

    #[test]
    fn tiny_amounts_can_carry_no_fee() {
        let split = split_amount(155);
        assert_eq!(split.platform_fee, 0);
        assert_eq!(split.creator_earnings, 155);
    }

    #[test]
    fn split_always_sums_to_total() {
        for amount in [0, 1, 99, 100, 101, 2_499, 10_000, 123_456_789] {
            let split = split_amount(amount);
            assert_eq!(split.platform_fee + split.creator_earnings, amount);
        }
    }

    #[test]
    fn formats_whole_and_fractional_amounts() {
        assert_eq!(format_amount(10_000), "$100");
        assert_eq!(format_amount(9_999), "$99.99");
        assert_eq!(format_amount(105), "$1.05");
    }
}
