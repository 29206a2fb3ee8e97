use crate::config::pricing::{
    BARGAIN_FLOOR, BAR_WIDTH, CURRENCY, NEGOTIABLE_MARKER, NEGOTIABLE_TOLERANCE, OUT_OF_BAND_BAR,
    PLACEHOLDER_PRICE,
};
use crate::types::{PriceClassification, PriceHint, PricePosition};

/// Classify a raw price text against the band `[low, high]`.
///
/// Rules, first match wins:
/// 1. no digits: surfaced without label (the user decides)
/// 2. price of exactly 1: surfaced with the in-band label
/// 3. inside the band: surfaced with a 10-cell position bar
/// 4. up to 10% above the band and negotiable ("VB"): surfaced, hint `+10%`
/// 5. up to 30% below the band: surfaced, hint `-30%`
/// 6. anything else is dropped
///
/// All rounding is half-to-even. `low <= high` is validated when the watch is created.
///
/// The bar has cells 0..=9 but the slot ranges over 0..=10: slot 10 (`price == high`)
/// shares the last cell, so e.g. 19 and 20 in `[0, 20]` both render `.........X`.
pub fn classify(raw_price: &str, low: u32, high: u32) -> PriceClassification {
    let Some(price) = extract_price(raw_price) else {
        return PriceClassification {
            worth_messaging: true,
            position: PricePosition::Unpriced,
            price_range: None,
            price_hint: None,
        };
    };

    let in_band = u64::from(low) <= price && price <= u64::from(high);

    if price == PLACEHOLDER_PRICE || in_band {
        let bar = if in_band {
            position_bar(price, low, high)
        } else {
            OUT_OF_BAND_BAR.to_string()
        };
        return PriceClassification {
            worth_messaging: true,
            position: if in_band { PricePosition::InBand } else { PricePosition::Placeholder },
            price_range: Some(format!("X < {low}{CURRENCY} [{bar}] {high}{CURRENCY}")),
            price_hint: None,
        };
    }

    if price > u64::from(high)
        && price <= negotiable_ceiling(high)
        && raw_price.contains(NEGOTIABLE_MARKER)
    {
        return PriceClassification {
            worth_messaging: true,
            position: PricePosition::NegotiableAbove,
            price_range: Some(format!(
                "{low}{CURRENCY} [{OUT_OF_BAND_BAR}] {high}{CURRENCY} > X"
            )),
            price_hint: Some(PriceHint::AboveNegotiable),
        };
    }

    if (price as f64) >= f64::from(low) * BARGAIN_FLOOR && price < u64::from(low) {
        return PriceClassification {
            worth_messaging: true,
            position: PricePosition::BelowBand,
            price_range: Some(format!(
                "X < {low}{CURRENCY} [{OUT_OF_BAND_BAR}] {high}{CURRENCY}"
            )),
            price_hint: Some(PriceHint::BelowBand),
        };
    }

    PriceClassification {
        worth_messaging: false,
        position: PricePosition::OutOfRange,
        price_range: None,
        price_hint: None,
    }
}

/// First run of ASCII digits as an integer. Runs too long for `u64` count as no price.
pub fn extract_price(raw_price: &str) -> Option<u64> {
    let start = raw_price.find(|c: char| c.is_ascii_digit())?;
    let rest = &raw_price[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Highest negotiable price still surfaced: `round(high * 1.1)`.
fn negotiable_ceiling(high: u32) -> u64 {
    (f64::from(high) * NEGOTIABLE_TOLERANCE).round_ties_even() as u64
}

/// Cell index of `price` inside the band, in `[0, 10]`. A degenerate band maps to 0.
pub fn band_slot(price: u64, low: u32, high: u32) -> usize {
    if high == low {
        return 0;
    }
    let offset = price.saturating_sub(u64::from(low)) as f64;
    let width = f64::from(high - low);
    (offset * BAR_WIDTH as f64 / width)
        .round_ties_even()
        .clamp(0.0, BAR_WIDTH as f64) as usize
}

/// Render the 10-cell bar. Slot 10 (price == high) is drawn in the last cell.
fn position_bar(price: u64, low: u32, high: u32) -> String {
    let marker = band_slot(price, low, high).min(BAR_WIDTH - 1);
    (0..BAR_WIDTH)
        .map(|cell| if cell == marker { 'X' } else { '.' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar_of(c: &PriceClassification) -> &str {
        let label = c.price_range.as_deref().unwrap_or("");
        let start = label.find('[').map(|i| i + 1).unwrap_or(0);
        let end = label.find(']').unwrap_or(label.len());
        &label[start..end]
    }

    #[test]
    fn in_band_midpoint() {
        let c = classify("75€", 50, 100);
        assert!(c.worth_messaging);
        assert_eq!(c.position, PricePosition::InBand);
        assert_eq!(c.price_range.as_deref(), Some("X < 50€ [.....X....] 100€"));
        assert!(c.price_hint.is_none());
    }

    #[test]
    fn in_band_every_price_has_one_marker_at_its_slot() {
        let (low, high) = (37u32, 113u32);
        for p in low..=high {
            let c = classify(&format!("{p} € VB"), low, high);
            assert!(c.worth_messaging, "p={p}");
            let bar = bar_of(&c);
            assert_eq!(bar.len(), 10, "p={p}");
            assert_eq!(bar.matches('X').count(), 1, "p={p} bar={bar}");
            let expected = band_slot(u64::from(p), low, high).min(9);
            assert_eq!(bar.find('X'), Some(expected), "p={p}");
        }
    }

    #[test]
    fn band_edges() {
        assert_eq!(bar_of(&classify("50 €", 50, 100)), "X.........");
        assert_eq!(band_slot(100, 50, 100), 10);
        assert_eq!(bar_of(&classify("100 €", 50, 100)), ".........X");
    }

    #[test]
    fn top_slot_shares_last_cell() {
        assert_eq!(band_slot(19, 0, 20), 10);
        assert_eq!(band_slot(20, 0, 20), 10);
        assert_eq!(bar_of(&classify("19 €", 0, 20)), ".........X");
        assert_eq!(bar_of(&classify("20 €", 0, 20)), ".........X");
        assert_eq!(bar_of(&classify("17 €", 0, 20)), "........X.");
    }

    #[test]
    fn slot_rounds_half_to_even() {
        // (1 - 0) * 10 / 20 = 0.5 -> 0, (3 - 0) * 10 / 20 = 1.5 -> 2
        assert_eq!(band_slot(1, 0, 20), 0);
        assert_eq!(band_slot(3, 0, 20), 2);
        assert_eq!(bar_of(&classify("3 €", 0, 20)), "..X.......");
    }

    #[test]
    fn degenerate_band_uses_first_cell() {
        let c = classify("100€", 100, 100);
        assert!(c.worth_messaging);
        assert_eq!(c.price_range.as_deref(), Some("X < 100€ [X.........] 100€"));
        assert!(c.price_hint.is_none());
    }

    #[test]
    fn no_digits_fails_open() {
        let c = classify("keine Preisangabe", 50, 100);
        assert!(c.worth_messaging);
        assert_eq!(c.position, PricePosition::Unpriced);
        assert!(c.price_range.is_none());
        assert!(c.price_hint.is_none());

        assert!(classify("VB", 50, 100).worth_messaging);
        assert!(classify("", 50, 100).worth_messaging);
    }

    #[test]
    fn absurdly_long_number_fails_open() {
        let c = classify("123456789012345678901234567890 €", 50, 100);
        assert_eq!(c.position, PricePosition::Unpriced);
        assert!(c.worth_messaging);
    }

    #[test]
    fn placeholder_price_outside_band_gets_in_band_label() {
        let c = classify("1 €", 50, 100);
        assert!(c.worth_messaging);
        assert_eq!(c.position, PricePosition::Placeholder);
        assert_eq!(c.price_range.as_deref(), Some("X < 50€ [...] 100€"));
        assert!(c.price_hint.is_none());
    }

    #[test]
    fn thousands_separator_reads_as_placeholder() {
        // "1.250" -> first digit run is "1"
        let c = classify("1.250 € VB", 50, 100);
        assert_eq!(c.position, PricePosition::Placeholder);
        assert!(c.worth_messaging);
    }

    #[test]
    fn placeholder_inside_band_draws_bar() {
        let c = classify("1 €", 0, 20);
        assert_eq!(c.position, PricePosition::InBand);
        assert_eq!(c.price_range.as_deref(), Some("X < 0€ [X.........] 20€"));
    }

    #[test]
    fn negotiable_up_to_ten_percent_above() {
        let c = classify("110 € VB", 50, 100);
        assert!(c.worth_messaging);
        assert_eq!(c.price_hint, Some(PriceHint::AboveNegotiable));
        assert_eq!(c.price_hint.map(|h| h.to_string()).as_deref(), Some("+10%"));
        assert_eq!(c.price_range.as_deref(), Some("50€ [...] 100€ > X"));

        assert!(classify("101 VB", 50, 100).worth_messaging);
    }

    #[test]
    fn above_band_without_marker_is_dropped() {
        for raw in ["101 €", "110 €", "110 € vb", "110 € Vb"] {
            let c = classify(raw, 50, 100);
            assert!(!c.worth_messaging, "raw={raw}");
            assert!(c.price_range.is_none());
            assert!(c.price_hint.is_none());
        }
    }

    #[test]
    fn negotiable_ceiling_is_inclusive_and_rounded() {
        assert_eq!(negotiable_ceiling(100), 110);
        assert!(!classify("111 € VB", 50, 100).worth_messaging);

        assert_eq!(negotiable_ceiling(200), 220);
        assert!(classify("220 € VB", 150, 200).worth_messaging);
        assert!(!classify("221 € VB", 150, 200).worth_messaging);
        assert_eq!(negotiable_ceiling(0), 0);
    }

    #[test]
    fn up_to_thirty_percent_below() {
        let c = classify("70 €", 100, 200);
        assert!(c.worth_messaging);
        assert_eq!(c.position, PricePosition::BelowBand);
        assert_eq!(c.price_hint.map(|h| h.to_string()).as_deref(), Some("-30%"));
        assert_eq!(c.price_range.as_deref(), Some("X < 100€ [...] 200€"));

        assert!(classify("99 €", 100, 200).worth_messaging);
    }

    #[test]
    fn far_below_band_is_dropped() {
        let c = classify("69 €", 100, 200);
        assert!(!c.worth_messaging);
        assert_eq!(c.position, PricePosition::OutOfRange);

        for p in 0..70u32 {
            if p == 1 {
                continue;
            }
            assert!(!classify(&format!("{p} €"), 100, 200).worth_messaging, "p={p}");
        }
    }

    #[test]
    fn extract_takes_first_digit_run() {
        assert_eq!(extract_price("ca. 250 € VB (oder 200)"), Some(250));
        assert_eq!(extract_price("0 €"), Some(0));
        assert_eq!(extract_price("Zu verschenken"), None);
    }
}
