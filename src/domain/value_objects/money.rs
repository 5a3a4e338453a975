/// Round a currency amount to the cent, half away from zero.
///
/// The scaled value is first snapped to 1e-6 of a cent so that binary
/// representation error (e.g. `1.005 * 100.0 == 100.49999999999999`) does not
/// push a true half-cent below the rounding boundary.
pub fn round2(value: f64) -> f64 {
    let cents = value * 100.0;
    let snapped = (cents * 1_000_000.0).round() / 1_000_000.0;
    snapped.round() / 100.0
}

/// Largest accepted amount. Keeps every downstream product and sum finite.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Positive currency amount held at cent precision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Money(f64);

impl Money {
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() {
            return Err("Amount must be finite".to_string());
        }
        if value < 0.0 {
            return Err("Amount must be non-negative".to_string());
        }
        if value > MAX_AMOUNT {
            return Err(format!("Amount must not exceed {}", MAX_AMOUNT));
        }
        let rounded = round2(value);
        if !rounded.is_finite() {
            return Err("Amount is out of range".to_string());
        }
        Ok(Money(rounded))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}
