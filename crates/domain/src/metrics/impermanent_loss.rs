/// Impermanent loss of a position against holding the initial balances.
/// il = (position_value - hold_value) / hold_value
///
/// Negative values are losses, e.g. -0.05 for 5%.
pub fn impermanent_loss(position_value: f64, hold_value: f64) -> f64 {
    if hold_value == 0.0 {
        return f64::NAN;
    }
    (position_value - hold_value) / hold_value
}
