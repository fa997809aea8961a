quantity!(KilowattHours, "kWh");

impl KilowattHours {
    /// Net this value against `other`, never going below zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        (self - other).max(Self::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn saturating_sub_clamps_at_zero() {
        assert_abs_diff_eq!(KilowattHours(0.5).saturating_sub(KilowattHours(0.2)).0, 0.3);
        assert_eq!(KilowattHours(0.2).saturating_sub(KilowattHours(0.5)), KilowattHours::ZERO);
    }

    #[test]
    fn sum_ok() {
        let total: KilowattHours = [KilowattHours(1.0), KilowattHours(0.25)].into_iter().sum();
        assert_abs_diff_eq!(total.0, 1.25);
    }
}
