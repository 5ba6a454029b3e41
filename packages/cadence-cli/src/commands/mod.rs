pub mod analyze;
pub mod filters;
pub mod process;
pub mod validate;

use cadence_rs::FilterKind;

/// Catalog defaults of a filter selector, `(0.0, 0.0)` for unknown selectors
pub(crate) fn filter_defaults(selector: &str) -> (f64, f64) {
    FilterKind::catalog()
        .into_iter()
        .find(|d| d.selector.eq_ignore_ascii_case(selector.trim()))
        .map(|d| {
            let param = |i: usize| d.params.get(i).map_or(0.0, |p| p.default);
            (param(0), param(1))
        })
        .unwrap_or((0.0, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        assert_eq!(filter_defaults("butterworth"), (6.0, 4.0));
        assert_eq!(filter_defaults("nope"), (0.0, 0.0));
    }
}
