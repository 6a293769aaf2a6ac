//! Propiedades del clasificador, el agregador y el formato de lote.
//!
//! 1. Un promedio dentro de especificación siempre es `Success`.
//! 2. Entre límite y banda de tolerancia siempre es `Warning`.
//! 3. Más allá de la banda siempre es `Error`.
//! 4. pH dentro del rango es `Success`; fuera es `Error`.
//! 5. El estatus agregado es el peor veredicto aplicable.
//! 6. Un lote compuesto se parsea a los mismos componentes.

use chrono::NaiveDate;
use proptest::prelude::*;
use qc_core::{aggregate, classify_ph, classify_solids, LotId, PhInput, SolidsLimits};
use qc_domain::{OverallStatus, Parameter, PhStandard, ProductStandard, Verdict};

fn standard(min: f64, max: f64) -> ProductStandard {
    ProductStandard { product_code: "LAV".into(),
                      solids_min: Some(min),
                      solids_max: Some(max) }
}

// ── Strategies ──────────────────────────────────────────────────────────

/// Límites (min, max) con min > 0 y max ≥ min.
fn limits_strategy() -> impl Strategy<Value = (f64, f64)> {
    (1.0f64..60.0, 0.0f64..30.0).prop_map(|(min, width)| (min, min + width))
}

fn verdict_strategy() -> impl Strategy<Value = Verdict> {
    prop_oneof![Just(Verdict::Success),
                Just(Verdict::Warning),
                Just(Verdict::Error),
                Just(Verdict::NotApplicable),]
}

proptest! {
    #[test]
    fn in_spec_is_success((min, max) in limits_strategy(), t in 0.0f64..=1.0) {
        let avg = (min + (max - min) * t).clamp(min, max);
        prop_assert_eq!(classify_solids(avg, Some(&standard(min, max))), Verdict::Success);
    }

    #[test]
    fn tolerance_band_is_warning((min, max) in limits_strategy(), t in 0.01f64..0.99, upper in any::<bool>()) {
        let limits = SolidsLimits::new(min, max);
        let avg = if upper {
            max + (limits.tol_max - max) * t
        } else {
            min - (min - limits.tol_min) * t
        };
        prop_assert_eq!(classify_solids(avg, Some(&standard(min, max))), Verdict::Warning);
    }

    #[test]
    fn beyond_tolerance_is_error((min, max) in limits_strategy(), excess in 0.01f64..50.0, upper in any::<bool>()) {
        let limits = SolidsLimits::new(min, max);
        let avg = if upper { limits.tol_max + excess } else { limits.tol_min - excess };
        prop_assert_eq!(classify_solids(avg, Some(&standard(min, max))), Verdict::Error);
    }

    #[test]
    fn ph_is_binary(min in 0u8..=10, width in 0u8..=4, v in 0u8..=14) {
        let (min, max) = (f64::from(min), f64::from(min + width));
        let std = PhStandard { product_code: "LAV".into(), ph_min: min, ph_max: max };
        let expected = if (min..=max).contains(&f64::from(v)) { Verdict::Success } else { Verdict::Error };
        prop_assert_eq!(classify_ph(Some(&PhInput::Numeric(f64::from(v))), Some(&std)), expected);
    }

    #[test]
    fn aggregate_is_worst_verdict(verdicts in prop::collection::vec(verdict_strategy(), 0..3)) {
        let pairs: Vec<(Parameter, Verdict)> =
            Parameter::EVALUATION_ORDER.iter().copied().zip(verdicts.iter().copied()).collect();
        let a = aggregate(&pairs);
        let expected = if pairs.iter().any(|(_, v)| *v == Verdict::Error) {
            OverallStatus::NoConforme
        } else if pairs.iter().any(|(_, v)| *v == Verdict::Warning) {
            OverallStatus::Retener
        } else {
            OverallStatus::Conforme
        };
        prop_assert_eq!(a.status, expected);
        prop_assert_eq!(a.failed.len(), pairs.iter().filter(|(_, v)| v.is_failure()).count());
    }

    #[test]
    fn lot_id_text_parses_back(days in 0i64..9000,
                               acronym in "[A-Z]{2,4}",
                               product in "[A-Z]{2,6}",
                               size in 1u64..100_000,
                               sequence in 1u32..5000) {
        let date = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap() + chrono::Duration::days(days);
        let lot = LotId::new(date, acronym, product, size, sequence).unwrap();
        let text = lot.to_string();
        let parsed: LotId = text.parse().unwrap();
        prop_assert_eq!(parsed, lot);
        prop_assert!(text.rsplit('-').next().unwrap().len() >= 2);
    }
}

#[test]
fn lav_limit_examples() {
    let s = standard(28.0, 32.0);
    assert_eq!(classify_solids(27.0, Some(&s)), Verdict::Warning);
    assert_eq!(classify_solids(26.6, Some(&s)), Verdict::Warning);
    assert_eq!(classify_solids(26.0, Some(&s)), Verdict::Error);
    assert_eq!(classify_solids(33.6, Some(&s)), Verdict::Warning);
    assert_eq!(classify_solids(33.7, Some(&s)), Verdict::Error);
    assert_eq!(classify_solids(30.0, None), Verdict::NotApplicable);
}
