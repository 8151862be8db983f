use csv_curate::{
    data::Value,
    error::ErrorKind,
    frame::Column,
    transform::{
        PercentileBounds,
        winsor::{clip_bounds, percentile},
        winsorize,
    },
};
use proptest::prelude::*;

#[test]
fn percentile_interpolates_between_ranks() {
    let sorted = [1.0, 2.0, 3.0, 4.0, 100.0];
    assert_eq!(percentile(&sorted, 0.0), Some(1.0));
    assert_eq!(percentile(&sorted, 50.0), Some(3.0));
    assert_eq!(percentile(&sorted, 100.0), Some(100.0));
    let p80 = percentile(&sorted, 80.0).unwrap();
    assert!((p80 - 23.2).abs() < 1e-9);
    assert_eq!(percentile(&[], 10.0), None);
}

#[test]
fn percentile_outside_zero_to_hundred_is_none() {
    let sorted = [1.0, 2.0];
    assert_eq!(percentile(&sorted, 150.0), None);
    assert_eq!(percentile(&sorted, -0.5), None);
    assert_eq!(percentile(&sorted, f64::NAN), None);
    assert_eq!(percentile(&sorted, f64::INFINITY), None);
}

#[test]
fn default_bounds_clip_a_single_spike() {
    let mut values = (1..=99).map(|v| Some(f64::from(v))).collect::<Vec<_>>();
    values.push(Some(10_000.0));
    values.push(None);
    let column = Column::from_floats("amount", &values);
    let clipped = winsorize(&column, PercentileBounds::default()).unwrap();
    assert_eq!(clipped.name(), "amount");
    assert!(clipped.is_missing(100));
    let spike = clipped.get(99).and_then(Value::as_f64).unwrap();
    assert!(spike < 10_000.0);
    assert!(spike >= 99.0);
}

#[test]
fn text_columns_are_rejected() {
    let column = Column::from_strs("amount", &[Some("12")]);
    let err = winsorize(&column, PercentileBounds::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
}

#[test]
fn out_of_range_percentiles_are_invalid_arguments() {
    let column = Column::from_floats("amount", &[Some(1.0)]);
    let bounds = PercentileBounds {
        lower: 5.0,
        upper: 101.0,
    };
    let err = clip_bounds(&column, bounds).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

proptest! {
    #[test]
    fn clipped_values_stay_within_bounds(
        values in proptest::collection::vec(proptest::option::of(-1.0e6f64..1.0e6), 1..60),
        lower in 0.0f64..50.0,
        spread in 0.0f64..50.0,
    ) {
        let bounds = PercentileBounds::new(lower, lower + spread).unwrap();
        let column = Column::from_floats("x", &values);
        let clipped = winsorize(&column, bounds).unwrap();
        prop_assert_eq!(clipped.missing_count(), column.missing_count());
        if let Some((lo, hi)) = clip_bounds(&column, bounds).unwrap() {
            prop_assert!(lo <= hi);
            for (before, after) in values.iter().zip(clipped.numeric_values().unwrap()) {
                match (before, after) {
                    (Some(b), Some(a)) => {
                        prop_assert!(a >= lo && a <= hi);
                        if *b >= lo && *b <= hi {
                            prop_assert_eq!(a, *b);
                        }
                    }
                    (None, None) => {}
                    other => prop_assert!(false, "missingness changed: {other:?}"),
                }
            }
        }
    }
}
