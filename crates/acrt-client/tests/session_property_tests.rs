use acrt_client::CarSnapshot;
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_max_engine_rpm_is_running_maximum(
        writes in prop::collection::vec(-1_000.0f32..20_000.0, 0..64)
    ) {
        let mut car = CarSnapshot::default();
        let mut expected = 0.0f32;

        for rpm in &writes {
            car.record_engine_rpm(*rpm);
            expected = expected.max(*rpm);
            prop_assert!((car.max_engine_rpm() - expected).abs() < f32::EPSILON);
            prop_assert!((car.engine_rpm() - *rpm).abs() < f32::EPSILON);
        }

        prop_assert!(car.max_engine_rpm() >= 0.0);
    }

    #[test]
    fn prop_max_engine_rpm_never_decreases(
        writes in prop::collection::vec(any::<f32>(), 1..64)
    ) {
        let mut car = CarSnapshot::default();
        let mut previous = car.max_engine_rpm();

        for rpm in writes {
            car.record_engine_rpm(rpm);
            prop_assert!(car.max_engine_rpm() >= previous);
            previous = car.max_engine_rpm();
        }
    }
}
