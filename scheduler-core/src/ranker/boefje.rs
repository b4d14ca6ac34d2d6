//! Priority formula for boefje tasks.

use chrono::{DateTime, Utc};

use crate::domain::{Ooi, ScanLevel};

/// Ranks boefje tasks so that higher scan levels and older OOIs are run
/// sooner (lower priority value, per I2).
pub struct BoefjeRanker;

impl BoefjeRanker {
    /// `priority = 100 - 10*scan_level + clamp(age_in_days, 0, 30)`.
    ///
    /// Monotonic in scan_level: a higher scan level never yields a worse
    /// (higher) priority for the same age.
    pub fn rank(scan_level: ScanLevel, ooi: &Ooi, now: DateTime<Utc>) -> i64 {
        let age = ooi.age_in_days(now).clamp(0, 30);
        100 - 10 * scan_level.0 as i64 + age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScanProfile;
    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;

    fn ooi_aged(days: i64, now: DateTime<Utc>) -> Ooi {
        Ooi {
            primary_key: "Hostname|example.com".into(),
            ooi_type: "Hostname".into(),
            scan_profile: ScanProfile { level: ScanLevel::new(1) },
            modified_at: Some(now - ChronoDuration::days(days)),
        }
    }

    #[test]
    fn test_higher_scan_level_never_yields_worse_priority() {
        let now = Utc::now();
        let ooi = ooi_aged(5, now);
        let mut last = BoefjeRanker::rank(ScanLevel::new(0), &ooi, now);
        for level in 1..=4 {
            let next = BoefjeRanker::rank(ScanLevel::new(level), &ooi, now);
            assert!(next <= last, "priority should not worsen as scan level rises");
            last = next;
        }
    }

    #[test]
    fn test_age_is_clamped_to_thirty_days() {
        let now = Utc::now();
        let recent = ooi_aged(5, now);
        let ancient = ooi_aged(365, now);

        let p_recent = BoefjeRanker::rank(ScanLevel::new(1), &recent, now);
        let p_ancient = BoefjeRanker::rank(ScanLevel::new(1), &ancient, now);
        // Both clamp to 30, so same scan level means same priority.
        assert_eq!(p_recent, 90 + 5);
        assert_eq!(p_ancient, 90 + 30);
    }

    #[test]
    fn test_unmodified_ooi_has_zero_age() {
        let now = Utc::now();
        let ooi = Ooi {
            primary_key: "Hostname|example.com".into(),
            ooi_type: "Hostname".into(),
            scan_profile: ScanProfile { level: ScanLevel::new(0) },
            modified_at: None,
        };
        assert_eq!(BoefjeRanker::rank(ScanLevel::new(0), &ooi, now), 100);
    }

    proptest! {
        /// §4.2/§8: monotonicity in scan_level holds for any OOI age, not
        /// just the hand-picked samples above.
        #[test]
        fn prop_higher_scan_level_never_worsens_priority(age_days in 0i64..400) {
            let now = Utc::now();
            let ooi = ooi_aged(age_days, now);
            let mut last = BoefjeRanker::rank(ScanLevel::new(0), &ooi, now);
            for level in 1..=4u8 {
                let next = BoefjeRanker::rank(ScanLevel::new(level), &ooi, now);
                prop_assert!(next <= last, "priority should not worsen as scan level rises");
                last = next;
            }
        }
    }
}
