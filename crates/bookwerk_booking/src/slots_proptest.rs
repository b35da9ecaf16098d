#[cfg(test)]
mod tests {
    use crate::logic::{clip_and_merge, BusyInterval, BusySource};
    use crate::slots::generate_slots;
    use bookwerk_common::models::DayHours;
    use chrono::{NaiveDate, TimeZone, Timelike, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    const TZ: Tz = Tz::Europe__Berlin;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn hours(start_hour: u32, end_hour: u32) -> DayHours {
        DayHours {
            open: true,
            start: format!("{:02}:00", start_hour),
            end: format!("{:02}:00", end_hour),
        }
    }

    fn busy_from_minutes(periods: &[(i64, i64)]) -> Vec<BusyInterval> {
        let intervals = periods
            .iter()
            .map(|(start, end)| {
                let day = TZ.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
                BusyInterval::new(
                    (day + chrono::Duration::minutes(*start)).with_timezone(&Utc),
                    (day + chrono::Duration::minutes(*end)).with_timezone(&Utc),
                    BusySource::External,
                )
            })
            .collect();
        let window_start = TZ
            .with_ymd_and_hms(2025, 6, 2, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        let window_end = TZ
            .with_ymd_and_hms(2025, 6, 3, 0, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        clip_and_merge(intervals, window_start, window_end)
    }

    proptest! {
        // Every generated slot lies fully inside the working-hours window.
        #[test]
        fn slots_stay_within_working_hours(
            start_hour in 0u32..12,
            end_hour in 13u32..23,
            duration in 15i64..120,
            granularity in prop::sample::select(vec![15i64, 30, 60]),
        ) {
            let day_hours = hours(start_hour, end_hour);
            let slots: Vec<_> =
                generate_slots(date(), &day_hours, &[], duration, granularity, TZ, None).collect();

            for slot in &slots {
                let local_start = slot.start.with_timezone(&TZ);
                let local_end = slot.end.with_timezone(&TZ);
                let start_minute = i64::from(local_start.hour()) * 60 + i64::from(local_start.minute());
                let end_minute = i64::from(local_end.hour()) * 60 + i64::from(local_end.minute());

                prop_assert!(start_minute >= i64::from(start_hour) * 60);
                prop_assert!(end_minute <= i64::from(end_hour) * 60);
            }
        }

        // No slot ever overlaps a busy interval; touching is permitted.
        #[test]
        fn slots_never_overlap_busy_intervals(
            duration in 15i64..90,
            busy_starts in prop::collection::vec(480i64..1020, 0..5),
        ) {
            let periods: Vec<(i64, i64)> = busy_starts
                .iter()
                .map(|start| (*start, start + 45))
                .collect();
            let busy = busy_from_minutes(&periods);

            let day_hours = hours(8, 18);
            let slots: Vec<_> =
                generate_slots(date(), &day_hours, &busy, duration, 15, TZ, None).collect();

            for slot in &slots {
                for interval in &busy {
                    let overlaps = slot.start < interval.end && slot.end > interval.start;
                    prop_assert!(
                        !overlaps,
                        "slot {:?} overlaps busy {:?}",
                        slot,
                        interval
                    );
                }
            }
        }

        // Slot starts are aligned to the granularity grid anchored at the
        // window start.
        #[test]
        fn slot_starts_align_to_the_granularity_grid(
            granularity in prop::sample::select(vec![15i64, 20, 30, 60]),
            duration in 15i64..60,
        ) {
            let day_hours = hours(8, 18);
            let slots: Vec<_> =
                generate_slots(date(), &day_hours, &[], duration, granularity, TZ, None).collect();

            let window_start = TZ
                .with_ymd_and_hms(2025, 6, 2, 8, 0, 0)
                .unwrap()
                .with_timezone(&Utc);
            for slot in &slots {
                let offset = (slot.start - window_start).num_minutes();
                prop_assert_eq!(offset % granularity, 0);
            }
        }

        // Restarting a cloned iterator reproduces the sequence exactly.
        #[test]
        fn cloned_iterators_replay_the_same_sequence(
            duration in 15i64..90,
            granularity in prop::sample::select(vec![15i64, 30]),
        ) {
            let day_hours = hours(8, 18);
            let iter = generate_slots(date(), &day_hours, &[], duration, granularity, TZ, None);
            let replay = iter.clone();

            let first: Vec<_> = iter.collect();
            let second: Vec<_> = replay.collect();
            prop_assert_eq!(first, second);
        }
    }
}
