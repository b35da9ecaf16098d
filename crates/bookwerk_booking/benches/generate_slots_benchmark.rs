use bookwerk_booking::logic::{clip_and_merge, BusyInterval, BusySource};
use bookwerk_booking::slots::generate_slots;
use bookwerk_common::models::DayHours;
use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const TZ: Tz = Tz::Europe__Berlin;

fn bench_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn day_hours() -> DayHours {
    DayHours {
        open: true,
        start: "08:00".to_string(),
        end: "18:00".to_string(),
    }
}

// A day peppered with short busy blocks
fn busy_intervals(count: i64) -> Vec<BusyInterval> {
    let day = TZ.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap();
    let intervals = (0..count)
        .map(|i| {
            let start = day + chrono::Duration::minutes(i * 37);
            BusyInterval::new(
                start.with_timezone(&Utc),
                (start + chrono::Duration::minutes(20)).with_timezone(&Utc),
                if i % 2 == 0 {
                    BusySource::Internal
                } else {
                    BusySource::External
                },
            )
        })
        .collect();
    let window_start = day.with_timezone(&Utc);
    let window_end = (day + chrono::Duration::hours(10)).with_timezone(&Utc);
    clip_and_merge(intervals, window_start, window_end)
}

fn benchmark_generate_slots(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_slots");

    group.bench_function("no_busy_intervals", |b| {
        let hours = day_hours();
        b.iter(|| {
            let slots: Vec<_> = generate_slots(
                black_box(bench_date()),
                black_box(&hours),
                black_box(&[]),
                black_box(30),
                black_box(15),
                TZ,
                None,
            )
            .collect();
            black_box(slots)
        })
    });

    group.bench_function("busy_day", |b| {
        let hours = day_hours();
        let busy = busy_intervals(12);
        b.iter(|| {
            let slots: Vec<_> = generate_slots(
                black_box(bench_date()),
                black_box(&hours),
                black_box(&busy),
                black_box(30),
                black_box(15),
                TZ,
                None,
            )
            .collect();
            black_box(slots)
        })
    });

    group.bench_function("merge_then_generate", |b| {
        let hours = day_hours();
        b.iter(|| {
            let busy = busy_intervals(black_box(24));
            let slots: Vec<_> =
                generate_slots(bench_date(), &hours, &busy, 45, 15, TZ, None).collect();
            black_box(slots)
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_generate_slots);
criterion_main!(benches);
