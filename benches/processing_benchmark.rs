use aq_dashboard::analyzers::{AdvancedAnalyzer, ExplorationAnalyzer, InsightTopic};
use aq_dashboard::models::{AirQualityDataset, FilterSelection, Pollutant, Reading, Variable};
use aq_dashboard::processors::{
    correlation_matrix, daily_means, hourly_means, weekday_means, yearly_station_means,
};
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// Hourly readings for `station_count` stations over `days` days
fn create_test_dataset(station_count: usize, days: usize) -> AirQualityDataset {
    let base_date = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
    let mut readings = Vec::with_capacity(station_count * days * 24);

    for station in 0..station_count {
        let name = format!("Station {}", station);
        for day in 0..days {
            let date = base_date + chrono::Duration::days(day as i64);
            for hour in 0..24u32 {
                let wave = ((day * 24 + hour as usize) as f64 / 17.0).sin();
                let mut r = Reading::new(date.and_hms_opt(hour, 0, 0).unwrap(), name.as_str());
                r.pm25 = Some(40.0 + 30.0 * wave + station as f64);
                r.pm10 = Some(70.0 + 35.0 * wave);
                r.no2 = if hour % 7 == 0 { None } else { Some(45.0 + 10.0 * wave) };
                r.so2 = Some(12.0);
                r.co = Some(900.0 + 100.0 * wave);
                r.o3 = Some(55.0 - 20.0 * wave);
                r.temp = Some(10.0 + 8.0 * (hour as f64 / 24.0));
                r.pres = Some(1012.0 - 3.0 * wave);
                r.dewp = Some(-2.0 + wave);
                r.rain = Some(if hour % 11 == 0 { 0.6 } else { 0.0 });
                readings.push(r);
            }
        }
    }

    AirQualityDataset::new(readings)
}

fn benchmark_aggregations(c: &mut Criterion) {
    let dataset = create_test_dataset(6, 365);
    let rows: Vec<&Reading> = dataset.readings().iter().collect();

    let mut group = c.benchmark_group("aggregations");
    group.bench_function("yearly_station_means", |b| {
        b.iter(|| black_box(yearly_station_means(&rows, &Pollutant::TREND)))
    });
    group.bench_function("hourly_and_weekday", |b| {
        b.iter(|| {
            black_box(hourly_means(&rows, Pollutant::Pm25));
            black_box(weekday_means(&rows, Pollutant::Pm25))
        })
    });
    group.bench_function("daily_means", |b| b.iter(|| black_box(daily_means(&rows))));
    group.bench_function("correlation_matrix", |b| {
        b.iter(|| black_box(correlation_matrix(&rows, &Variable::correlation_set())))
    });
    group.finish();
}

fn benchmark_pages(c: &mut Criterion) {
    let mut group = c.benchmark_group("pages");

    for days in [90usize, 365] {
        let dataset = create_test_dataset(4, days);

        group.bench_with_input(BenchmarkId::new("exploration", days), &dataset, |b, data| {
            let analyzer = ExplorationAnalyzer::default();
            let selection = FilterSelection::new();
            b.iter(|| black_box(analyzer.analyze(data, &selection, &InsightTopic::ALL)))
        });

        group.bench_with_input(BenchmarkId::new("advanced", days), &dataset, |b, data| {
            let analyzer = AdvancedAnalyzer::default();
            b.iter(|| black_box(analyzer.analyze(data, None, None, None)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_aggregations, benchmark_pages);
criterion_main!(benches);
