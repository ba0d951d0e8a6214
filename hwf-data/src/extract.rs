use crate::magnitude::MagnitudeScorer;
use crate::threshold::ThresholdTable;
use hwf_core::config::LeapDayPolicy;
use hwf_core::error::{HeatwaveError, Result};
use hwf_core::record::{DailyRecord, EventRecord};
use hwf_core::time_axis::TimeAxis;
use hwf_utils::dates::LEAP_DAY_OF_YEAR;

/// Filters the daily record down to extreme events.
///
/// A record is extreme iff its temperature is at or above the threshold for
/// its cell and day of year. Extremes are returned ordered by
/// `(itime, x, y)` with `id` equal to their position, so ids never depend on
/// the order the input rows arrived in.
pub struct ExtremeEventExtractor<'a> {
    thresholds: &'a ThresholdTable,
    magnitudes: &'a MagnitudeScorer,
}

impl<'a> ExtremeEventExtractor<'a> {
    pub fn new(thresholds: &'a ThresholdTable, magnitudes: &'a MagnitudeScorer) -> Self {
        ExtremeEventExtractor {
            thresholds,
            magnitudes,
        }
    }

    pub fn extract(&self, records: &[DailyRecord], axis: &TimeAxis) -> Result<Vec<EventRecord>> {
        let mut events = Vec::new();
        let mut dropped_leap_days = 0usize;
        for record in records {
            let ytime = record.ytime();
            if ytime == LEAP_DAY_OF_YEAR && self.thresholds.leap_day() == LeapDayPolicy::Drop {
                dropped_leap_days += 1;
                continue;
            }
            let threshold = self
                .thresholds
                .threshold(record.g_id, ytime)
                .ok_or(HeatwaveError::MissingThreshold {
                    g_id: record.g_id,
                    day: ytime,
                })?;
            if record.temperature < threshold {
                continue;
            }
            let itime = axis.itime(record.date).ok_or_else(|| {
                HeatwaveError::InvalidConfig(format!(
                    "date {} is outside the time axis {}..={}",
                    record.date,
                    axis.start(),
                    axis.end()
                ))
            })?;
            events.push(EventRecord {
                id: 0,
                cell: record.cell,
                g_id: record.g_id,
                longitude: record.longitude,
                latitude: record.latitude,
                date: record.date,
                itime,
                ytime,
                temperature: record.temperature,
                threshold,
                is_extreme: true,
                magnitude: self.magnitudes.score(record.g_id, record.temperature),
            });
        }

        events.sort_by_key(|e| e.order_key());
        for (id, event) in events.iter_mut().enumerate() {
            event.id = id;
        }

        if dropped_leap_days > 0 {
            log::debug!("extract: dropped {} day-366 records", dropped_leap_days);
        }
        log::info!(
            "extract: {} of {} records are extreme",
            events.len(),
            records.len()
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threshold::ThresholdEstimator;
    use chrono::NaiveDate;
    use hwf_core::config::PipelineConfig;
    use hwf_core::grid::GridSpec;

    fn records(grid: &GridSpec) -> Vec<DailyRecord> {
        let start = NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2002, 12, 31).unwrap();
        let mut records = Vec::new();
        for (i, date) in hwf_core::time_axis::DateRange(start, end).enumerate() {
            for lon in [1.0, 0.0] {
                let hot = date == NaiveDate::from_ymd_opt(2002, 7, 1).unwrap();
                let t = if hot { 45.0 } else { 20.0 + (i % 10) as f64 / 10.0 };
                records.push(DailyRecord::locate(grid, lon, 0.0, date, t).unwrap());
            }
        }
        records
    }

    #[test]
    fn test_extract_orders_and_numbers_events() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 2, 1).unwrap();
        let records = records(&grid);
        let config = PipelineConfig {
            percentile: 100.0,
            ..PipelineConfig::default()
        };
        let thresholds = ThresholdEstimator::new(&config).estimate(&records).unwrap();
        let magnitudes = MagnitudeScorer::from_records(&records).unwrap();
        let axis = TimeAxis::spanning(records.iter().map(|r| r.date)).unwrap();

        let events = ExtremeEventExtractor::new(&thresholds, &magnitudes)
            .extract(&records, &axis)
            .unwrap();

        // the hot day is the window maximum in both cells
        let hot: Vec<&EventRecord> = events.iter().filter(|e| e.temperature == 45.0).collect();
        assert_eq!(hot.len(), 2);
        assert_eq!(hot[0].cell.x, 0);
        assert_eq!(hot[1].cell.x, 1);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.id, i);
            assert!(event.is_extreme);
            assert!(event.temperature >= event.threshold);
            assert!(event.magnitude >= 0.0);
        }
        assert!(events.windows(2).all(|w| w[0].order_key() < w[1].order_key()));
    }

    #[test]
    fn test_extract_is_independent_of_row_order() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 2, 1).unwrap();
        let records = records(&grid);
        let mut reversed = records.clone();
        reversed.reverse();
        let config = PipelineConfig {
            percentile: 95.0,
            ..PipelineConfig::default()
        };
        let thresholds = ThresholdEstimator::new(&config).estimate(&records).unwrap();
        let magnitudes = MagnitudeScorer::from_records(&records).unwrap();
        let axis = TimeAxis::spanning(records.iter().map(|r| r.date)).unwrap();
        let extractor = ExtremeEventExtractor::new(&thresholds, &magnitudes);
        assert_eq!(
            extractor.extract(&records, &axis).unwrap(),
            extractor.extract(&reversed, &axis).unwrap()
        );
    }

    #[test]
    fn test_missing_threshold_is_an_error() {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 3, 1).unwrap();
        let records = records(&grid);
        let thresholds = ThresholdEstimator::new(&PipelineConfig::default())
            .estimate(&records)
            .unwrap();
        let magnitudes = MagnitudeScorer::from_records(&records).unwrap();
        let date = NaiveDate::from_ymd_opt(2002, 7, 1).unwrap();
        let stray = vec![DailyRecord::locate(&grid, 2.0, 0.0, date, 50.0).unwrap()];
        let axis = TimeAxis::new(date, date).unwrap();
        let result = ExtremeEventExtractor::new(&thresholds, &magnitudes).extract(&stray, &axis);
        assert!(matches!(
            result,
            Err(HeatwaveError::MissingThreshold { g_id: 2, day: 182 })
        ));
    }
}
