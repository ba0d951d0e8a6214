use crate::labeler::ComponentLabels;
use chrono::NaiveDate;
use hwf_core::config::PipelineConfig;
use hwf_core::labels::{Family, Season};
use hwf_core::record::{ComponentId, EventRecord};
use hwf_utils::dates::circular_mean_day_of_year;
use std::collections::BTreeSet;

/// Summary features of one connected component of extreme events.
///
/// The component keeps its labeler-assigned `cp` as primary key whether or
/// not it is retained. Family and subfamily labels are attached later by the
/// clustering stages and are `None` until then.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatwaveComponent {
    pub cp: ComponentId,
    pub n_events: usize,
    pub time_min: NaiveDate,
    pub time_max: NaiveDate,
    pub itime_min: u32,
    pub itime_max: u32,
    /// Calendar days from first to last event, inclusive
    pub timespan: u32,
    pub g_ids: BTreeSet<u32>,
    pub n_unique_g_ids: usize,
    pub lat_mean: f64,
    pub lon_mean: f64,
    /// Circular mean day of year of the members, in `(0, 365]`
    pub ytime_mean: f64,
    pub temperature_mean: f64,
    pub temperature_max: f64,
    pub magnitude_sum: f64,
    pub retained: bool,
    pub family: Option<Family>,
    pub subfamily: Option<u32>,
}

impl HeatwaveComponent {
    /// Aggregate a non-empty set of member events.
    fn from_members(cp: ComponentId, members: &[&EventRecord]) -> Option<Self> {
        let first = members.first()?;
        let n = members.len() as f64;
        let mut component = HeatwaveComponent {
            cp,
            n_events: members.len(),
            time_min: first.date,
            time_max: first.date,
            itime_min: first.itime,
            itime_max: first.itime,
            timespan: 0,
            g_ids: BTreeSet::new(),
            n_unique_g_ids: 0,
            lat_mean: 0.0,
            lon_mean: 0.0,
            ytime_mean: 0.0,
            temperature_mean: 0.0,
            temperature_max: f64::NEG_INFINITY,
            magnitude_sum: 0.0,
            retained: false,
            family: None,
            subfamily: None,
        };
        for event in members {
            component.time_min = component.time_min.min(event.date);
            component.time_max = component.time_max.max(event.date);
            component.itime_min = component.itime_min.min(event.itime);
            component.itime_max = component.itime_max.max(event.itime);
            component.g_ids.insert(event.g_id);
            component.lat_mean += event.latitude;
            component.lon_mean += event.longitude;
            component.temperature_mean += event.temperature;
            component.temperature_max = component.temperature_max.max(event.temperature);
            component.magnitude_sum += event.magnitude;
        }
        component.lat_mean /= n;
        component.lon_mean /= n;
        component.ytime_mean =
            circular_mean_day_of_year(members.iter().map(|event| event.ytime as f64));
        component.temperature_mean /= n;
        component.timespan = (component.time_max - component.time_min).num_days() as u32 + 1;
        component.n_unique_g_ids = component.g_ids.len();
        Some(component)
    }

    /// Fixed meteorological season of the mean day of year.
    pub fn season(&self) -> Season {
        Season::from_day_of_year(self.ytime_mean)
    }
}

/// Computes component features and applies the retention rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeatwaveAggregator {
    min_timespan: u32,
    min_grid_cells: usize,
}

impl HeatwaveAggregator {
    pub fn new(min_timespan: u32, min_grid_cells: usize) -> Self {
        HeatwaveAggregator {
            min_timespan,
            min_grid_cells,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        HeatwaveAggregator::new(config.min_timespan, config.min_grid_cells)
    }

    /// Keep iff `timespan > min_timespan` and `n_unique_g_ids > min_grid_cells`.
    /// The isolated-event placeholder is never kept.
    pub fn keeps(&self, component: &HeatwaveComponent) -> bool {
        !component.cp.is_isolated()
            && component.timespan > self.min_timespan
            && component.n_unique_g_ids > self.min_grid_cells
    }

    /// One component per label in use, ordered by `cp`, placeholder first.
    pub fn aggregate(
        &self,
        events: &[EventRecord],
        labels: &ComponentLabels,
    ) -> Vec<HeatwaveComponent> {
        let members = labels.members();
        let components: Vec<HeatwaveComponent> = members
            .iter()
            .enumerate()
            .filter_map(|(cp, ids)| {
                let member_events: Vec<&EventRecord> = ids.iter().map(|&id| &events[id]).collect();
                let mut component = HeatwaveComponent::from_members(ComponentId(cp as u32), &member_events)?;
                component.retained = self.keeps(&component);
                Some(component)
            })
            .collect();

        let retained = components.iter().filter(|c| c.retained).count();
        log::info!(
            "aggregate: retained {} of {} components (timespan > {}, cells > {})",
            retained,
            labels.n_components(),
            self.min_timespan,
            self.min_grid_cells
        );
        components
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::events_at;
    use crate::graph::SpatioTemporalGraphBuilder;
    use crate::labeler::ComponentLabeler;
    use hwf_core::grid::GridSpec;

    fn label(events: &[EventRecord]) -> ComponentLabels {
        let grid = GridSpec::new(0.0, 0.0, 1.0, 1.0, 16, 16).unwrap();
        let edges = SpatioTemporalGraphBuilder::new(&grid, 1000)
            .edges(events)
            .unwrap();
        let mut labeler = ComponentLabeler::new(events.len());
        labeler.absorb(&edges).unwrap();
        labeler.finish()
    }

    #[test]
    fn test_component_features() {
        let mut events = events_at(&[(0, 0, 10), (1, 0, 11), (1, 1, 11), (2, 1, 12), (9, 9, 3)]);
        for (i, e) in events.iter_mut().enumerate() {
            e.magnitude = i as f64;
            e.temperature = 30.0 + i as f64;
        }
        let labels = label(&events);
        let components = HeatwaveAggregator::new(1, 0).aggregate(&events, &labels);
        assert_eq!(components.len(), 2);

        let placeholder = &components[0];
        assert!(placeholder.cp.is_isolated());
        assert!(!placeholder.retained);
        assert_eq!(placeholder.n_events, 1);

        let hw = &components[1];
        assert_eq!(hw.cp, ComponentId(1));
        assert_eq!(hw.n_events, 4);
        assert_eq!(hw.timespan, 3);
        assert_eq!((hw.itime_min, hw.itime_max), (10, 12));
        assert_eq!(hw.n_unique_g_ids, 4);
        // ids 1..=4 after sorting: the isolated (9,9,3) event comes first
        assert_eq!(hw.magnitude_sum, 1.0 + 2.0 + 3.0 + 4.0);
        assert_eq!(hw.temperature_max, 34.0);
        assert!((hw.lon_mean - 1.0).abs() < 1e-12);
        assert!((hw.lat_mean - 0.5).abs() < 1e-12);
        assert!(hw.retained);
    }

    #[test]
    fn test_retention_extremes() {
        // a lone single-cell heatwave over two days and a wider one
        let events = events_at(&[(0, 0, 1), (0, 0, 2), (5, 5, 1), (6, 5, 2), (7, 5, 3), (12, 12, 7)]);
        let labels = label(&events);

        let all = HeatwaveAggregator::new(1, 0).aggregate(&events, &labels);
        assert_eq!(all.iter().filter(|c| c.retained).count(), 2);
        assert!(all.iter().filter(|c| !c.cp.is_isolated()).all(|c| c.retained));

        let none = HeatwaveAggregator::new(1, usize::MAX).aggregate(&events, &labels);
        assert_eq!(none.iter().filter(|c| c.retained).count(), 0);

        let wide_only = HeatwaveAggregator::new(1, 1).aggregate(&events, &labels);
        let kept: Vec<usize> = wide_only
            .iter()
            .filter(|c| c.retained)
            .map(|c| c.n_unique_g_ids)
            .collect();
        assert_eq!(kept, vec![3]);

        let long_only = HeatwaveAggregator::new(2, 0).aggregate(&events, &labels);
        assert!(long_only.iter().filter(|c| c.retained).all(|c| c.timespan == 3));
    }

    #[test]
    fn test_season_of_mean_day() {
        // 2000-01-01 + 200 days is day 201 of a leap year: Summer
        let events = events_at(&[(0, 0, 200), (0, 0, 201)]);
        let labels = label(&events);
        let components = HeatwaveAggregator::new(1, 0).aggregate(&events, &labels);
        let hw = components.iter().find(|c| c.retained).unwrap();
        assert_eq!(hw.season(), Season::Summer);
    }

    #[test]
    fn test_new_year_heatwave_is_winter() {
        // 2000-12-30 .. 2001-01-02: days of year 365, 366, 1, 2
        let events = events_at(&[(0, 0, 364), (0, 0, 365), (0, 0, 366), (0, 0, 367)]);
        let ytimes: Vec<u32> = events.iter().map(|e| e.ytime).collect();
        assert_eq!(ytimes, vec![365, 366, 1, 2]);
        let labels = label(&events);
        let components = HeatwaveAggregator::new(1, 0).aggregate(&events, &labels);
        let hw = components.iter().find(|c| c.retained).unwrap();
        assert!(hw.ytime_mean > 360.0 || hw.ytime_mean < 5.0, "{}", hw.ytime_mean);
        assert_eq!(hw.season(), Season::Winter);
    }
}
