//! The detection stages chained over one daily record.

use crate::aggregate::{HeatwaveAggregator, HeatwaveComponent};
use crate::extract::ExtremeEventExtractor;
use crate::graph::{GraphStats, SpatioTemporalGraphBuilder};
use crate::labeler::{ComponentLabeler, ComponentLabels};
use crate::magnitude::MagnitudeScorer;
use crate::threshold::ThresholdEstimator;
use hwf_core::config::PipelineConfig;
use hwf_core::error::Result;
use hwf_core::grid::GridSpec;
use hwf_core::record::{ComponentId, DailyRecord, EventRecord};
use hwf_core::time_axis::TimeAxis;

/// Everything the detection stages produce.
///
/// `components` holds every component (retained or not) ordered by `cp`;
/// downstream views filter on `retained` instead of rebuilding the graph.
#[derive(Debug, Clone)]
pub struct Detection {
    pub grid: GridSpec,
    pub axis: TimeAxis,
    pub n_records: usize,
    pub events: Vec<EventRecord>,
    pub labels: ComponentLabels,
    pub components: Vec<HeatwaveComponent>,
    pub graph: GraphStats,
}

impl Detection {
    pub fn heatwaves(&self) -> impl Iterator<Item = &HeatwaveComponent> {
        self.components.iter().filter(|c| c.retained)
    }

    pub fn heatwaves_mut(&mut self) -> impl Iterator<Item = &mut HeatwaveComponent> {
        self.components.iter_mut().filter(|c| c.retained)
    }

    pub fn n_heatwaves(&self) -> usize {
        self.heatwaves().count()
    }

    pub fn component(&self, cp: ComponentId) -> Option<&HeatwaveComponent> {
        self.components
            .binary_search_by_key(&cp, |c| c.cp)
            .ok()
            .map(|i| &self.components[i])
    }

    /// Events belonging to retained heatwaves, with their component.
    pub fn heatwave_events(&self) -> impl Iterator<Item = (&EventRecord, &HeatwaveComponent)> {
        self.events.iter().filter_map(|event| {
            self.component(self.labels.label(event.id))
                .filter(|c| c.retained)
                .map(|c| (event, c))
        })
    }
}

/// Run thresholds through aggregation.
pub fn detect(
    records: &[DailyRecord],
    grid: &GridSpec,
    config: &PipelineConfig,
) -> Result<Detection> {
    config.validate()?;
    let axis = TimeAxis::spanning(records.iter().map(|r| r.date))?;
    log::info!(
        "detect: {} records on a {}x{} grid from {} to {}",
        records.len(),
        grid.nx,
        grid.ny,
        axis.start(),
        axis.end()
    );

    let thresholds = ThresholdEstimator::new(config).estimate(records)?;
    let magnitudes = MagnitudeScorer::from_records(records)?;
    let events = ExtremeEventExtractor::new(&thresholds, &magnitudes).extract(records, &axis)?;

    let mut labeler = ComponentLabeler::new(events.len());
    let graph = SpatioTemporalGraphBuilder::new(grid, config.edge_batch_cap)
        .for_each_batch(&events, |batch| labeler.absorb(batch))?;
    let labels = labeler.finish();

    let components = HeatwaveAggregator::from_config(config).aggregate(&events, &labels);

    Ok(Detection {
        grid: grid.clone(),
        axis,
        n_records: records.len(),
        events,
        labels,
        components,
        graph,
    })
}
