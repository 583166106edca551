use crate::classify::{goodness_of_variance_fit, Breaks, ClassMethod};
use crate::geojson::FeatureCollection;
use crate::metric::MetricKey;
use crate::options::ClassifyOptions;
use aal_lens_common::Result;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricBreaks {
    pub metric: MetricKey,
    pub method: ClassMethod,
    pub breaks: Breaks,
    pub observations: usize,
    pub no_data_count: usize,
    pub gvf: f64,
}

/// Classify every metric in `keys` (or every metric present on the
/// collection when `keys` is empty) in parallel. Output follows key order.
pub fn classify_metrics(
    fc: &FeatureCollection,
    keys: &[MetricKey],
    opts: &ClassifyOptions,
) -> Result<Vec<MetricBreaks>> {
    let keys = if keys.is_empty() { fc.metric_keys() } else { keys.to_vec() };
    info!(metrics = keys.len(), features = fc.len(), method = %opts.method, "batch classification");
    keys.par_iter()
        .map(|&metric| {
            let values = fc.values(&metric.to_string());
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            let breaks = opts.breaks(&present)?;
            let gvf = goodness_of_variance_fit(&present, &breaks);
            debug!(%metric, classes = breaks.class_count(), gvf, "metric classified");
            Ok(MetricBreaks {
                metric,
                method: opts.method,
                observations: present.len(),
                no_data_count: values.len() - present.len(),
                breaks,
                gvf,
            })
        })
        .collect()
}
