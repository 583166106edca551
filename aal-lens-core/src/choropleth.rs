use crate::classify::ClassMethod;
use crate::geojson::FeatureCollection;
use crate::legend::Legend;
use crate::metric::MetricKey;
use crate::options::ClassifyOptions;
use crate::palette::{ColorScale, Rgb};
use aal_lens_common::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureClass {
    pub label: String,
    pub value: Option<f64>,
    pub class: Option<usize>, // None for no data
    pub color: Rgb,
}

/// One classified property of a feature collection: breaks, colours, legend
/// and the per-feature assignment a map layer would paint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoroplethLayer {
    pub property: String,
    pub method: ClassMethod,
    pub requested_classes: usize,
    pub scale: ColorScale,
    pub legend: Legend,
    pub features: Vec<FeatureClass>,
    pub no_data_count: usize,
}

impl ChoroplethLayer {
    pub fn build(fc: &FeatureCollection, property: &str, opts: &ClassifyOptions) -> Result<Self> {
        let values = fc.values(property);
        let present = values.iter().filter(|v| v.is_some()).count();
        let no_data_count = values.len() - present;
        let scale = opts.color_scale(&values)?;
        let title = property
            .parse::<MetricKey>()
            .map(|k| k.title())
            .unwrap_or_else(|_| property.to_owned());
        let legend = opts.legend(&title, &scale, no_data_count);
        let features = fc
            .features
            .iter()
            .zip(&values)
            .map(|(f, &value)| FeatureClass {
                label: f.label(),
                value,
                class: scale.bucket(value),
                color: scale.color_for(value),
            })
            .collect();
        debug!(
            property,
            features = fc.len(),
            no_data = no_data_count,
            classes = scale.breaks.class_count(),
            "choropleth layer built"
        );
        Ok(Self {
            property: property.to_owned(),
            method: opts.method,
            requested_classes: opts.requested_classes(present),
            scale,
            legend,
            features,
            no_data_count,
        })
    }

    /// Write `fill_color` and `class` into each feature's properties.
    pub fn annotate(&self, fc: &mut FeatureCollection) {
        for (feature, fcls) in fc.features.iter_mut().zip(&self.features) {
            feature.set_property("fill_color", Value::String(fcls.color.to_hex()));
            feature.set_property("class", fcls.class.map_or(Value::Null, |c| Value::from(c as u64)));
        }
    }

    /// Feature count per class, no-data excluded.
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.scale.breaks.class_count()];
        for c in self.features.iter().filter_map(|f| f.class) {
            counts[c] += 1;
        }
        counts
    }
}
