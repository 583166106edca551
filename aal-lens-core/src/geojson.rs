use crate::metric::MetricKey;
use aal_lens_common::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// GeoJSON FeatureCollection as served by the AAL API. Geometry stays opaque;
/// unknown members survive a read/write round trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub properties: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn collection_type() -> String {
    "FeatureCollection".into()
}
fn feature_type() -> String {
    "Feature".into()
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<Map<String, Value>, D::Error> {
    Ok(Option::<Map<String, Value>>::deserialize(d)?.unwrap_or_default())
}

impl FeatureCollection {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Numeric value of `key` per feature, in feature order. `None` is no data.
    pub fn values(&self, key: &str) -> Vec<Option<f64>> {
        self.features.iter().map(|f| f.number(key)).collect()
    }

    /// AAL metric keys present on at least one feature, sorted.
    pub fn metric_keys(&self) -> Vec<MetricKey> {
        let keys: BTreeSet<MetricKey> = self
            .features
            .iter()
            .flat_map(|f| f.properties.keys())
            .filter(|k| MetricKey::is_metric_key(k))
            .filter_map(|k| k.parse().ok())
            .collect();
        keys.into_iter().collect()
    }
}

impl Feature {
    /// Numbers and numeric strings count; null, absent or anything else is missing.
    pub fn number(&self, key: &str) -> Option<f64> {
        let v = match self.properties.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        v.is_finite().then_some(v)
    }

    /// Display name: province, then building, then "Unknown".
    pub fn label(&self) -> String {
        ["provinsi", "nama_provinsi", "nama_gedung", "kota"]
            .iter()
            .find_map(|k| self.properties.get(*k).and_then(Value::as_str))
            .unwrap_or("Unknown")
            .to_owned()
    }

    pub fn set_property(&mut self, key: &str, value: Value) {
        self.properties.insert(key.to_owned(), value);
    }
}

#[cfg(test)]
mod tests_geojson {
    use super::*;
    use serde_json::json;

    fn sample() -> FeatureCollection {
        FeatureCollection::from_value(json!({
            "type": "FeatureCollection",
            "crs": {"type": "name"},
            "features": [
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [106.8, -6.2]},
                 "properties": {"provinsi": "DKI Jakarta", "aal_gempa_500_bmn": 1.5e9, "aal_banjir_25_total": "42"}},
                {"type": "Feature", "geometry": null,
                 "properties": {"nama_provinsi": "Bali", "aal_gempa_500_bmn": null}},
                {"type": "Feature", "geometry": null, "properties": null}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn values_treat_missing_as_none() {
        let fc = sample();
        assert_eq!(fc.values("aal_gempa_500_bmn"), vec![Some(1.5e9), None, None]);
        assert_eq!(fc.values("aal_banjir_25_total"), vec![Some(42.0), None, None]);
    }

    #[test]
    fn labels_fall_back() {
        let fc = sample();
        let labels: Vec<String> = fc.features.iter().map(Feature::label).collect();
        assert_eq!(labels, vec!["DKI Jakarta", "Bali", "Unknown"]);
    }

    #[test]
    fn metric_keys_sorted_and_deduped() {
        let keys: Vec<String> = sample().metric_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["aal_gempa_500_bmn", "aal_banjir_25_total"]);
    }

    #[test]
    fn unknown_members_round_trip() {
        let fc = sample();
        let out = serde_json::to_value(&fc).unwrap();
        assert_eq!(out["crs"]["type"], "name");
        assert_eq!(out["type"], "FeatureCollection");
        assert_eq!(out["features"][0]["geometry"]["type"], "Point");
    }

    #[test]
    fn non_numeric_strings_are_missing() {
        let fc = FeatureCollection::from_value(json!({
            "features": [{"properties": {"x": "n/a"}}, {"properties": {"x": true}}, {"properties": {"x": 3}}]
        }))
        .unwrap();
        assert_eq!(fc.values("x"), vec![None, None, Some(3.0)]);
    }
}
