use crate::cache::ResponseCache;
use crate::geojson::FeatureCollection;
use crate::metric::Hazard;
use aal_lens_common::{AalLensError, ApiConfig, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Map viewport in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl BBox {
    /// Whole Indonesian archipelago.
    pub const INDONESIA: BBox = BBox { min_lng: 94.0, min_lat: -11.5, max_lng: 141.5, max_lat: 6.5 };
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferQuery {
    pub bbox: BBox,
    pub tol: f64,
    pub field: String,
}

impl BufferQuery {
    pub fn at_zoom(bbox: BBox, zoom: f64, field: impl Into<String>) -> Self {
        Self { bbox, tol: tolerance_for_zoom(zoom), field: field.into() }
    }
}

/// Geometry simplification tolerance for a map zoom level.
pub fn tolerance_for_zoom(zoom: f64) -> f64 {
    if zoom < 6.0 {
        0.01
    } else if zoom < 10.0 {
        0.001
    } else if zoom < 16.0 {
        0.0001
    } else {
        0.000001
    }
}

/// Read-only client for the AAL REST API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base: Url,
    client: reqwest::Client,
    cache: Option<ResponseCache>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| AalLensError::Other(format!("bad base url {base_url}: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AalLensError::Other(e.to_string()))?;
        Ok(Self { base, client, cache: None })
    }

    pub fn from_config(cfg: &ApiConfig) -> Result<Self> {
        let client = Self::new(&cfg.base_url, Duration::from_secs(cfg.timeout_secs))?;
        Ok(match cfg.cache_ttl_secs {
            Some(ttl) => client.with_cache(ResponseCache::new(ttl)),
            None => client,
        })
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// `base/segments...?query`, each segment and query value percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| AalLensError::Other(format!("base url cannot have a path: {}", self.base)))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        if let Some(body) = self.cache.as_ref().and_then(|c| c.get(url.as_str())) {
            return Ok(body);
        }
        debug!(%url, "GET");
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AalLensError::Other(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AalLensError::Http { status: status.as_u16(), path: url.path().to_owned() });
        }
        let body: Value = resp.json().await.map_err(|e| AalLensError::Other(e.to_string()))?;
        if let Some(cache) = &self.cache {
            cache.put(url.as_str(), &body)?;
        }
        info!(path = url.path(), "fetched");
        Ok(body)
    }

    async fn get_features(&self, url: Url) -> Result<FeatureCollection> {
        FeatureCollection::from_value(self.get_json(url).await?)
    }

    /// Province polygons carrying every `aal_*` metric.
    pub async fn aal_provinsi(&self) -> Result<FeatureCollection> {
        self.get_features(self.endpoint(&["api", "aal-provinsi"], &[])?).await
    }

    pub async fn aal_provinsi_list(&self) -> Result<Value> {
        self.get_json(self.endpoint(&["api", "aal-provinsi-list"], &[])?).await
    }

    pub async fn aal_provinsi_data(&self, provinsi: &str) -> Result<Value> {
        let url = self.endpoint(&["api", "aal-provinsi-data"], &[("provinsi", provinsi.to_owned())])?;
        self.get_json(url).await
    }

    pub async fn provinces(&self) -> Result<Value> {
        self.get_json(self.endpoint(&["api", "hsbgn", "provinsi"], &[])?).await
    }

    pub async fn cities(&self, provinsi: &str) -> Result<Value> {
        self.get_json(self.endpoint(&["api", "hsbgn", "provinsi", provinsi, "kota"], &[])?).await
    }

    /// Building points with direct-loss properties.
    pub async fn buildings(&self, provinsi: &str, kota: &str) -> Result<FeatureCollection> {
        let url = self.endpoint(
            &["api", "gedung"],
            &[("provinsi", provinsi.to_owned()), ("kota", kota.to_owned())],
        )?;
        self.get_features(url).await
    }

    /// Hazard intensity polygons in a viewport. Features without a value for
    /// the requested field are dropped.
    pub async fn hazard_buffer(&self, hazard: Hazard, query: &BufferQuery) -> Result<FeatureCollection> {
        if !hazard.intensity_fields().contains(&query.field) {
            return Err(AalLensError::InvalidMetric(format!(
                "{} is not a {hazard} field (valid: {})",
                query.field,
                hazard.intensity_fields().join(", ")
            )));
        }
        let b = query.bbox;
        let url = self.endpoint(
            &["api", "buffer", hazard.code()],
            &[
                ("minlng", b.min_lng.to_string()),
                ("minlat", b.min_lat.to_string()),
                ("maxlng", b.max_lng.to_string()),
                ("maxlat", b.max_lat.to_string()),
                ("tol", query.tol.to_string()),
                ("field", query.field.clone()),
            ],
        )?;
        let mut fc = self.get_features(url).await?;
        fc.features.retain(|f| f.number(&query.field).is_some());
        Ok(fc)
    }

    pub async fn disaster_curves(&self) -> Result<Value> {
        self.get_json(self.endpoint(&["api", "disaster-curves"], &[])?).await
    }
}

#[cfg(test)]
mod tests_api {
    use super::*;
    use serde_json::json;

    fn client() -> ApiClient {
        ApiClient::new("http://localhost:5000", Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn zoom_tolerance_steps() {
        assert_eq!(tolerance_for_zoom(5.0), 0.01);
        assert_eq!(tolerance_for_zoom(6.0), 0.001);
        assert_eq!(tolerance_for_zoom(12.0), 0.0001);
        assert_eq!(tolerance_for_zoom(18.0), 0.000001);
    }

    #[test]
    fn endpoints_are_encoded() {
        let c = client();
        let url = c.endpoint(&["api", "hsbgn", "provinsi", "DKI Jakarta", "kota"], &[]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/hsbgn/provinsi/DKI%20Jakarta/kota");
        let url = c
            .endpoint(&["api", "gedung"], &[("provinsi", "Jawa Barat".into()), ("kota", "A&B".into())])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/gedung?provinsi=Jawa+Barat&kota=A%26B");
    }

    #[test]
    fn base_path_is_kept() {
        let c = ApiClient::new("http://host/aal/", Duration::from_secs(1)).unwrap();
        let url = c.endpoint(&["api", "disaster-curves"], &[]).unwrap();
        assert_eq!(url.as_str(), "http://host/aal/api/disaster-curves");
    }

    #[test]
    fn rejects_bad_base_url() {
        assert!(ApiClient::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn cached_response_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ResponseCache::with_dir(tmp.path(), 300);
        let c = ApiClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap().with_cache(cache.clone());
        let url = c.endpoint(&["api", "aal-provinsi"], &[]).unwrap();
        cache
            .put(url.as_str(), &json!({"type": "FeatureCollection", "features": [{"properties": {"provinsi": "Aceh"}}]}))
            .unwrap();
        let fc = c.aal_provinsi().await.unwrap();
        assert_eq!(fc.len(), 1);
    }

    #[tokio::test]
    async fn unknown_buffer_field_is_rejected() {
        let q = BufferQuery::at_zoom(BBox::INDONESIA, 5.0, "mmi_50");
        let err = client().hazard_buffer(Hazard::Gempa, &q).await.unwrap_err();
        assert!(matches!(err, AalLensError::InvalidMetric(_)));
    }
}
