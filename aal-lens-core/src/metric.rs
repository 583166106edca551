use aal_lens_common::{AalLensError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hazard {
    Gempa,
    Banjir,
    Longsor,
    GunungBerapi,
}

impl Hazard {
    pub const ALL: [Hazard; 4] = [Self::Gempa, Self::Banjir, Self::Longsor, Self::GunungBerapi];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Gempa => "gempa",
            Self::Banjir => "banjir",
            Self::Longsor => "longsor",
            Self::GunungBerapi => "gunungberapi",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Gempa => "Earthquake",
            Self::Banjir => "Flood",
            Self::Longsor => "Landslide",
            Self::GunungBerapi => "Volcanic eruption",
        }
    }

    /// Return periods (years) modelled for this hazard, longest first.
    pub fn return_periods(&self) -> &'static [u32] {
        match self {
            Self::Gempa => &[500, 250, 100],
            Self::Banjir => &[100, 50, 25],
            Self::Longsor => &[5, 2],
            Self::GunungBerapi => &[250, 100, 50],
        }
    }

    /// Intensity property prefix on hazard buffer features (`mmi_500`, ...).
    pub fn intensity_prefix(&self) -> &'static str {
        match self {
            Self::Gempa => "mmi",
            Self::Banjir => "depth",
            Self::Longsor => "mflux",
            Self::GunungBerapi => "kpa",
        }
    }

    pub fn intensity_fields(&self) -> Vec<String> {
        self.return_periods()
            .iter()
            .map(|p| format!("{}_{p}", self.intensity_prefix()))
            .collect()
    }
}

impl FromStr for Hazard {
    type Err = AalLensError;
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|h| h.code() == s)
            .ok_or_else(|| AalLensError::InvalidMetric(format!("unknown hazard: {s}")))
    }
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Building portfolio an AAL figure is aggregated over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetModel {
    Bmn, // state-owned buildings
    Fs,  // health facilities
    Fd,  // education facilities
    Total,
}

impl AssetModel {
    pub const ALL: [AssetModel; 4] = [Self::Bmn, Self::Fs, Self::Fd, Self::Total];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Bmn => "bmn",
            Self::Fs => "fs",
            Self::Fd => "fd",
            Self::Total => "total",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Bmn => "State-owned buildings",
            Self::Fs => "Health facilities",
            Self::Fd => "Education facilities",
            Self::Total => "Total",
        }
    }
}

impl FromStr for AssetModel {
    type Err = AalLensError;
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.code() == s)
            .ok_or_else(|| AalLensError::InvalidMetric(format!("unknown asset model: {s}")))
    }
}

impl fmt::Display for AssetModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `aal_{hazard}_{period}_{model}` property key on province features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MetricKey {
    pub hazard: Hazard,
    pub period: u32,
    pub model: AssetModel,
}

fn metric_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^aal_(gempa|banjir|longsor|gunungberapi)_(\d+)_(bmn|fs|fd|total)$")
            .expect("metric pattern is a valid regex")
    })
}

impl MetricKey {
    pub fn new(hazard: Hazard, period: u32, model: AssetModel) -> Result<Self> {
        if !hazard.return_periods().contains(&period) {
            return Err(AalLensError::InvalidMetric(format!(
                "{hazard} has no {period}-year return period (valid: {:?})",
                hazard.return_periods()
            )));
        }
        Ok(Self { hazard, period, model })
    }

    /// Every valid hazard / period / model combination.
    pub fn all() -> Vec<Self> {
        Hazard::ALL
            .into_iter()
            .flat_map(|h| {
                h.return_periods()
                    .iter()
                    .flat_map(move |&p| AssetModel::ALL.into_iter().map(move |m| Self { hazard: h, period: p, model: m }))
            })
            .collect()
    }

    pub fn is_metric_key(s: &str) -> bool {
        metric_pattern().is_match(s)
    }

    pub fn title(&self) -> String {
        format!("AAL {} {}-yr, {}", self.hazard.label(), self.period, self.model.label())
    }
}

impl FromStr for MetricKey {
    type Err = AalLensError;
    fn from_str(s: &str) -> Result<Self> {
        let caps = metric_pattern()
            .captures(s)
            .ok_or_else(|| AalLensError::InvalidMetric(format!("{s} (expected aal_<hazard>_<period>_<model>)")))?;
        let hazard: Hazard = caps[1].parse()?;
        let period: u32 = caps[2]
            .parse()
            .map_err(|_| AalLensError::InvalidMetric(format!("bad return period in {s}")))?;
        let model: AssetModel = caps[3].parse()?;
        Self::new(hazard, period, model)
    }
}

impl TryFrom<String> for MetricKey {
    type Error = AalLensError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<MetricKey> for String {
    fn from(k: MetricKey) -> Self {
        k.to_string()
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aal_{}_{}_{}", self.hazard, self.period, self.model)
    }
}

/// 6 classes for more than 30 observations, otherwise 5.
pub fn default_class_count(observations: usize) -> usize {
    if observations > 30 {
        6
    } else {
        5
    }
}

#[cfg(test)]
mod tests_metric {
    use super::*;

    #[test]
    fn parse_and_display() {
        let k: MetricKey = "aal_gempa_500_bmn".parse().unwrap();
        assert_eq!(k.hazard, Hazard::Gempa);
        assert_eq!(k.period, 500);
        assert_eq!(k.model, AssetModel::Bmn);
        assert_eq!(k.to_string(), "aal_gempa_500_bmn");
    }

    #[test]
    fn rejects_bad_keys() {
        assert!("aal_gempa_50_bmn".parse::<MetricKey>().is_err()); // no 50-yr quake
        assert!("aal_tsunami_100_bmn".parse::<MetricKey>().is_err());
        assert!("aal_banjir_100_xx".parse::<MetricKey>().is_err());
        assert!("provinsi".parse::<MetricKey>().is_err());
        assert!(!MetricKey::is_metric_key("aal_banjir_100_total_extra"));
    }

    #[test]
    fn all_combinations() {
        let all = MetricKey::all();
        assert_eq!(all.len(), (3 + 3 + 2 + 3) * 4);
        for k in all {
            assert_eq!(k.to_string().parse::<MetricKey>().unwrap(), k);
        }
    }

    #[test]
    fn intensity_fields_follow_periods() {
        assert_eq!(Hazard::Banjir.intensity_fields(), vec!["depth_100", "depth_50", "depth_25"]);
        assert_eq!(Hazard::Longsor.intensity_fields(), vec!["mflux_5", "mflux_2"]);
    }

    #[test]
    fn class_count_rule() {
        assert_eq!(default_class_count(30), 5);
        assert_eq!(default_class_count(31), 6);
        assert_eq!(default_class_count(0), 5);
    }

    #[test]
    fn serde_as_string() {
        let k = MetricKey::new(Hazard::Longsor, 2, AssetModel::Total).unwrap();
        assert_eq!(serde_json::to_string(&k).unwrap(), "\"aal_longsor_2_total\"");
    }
}
