use crate::palette::{ColorScale, Rgb};
use aal_lens_common::{AalLensError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegendStyle {
    /// `a – b` for every class
    Range,
    /// `Less than b1`, `b_i – b_i+1`, `b_k-1 or more`
    OpenEnded,
}

impl FromStr for LegendStyle {
    type Err = AalLensError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "range" => Ok(Self::Range),
            "open" | "open-ended" => Ok(Self::OpenEnded),
            other => Err(AalLensError::Other(format!("unknown legend style: {other} (use open or range)"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    Id,
    En,
}

impl Locale {
    fn separators(&self) -> (char, char) {
        match self {
            Self::Id => ('.', ','),
            Self::En => (',', '.'),
        }
    }

    /// trillion / billion / million suffixes
    fn suffixes(&self) -> [&'static str; 3] {
        match self {
            Self::Id => ["T", "M", "JT"],
            Self::En => ["T", "B", "M"],
        }
    }

    fn less_than(&self) -> &'static str {
        match self {
            Self::Id => "Kurang dari",
            Self::En => "Less than",
        }
    }

    /// suffix for the top class, which includes its lower bound
    fn or_more(&self) -> &'static str {
        match self {
            Self::Id => "ke atas",
            Self::En => "or more",
        }
    }

    fn no_data(&self) -> &'static str {
        match self {
            Self::Id => "Tidak ada data",
            Self::En => "No data",
        }
    }
}

impl FromStr for Locale {
    type Err = AalLensError;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "id" | "id-id" => Ok(Self::Id),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            other => Err(AalLensError::Other(format!("unsupported locale: {other} (use id or en)"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberFormat {
    Fixed(usize),
    Abbreviated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendFormat {
    pub style: LegendStyle,
    pub number: NumberFormat,
    pub locale: Locale,
    pub prefix: Option<String>, // e.g. "Rp "
}

impl Default for LegendFormat {
    fn default() -> Self {
        Self {
            style: LegendStyle::OpenEnded,
            number: NumberFormat::Abbreviated,
            locale: Locale::Id,
            prefix: None,
        }
    }
}

impl LegendFormat {
    pub fn number(&self, v: f64) -> String {
        let body = format_number(v, self.number, self.locale);
        match &self.prefix {
            Some(p) => format!("{p}{body}"),
            None => body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub color: Rgb,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    /// One entry per class, plus a no-data entry when any value was missing.
    pub fn build(title: &str, scale: &ColorScale, fmt: &LegendFormat, no_data_count: usize) -> Self {
        let b = scale.breaks.as_slice();
        let k = scale.breaks.class_count();
        let open = fmt.style == LegendStyle::OpenEnded && k >= 2;
        let mut entries: Vec<LegendEntry> = (0..k)
            .map(|i| {
                let (lower, upper) = (b[i], b[i + 1]);
                let label = if open && i == 0 {
                    format!("{} {}", fmt.locale.less_than(), fmt.number(upper))
                } else if open && i == k - 1 {
                    format!("{} {}", fmt.number(lower), fmt.locale.or_more())
                } else {
                    format!("{} – {}", fmt.number(lower), fmt.number(upper))
                };
                LegendEntry { color: scale.colors[i], lower: Some(lower), upper: Some(upper), label }
            })
            .collect();
        if no_data_count > 0 {
            entries.push(LegendEntry {
                color: scale.no_data,
                lower: None,
                upper: None,
                label: format!("{} ({no_data_count})", fmt.locale.no_data()),
            });
        }
        Self { title: title.to_owned(), entries }
    }

    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![self.title.clone()];
        lines.extend(self.entries.iter().map(|e| format!("  {}  {}", e.color, e.label)));
        lines
    }
}

pub fn format_number(v: f64, format: NumberFormat, locale: Locale) -> String {
    match format {
        NumberFormat::Fixed(decimals) => format!("{v:.decimals$}"),
        NumberFormat::Abbreviated => abbreviate(v, locale),
    }
}

/// Whole-number T / B(M) / M(JT) abbreviations above a million, digit
/// grouping below.
pub fn abbreviate(v: f64, locale: Locale) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let [tril, bil, mil] = locale.suffixes();
    let a = v.abs();
    let sign = if v < 0.0 { "-" } else { "" };
    if a >= 1e12 {
        format!("{sign}{}{tril}", (a / 1e12).round())
    } else if a >= 1e9 {
        format!("{sign}{}{bil}", (a / 1e9).round())
    } else if a >= 1e6 {
        format!("{sign}{}{mil}", (a / 1e6).round())
    } else {
        group_thousands(v, locale)
    }
}

/// At most three fraction digits, trailing zeros dropped.
fn group_thousands(v: f64, locale: Locale) -> String {
    let (thousands, decimal) = locale.separators();
    let scaled = (v.abs() * 1000.0).round() as u64;
    let (int_part, frac) = (scaled / 1000, scaled % 1000);
    let digits = int_part.to_string();
    let mut out = String::new();
    if v < 0.0 && scaled > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(thousands);
        }
        out.push(ch);
    }
    if frac > 0 {
        out.push(decimal);
        out.push_str(format!("{frac:03}").trim_end_matches('0'));
    }
    out
}

#[cfg(test)]
mod tests_legend {
    use super::*;
    use crate::classify::classify;
    use crate::palette::{Palette, NO_DATA_HEX};

    fn scale(values: &[f64], k: usize) -> ColorScale {
        let no_data: Rgb = NO_DATA_HEX.parse().unwrap();
        ColorScale::new(classify(values, k).unwrap(), &Palette::preset("aal").unwrap(), no_data).unwrap()
    }

    #[test]
    fn abbreviations_id() {
        assert_eq!(abbreviate(2.5e12, Locale::Id), "3T");
        assert_eq!(abbreviate(4.2e9, Locale::Id), "4M");
        assert_eq!(abbreviate(1_500_000.0, Locale::Id), "2JT");
        assert_eq!(abbreviate(12_345.678, Locale::Id), "12.345,678");
        assert_eq!(abbreviate(999.0, Locale::Id), "999");
        assert_eq!(abbreviate(0.0, Locale::Id), "0");
    }

    #[test]
    fn abbreviations_en() {
        assert_eq!(abbreviate(4.2e9, Locale::En), "4B");
        assert_eq!(abbreviate(7.0e6, Locale::En), "7M");
        assert_eq!(abbreviate(12_345.5, Locale::En), "12,345.5");
        assert_eq!(abbreviate(-2_000.0, Locale::En), "-2,000");
    }

    #[test]
    fn fixed_format() {
        assert_eq!(format_number(1.23456, NumberFormat::Fixed(2), Locale::En), "1.23");
    }

    #[test]
    fn open_ended_labels() {
        let s = scale(&[1.0e6, 2.0e6, 5.0e9, 5.5e9, 3.0e12, 3.001e12], 3);
        let fmt = LegendFormat { prefix: Some("Rp ".into()), ..LegendFormat::default() };
        let legend = Legend::build("AAL", &s, &fmt, 0);
        let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["Kurang dari Rp 5M", "Rp 5M – Rp 3T", "Rp 3T ke atas"]);
        assert_eq!(legend.entries[0].color, s.colors[0]);
    }

    #[test]
    fn top_label_includes_its_lower_bound() {
        let s = scale(&[0.5, 0.75, 2.0, 2.25], 2);
        let fmt = LegendFormat {
            style: LegendStyle::OpenEnded,
            number: NumberFormat::Fixed(2),
            locale: Locale::En,
            prefix: None,
        };
        let legend = Legend::build("MMI", &s, &fmt, 0);
        assert_eq!(legend.entries[0].label, "Less than 2.00");
        assert_eq!(legend.entries[1].label, "2.00 or more");
        assert_eq!(s.bucket(Some(2.0)), Some(1));
    }

    #[test]
    fn range_labels_and_no_data_entry() {
        let s = scale(&[0.5, 0.75, 2.0, 2.25], 2);
        let fmt = LegendFormat {
            style: LegendStyle::Range,
            number: NumberFormat::Fixed(2),
            locale: Locale::En,
            prefix: None,
        };
        let legend = Legend::build("MMI", &s, &fmt, 3);
        assert_eq!(legend.entries.len(), 3);
        assert_eq!(legend.entries[0].label, "0.50 – 2.00");
        assert_eq!(legend.entries[1].label, "2.00 – 2.25");
        assert_eq!(legend.entries[2].label, "No data (3)");
        assert_eq!(legend.entries[2].color, s.no_data);
        assert_eq!(legend.to_lines().len(), 4);
    }

    #[test]
    fn single_class_falls_back_to_range() {
        let s = scale(&[4.0, 4.0], 3);
        let fmt = LegendFormat { locale: Locale::En, ..LegendFormat::default() };
        let legend = Legend::build("x", &s, &fmt, 0);
        assert_eq!(legend.entries.len(), 1);
        assert_eq!(legend.entries[0].label, "4 – 4");
    }

    #[test]
    fn parses_style_and_locale() {
        assert_eq!("open".parse::<LegendStyle>().unwrap(), LegendStyle::OpenEnded);
        assert_eq!("range".parse::<LegendStyle>().unwrap(), LegendStyle::Range);
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert!("fr".parse::<Locale>().is_err());
    }
}
