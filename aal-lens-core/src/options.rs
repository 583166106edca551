use crate::classify::{Breaks, ClassMethod};
use crate::legend::{Legend, LegendFormat, NumberFormat};
use crate::metric::default_class_count;
use crate::palette::{ColorScale, Palette, Rgb};
use aal_lens_common::{ClassifyConfig, Result};

/// Everything needed to turn observations into coloured classes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOptions {
    pub method: ClassMethod,
    pub classes: Option<usize>, // None: 5 or 6 depending on observation count
    pub palette: Palette,
    pub no_data: Rgb,
    pub legend: LegendFormat,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self::from_config(&ClassifyConfig::default()).unwrap_or_else(|_| Self {
            method: ClassMethod::Jenks,
            classes: None,
            palette: Palette { name: "grey".into(), colors: vec![Rgb::new(0x80, 0x80, 0x80); 6] },
            no_data: Rgb::new(0xcc, 0xcc, 0xcc),
            legend: LegendFormat::default(),
        })
    }
}

impl ClassifyOptions {
    pub fn from_config(cfg: &ClassifyConfig) -> Result<Self> {
        let palette = match &cfg.custom_palette {
            Some(hexes) => Palette::from_hex_list("custom", hexes)?,
            None => Palette::preset(&cfg.palette)?,
        };
        Ok(Self {
            method: cfg.method.parse()?,
            classes: cfg.classes,
            palette,
            no_data: cfg.no_data_color.parse()?,
            legend: LegendFormat {
                style: cfg.legend_style.parse()?,
                number: NumberFormat::Abbreviated,
                locale: cfg.locale.parse()?,
                prefix: cfg.currency_prefix.clone(),
            },
        })
    }

    /// Explicit count, or 5/6 by observation count capped at the palette size.
    pub fn requested_classes(&self, observations: usize) -> usize {
        self.classes
            .unwrap_or_else(|| default_class_count(observations).min(self.palette.len().max(1)))
    }

    /// Classify the present values and pair the breaks with palette colours.
    pub fn color_scale(&self, values: &[Option<f64>]) -> Result<ColorScale> {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let breaks = self.breaks(&present)?;
        ColorScale::new(breaks, &self.palette, self.no_data)
    }

    pub fn breaks(&self, present: &[f64]) -> Result<Breaks> {
        self.method.classify(present, self.requested_classes(present.len()))
    }

    pub fn legend(&self, title: &str, scale: &ColorScale, no_data_count: usize) -> Legend {
        Legend::build(title, scale, &self.legend, no_data_count)
    }
}
