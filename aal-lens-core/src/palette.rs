use crate::classify::Breaks;
use aal_lens_common::{AalLensError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const NO_DATA_HEX: &str = "#cccccc";

const AAL: [&str; 6] = ["#1a9850", "#d9ef8b", "#fee08b", "#fc8d59", "#d73027", "#7f0000"];
const CHOROPLETH: [&str; 5] = ["#ff0a0a", "#f2ce02", "#ebff0a", "#85e62c", "#209c05"];
const HAZARD: [&str; 6] = ["#313695", "#4575b4", "#74add1", "#fdae61", "#f46d43", "#a50026"];

pub const PRESET_NAMES: [&str; 3] = ["aal", "choropleth", "hazard"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = AalLensError;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let bad = || AalLensError::InvalidPalette(format!("not a #rrggbb colour: {s}"));
        if !hex.is_ascii() {
            return Err(bad());
        }
        let expanded: String = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect(), // #abc shorthand
            6 => hex.to_owned(),
            _ => return Err(bad()),
        };
        let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| bad());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = AalLensError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        c.to_hex()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Colour ramp ordered low to high.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub name: String,
    pub colors: Vec<Rgb>,
}

impl Palette {
    pub fn preset(name: &str) -> Result<Self> {
        let hexes: &[&str] = match name {
            "aal" => &AAL,
            "choropleth" => &CHOROPLETH,
            "hazard" => &HAZARD,
            other => {
                return Err(AalLensError::InvalidPalette(format!(
                    "unknown preset {other} (use {})",
                    PRESET_NAMES.join(", ")
                )))
            }
        };
        Self::from_hex_list(name, hexes)
    }

    pub fn from_hex_list<S: AsRef<str>>(name: &str, hexes: &[S]) -> Result<Self> {
        if hexes.is_empty() {
            return Err(AalLensError::InvalidPalette(format!("{name}: no colours")));
        }
        let colors = hexes.iter().map(|h| h.as_ref().parse()).collect::<Result<Vec<Rgb>>>()?;
        Ok(Self { name: name.to_owned(), colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Exactly `k` colours, one per class, keeping both ends of the ramp.
    ///
    /// Longer ramps are sampled at evenly spaced positions; a single class
    /// takes the top colour. Fewer than `k` colours is an error.
    pub fn resample(&self, k: usize) -> Result<Vec<Rgb>> {
        let n = self.colors.len();
        if k > n {
            return Err(AalLensError::InvalidPalette(format!(
                "{} has {n} colours, {k} classes requested",
                self.name
            )));
        }
        match k {
            0 => Ok(Vec::new()),
            1 => Ok(vec![self.colors[n - 1]]),
            _ if k == n => Ok(self.colors.clone()),
            _ => Ok((0..k)
                .map(|i| {
                    let pos = (i * (n - 1)) as f64 / (k - 1) as f64;
                    self.colors[pos.round() as usize]
                })
                .collect()),
        }
    }
}

/// Breaks paired with one colour per class plus a no-data colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub breaks: Breaks,
    pub colors: Vec<Rgb>,
    pub no_data: Rgb,
}

impl ColorScale {
    pub fn new(breaks: Breaks, palette: &Palette, no_data: Rgb) -> Result<Self> {
        let colors = palette.resample(breaks.class_count())?;
        Ok(Self { breaks, colors, no_data })
    }

    pub fn bucket(&self, value: Option<f64>) -> Option<usize> {
        value.and_then(|v| self.breaks.bucket(v))
    }

    /// Class colour of `value`; missing or NaN maps to the no-data colour.
    pub fn color_for(&self, value: Option<f64>) -> Rgb {
        self.bucket(value).map(|i| self.colors[i]).unwrap_or(self.no_data)
    }
}
