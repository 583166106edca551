use crate::choropleth::ChoroplethLayer;
use crate::classify::{goodness_of_variance_fit, summarize, Breaks, ClassMethod, ClassSummary};
use crate::geojson::FeatureCollection;
use crate::legend::Legend;
use crate::metric::MetricKey;
use crate::options::ClassifyOptions;
use crate::palette::Rgb;
use aal_lens_common::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Everything a classification run produced, ready to print or write out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub source: String,
    pub metric: Option<String>,
    pub method: ClassMethod,
    pub requested_classes: usize,
    pub classes: usize,
    pub observations: usize,
    pub breaks: Breaks,
    pub colors: Vec<Rgb>,
    pub summaries: Vec<ClassSummary>,
    pub gvf: f64,
    pub no_data_count: usize,
    pub legend: Legend,
}

impl ClassificationReport {
    pub fn build(
        source: &str,
        metric: Option<&str>,
        values: &[Option<f64>],
        opts: &ClassifyOptions,
    ) -> Result<Self> {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let no_data_count = values.len() - present.len();
        let scale = opts.color_scale(values)?;
        let title = metric
            .map(|m| m.parse::<MetricKey>().map(|k| k.title()).unwrap_or_else(|_| m.to_owned()))
            .unwrap_or_else(|| source.to_owned());
        let legend = opts.legend(&title, &scale, no_data_count);
        Ok(Self {
            source: source.to_owned(),
            metric: metric.map(str::to_owned),
            method: opts.method,
            requested_classes: opts.requested_classes(present.len()),
            classes: scale.breaks.class_count(),
            observations: present.len(),
            summaries: summarize(&present, &scale.breaks),
            gvf: goodness_of_variance_fit(&present, &scale.breaks),
            breaks: scale.breaks,
            colors: scale.colors,
            no_data_count,
            legend,
        })
    }

    pub fn from_layer(source: &str, fc: &FeatureCollection, layer: &ChoroplethLayer) -> Self {
        let present: Vec<f64> = fc.values(&layer.property).into_iter().flatten().collect();
        Self {
            source: source.to_owned(),
            metric: Some(layer.property.clone()),
            method: layer.method,
            requested_classes: layer.requested_classes,
            classes: layer.scale.breaks.class_count(),
            observations: present.len(),
            breaks: layer.scale.breaks.clone(),
            colors: layer.scale.colors.clone(),
            summaries: summarize(&present, &layer.scale.breaks),
            gvf: goodness_of_variance_fit(&present, &layer.scale.breaks),
            no_data_count: layer.no_data_count,
            legend: layer.legend.clone(),
        }
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("{:<16} {}", "Source:", self.source),
            format!("{:<16} {}", "Method:", self.method.label()),
            format!("{:<16} {} (requested {})", "Classes:", self.classes, self.requested_classes),
            format!("{:<16} {}", "Observations:", self.observations),
            format!("{:<16} {}", "No data:", self.no_data_count),
        ];
        if let Some(m) = &self.metric {
            lines.insert(1, format!("{:<16} {}", "Metric:", m));
        }
        if self.breaks.is_empty() {
            lines.push("no observations to classify".into());
            return lines;
        }
        lines.push(format!("{:<16} {:.4}", "GVF:", self.gvf));
        lines.push(format!("{:<16} {:?}", "Breaks:", self.breaks.as_slice()));
        for (s, entry) in self.summaries.iter().zip(&self.legend.entries) {
            lines.push(format!(
                "  {:>2}  {}  {:>8}  {}",
                s.index + 1,
                self.colors[s.index],
                s.count,
                entry.label
            ));
        }
        lines
    }
}

pub fn print_summary(report: &ClassificationReport) {
    for line in report.summary_lines() {
        println!("{line}");
    }
}

pub fn export_json(output_path: &Path, report: &ClassificationReport) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(&mut file, report)?;
    writeln!(file)?;
    Ok(())
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_owned()
    }
}

/// One row per class.
pub fn export_csv(output_path: &Path, report: &ClassificationReport) -> Result<()> {
    let mut file = std::fs::File::create(output_path)?;
    writeln!(file, "class,lower,upper,count,mean,color,label")?;
    for s in &report.summaries {
        let label = report.legend.entries.get(s.index).map(|e| e.label.as_str()).unwrap_or("");
        writeln!(
            file,
            "{},{},{},{},{},{},{}",
            s.index + 1,
            s.lower,
            s.upper,
            s.count,
            s.mean.map_or(String::new(), |m| m.to_string()),
            report.colors[s.index],
            csv_field(label),
        )?;
    }
    Ok(())
}

/// The collection with `fill_color` and `class` written into every feature.
pub fn export_geojson(output_path: &Path, fc: &FeatureCollection, layer: &ChoroplethLayer) -> Result<()> {
    let mut annotated = fc.clone();
    layer.annotate(&mut annotated);
    let mut file = std::fs::File::create(output_path)?;
    serde_json::to_writer_pretty(&mut file, &annotated)?;
    writeln!(file)?;
    Ok(())
}
