use crate::geojson::FeatureCollection;
use aal_lens_common::{AalLensError, Result};
use arrow::array::{Array, Float64Array};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use bytes::Bytes;
use memmap2::Mmap;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ProjectionMask;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Read a column of observations from parquet, JSON/GeoJSON or delimited text.
/// `None` entries are missing values.
pub fn load_observations(path: &Path, column: Option<&str>) -> Result<Vec<Option<f64>>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let values = match ext.as_str() {
        "parquet" | "pq" => read_parquet_column(path, column)?,
        "json" | "geojson" => {
            let file = std::fs::File::open(path)?;
            let value: Value = serde_json::from_reader(std::io::BufReader::new(file))?;
            observations_from_json(value, column)?
        }
        _ => parse_text(&std::fs::read_to_string(path)?, column)?,
    };
    debug!(
        path = %path.display(),
        total = values.len(),
        missing = values.iter().filter(|v| v.is_none()).count(),
        "observations loaded"
    );
    Ok(values)
}

fn read_parquet_column(path: &Path, column: Option<&str>) -> Result<Vec<Option<f64>>> {
    let file = std::fs::File::open(path)?;
    let mmap: Mmap = unsafe { Mmap::map(&file)? };
    let bytes = Bytes::copy_from_slice(&mmap);
    let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
    let schema = builder.schema().clone();
    let idx = match column {
        Some(name) => schema
            .fields()
            .iter()
            .position(|f| f.name() == name)
            .ok_or_else(|| AalLensError::Other(format!("column not found: {name}")))?,
        None => schema
            .fields()
            .iter()
            .position(|f| f.data_type().is_numeric())
            .ok_or_else(|| AalLensError::Other(format!("no numeric column in {}", path.display())))?,
    };
    let field = schema.field(idx);
    if !field.data_type().is_numeric() && !matches!(field.data_type(), DataType::Utf8 | DataType::LargeUtf8) {
        return Err(AalLensError::Other(format!(
            "column {} has non-numeric type {}",
            field.name(),
            field.data_type()
        )));
    }
    let mask = ProjectionMask::roots(builder.parquet_schema(), [idx]);
    let reader = builder.with_projection(mask).build()?;
    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        let floats = cast(batch.column(0), &DataType::Float64)?;
        let floats = floats
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| AalLensError::Other("Float64 cast produced unexpected array".into()))?;
        out.extend(floats.iter().map(|v| v.filter(|x| x.is_finite())));
    }
    Ok(out)
}

/// A bare array of numbers, an array of records keyed by `column`, or a
/// FeatureCollection property.
pub fn observations_from_json(value: Value, column: Option<&str>) -> Result<Vec<Option<f64>>> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match (item, column) {
                (Value::Object(obj), Some(col)) => Ok(obj.get(col).and_then(json_number)),
                (Value::Object(_), None) => {
                    Err(AalLensError::Other("array of objects needs a --column".into()))
                }
                (other, _) => Ok(json_number(other)),
            })
            .collect(),
        Value::Object(obj) if obj.contains_key("features") => {
            let fc = FeatureCollection::from_value(Value::Object(obj))?;
            let key = match column {
                Some(c) => c.to_owned(),
                None => fc
                    .metric_keys()
                    .first()
                    .map(|k| k.to_string())
                    .ok_or_else(|| AalLensError::Other("no AAL metric in collection, pass --column".into()))?,
            };
            Ok(fc.values(&key))
        }
        _ => Err(AalLensError::Other("expected a JSON array or FeatureCollection".into())),
    }
}

fn json_number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_token(s).ok().flatten(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

const MISSING_TOKENS: [&str; 6] = ["", "null", "na", "n/a", "nan", "none"];

/// `Ok(None)` for a missing-value token, `Err(())` for anything non-numeric.
fn parse_token(token: &str) -> std::result::Result<Option<f64>, ()> {
    let t = token.trim().trim_matches('"');
    if MISSING_TOKENS.contains(&t.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    let v: f64 = t.parse().map_err(|_| ())?;
    Ok(v.is_finite().then_some(v))
}

fn split_fields(line: &str) -> Vec<&str> {
    if line.contains(',') || line.contains(';') || line.contains('\t') {
        line.split([',', ';', '\t']).collect()
    } else {
        line.split_whitespace().collect()
    }
}

/// Text observations: one per line or delimited. A header line is skipped,
/// and selects the column when `column` is given.
pub fn parse_text(text: &str, column: Option<&str>) -> Result<Vec<Option<f64>>> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()).peekable();
    let mut col_idx = None;
    if let Some(&(_, first)) = lines.peek() {
        let fields = split_fields(first);
        let is_header = fields.iter().any(|f| parse_token(f).is_err());
        if is_header {
            if let Some(name) = column {
                let idx = fields
                    .iter()
                    .position(|f| f.trim().trim_matches('"') == name)
                    .ok_or_else(|| AalLensError::Other(format!("column not found: {name}")))?;
                col_idx = Some(idx);
            }
            lines.next();
        } else if column.is_some() {
            return Err(AalLensError::Other("--column needs a header line".into()));
        }
    }
    let mut out = Vec::new();
    for (lineno, line) in lines {
        let fields = split_fields(line);
        let selected: Vec<&str> = match col_idx {
            Some(i) => vec![fields.get(i).copied().unwrap_or("")],
            None => fields,
        };
        for field in selected {
            let v = parse_token(field).map_err(|_| {
                AalLensError::Other(format!("line {}: not a number: {}", lineno + 1, field.trim()))
            })?;
            out.push(v);
        }
    }
    Ok(out)
}
