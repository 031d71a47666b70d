//! Reading samples and reading/writing persisted draws.
//!
//! Sample files are either JSON (`[[x, y], ...]`, or `[x, ...]` for one
//! dimension) or plain text with one point per line, coordinates separated
//! by whitespace or commas. Lines starting with `#` are ignored.
//!
//! Draw files are a JSON array of draws (a single draw object is accepted
//! too).

use crate::error::{MixtureError, Result};
use crate::mixture::Draw;
use crate::transform::Bounds;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum SampleShape {
    Points(Vec<Vec<f64>>),
    Scalars(Vec<f64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DrawShape {
    Many(Vec<Draw>),
    One(Box<Draw>),
}

/// Parse sample text in either supported format.
pub fn parse_samples(content: &str) -> Result<Vec<Vec<f64>>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        let shape: SampleShape = serde_json::from_str(trimmed)?;
        return Ok(match shape {
            SampleShape::Points(p) => p,
            SampleShape::Scalars(s) => s.into_iter().map(|v| vec![v]).collect(),
        });
    }
    let mut points = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let point = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<f64>().map_err(|e| {
                    MixtureError::InvalidSamples(format!(
                        "line {}: cannot parse {:?} as a number: {}",
                        lineno + 1,
                        t,
                        e
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        points.push(point);
    }
    Ok(points)
}

pub fn load_samples(path: &Path) -> Result<Vec<Vec<f64>>> {
    let content = std::fs::read_to_string(path).map_err(|e| MixtureError::io(path, e))?;
    parse_samples(&content)
}

/// Bounds from a JSON list of `[min, max]` pairs.
pub fn parse_bounds(json: &str) -> Result<Bounds> {
    let pairs: Vec<[f64; 2]> = serde_json::from_str(json)
        .map_err(|e| MixtureError::InvalidBounds(format!("expected [[min, max], ...]: {}", e)))?;
    Bounds::new(&pairs)
}

pub fn parse_draws(content: &str) -> Result<Vec<Draw>> {
    let shape: DrawShape = serde_json::from_str(content)?;
    Ok(match shape {
        DrawShape::Many(d) => d,
        DrawShape::One(d) => vec![*d],
    })
}

pub fn load_draws(path: &Path) -> Result<Vec<Draw>> {
    let content = std::fs::read_to_string(path).map_err(|e| MixtureError::io(path, e))?;
    parse_draws(&content)
}

pub fn draws_to_json(draws: &[Draw]) -> Result<String> {
    Ok(serde_json::to_string_pretty(draws)?)
}

pub fn write_draws(path: &Path, draws: &[Draw]) -> Result<()> {
    let json = draws_to_json(draws)?;
    std::fs::write(path, json).map_err(|e| MixtureError::io(path, e))
}
