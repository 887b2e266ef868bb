//! Shared types and enums used across cropmap.
//! Includes `Product` (which map the backend generates) and `OutputFormat`.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Product {
    Cropland,
    Croptype,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Cropland => "cropland",
            Product::Croptype => "croptype",
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    #[default]
    #[value(name = "gtiff")]
    GTiff,
    #[value(name = "netcdf")]
    #[serde(rename = "NetCDF")]
    NetCdf, // Not post-processable
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::GTiff => write!(f, "GTiff"),
            OutputFormat::NetCdf => write!(f, "NetCDF"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Product::Croptype).unwrap(), "\"croptype\"");
        let p: Product = serde_json::from_str("\"cropland\"").unwrap();
        assert_eq!(p, Product::Cropland);
    }

    #[test]
    fn output_format_uses_backend_names() {
        assert_eq!(serde_json::to_string(&OutputFormat::GTiff).unwrap(), "\"GTiff\"");
        assert_eq!(serde_json::to_string(&OutputFormat::NetCdf).unwrap(), "\"NetCDF\"");
        assert_eq!(OutputFormat::NetCdf.to_string(), "NetCDF");
    }
}
