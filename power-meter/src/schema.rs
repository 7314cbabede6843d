//! Parameter schema published to clients.
//!
//! Describes the measurement inputs with their display names, data types and
//! defaults, plus the single output, so a client UI can render a form
//! without hard-coding the request layout.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ServiceConfig;
use crate::request::MeasurementRequest;

/// Data type of a parameter or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum DataType {
    String,
    Double,
    Float,
    Boolean,
    Int32,
    Path,
}

/// One input parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    /// JSON field name in the request body
    pub id: String,
    pub display_name: String,
    pub data_type: DataType,
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

impl ParameterSpec {
    fn new(id: &str, display_name: &str, data_type: DataType, default: Value) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            data_type,
            default,
            min: None,
        }
    }

    fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }
}

/// One measurement output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    pub id: String,
    pub display_name: String,
    pub data_type: DataType,
}

/// Full schema of the measurement service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSchema {
    pub display_name: String,
    pub version: String,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub outputs: Vec<OutputSpec>,
}

impl MeasurementSchema {
    /// Look up a parameter by its request field name.
    pub fn parameter(&self, id: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.id == id)
    }
}

/// Build the schema for the configured service.
pub fn measurement_schema(config: &ServiceConfig) -> MeasurementSchema {
    let defaults = MeasurementRequest::default();

    let parameters = vec![
        ParameterSpec::new(
            "resourceName",
            "Resource Name",
            DataType::String,
            json!(defaults.resource_name),
        ),
        ParameterSpec::new(
            "frequencyHz",
            "Frequency (Hz)",
            DataType::Double,
            json!(defaults.frequency_hz),
        )
        .with_min(0.0),
        ParameterSpec::new(
            "apertureTimeSec",
            "Aperture Time (s)",
            DataType::Double,
            json!(defaults.aperture_time_sec),
        ),
        ParameterSpec::new(
            "autoAveraging",
            "Auto Averaging",
            DataType::Boolean,
            json!(defaults.auto_averaging),
        ),
        ParameterSpec::new(
            "averagingCount",
            "Averaging Count",
            DataType::Int32,
            json!(defaults.averaging_count),
        ),
        ParameterSpec::new(
            "powerOffsetDb",
            "Power Offset",
            DataType::Double,
            json!(defaults.power_offset_db),
        ),
        ParameterSpec::new(
            "deembedFilePath",
            "Deembedding File Path",
            DataType::Path,
            json!(defaults.deembed_file_path),
        ),
    ];

    let outputs = vec![OutputSpec {
        id: "powerDbm".to_string(),
        display_name: "Power (dBm)".to_string(),
        data_type: DataType::Float,
    }];

    MeasurementSchema {
        display_name: config.display_name.clone(),
        version: config.version.clone(),
        description: config.description.clone(),
        parameters,
        outputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_in_declared_order() {
        let schema = measurement_schema(&ServiceConfig::default());
        let ids: Vec<&str> = schema.parameters.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "resourceName",
                "frequencyHz",
                "apertureTimeSec",
                "autoAveraging",
                "averagingCount",
                "powerOffsetDb",
                "deembedFilePath",
            ]
        );
    }

    #[test]
    fn test_defaults_and_types() {
        let schema = measurement_schema(&ServiceConfig::default());

        let freq = schema.parameter("frequencyHz").unwrap();
        assert_eq!(freq.data_type, DataType::Double);
        assert_eq!(freq.default, json!(1e9));
        assert_eq!(freq.min, Some(0.0));

        let count = schema.parameter("averagingCount").unwrap();
        assert_eq!(count.data_type, DataType::Int32);
        assert_eq!(count.default, json!(1));

        assert_eq!(
            schema.parameter("deembedFilePath").unwrap().data_type,
            DataType::Path
        );
        assert!(schema.parameter("missing").is_none());
    }

    #[test]
    fn test_single_output_and_identity() {
        let schema = measurement_schema(&ServiceConfig::default());
        assert_eq!(schema.display_name, "RFPowerMeter");
        assert_eq!(schema.version, "1.0.1.0");
        assert_eq!(schema.outputs.len(), 1);
        assert_eq!(schema.outputs[0].id, "powerDbm");
        assert_eq!(schema.outputs[0].data_type.to_string(), "Float");
    }

    #[test]
    fn test_schema_ids_match_request_fields() {
        let schema = measurement_schema(&ServiceConfig::default());
        let request = serde_json::to_value(MeasurementRequest::default()).unwrap();
        for param in &schema.parameters {
            assert_eq!(request[&param.id], param.default, "{}", param.id);
        }
    }
}
