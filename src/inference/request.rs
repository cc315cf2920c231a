//! Scoring request parsing and validation
//!
//! A request is a flat JSON object with one entry per applicant attribute.
//! Numeric attributes may arrive as JSON numbers or numeric strings, since
//! HTML forms post everything as text.

use polars::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Numeric attributes, in column order
pub const NUMERIC_FIELDS: [&str; 12] = [
    "edad",
    "antiguedad",
    "ingresos",
    "score_crediticio",
    "pagos_previos",
    "creditos_previos",
    "monto_credito",
    "plazo_meses",
    "valor_garantia",
    "precio_soya",
    "precio_vino",
    "uso_productos",
];

/// Categorical attributes, in column order
pub const CATEGORICAL_FIELDS: [&str; 5] = [
    "genero",
    "zona",
    "tipo_empleo",
    "destino_credito",
    "tipo_garantia",
];

/// Every field a request must carry, in the order missing ones are reported
pub const REQUIRED_FIELDS: [&str; 17] = [
    "edad",
    "genero",
    "zona",
    "tipo_empleo",
    "antiguedad",
    "ingresos",
    "score_crediticio",
    "pagos_previos",
    "creditos_previos",
    "monto_credito",
    "plazo_meses",
    "destino_credito",
    "tipo_garantia",
    "valor_garantia",
    "precio_soya",
    "precio_vino",
    "uso_productos",
];

/// Documented values of each categorical attribute.
///
/// Other values are accepted and encode as all-zero indicators.
pub const CATEGORICAL_OPTIONS: [(&str, &[&str]); 5] = [
    ("genero", &["M", "F"]),
    ("zona", &["Urbana", "Rural"]),
    (
        "tipo_empleo",
        &["Dependiente", "Independiente", "Agricola", "Gobierno"],
    ),
    ("destino_credito", &["Consumo", "Comercial", "Agricola"]),
    ("tipo_garantia", &["Ninguna", "Vehiculo", "Inmueble"]),
];

/// Why a request was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("missing required field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("invalid numeric value for field '{field}': {value}")]
    InvalidNumber { field: String, value: String },

    #[error("field '{field}' must be a string, got {value}")]
    InvalidCategory { field: String, value: String },
}

/// A validated applicant record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub edad: f64,
    pub genero: String,
    pub zona: String,
    pub tipo_empleo: String,
    pub antiguedad: f64,
    pub ingresos: f64,
    pub score_crediticio: f64,
    pub pagos_previos: f64,
    pub creditos_previos: f64,
    pub monto_credito: f64,
    pub plazo_meses: f64,
    pub destino_credito: String,
    pub tipo_garantia: String,
    pub valor_garantia: f64,
    pub precio_soya: f64,
    pub precio_vino: f64,
    pub uso_productos: f64,
}

impl PredictionRequest {
    /// Validate a JSON body. Missing fields are all reported at once; after
    /// that the first malformed value is reported.
    pub fn from_json(body: &Value) -> Result<Self, RequestError> {
        let obj = body.as_object().ok_or(RequestError::NotAnObject)?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !obj.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(RequestError::MissingFields(missing));
        }

        Ok(Self {
            edad: number(obj, "edad")?,
            genero: category(obj, "genero")?,
            zona: category(obj, "zona")?,
            tipo_empleo: category(obj, "tipo_empleo")?,
            antiguedad: number(obj, "antiguedad")?,
            ingresos: number(obj, "ingresos")?,
            score_crediticio: number(obj, "score_crediticio")?,
            pagos_previos: number(obj, "pagos_previos")?,
            creditos_previos: number(obj, "creditos_previos")?,
            monto_credito: number(obj, "monto_credito")?,
            plazo_meses: number(obj, "plazo_meses")?,
            destino_credito: category(obj, "destino_credito")?,
            tipo_garantia: category(obj, "tipo_garantia")?,
            valor_garantia: number(obj, "valor_garantia")?,
            precio_soya: number(obj, "precio_soya")?,
            precio_vino: number(obj, "precio_vino")?,
            uso_productos: number(obj, "uso_productos")?,
        })
    }

    /// One-row frame with the raw training columns
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        df!(
            "edad" => &[self.edad],
            "genero" => &[self.genero.as_str()],
            "zona" => &[self.zona.as_str()],
            "tipo_empleo" => &[self.tipo_empleo.as_str()],
            "antiguedad" => &[self.antiguedad],
            "ingresos" => &[self.ingresos],
            "score_crediticio" => &[self.score_crediticio],
            "pagos_previos" => &[self.pagos_previos],
            "creditos_previos" => &[self.creditos_previos],
            "monto_credito" => &[self.monto_credito],
            "plazo_meses" => &[self.plazo_meses],
            "destino_credito" => &[self.destino_credito.as_str()],
            "tipo_garantia" => &[self.tipo_garantia.as_str()],
            "valor_garantia" => &[self.valor_garantia],
            "precio_soya" => &[self.precio_soya],
            "precio_vino" => &[self.precio_vino],
            "uso_productos" => &[self.uso_productos]
        )
    }
}

fn number(obj: &Map<String, Value>, field: &str) -> Result<f64, RequestError> {
    let value = &obj[field];
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| RequestError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn category(obj: &Map<String, Value>, field: &str) -> Result<String, RequestError> {
    match &obj[field] {
        Value::String(s) => Ok(s.clone()),
        other => Err(RequestError::InvalidCategory {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "edad": 35,
            "genero": "M",
            "zona": "Urbana",
            "tipo_empleo": "Dependiente",
            "antiguedad": 8,
            "ingresos": 4500.0,
            "score_crediticio": 720,
            "pagos_previos": 3,
            "creditos_previos": 2,
            "monto_credito": 50000,
            "plazo_meses": 24,
            "destino_credito": "Consumo",
            "tipo_garantia": "Vehiculo",
            "valor_garantia": 55000.0,
            "precio_soya": 420.5,
            "precio_vino": 48.0,
            "uso_productos": 2
        })
    }

    #[test]
    fn test_parse_valid_request() {
        let request = PredictionRequest::from_json(&sample()).unwrap();
        assert_eq!(request.edad, 35.0);
        assert_eq!(request.precio_soya, 420.5);
        assert_eq!(request.tipo_garantia, "Vehiculo");
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let mut body = sample();
        body["ingresos"] = json!(" 4500.50 ");
        body["edad"] = json!("41");
        let request = PredictionRequest::from_json(&body).unwrap();
        assert_eq!(request.ingresos, 4500.5);
        assert_eq!(request.edad, 41.0);
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut body = sample();
        body.as_object_mut().unwrap().remove("ingresos");
        let err = PredictionRequest::from_json(&body).unwrap_err();
        assert_eq!(err, RequestError::MissingFields(vec!["ingresos".to_string()]));
        assert_eq!(err.to_string(), "missing required field(s): ingresos");
    }

    #[test]
    fn test_all_missing_fields_are_reported_in_order() {
        let mut body = sample();
        let obj = body.as_object_mut().unwrap();
        obj.remove("uso_productos");
        obj.remove("zona");
        let err = PredictionRequest::from_json(&body).unwrap_err();
        assert_eq!(err.to_string(), "missing required field(s): zona, uso_productos");
    }

    #[test]
    fn test_non_numeric_value_is_named() {
        let mut body = sample();
        body["plazo_meses"] = json!("veinticuatro");
        let err = PredictionRequest::from_json(&body).unwrap_err();
        assert!(matches!(err, RequestError::InvalidNumber { ref field, .. } if field == "plazo_meses"));
        assert!(err.to_string().contains("plazo_meses"));

        body["plazo_meses"] = Value::Null;
        assert!(PredictionRequest::from_json(&body).is_err());
    }

    #[test]
    fn test_unknown_category_is_accepted() {
        let mut body = sample();
        body["zona"] = json!("Periurbana");
        let request = PredictionRequest::from_json(&body).unwrap();
        assert_eq!(request.zona, "Periurbana");
    }

    #[test]
    fn test_non_object_body() {
        assert_eq!(
            PredictionRequest::from_json(&json!([1, 2])).unwrap_err(),
            RequestError::NotAnObject
        );
    }

    #[test]
    fn test_to_frame_has_every_field() {
        let df = PredictionRequest::from_json(&sample()).unwrap().to_frame().unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), REQUIRED_FIELDS.len());
        for field in REQUIRED_FIELDS {
            assert!(df.column(field).is_ok(), "missing column {}", field);
        }
    }

    #[test]
    fn test_field_lists_agree() {
        assert_eq!(NUMERIC_FIELDS.len() + CATEGORICAL_FIELDS.len(), REQUIRED_FIELDS.len());
        for (field, _) in CATEGORICAL_OPTIONS {
            assert!(CATEGORICAL_FIELDS.contains(&field));
        }
    }
}
