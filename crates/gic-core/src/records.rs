//! Raw table records consumed by the GIC engine.
//!
//! One record type per input table. Field names double as CSV headers.
//! Records are plain data: parsing of wiring strings and derivation of
//! conductances happen in the topology builder so that malformed data fails
//! at the point it is modeled.

use crate::error::{GicError, GicResult};
use crate::units::{Degrees, Kilometers, Kilovolts, MegavoltAmperes, Ohms, Siemens};
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Transformer winding configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WiringType {
    /// Grounded wye: provides a DC path to the substation ground
    GroundedWye,
    /// Ungrounded wye
    Wye,
    Delta,
}

impl WiringType {
    pub fn is_grounded(&self) -> bool {
        matches!(self, WiringType::GroundedWye)
    }

    /// Either wye variant, grounded or not.
    pub fn is_wye(&self) -> bool {
        matches!(self, WiringType::GroundedWye | WiringType::Wye)
    }
}

impl FromStr for WiringType {
    type Err = GicError;

    fn from_str(input: &str) -> GicResult<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "gwye" => Ok(WiringType::GroundedWye),
            "wye" => Ok(WiringType::Wye),
            "delta" => Ok(WiringType::Delta),
            _ => Err(GicError::UnsupportedWiring(input.to_string())),
        }
    }
}

/// One row of the GIC transformer table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerRecord {
    #[serde(default)]
    pub name: Option<String>,
    pub hv_bus: usize,
    pub lv_bus: usize,
    pub hv_substation: usize,
    pub lv_substation: usize,
    /// Per-phase coil resistance of the high-voltage winding
    pub hv_coil_resistance: Ohms,
    pub lv_coil_resistance: Ohms,
    pub hv_wiring: String,
    pub lv_wiring: String,
    pub hv_nominal_kv: Kilovolts,
    pub lv_nominal_kv: Kilovolts,
    #[serde(deserialize_with = "yes_no")]
    pub is_auto: bool,
    #[serde(deserialize_with = "yes_no")]
    pub gic_blocked: bool,
    pub mva_base: MegavoltAmperes,
    /// K-model scaling from effective GIC to reactive loss
    pub k_param: f64,
    /// Bus the transformer losses are booked against; defaults to `hv_bus`
    #[serde(default)]
    pub from_bus: Option<usize>,
}

impl TransformerRecord {
    pub fn loss_bus(&self) -> usize {
        self.from_bus.unwrap_or(self.hv_bus)
    }
}

/// One row of the branch table.
///
/// Rows tagged `Transformer` share the table with lines but are not part of
/// the line set; windings come from [`TransformerRecord`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub from_bus: usize,
    pub to_bus: usize,
    #[serde(default = "default_device_type")]
    pub device_type: String,
    #[serde(default)]
    pub circuit: Option<String>,
    /// Power-flow series resistance in per unit on the system base
    #[serde(default)]
    pub resistance_pu: Option<f64>,
    #[serde(default)]
    pub nominal_kv: Option<Kilovolts>,
    /// Manually entered per-phase GIC conductance
    #[serde(default)]
    pub gic_conductance: Option<Siemens>,
    #[serde(default, deserialize_with = "yes_no")]
    pub use_manual_conductance: bool,
    #[serde(default)]
    pub length_km: Option<Kilometers>,
    #[serde(default)]
    pub bearing_deg: Option<Degrees>,
    #[serde(default)]
    pub from_lon: Option<f64>,
    #[serde(default)]
    pub from_lat: Option<f64>,
    #[serde(default)]
    pub to_lon: Option<f64>,
    #[serde(default)]
    pub to_lat: Option<f64>,
}

fn default_device_type() -> String {
    "Line".to_string()
}

impl LineRecord {
    pub fn is_transformer(&self) -> bool {
        self.device_type.eq_ignore_ascii_case("transformer")
    }

    /// Endpoint coordinates as `((lon, lat), (lon, lat))` when all four are set.
    pub fn coordinates(&self) -> Option<((f64, f64), (f64, f64))> {
        Some((
            (self.from_lon?, self.from_lat?),
            (self.to_lon?, self.to_lat?),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstationRecord {
    pub number: usize,
    pub grounding_ohms: Ohms,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusRecord {
    pub number: usize,
    #[serde(default)]
    pub substation: Option<usize>,
    #[serde(default)]
    pub nominal_kv: Option<Kilovolts>,
}

/// Generator step-up transformer reduced to one equivalent grounding leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenStepUpRecord {
    pub bus: usize,
    pub substation: usize,
    pub conductance: Siemens,
}

/// Snapshot of every input table for one analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GicTables {
    pub transformers: Vec<TransformerRecord>,
    pub lines: Vec<LineRecord>,
    pub substations: Vec<SubstationRecord>,
    pub buses: Vec<BusRecord>,
    #[serde(default)]
    pub gen_step_ups: Vec<GenStepUpRecord>,
}

impl GicTables {
    /// Branch-table rows that are lines (transformer rows filtered out).
    pub fn line_rows(&self) -> impl Iterator<Item = &LineRecord> {
        self.lines.iter().filter(|line| !line.is_transformer())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accepts `yes`/`no`, `true`/`false`, and integers. Anything else is `false`.
fn yes_no<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Text(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "true"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wiring_parses_exact_labels_only() {
        assert_eq!("GWye".parse::<WiringType>().unwrap(), WiringType::GroundedWye);
        assert_eq!("wye".parse::<WiringType>().unwrap(), WiringType::Wye);
        assert_eq!(" Delta ".parse::<WiringType>().unwrap(), WiringType::Delta);
        assert!(matches!(
            "zigzag".parse::<WiringType>(),
            Err(GicError::UnsupportedWiring(_))
        ));
        assert!("".parse::<WiringType>().is_err());
        assert!(WiringType::Wye.is_wye() && WiringType::GroundedWye.is_wye());
        assert!(!WiringType::Delta.is_wye());
    }

    #[test]
    fn transformer_flags_accept_yes_no() {
        let json = r#"{
            "hv_bus": 1, "lv_bus": 2, "hv_substation": 1, "lv_substation": 1,
            "hv_coil_resistance": 0.2, "lv_coil_resistance": 0.1,
            "hv_wiring": "gwye", "lv_wiring": "delta",
            "hv_nominal_kv": 345.0, "lv_nominal_kv": 138.0,
            "is_auto": "YES", "gic_blocked": false,
            "mva_base": 100.0, "k_param": 1.2
        }"#;
        let record: TransformerRecord = serde_json::from_str(json).unwrap();
        assert!(record.is_auto);
        assert!(!record.gic_blocked);
        assert_eq!(record.loss_bus(), 1);
        assert_eq!(record.hv_coil_resistance, Ohms(0.2));
    }

    #[test]
    fn transformer_rows_are_not_lines() {
        let line = |device: &str| LineRecord {
            from_bus: 1,
            to_bus: 2,
            device_type: device.to_string(),
            circuit: None,
            resistance_pu: None,
            nominal_kv: None,
            gic_conductance: Some(Siemens(1.0)),
            use_manual_conductance: true,
            length_km: None,
            bearing_deg: None,
            from_lon: None,
            from_lat: None,
            to_lon: None,
            to_lat: None,
        };
        let tables = GicTables {
            lines: vec![line("Line"), line("Transformer"), line("Series Cap")],
            ..GicTables::default()
        };
        assert_eq!(tables.line_rows().count(), 2);
    }
}
