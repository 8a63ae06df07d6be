//! Diagnostics for GIC input tables.
//!
//! The engine itself fails fast on contract violations. This module is the
//! friendlier pass that runs first: it walks every table, collects all
//! problems at once, and labels each with the entity it came from.
//!
//! # Example
//!
//! ```
//! use gic_core::diagnostics::{validate_tables, Severity};
//! use gic_core::GicTables;
//!
//! let diag = validate_tables(&GicTables::default());
//! assert!(diag.has_warnings());
//! assert_eq!(diag.error_count(), 0);
//! ```

use crate::records::{GicTables, WiringType};
use serde::Serialize;
use std::collections::HashSet;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but the analysis can still run
    Warning,
    /// The analysis will fail on this input
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (e.g., "wiring", "grounding", "geometry")
    pub category: String,
    pub message: String,
    /// Optional entity reference (e.g., "Transformer 3", "Line 1-2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }

        Ok(())
    }
}

/// Collection of diagnostic issues
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    /// Issues in one category, in the order they were found.
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// A copy holding only the issues in `category`.
    pub fn only_category(&self, category: &str) -> Diagnostics {
        Diagnostics {
            issues: self.issues_by_category(category).cloned().collect(),
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    pub fn summary(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, plural(w)),
            (0, e) => format!("{} error{}", e, plural(e)),
            (w, e) => format!("{} warning{}, {} error{}", w, plural(w), e, plural(e)),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

/// Check every table for problems the engine would trip over.
///
/// Errors mirror the engine's fail-fast conditions (unparseable wiring,
/// windings grounded at a substation with no grounding record, non-positive
/// grounding). Warnings flag data that is accepted but probably unintended.
pub fn validate_tables(tables: &GicTables) -> Diagnostics {
    let mut diag = Diagnostics::new();

    if tables.transformers.is_empty() {
        diag.add_warning("structure", "No transformers; every H-matrix row will be empty");
    }

    let mut grounded = HashSet::new();
    for sub in &tables.substations {
        let entity = format!("Substation {}", sub.number);
        let ohms = sub.grounding_ohms.value();
        if !(ohms.is_finite() && ohms > 0.0) {
            diag.add_error_with_entity(
                "grounding",
                &format!("grounding resistance {ohms} ohm must be finite and positive"),
                &entity,
            );
        }
        if !grounded.insert(sub.number) {
            diag.add_warning_with_entity("structure", "duplicate substation number", &entity);
        }
    }

    let mut seen_buses = HashSet::new();
    for bus in &tables.buses {
        if !seen_buses.insert(bus.number) {
            diag.add_warning_with_entity(
                "structure",
                "duplicate bus number",
                &format!("Bus {}", bus.number),
            );
        }
    }

    for (idx, xfmr) in tables.transformers.iter().enumerate() {
        let entity = xfmr
            .name
            .clone()
            .unwrap_or_else(|| format!("Transformer {idx}"));
        for (side, label, sub, r) in [
            ("HV", &xfmr.hv_wiring, xfmr.hv_substation, xfmr.hv_coil_resistance),
            ("LV", &xfmr.lv_wiring, xfmr.lv_substation, xfmr.lv_coil_resistance),
        ] {
            match label.parse::<WiringType>() {
                Err(_) => diag.add_error_with_entity(
                    "wiring",
                    &format!("{side} wiring '{label}' is not implemented"),
                    &entity,
                ),
                Ok(wiring) if wiring.is_grounded() && !grounded.contains(&sub) => diag
                    .add_error_with_entity(
                        "grounding",
                        &format!("{side} winding grounds at substation {sub} with no grounding record"),
                        &entity,
                    ),
                Ok(_) => {}
            }
            if r.value() == 0.0 {
                diag.add_warning_with_entity(
                    "physical",
                    &format!("{side} coil resistance is zero; coil treated as absent"),
                    &entity,
                );
            }
        }
        if !seen_buses.is_empty() && !seen_buses.contains(&xfmr.loss_bus()) {
            diag.add_warning_with_entity(
                "reference",
                &format!("loss bus {} is not in the bus table", xfmr.loss_bus()),
                &entity,
            );
        }
    }

    for gsu in &tables.gen_step_ups {
        if !grounded.contains(&gsu.substation) {
            diag.add_error_with_entity(
                "grounding",
                &format!("step-up grounds at substation {} with no grounding record", gsu.substation),
                &format!("GSU at bus {}", gsu.bus),
            );
        }
    }

    for line in tables.line_rows() {
        let entity = format!("Line {}-{}", line.from_bus, line.to_bus);
        if line.length_km.is_none() {
            diag.add_warning_with_entity(
                "geometry",
                "missing length; line contributes nothing to corners",
                &entity,
            );
        }
        let has_manual = line.gic_conductance.is_some();
        let has_derived = line.resistance_pu.is_some() && line.nominal_kv.is_some();
        if (line.use_manual_conductance && !has_manual) || (!has_manual && !has_derived) {
            diag.add_error_with_entity("conductance", "no usable GIC conductance", &entity);
        }
    }

    diag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{SubstationRecord, TransformerRecord};
    use crate::units::{Kilovolts, MegavoltAmperes, Ohms};

    fn transformer(hv_wiring: &str, sub: usize) -> TransformerRecord {
        TransformerRecord {
            name: None,
            hv_bus: 1,
            lv_bus: 2,
            hv_substation: sub,
            lv_substation: sub,
            hv_coil_resistance: Ohms(0.3),
            lv_coil_resistance: Ohms(0.0),
            hv_wiring: hv_wiring.to_string(),
            lv_wiring: "delta".to_string(),
            hv_nominal_kv: Kilovolts(345.0),
            lv_nominal_kv: Kilovolts(138.0),
            is_auto: false,
            gic_blocked: false,
            mva_base: MegavoltAmperes(100.0),
            k_param: 1.0,
            from_bus: None,
        }
    }

    #[test]
    fn flags_bad_wiring_and_missing_grounding() {
        let tables = GicTables {
            transformers: vec![transformer("zigzag", 1), transformer("gwye", 9)],
            substations: vec![SubstationRecord {
                number: 1,
                grounding_ohms: Ohms(0.2),
            }],
            ..GicTables::default()
        };
        let diag = validate_tables(&tables);
        assert_eq!(diag.issues_by_category("wiring").count(), 1);
        assert_eq!(diag.issues_by_category("grounding").count(), 1);
        // LV coil resistance of zero on both transformers
        assert_eq!(diag.issues_by_category("physical").count(), 2);
        assert!(diag.has_errors());
    }

    #[test]
    fn summary_pluralizes() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");
        diag.add_warning("geometry", "a");
        diag.add_warning("geometry", "b");
        diag.add_error_with_entity("wiring", "c", "Transformer 0");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
        assert!(diag.to_string().contains("[error:wiring] c (Transformer 0)"));

        let geometry = diag.only_category("geometry");
        assert_eq!(geometry.summary(), "2 warnings");
        assert!(!geometry.has_errors());
        assert_eq!(diag.only_category("grounding").summary(), "No issues");
    }
}
