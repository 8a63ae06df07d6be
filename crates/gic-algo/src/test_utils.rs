//! Small synthetic systems for tests and examples.

use gic_core::records::{
    BusRecord, GenStepUpRecord, GicTables, LineRecord, SubstationRecord, TransformerRecord,
};
use gic_core::units::{Degrees, Kilometers, Kilovolts, MegavoltAmperes, Ohms, Siemens};

/// 345/138 kV transformer at substation 1: HV coil 0.2 Ω, LV coil 0.1 Ω,
/// 100 MVA, K = 1.
pub fn transformer(hv_bus: usize, lv_bus: usize, hv_wiring: &str, lv_wiring: &str) -> TransformerRecord {
    TransformerRecord {
        name: None,
        hv_bus,
        lv_bus,
        hv_substation: 1,
        lv_substation: 1,
        hv_coil_resistance: Ohms(0.2),
        lv_coil_resistance: Ohms(0.1),
        hv_wiring: hv_wiring.to_string(),
        lv_wiring: lv_wiring.to_string(),
        hv_nominal_kv: Kilovolts(345.0),
        lv_nominal_kv: Kilovolts(138.0),
        is_auto: false,
        gic_blocked: false,
        mva_base: MegavoltAmperes(100.0),
        k_param: 1.0,
        from_bus: None,
    }
}

/// Line with a manual per-phase conductance and a 10 km length.
pub fn line(from_bus: usize, to_bus: usize, conductance: f64) -> LineRecord {
    LineRecord {
        from_bus,
        to_bus,
        device_type: "Line".to_string(),
        circuit: None,
        resistance_pu: None,
        nominal_kv: None,
        gic_conductance: Some(Siemens(conductance)),
        use_manual_conductance: true,
        length_km: Some(Kilometers(10.0)),
        bearing_deg: None,
        from_lon: None,
        from_lat: None,
        to_lon: None,
        to_lat: None,
    }
}

pub fn substation(number: usize, ohms: f64) -> SubstationRecord {
    SubstationRecord {
        number,
        grounding_ohms: Ohms(ohms),
    }
}

pub fn bus(number: usize, substation: usize) -> BusRecord {
    BusRecord {
        number,
        substation: Some(substation),
        nominal_kv: None,
    }
}

/// ```text
/// sub1 ══ T1 (gwye HV at bus 1) ── bus 1 ── line ── bus 2 ── GSU ══ sub2
/// ```
///
/// One winding, one step-up, one line; the line current closes through both
/// groundings.
pub fn two_bus_system() -> GicTables {
    GicTables {
        transformers: vec![transformer(1, 11, "gwye", "delta")],
        lines: vec![line(1, 2, 2.0)],
        substations: vec![substation(1, 0.5), substation(2, 0.25)],
        buses: vec![bus(1, 1), bus(2, 2), bus(11, 1)],
        gen_step_ups: vec![GenStepUpRecord {
            bus: 2,
            substation: 2,
            conductance: Siemens(4.0),
        }],
    }
}

fn geo(mut record: LineRecord, from: (f64, f64), to: (f64, f64), km: f64, bearing: f64) -> LineRecord {
    record.from_lon = Some(from.0);
    record.from_lat = Some(from.1);
    record.to_lon = Some(to.0);
    record.to_lat = Some(to.1);
    record.length_km = Some(Kilometers(km));
    record.bearing_deg = Some(Degrees(bearing));
    record
}

/// Three substations, a plain GSU transformer at bus 1, an autotransformer
/// at bus 3, a generator step-up at bus 2, and a triangle of geolocated
/// lines. The branch table also carries a transformer row that must not be
/// treated as a line.
pub fn three_bus_system() -> GicTables {
    let mut auto = transformer(3, 13, "gwye", "gwye");
    auto.hv_substation = 3;
    auto.lv_substation = 3;
    auto.lv_coil_resistance = Ohms(0.15);
    auto.is_auto = true;
    auto.k_param = 1.5;

    let mut xfmr_row = line(1, 11, 1.0);
    xfmr_row.device_type = "Transformer".to_string();

    GicTables {
        transformers: vec![transformer(1, 11, "gwye", "delta"), auto],
        lines: vec![
            geo(line(1, 2, 1.5), (-84.0, 33.0), (-83.0, 33.0), 93.3, 90.0),
            xfmr_row,
            geo(line(2, 3, 1.2), (-83.0, 33.0), (-83.0, 34.0), 111.2, 0.0),
            geo(line(1, 3, 0.8), (-84.0, 33.0), (-83.0, 34.0), 145.0, 40.0),
        ],
        substations: vec![substation(1, 0.2), substation(2, 0.2), substation(3, 0.2)],
        buses: vec![bus(1, 1), bus(2, 2), bus(3, 3), bus(11, 1), bus(13, 3)],
        gen_step_ups: vec![GenStepUpRecord {
            bus: 2,
            substation: 2,
            conductance: Siemens(3.0),
        }],
    }
}

/// `n_lines` parallel lines between two grounded buses, each with a plain
/// grounded transformer at both ends. Every line shares one sign pattern.
pub fn parallel_lines_system(n_lines: usize) -> GicTables {
    let mut far = transformer(2, 12, "gwye", "delta");
    far.hv_substation = 2;
    far.lv_substation = 2;
    GicTables {
        transformers: vec![transformer(1, 11, "gwye", "delta"), far],
        lines: (0..n_lines).map(|i| line(1, 2, 1.0 + i as f64)).collect(),
        substations: vec![substation(1, 0.3), substation(2, 0.3)],
        buses: vec![bus(1, 1), bus(2, 2), bus(11, 1), bus(12, 2)],
        gen_step_ups: Vec::new(),
    }
}
