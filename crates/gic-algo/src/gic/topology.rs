//! Topology builder: raw tables to a tagged, ordered branch list.
//!
//! Each transformer is classified by {auto, blocked, HV/LV wiring} and
//! emits zero, one, or two winding branches to ground or between its buses.
//! Every emitted low-side or high-side leg is also recorded in the LV/HV
//! selector triplets at the branch index it had when it was emitted, which
//! is what later recombines branch currents into per-transformer effective
//! GIC.
//!
//! Branch order is windings, then generator step-ups, then lines.
//! [`BranchSet::assemble`] enforces it.

use gic_core::records::{GenStepUpRecord, GicTables, LineRecord, TransformerRecord, WiringType};
use gic_core::units::{Kilovolts, MegavoltAmperes, Ohms, Siemens};
use gic_core::{BusId, GicError, GicResult, NodeId, SubstationId, TransformerId};
use tracing::debug;

/// One side of a transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct Winding {
    pub bus: BusId,
    pub substation: SubstationId,
    pub resistance: Ohms,
    /// `1/R`, or zero when the coil resistance is zero (coil absent)
    pub conductance: Siemens,
    pub wiring: WiringType,
    pub nominal_kv: Kilovolts,
}

impl Winding {
    pub fn new(
        bus: usize,
        substation: usize,
        resistance: Ohms,
        wiring: &str,
        nominal_kv: Kilovolts,
    ) -> GicResult<Self> {
        let conductance = if resistance.value() == 0.0 {
            Siemens(0.0)
        } else {
            resistance.to_siemens()
        };
        Ok(Self {
            bus: BusId::new(bus),
            substation: SubstationId::new(substation),
            resistance,
            conductance,
            wiring: wiring.parse()?,
            nominal_kv,
        })
    }

    fn bus_node(&self) -> NodeId {
        NodeId::Bus(self.bus)
    }

    fn ground_node(&self) -> NodeId {
        NodeId::Substation(self.substation)
    }

    fn g(&self) -> f64 {
        self.conductance.value()
    }
}

/// A transformer with both windings parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransformer {
    pub id: TransformerId,
    pub name: Option<String>,
    pub hv: Winding,
    pub lv: Winding,
    /// HV nominal over LV nominal
    pub tap_ratio: f64,
    pub is_auto: bool,
    pub is_blocked: bool,
    pub mva_base: MegavoltAmperes,
    pub k_param: f64,
    pub loss_bus: BusId,
}

impl ParsedTransformer {
    pub fn from_record(index: usize, record: &TransformerRecord) -> GicResult<Self> {
        let hv = Winding::new(
            record.hv_bus,
            record.hv_substation,
            record.hv_coil_resistance,
            &record.hv_wiring,
            record.hv_nominal_kv,
        )?;
        let lv = Winding::new(
            record.lv_bus,
            record.lv_substation,
            record.lv_coil_resistance,
            &record.lv_wiring,
            record.lv_nominal_kv,
        )?;
        Ok(Self {
            id: TransformerId::new(index),
            name: record.name.clone(),
            tap_ratio: hv.nominal_kv / lv.nominal_kv,
            hv,
            lv,
            is_auto: record.is_auto,
            is_blocked: record.gic_blocked,
            mva_base: record.mva_base,
            k_param: record.k_param,
            loss_bus: BusId::new(record.loss_bus()),
        })
    }

    /// Per-phase DC current base in amperes.
    pub fn current_base(&self) -> f64 {
        self.mva_base.dc_current_base(self.hv.nominal_kv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchKind {
    Winding,
    GenStepUp,
    Line,
}

/// Any conductive path between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub kind: BranchKind,
    pub from: NodeId,
    pub to: NodeId,
    /// Per-phase conductance in siemens
    pub conductance: f64,
    /// Row of the source table (transformer, step-up, or branch table)
    pub source: usize,
}

/// COO triplets of a (transformers × branches) selector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorTriplets {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub values: Vec<f64>,
}

impl SelectorTriplets {
    fn push(&mut self, row: usize, col: usize, value: f64) {
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(&self.cols)
            .zip(&self.values)
            .map(|((&r, &c), &v)| (r, c, v))
    }
}

/// Windings emitted from the transformer table plus their selectors.
#[derive(Debug, Clone, Default)]
pub struct WindingBranches {
    pub branches: Vec<Branch>,
    pub low: SelectorTriplets,
    pub high: SelectorTriplets,
}

impl WindingBranches {
    fn add_low(&mut self, xfmr: usize, offset: usize, value: f64) {
        let col = self.branches.len() + offset;
        self.low.push(xfmr, col, value);
    }

    fn add_high(&mut self, xfmr: usize, offset: usize, value: f64) {
        let col = self.branches.len() + offset;
        self.high.push(xfmr, col, value);
    }

    fn add_winding(&mut self, xfmr: usize, from: NodeId, to: NodeId, g: f64) {
        self.branches.push(Branch {
            kind: BranchKind::Winding,
            from,
            to,
            conductance: g,
            source: xfmr,
        });
    }

    /// Low coil to ground plus the common coil between the two buses.
    fn add_auto_pair(&mut self, i: usize, xfmr: &ParsedTransformer, low_g: f64, common_g: f64) {
        let (lw, hw) = (&xfmr.lv, &xfmr.hv);
        self.add_low(i, 0, 1.0);
        self.add_low(i, 1, 1.0);
        self.add_winding(i, lw.bus_node(), lw.ground_node(), low_g);
        self.add_high(i, 0, -1.0);
        self.add_winding(i, lw.bus_node(), hw.bus_node(), common_g);
    }

    fn add_grounded_low(&mut self, i: usize, lw: &Winding, g: f64) {
        self.add_low(i, 0, 1.0);
        self.add_winding(i, lw.bus_node(), lw.ground_node(), g);
    }

    fn add_grounded_high(&mut self, i: usize, hw: &Winding, g: f64) {
        self.add_high(i, 0, 1.0);
        self.add_winding(i, hw.bus_node(), hw.ground_node(), g);
    }
}

/// Turn transformers into winding branches.
pub fn emit_windings(transformers: &[ParsedTransformer]) -> WindingBranches {
    let mut out = WindingBranches::default();

    for (i, xfmr) in transformers.iter().enumerate() {
        let (lw, hw) = (&xfmr.lv, &xfmr.hv);

        match (xfmr.is_blocked, xfmr.is_auto) {
            (false, false) => {
                if lw.wiring.is_grounded() {
                    out.add_grounded_low(i, lw, lw.g());
                }
                if hw.wiring.is_grounded() {
                    out.add_grounded_high(i, hw, hw.g());
                }
            }
            (false, true)
                if (lw.g() == 0.0 || hw.g() == 0.0)
                    && lw.wiring.is_wye()
                    && hw.wiring.is_wye() =>
            {
                // Wye-wye auto with a tap ratio near one leaves one coil
                // without resistance. Modeled with the HV conductance on
                // both legs; known approximation awaiting domain review.
                out.add_auto_pair(i, xfmr, hw.g(), hw.g());
            }
            (false, true) => match (lw.wiring.is_grounded(), hw.wiring.is_grounded()) {
                (true, true) => out.add_auto_pair(i, xfmr, lw.g(), hw.g()),
                (true, false) => out.add_grounded_low(i, lw, lw.g()),
                (false, true) => out.add_grounded_high(i, hw, hw.g()),
                (false, false) => {}
            },
            // Blocking device removes the low-side path; only the common
            // coil remains, carrying the LV conductance
            (true, true) => out.add_grounded_high(i, hw, lw.g()),
            (true, false) => {}
        }
    }

    out
}

/// Generator step-ups as bus-to-ground branches.
pub fn emit_gen_step_ups(records: &[GenStepUpRecord]) -> Vec<Branch> {
    records
        .iter()
        .enumerate()
        .map(|(i, gsu)| Branch {
            kind: BranchKind::GenStepUp,
            from: NodeId::bus(gsu.bus),
            to: NodeId::substation(gsu.substation),
            conductance: gsu.conductance.value(),
            source: i,
        })
        .collect()
}

/// Per-phase GIC conductance of a line row.
///
/// The manual value wins when flagged (or when no power-flow resistance is
/// available); otherwise `G = 1 / (r_pu · kV² / S_base)`.
pub fn line_conductance(line: &LineRecord, system_mva_base: f64) -> GicResult<f64> {
    let entity = || format!("line {}-{}", line.from_bus, line.to_bus);
    let derived = match (line.resistance_pu, line.nominal_kv) {
        (Some(r), Some(kv)) if !line.use_manual_conductance => Some((r, kv)),
        _ => None,
    };
    match (derived, line.gic_conductance) {
        (Some((r_pu, kv)), _) => {
            let ohms = r_pu * kv.value().powi(2) / system_mva_base;
            if ohms <= 0.0 || !ohms.is_finite() {
                return Err(GicError::Validation(format!(
                    "{} has non-positive resistance {ohms} ohm",
                    entity()
                )));
            }
            Ok(1.0 / ohms)
        }
        (None, Some(g)) => Ok(g.value()),
        (None, None) => Err(GicError::Validation(format!(
            "{} has no usable GIC conductance",
            entity()
        ))),
    }
}

/// Lines from the branch table; returns the branches and their row numbers.
pub fn emit_lines(lines: &[LineRecord], system_mva_base: f64) -> GicResult<Vec<Branch>> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.is_transformer())
        .map(|(row, line)| {
            Ok(Branch {
                kind: BranchKind::Line,
                from: NodeId::bus(line.from_bus),
                to: NodeId::bus(line.to_bus),
                conductance: line_conductance(line, system_mva_base)?,
                source: row,
            })
        })
        .collect()
}

/// Every branch in the fixed order windings, step-ups, lines.
#[derive(Debug, Clone)]
pub struct BranchSet {
    branches: Vec<Branch>,
    n_windings: usize,
    n_gen_step_ups: usize,
    n_lines: usize,
}

impl BranchSet {
    /// Concatenate the three groups, checking each holds only its own kind.
    pub fn assemble(
        windings: Vec<Branch>,
        gen_step_ups: Vec<Branch>,
        lines: Vec<Branch>,
    ) -> GicResult<Self> {
        for (group, kind) in [
            (&windings, BranchKind::Winding),
            (&gen_step_ups, BranchKind::GenStepUp),
            (&lines, BranchKind::Line),
        ] {
            if let Some(stray) = group.iter().find(|b| b.kind != kind) {
                return Err(GicError::Validation(format!(
                    "{:?} branch found among {:?} branches",
                    stray.kind, kind
                )));
            }
        }
        let (n_windings, n_gen_step_ups, n_lines) =
            (windings.len(), gen_step_ups.len(), lines.len());
        let mut branches = windings;
        branches.extend(gen_step_ups);
        branches.extend(lines);
        Ok(Self {
            branches,
            n_windings,
            n_gen_step_ups,
            n_lines,
        })
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn n_windings(&self) -> usize {
        self.n_windings
    }

    pub fn n_gen_step_ups(&self) -> usize {
        self.n_gen_step_ups
    }

    pub fn n_lines(&self) -> usize {
        self.n_lines
    }

    /// Column range of the line branches (the trailing `n_lines`).
    pub fn line_range(&self) -> std::ops::Range<usize> {
        self.branches.len() - self.n_lines..self.branches.len()
    }

    pub fn of_kind(&self, kind: BranchKind) -> &[Branch] {
        let start_gsu = self.n_windings;
        let start_line = start_gsu + self.n_gen_step_ups;
        match kind {
            BranchKind::Winding => &self.branches[..start_gsu],
            BranchKind::GenStepUp => &self.branches[start_gsu..start_line],
            BranchKind::Line => &self.branches[start_line..],
        }
    }
}

/// Output of the topology builder.
#[derive(Debug, Clone)]
pub struct Topology {
    pub transformers: Vec<ParsedTransformer>,
    pub branches: BranchSet,
    /// LV selector triplets (transformer, branch column, coefficient)
    pub low: SelectorTriplets,
    /// HV selector triplets
    pub high: SelectorTriplets,
}

impl Topology {
    pub fn build(tables: &GicTables, system_mva_base: f64) -> GicResult<Self> {
        let transformers = tables
            .transformers
            .iter()
            .enumerate()
            .map(|(i, record)| ParsedTransformer::from_record(i, record))
            .collect::<GicResult<Vec<_>>>()?;

        let windings = emit_windings(&transformers);
        let gen_step_ups = emit_gen_step_ups(&tables.gen_step_ups);
        let lines = emit_lines(&tables.lines, system_mva_base)?;

        debug!(
            transformers = transformers.len(),
            windings = windings.branches.len(),
            gen_step_ups = gen_step_ups.len(),
            lines = lines.len(),
            "built GIC topology"
        );

        let branches = BranchSet::assemble(windings.branches, gen_step_ups, lines)?;
        Ok(Self {
            transformers,
            branches,
            low: windings.low,
            high: windings.high,
        })
    }

    pub fn n_transformers(&self) -> usize {
        self.transformers.len()
    }
}
