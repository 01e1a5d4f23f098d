//! Per-tensor scheduling metadata.
//!
//! Stages are produced by the scheduler upstream of this crate. The passes
//! here only read them; the setters exist so that callers (and tests) can
//! describe a schedule.

use std::collections::{BTreeMap, HashMap};

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};
use tessel_ir::{DeviceAxis, ForType};

use crate::error::*;

/// Attachment of a tensor's loop nest inside another tensor's loop nest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeAt {
    /// Index of the innermost shared axis (0 = outermost).
    pub level: usize,
}

/// Hardware binding of one loop axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBinding {
    pub axis: DeviceAxis,
    pub extent: i64,
}

/// How one loop axis of a stage is executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForloopInfo {
    pub for_type: ForType,
    /// `None` for serial (unbound) axes.
    pub bind: Option<AxisBinding>,
}

impl ForloopInfo {
    pub fn bound(axis: DeviceAxis, extent: i64) -> Self {
        Self { for_type: axis.kind.for_type(), bind: Some(AxisBinding { axis, extent }) }
    }
}

/// Axis name → loop info, for one statement.
pub type AxisInfos = HashMap<String, ForloopInfo>;

/// Statement (tensor) name → axis infos.
pub type ForloopInfos = HashMap<String, AxisInfos>;

/// Scheduling record of one tensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage {
    pub tensor: String,
    pub inlined: bool,
    /// Loop axes from outermost to innermost.
    pub axis_names: SmallVec<[String; 4]>,
    pub forloop_infos: BTreeMap<String, ForloopInfo>,
    compute_ats: BTreeMap<String, ComputeAt>,
}

impl Stage {
    pub fn new<S: Into<String>>(tensor: impl Into<String>, axis_names: impl IntoIterator<Item = S>) -> Self {
        Self { tensor: tensor.into(), axis_names: axis_names.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Mark the tensor for inline expansion.
    pub fn compute_inline(mut self) -> Self {
        self.inlined = true;
        self
    }

    /// Attach this stage's loop nest inside `target`'s at `level`.
    ///
    /// Recording a second target is allowed here so that upstream mistakes
    /// are representable; [`Stage::compute_at`] rejects them when read.
    pub fn with_compute_at(mut self, target: impl Into<String>, level: usize) -> Self {
        self.compute_ats.insert(target.into(), ComputeAt { level });
        self
    }

    /// Bind loop axis `axis_name` to a hardware axis.
    pub fn with_binding(mut self, axis_name: impl Into<String>, axis: DeviceAxis, extent: i64) -> Self {
        self.forloop_infos.insert(axis_name.into(), ForloopInfo::bound(axis, extent));
        self
    }

    /// The single compute-at attachment, if any.
    pub fn compute_at(&self) -> Result<Option<(&str, ComputeAt)>> {
        ensure!(
            self.compute_ats.len() <= 1,
            MultipleComputeAtSnafu {
                tensor: self.tensor.clone(),
                count: self.compute_ats.len(),
                targets: self.compute_ats.keys().cloned().collect::<Vec<_>>(),
            }
        );
        Ok(self.compute_ats.iter().next().map(|(target, at)| (target.as_str(), *at)))
    }

    /// Axis names fixed by the compute-at attachment (levels `0..=level`).
    pub fn attached_axes(&self) -> Result<&[String]> {
        let Some((_, at)) = self.compute_at()? else {
            return Ok(&[]);
        };
        ensure!(
            at.level < self.axis_names.len(),
            ComputeAtLevelOutOfRangeSnafu { tensor: self.tensor.clone(), level: at.level, axes: self.axis_names.len() }
        );
        Ok(&self.axis_names[..=at.level])
    }

    /// Axes bound to a block or thread index.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, AxisBinding)> {
        self.forloop_infos.iter().filter_map(|(name, info)| info.bind.map(|bind| (name.as_str(), bind)))
    }
}

/// Stages keyed by tensor name.
#[derive(Debug, Clone, Default)]
pub struct StageMap {
    stages: HashMap<String, Stage>,
}

impl StageMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stage: Stage) {
        self.stages.insert(stage.tensor.clone(), stage);
    }

    pub fn get(&self, tensor: &str) -> Option<&Stage> {
        self.stages.get(tensor)
    }

    pub fn stage(&self, tensor: &str) -> Result<&Stage> {
        self.stages.get(tensor).context(MissingStageSnafu { tensor })
    }

    /// Tensors without a stage are never inlined.
    pub fn is_inlined(&self, tensor: &str) -> bool {
        self.stages.get(tensor).is_some_and(|stage| stage.inlined)
    }

    /// Loop infos of every stage, keyed by statement name.
    pub fn forloop_infos(&self) -> ForloopInfos {
        self.stages
            .iter()
            .map(|(name, stage)| {
                let infos = stage.forloop_infos.iter().map(|(axis, info)| (axis.clone(), *info)).collect();
                (name.clone(), infos)
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.values()
    }
}

impl FromIterator<Stage> for StageMap {
    fn from_iter<I: IntoIterator<Item = Stage>>(iter: I) -> Self {
        let mut map = Self::new();
        for stage in iter {
            map.insert(stage);
        }
        map
    }
}
