use tessel_ir::LaunchDims;
use tracing::trace;

use crate::stage::Stage;

/// Launch dimensions covering every bound axis of `stages`.
///
/// Each hardware axis takes the largest extent bound to it across the group;
/// axes nobody binds stay at 1.
pub fn gather_axis_info(stages: &[&Stage]) -> LaunchDims {
    let mut dims = LaunchDims::default();
    for stage in stages {
        for (axis_name, bind) in stage.bindings() {
            trace!(tensor = %stage.tensor, axis = %axis_name, device = %bind.axis, extent = bind.extent, "bound axis");
            dims.extend(bind.axis, bind.extent);
        }
    }
    dims
}
