//! Function pattern topology

use trellis_core::DeployError;
use trellis_core::domain::pattern::{FunctionPattern, PatternConfig, Runtime};
use trellis_core::domain::topology::{
    ComputeUnitSpec, HttpTriggerSpec, ResourceRequest, ScheduleTriggerSpec,
};

use super::{Declarations, logical_id};
use crate::source::StagedSource;

/// Compute unit, then the optional HTTP and schedule triggers
pub(super) async fn declare(
    session: &mut Declarations<'_>,
    config: &PatternConfig,
    function: &FunctionPattern,
    staged: &StagedSource,
) -> Result<(), DeployError> {
    // resolved before anything is declared
    let runtime: Runtime = function.runtime.parse()?;

    let unit = session
        .declare(ResourceRequest::ComputeUnit(ComputeUnitSpec {
            logical_id: logical_id(&config.name, "function"),
            runtime: runtime.identifier().to_string(),
            handler: function.handler.clone(),
            code_dir: staged.path.clone(),
        }))
        .await?;

    if function.api_enabled {
        session
            .declare(ResourceRequest::HttpTrigger(HttpTriggerSpec {
                logical_id: logical_id(&config.name, "api"),
                target: unit.clone(),
            }))
            .await?;
    }

    if let Some(expression) = &function.schedule {
        session
            .declare(ResourceRequest::ScheduleTrigger(ScheduleTriggerSpec {
                logical_id: logical_id(&config.name, "schedule"),
                target: unit,
                expression: expression.clone(),
            }))
            .await?;
    }

    Ok(())
}
