//! MCP `schedule_pickup` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SchedulePickupParams {
    #[schemars(description = "the id of the dog")]
    pub dog_id: i64,

    #[schemars(description = "the name of the dog")]
    pub dog_name: String,
}
