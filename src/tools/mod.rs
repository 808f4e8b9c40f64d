pub mod schedule_pickup;

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use crate::scheduler::PickupScheduler;
use schedule_pickup::SchedulePickupParams;

/// The Pooch Palace MCP tool handler. Exposes the pickup scheduler to
/// assistants via the `#[tool_router]` macro.
#[derive(Clone)]
pub struct SchedulerTools {
    tool_router: ToolRouter<Self>,
    scheduler: Arc<PickupScheduler>,
}

#[tool_router]
impl SchedulerTools {
    pub fn new(scheduler: Arc<PickupScheduler>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            scheduler,
        }
    }

    /// Schedule a pickup appointment for a dog.
    #[tool(description = "schedule an appointment to pick up or adopt a dog from a Pooch Palace location")]
    async fn schedule_pickup(
        &self,
        Parameters(params): Parameters<SchedulePickupParams>,
    ) -> Result<String, String> {
        if params.dog_name.trim().is_empty() {
            return Err("dog_name must not be empty".into());
        }

        tracing::info!(
            dog_id = params.dog_id,
            dog_name = %params.dog_name,
            "schedule_pickup called"
        );

        let pickup = self.scheduler.schedule(params.dog_id, &params.dog_name);
        Ok(pickup.pickup_at.to_rfc3339())
    }
}

#[tool_handler]
impl ServerHandler for SchedulerTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Pooch Palace scheduler. Use schedule_pickup to book a time to pick up \
                 or adopt a dog; it returns the appointment as an RFC 3339 timestamp."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
