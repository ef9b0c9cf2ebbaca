//! Arm command implementation (press, on, off, up, down).

use anyhow::Result;
use switchbot_core::{BleTransport, BotAction, Session};
use tracing::info;

use crate::util::Target;

pub async fn cmd_action(target: &Target, action: BotAction, wait: bool) -> Result<()> {
    target
        .run(action.as_str(), async |session: &mut Session<BleTransport>| {
            session.perform(action, wait).await
        })
        .await?;

    if wait {
        info!("{} accepted by {}", action, target.name);
    } else {
        info!("{} sent to {}", action, target.name);
    }
    Ok(())
}
