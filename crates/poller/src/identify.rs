use tracing::{debug, info};
use tsm_core::config::TsmConfig;
use tsm_core::DeviceProfile;

use crate::error::PollError;
use crate::session::{DeviceSession, SessionTarget};

/// Asks the device which model it is and resolves its channel tables.
///
/// Opens and closes its own connection.
pub async fn identify<S: DeviceSession>(
    session: &S,
    target: &SessionTarget,
    cfg: &TsmConfig,
) -> Result<DeviceProfile, PollError> {
    session.connect(target).await.map_err(PollError::Connect)?;
    let answers = session.query(&cfg.model_group_oids()).await;
    session.close().await;

    let answers = answers.map_err(PollError::Query)?;
    debug!(answers = ?answers.values, "model group answers");
    let profile =
        DeviceProfile::identify(cfg, &answers.values).map_err(PollError::Identification)?;
    info!(
        model = %profile.model,
        model_group = %profile.model_group,
        "controller identified"
    );
    Ok(profile)
}
