use crate::api::Mode;
use crate::commands::{load_repository, Out};
use crate::{Config, Result};

/// Lists the distinct periods of the document, most recent first. The first one is what `show`
/// and `edit` use when no period is given.
pub async fn periods(config: &Config, mode: Mode) -> Result<Out<Vec<String>>> {
    let repository = load_repository(config, mode).await?;
    let periods = repository.available_periods();
    let message = match periods.first() {
        Some(latest) => format!("Found {} periods, the most recent is {latest}", periods.len()),
        None => "The document has no periods".to_string(),
    };
    Ok(Out::new(message, periods))
}
