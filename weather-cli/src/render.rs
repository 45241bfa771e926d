//! Terminal rendering of published weather state.

use std::io::Write;

use tokio::sync::{oneshot, watch};
use tracing::warn;
use weather_core::{CyclePhase, FetchOutcome, WeatherRecord, WeatherView};

pub const WATCH_HELP: &str =
    "Commands: m = metric, i = imperial, t = toggle units, r = refresh, q = quit";

pub fn record(record: &WeatherRecord) -> String {
    let view = WeatherView::from(record);
    format!(
        "{place} - {date}\n\
         {condition}, {temperature}\n\
         Humidity: {humidity}\n\
         Wind: {wind}\n\
         Rain: {rain}\n\
         Icon: {icon}",
        place = view.place,
        date = view.date,
        condition = view.condition,
        temperature = view.temperature,
        humidity = view.humidity,
        wind = view.wind,
        rain = view.rain_intensity,
        icon = view.icon_url,
    )
}

pub fn outcome(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::Success(rec) => record(rec),
        FetchOutcome::Failure(reason) => format!("! {reason}"),
    }
}

/// Write every publication to `out` until `stop` fires or the orchestrator goes away.
///
/// A publication already waiting when `stop` fires is still written.
pub async fn follow<W: Write + Send>(
    mut outcomes: watch::Receiver<Option<FetchOutcome>>,
    mut phase: watch::Receiver<CyclePhase>,
    mut stop: oneshot::Receiver<()>,
    mut out: W,
) -> W {
    let mut busy = false;

    loop {
        tokio::select! {
            biased;

            changed = outcomes.changed() => {
                if changed.is_err() {
                    break;
                }
                let latest = outcomes.borrow_and_update().clone();
                if let Some(latest) = latest {
                    if let Err(e) = writeln!(out, "\n{}", outcome(&latest)).and_then(|_| out.flush()) {
                        warn!("failed to write weather output: {}", e);
                        break;
                    }
                }
            }
            changed = phase.changed() => {
                if changed.is_err() {
                    break;
                }
                let now_busy = phase.borrow_and_update().is_busy();
                if now_busy && !busy {
                    eprintln!("Fetching weather...");
                }
                busy = now_busy;
            }
            _ = &mut stop => break,
        }
    }

    out
}
