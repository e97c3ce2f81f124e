use chrono::{DateTime, LocalResult, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone};
use chrono_tz::Tz;

/// Next instant strictly after `now` whose local time of day is `fire_at`.
///
/// An instant equal to `now` counts as already passed. `None` only at the end
/// of the representable calendar.
pub(crate) fn get_target_datetime(fire_at: &NaiveTime, now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();

    let candidate = resolve_local(&tz, today.and_time(*fire_at));
    if candidate > now {
        return Some(candidate);
    }

    let tomorrow = today.succ_opt()?;

    Some(resolve_local(&tz, tomorrow.and_time(*fire_at)))
}

/// Ambiguous local times take the earlier instant. Local times skipped by a
/// DST gap are shifted forward by the length of the gap.
fn resolve_local(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(datetime) => datetime,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let before_gap = local - TimeDelta::hours(3);
            let offset = tz
                .offset_from_local_datetime(&before_gap)
                .earliest()
                .unwrap_or_else(|| tz.offset_from_utc_datetime(&before_gap))
                .fix();
            let utc = local - TimeDelta::seconds(offset.local_minus_utc().into());

            tz.from_utc_datetime(&utc)
        }
    }
}
