use chrono::{
  DateTime,
  LocalResult,
  NaiveDate,
  NaiveDateTime,
  TimeZone,
  Utc
};
use chrono_tz::Tz;

use crate::error::SyncError;

/// Format of the editable local-time
/// text held in drafts.
pub const LOCAL_INPUT_FORMAT: &str =
  "%Y-%m-%dT%H:%M";

const LOCAL_INPUT_FALLBACKS: [&str; 3] = [
  "%Y-%m-%dT%H:%M:%S",
  "%Y-%m-%d %H:%M",
  "%Y-%m-%d %H:%M:%S"
];

const DISPLAY_FORMAT: &str =
  "%Y-%m-%d %H:%M";

/// Resolves a configured zone id,
/// falling back to UTC.
pub fn resolve_timezone(
  raw: Option<&str>,
  source: &str
) -> Tz {
  raw
    .and_then(|value| {
      parse_timezone(value, source)
    })
    .unwrap_or_else(|| {
      tracing::warn!(
        source,
        "using UTC as display timezone"
      );
      chrono_tz::UTC
    })
}

pub fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "configured display timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

/// Renders an instant as editable local
/// text, minute precision.
#[must_use]
pub fn to_local_input(
  dt: DateTime<Utc>,
  tz: &Tz
) -> String {
  dt.with_timezone(tz)
    .format(LOCAL_INPUT_FORMAT)
    .to_string()
}

#[must_use]
pub fn to_local_input_opt(
  dt: Option<DateTime<Utc>>,
  tz: &Tz
) -> String {
  dt.map(|value| {
    to_local_input(value, tz)
  })
  .unwrap_or_default()
}

#[must_use]
pub fn format_display(
  dt: DateTime<Utc>,
  tz: &Tz
) -> String {
  dt.with_timezone(tz)
    .format(DISPLAY_FORMAT)
    .to_string()
}

/// Parses editable local text back into
/// an absolute instant. Blank text is
/// `None`.
pub fn from_local_input(
  text: &str,
  tz: &Tz,
  field: &'static str
) -> Result<Option<DateTime<Utc>>, SyncError>
{
  let token = text.trim();
  if token.is_empty() {
    return Ok(None);
  }

  if let Ok(absolute) =
    DateTime::parse_from_rfc3339(token)
  {
    return Ok(Some(
      absolute.with_timezone(&Utc)
    ));
  }

  let naive = parse_local_naive(token)
    .ok_or_else(|| {
      SyncError::InvalidInput {
        field,
        message: format!(
          "expected YYYY-MM-DDTHH:MM, \
           got {token:?}"
        )
      }
    })?;

  to_utc_from_local(naive, tz, field)
    .map(Some)
}

fn parse_local_naive(
  token: &str
) -> Option<NaiveDateTime> {
  std::iter::once(LOCAL_INPUT_FORMAT)
    .chain(LOCAL_INPUT_FALLBACKS)
    .find_map(|format| {
      NaiveDateTime::parse_from_str(
        token, format
      )
      .ok()
    })
    .or_else(|| {
      NaiveDate::parse_from_str(
        token, "%Y-%m-%d"
      )
      .ok()
      .and_then(|date| {
        date.and_hms_opt(0, 0, 0)
      })
    })
}

fn to_utc_from_local(
  local_naive: NaiveDateTime,
  tz: &Tz,
  field: &'static str
) -> Result<DateTime<Utc>, SyncError> {
  match tz
    .from_local_datetime(&local_naive)
  {
    | LocalResult::Single(local_dt) => {
      Ok(local_dt.with_timezone(&Utc))
    }
    | LocalResult::Ambiguous(
      first,
      second
    ) => {
      tracing::warn!(
        field,
        first = %first,
        second = %second,
        "ambiguous local datetime; using earliest"
      );
      let chosen = if first <= second {
        first
      } else {
        second
      };
      Ok(chosen.with_timezone(&Utc))
    }
    | LocalResult::None => {
      Err(SyncError::InvalidInput {
        field,
        message: format!(
          "{local_naive} does not \
           exist in {tz}"
        )
      })
    }
  }
}
