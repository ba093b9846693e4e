//! Discriminator-tagged session encoding
//!
//! A stored session is one flat JSON object: the shape tag first, then the base
//! fields, then the extension fields of that shape. Decoding reads the tag
//! before anything else and picks the concrete shape from it.

use super::state::{EntryData, HistoryData, MenuData, SessionState};
use serde_json::{Map, Value};

pub const SHAPE_FIELD: &str = "$stateType";

pub const BASE_SHAPE: &str = "SessionState";
pub const ENTRY_SHAPE: &str = "EntryState";
pub const HISTORY_SHAPE: &str = "HistoryState";

pub fn shape_name(data: &MenuData) -> &'static str {
    match data {
        MenuData::None => BASE_SHAPE,
        MenuData::Entry(_) => ENTRY_SHAPE,
        MenuData::History(_) => HISTORY_SHAPE,
    }
}

pub fn encode(state: &SessionState) -> serde_json::Result<String> {
    let mut object = Map::new();
    object.insert(
        SHAPE_FIELD.to_string(),
        Value::String(shape_name(&state.data).to_string()),
    );
    merge_fields(&mut object, serde_json::to_value(state)?);
    match &state.data {
        MenuData::None => {}
        MenuData::Entry(data) => merge_fields(&mut object, serde_json::to_value(data)?),
        MenuData::History(data) => merge_fields(&mut object, serde_json::to_value(data)?),
    }
    serde_json::to_string(&Value::Object(object))
}

fn merge_fields(target: &mut Map<String, Value>, value: Value) {
    if let Value::Object(fields) = value {
        target.extend(fields);
    }
}

/// Decode a stored session. Anything unreadable is reported as no session.
pub fn decode(raw: &str) -> Option<SessionState> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Discarding unparsable session value");
            return None;
        }
    };

    let Some(object) = value.as_object() else {
        tracing::warn!("Discarding session value with non-object root");
        return None;
    };
    let shape = object
        .get(SHAPE_FIELD)
        .and_then(Value::as_str)
        .unwrap_or(BASE_SHAPE)
        .to_string();

    let mut state: SessionState = match serde_json::from_value(value.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(error = %e, shape = %shape, "Discarding malformed session value");
            return None;
        }
    };

    let extension = match shape.as_str() {
        ENTRY_SHAPE => serde_json::from_value::<EntryData>(value).map(MenuData::Entry),
        HISTORY_SHAPE => serde_json::from_value::<HistoryData>(value).map(MenuData::History),
        BASE_SHAPE => Ok(MenuData::None),
        unknown => {
            tracing::debug!(shape = %unknown, "Unknown session shape, keeping base fields");
            Ok(MenuData::None)
        }
    };

    match extension {
        Ok(data) => {
            state.data = data;
            Some(state)
        }
        Err(e) => {
            tracing::warn!(error = %e, shape = %shape, "Discarding session with malformed extension");
            None
        }
    }
}
