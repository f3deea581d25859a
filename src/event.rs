//! Structured window-manager events.
//!
//! Hyprland writes one record per line on its event socket, in the form
//! `EVENT>>DATA`.  The payload is a comma separated list whose meaning
//! depends on the event type:
//!
//! | Event                          | Fields                              |
//! |--------------------------------|-------------------------------------|
//! | `openwindow`, `closewindow`    | address, workspace, class, title    |
//! | `activewindow`                 | class, title                        |
//! | `activewindowv2`               | address                             |
//! | `workspace`                    | name                                |
//! | `workspacev2`                  | name, id                            |
//! | `destroyworkspacev2`           | name, id                            |
//! | `windowtitle`                  | address                             |
//! | `windowtitlev2`                | address, title                      |
//! | `activelayout`                 | keyboard, layout                    |
//!
//! The last field of a type swallows any remaining commas, so a window
//! title such as `Inbox, 3 unread` survives intact.

use std::collections::HashMap;

/// A parsed event: its type tag plus named properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: String,
    pub properties: HashMap<String, String>,
}

/// Raised for lines that are not `EVENT>>DATA` records.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed event line: {0:?}")]
pub struct ParseError(pub String);

/// Ordered property names declared by a supported event type, or `None`
/// for event types hyperflow does not know about.
pub fn fields_for(kind: &str) -> Option<&'static [&'static str]> {
    let fields: &'static [&'static str] = match kind {
        "openwindow" | "closewindow" => &["address", "workspace", "class", "title"],
        "activewindow" => &["class", "title"],
        "activewindowv2" => &["address"],
        "workspace" => &["name"],
        "workspacev2" => &["name", "id"],
        "destroyworkspacev2" => &["name", "id"],
        "windowtitle" => &["address"],
        "windowtitlev2" => &["address", "title"],
        "activelayout" => &["keyboard", "layout"],
        _ => return None,
    };
    Some(fields)
}

/// Whether rules triggered by `kind` can ever match.
pub fn is_supported(kind: &str) -> bool {
    fields_for(kind).is_some()
}

/// Split a raw line into `(event, data)` at the first `>>`.
pub(crate) fn split_event_line(line: &str) -> Option<(&str, &str)> {
    line.split_once(">>")
}

impl Event {
    /// Parse one raw line from the event socket.
    ///
    /// Unknown event types are not an error: they produce an event with an
    /// empty property map.  If the payload has fewer fields than declared,
    /// the trailing properties are simply absent.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let (kind, data) = split_event_line(line).ok_or_else(|| ParseError(line.to_string()))?;
        if kind.is_empty() {
            return Err(ParseError(line.to_string()));
        }

        let properties = match fields_for(kind) {
            Some(fields) => fields
                .iter()
                .zip(data.splitn(fields.len(), ','))
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            None => HashMap::new(),
        };

        Ok(Self {
            kind: kind.to_string(),
            properties,
        })
    }

    /// Look up a property by name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }
}
