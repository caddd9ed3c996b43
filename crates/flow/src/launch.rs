use shared::domain::Group;
use url::{form_urlencoded, Url};

const GROUP_PARAM: &str = "group";

/// Extracts a pre-selected group from a launch URL or bare query string.
pub fn group_from_launch(raw: &str) -> Option<Group> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let query = match Url::parse(raw) {
        Ok(url) => url.query().map(str::to_owned)?,
        Err(_) => match raw.split_once('?') {
            Some((_, query)) => query.to_owned(),
            None => raw.to_owned(),
        },
    };

    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == GROUP_PARAM)
        .and_then(|(_, value)| Group::parse_label(&value))
}
